pub mod commands;
pub mod controller;
pub mod state;

pub use commands::{dispatch, dispatch_json, Command};
pub use controller::SessionClock;
pub(crate) use controller::FocusEnd;
pub use state::{BreakRun, EngineState, FocusRun, Phase};
