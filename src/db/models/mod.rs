pub mod activity;
pub mod anchor;
pub mod session;

pub use activity::{ActivityAction, ActivityLogEntry};
pub use anchor::{BreakAnchor, FocusAnchor};
pub use session::WorkSession;
