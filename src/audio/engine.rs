use anyhow::{anyhow, Result};
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Mutex, PoisonError,
};
use std::thread;
use std::time::Duration;

use super::tones::{AlarmTone, ChimeTone};
use super::{AudioSink, Tone};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const FADE_STEPS: u32 = 10;

enum AudioCommand {
    Play(Tone),
    FadeOut(Duration),
    Stop,
}

/// rodio output driven from a dedicated thread, since `OutputStream` is not
/// `Send`. Commands are queued over a channel and applied in order.
pub struct RodioSink {
    tx: Mutex<Option<Sender<AudioCommand>>>,
}

impl RodioSink {
    pub fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("focusguard-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn fresh_sink(stream: &mut Option<OutputStream>) -> Result<Sink> {
                    let (s, handle) = OutputStream::try_default()
                        .map_err(|e| anyhow!("failed to create audio output stream: {e}"))?;
                    let new_sink = Sink::try_new(&handle)
                        .map_err(|e| anyhow!("failed to create audio sink: {e}"))?;
                    *stream = Some(s);
                    Ok(new_sink)
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play(tone) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            match fresh_sink(&mut _stream) {
                                Ok(new_sink) => {
                                    match tone {
                                        Tone::Alarm {
                                            frequency_hz,
                                            volume,
                                            duration,
                                        } => new_sink.append(AlarmTone::new(
                                            frequency_hz,
                                            volume,
                                            duration,
                                        )),
                                        Tone::Chime { volume } => {
                                            new_sink.append(ChimeTone::new(volume))
                                        }
                                    }
                                    new_sink.play();
                                    sink = Some(new_sink);
                                }
                                Err(err) => log_error!("{err:#}"),
                            }
                        }
                        AudioCommand::FadeOut(fade) => {
                            if let Some(old) = sink.take() {
                                let start = old.volume();
                                let step = fade / FADE_STEPS;
                                for i in (0..FADE_STEPS).rev() {
                                    old.set_volume(start * i as f32 / FADE_STEPS as f32);
                                    thread::sleep(step);
                                }
                                old.stop();
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
                log_info!("audio thread shutting down");
            })
            .map_err(|e| anyhow!("failed to spawn audio thread: {e}"))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, command: AudioCommand) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(command)
            .map_err(|_| anyhow!("audio thread is no longer running"))
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for RodioSink {
    fn prepare(&self) -> Result<()> {
        self.ensure_thread().map(|_| ())
    }

    fn play(&self, tone: &Tone) -> Result<()> {
        self.send(AudioCommand::Play(tone.clone()))
    }

    fn fade_out(&self, fade: Duration) -> Result<()> {
        self.send(AudioCommand::FadeOut(fade))
    }

    fn stop(&self) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(tx) = tx {
            let _ = tx.send(AudioCommand::Stop);
        }
        Ok(())
    }
}
