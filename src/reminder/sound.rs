//! Audible part of an alert. A sound only has to produce one short pulse on request, repetition is
//! handled by [AlertManager](super::alert::AlertManager).

use std::{
    fmt::Display,
    io::{IsTerminal, Write},
    process::Stdio,
};

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A pulse that may still be playing. Dropping it lets the pulse play out, [Tone::cut] ends it.
#[derive(Default)]
pub struct Tone {
    cut: Option<Box<dyn FnOnce() + Send>>,
}

impl Tone {
    /// A pulse that is over as soon as it started.
    pub fn finished() -> Self {
        Self::default()
    }

    pub fn cut_with(cut: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cut: Some(Box::new(cut)),
        }
    }

    pub fn cut(mut self) {
        if let Some(cut) = self.cut.take() {
            cut();
        }
    }
}

pub trait AlertSound: Send + Sync + 'static {
    /// Whether the sound can be played at all. Unavailable sounds make alerts visual-only.
    fn is_available(&self) -> bool {
        true
    }

    /// Starts one pulse. Must return quickly, the pulse is not awaited.
    fn play_tone(&self) -> Result<Tone>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    /// Terminal bell
    Bell,
    /// Sound player of the platform
    System,
    None,
}

impl Display for SoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SoundKind::Bell => write!(f, "bell"),
            SoundKind::System => write!(f, "system"),
            SoundKind::None => write!(f, "none"),
        }
    }
}

pub fn create_sound(kind: SoundKind) -> Box<dyn AlertSound> {
    match kind {
        SoundKind::Bell => Box::new(TerminalBell),
        SoundKind::System => Box::new(SystemSound::platform_default()),
        SoundKind::None => Box::new(NoSound),
    }
}

/// Rings the bell of the terminal attached to stderr.
pub struct TerminalBell;

impl AlertSound for TerminalBell {
    fn is_available(&self) -> bool {
        std::io::stderr().is_terminal()
    }

    fn play_tone(&self) -> Result<Tone> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(Tone::finished())
    }
}

/// Plays a sound file through an external player. The player isn't awaited, tokio reaps it once
/// it exits or is killed by [Tone::cut].
pub struct SystemSound {
    program: Option<&'static str>,
    args: Vec<&'static str>,
}

impl SystemSound {
    pub fn platform_default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                Self {
                    program: Some("paplay"),
                    args: vec!["/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga"],
                }
            } else if #[cfg(target_os = "macos")] {
                Self {
                    program: Some("afplay"),
                    args: vec!["/System/Library/Sounds/Glass.aiff"],
                }
            } else {
                Self { program: None, args: vec![] }
            }
        }
    }
}

impl AlertSound for SystemSound {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    fn play_tone(&self) -> Result<Tone> {
        let Some(program) = self.program else {
            bail!("No sound player for this platform");
        };
        let mut player = tokio::process::Command::new(program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Tone::cut_with(move || {
            if let Err(e) = player.start_kill() {
                trace!("Sound player already gone {e:?}");
            }
        }))
    }
}

pub struct NoSound;

impl AlertSound for NoSound {
    fn is_available(&self) -> bool {
        false
    }

    fn play_tone(&self) -> Result<Tone> {
        bail!("Sound is disabled")
    }
}
