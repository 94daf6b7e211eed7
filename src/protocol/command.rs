//! Movement command vocabulary understood by the motion controller.
//!
//! Commands are short ASCII tokens: a two-letter prefix and an optional
//! magnitude (`FW10`, `FR30`, `FW--`), a buzzer code (`ZZ02`), or one of the
//! coordinator-internal markers that never reach the controller (`SNAP`,
//! `NOOP`, `FIN`, ...).
//!
//! | Token | Meaning | Sent to controller |
//! |-------|---------|--------------------|
//! | `FW`/`BW` | forward / backward straight (indoor) | yes |
//! | `FS`/`BS` | forward / backward straight (outdoor calibrated) | yes |
//! | `FL`/`FR`/`BL`/`BR` | forward / backward turn left / right | yes |
//! | `TL`/`TR` | tank turn left / right | yes |
//! | `STOP` | stop an open-ended move | yes |
//! | `ZZnn` | buzz `nn` times | yes |
//! | `IR`, `DT`, `A`, `C` | controller diagnostics | yes |
//! | `SNAP<id>[_<signal>]` | capture and classify (path mode) | no |
//! | `MANSNAP` | capture and classify (manual mode) | no |
//! | `NOOP` | release the motion lock | no |
//! | `WN` | fastest run started | no |
//! | `FIN` | end of path | no |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest magnitude a single controller command can carry.
pub const MAX_MAGNITUDE: u32 = 99;

/// Magnitude meaning "keep going until STOP".
pub const OPEN_ENDED: &str = "--";

/// Obstacle id used for snapshots taken in manual mode.
pub const MANUAL_SNAP_OBSTACLE: &str = "99";

const MOTION_PREFIXES: [&str; 10] = ["FW", "BW", "FS", "BS", "FL", "FR", "BL", "BR", "TL", "TR"];
const DIAGNOSTIC_PREFIXES: [&str; 4] = ["IR", "DT", "A", "C"];

/// An immutable movement token as queued for the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementCommand(String);

/// How the command sequencer treats a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Straight or turning motion, forwarded verbatim
    Motion,
    /// `STOP`
    Stop,
    /// `ZZnn` buzzer pattern
    Buzz,
    /// Controller diagnostic, forwarded verbatim
    Diagnostic,
    /// Path-mode snapshot of an obstacle face
    Snap {
        obstacle_id: String,
        signal: Option<String>,
    },
    /// Manual-mode snapshot
    ManualSnap,
    /// Release the motion lock without moving
    Noop,
    /// Fastest run announced
    FastestRunStart,
    /// End of the loaded path
    Finish,
}

impl CommandKind {
    /// Whether the token is written to the controller link.
    pub fn is_transmitted(&self) -> bool {
        matches!(
            self,
            CommandKind::Motion | CommandKind::Stop | CommandKind::Buzz | CommandKind::Diagnostic
        )
    }
}

impl MovementCommand {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Straight forward move of `cm` centimetres (`FWnn`).
    pub fn forward(cm: u32) -> Self {
        Self(format!("FW{:02}", cm))
    }

    /// Straight backward move of `cm` centimetres (`BWnn`).
    pub fn backward(cm: u32) -> Self {
        Self(format!("BW{:02}", cm))
    }

    /// Forward with no distance; the controller keeps driving until `STOP`.
    pub fn forward_open_ended() -> Self {
        Self(format!("FW{}", OPEN_ENDED))
    }

    pub fn stop() -> Self {
        Self("STOP".to_string())
    }

    /// Buzzer pattern (`ZZnn`).
    pub fn buzz(times: u8) -> Self {
        Self(format!("ZZ{:02}", times))
    }

    pub fn noop() -> Self {
        Self("NOOP".to_string())
    }

    pub fn finish() -> Self {
        Self("FIN".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the token against the closed vocabulary.
    pub fn kind(&self) -> Result<CommandKind> {
        let token = self.0.as_str();

        // Coordinator-internal markers first: none of them collide with a
        // controller prefix, but MANSNAP must win over SNAP.
        if token == "FIN" {
            return Ok(CommandKind::Finish);
        }
        if token.starts_with("NOOP") {
            return Ok(CommandKind::Noop);
        }
        if token.starts_with("WN") {
            return Ok(CommandKind::FastestRunStart);
        }
        if token.starts_with("MANSNAP") {
            return Ok(CommandKind::ManualSnap);
        }
        if let Some(rest) = token.strip_prefix("SNAP") {
            let (obstacle_id, signal) = match rest.split_once('_') {
                Some((id, signal)) => (id.to_string(), Some(signal.to_string())),
                None => (rest.to_string(), None),
            };
            return Ok(CommandKind::Snap {
                obstacle_id,
                signal,
            });
        }
        if token == "STOP" {
            return Ok(CommandKind::Stop);
        }
        if let Some(count) = token.strip_prefix("ZZ")
            && !count.is_empty()
            && count.bytes().all(|b| b.is_ascii_digit())
        {
            return Ok(CommandKind::Buzz);
        }
        if let Some(prefix) = MOTION_PREFIXES.iter().find(|p| token.starts_with(**p)) {
            let magnitude = &token[prefix.len()..];
            if magnitude.is_empty()
                || magnitude == OPEN_ENDED
                || magnitude.bytes().all(|b| b.is_ascii_digit())
            {
                return Ok(CommandKind::Motion);
            }
            return Err(Error::UnknownCommand(self.0.clone()));
        }
        if DIAGNOSTIC_PREFIXES.iter().any(|p| token.starts_with(p)) {
            return Ok(CommandKind::Diagnostic);
        }

        Err(Error::UnknownCommand(self.0.clone()))
    }

    /// Left/right mirror image of the command (`FL30` <-> `FR30`).
    pub fn mirrored(&self) -> Self {
        let swapped = match self.0.get(..2) {
            Some("FL") => "FR",
            Some("FR") => "FL",
            Some("BL") => "BR",
            Some("BR") => "BL",
            Some("TL") => "TR",
            Some("TR") => "TL",
            _ => return self.clone(),
        };
        Self(format!("{}{}", swapped, &self.0[2..]))
    }

    /// Rewrite an indoor command for the outdoor calibration of the controller.
    ///
    /// Zero-angle turns get a 20 unit magnitude and straight moves use the
    /// outdoor `FS`/`BS` variants.
    pub fn outdoorsified(&self) -> Self {
        match self.0.as_str() {
            "FL00" | "FR00" | "BL00" | "BR00" => Self(format!("{}20", &self.0[..2])),
            token => {
                if let Some(rest) = token.strip_prefix("FW") {
                    Self(format!("FS{}", rest))
                } else if let Some(rest) = token.strip_prefix("BW") {
                    Self(format!("BS{}", rest))
                } else {
                    self.clone()
                }
            }
        }
    }
}

impl fmt::Display for MovementCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MovementCommand {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Split a forward distance into controller-sized `FWnn` commands.
///
/// A zero distance produces no commands.
pub fn forward_chunks(total_cm: u32) -> Vec<MovementCommand> {
    let mut chunks = Vec::with_capacity((total_cm / MAX_MAGNITUDE + 1) as usize);
    let mut remaining = total_cm;
    while remaining > 0 {
        let step = remaining.min(MAX_MAGNITUDE);
        chunks.push(MovementCommand::forward(step));
        remaining -= step;
    }
    chunks
}
