//! Mute effect used by `automute-cli run`.
//!
//! The CLI has no audio backend of its own. It logs every transition and,
//! when configured, runs `effect.mute_command` / `effect.unmute_command`
//! through the platform shell. Commands only run when the state changes.

use std::process::Command;
use std::sync::Mutex;

use automute_core::storage::EffectConfig;
use automute_core::MuteSink;
use tracing::{debug, info, warn};

pub struct CommandSink {
    mute_command: Option<String>,
    unmute_command: Option<String>,
    last: Mutex<Option<bool>>,
}

impl CommandSink {
    pub fn new(config: &EffectConfig) -> Self {
        Self {
            mute_command: config.mute_command.clone().filter(|c| !c.trim().is_empty()),
            unmute_command: config.unmute_command.clone().filter(|c| !c.trim().is_empty()),
            last: Mutex::new(None),
        }
    }

    /// Record `muted` and report whether it differs from the last state.
    fn transition(&self, muted: bool) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let changed = *last != Some(muted);
        *last = Some(muted);
        changed
    }
}

impl MuteSink for CommandSink {
    fn set_muted(&self, muted: bool) {
        if !self.transition(muted) {
            debug!(muted, "mute state unchanged");
            return;
        }
        info!(muted, "{}", if muted { "muting audio" } else { "unmuting audio" });

        let command = if muted {
            &self.mute_command
        } else {
            &self.unmute_command
        };
        if let Some(command) = command.clone() {
            // Run off the scheduler loop; only the outcome is logged.
            std::thread::spawn(move || match shell(&command).status() {
                Ok(status) if status.success() => debug!(%command, "effect command finished"),
                Ok(status) => warn!(%command, %status, "effect command failed"),
                Err(e) => warn!(%command, error = %e, "effect command could not be started"),
            });
        }
    }
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}
