mod config;
mod window_store;

pub use config::{Config, EffectConfig, LogConfig, SchedulerConfig};
pub use window_store::WindowStore;

use std::path::PathBuf;

/// Returns the application data directory.
///
/// `AUTOMUTE_DATA_DIR` wins when set. Otherwise this is
/// `~/.config/automute[-dev]/`, with `AUTOMUTE_ENV=dev` selecting the
/// development directory. The directory is created if missing.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("AUTOMUTE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("AUTOMUTE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("automute-dev")
            } else {
                base_dir.join("automute")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
