use std::sync::Arc;

use automute_core::{Config, Event, MuteService, Scheduler, SchedulerOptions, WindowStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::sink::CommandSink;
use crate::watch::watch_window_file;

/// Run the scheduler until Ctrl-C or `quit` on stdin.
///
/// Changes to the window file made by other commands restart the loop.
/// stdin commands: `reload` (force a restart), `status` (print scheduler
/// status and windows), `quit`.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(WindowStore::open()?);
    // Watch before the first cycle so no external edit slips past.
    let (_watcher, mut changes) = watch_window_file(store.path())?;
    let sink = Arc::new(CommandSink::new(&config.effect));
    let scheduler = Scheduler::new(store, sink)
        .with_options(SchedulerOptions::from(&config.scheduler));
    let service = MuteService::new(scheduler);

    let mut events = service.scheduler().subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    service.scheduler().start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            Some(()) = changes.recv() => {
                info!("window file changed, restarting scheduler");
                service.scheduler().restart().await;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "" => {}
                    "reload" => service.scheduler().restart().await,
                    "status" => print_status(&service).await?,
                    "quit" | "exit" => break,
                    other => warn!(command = other, "unknown command (reload, status, quit)"),
                },
                // Detached stdin: keep running until interrupted.
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
            event = events.recv() => match event {
                Ok(event) => print_event(&event)?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    service.shutdown().await;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

async fn print_status(service: &MuteService) -> Result<(), Box<dyn std::error::Error>> {
    let out = serde_json::json!({
        "scheduler": service.scheduler().status(),
        "windows": service.windows_snapshot().await?,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}
