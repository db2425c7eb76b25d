use chrono::{Duration, Local, NaiveDateTime};
use clap::Args;

use automute_core::window::to_instant;
use automute_core::{evaluate, snapshot, WindowStore};

use super::parse_datetime;

#[derive(Args)]
pub struct StatusArgs {
    /// Evaluate at this local time instead of now (YYYY-MM-DD HH:MM)
    #[arg(long, value_parser = parse_datetime)]
    at: Option<NaiveDateTime>,
}

pub fn run(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = WindowStore::open()?;
    let now = match args.at {
        Some(at) => to_instant(&Local, at),
        None => Local::now(),
    };

    // Read-only: expired one-shots are skipped here, pruning is left to the
    // scheduler and `window list`.
    let windows: Vec<_> = store
        .load()?
        .into_iter()
        .filter(|w| !w.has_expired(&now))
        .collect();
    let result = evaluate(&windows, &now);
    let next_event_at = result
        .next_event_delay()
        .and_then(|d| Duration::from_std(d).ok())
        .map(|d| now + d);

    let out = serde_json::json!({
        "evaluated_at": now,
        "active": result.active,
        "next_event_delay_secs": result.next_event_delay_secs,
        "next_event_at": next_event_at,
        "windows": snapshot(&windows, &now),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
