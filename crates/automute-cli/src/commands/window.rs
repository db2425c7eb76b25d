use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Timelike, Weekday};
use clap::Subcommand;

use automute_core::{snapshot, TimeWindow, WindowDraft, WindowStore};

use super::{parse_datetime, parse_time, parse_weekday};

#[derive(Subcommand)]
pub enum WindowAction {
    /// Add a window by weekday and time, placed in the upcoming week
    Add {
        /// Start weekday (mon..sun)
        #[arg(long, value_parser = parse_weekday)]
        start_day: Weekday,
        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        /// End weekday (mon..sun)
        #[arg(long, value_parser = parse_weekday)]
        end_day: Weekday,
        /// End time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// Repeat every week
        #[arg(long)]
        repeat: bool,
    },
    /// Add a window with explicit calendar dates
    AddAt {
        /// Start (YYYY-MM-DD HH:MM, local time)
        #[arg(long, value_parser = parse_datetime)]
        from: NaiveDateTime,
        /// End (YYYY-MM-DD HH:MM, local time)
        #[arg(long, value_parser = parse_datetime)]
        to: NaiveDateTime,
        /// Repeat every week
        #[arg(long)]
        repeat: bool,
    },
    /// List windows with their live status (expired one-shot windows are removed)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a window by id
    Remove {
        /// Window id
        id: String,
    },
}

pub fn run(action: WindowAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = WindowStore::open()?;

    match action {
        WindowAction::Add {
            start_day,
            start,
            end_day,
            end,
            repeat,
        } => {
            let draft = WindowDraft {
                start_day,
                start_hour: start.hour(),
                start_minute: start.minute(),
                end_day,
                end_hour: end.hour(),
                end_minute: end.minute(),
                repeat_weekly: repeat,
            };
            let window = draft.resolve(Local::now().naive_local())?;
            print_added(&store.append(window)?);
        }
        WindowAction::AddAt { from, to, repeat } => {
            let window = TimeWindow::from_naive(from, to, repeat)?;
            print_added(&store.append(window)?);
        }
        WindowAction::List { json } => {
            let now = Local::now();
            let windows = store.prune(&now)?;
            let statuses = snapshot(&windows, &now);
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else if statuses.is_empty() {
                println!("no mute windows");
            } else {
                for status in &statuses {
                    let marker = if status.active { "  [active]" } else { "" };
                    println!(
                        "{}  {}  next: {} {}{}",
                        status.window.id(),
                        status.window,
                        status.occurrence.start.weekday(),
                        status.occurrence.start.format("%Y-%m-%d %H:%M"),
                        marker
                    );
                }
            }
        }
        WindowAction::Remove { id } => {
            if !store.remove(&id)? {
                return Err(format!("no window with id {id}").into());
            }
            println!("window removed: {id}");
        }
    }
    Ok(())
}

fn print_added(window: &TimeWindow) {
    println!("window added: {} {}", window.id(), window);
}
