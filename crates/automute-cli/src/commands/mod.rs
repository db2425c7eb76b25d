pub mod config;
pub mod run;
pub mod status;
pub mod window;

use chrono::{NaiveDateTime, NaiveTime, Weekday};

/// Parse a weekday name: `mon`, `Monday`, and the picker's `Tues`/`Thurs`.
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    match s.to_ascii_lowercase().as_str() {
        "tues" => Ok(Weekday::Tue),
        "thurs" => Ok(Weekday::Thu),
        other => other
            .parse::<Weekday>()
            .map_err(|_| format!("unknown weekday '{s}' (expected mon..sun)")),
    }
}

/// Parse `HH:MM`.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("invalid time '{s}': {e}"))
}

/// Parse `YYYY-MM-DD HH:MM`.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .map_err(|e| format!("invalid date-time '{s}' (expected YYYY-MM-DD HH:MM): {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn weekday_accepts_picker_spellings() {
        assert_eq!(parse_weekday("Mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("tues").unwrap(), Weekday::Tue);
        assert_eq!(parse_weekday("Thurs").unwrap(), Weekday::Thu);
        assert_eq!(parse_weekday("sunday").unwrap(), Weekday::Sun);
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn time_and_datetime_formats() {
        let t = parse_time("09:05").unwrap();
        assert_eq!((t.hour(), t.minute()), (9, 5));
        assert!(parse_time("25:00").is_err());
        assert!(parse_datetime("2024-01-01 10:00").is_ok());
        assert!(parse_datetime("2024-01-01").is_err());
    }
}
