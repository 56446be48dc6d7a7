use jiff::Zoned;
use jiff::civil::Date;

const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a snapshot folder name. Only canonical, zero padded `YYYY-MM-DD`
/// names of real calendar days are accepted.
pub fn parse_snapshot_date(name: &str) -> Option<Date> {
    let date = Date::strptime(SNAPSHOT_DATE_FORMAT, name).ok()?;
    (format_snapshot_date(date) == name).then_some(date)
}

pub fn format_snapshot_date(date: Date) -> String {
    date.strftime(SNAPSHOT_DATE_FORMAT).to_string()
}

/// Local calendar date.
pub fn today() -> Date {
    Zoned::now().date()
}

/// `days` consecutive dates ending with `end` (inclusive), oldest first.
/// Stops early at the first representable date.
pub fn date_axis(end: Date, days: usize) -> Vec<Date> {
    let mut axis = Vec::new();
    let mut day = end;
    for _ in 0..days {
        axis.push(day);
        match day.yesterday() {
            Ok(previous) => day = previous,
            Err(_) => break,
        }
    }
    axis.reverse();
    axis
}

/// Long form used by the header, e.g. "Monday, January 01, 2024".
/// Unparseable input is returned unchanged.
pub fn format_long_date(date: &str) -> String {
    match parse_snapshot_date(date) {
        Some(d) => d.strftime("%A, %B %d, %Y").to_string(),
        None => date.to_string(),
    }
}
