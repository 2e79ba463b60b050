//! Modified-date directive values.
//!
//! Accepts relative keywords (`today`, `yesterday`, `week`, `month`, `year`)
//! and absolute dates (`2024-03-01`, `2024-03`, `2024/03/01`, `03/01/2024`,
//! `Mar 1, 2024`), optionally prefixed with a comparison operator.

use chrono::{DateTime, Duration, Local, Months, NaiveDate, TimeZone};

use super::Operator;

const ABSOLUTE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y"];

/// Parse a date directive value into an operator and a point in time.
///
/// Without an explicit operator, `week`/`month`/`year` mean "on or after"
/// and everything else means "on that day". An unparseable date yields
/// `None`, which matches every file.
pub fn parse_date(raw: &str) -> (Operator, Option<DateTime<Local>>) {
    let (op, value) = Operator::split_prefix(raw.trim());
    let keyword = value.to_ascii_lowercase();
    let default_op = match keyword.as_str() {
        "week" | "month" | "year" => Operator::Gte,
        _ => Operator::Eq,
    };

    let now = Local::now();
    let time = resolve_keyword(&keyword, now).or_else(|| parse_absolute(value));

    if time.is_none() {
        log::debug!("unparseable date in query: {:?}", raw);
    }

    (op.unwrap_or(default_op), time)
}

fn resolve_keyword(keyword: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    match keyword {
        "today" => local_midnight(now.date_naive()),
        "yesterday" => local_midnight(now.date_naive() - Duration::days(1)),
        "week" => Some(now - Duration::days(7)),
        "month" => now.checked_sub_months(Months::new(1)),
        "year" => now.checked_sub_months(Months::new(12)),
        _ => None,
    }
}

fn parse_absolute(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();

    for format in ABSOLUTE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return local_midnight(date);
        }
    }

    // YYYY-MM: first day of the month.
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
        .ok()
        .and_then(local_midnight)
}

fn local_midnight(date: NaiveDate) -> Option<DateTime<Local>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local.from_local_datetime(&midnight).earliest()
}
