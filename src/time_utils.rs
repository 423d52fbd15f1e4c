use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;

#[derive(Clone, Copy)]
enum ParsedTimezone {
    Named(Tz),
    Fixed(FixedOffset),
}

fn parse_fixed_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    let (hours, minutes) = if let Some((h, m)) = rest.split_once(':') {
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else if rest.len() > 2 {
        let (h, m) = rest.split_at(rest.len() - 2);
        (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?)
    } else {
        (rest.parse::<i32>().ok()?, 0)
    };

    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_timezone(raw: &str) -> Option<ParsedTimezone> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let upper = trimmed.to_uppercase();
    if upper == "UTC" || upper == "GMT" {
        return FixedOffset::east_opt(0).map(ParsedTimezone::Fixed);
    }
    if upper.starts_with("UTC") || upper.starts_with("GMT") {
        return parse_fixed_offset(&trimmed[3..]).map(ParsedTimezone::Fixed);
    }

    trimmed.parse::<Tz>().ok().map(ParsedTimezone::Named)
}

pub fn is_valid_timezone(raw: &str) -> bool {
    parse_timezone(raw).is_some()
}

/// Calendar date in the given zone. Unknown zones fall back to UTC.
pub fn local_date(raw_tz: &str, utc_dt: DateTime<Utc>) -> NaiveDate {
    match parse_timezone(raw_tz) {
        Some(ParsedTimezone::Named(tz)) => utc_dt.with_timezone(&tz).date_naive(),
        Some(ParsedTimezone::Fixed(offset)) => utc_dt.with_timezone(&offset).date_naive(),
        None => utc_dt.date_naive(),
    }
}

/// Whole days from `today` to `deadline`; negative once it has passed.
pub fn days_until(today: NaiveDate, deadline: NaiveDate) -> i64 {
    (deadline - today).num_days()
}
