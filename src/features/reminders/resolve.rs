//! Natural-language time and date resolvers
//!
//! Turns a loosely structured phrase into a zone-aware instant. Both
//! resolvers are pure: `now` is passed in, nothing reads the system clock.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use chrono::{DateTime, Datelike, Days, Duration, TimeZone, Timelike};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

static IN_RE: OnceLock<Regex> = OnceLock::new();
static TWELVE_HOUR_RE: OnceLock<Regex> = OnceLock::new();
static TWENTY_FOUR_HOUR_RE: OnceLock<Regex> = OnceLock::new();
static ISO_DATE_RE: OnceLock<Regex> = OnceLock::new();
static US_DATE_RE: OnceLock<Regex> = OnceLock::new();

fn in_re() -> &'static Regex {
    IN_RE.get_or_init(|| Regex::new(r"(\d+) (min|hour|day|week)[a-z]*").expect("static pattern"))
}

fn twelve_hour_re() -> &'static Regex {
    TWELVE_HOUR_RE
        .get_or_init(|| Regex::new(r"([01]?\d):?([0-5]\d)?\s?([ap])\.?m?\.?$").expect("static pattern"))
}

fn twenty_four_hour_re() -> &'static Regex {
    TWENTY_FOUR_HOUR_RE
        .get_or_init(|| Regex::new(r"([0-2]?\d):?([0-5]\d)$").expect("static pattern"))
}

fn iso_date_re() -> &'static Regex {
    ISO_DATE_RE
        .get_or_init(|| Regex::new(r"([12]\d{3})-([01]?\d)-([0-3]?\d)").expect("static pattern"))
}

fn us_date_re() -> &'static Regex {
    US_DATE_RE
        .get_or_init(|| Regex::new(r"([01]?\d)/([0-3]?\d)/?([12]?\d?\d{2})?").expect("static pattern"))
}

/// Resolve a time-only expression to an absolute instant.
///
/// Recognized forms, first match wins:
/// 1. `"midnight"` (00:00) and `"noon"` (12:00), matched anywhere in the text
/// 2. relative `"<N> <unit>"` with unit a prefix of minute/hour/day/week and
///    `N >= 1`; returns `now + N*unit` with no rollover
/// 3. 12-hour `H[:MM] [ap][.m.]`, hour 1-12
/// 4. 24-hour `H[:]MM`
///
/// The relative form is checked before the clock forms so "in 1200 minutes"
/// is not read as 12:00. Clock forms roll to the next day when the resolved
/// time-of-day has already passed `now`; seconds are zeroed.
pub fn resolve_time(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.trim().to_lowercase();
    let now = now.with_nanosecond(0)?;

    let hours: u32;
    let minutes: u32;
    if text.contains("midnight") {
        hours = 0;
        minutes = 0;
    } else if text.contains("noon") {
        hours = 12;
        minutes = 0;
    } else if let Some(caps) = in_re().captures(&text) {
        let n: i64 = caps[1].parse().ok()?;
        if n < 1 {
            return None;
        }
        let delta = match &caps[2] {
            "min" => Duration::minutes(n),
            "hour" => Duration::hours(n),
            "day" => Duration::days(n),
            "week" => Duration::days(n * 7),
            _ => return None,
        };
        // Relative offsets are already absolute; the rollover rule below
        // never applies to them.
        return now.checked_add_signed(delta);
    } else if let Some(caps) = twelve_hour_re().captures(&text) {
        let h: u32 = caps[1].parse().ok()?;
        if !(1..=12).contains(&h) {
            return None;
        }
        minutes = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let am = &caps[3] == "a";
        hours = if h == 12 && am {
            0
        } else if h < 12 && !am {
            h + 12
        } else {
            h
        };
    } else if let Some(caps) = twenty_four_hour_re().captures(&text) {
        hours = caps[1].parse().ok()?;
        minutes = caps[2].parse().ok()?;
    } else {
        return None;
    }

    if hours > 23 || minutes > 59 {
        return None;
    }
    let resolved = now
        .timezone()
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hours, minutes, 0)
        .single()?;
    if hours * 60 + minutes < now.hour() * 60 + now.minute() {
        resolved.checked_add_days(Days::new(1))
    } else {
        Some(resolved)
    }
}

/// Resolve a date-only expression to an instant on that date, keeping
/// `now`'s time-of-day.
///
/// Recognized: weekday names (first matching date strictly after `now`
/// within seven days), `"tomorrow"`, ISO `YYYY-M-D`, and US `M/D[/YY[YY]]`
/// with a missing year defaulting to the current one, advanced when the
/// month/day has already passed. Invalid calendar dates fail.
pub fn resolve_date(text: &str, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.trim().to_lowercase();
    let now = now.with_nanosecond(0)?;

    if text.ends_with("day") {
        let mut check = now;
        for _ in 0..7 {
            check = check.checked_add_days(Days::new(1))?;
            if check.format("%A").to_string().to_lowercase() == text {
                return Some(check);
            }
        }
        return None;
    }
    if text == "tomorrow" {
        return now.checked_add_days(Days::new(1));
    }

    let (y, m, d) = if let Some(caps) = iso_date_re().captures(&text) {
        (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    } else if let Some(caps) = us_date_re().captures(&text) {
        let m: u32 = caps[1].parse().ok()?;
        let d: u32 = caps[2].parse().ok()?;
        let y: i32 = match caps.get(3) {
            Some(g) => g.as_str().parse().ok()?,
            None => {
                // Year omitted: this year, bumped when the date already passed.
                let candidate = with_date(&now, now.year(), m, d)?;
                if candidate < now {
                    now.year() + 1
                } else {
                    now.year()
                }
            }
        };
        (y, m, d)
    } else {
        return None;
    };
    with_date(&now, y, m, d)
}

fn with_date(now: &DateTime<Tz>, y: i32, m: u32, d: u32) -> Option<DateTime<Tz>> {
    now.timezone()
        .with_ymd_and_hms(y, m, d, now.hour(), now.minute(), now.second())
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tz() -> Tz {
        "America/Los_Angeles".parse().unwrap()
    }

    /// Saturday morning, 10:30:45.
    fn now() -> DateTime<Tz> {
        tz().with_ymd_and_hms(2024, 6, 15, 10, 30, 45).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        tz().with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_midnight_rolls_to_next_day() {
        assert_eq!(resolve_time("midnight", now()), Some(at(2024, 6, 16, 0, 0, 0)));
    }

    #[test]
    fn test_noon_stays_today_before_noon() {
        assert_eq!(resolve_time("noon", now()), Some(at(2024, 6, 15, 12, 0, 0)));
    }

    #[test]
    fn test_noon_rolls_after_noon() {
        let afternoon = at(2024, 6, 15, 13, 0, 0);
        assert_eq!(resolve_time("noon", afternoon), Some(at(2024, 6, 16, 12, 0, 0)));
    }

    #[test]
    fn test_in_minutes_keeps_seconds() {
        assert_eq!(
            resolve_time("in 5 minutes", now()),
            Some(at(2024, 6, 15, 10, 35, 45))
        );
    }

    #[test]
    fn test_in_hours() {
        assert_eq!(resolve_time("in 2 hours", now()), Some(at(2024, 6, 15, 12, 30, 45)));
    }

    #[test]
    fn test_in_days() {
        assert_eq!(resolve_time("in 4 days", now()), Some(at(2024, 6, 19, 10, 30, 45)));
    }

    #[test]
    fn test_in_365_days() {
        assert_eq!(resolve_time("in 365 days", now()), Some(at(2025, 6, 15, 10, 30, 45)));
    }

    #[test]
    fn test_in_weeks() {
        assert_eq!(resolve_time("in 3 weeks", now()), Some(at(2024, 7, 6, 10, 30, 45)));
    }

    #[test]
    fn test_in_unit_prefix() {
        assert_eq!(resolve_time("in 5 min", now()), Some(at(2024, 6, 15, 10, 35, 45)));
    }

    #[test]
    fn test_in_zero_fails() {
        assert_eq!(resolve_time("in 0 minutes", now()), None);
    }

    #[test]
    fn test_in_unknown_unit_fails() {
        assert_eq!(resolve_time("in 24 hrs", now()), None);
        assert_eq!(resolve_time("in 5 seconds", now()), None);
    }

    #[test]
    fn test_12h_midnight_variants() {
        let expected = Some(at(2024, 6, 16, 0, 0, 0));
        assert_eq!(resolve_time("12a", now()), expected);
        assert_eq!(resolve_time("12:00 A.M.", now()), expected);
    }

    #[test]
    fn test_12h_noon_variants() {
        let expected = Some(at(2024, 6, 15, 12, 0, 0));
        assert_eq!(resolve_time("12p", now()), expected);
        assert_eq!(resolve_time("12:00 P.M.", now()), expected);
    }

    #[test]
    fn test_12h_pm_offset() {
        assert_eq!(resolve_time("4:20 pm", now()), Some(at(2024, 6, 15, 16, 20, 0)));
    }

    #[test]
    fn test_12h_matches_24h() {
        assert_eq!(resolve_time("4:20 pm", now()), resolve_time("16:20", now()));
        assert_eq!(resolve_time("9:59 am", now()), resolve_time("0959", now()));
    }

    #[test]
    fn test_24h_variants() {
        assert_eq!(resolve_time("0000", now()), Some(at(2024, 6, 16, 0, 0, 0)));
        assert_eq!(resolve_time("00:00", now()), Some(at(2024, 6, 16, 0, 0, 0)));
        assert_eq!(resolve_time("1200", now()), Some(at(2024, 6, 15, 12, 0, 0)));
        assert_eq!(resolve_time("12:00", now()), Some(at(2024, 6, 15, 12, 0, 0)));
    }

    #[test]
    fn test_24h_rolls_when_passed() {
        // 09:59 has already gone by at 10:30.
        assert_eq!(resolve_time("9:59", now()), Some(at(2024, 6, 16, 9, 59, 0)));
    }

    #[test]
    fn test_invalid_hours() {
        assert_eq!(resolve_time("29:59", now()), None);
    }

    #[test]
    fn test_invalid_minutes() {
        assert_eq!(resolve_time("12:60", now()), None);
    }

    #[test]
    fn test_unparsable_text() {
        assert_eq!(resolve_time("I'm a potatooooo!", now()), None);
    }

    #[test]
    fn test_trailing_word_fails() {
        assert_eq!(resolve_time("4:20 on", now()), None);
    }

    #[test]
    fn test_date_tomorrow() {
        assert_eq!(resolve_date("tomorrow", now()), Some(at(2024, 6, 16, 10, 30, 45)));
    }

    #[test]
    fn test_date_weekday() {
        assert_eq!(resolve_date("monday", now()), Some(at(2024, 6, 17, 10, 30, 45)));
        assert_eq!(resolve_date("Friday", now()), Some(at(2024, 6, 21, 10, 30, 45)));
    }

    #[test]
    fn test_date_weekday_strictly_after_now() {
        // now is a Saturday; "saturday" means next week's.
        assert_eq!(resolve_date("saturday", now()), Some(at(2024, 6, 22, 10, 30, 45)));
    }

    #[test]
    fn test_date_not_a_weekday() {
        assert_eq!(resolve_date("yesterday", now()), None);
    }

    #[test]
    fn test_date_iso() {
        assert_eq!(
            resolve_date("2021-01-06", now()),
            Some(at(2021, 1, 6, 10, 30, 45))
        );
    }

    #[test]
    fn test_date_us_full() {
        assert_eq!(
            resolve_date("12/31/1999", now()),
            Some(at(1999, 12, 31, 10, 30, 45))
        );
    }

    #[test]
    fn test_date_us_no_year() {
        assert_eq!(resolve_date("12/31", now()), Some(at(2024, 12, 31, 10, 30, 45)));
    }

    #[test]
    fn test_date_us_advances_year_when_passed() {
        assert_eq!(resolve_date("6/14", now()), Some(at(2025, 6, 14, 10, 30, 45)));
    }

    #[test]
    fn test_date_invalid_calendar_day() {
        assert_eq!(resolve_date("2/30", now()), None);
        assert_eq!(resolve_date("2024-02-30", now()), None);
    }

    #[test]
    fn test_date_unparsable() {
        assert_eq!(resolve_date("soonish", now()), None);
    }
}
