//! Natural-language date and time expressions.
//!
//! A small English grammar: casual days (`today`, `tomorrow`), weekday names,
//! relative offsets (`in 3 days`), calendar dates (`March 5`, `2026-03-05`,
//! `3/5`) and clock times (`5pm`, `17:30`, `noon`). Ambiguous expressions
//! resolve forward to the nearest occurrence that is not in the past. A date
//! and a time next to each other (`Friday at 3pm`, `5pm tomorrow`) form one
//! expression.

use chrono::{Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

use super::Draft;

const MONTHS: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

const WEEKDAYS: &str = r"mon(?:day)?|tue(?:sday|s)?|wed(?:nesday)?|thu(?:rsday|rs|r)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?";

/// Time of day for expressions that name a day but not a time.
const DEFAULT_HOUR: u32 = 12;

/// Hour used for `tonight`.
const TONIGHT_HOUR: u32 = 22;

type Rule = fn(&Captures, NaiveDateTime) -> Option<Part>;

static GRAMMAR: LazyLock<Vec<(Regex, Rule)>> = LazyLock::new(|| {
    let rules: Vec<(String, Rule)> = vec![
        (r"(?i)\b(today|tonight|tomorrow|tmr)\b".into(), casual_day),
        (format!(r"(?i)\b(?:(this|next)\s+)?({WEEKDAYS})\b"), weekday),
        (r"(?i)\bnext\s+(week|month)\b".into(), next_period),
        (
            r"(?i)\bin\s+(\d{1,4}|an?)\s+(min(?:ute)?s?|hours?|hrs?|days?|weeks?|months?)\b".into(),
            relative_offset,
        ),
        (r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b".into(), iso_date),
        (
            format!(r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"),
            month_day,
        ),
        (
            format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+({MONTHS})\b(?:,?\s+(\d{{4}})\b)?"),
            day_month,
        ),
        (r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b".into(), slash_date),
        (r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?".into(), meridiem_time),
        (r"\b([01]?\d|2[0-3]):([0-5]\d)\b".into(), clock_time),
        (r"(?i)\b(noon|midday|midnight)\b".into(), named_time),
    ];
    rules
        .into_iter()
        .map(|(pattern, rule)| (Regex::new(&pattern).unwrap(), rule))
        .collect()
});

/// Glue between a day and a time that belong to the same expression.
static JOIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:\s*,)?\s+(?:(?:at|on)\s+)?").unwrap());

static TRAILING_PREPOSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:by|on|at|due)\s*$").unwrap());

static EMBEDDED_PREPOSITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:by|on|at|due)\s+").unwrap());

/// The first date expression in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    /// Byte range of the expression in the searched text.
    pub span: Range<usize>,
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    /// A day; `time: None` keeps the reference time of day.
    Day {
        date: NaiveDate,
        time: Option<NaiveTime>,
        roll: Roll,
    },
    Clock(NaiveTime),
    Instant(NaiveDateTime),
}

/// How far a day that named no year moves when it resolves before now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Roll {
    Fixed,
    Day,
    Week,
    Year,
}

impl Roll {
    fn forward(self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Fixed => Some(at),
            Self::Day => at.checked_add_days(Days::new(1)),
            Self::Week => at.checked_add_days(Days::new(7)),
            Self::Year => at.checked_add_months(Months::new(12)),
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    span: Range<usize>,
    part: Part,
}

/// Find the earliest date expression in `text`, resolved against `now`.
pub fn find_first(text: &str, now: NaiveDateTime) -> Option<DateMatch> {
    let candidates = candidates(text, now);
    let first = candidates.first()?;

    let mut span = first.span.clone();
    let mut part = first.part;
    if let Some(join) = JOIN_RE.find(&text[span.end..]) {
        let next_start = span.end + join.end();
        let partner = candidates
            .iter()
            .filter(|c| c.span.start == next_start)
            .find_map(|c| combine(part, c.part).map(|p| (c.span.end, p)));
        if let Some((end, combined)) = partner {
            span.end = end;
            part = combined;
        }
    }

    Some(DateMatch {
        span,
        at: resolve(part, now),
    })
}

/// Cut the first date expression out of the draft and tidy the words it leaves behind.
pub fn extract(mut draft: Draft, now: NaiveDateTime) -> Draft {
    let Some(found) = find_first(&draft.text, now) else {
        return draft;
    };

    draft.fields.due_date = Some(found.at);
    let mut text = draft.text.clone();
    text.replace_range(found.span, "");
    let text = TRAILING_PREPOSITION_RE.replace(&text, "");
    draft.text = EMBEDDED_PREPOSITION_RE.replace(&text, " ").into_owned();
    draft
}

fn candidates(text: &str, now: NaiveDateTime) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = GRAMMAR
        .iter()
        .flat_map(|(re, rule)| {
            re.captures_iter(text).filter_map(move |caps| {
                let span = caps.get(0)?.range();
                rule(&caps, now).map(|part| Candidate { span, part })
            })
        })
        .collect();
    found.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.end.cmp(&a.span.end))
    });
    found
}

fn combine(first: Part, second: Part) -> Option<Part> {
    match (first, second) {
        (Part::Day { date, roll, .. }, Part::Clock(time))
        | (Part::Clock(time), Part::Day { date, roll, .. }) => Some(Part::Day {
            date,
            time: Some(time),
            roll,
        }),
        _ => None,
    }
}

fn resolve(part: Part, now: NaiveDateTime) -> NaiveDateTime {
    match part {
        Part::Day { date, time, roll } => {
            let at = date.and_time(time.unwrap_or(now.time()));
            if at < now { roll.forward(at).unwrap_or(at) } else { at }
        }
        Part::Clock(time) => {
            let today = now.date().and_time(time);
            if today < now {
                today + Duration::days(1)
            } else {
                today
            }
        }
        Part::Instant(at) => at,
    }
}

fn noon() -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0)
}

fn casual_day(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    let today = now.date();
    let part = match caps[1].to_ascii_lowercase().as_str() {
        "today" => Part::Day {
            date: today,
            time: None,
            roll: Roll::Fixed,
        },
        "tonight" => Part::Day {
            date: today,
            time: NaiveTime::from_hms_opt(TONIGHT_HOUR, 0, 0),
            roll: Roll::Day,
        },
        _ => Part::Day {
            date: today.succ_opt()?,
            time: None,
            roll: Roll::Fixed,
        },
    };
    Some(part)
}

fn weekday(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    let target = parse_weekday(&caps[2])?;
    let skip_today = caps
        .get(1)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("next"));

    let today = now.date();
    let mut days_ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    if days_ahead == 0 && skip_today {
        days_ahead = 7;
    }
    Some(Part::Day {
        date: today.checked_add_days(Days::new(days_ahead.into()))?,
        time: noon(),
        roll: Roll::Week,
    })
}

fn next_period(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    let today = now.date();
    let date = match caps[1].to_ascii_lowercase().as_str() {
        "week" => today.checked_add_days(Days::new(7))?,
        _ => today.checked_add_months(Months::new(1))?,
    };
    Some(Part::Day {
        date,
        time: None,
        roll: Roll::Fixed,
    })
}

fn relative_offset(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    let count: u32 = match caps[1].to_ascii_lowercase().as_str() {
        "a" | "an" => 1,
        n => n.parse().ok()?,
    };
    let unit = caps[2].to_ascii_lowercase();
    let at = if unit.starts_with("min") {
        now.checked_add_signed(Duration::try_minutes(count.into())?)?
    } else if unit.starts_with('h') {
        now.checked_add_signed(Duration::try_hours(count.into())?)?
    } else if unit.starts_with("day") {
        now.checked_add_days(Days::new(count.into()))?
    } else if unit.starts_with("week") {
        now.checked_add_days(Days::new(u64::from(count) * 7))?
    } else {
        now.checked_add_months(Months::new(count))?
    };
    Some(Part::Instant(at))
}

fn iso_date(caps: &Captures, _now: NaiveDateTime) -> Option<Part> {
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)?;
    Some(Part::Day {
        date,
        time: noon(),
        roll: Roll::Fixed,
    })
}

fn month_day(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    calendar_day(now, parse_month(&caps[1])?, caps[2].parse().ok()?, caps.get(3).map(|m| m.as_str()))
}

fn day_month(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    calendar_day(now, parse_month(&caps[2])?, caps[1].parse().ok()?, caps.get(3).map(|m| m.as_str()))
}

fn slash_date(caps: &Captures, now: NaiveDateTime) -> Option<Part> {
    let year = caps.get(3).map(|m| match m.as_str().len() {
        2 => format!("20{}", m.as_str()),
        _ => m.as_str().to_string(),
    });
    calendar_day(now, caps[1].parse().ok()?, caps[2].parse().ok()?, year.as_deref())
}

/// A calendar day; without a year, one already past rolls over to next year.
fn calendar_day(now: NaiveDateTime, month: u32, day: u32, year: Option<&str>) -> Option<Part> {
    let today = now.date();
    let (date, roll) = match year {
        Some(y) => (NaiveDate::from_ymd_opt(y.parse().ok()?, month, day)?, Roll::Fixed),
        None => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
            let date = match this_year {
                Some(d) if d >= today => d,
                _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day)?,
            };
            (date, Roll::Year)
        }
    };
    Some(Part::Day {
        date,
        time: noon(),
        roll,
    })
}

fn meridiem_time(caps: &Captures, _now: NaiveDateTime) -> Option<Part> {
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = caps[3].eq_ignore_ascii_case("p");
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0).map(Part::Clock)
}

fn clock_time(caps: &Captures, _now: NaiveDateTime) -> Option<Part> {
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0).map(Part::Clock)
}

fn named_time(caps: &Captures, _now: NaiveDateTime) -> Option<Part> {
    let hour = match caps[1].to_ascii_lowercase().as_str() {
        "midnight" => 0,
        _ => 12,
    };
    NaiveTime::from_hms_opt(hour, 0, 0).map(Part::Clock)
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label.get(..3)?.to_ascii_lowercase().as_str() {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(label: &str) -> Option<u32> {
    let month = match label.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday, 09:30.
    fn now() -> NaiveDateTime {
        at(2026, 3, 4, 9, 30)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn first(text: &str) -> Option<(String, NaiveDateTime)> {
        find_first(text, now()).map(|m| (text[m.span].to_string(), m.at))
    }

    #[test]
    fn weekdays_resolve_forward() {
        assert_eq!(first("Meeting by Friday"), Some(("Friday".into(), at(2026, 3, 6, 12, 0))));
        assert_eq!(first("standup mon"), Some(("mon".into(), at(2026, 3, 9, 12, 0))));
        assert_eq!(first("review wednesday"), Some(("wednesday".into(), at(2026, 3, 4, 12, 0))));
        assert_eq!(
            first("review next Wednesday"),
            Some(("next Wednesday".into(), at(2026, 3, 11, 12, 0)))
        );
    }

    #[test]
    fn casual_days_keep_time_of_day() {
        assert_eq!(first("call mom tomorrow"), Some(("tomorrow".into(), at(2026, 3, 5, 9, 30))));
        assert_eq!(first("today: gym"), Some(("today".into(), at(2026, 3, 4, 9, 30))));
        assert_eq!(first("movie tonight"), Some(("tonight".into(), at(2026, 3, 4, 22, 0))));
    }

    #[test]
    fn day_and_time_merge() {
        assert_eq!(
            first("Dentist tomorrow at 5pm sharp"),
            Some(("tomorrow at 5pm".into(), at(2026, 3, 5, 17, 0)))
        );
        assert_eq!(first("Demo 3pm Friday"), Some(("3pm Friday".into(), at(2026, 3, 6, 15, 0))));
        assert_eq!(
            first("Launch 10:30 on March 10th"),
            Some(("10:30 on March 10th".into(), at(2026, 3, 10, 10, 30)))
        );
    }

    #[test]
    fn lone_times_roll_to_tomorrow_when_past() {
        assert_eq!(first("Run at 8am"), Some(("8am".into(), at(2026, 3, 5, 8, 0))));
        assert_eq!(first("Lunch at noon"), Some(("noon".into(), at(2026, 3, 4, 12, 0))));
        assert_eq!(first("Backup midnight"), Some(("midnight".into(), at(2026, 3, 5, 0, 0))));
        assert_eq!(first("Call 12:15 p.m."), Some(("12:15 p.m.".into(), at(2026, 3, 4, 12, 15))));
    }

    #[test]
    fn same_day_expressions_never_land_in_the_past() {
        let afternoon = at(2026, 3, 4, 15, 30);
        let resolve = |text: &str| find_first(text, afternoon).map(|m| m.at);

        assert_eq!(resolve("Review wednesday"), Some(at(2026, 3, 11, 12, 0)));
        assert_eq!(resolve("Standup Wed at 9am"), Some(at(2026, 3, 11, 9, 0)));
        assert_eq!(resolve("Retro wed at 5pm"), Some(at(2026, 3, 4, 17, 0)));
        assert_eq!(resolve("Pay rent March 4"), Some(at(2027, 3, 4, 12, 0)));
        assert_eq!(resolve("Pay rent 3/4"), Some(at(2027, 3, 4, 12, 0)));
        assert_eq!(resolve("Pay rent March 4 at 6pm"), Some(at(2026, 3, 4, 18, 0)));
        assert_eq!(resolve("Movie tonight"), Some(at(2026, 3, 4, 22, 0)));

        // Explicit years and `today` are taken as written
        assert_eq!(resolve("Filed 2026-03-04"), Some(at(2026, 3, 4, 12, 0)));
        assert_eq!(resolve("Lunch today at noon"), Some(at(2026, 3, 4, 12, 0)));

        let late = at(2026, 3, 4, 23, 0);
        assert_eq!(find_first("Movie tonight", late).map(|m| m.at), Some(at(2026, 3, 5, 22, 0)));
    }

    #[test]
    fn relative_offsets() {
        assert_eq!(first("Ping in 2 hours"), Some(("in 2 hours".into(), at(2026, 3, 4, 11, 30))));
        assert_eq!(first("Renew in a week"), Some(("in a week".into(), at(2026, 3, 11, 9, 30))));
        assert_eq!(first("Taxes in 1 month"), Some(("in 1 month".into(), at(2026, 4, 4, 9, 30))));
        assert_eq!(first("Plan next week"), Some(("next week".into(), at(2026, 3, 11, 9, 30))));
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(first("Pay rent 2026-04-01"), Some(("2026-04-01".into(), at(2026, 4, 1, 12, 0))));
        assert_eq!(first("Trip March 1"), Some(("March 1".into(), at(2027, 3, 1, 12, 0))));
        assert_eq!(first("Party 21st June"), Some(("21st June".into(), at(2026, 6, 21, 12, 0))));
        assert_eq!(first("File by 4/15"), Some(("4/15".into(), at(2026, 4, 15, 12, 0))));
        assert_eq!(first("Renew Jan 5, 2028"), Some(("Jan 5, 2028".into(), at(2028, 1, 5, 12, 0))));
    }

    #[test]
    fn invalid_or_absent_dates() {
        assert_eq!(first("Buy milk"), None);
        assert_eq!(first("Room 101 has 5 apples"), None);
        assert_eq!(first("Deadline Feb 30"), None);
        assert_eq!(first("Mayonnaise 5"), None);
    }

    #[test]
    fn earliest_expression_wins() {
        assert_eq!(
            first("Call Friday about the March 10 launch"),
            Some(("Friday".into(), at(2026, 3, 6, 12, 0)))
        );
    }

    #[test]
    fn extract_cleans_dangling_prepositions() {
        let draft = extract(Draft::new("Meeting by Friday "), now());
        assert_eq!(draft.fields.due_date, Some(at(2026, 3, 6, 12, 0)));
        assert_eq!(draft.text.trim(), "Meeting");

        let draft = extract(Draft::new("Call at the office tomorrow"), now());
        assert_eq!(draft.text.trim(), "Call the office");
    }

    #[test]
    fn extract_without_date_leaves_text_alone() {
        let draft = extract(Draft::new("Stand by me"), now());
        assert_eq!(draft.text, "Stand by me");
        assert!(draft.fields.due_date.is_none());
    }
}
