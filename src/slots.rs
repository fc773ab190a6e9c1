//! Time-slot generation for the day view.
//!
//! Labels use the 12-hour `"H:MM AM"` format. The range filters compare the
//! display-hour token of a label, not the 24-hour value, which is why
//! `12:00 PM` is not part of the afternoon and `5:00 PM` belongs to both the
//! afternoon and the evening.

use chrono::{NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("unsupported time increment: {0} (use 15, 30 or 60)")]
    UnsupportedIncrement(String),
    #[error("unknown display range: {0} (use all, morning, afternoon or evening)")]
    UnknownRange(String),
    #[error("invalid time: {0} (use H:MM AM/PM or HH:MM)")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeIncrement {
    Fifteen,
    #[default]
    Thirty,
    Sixty,
}

impl TimeIncrement {
    pub const ALL: [TimeIncrement; 3] = [
        TimeIncrement::Fifteen,
        TimeIncrement::Thirty,
        TimeIncrement::Sixty,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            TimeIncrement::Fifteen => 15,
            TimeIncrement::Thirty => 30,
            TimeIncrement::Sixty => 60,
        }
    }

    pub fn next(self) -> Self {
        match self {
            TimeIncrement::Fifteen => TimeIncrement::Thirty,
            TimeIncrement::Thirty => TimeIncrement::Sixty,
            TimeIncrement::Sixty => TimeIncrement::Fifteen,
        }
    }
}

impl TryFrom<u32> for TimeIncrement {
    type Error = SlotError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        TimeIncrement::ALL
            .into_iter()
            .find(|inc| inc.minutes() == minutes)
            .ok_or_else(|| SlotError::UnsupportedIncrement(minutes.to_string()))
    }
}

impl FromStr for TimeIncrement {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes: u32 = s
            .trim()
            .parse()
            .map_err(|_| SlotError::UnsupportedIncrement(s.to_string()))?;
        TimeIncrement::try_from(minutes)
    }
}

impl fmt::Display for TimeIncrement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRange {
    #[default]
    All,
    Morning,
    Afternoon,
    Evening,
}

impl DisplayRange {
    pub fn label(self) -> &'static str {
        match self {
            DisplayRange::All => "all",
            DisplayRange::Morning => "morning",
            DisplayRange::Afternoon => "afternoon",
            DisplayRange::Evening => "evening",
        }
    }

    pub fn next(self) -> Self {
        match self {
            DisplayRange::All => DisplayRange::Morning,
            DisplayRange::Morning => DisplayRange::Afternoon,
            DisplayRange::Afternoon => DisplayRange::Evening,
            DisplayRange::Evening => DisplayRange::All,
        }
    }

    fn keeps(self, label: &SlotLabel) -> bool {
        match self {
            DisplayRange::All => true,
            DisplayRange::Morning => label.period == Period::Am,
            DisplayRange::Afternoon => label.period == Period::Pm && label.hour < 6,
            DisplayRange::Evening => label.period == Period::Pm && label.hour >= 5,
        }
    }
}

impl FromStr for DisplayRange {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DisplayRange::All),
            "morning" => Ok(DisplayRange::Morning),
            "afternoon" => Ok(DisplayRange::Afternoon),
            "evening" => Ok(DisplayRange::Evening),
            _ => Err(SlotError::UnknownRange(s.to_string())),
        }
    }
}

impl fmt::Display for DisplayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Am,
    Pm,
}

/// The tokens of a slot label as displayed: `hour` is the 12-hour value (1..=12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLabel {
    pub hour: u32,
    pub minute: u32,
    pub period: Period,
}

impl SlotLabel {
    pub fn minutes(&self) -> u32 {
        let hour24 = match self.period {
            Period::Am => self.hour % 12,
            Period::Pm => self.hour % 12 + 12,
        };
        hour24 * 60 + self.minute
    }
}

/// Every slot of the day at the given increment, starting at `12:00 AM`.
pub fn generate_slots(increment: TimeIncrement) -> Vec<String> {
    (0..MINUTES_PER_DAY)
        .step_by(increment.minutes() as usize)
        .map(format_label)
        .collect()
}

pub fn filter_by_range(slots: &[String], range: DisplayRange) -> Vec<String> {
    if range == DisplayRange::All {
        return slots.to_vec();
    }
    slots
        .iter()
        .filter(|slot| parse_label(slot).is_some_and(|label| range.keeps(&label)))
        .cloned()
        .collect()
}

pub fn format_label(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hour = minutes / 60;
    let minute = minutes % 60;
    let period = if hour < 12 { "AM" } else { "PM" };
    let display_hour = if hour % 12 == 0 { 12 } else { hour % 12 };
    format!("{}:{:02} {}", display_hour, minute, period)
}

/// Parses a strict `H:MM AM|PM` label. The hour has no leading zero and the minute is two digits.
pub fn parse_label(label: &str) -> Option<SlotLabel> {
    let (time, period) = label.split_once(' ')?;
    let period = match period {
        "AM" => Period::Am,
        "PM" => Period::Pm,
        _ => return None,
    };
    let (hour, minute) = time.split_once(':')?;
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hour.len()) || hour.starts_with('0') || !all_digits(hour) {
        return None;
    }
    if minute.len() != 2 || !all_digits(minute) {
        return None;
    }
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if !(1..=12).contains(&hour) || minute >= 60 {
        return None;
    }
    Some(SlotLabel {
        hour,
        minute,
        period,
    })
}

pub fn label_minutes(label: &str) -> Option<u32> {
    parse_label(label).map(|l| l.minutes())
}

/// The slot a time falls into, rounding down to the increment grid.
pub fn slot_for(label: &str, increment: TimeIncrement) -> Option<String> {
    let minutes = label_minutes(label)?;
    let step = increment.minutes();
    Some(format_label(minutes - minutes % step))
}

/// Accepts `3:00 PM`, `3:00pm` or `15:00` and returns the canonical label.
pub fn normalize_time(input: &str) -> Result<String, SlotError> {
    let raw = input.trim();
    let upper = raw.to_ascii_uppercase();
    let spaced = match upper.strip_suffix("AM").or_else(|| upper.strip_suffix("PM")) {
        Some(time) => format!("{} {}", time.trim(), &upper[upper.len() - 2..]),
        None => upper.clone(),
    };
    if let Some(label) = parse_label(&spaced) {
        return Ok(format_label(label.minutes()));
    }
    let time = NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| SlotError::InvalidTime(input.to_string()))?;
    Ok(format_label(time.hour() * 60 + time.minute()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn hourly(hours: &[&str]) -> Vec<String> {
        hours.iter().map(|h| h.to_string()).collect()
    }

    #[test_case(TimeIncrement::Fifteen, 96)]
    #[test_case(TimeIncrement::Thirty, 48)]
    #[test_case(TimeIncrement::Sixty, 24)]
    fn test_generate_slots_covers_the_day(increment: TimeIncrement, expected: usize) {
        let slots = generate_slots(increment);
        assert_eq!(slots.len(), expected);
        assert_eq!(slots[0], "12:00 AM");

        let minutes: Vec<u32> = slots.iter().map(|s| label_minutes(s).unwrap()).collect();
        for pair in minutes.windows(2) {
            assert_eq!(pair[1] - pair[0], increment.minutes());
        }
        assert_eq!(*minutes.last().unwrap(), MINUTES_PER_DAY - increment.minutes());
    }

    #[test]
    fn test_generate_slots_labels_noon_and_late_evening() {
        let slots = generate_slots(TimeIncrement::Thirty);
        assert_eq!(slots[1], "12:30 AM");
        assert_eq!(slots[24], "12:00 PM");
        assert_eq!(slots[47], "11:30 PM");
    }

    #[test]
    fn test_filter_all_is_identity() {
        let mut slots = generate_slots(TimeIncrement::Fifteen);
        slots.push("not a time".into());
        assert_eq!(filter_by_range(&slots, DisplayRange::All), slots);
    }

    #[test]
    fn test_filter_morning() {
        let morning = filter_by_range(&generate_slots(TimeIncrement::Sixty), DisplayRange::Morning);
        let expected: Vec<String> = std::iter::once("12:00 AM".to_string())
            .chain((1..=11).map(|h| format!("{}:00 AM", h)))
            .collect();
        assert_eq!(morning, expected);
    }

    #[test]
    fn test_filter_afternoon_skips_noon() {
        let afternoon =
            filter_by_range(&generate_slots(TimeIncrement::Sixty), DisplayRange::Afternoon);
        assert_eq!(
            afternoon,
            hourly(&["1:00 PM", "2:00 PM", "3:00 PM", "4:00 PM", "5:00 PM"])
        );
    }

    #[test]
    fn test_filter_evening_overlaps_five_pm() {
        let evening = filter_by_range(&generate_slots(TimeIncrement::Sixty), DisplayRange::Evening);
        assert_eq!(
            evening,
            hourly(&[
                "12:00 PM", "5:00 PM", "6:00 PM", "7:00 PM", "8:00 PM", "9:00 PM", "10:00 PM",
                "11:00 PM"
            ])
        );
    }

    #[test]
    fn test_filter_excludes_malformed_labels() {
        let slots = hourly(&[
            "1:00 PM", "13:00 PM", "garbage", "9:00 am", "+3:00 PM", "3:5 PM", "03:00 PM",
            "3:00  PM", "3:00 PM",
        ]);
        assert_eq!(
            filter_by_range(&slots, DisplayRange::Afternoon),
            hourly(&["1:00 PM", "3:00 PM"])
        );
        assert!(filter_by_range(&slots, DisplayRange::Morning).is_empty());
    }

    #[test_case(15, Ok(TimeIncrement::Fifteen))]
    #[test_case(60, Ok(TimeIncrement::Sixty))]
    #[test_case(45, Err(SlotError::UnsupportedIncrement("45".into())))]
    #[test_case(0, Err(SlotError::UnsupportedIncrement("0".into())))]
    fn test_increment_from_minutes(minutes: u32, expected: Result<TimeIncrement, SlotError>) {
        assert_eq!(TimeIncrement::try_from(minutes), expected);
    }

    #[test]
    fn test_increment_from_str_rejects_text() {
        assert!("thirty".parse::<TimeIncrement>().is_err());
        assert_eq!(" 30 ".parse::<TimeIncrement>(), Ok(TimeIncrement::Thirty));
    }

    #[test_case("3:10 PM", TimeIncrement::Thirty, "3:00 PM")]
    #[test_case("3:45 PM", TimeIncrement::Thirty, "3:30 PM")]
    #[test_case("12:59 AM", TimeIncrement::Sixty, "12:00 AM")]
    #[test_case("11:14 PM", TimeIncrement::Fifteen, "11:00 PM")]
    fn test_slot_for_rounds_down(label: &str, increment: TimeIncrement, expected: &str) {
        assert_eq!(slot_for(label, increment).as_deref(), Some(expected));
    }

    #[test_case("3:00 PM", "3:00 PM")]
    #[test_case("3:00pm", "3:00 PM")]
    #[test_case(" 9:05 am ", "9:05 AM")]
    #[test_case("15:00", "3:00 PM")]
    #[test_case("00:30", "12:30 AM")]
    fn test_normalize_time(input: &str, expected: &str) {
        assert_eq!(normalize_time(input).unwrap(), expected);
    }

    #[test]
    fn test_normalize_time_rejects_nonsense() {
        assert!(normalize_time("25:00").is_err());
        assert!(normalize_time("13:00 PM").is_err());
        assert!(normalize_time("soon").is_err());
        assert!(normalize_time("3:5pm").is_err());
        assert!(normalize_time("+3:00 PM").is_err());
    }
}
