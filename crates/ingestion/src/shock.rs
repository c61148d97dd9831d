//! Market shock-event labelling.
//!
//! Tags dates that fall inside known market stress periods. The label is a
//! model feature (`shock_event_binary`) and is carried on each indicator row.

use chrono::NaiveDate;
use optval_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A named, inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockEvent {
    /// Event label (e.g., "covid_crash").
    pub label: String,
    /// First day of the event.
    pub start: NaiveDate,
    /// Last day of the event.
    pub end: NaiveDate,
}

impl ShockEvent {
    /// Create an event; `start` must not be after `end`.
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let label = label.into();
        if start > end {
            return Err(Error::invalid_input(format!(
                "shock event {label}: start {start} is after end {end}"
            )));
        }
        Ok(Self { label, start, end })
    }

    /// Whether `date` lies inside the event.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Ordered collection of shock events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockCalendar {
    events: Vec<ShockEvent>,
}

impl ShockCalendar {
    /// Build a calendar from explicit events.
    pub fn new(events: Vec<ShockEvent>) -> Self {
        Self { events }
    }

    /// Calendar without any events.
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// Parse a JSON array of events.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let events: Vec<ShockEvent> = serde_json::from_str(s)?;
        for event in &events {
            if event.start > event.end {
                return Err(Error::invalid_input(format!(
                    "shock event {}: start {} is after end {}",
                    event.label, event.start, event.end
                )));
            }
        }
        Ok(Self { events })
    }

    /// Label of the event covering `date`; later events win on overlap.
    pub fn label(&self, date: NaiveDate) -> Option<&str> {
        self.events
            .iter()
            .rev()
            .find(|e| e.contains(date))
            .map(|e| e.label.as_str())
    }

    /// Events in insertion order.
    pub fn events(&self) -> &[ShockEvent] {
        &self.events
    }
}

impl Default for ShockCalendar {
    fn default() -> Self {
        let ranges = [
            ("volmageddon", (2018, 2, 1), (2018, 3, 31)),
            ("2018_q4_selloff", (2018, 10, 1), (2018, 12, 31)),
            ("covid_crash", (2020, 2, 15), (2020, 5, 1)),
            ("ukraine_crisis", (2022, 2, 1), (2022, 5, 1)),
            ("fed_hike_inflation", (2022, 6, 1), (2022, 12, 31)),
            ("svb_crisis", (2023, 3, 1), (2023, 6, 1)),
        ];
        let events = ranges
            .iter()
            .filter_map(|&(label, (sy, sm, sd), (ey, em, ed))| {
                let start = NaiveDate::from_ymd_opt(sy, sm, sd)?;
                let end = NaiveDate::from_ymd_opt(ey, em, ed)?;
                Some(ShockEvent {
                    label: label.to_string(),
                    start,
                    end,
                })
            })
            .collect();
        Self { events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_calendar() {
        let calendar = ShockCalendar::default();
        assert_eq!(calendar.events().len(), 6);
        assert_eq!(calendar.label(date(2020, 3, 16)), Some("covid_crash"));
        assert_eq!(calendar.label(date(2018, 2, 1)), Some("volmageddon"));
        assert_eq!(calendar.label(date(2018, 3, 31)), Some("volmageddon"));
        assert_eq!(calendar.label(date(2023, 6, 2)), None);
        assert_eq!(calendar.label(date(2021, 7, 1)), None);
    }

    #[test]
    fn test_later_event_wins() {
        let calendar = ShockCalendar::new(vec![
            ShockEvent::new("wide", date(2020, 1, 1), date(2020, 12, 31)).unwrap(),
            ShockEvent::new("narrow", date(2020, 3, 1), date(2020, 3, 31)).unwrap(),
        ]);
        assert_eq!(calendar.label(date(2020, 3, 15)), Some("narrow"));
        assert_eq!(calendar.label(date(2020, 6, 15)), Some("wide"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(ShockEvent::new("bad", date(2020, 2, 1), date(2020, 1, 1)).is_err());
        let json = r#"[{"label": "bad", "start": "2020-02-01", "end": "2020-01-01"}]"#;
        assert!(ShockCalendar::from_json_str(json).is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{"label": "flash_crash", "start": "2010-05-06", "end": "2010-05-06"}]"#;
        let calendar = ShockCalendar::from_json_str(json).unwrap();
        assert_eq!(calendar.label(date(2010, 5, 6)), Some("flash_crash"));
        assert!(ShockCalendar::empty().label(date(2010, 5, 6)).is_none());
    }
}
