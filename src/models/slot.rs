use chrono::{Duration, NaiveTime};
use serde::Serialize;

/// The bookable time-slot labels of a day: every `interval_minutes` from
/// `first` up to and including `last`, rendered as `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    first: NaiveTime,
    last: NaiveTime,
    interval_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub time_slot: String,
    pub available: bool,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            first: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            last: NaiveTime::from_hms_opt(17, 30, 0).unwrap_or_default(),
            interval_minutes: 30,
        }
    }
}

impl SlotGrid {
    pub fn new(first: &str, last: &str, interval_minutes: u32) -> anyhow::Result<Self> {
        let first = parse_time(first)?;
        let last = parse_time(last)?;
        if interval_minutes == 0 || interval_minutes > 24 * 60 {
            return Err(anyhow::anyhow!(
                "slot interval out of range: {interval_minutes}"
            ));
        }
        if last < first {
            return Err(anyhow::anyhow!(
                "last slot {last} is before first slot {first}"
            ));
        }
        Ok(Self {
            first,
            last,
            interval_minutes,
        })
    }

    pub fn labels(&self) -> Vec<String> {
        let step = Duration::minutes(self.interval_minutes as i64);
        let mut labels = vec![];
        let mut current = self.first;
        loop {
            labels.push(current.format("%H:%M").to_string());
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 || next > self.last || next <= current {
                break;
            }
            current = next;
        }
        labels
    }

    /// The grid's own spelling of `label`, if `label` names a slot of the
    /// grid. Only the exact `HH:MM` form with ASCII digits is accepted, so one
    /// slot has exactly one key in storage.
    pub fn canonical(&self, label: &str) -> Option<String> {
        let bytes = label.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !well_formed {
            return None;
        }
        let time = parse_time(label).ok()?;
        if time < self.first || time > self.last {
            return None;
        }
        let offset = (time - self.first).num_minutes();
        if offset % self.interval_minutes as i64 != 0 {
            return None;
        }
        Some(time.format("%H:%M").to_string())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.canonical(label).is_some()
    }

    pub fn to_human_readable(&self) -> String {
        format!(
            "{}-{} every {} minutes",
            self.first.format("%H:%M"),
            self.last.format("%H:%M"),
            self.interval_minutes
        )
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour = parse_digits(parts[0]).ok_or_else(|| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute =
        parse_digits(parts[1]).ok_or_else(|| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

/// `u32::from_str` also takes a leading `+`; time fields are digits only.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
