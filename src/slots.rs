use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::BusinessHours;
use crate::model::TimeSlot;
use crate::time::{ClockTime, Minutes};

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Opening window `[open, close)` in minutes for the date's day kind.
pub fn opening_window(date: NaiveDate, hours: &BusinessHours) -> (Minutes, Minutes) {
    let (open, close) = if is_weekend(date) {
        (hours.weekend_open, hours.weekend_close)
    } else {
        (hours.weekday_open, hours.weekday_close)
    };
    (Minutes::from(open) * 60, Minutes::from(close) * 60)
}

/// Candidate start times for `date`, ordered, covering `[open:00, close:00)` at the
/// configured step. No date → no slots.
pub fn generate_time_slots(date: Option<NaiveDate>, hours: &BusinessHours) -> Vec<TimeSlot> {
    let Some(date) = date else { return Vec::new() };
    let (open, close) = opening_window(date, hours);
    let step = hours.step_minutes.max(1);
    (open..close.min(crate::limits::MINUTES_PER_DAY))
        .step_by(usize::from(step))
        .map(|m| TimeSlot {
            date,
            time: ClockTime::new_unchecked(m),
        })
        .collect()
}
