use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use ulid::Ulid;

use crate::availability::AvailabilityIndex;
use crate::config::BusinessHours;
use crate::model::{BookingInterval, TimeSlot};
use crate::slots::{generate_time_slots, opening_window};
use crate::time::{ClockTime, Minutes};

/// `now` as a wall-clock reading in the business timezone.
pub fn business_now(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    now.with_timezone(&offset).naive_local()
}

/// Why a slot can or cannot be picked. Checks run in declaration order, so a blocked
/// date reports `Blocked` even for past or overlapping slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Blocked,
    Past,
    /// Not a start time the slot generator offers for that date.
    OffGrid,
    /// The session would not fit before midnight.
    OutOfDay,
    Overlapping(Ulid),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Everything the predicate needs for one date.
pub struct SlotContext<'a> {
    pub hours: &'a BusinessHours,
    pub blocked_reason: Option<&'a str>,
    pub index: &'a AvailabilityIndex,
    pub now: NaiveDateTime,
    pub duration_total: Minutes,
}

impl SlotContext<'_> {
    pub fn evaluate(&self, date: NaiveDate, time: ClockTime) -> Eligibility {
        if self.blocked_reason.is_some() {
            return Eligibility::Blocked;
        }
        if date < self.now.date() {
            return Eligibility::Past;
        }
        if date == self.now.date() && seconds_of(self.now) > time_as_seconds(time) {
            return Eligibility::Past;
        }
        if !self.is_slot_start(date, time) {
            return Eligibility::OffGrid;
        }
        let Some(candidate) = BookingInterval::new(date, time, self.duration_total) else {
            return Eligibility::OutOfDay;
        };
        match self.index.conflicting(&candidate) {
            Some(id) => Eligibility::Overlapping(id),
            None => Eligibility::Eligible,
        }
    }

    /// Inside `[open, close)` for the date and on the step grid counted from opening.
    fn is_slot_start(&self, date: NaiveDate, time: ClockTime) -> bool {
        let (open, close) = opening_window(date, self.hours);
        let step = self.hours.step_minutes.max(1);
        let m = time.minutes();
        (open..close).contains(&m) && (m - open) % step == 0
    }
}

// Compared at second precision so 14:00 is already past at 14:00:30.
fn seconds_of(now: NaiveDateTime) -> u32 {
    now.time().num_seconds_from_midnight()
}

fn time_as_seconds(time: ClockTime) -> u32 {
    u32::from(time.minutes()) * 60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Selected,
    Booked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub time: ClockTime,
    pub label: String,
    pub status: SlotStatus,
}

/// A date's slot grid as the booking form shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DayGrid {
    /// The whole date is unselectable.
    Blocked { date: NaiveDate, reason: String },
    /// Every generated slot, ineligible ones shown as booked rather than omitted.
    Open { date: NaiveDate, slots: Vec<SlotView> },
}

impl DayGrid {
    pub fn available_times(&self) -> Vec<ClockTime> {
        match self {
            DayGrid::Blocked { .. } => Vec::new(),
            DayGrid::Open { slots, .. } => slots
                .iter()
                .filter(|s| s.status != SlotStatus::Booked)
                .map(|s| s.time)
                .collect(),
        }
    }
}

pub fn build_grid(date: NaiveDate, ctx: &SlotContext<'_>, selected: Option<ClockTime>) -> DayGrid {
    if let Some(reason) = ctx.blocked_reason {
        return DayGrid::Blocked {
            date,
            reason: reason.to_string(),
        };
    }
    let slots = generate_time_slots(Some(date), ctx.hours)
        .into_iter()
        .map(|TimeSlot { time, .. }| {
            let status = if !ctx.evaluate(date, time).is_eligible() {
                SlotStatus::Booked
            } else if selected == Some(time) {
                SlotStatus::Selected
            } else {
                SlotStatus::Available
            };
            SlotView {
                time,
                label: time.format_12h(),
                status,
            }
        })
        .collect();
    DayGrid::Open { date, slots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AvailabilityProjection, ReservationStatus};
    use chrono::TimeZone;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, day).unwrap()
    }

    fn at(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn local(day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(day).and_hms_opt(h, m, 0).unwrap()
    }

    fn booked(date: NaiveDate, start: &str, duration: u16) -> AvailabilityProjection {
        AvailabilityProjection {
            id: Ulid::new(),
            date,
            start_time: at(start),
            duration_total: duration,
            status: ReservationStatus::Confirmed,
        }
    }

    #[test]
    fn business_now_uses_offset_not_utc() {
        // 2025-12-19 22:30 UTC is already the 20th at UTC+8.
        let utc = Utc.with_ymd_and_hms(2025, 12, 19, 22, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(business_now(utc, offset), local(20, 6, 30));
    }

    #[test]
    fn past_slot_exclusion_at_1405() {
        let index = AvailabilityIndex::empty(d(20));
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(20, 14, 5),
            duration_total: 30,
        };
        assert_eq!(ctx.evaluate(d(20), at("14:00")), Eligibility::Past);
        assert_eq!(ctx.evaluate(d(20), at("14:30")), Eligibility::Eligible);
        // Future dates are always time-eligible.
        assert_eq!(ctx.evaluate(d(21), at("09:00")), Eligibility::Eligible);
        // Earlier dates never are.
        assert_eq!(ctx.evaluate(d(19), at("18:00")), Eligibility::Past);
    }

    #[test]
    fn slot_at_exact_now_is_eligible() {
        let index = AvailabilityIndex::empty(d(20));
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(20, 14, 0),
            duration_total: 30,
        };
        assert!(ctx.evaluate(d(20), at("14:00")).is_eligible());
    }

    #[test]
    fn blocked_takes_precedence() {
        let index = AvailabilityIndex::empty(d(20));
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: Some("Holiday"),
            index: &index,
            now: local(20, 14, 5),
            duration_total: 30,
        };
        let grid = build_grid(d(20), &ctx, None);
        assert_eq!(
            grid,
            DayGrid::Blocked {
                date: d(20),
                reason: "Holiday".into()
            }
        );
        for slot in generate_time_slots(Some(d(20)), &BusinessHours::default()) {
            assert_eq!(ctx.evaluate(d(20), slot.time), Eligibility::Blocked);
        }
        assert!(grid.available_times().is_empty());
    }

    #[test]
    fn overlap_uses_total_duration() {
        let entries = vec![booked(d(23), "13:00", 30)];
        let index = AvailabilityIndex::build(d(23), &entries);
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(20, 8, 0),
            duration_total: 60,
        };
        // 12:00 + 60 ends exactly at 13:00.
        assert!(ctx.evaluate(d(23), at("12:00")).is_eligible());
        // 12:30 + 60 runs into the 13:00 booking.
        assert!(matches!(ctx.evaluate(d(23), at("12:30")), Eligibility::Overlapping(_)));
        assert!(ctx.evaluate(d(23), at("13:30")).is_eligible());
    }

    #[test]
    fn out_of_day_duration() {
        let index = AvailabilityIndex::empty(d(23));
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(20, 8, 0),
            duration_total: 6 * 60,
        };
        assert_eq!(ctx.evaluate(d(23), at("18:30")), Eligibility::OutOfDay);
    }

    #[test]
    fn grid_marks_booked_and_selected() {
        // Tuesday, now 10:10 on the same day.
        let entries = vec![booked(d(23), "13:00", 30)];
        let index = AvailabilityIndex::build(d(23), &entries);
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(23, 10, 10),
            duration_total: 30,
        };
        let DayGrid::Open { slots, .. } = build_grid(d(23), &ctx, Some(at("15:00"))) else {
            panic!("expected open grid");
        };
        assert_eq!(slots.len(), 18);
        let status_of = |t: &str| slots.iter().find(|s| s.time == at(t)).unwrap().status;
        assert_eq!(status_of("10:00"), SlotStatus::Booked);
        assert_eq!(status_of("10:30"), SlotStatus::Available);
        assert_eq!(status_of("13:00"), SlotStatus::Booked);
        assert_eq!(status_of("13:30"), SlotStatus::Available);
        assert_eq!(status_of("15:00"), SlotStatus::Selected);
        assert_eq!(slots[0].label, "10:00 AM");
    }

    #[test]
    fn start_must_be_a_generated_slot() {
        let index = AvailabilityIndex::empty(d(22));
        let ctx = SlotContext {
            hours: &BusinessHours::default(),
            blocked_reason: None,
            index: &index,
            now: local(20, 14, 5),
            duration_total: 30,
        };
        // Monday opens 10:00-19:00 on a 30-minute step.
        assert_eq!(ctx.evaluate(d(22), at("10:07")), Eligibility::OffGrid);
        assert_eq!(ctx.evaluate(d(22), at("03:07")), Eligibility::OffGrid);
        assert_eq!(ctx.evaluate(d(22), at("09:30")), Eligibility::OffGrid);
        assert_eq!(ctx.evaluate(d(22), at("19:00")), Eligibility::OffGrid);
        assert_eq!(ctx.evaluate(d(22), at("22:00")), Eligibility::OffGrid);
        assert_eq!(ctx.evaluate(d(22), at("10:00")), Eligibility::Eligible);
        assert_eq!(ctx.evaluate(d(22), at("18:30")), Eligibility::Eligible);
        // Saturday opens an hour earlier.
        assert_eq!(ctx.evaluate(d(27), at("09:00")), Eligibility::Eligible);
    }

    #[test]
    fn quarter_hour_step_widens_the_grid() {
        let hours = BusinessHours {
            step_minutes: 15,
            ..BusinessHours::default()
        };
        let index = AvailabilityIndex::empty(d(22));
        let ctx = SlotContext {
            hours: &hours,
            blocked_reason: None,
            index: &index,
            now: local(20, 14, 5),
            duration_total: 30,
        };
        assert!(ctx.evaluate(d(22), at("10:45")).is_eligible());
        assert_eq!(ctx.evaluate(d(22), at("10:50")), Eligibility::OffGrid);
    }
}
