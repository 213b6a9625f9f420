//! Working-time calendar
//!
//! Maps the continuous simulation clock (hours since the start date, day 0 being
//! the first day of the week) onto working and non-working intervals defined by
//! a weekly shift table, and places work durations onto working time only.
//!
//! Working status can only change at a shift edge or at midnight, so the
//! calendar jumps between those boundaries instead of stepping hour by hour.

use crate::simulation::error::{SimulationError, SimulationResult};
use crate::types::Shift;
use tracing::instrument;

const HOURS_PER_DAY: f64 = 24.0;
const DAYS_PER_WEEK: i64 = 7;

/// Horizon after which an uninterrupted working span is treated as endless
const OPEN_SPAN_HORIZON_HOURS: f64 = 2.0 * 7.0 * HOURS_PER_DAY;

/// Boundary jumps allowed in one `advance` before the run is declared stalled
pub const MAX_ADVANCE_ITERATIONS: usize = 10_000;

/// Read-only view of the shift table
#[derive(Debug, Clone)]
pub struct Calendar {
    shifts: Vec<Shift>,
    always_open: bool,
}

impl Calendar {
    /// Build a calendar from a shift table; inactive shifts are dropped
    pub fn new(shifts: &[Shift]) -> Self {
        let mut calendar = Self {
            shifts: shifts.iter().filter(|s| s.active && s.days_per_week > 0).cloned().collect(),
            always_open: false,
        };
        calendar.always_open =
            calendar.is_working_time(0.0) && calendar.working_span_end(0.0).is_none();
        calendar
    }

    /// Calendar with a single shift covering every hour of every day
    pub fn always_open() -> Self {
        Self::new(&[Shift::new("always", 7, 0.0, 24.0)])
    }

    /// Whether any shift can ever be worked
    pub fn has_active_shift(&self) -> bool {
        !self.shifts.is_empty()
    }

    /// Whether the calendar never closes
    pub fn is_always_open(&self) -> bool {
        self.always_open
    }

    /// Whether `t` falls inside a working shift
    pub fn is_working_time(&self, t: f64) -> bool {
        if !t.is_finite() {
            return false;
        }
        let day = (t / HOURS_PER_DAY).floor();
        let hour_of_day = t - day * HOURS_PER_DAY;
        let weekday = (day as i64).rem_euclid(DAYS_PER_WEEK) as u8;
        self.shifts.iter().any(|shift| shift.covers(weekday, hour_of_day))
    }

    /// First shift edge or midnight strictly after `t`
    fn next_boundary(&self, t: f64) -> f64 {
        let day_start = (t / HOURS_PER_DAY).floor() * HOURS_PER_DAY;
        let mut next = day_start + HOURS_PER_DAY;
        for shift in &self.shifts {
            for edge in [shift.start_hour, shift.end_hour] {
                let candidate = day_start + edge;
                if candidate > t && candidate < next {
                    next = candidate;
                }
            }
        }
        next
    }

    /// End of the working span containing `t`, or `None` when it never ends
    fn working_span_end(&self, t: f64) -> Option<f64> {
        let mut boundary = self.next_boundary(t);
        while self.is_working_time(boundary) {
            if boundary - t > OPEN_SPAN_HORIZON_HOURS {
                return None;
            }
            boundary = self.next_boundary(boundary);
        }
        Some(boundary)
    }

    /// Instant at which `work_hours` of working time starting at `start` are done.
    ///
    /// With zero work the result is the first working instant at or after
    /// `start`. Otherwise the result is either a working instant or the closing
    /// edge of the span in which the last piece of work was done.
    #[instrument(level = "trace", skip(self))]
    pub fn advance(&self, start: f64, work_hours: f64) -> SimulationResult<f64> {
        if !start.is_finite() || !work_hours.is_finite() || work_hours < 0.0 {
            return Err(SimulationError::CalendarStalled { at: start, remaining: work_hours });
        }
        if self.always_open {
            return Ok(start + work_hours);
        }

        let mut cursor = start;
        let mut remaining = work_hours;

        for _ in 0..MAX_ADVANCE_ITERATIONS {
            if !self.is_working_time(cursor) {
                cursor = self.next_boundary(cursor);
                continue;
            }
            if remaining <= 0.0 {
                return Ok(cursor);
            }
            match self.working_span_end(cursor) {
                None => return Ok(cursor + remaining),
                Some(end) => {
                    let available = end - cursor;
                    if remaining <= available {
                        return Ok(cursor + remaining);
                    }
                    remaining -= available;
                    cursor = end;
                }
            }
        }

        Err(SimulationError::CalendarStalled { at: cursor, remaining })
    }

    /// Working hours inside `[from, to)`
    pub fn working_hours_between(&self, from: f64, to: f64) -> f64 {
        if !(to > from) {
            return 0.0;
        }
        if self.always_open {
            return to - from;
        }

        // A single span is returned as one subtraction to keep it exact
        if self.is_working_time(from) && self.working_span_end(from).map_or(true, |end| end >= to) {
            return to - from;
        }

        let mut total = 0.0;
        let mut cursor = from;
        while cursor < to {
            let next = self.next_boundary(cursor).min(to);
            if self.is_working_time(cursor) {
                total += next - cursor;
            }
            cursor = next;
        }
        total
    }

    /// Whole hours in `[0, duration)` that start inside a shift
    pub fn paid_hours(&self, duration: f64) -> f64 {
        let mut paid = 0u64;
        let mut hour = 0u64;
        while (hour as f64) < duration {
            if self.is_working_time(hour as f64) {
                paid += 1;
            }
            hour += 1;
        }
        paid as f64
    }
}
