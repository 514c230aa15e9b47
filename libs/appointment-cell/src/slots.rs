// libs/appointment-cell/src/slots.rs
//
// Bookable times are a fixed, ordered list of half-hour slots inside two
// daily windows (morning and afternoon). Keeping the set closed bounds the
// conflict check to at most a dozen times per doctor per day.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::models::AppointmentError;

pub const SLOT_MINUTES: i64 = 30;

/// Bookings are accepted for dates in [today, today + MAX_ADVANCE_DAYS).
pub const MAX_ADVANCE_DAYS: i64 = 30;

fn window(start: (u32, u32), end: (u32, u32)) -> impl Iterator<Item = NaiveTime> {
    let start = NaiveTime::from_hms_opt(start.0, start.1, 0).expect("valid window start");
    let end = NaiveTime::from_hms_opt(end.0, end.1, 0).expect("valid window end");

    std::iter::successors(Some(start), move |t| {
        let next = *t + Duration::minutes(SLOT_MINUTES);
        (next <= end).then_some(next)
    })
}

/// Morning slot start times: 09:00 through 11:30.
pub fn morning_slots() -> Vec<NaiveTime> {
    window((9, 0), (11, 30)).collect()
}

/// Afternoon slot start times: 14:00 through 16:30.
pub fn afternoon_slots() -> Vec<NaiveTime> {
    window((14, 0), (16, 30)).collect()
}

/// All bookable slot start times for a day, in order.
pub fn all_slots() -> Vec<NaiveTime> {
    let mut slots = morning_slots();
    slots.extend(afternoon_slots());
    slots
}

pub fn is_bookable_slot(time: NaiveTime) -> bool {
    all_slots().contains(&time)
}

/// Enforce the booking horizon: dates before today or at/after
/// today + MAX_ADVANCE_DAYS are not selectable.
pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), AppointmentError> {
    if date < today {
        return Err(AppointmentError::InvalidDate(
            "Appointment date cannot be in the past".to_string(),
        ));
    }
    if date >= today + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(AppointmentError::InvalidDate(format!(
            "Appointments can be booked at most {} days ahead",
            MAX_ADVANCE_DAYS
        )));
    }
    Ok(())
}
