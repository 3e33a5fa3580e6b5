use time::{Date, Time, Weekday};
use uuid::Uuid;

/// One block of recurring weekly availability, owned by exactly one
/// `Schedule`. `begin_time < end_time` is enforced where ranges are edited,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTimeRange {
    pub day: Weekday,
    pub begin_time: Time,
    pub end_time: Time,
}

/// A technician's recurring weekly availability rule. Deactivation
/// soft-closes the rule by setting `effective_end` to the current date so
/// that slots already booked against it keep their history.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: Uuid,
    pub technician_id: Uuid,
    pub salon_id: Uuid,
    pub effective_start: Date,
    pub effective_end: Option<Date>,
    /// Blocked time rather than availability. Stored but not yet subtracted
    /// from slot computation; pending product clarification.
    pub is_outage: bool,
    pub day_ranges: Vec<DayTimeRange>,
    pub release_window_days: i32,
}

impl Schedule {
    pub fn is_active_on(&self, date: Date) -> bool {
        self.effective_start <= date && self.effective_end.map_or(true, |end| end >= date)
    }
}

/// Day-of-week column mapping, Sunday = 0 through Saturday = 6.
pub fn weekday_to_number(day: Weekday) -> i16 {
    day.number_days_from_sunday() as i16
}

pub fn weekday_from_number(n: i16) -> Option<Weekday> {
    match n {
        0 => Some(Weekday::Sunday),
        1 => Some(Weekday::Monday),
        2 => Some(Weekday::Tuesday),
        3 => Some(Weekday::Wednesday),
        4 => Some(Weekday::Thursday),
        5 => Some(Weekday::Friday),
        6 => Some(Weekday::Saturday),
        _ => None,
    }
}
