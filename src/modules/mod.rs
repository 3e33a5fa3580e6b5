pub mod availability;
pub mod booking;
pub mod manage;
pub mod salon;
pub mod tech;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time, Weekday};

use crate::error::AppError;

// Wire formats: yyyy-MM-dd dates, HH:mm 24-hour times.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw, DATE_FORMAT)
        .map_err(|_| AppError::Validation(format!("invalid date '{raw}', expected yyyy-MM-dd")))
}

pub fn parse_time(raw: &str) -> Result<Time, AppError> {
    Time::parse(raw, TIME_FORMAT)
        .map_err(|_| AppError::Validation(format!("invalid time '{raw}', expected HH:mm")))
}

pub fn parse_weekday(raw: &str) -> Result<Weekday, AppError> {
    match raw {
        "Monday" => Ok(Weekday::Monday),
        "Tuesday" => Ok(Weekday::Tuesday),
        "Wednesday" => Ok(Weekday::Wednesday),
        "Thursday" => Ok(Weekday::Thursday),
        "Friday" => Ok(Weekday::Friday),
        "Saturday" => Ok(Weekday::Saturday),
        "Sunday" => Ok(Weekday::Sunday),
        _ => Err(AppError::Validation(format!("invalid day of week: {raw}"))),
    }
}

/// Appointments must end by midnight. `Time` plus a duration wraps past it,
/// so a spill-over would silently land on the wrong side of the day in every
/// later comparison.
pub fn ensure_within_day(start: Time, duration_minutes: i32) -> Result<(), AppError> {
    let end = start.hour() as i32 * 60 + start.minute() as i32 + duration_minutes;
    if end > 24 * 60 {
        return Err(AppError::Validation(format!(
            "a {duration_minutes}-minute appointment starting at {} would run past midnight",
            format_time(start)
        )));
    }
    Ok(())
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn format_time(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
