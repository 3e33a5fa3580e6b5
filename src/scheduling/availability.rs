use std::collections::{btree_map::Entry, BTreeMap, BTreeSet};

use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::db::models::{Agreement, Schedule, Service};

use super::overlap::overlaps;

/// Step between generated candidate start times. Trades slot density for
/// simplicity; overridable through `BOOKING_SLOT_GRANULARITY_MINUTES`.
pub const DEFAULT_SLOT_GRANULARITY_MINUTES: i32 = 5;

pub(crate) fn minute_of_day(t: Time) -> i32 {
    t.hour() as i32 * 60 + t.minute() as i32
}

fn time_from_minute(m: i32) -> Option<Time> {
    Time::from_hms((m / 60) as u8, (m % 60) as u8, 0).ok()
}

/// Computes the ordered bookable start times for one technician's schedules
/// on one date.
///
/// Candidates come from every day-time range whose weekday matches `date` on
/// a schedule active that date, stepping from the range's begin time while
/// the full service still fits before the range's end. When `date` is today,
/// a range whose begin time has already passed is dropped whole rather than
/// trimmed to the current time (matches the booking flow's long-standing
/// behavior; partial-range trimming would be a product change).
///
/// `existing` must already be restricted to this technician's Pending and
/// Confirmed agreements on `date`; any candidate overlapping one of them is
/// excluded under the half-open rule.
pub fn available_start_times(
    schedules: &[Schedule],
    date: Date,
    service_duration_minutes: i32,
    existing: &[Agreement],
    now: OffsetDateTime,
    granularity_minutes: i32,
) -> Vec<Time> {
    let mut candidates: BTreeSet<Time> = BTreeSet::new();

    for schedule in schedules.iter().filter(|s| s.is_active_on(date)) {
        for range in &schedule.day_ranges {
            if range.day != date.weekday() {
                continue;
            }
            if date == now.date() && now.time() > range.begin_time {
                continue;
            }

            let end = minute_of_day(range.end_time);
            let mut cursor = minute_of_day(range.begin_time);
            while cursor + service_duration_minutes <= end {
                if let Some(t) = time_from_minute(cursor) {
                    candidates.insert(t);
                }
                cursor += granularity_minutes;
            }
        }
    }

    if existing.is_empty() {
        return candidates.into_iter().collect();
    }

    candidates
        .into_iter()
        .filter(|&candidate| {
            let start = minute_of_day(candidate);
            let end = start + service_duration_minutes;
            !existing.iter().any(|agreement| {
                let booked_start = minute_of_day(agreement.start_time);
                let booked_end = booked_start + agreement.service.duration_minutes;
                overlaps(start, end, booked_start, booked_end)
            })
        })
        .collect()
}

/// One technician's open start times for one service on one date, the unit
/// callers fan out over when aggregating across technicians and dates.
#[derive(Debug, Clone, PartialEq)]
pub struct TechSlotsOnDate {
    pub technician_id: Uuid,
    pub date: Date,
    pub service: Service,
    pub start_times: Vec<Time>,
}

/// Groups fan-out results on (technician, date, service), merging and
/// de-duplicating their start times, ordered by (date, technician).
/// Idempotent: normalizing normalized output changes nothing.
pub fn normalize(slots: Vec<TechSlotsOnDate>) -> Vec<TechSlotsOnDate> {
    let mut grouped: BTreeMap<(Date, Uuid, Uuid), TechSlotsOnDate> = BTreeMap::new();

    for slot in slots {
        match grouped.entry((slot.date, slot.technician_id, slot.service.id)) {
            Entry::Occupied(mut entry) => entry.get_mut().start_times.extend(slot.start_times),
            Entry::Vacant(entry) => {
                entry.insert(slot);
            }
        }
    }

    grouped
        .into_values()
        .map(|mut slot| {
            slot.start_times.sort();
            slot.start_times.dedup();
            slot
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};
    use time::Weekday;

    use crate::db::models::{AgreementStatus, DayTimeRange};

    use super::*;

    // 2026-03-02 is a Monday
    const MONDAY: Date = date!(2026 - 03 - 02);

    fn service(duration_minutes: i32) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: "Pedicure".into(),
            duration_minutes,
            max_participants: 1,
        }
    }

    fn monday_morning_schedule() -> Schedule {
        Schedule {
            id: Uuid::new_v4(),
            technician_id: Uuid::new_v4(),
            salon_id: Uuid::new_v4(),
            effective_start: date!(2026 - 01 - 01),
            effective_end: None,
            is_outage: false,
            day_ranges: vec![DayTimeRange {
                day: Weekday::Monday,
                begin_time: time!(09:00),
                end_time: time!(12:00),
            }],
            release_window_days: 30,
        }
    }

    fn agreement_at(start: Time, duration_minutes: i32) -> Agreement {
        Agreement {
            id: Uuid::new_v4(),
            date: MONDAY,
            start_time: start,
            service: service(duration_minutes),
            technician_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "Robin".into(),
            client_email: "robin@example.com".into(),
            salon_id: Uuid::new_v4(),
            status: AgreementStatus::Confirmed,
            confirm_token_hash: None,
            expires_at: None,
            confirmed_at: None,
            created_at: datetime!(2026-02-01 00:00 UTC),
        }
    }

    // A week earlier so the same-day cutoff never applies unless a test wants it.
    const EARLIER: OffsetDateTime = datetime!(2026-02-23 08:00 UTC);

    #[test]
    fn monday_nine_to_noon_thirty_minute_slots() {
        let slots =
            available_start_times(&[monday_morning_schedule()], MONDAY, 30, &[], EARLIER, 5);

        assert_eq!(slots.len(), 31);
        assert_eq!(slots.first(), Some(&time!(09:00)));
        assert_eq!(slots.last(), Some(&time!(11:30)));
        assert!(slots.windows(2).all(|w| w[0] < w[1]), "ascending and unique");
    }

    #[test]
    fn every_slot_fits_inside_its_range() {
        let slots =
            available_start_times(&[monday_morning_schedule()], MONDAY, 45, &[], EARLIER, 5);

        for slot in slots {
            assert!(slot >= time!(09:00));
            assert!(minute_of_day(slot) + 45 <= minute_of_day(time!(12:00)));
        }
    }

    #[test]
    fn dates_outside_effective_window_yield_nothing() {
        let mut schedule = monday_morning_schedule();
        schedule.effective_start = date!(2026 - 03 - 09);
        assert!(available_start_times(&[schedule], MONDAY, 30, &[], EARLIER, 5).is_empty());

        let mut closed = monday_morning_schedule();
        closed.effective_end = Some(date!(2026 - 02 - 28));
        assert!(available_start_times(&[closed], MONDAY, 30, &[], EARLIER, 5).is_empty());
    }

    #[test]
    fn non_matching_weekday_yields_nothing() {
        let tuesday = date!(2026 - 03 - 03);
        let slots =
            available_start_times(&[monday_morning_schedule()], tuesday, 30, &[], EARLIER, 5);
        assert!(slots.is_empty());
    }

    #[test]
    fn half_open_exclusion_around_existing_appointment() {
        // Existing 10:00-10:30 appointment. A 30-minute candidate conflicts
        // iff it starts strictly between 09:30 and 10:30, so 09:30 (ending
        // exactly at 10:00) and 10:30 both survive.
        let booked = agreement_at(time!(10:00), 30);
        let slots = available_start_times(
            &[monday_morning_schedule()],
            MONDAY,
            30,
            &[booked.clone()],
            EARLIER,
            5,
        );

        assert!(slots.contains(&time!(09:30)));
        assert!(slots.contains(&time!(10:30)));
        for excluded in [time!(09:35), time!(09:40), time!(10:00), time!(10:25)] {
            assert!(!slots.contains(&excluded), "{excluded} should conflict");
        }

        // and nothing returned overlaps the booked interval
        for slot in &slots {
            assert!(!overlaps(
                minute_of_day(*slot),
                minute_of_day(*slot) + 30,
                minute_of_day(booked.start_time),
                minute_of_day(booked.start_time) + 30,
            ));
        }
    }

    #[test]
    fn same_day_cutoff_drops_whole_started_range() {
        // now is 09:05 on the requested Monday: the 09:00 range has begun,
        // so the entire range disappears rather than being trimmed.
        let now = datetime!(2026-03-02 09:05 UTC);
        let slots = available_start_times(&[monday_morning_schedule()], MONDAY, 30, &[], now, 5);
        assert!(slots.is_empty());

        // at exactly 09:00 the range has not "already passed" and still counts
        let on_the_dot = datetime!(2026-03-02 09:00 UTC);
        let slots =
            available_start_times(&[monday_morning_schedule()], MONDAY, 30, &[], on_the_dot, 5);
        assert_eq!(slots.len(), 31);
    }

    #[test]
    fn custom_granularity_changes_step() {
        let slots =
            available_start_times(&[monday_morning_schedule()], MONDAY, 30, &[], EARLIER, 15);
        assert_eq!(slots.first(), Some(&time!(09:00)));
        assert_eq!(slots.get(1), Some(&time!(09:15)));
        assert_eq!(slots.len(), 11);
    }

    #[test]
    fn overlapping_ranges_from_two_schedules_merge_without_duplicates() {
        let tech = Uuid::new_v4();
        let mut first = monday_morning_schedule();
        first.technician_id = tech;
        let mut second = monday_morning_schedule();
        second.technician_id = tech;
        second.day_ranges[0].begin_time = time!(11:00);
        second.day_ranges[0].end_time = time!(14:00);

        let slots = available_start_times(&[first, second], MONDAY, 30, &[], EARLIER, 5);
        assert_eq!(slots.iter().filter(|t| **t == time!(11:00)).count(), 1);
        assert_eq!(slots.last(), Some(&time!(13:30)));
    }

    #[test]
    fn normalize_merges_groups_and_is_idempotent() {
        let tech_a = Uuid::new_v4();
        let tech_b = Uuid::new_v4();
        let svc = service(30);

        let raw = vec![
            TechSlotsOnDate {
                technician_id: tech_b,
                date: MONDAY,
                service: svc.clone(),
                start_times: vec![time!(10:00), time!(09:00)],
            },
            TechSlotsOnDate {
                technician_id: tech_a,
                date: MONDAY,
                service: svc.clone(),
                start_times: vec![time!(09:00)],
            },
            TechSlotsOnDate {
                technician_id: tech_b,
                date: MONDAY,
                service: svc.clone(),
                start_times: vec![time!(09:00), time!(11:00)],
            },
        ];

        let normalized = normalize(raw);
        assert_eq!(normalized.len(), 2);

        let merged = normalized
            .iter()
            .find(|s| s.technician_id == tech_b)
            .unwrap();
        assert_eq!(
            merged.start_times,
            vec![time!(09:00), time!(10:00), time!(11:00)]
        );

        assert_eq!(normalize(normalized.clone()), normalized);
    }

    #[test]
    fn normalize_orders_by_date_then_technician() {
        let tech = Uuid::new_v4();
        let svc = service(30);
        let later = TechSlotsOnDate {
            technician_id: tech,
            date: date!(2026 - 03 - 09),
            service: svc.clone(),
            start_times: vec![time!(09:00)],
        };
        let earlier = TechSlotsOnDate {
            technician_id: tech,
            date: MONDAY,
            service: svc,
            start_times: vec![time!(09:00)],
        };

        let normalized = normalize(vec![later, earlier]);
        assert_eq!(normalized[0].date, MONDAY);
        assert_eq!(normalized[1].date, date!(2026 - 03 - 09));
    }
}
