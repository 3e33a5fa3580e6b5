use time::Time;
use uuid::Uuid;

use crate::db::models::Agreement;

use super::availability::minute_of_day;
use super::overlap::overlaps;

/// A descriptive record of one appointment a proposed time would collide
/// with, detailed enough for the manage UI to offer a "force anyway"
/// override instead of a bare rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictInfo {
    pub agreement_id: Uuid,
    pub start_time: Time,
    pub end_time: Time,
    pub client_name: String,
    pub service_name: String,
}

/// Checks a proposed start/duration against a technician's Pending and
/// Confirmed agreements on the target date. `exclude_id` skips the
/// appointment being edited so it never conflicts with itself.
pub fn find_conflicts(
    candidate_start: Time,
    candidate_duration_minutes: i32,
    existing: &[Agreement],
    exclude_id: Option<Uuid>,
) -> Vec<ConflictInfo> {
    // Minutes since midnight: `Time` addition wraps at midnight, which would
    // let a late-running appointment fall out of the comparison.
    let start = minute_of_day(candidate_start);
    let end = start + candidate_duration_minutes;

    existing
        .iter()
        .filter(|agreement| exclude_id != Some(agreement.id))
        .filter(|agreement| {
            let booked_start = minute_of_day(agreement.start_time);
            let booked_end = booked_start + agreement.service.duration_minutes;
            overlaps(start, end, booked_start, booked_end)
        })
        .map(|agreement| ConflictInfo {
            agreement_id: agreement.id,
            start_time: agreement.start_time,
            end_time: agreement.end_time(),
            client_name: agreement.client_name.clone(),
            service_name: agreement.service.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use crate::db::models::{AgreementStatus, Service};

    use super::*;

    fn agreement_at(start: Time, duration_minutes: i32) -> Agreement {
        Agreement {
            id: Uuid::new_v4(),
            date: date!(2026 - 03 - 02),
            start_time: start,
            service: Service {
                id: Uuid::new_v4(),
                name: "Haircut".into(),
                duration_minutes,
                max_participants: 1,
            },
            technician_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            client_name: "Sam".into(),
            client_email: "sam@example.com".into(),
            salon_id: Uuid::new_v4(),
            status: AgreementStatus::Confirmed,
            confirm_token_hash: None,
            expires_at: None,
            confirmed_at: None,
            created_at: datetime!(2026-02-01 00:00 UTC),
        }
    }

    #[test]
    fn reports_each_overlapping_appointment() {
        let first = agreement_at(time!(10:00), 30);
        let second = agreement_at(time!(10:45), 30);
        let third = agreement_at(time!(13:00), 30);

        let conflicts = find_conflicts(time!(10:15), 60, &[first.clone(), second, third], None);

        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].agreement_id, first.id);
        assert_eq!(conflicts[0].client_name, "Sam");
        assert_eq!(conflicts[0].service_name, "Haircut");
        assert_eq!(conflicts[0].end_time, time!(10:30));
    }

    #[test]
    fn back_to_back_is_not_a_conflict() {
        let booked = agreement_at(time!(10:00), 30);
        assert!(find_conflicts(time!(09:30), 30, &[booked.clone()], None).is_empty());
        assert!(find_conflicts(time!(10:30), 30, &[booked], None).is_empty());
    }

    #[test]
    fn late_evening_appointment_still_conflicts() {
        // 23:30 + 60 minutes wraps to 00:30 as a `Time`; in minute arithmetic
        // it keeps blocking the rest of the evening.
        let booked = agreement_at(time!(23:30), 60);
        let conflicts = find_conflicts(time!(23:50), 30, &[booked], None);
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn edited_appointment_never_conflicts_with_itself() {
        let booked = agreement_at(time!(10:00), 30);
        let id = booked.id;

        assert_eq!(find_conflicts(time!(10:00), 30, &[booked.clone()], None).len(), 1);
        assert!(find_conflicts(time!(10:00), 30, &[booked], Some(id)).is_empty());
    }
}
