//! Weekly planner status rules
//!
//! The planner shows the current ISO week (Monday first). Each day gets a
//! status derived from the routine planned for it and the sessions recorded on
//! that date.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DayOfWeek, PlanEntry, WorkoutSession};

/// Status of one day of the current week
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// A completed session exists for the day
    Completed,
    /// Today, with a session that is not completed yet
    InProgress,
    /// A past day whose session was never completed
    Incomplete,
    /// A past planned day without any session
    Skipped,
    /// Today is planned and nothing has been started
    Pending,
}

/// One row of the weekly overview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayOverview {
    pub day: DayOfWeek,
    pub date: NaiveDate,
    pub routine_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub status: Option<DayStatus>,
}

/// Monday of the week containing `today`
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(DayOfWeek::of(today).offset() as i64)
}

/// Calendar date of `day` within the week containing `today`
pub fn date_for(day: DayOfWeek, today: NaiveDate) -> NaiveDate {
    week_start(today) + Duration::days(day.offset() as i64)
}

/// Build the seven-day overview for the week containing `today`.
///
/// When several sessions share a date, a completed one wins.
pub fn week_overview(
    today: NaiveDate,
    plan: &[PlanEntry],
    sessions: &[WorkoutSession],
) -> Vec<DayOverview> {
    DayOfWeek::ALL
        .iter()
        .map(|&day| {
            let date = date_for(day, today);
            let routine_id = plan.iter().find(|p| p.day == day).map(|p| p.routine_id);
            let session = sessions
                .iter()
                .filter(|s| s.date == date)
                .max_by_key(|s| s.completed);

            let status = match session {
                Some(s) if s.completed => Some(DayStatus::Completed),
                Some(_) if date == today => Some(DayStatus::InProgress),
                Some(_) if date < today => Some(DayStatus::Incomplete),
                Some(_) => None,
                None if routine_id.is_none() => None,
                None if date < today => Some(DayStatus::Skipped),
                None if date == today => Some(DayStatus::Pending),
                None => None,
            };

            DayOverview {
                day,
                date,
                routine_id,
                session_id: session.map(|s| s.id),
                status,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-13 is a Wednesday
    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
    }

    fn session(user: Uuid, date: NaiveDate, completed: bool) -> WorkoutSession {
        WorkoutSession {
            id: Uuid::new_v4(),
            user_id: user,
            routine_id: Uuid::new_v4(),
            date,
            completed,
            duration_minutes: 0,
            notes: None,
        }
    }

    fn plan(user: Uuid, days: &[DayOfWeek]) -> Vec<PlanEntry> {
        days.iter()
            .map(|&day| PlanEntry {
                user_id: user,
                day,
                routine_id: Uuid::new_v4(),
            })
            .collect()
    }

    fn status_of(overview: &[DayOverview], day: DayOfWeek) -> Option<DayStatus> {
        overview.iter().find(|d| d.day == day).and_then(|d| d.status)
    }

    #[test]
    fn test_week_starts_on_monday() {
        let today = wednesday();
        assert_eq!(week_start(today), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(
            date_for(DayOfWeek::Sunday, today),
            NaiveDate::from_ymd_opt(2024, 3, 17).unwrap()
        );
        // Sunday belongs to the week that started six days earlier
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(week_start(sunday), week_start(today));
    }

    #[test]
    fn test_planned_days_without_sessions() {
        let user = Uuid::new_v4();
        let plan = plan(
            user,
            &[DayOfWeek::Monday, DayOfWeek::Wednesday, DayOfWeek::Friday],
        );
        let overview = week_overview(wednesday(), &plan, &[]);

        assert_eq!(overview.len(), 7);
        assert_eq!(status_of(&overview, DayOfWeek::Monday), Some(DayStatus::Skipped));
        assert_eq!(status_of(&overview, DayOfWeek::Wednesday), Some(DayStatus::Pending));
        assert_eq!(status_of(&overview, DayOfWeek::Friday), None);
        assert_eq!(status_of(&overview, DayOfWeek::Tuesday), None);
    }

    #[test]
    fn test_sessions_drive_status() {
        let user = Uuid::new_v4();
        let today = wednesday();
        let sessions = vec![
            session(user, today - Duration::days(2), true),
            session(user, today - Duration::days(1), false),
            session(user, today, false),
        ];
        let overview = week_overview(today, &[], &sessions);

        assert_eq!(status_of(&overview, DayOfWeek::Monday), Some(DayStatus::Completed));
        assert_eq!(status_of(&overview, DayOfWeek::Tuesday), Some(DayStatus::Incomplete));
        assert_eq!(status_of(&overview, DayOfWeek::Wednesday), Some(DayStatus::InProgress));
    }

    #[test]
    fn test_completed_session_wins_on_same_day() {
        let user = Uuid::new_v4();
        let today = wednesday();
        let done = session(user, today, true);
        let sessions = vec![session(user, today, false), done.clone()];
        let overview = week_overview(today, &[], &sessions);

        let wed = overview.iter().find(|d| d.day == DayOfWeek::Wednesday).unwrap();
        assert_eq!(wed.status, Some(DayStatus::Completed));
        assert_eq!(wed.session_id, Some(done.id));
    }

    #[test]
    fn test_sessions_outside_week_are_ignored() {
        let user = Uuid::new_v4();
        let today = wednesday();
        let sessions = vec![session(user, today - Duration::days(7), true)];
        let overview = week_overview(today, &[], &sessions);
        assert!(overview.iter().all(|d| d.status.is_none()));
    }
}
