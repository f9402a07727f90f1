use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::require_text;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub title: String,
    pub occurs_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivityRequest {
    pub title: String,
    pub occurs_at: DateTime<FixedOffset>,
}

impl CreateActivityRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)
    }
}

/// Activities sharing one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub activities: Vec<Activity>,
}

/// Groups activities by the calendar date they occur on, read in the offset
/// the client supplied for each one.
///
/// Days come out in ascending order; inside a day activities are ordered by
/// time, then title.
pub fn group_by_day(activities: Vec<Activity>) -> Vec<ActivityDay> {
    let mut days: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    for activity in activities {
        days.entry(activity.occurs_at.date_naive())
            .or_default()
            .push(activity);
    }

    days.into_iter()
        .map(|(date, mut activities)| {
            activities.sort_by(|a, b| {
                a.occurs_at
                    .cmp(&b.occurs_at)
                    .then_with(|| a.title.cmp(&b.title))
            });
            ActivityDay { date, activities }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn activity(title: &str, y: i32, m: u32, d: u32, h: u32) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            trip_id: Uuid::nil(),
            title: title.into(),
            occurs_at: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().fixed_offset(),
        }
    }

    fn local(title: &str, raw: &str) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            trip_id: Uuid::nil(),
            title: title.into(),
            occurs_at: DateTime::parse_from_rfc3339(raw).unwrap(),
        }
    }

    #[test]
    fn groups_on_the_clients_local_date() {
        // 22:30 at -03:00 is already the next day in UTC.
        let days = group_by_day(vec![
            local("late dinner", "2025-06-02T22:30:00-03:00"),
            local("lunch", "2025-06-02T12:00:00-03:00"),
        ]);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date.to_string(), "2025-06-02");
        let titles: Vec<_> = days[0].activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["lunch", "late dinner"]);
    }

    #[test]
    fn same_date_shares_a_group() {
        let days = group_by_day(vec![
            activity("dinner", 2025, 6, 2, 20),
            activity("museum", 2025, 6, 2, 9),
        ]);
        assert_eq!(days.len(), 1);
        let titles: Vec<_> = days[0].activities.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["museum", "dinner"]);
    }

    #[test]
    fn days_are_ascending() {
        let days = group_by_day(vec![
            activity("flight home", 2025, 6, 10, 8),
            activity("arrival", 2025, 6, 1, 15),
            activity("tower", 2025, 6, 3, 11),
        ]);
        let dates: Vec<_> = days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, ["2025-06-01", "2025-06-03", "2025-06-10"]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_by_day(Vec::new()).is_empty());
    }
}
