//! Public shared-calendar reads, limited by the owner's plan.
//!
//! The months a viewer may navigate are the *owner's* entitlement:
//! 1. `users.calendar_months_override` (`-1` unlimited, `n` months)
//! 2. `calendar_months_limit` of the owner's active or grace-period plan
//! 3. the free default
//!
//! Offsets are counted in whole months from the current UTC month, in both
//! directions.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{FREE_CALENDAR_MONTHS, UNLIMITED};
use crate::error::{RentSyncError, RentSyncResult};
use crate::model::{AccessToken, LockSource, ReservationStatus};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShareRequest {
    pub token: String,
    pub year: i32,
    pub month: u32,
}

/// Months of calendar the owner's plan unlocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    /// `None` means unlimited
    pub months: Option<u32>,
    pub is_paid: bool,
}

impl Entitlement {
    pub fn allows(&self, month_offset: i32) -> bool {
        self.months
            .is_none_or(|limit| month_offset.unsigned_abs() <= limit)
    }
}

/// Resolve the month limit from the override and the plan limit, in that order.
pub fn resolve_months(override_months: Option<i32>, plan_limit: Option<i32>) -> Option<u32> {
    match override_months.or(plan_limit) {
        Some(UNLIMITED) => None,
        Some(months) => Some(u32::try_from(months).unwrap_or(FREE_CALENDAR_MONTHS)),
        None => Some(FREE_CALENDAR_MONTHS),
    }
}

/// Whole months from the month containing `now` to `year`-`month`.
pub fn month_offset(now: DateTime<Utc>, year: i32, month: u32) -> i32 {
    (year - now.year()) * 12 + (month as i32 - now.month() as i32)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedProperty {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedReservation {
    pub id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedLockedDate {
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub source: LockSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarLimit {
    /// `-1` when unlimited
    pub months: i64,
    pub is_unlimited: bool,
    pub is_paid: bool,
    pub month_offset: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedCalendarView {
    pub property: SharedProperty,
    pub reservations: Vec<SharedReservation>,
    pub locked_dates: Vec<SharedLockedDate>,
    pub calendar_limit: CalendarLimit,
}

pub struct SharedCalendar {
    store: Arc<dyn Store>,
}

impl SharedCalendar {
    pub fn new(store: Arc<dyn Store>) -> Self {
        SharedCalendar { store }
    }

    /// Validate the share token and return the requested month.
    pub async fn open(
        &self,
        request: &ShareRequest,
        now: DateTime<Utc>,
    ) -> RentSyncResult<SharedCalendarView> {
        if request.token.trim().is_empty() {
            return Err(RentSyncError::InvalidRequest("Missing share token".into()));
        }
        if !(1..=12).contains(&request.month) {
            return Err(RentSyncError::InvalidRequest(
                "month must be between 1 and 12".into(),
            ));
        }
        let first = NaiveDate::from_ymd_opt(request.year, request.month, 1)
            .ok_or_else(|| RentSyncError::InvalidRequest("year is out of range".into()))?;
        let next = first
            .checked_add_months(Months::new(1))
            .ok_or_else(|| RentSyncError::InvalidRequest("year is out of range".into()))?;

        let access = AccessToken::check(self.store.find_share_token(&request.token).await?, now)?;

        let entitlement = self.entitlement(access.user_id).await?;
        let offset = month_offset(now, request.year, request.month);
        if !entitlement.allows(offset) {
            return Err(RentSyncError::MonthOutOfRange {
                limit: entitlement.months.unwrap_or_default(),
                is_paid: entitlement.is_paid,
            });
        }

        let (property, reservations, locked_dates, view) = tokio::join!(
            self.store.find_property(access.property_id),
            self.store
                .reservations_overlapping(access.property_id, first, next),
            self.store
                .locked_dates_between(access.property_id, first, next),
            self.store
                .record_share_view(&access.token, access.view_count + 1, now),
        );

        if let Err(e) = view {
            tracing::warn!(error = %e, "failed to record shared calendar view");
        }

        let property =
            property?.ok_or_else(|| RentSyncError::NotFound("Property not found".into()))?;

        let reservations = reservations?
            .into_iter()
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .map(|r| SharedReservation {
                id: r.id,
                check_in: r.check_in,
                check_out: r.check_out,
                status: r.status,
            })
            .collect();

        let locked_dates = locked_dates?
            .into_iter()
            .map(|l| SharedLockedDate {
                date: l.date,
                reason: l.reason,
                source: l.source,
            })
            .collect();

        Ok(SharedCalendarView {
            property: SharedProperty {
                id: property.id,
                name: property.name,
            },
            reservations,
            locked_dates,
            calendar_limit: CalendarLimit {
                months: entitlement.months.map_or(i64::from(UNLIMITED), i64::from),
                is_unlimited: entitlement.months.is_none(),
                is_paid: entitlement.is_paid,
                month_offset: offset,
            },
        })
    }

    /// The owner's calendar entitlement.
    pub async fn entitlement(&self, user_id: Uuid) -> RentSyncResult<Entitlement> {
        let (user, subscription) = tokio::try_join!(
            self.store.find_user(user_id),
            self.store.find_entitled_subscription(user_id),
        )?;

        let override_months = user.and_then(|u| u.calendar_months_override);
        let plan_limit = match subscription.as_ref().and_then(|s| s.plan_id) {
            Some(plan_id) if override_months.is_none() => self
                .store
                .find_plan(plan_id)
                .await?
                .and_then(|plan| plan.calendar_months_limit),
            _ => None,
        };

        Ok(Entitlement {
            months: resolve_months(override_months, plan_limit),
            is_paid: subscription.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_offset_crosses_years() {
        let now = Utc.with_ymd_and_hms(2026, 11, 15, 12, 0, 0).unwrap();
        assert_eq!(month_offset(now, 2026, 11), 0);
        assert_eq!(month_offset(now, 2027, 2), 3);
        assert_eq!(month_offset(now, 2026, 4), -7);
    }

    #[test]
    fn test_resolve_months_priority() {
        assert_eq!(resolve_months(None, None), Some(FREE_CALENDAR_MONTHS));
        assert_eq!(resolve_months(None, Some(12)), Some(12));
        assert_eq!(resolve_months(None, Some(-1)), None);
        assert_eq!(resolve_months(Some(-1), Some(6)), None);
        assert_eq!(resolve_months(Some(4), Some(12)), Some(4));
        assert_eq!(resolve_months(Some(-7), None), Some(FREE_CALENDAR_MONTHS));
    }

    #[test]
    fn test_offset_zero_is_always_allowed() {
        let none = Entitlement {
            months: Some(0),
            is_paid: false,
        };
        assert!(none.allows(0));
        assert!(!none.allows(1));

        let free = Entitlement {
            months: Some(2),
            is_paid: false,
        };
        assert!(free.allows(-2));
        assert!(!free.allows(5));

        let unlimited = Entitlement {
            months: None,
            is_paid: true,
        };
        assert!(unlimited.allows(240));
    }
}
