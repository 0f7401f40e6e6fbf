//! PostgREST-backed store for the managed backend.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::error::{RentSyncError, RentSyncResult};
use crate::model::*;
use crate::store::{StatusChange, Store, SubscriptionPatch, SubscriptionQuery};

const SUBSCRIPTIONS: &str = "subscriptions";
const USERS: &str = "users";
const PLANS: &str = "subscription_plans";
const REMINDERS: &str = "subscription_reminders";
const ICAL_SUBSCRIPTIONS: &str = "ical_subscriptions";
const LOCKED_DATES: &str = "locked_dates";
const PROPERTIES: &str = "properties";
const RESERVATIONS: &str = "reservations";
const SHARE_TOKENS: &str = "calendar_share_tokens";
const FEED_TOKENS: &str = "ical_feed_tokens";

const USER_COLUMNS: &str =
    "id,full_name,push_token,subscription_status,property_limit,calendar_months_override";

/// Ids per `in.(...)` filter, keeps request URLs short.
const DELETE_CHUNK: usize = 100;

type Filters = Vec<(&'static str, String)>;

#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: Url,
    service_key: String,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn in_list<T: std::fmt::Display>(values: &[T]) -> String {
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("in.({})", joined.join(","))
}

impl RestStore {
    /// `base_url` is the project URL; tables live under `/rest/v1/`.
    pub fn new(base_url: &str, service_key: impl Into<String>) -> RentSyncResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| RentSyncError::Config(format!("invalid store url '{base_url}': {e}")))?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(RestStore {
            client: reqwest::Client::new(),
            base_url,
            service_key: service_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> RentSyncResult<Url> {
        self.base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| RentSyncError::Config(e.to_string()))
    }

    fn request(&self, method: Method, table: &str) -> RentSyncResult<RequestBuilder> {
        Ok(self
            .client
            .request(method, self.table_url(table)?)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key))
    }

    async fn check(table: &str, response: Response) -> RentSyncResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RentSyncError::Store(format!("{table}: HTTP {status}: {body}")))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: Filters,
    ) -> RentSyncResult<Vec<T>> {
        let response = self
            .request(Method::GET, table)?
            .query(&[("select", columns)])
            .query(&filters)
            .send()
            .await?;
        Ok(Self::check(table, response).await?.json().await?)
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        mut filters: Filters,
    ) -> RentSyncResult<Option<T>> {
        filters.push(("limit", "1".to_string()));
        Ok(self.select(table, columns, filters).await?.into_iter().next())
    }

    async fn patch<B: Serialize + ?Sized>(
        &self,
        table: &str,
        filters: Filters,
        body: &B,
    ) -> RentSyncResult<()> {
        let response = self
            .request(Method::PATCH, table)?
            .query(&filters)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        Self::check(table, response).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for RestStore {
    async fn find_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> RentSyncResult<Vec<Subscription>> {
        let mut filters: Filters = vec![
            ("status", eq(query.status)),
            ("order", "current_period_end.asc".to_string()),
        ];
        if let Some(from) = query.period_end_from {
            filters.push(("current_period_end", format!("gte.{}", timestamp(from))));
        }
        if let Some(before) = query.period_end_before {
            filters.push(("current_period_end", format!("lt.{}", timestamp(before))));
        }
        if let Some(before) = query.grace_end_before {
            filters.push(("grace_period_end", format!("lt.{}", timestamp(before))));
        }
        self.select(SUBSCRIPTIONS, "*", filters).await
    }

    async fn update_subscription(
        &self,
        id: Uuid,
        patch: &SubscriptionPatch,
    ) -> RentSyncResult<()> {
        self.patch(SUBSCRIPTIONS, vec![("id", eq(id))], patch).await
    }

    async fn transition_subscription(&self, change: &StatusChange) -> RentSyncResult<()> {
        self.patch(
            SUBSCRIPTIONS,
            vec![("id", eq(change.subscription_id))],
            &change.subscription,
        )
        .await?;
        self.patch(USERS, vec![("id", eq(change.user_id))], &change.user)
            .await
    }

    async fn find_entitled_subscription(
        &self,
        user_id: Uuid,
    ) -> RentSyncResult<Option<Subscription>> {
        self.select_one(
            SUBSCRIPTIONS,
            "*",
            vec![
                ("user_id", eq(user_id)),
                (
                    "status",
                    in_list(&[SubscriptionStatus::Active, SubscriptionStatus::GracePeriod]),
                ),
                ("order", "current_period_start.desc".to_string()),
            ],
        )
        .await
    }

    async fn find_plan(&self, id: Uuid) -> RentSyncResult<Option<Plan>> {
        self.select_one(PLANS, "id,name,calendar_months_limit", vec![("id", eq(id))])
            .await
    }

    async fn find_user(&self, id: Uuid) -> RentSyncResult<Option<User>> {
        self.select_one(USERS, USER_COLUMNS, vec![("id", eq(id))])
            .await
    }

    async fn reminder_exists(
        &self,
        subscription_id: Uuid,
        reminder_type: ReminderType,
    ) -> RentSyncResult<bool> {
        let rows: Vec<serde_json::Value> = self
            .select(
                REMINDERS,
                "id",
                vec![
                    ("subscription_id", eq(subscription_id)),
                    ("reminder_type", eq(reminder_type)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn claim_reminder(&self, reminder: &NewReminder) -> RentSyncResult<bool> {
        let response = self
            .request(Method::POST, REMINDERS)?
            .query(&[("on_conflict", "subscription_id,reminder_type")])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&[reminder])
            .send()
            .await?;
        let created: Vec<serde_json::Value> = Self::check(REMINDERS, response).await?.json().await?;
        Ok(!created.is_empty())
    }

    async fn find_ical_subscription(&self, id: Uuid) -> RentSyncResult<Option<IcalSubscription>> {
        self.select_one(ICAL_SUBSCRIPTIONS, "*", vec![("id", eq(id))])
            .await
    }

    async fn active_ical_subscriptions(&self) -> RentSyncResult<Vec<IcalSubscription>> {
        self.select(
            ICAL_SUBSCRIPTIONS,
            "*",
            vec![("is_active", eq(true)), ("order", "id.asc".to_string())],
        )
        .await
    }

    async fn record_sync_outcome(&self, id: Uuid, outcome: &SyncOutcome) -> RentSyncResult<()> {
        self.patch(ICAL_SUBSCRIPTIONS, vec![("id", eq(id))], outcome)
            .await
    }

    async fn external_locked_dates(
        &self,
        subscription_id: Uuid,
    ) -> RentSyncResult<Vec<LockedDate>> {
        self.select(
            LOCKED_DATES,
            "*",
            vec![
                ("subscription_id", eq(subscription_id)),
                ("source", eq(LockSource::External.as_str())),
            ],
        )
        .await
    }

    async fn manual_locked_dates(&self, property_id: Uuid) -> RentSyncResult<Vec<LockedDate>> {
        self.select(
            LOCKED_DATES,
            "*",
            vec![
                ("property_id", eq(property_id)),
                ("source", eq(LockSource::Manual.as_str())),
                ("order", "date.asc".to_string()),
            ],
        )
        .await
    }

    async fn locked_dates_between(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<LockedDate>> {
        self.select(
            LOCKED_DATES,
            "*",
            vec![
                ("property_id", eq(property_id)),
                ("date", format!("gte.{from}")),
                ("date", format!("lt.{to}")),
                ("order", "date.asc".to_string()),
            ],
        )
        .await
    }

    async fn upsert_locked_dates(&self, rows: &[NewLockedDate]) -> RentSyncResult<()> {
        let response = self
            .request(Method::POST, LOCKED_DATES)?
            .query(&[("on_conflict", "property_id,date,subscription_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(LOCKED_DATES, response).await?;
        Ok(())
    }

    async fn delete_locked_dates(&self, ids: &[Uuid]) -> RentSyncResult<()> {
        for chunk in ids.chunks(DELETE_CHUNK) {
            let response = self
                .request(Method::DELETE, LOCKED_DATES)?
                .query(&[("id", in_list(chunk))])
                .send()
                .await?;
            Self::check(LOCKED_DATES, response).await?;
        }
        Ok(())
    }

    async fn find_property(&self, id: Uuid) -> RentSyncResult<Option<Property>> {
        self.select_one(PROPERTIES, "id,user_id,name", vec![("id", eq(id))])
            .await
    }

    async fn reservations_for_property(
        &self,
        property_id: Uuid,
    ) -> RentSyncResult<Vec<Reservation>> {
        self.select(
            RESERVATIONS,
            "id,property_id,guest_name,check_in,check_out,status",
            vec![
                ("property_id", eq(property_id)),
                ("order", "check_in.asc".to_string()),
            ],
        )
        .await
    }

    async fn reservations_overlapping(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RentSyncResult<Vec<Reservation>> {
        self.select(
            RESERVATIONS,
            "id,property_id,guest_name,check_in,check_out,status",
            vec![
                ("property_id", eq(property_id)),
                ("check_in", format!("lt.{to}")),
                ("check_out", format!("gt.{from}")),
                ("order", "check_in.asc".to_string()),
            ],
        )
        .await
    }

    async fn find_share_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>> {
        self.select_one(SHARE_TOKENS, "*", vec![("token", eq(token))])
            .await
    }

    async fn find_feed_token(&self, token: &str) -> RentSyncResult<Option<AccessToken>> {
        self.select_one(FEED_TOKENS, "*", vec![("token", eq(token))])
            .await
    }

    async fn record_share_view(
        &self,
        token: &str,
        view_count: i64,
        viewed_at: DateTime<Utc>,
    ) -> RentSyncResult<()> {
        self.patch(
            SHARE_TOKENS,
            vec![("token", eq(token))],
            &serde_json::json!({
                "view_count": view_count,
                "last_viewed_at": viewed_at,
            }),
        )
        .await
    }
}
