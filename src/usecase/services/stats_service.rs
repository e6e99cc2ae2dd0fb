use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::error::BackendError;
use crate::domain::entities::row::{row_str, value_as_f64, value_to_text, Row};
use crate::usecase::ports::backend::{CollectionBackend, SelectRequest};
use crate::usecase::services::inference::{parse_temporal, Temporal};
use crate::usecase::services::render::{format_number, CurrencyFormat, Grouping};

pub const ACTIVITY_LIMIT: i64 = 30;

const AVATAR_COLORS: [&str; 8] = [
    "bg-blue-500",
    "bg-green-500",
    "bg-purple-500",
    "bg-pink-500",
    "bg-orange-500",
    "bg-teal-500",
    "bg-indigo-500",
    "bg-red-500",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Value,
    pub user_name: String,
    pub activity_name: String,
    pub details: String,
    pub avatar_url: Option<String>,
    pub initials: String,
    pub avatar_color: String,
    pub time_ago: String,
    #[serde(rename = "created_at")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivitiesSummary {
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetric {
    pub label: String,
    pub value: String,
    pub change: String,
    pub is_positive: bool,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetricsSummary {
    pub business_metrics: Vec<BusinessMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    pub month: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPressReleases {
    pub monthly_press_releases: Vec<MonthlyCount>,
    pub year: i32,
}

/// Dashboard summaries computed from the collection backend.
pub struct StatsService {
    backend: Arc<dyn CollectionBackend>,
    currency: CurrencyFormat,
}

impl StatsService {
    pub fn new(backend: Arc<dyn CollectionBackend>, currency: CurrencyFormat) -> Self {
        Self { backend, currency }
    }

    pub fn activities(&self, now: DateTime<Utc>) -> Result<ActivitiesSummary, BackendError> {
        let activities = self
            .backend
            .select(
                "activities",
                &SelectRequest::default()
                    .columns(&["id", "user_id", "activity_name", "details", "created_at"])
                    .order_desc("created_at")
                    .limit(ACTIVITY_LIMIT),
            )?
            .rows;
        if activities.is_empty() {
            return Ok(ActivitiesSummary::default());
        }

        let user_ids: Vec<Value> = activities
            .iter()
            .filter_map(|activity| activity.get("user_id").cloned())
            .collect();
        let business = self
            .backend
            .select(
                "user_business_info",
                &SelectRequest::default()
                    .columns(&["user_id", "company_name", "industry", "logo_url"])
                    .any_of("user_id", user_ids.clone()),
            )?
            .rows;
        let users = self
            .backend
            .select(
                "users",
                &SelectRequest::default()
                    .columns(&["user_id", "first_name", "last_name", "email", "profile_pic"])
                    .any_of("user_id", user_ids),
            )?
            .rows;

        Ok(build_activities(&activities, &users, &business, now))
    }

    pub fn business_metrics(
        &self,
        now: DateTime<Utc>,
    ) -> Result<BusinessMetricsSummary, BackendError> {
        let subscriptions = self
            .backend
            .select(
                "subscriptions",
                &SelectRequest::default()
                    .columns(&["id", "amount", "status", "created_at"])
                    .eq("status", "completed"),
            )?
            .rows;
        let cancellations = self
            .backend
            .select(
                "subscription_cancellation",
                &SelectRequest::default().columns(&["id", "created_at"]),
            )?
            .rows;
        let releases = self
            .backend
            .select(
                "press_releases",
                &SelectRequest::default().columns(&["industry", "created_at"]),
            )?
            .rows;

        Ok(build_business_metrics(
            &subscriptions,
            &cancellations,
            &releases,
            now,
            &self.currency,
        ))
    }

    pub fn monthly_press_releases(
        &self,
        now: DateTime<Utc>,
    ) -> Result<MonthlyPressReleases, BackendError> {
        let releases = self
            .backend
            .select(
                "press_releases",
                &SelectRequest::default().columns(&["id", "release_date"]),
            )?
            .rows;
        Ok(build_monthly_press_releases(&releases, now.year()))
    }
}

fn timestamp(row: &Row, key: &str) -> Option<NaiveDateTime> {
    match parse_temporal(&value_to_text(row.get(key)?))? {
        Temporal::DateTime(at) => Some(at),
        Temporal::Date(day) => day.and_hms_opt(0, 0, 0),
        Temporal::Time(_) => None,
    }
}

fn non_empty<'a>(row: Option<&'a Row>, key: &str) -> Option<&'a str> {
    row.and_then(|row| row_str(row, key))
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

pub fn time_ago(seconds: i64) -> String {
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 120 => "1 minute ago".to_string(),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 7_200 => "1 hour ago".to_string(),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        s if s < 172_800 => "1 day ago".to_string(),
        s if s < 604_800 => format!("{} days ago", s / 86_400),
        s if s < 1_209_600 => "1 week ago".to_string(),
        s => format!("{} weeks ago", s / 604_800),
    }
}

pub fn name_initials(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "??".to_string(),
        [only] => only.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

pub fn avatar_color(name: &str) -> &'static str {
    let code = name.encode_utf16().next().unwrap_or(0) as usize;
    AVATAR_COLORS[code % AVATAR_COLORS.len()]
}

pub fn build_activities(
    activities: &[Row],
    users: &[Row],
    business: &[Row],
    now: DateTime<Utc>,
) -> ActivitiesSummary {
    let by_user = |rows: &[Row]| -> HashMap<String, Row> {
        rows.iter()
            .filter_map(|row| {
                row.get("user_id")
                    .map(|id| (value_to_text(id), row.clone()))
            })
            .collect()
    };
    let users = by_user(users);
    let business = by_user(business);

    let activities = activities
        .iter()
        .map(|activity| {
            let user_id = activity.get("user_id").map(value_to_text).unwrap_or_default();
            let user = users.get(&user_id);
            let info = business.get(&user_id);

            let full_name = format!(
                "{} {}",
                non_empty(user, "first_name").unwrap_or_default(),
                non_empty(user, "last_name").unwrap_or_default()
            )
            .trim()
            .to_string();
            let user_name = if !full_name.is_empty() {
                full_name
            } else if let Some(company) = non_empty(info, "company_name") {
                company.to_string()
            } else if let Some(email) = non_empty(user, "email") {
                email.split('@').next().unwrap_or(email).to_string()
            } else {
                "Unknown User".to_string()
            };

            let created_at = activity.get("created_at").map(value_to_text).unwrap_or_default();
            let time_ago = timestamp(activity, "created_at")
                .map(|at| time_ago((now.naive_utc() - at).num_seconds()))
                .unwrap_or_else(|| "just now".to_string());

            Activity {
                id: activity.get("id").cloned().unwrap_or(Value::Null),
                activity_name: activity
                    .get("activity_name")
                    .map(value_to_text)
                    .unwrap_or_default(),
                details: non_empty(Some(activity), "details")
                    .or_else(|| non_empty(info, "industry"))
                    .unwrap_or("User activity")
                    .to_string(),
                avatar_url: non_empty(user, "profile_pic")
                    .or_else(|| non_empty(info, "logo_url"))
                    .map(str::to_string),
                initials: name_initials(&user_name),
                avatar_color: avatar_color(&user_name).to_string(),
                time_ago,
                created_at,
                user_name,
            }
        })
        .collect();

    ActivitiesSummary { activities }
}

fn same_month(at: NaiveDateTime, year: i32, month: u32) -> bool {
    at.year() == year && at.month() == month
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

pub fn build_business_metrics(
    completed_subscriptions: &[Row],
    cancellations: &[Row],
    press_releases: &[Row],
    now: DateTime<Utc>,
    currency: &CurrencyFormat,
) -> BusinessMetricsSummary {
    let today = now.date_naive();
    let last_month = today
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(1)))
        .unwrap_or(today);
    let created_in = |row: &Row, month: NaiveDate| {
        timestamp(row, "created_at").is_some_and(|at| same_month(at, month.year(), month.month()))
    };
    let in_this_month = |row: &Row| created_in(row, today);
    let in_last_month = |row: &Row| created_in(row, last_month);
    let amount = |row: &Row| row.get("amount").and_then(value_as_f64).unwrap_or(0.0);

    let revenue: f64 = completed_subscriptions.iter().map(amount).sum();
    let this_month_revenue: f64 = completed_subscriptions
        .iter()
        .filter(|&row| in_this_month(row))
        .map(amount)
        .sum();
    let revenue_change = percent_of(this_month_revenue, revenue);
    let revenue_metric = BusinessMetric {
        label: "Monthly Recurring Revenue".to_string(),
        value: format!(
            "{}{}",
            currency.symbol(),
            format_number(revenue / 100.0, Grouping::for_locale(&currency.locale))
        ),
        change: format!("{revenue_change:.1}%"),
        is_positive: revenue_change >= 0.0,
        period: "MRR".to_string(),
    };

    let active = completed_subscriptions.len() as f64;
    let last_month_active = completed_subscriptions
        .iter()
        .filter(|&row| in_last_month(row))
        .count() as f64;
    let active_change = percent_of(last_month_active, active);
    let active_metric = BusinessMetric {
        label: "Active Subscriptions".to_string(),
        value: completed_subscriptions.len().to_string(),
        change: format!("{active_change:.1}%"),
        is_positive: active_change >= 0.0,
        period: "This month".to_string(),
    };

    let churn = round_tenth(percent_of(cancellations.len() as f64, active));
    let last_month_cancellations = cancellations.iter().filter(|&row| in_last_month(row)).count();
    let last_month_churn = round_tenth(percent_of(last_month_cancellations as f64, active));
    let churn_change = round_tenth(churn - last_month_churn);
    let churn_metric = BusinessMetric {
        label: "Churn Rate".to_string(),
        value: format!("{churn:.1}%"),
        change: format!("{churn_change:.1}%"),
        is_positive: churn_change <= 0.0,
        period: "Monthly".to_string(),
    };

    let industries: BTreeSet<String> = press_releases
        .iter()
        .map(|row| row.get("industry").map(value_to_text).unwrap_or_default())
        .collect();
    let this_month_releases = press_releases.iter().filter(|&row| in_this_month(row)).count();
    let industry_change = percent_of(this_month_releases as f64, industries.len() as f64);
    let industry_metric = BusinessMetric {
        label: "Industries Served".to_string(),
        value: industries.len().to_string(),
        change: format!("{industry_change:.1}%"),
        is_positive: industry_change >= 0.0,
        period: "This month".to_string(),
    };

    BusinessMetricsSummary {
        business_metrics: vec![revenue_metric, active_metric, churn_metric, industry_metric],
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn build_monthly_press_releases(releases: &[Row], year: i32) -> MonthlyPressReleases {
    let mut counts = [0_u32; 12];
    for release in releases {
        if let Some(at) = timestamp(release, "release_date") {
            if at.year() == year {
                counts[at.month0() as usize] += 1;
            }
        }
    }
    MonthlyPressReleases {
        monthly_press_releases: MONTH_NAMES
            .iter()
            .zip(counts)
            .map(|(month, count)| MonthlyCount {
                month: month.to_string(),
                count,
            })
            .collect(),
        year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).single().expect("valid now")
    }

    #[test]
    fn time_ago_buckets() {
        assert_eq!(time_ago(30), "just now");
        assert_eq!(time_ago(90), "1 minute ago");
        assert_eq!(time_ago(600), "10 minutes ago");
        assert_eq!(time_ago(3_700), "1 hour ago");
        assert_eq!(time_ago(10_800), "3 hours ago");
        assert_eq!(time_ago(90_000), "1 day ago");
        assert_eq!(time_ago(259_200), "3 days ago");
        assert_eq!(time_ago(700_000), "1 week ago");
        assert_eq!(time_ago(1_900_000), "3 weeks ago");
    }

    #[test]
    fn initials_and_colors() {
        assert_eq!(name_initials("Asha Rao"), "AR");
        assert_eq!(name_initials("acme"), "AC");
        assert_eq!(name_initials("Mary Ann Lee"), "ML");
        assert_eq!(name_initials(""), "??");
        assert_eq!(avatar_color("Hina"), "bg-blue-500");
        assert_eq!(avatar_color("Asha"), "bg-green-500");
    }

    #[test]
    fn activities_fall_back_through_name_sources() {
        let activities = rows(json!([
            {"id": 1, "user_id": "u1", "activity_name": "signed up", "details": null, "created_at": "2024-06-15T11:50:00Z"},
            {"id": 2, "user_id": "u2", "activity_name": "published", "details": "Series A", "created_at": "2024-06-14T12:00:00Z"},
            {"id": 3, "user_id": "u3", "activity_name": "logged in", "details": "", "created_at": "2024-06-15T12:00:00Z"},
            {"id": 4, "user_id": "u4", "activity_name": "left", "created_at": "2024-06-01T12:00:00Z"}
        ]));
        let users = rows(json!([
            {"user_id": "u1", "first_name": "Asha", "last_name": "Rao", "email": "asha@x.io", "profile_pic": null},
            {"user_id": "u3", "first_name": "", "last_name": null, "email": "dev.team@x.io"}
        ]));
        let business = rows(json!([
            {"user_id": "u1", "company_name": "Acme", "industry": "Fintech", "logo_url": "logo.png"},
            {"user_id": "u2", "company_name": "Globex", "industry": "Energy", "logo_url": null}
        ]));

        let summary = build_activities(&activities, &users, &business, now());
        let names: Vec<&str> = summary.activities.iter().map(|a| a.user_name.as_str()).collect();
        assert_eq!(names, vec!["Asha Rao", "Globex", "dev.team", "Unknown User"]);

        let first = &summary.activities[0];
        assert_eq!(first.details, "Fintech");
        assert_eq!(first.avatar_url.as_deref(), Some("logo.png"));
        assert_eq!(first.time_ago, "10 minutes ago");
        assert_eq!(first.initials, "AR");
        assert_eq!(summary.activities[1].details, "Series A");
        assert_eq!(summary.activities[1].time_ago, "1 day ago");
        assert_eq!(summary.activities[3].details, "User activity");
        assert_eq!(summary.activities[3].time_ago, "2 weeks ago");

        let encoded = serde_json::to_value(first).expect("should serialize");
        assert!(encoded.get("userName").is_some());
        assert!(encoded.get("created_at").is_some());
    }

    #[test]
    fn business_metrics_formulas() {
        let subscriptions = rows(json!([
            {"amount": 1_000_000, "status": "completed", "created_at": "2024-06-02T00:00:00Z"},
            {"amount": 500_000, "status": "completed", "created_at": "2024-05-20T00:00:00Z"},
            {"amount": 500_000, "status": "completed", "created_at": "2024-05-21T00:00:00Z"},
            {"amount": 2_000_000, "status": "completed", "created_at": "2023-01-01T00:00:00Z"}
        ]));
        let cancellations = rows(json!([
            {"id": 1, "created_at": "2024-05-03T00:00:00Z"},
            {"id": 2, "created_at": "2024-06-03T00:00:00Z"}
        ]));
        let releases = rows(json!([
            {"industry": "Fintech", "created_at": "2024-06-01T00:00:00Z"},
            {"industry": "Energy", "created_at": "2024-06-05T00:00:00Z"},
            {"industry": "Fintech", "created_at": "2024-01-05T00:00:00Z"},
            {"industry": "Health", "created_at": "2024-02-05T00:00:00Z"}
        ]));

        let summary = build_business_metrics(
            &subscriptions,
            &cancellations,
            &releases,
            now(),
            &CurrencyFormat::default(),
        );
        let metrics = &summary.business_metrics;
        assert_eq!(metrics[0].value, "₹40,000");
        assert_eq!(metrics[0].change, "25.0%");
        assert_eq!(metrics[1].value, "4");
        assert_eq!(metrics[1].change, "50.0%");
        assert_eq!(metrics[2].value, "50.0%");
        assert_eq!(metrics[2].change, "25.0%");
        assert!(!metrics[2].is_positive);
        assert_eq!(metrics[3].value, "3");
        assert_eq!(metrics[3].change, "66.7%");
    }

    #[test]
    fn empty_collections_do_not_divide_by_zero() {
        let summary =
            build_business_metrics(&[], &[], &[], now(), &CurrencyFormat::default());
        assert_eq!(summary.business_metrics[0].value, "₹0");
        assert!(summary.business_metrics.iter().all(|m| m.change == "0.0%"));
    }

    #[test]
    fn monthly_counts_only_current_year() {
        let releases = rows(json!([
            {"id": 1, "release_date": "2024-01-10"},
            {"id": 2, "release_date": "2024-01-20T08:00:00Z"},
            {"id": 3, "release_date": "2023-01-10"},
            {"id": 4, "release_date": "2024-12-31"},
            {"id": 5, "release_date": null}
        ]));
        let monthly = build_monthly_press_releases(&releases, 2024);
        assert_eq!(monthly.year, 2024);
        assert_eq!(monthly.monthly_press_releases.len(), 12);
        assert_eq!(monthly.monthly_press_releases[0].count, 2);
        assert_eq!(monthly.monthly_press_releases[11].month, "December");
        assert_eq!(monthly.monthly_press_releases[11].count, 1);
    }
}
