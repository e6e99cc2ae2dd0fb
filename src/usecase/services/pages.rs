use serde_json::Value;

use crate::domain::entities::column::{ColumnOverride, InputType, SelectOption};
use crate::domain::entities::row::{row_str, Row};
use crate::usecase::services::crud_service::CollectionConfig;
use crate::usecase::services::press_release_service::PRESS_RELEASES;
use crate::usecase::services::table_controller::{TableAction, TableConfig};

pub const APPROVE_ACTION: &str = "approve";
pub const REJECT_ACTION: &str = "reject";
pub const ADD_REPORT_ACTION: &str = "add-report";

/// What the row "View" action does on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewBehavior {
    Dialog,
    /// Opens `<newsroom>/newsroom/<slug>` outside the app.
    Newsroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    Users,
    PressReleases,
    Subscriptions,
    SubscriptionPlans,
    Packages,
    Categories,
    Newsletter,
    AccountDeletion,
    SubscriptionCancellations,
}

impl PageId {
    pub const ALL: [PageId; 9] = [
        PageId::Users,
        PageId::PressReleases,
        PageId::Subscriptions,
        PageId::SubscriptionPlans,
        PageId::Packages,
        PageId::Categories,
        PageId::Newsletter,
        PageId::AccountDeletion,
        PageId::SubscriptionCancellations,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PageId::Users => "Users",
            PageId::PressReleases => "Press Releases",
            PageId::Subscriptions => "Subscriptions",
            PageId::SubscriptionPlans => "Subscription Plans",
            PageId::Packages => "Packages",
            PageId::Categories => "Categories",
            PageId::Newsletter => "Newsletter",
            PageId::AccountDeletion => "Account Deletion",
            PageId::SubscriptionCancellations => "Subscription Cancellations",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            PageId::Users => "users",
            PageId::PressReleases => "press-release",
            PageId::Subscriptions => "subscriptions",
            PageId::SubscriptionPlans => "subscription-plans",
            PageId::Packages => "packages",
            PageId::Categories => "categories",
            PageId::Newsletter => "newsletter",
            PageId::AccountDeletion => "account-deletion",
            PageId::SubscriptionCancellations => "subscription-cancellations",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub id: PageId,
    pub tables: Vec<TableConfig>,
    pub view: ViewBehavior,
}

fn table(name: &str, excluded: &[&str]) -> TableConfig {
    TableConfig::new(CollectionConfig::new(name).excluding(excluded))
}

fn single(id: PageId, config: TableConfig) -> PageLayout {
    PageLayout {
        id,
        tables: vec![config],
        view: ViewBehavior::Dialog,
    }
}

/// Table wiring for one dashboard page.
pub fn page_layout(id: PageId) -> PageLayout {
    match id {
        PageId::Users => single(
            id,
            table(
                "users",
                &["user_id", "role", "location", "website_url", "social_media"],
            ),
        ),
        PageId::PressReleases => PageLayout {
            id,
            tables: vec![press_release_table(&[], &[])],
            view: ViewBehavior::Newsroom,
        },
        PageId::Subscriptions => single(
            id,
            table(
                "subscriptions",
                &[
                    "updated_at",
                    "created_at",
                    "razorpay_payment_id",
                    "user_id",
                    "plan_id",
                    "razorpay_subscription_id",
                    "subscription_id",
                ],
            ),
        ),
        PageId::SubscriptionPlans => single(
            id,
            table(
                "subscription_plans",
                &["created_at", "user_id", "percent_off", "plan_id"],
            ),
        ),
        PageId::Packages => single(id, table("packages", &["created_at", "user_id"])),
        PageId::Categories => PageLayout {
            id,
            tables: vec![
                table("categories", &["updated_at"]),
                table("industries", &["updated_at"]),
            ],
            view: ViewBehavior::Dialog,
        },
        PageId::Newsletter => single(
            id,
            table(
                "newsletter_subscriptions",
                &["created_at", "user_id", "percent_off", "plan_id", "metadata"],
            ),
        ),
        PageId::AccountDeletion => single(id, table("account_deletion", &["user_id"])),
        PageId::SubscriptionCancellations => {
            single(id, table("subscription_cancellation", &["user_id"]))
        }
    }
}

/// Press releases: moderation actions, no create, server search, and
/// select options fed by the `packages` and `industries` collections.
pub fn press_release_table(packages: &[Row], industries: &[Row]) -> TableConfig {
    let mut config = table(
        PRESS_RELEASES,
        &[
            "role",
            "location",
            "embedded_video_url",
            "embedded_video_title",
            "status",
            "created_at",
            "payment_id",
            "order_id",
            "show_email",
            "show_phone",
            "is_immediate",
            "location_city",
            "location_state",
            "location_country",
            "location_zip",
            "language",
            "fts",
        ],
    )
    .hiding(&["slug", "user_id", "summary", "distribution_package"]);
    config.collection = config.collection.with_order_by("release_date");
    config.create_enabled = false;
    config.search_enabled = true;
    config.overrides = press_release_overrides(packages, industries);
    config.extra_actions = vec![
        TableAction::custom(APPROVE_ACTION, "Approve"),
        TableAction::custom(REJECT_ACTION, "Reject"),
        TableAction::custom(ADD_REPORT_ACTION, "Add Report"),
    ];
    config
}

pub fn press_release_overrides(packages: &[Row], industries: &[Row]) -> Vec<ColumnOverride> {
    let labelled = |values: &[&str]| {
        values
            .iter()
            .map(|value| SelectOption::new(*value, *value))
            .collect::<Vec<_>>()
    };
    vec![
        ColumnOverride::new("admin_status")
            .input(InputType::Select)
            .options(vec![
                SelectOption::new("Approved", "approved"),
                SelectOption::new("Pending", "pending"),
                SelectOption::new("Rejected", "rejected"),
            ]),
        ColumnOverride::new("distribution_package")
            .input(InputType::Select)
            .options(options_from_rows(packages, "id")),
        ColumnOverride::new("distribution_channels")
            .input(InputType::Select)
            .options(labelled(&[
                "pressrelease.in only",
                "national pr distribution",
                "international pr distribution",
            ])),
        ColumnOverride::new("industry")
            .input(InputType::Select)
            .options(options_from_rows(industries, "name")),
        ColumnOverride::new("cover_image_url").input(InputType::ImageUrl),
        ColumnOverride::new("slug").input(InputType::Slug),
    ]
}

/// `{label: row.name, value: row[value_key]}` for every row with a name.
pub fn options_from_rows(rows: &[Row], value_key: &str) -> Vec<SelectOption> {
    rows.iter()
        .filter_map(|row| {
            let label = row_str(row, "name")?;
            let value = row.get(value_key).cloned().unwrap_or(Value::Null);
            Some(SelectOption::new(label, value))
        })
        .collect()
}

pub fn newsroom_url(base_url: &str, row: &Row) -> Option<String> {
    let slug = row_str(row, "slug").filter(|slug| !slug.is_empty())?;
    Some(format!("{}/newsroom/{slug}", base_url.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn every_page_has_a_table() {
        for id in PageId::ALL {
            let layout = page_layout(id);
            assert!(!layout.tables.is_empty(), "{id:?}");
            assert!(!id.route().is_empty());
        }
        assert_eq!(page_layout(PageId::Categories).tables.len(), 2);
    }

    #[test]
    fn press_releases_disable_create_and_order_by_release_date() {
        let layout = page_layout(PageId::PressReleases);
        let config = &layout.tables[0];
        assert!(!config.create_enabled);
        assert!(config.search_enabled);
        assert_eq!(config.collection.order_by, "release_date");
        assert!(config.collection.is_excluded("fts"));
        assert_eq!(layout.view, ViewBehavior::Newsroom);
        let labels: Vec<_> = config.extra_actions.iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["Approve", "Reject", "Add Report"]);
    }

    #[test]
    fn option_lists_come_from_rows() {
        let packages = vec![
            row(json!({"id": "p1", "name": "Basic"})),
            row(json!({"id": "p2"})),
        ];
        let industries = vec![row(json!({"id": 4, "name": "Fintech"}))];
        let overrides = press_release_overrides(&packages, &industries);
        let package = overrides
            .iter()
            .find(|o| o.column_name == "distribution_package")
            .and_then(|o| o.options.clone())
            .expect("package options");
        assert_eq!(package, vec![SelectOption::new("Basic", "p1")]);
        let industry = overrides
            .iter()
            .find(|o| o.column_name == "industry")
            .and_then(|o| o.options.clone())
            .expect("industry options");
        assert_eq!(industry, vec![SelectOption::new("Fintech", "Fintech")]);
    }

    #[test]
    fn newsroom_link_needs_slug() {
        let base = "https://pressrelease.in/";
        assert_eq!(
            newsroom_url(base, &row(json!({"slug": "launch"}))).as_deref(),
            Some("https://pressrelease.in/newsroom/launch")
        );
        assert_eq!(newsroom_url(base, &row(json!({"slug": ""}))), None);
    }
}
