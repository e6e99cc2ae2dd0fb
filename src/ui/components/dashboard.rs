use chrono::Utc;
use dioxus::prelude::*;

use crate::platform::desktop::blocking::run_blocking;
use crate::ui::state::app_state::Services;
use crate::usecase::services::stats_service::{
    ActivitiesSummary, BusinessMetricsSummary, MonthlyPressReleases,
};

const CARD: &str = "border: 1px solid #e5e7eb; border-radius: 10px; padding: 16px; background: #fff;";

#[derive(Debug, Clone, PartialEq)]
struct Overview {
    activities: ActivitiesSummary,
    metrics: BusinessMetricsSummary,
    monthly: MonthlyPressReleases,
}

#[component]
pub fn Dashboard() -> Element {
    let services = use_context::<Services>();
    let mut overview = use_signal(|| None::<Overview>);
    let mut error = use_signal(|| None::<String>);

    use_effect(move || {
        let stats = services.stats.clone();
        spawn(async move {
            let loaded = run_blocking(move || {
                let now = Utc::now();
                Ok(Overview {
                    activities: stats.activities(now)?,
                    metrics: stats.business_metrics(now)?,
                    monthly: stats.monthly_press_releases(now)?,
                })
            })
            .await;
            match loaded {
                Ok(data) => overview.set(Some(data)),
                Err(err) => {
                    log::error!("dashboard load failed: {err}");
                    error.set(Some(err.message));
                }
            }
        });
    });

    if let Some(message) = error() {
        return rsx! {
            div { style: "{CARD} color: #b91c1c;", "Failed to load dashboard: {message}" }
        };
    }
    let Some(data) = overview() else {
        return rsx! { div { style: "{CARD} color: #6b7280;", "Loading dashboard..." } };
    };

    let peak = data
        .monthly
        .monthly_press_releases
        .iter()
        .map(|month| month.count)
        .max()
        .unwrap_or(0)
        .max(1);
    let year = data.monthly.year;

    rsx! {
        div { style: "display: flex; flex-direction: column; gap: 16px;",
            div { style: "display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px;",
                {data.metrics.business_metrics.iter().map(|metric| {
                    let color = if metric.is_positive { "#16a34a" } else { "#dc2626" };
                    rsx! {
                        div { key: "{metric.label}", style: CARD,
                            div { style: "font-size: 12px; color: #6b7280;", "{metric.label}" }
                            div { style: "font-size: 22px; font-weight: 600; margin: 4px 0;", "{metric.value}" }
                            div { style: "font-size: 12px; color: {color};", "{metric.change} {metric.period}" }
                        }
                    }
                })}
            }

            div { style: CARD,
                h3 { style: "margin-top: 0;", "Press releases in {year}" }
                div { style: "display: flex; align-items: flex-end; gap: 8px; height: 160px;",
                    {data.monthly.monthly_press_releases.iter().map(|month| {
                        let height = month.count * 140 / peak;
                        rsx! {
                            div { key: "{month.month}", style: "flex: 1; display: flex; flex-direction: column; align-items: center; gap: 4px;",
                                span { style: "font-size: 11px;", "{month.count}" }
                                div { style: "width: 100%; height: {height}px; background: #2563eb; border-radius: 3px 3px 0 0;" }
                                span { style: "font-size: 11px; color: #6b7280;", "{month.month}" }
                            }
                        }
                    })}
                }
            }

            div { style: CARD,
                h3 { style: "margin-top: 0;", "Recent activity" }
                if data.activities.activities.is_empty() {
                    div { style: "color: #6b7280;", "No recent activity" }
                }
                {data.activities.activities.iter().map(|activity| {
                    let key = activity.id.to_string();
                    rsx! {
                        div { key: "{key}", style: "display: flex; align-items: center; gap: 10px; padding: 8px 0; border-bottom: 1px solid #f3f4f6;",
                            if let Some(src) = activity.avatar_url.clone() {
                                img { src: "{src}", style: "width: 32px; height: 32px; border-radius: 50%;" }
                            } else {
                                span { style: "width: 32px; height: 32px; border-radius: 50%; background: {activity.avatar_color}; color: #fff; display: inline-flex; align-items: center; justify-content: center; font-size: 12px;",
                                    "{activity.initials}"
                                }
                            }
                            div { style: "flex: 1;",
                                div { b { "{activity.user_name}" } " {activity.activity_name}" }
                                div { style: "font-size: 12px; color: #6b7280;", "{activity.details}" }
                            }
                            span { style: "font-size: 11px; color: #9ca3af;", "{activity.time_ago}" }
                        }
                    }
                })}
            }
        }
    }
}
