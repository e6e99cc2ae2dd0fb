use dioxus::prelude::*;

use crate::usecase::services::render::{CellView, Tone, PLACEHOLDER};

fn tone_style(tone: Tone) -> &'static str {
    match tone {
        Tone::Positive => "background: #dcfce7; color: #166534;",
        Tone::Pending => "background: #fef9c3; color: #854d0e;",
        Tone::Negative => "background: #fee2e2; color: #991b1b;",
        Tone::Accent => "background: #e0e7ff; color: #3730a3;",
        Tone::Neutral => "background: #f3f4f6; color: #374151;",
    }
}

const PILL: &str = "display: inline-block; padding: 2px 8px; border-radius: 999px; font-size: 12px; white-space: nowrap;";
const MUTED: &str = "color: #9ca3af;";

fn pill(tone: Tone) -> String {
    format!("{PILL} {}", tone_style(tone))
}

#[component]
pub fn Cell(view: CellView) -> Element {
    match view {
        CellView::Placeholder => rsx! { span { style: MUTED, "{PLACEHOLDER}" } },
        CellView::Text(text) => rsx! { span { "{text}" } },
        CellView::Number(text) | CellView::Currency(text) => rsx! {
            span { style: "font-variant-numeric: tabular-nums;", "{text}" }
        },
        CellView::Percentage { ratio, label } => {
            let width = (ratio * 100.0).clamp(0.0, 100.0);
            rsx! {
                div { style: "display: flex; align-items: center; gap: 6px;",
                    div { style: "width: 60px; height: 6px; background: #e5e7eb; border-radius: 3px;",
                        div { style: "width: {width}%; height: 6px; background: #2563eb; border-radius: 3px;" }
                    }
                    span { "{label}" }
                }
            }
        }
        CellView::Date(text) | CellView::Time(text) => rsx! { span { "{text}" } },
        CellView::DateTime { date, time } => rsx! {
            div {
                div { "{date}" }
                div { style: "font-size: 11px; {MUTED}", "{time}" }
            }
        },
        CellView::Boolean { value, label } => {
            let style = pill(if value { Tone::Positive } else { Tone::Neutral });
            rsx! { span { style: "{style}", "{label}" } }
        }
        CellView::Badge { label, tone } | CellView::Status { label, tone } => {
            let style = pill(tone);
            rsx! { span { style: "{style}", "{label}" } }
        }
        CellView::Tags { first, overflow, all } => {
            let title = all.join(", ");
            let style = pill(Tone::Accent);
            rsx! {
                span { title: "{title}",
                    span { style: "{style}", "{first}" }
                    if overflow > 0 {
                        span { style: "margin-left: 4px; {MUTED}", "+{overflow}" }
                    }
                }
            }
        }
        CellView::Draft => {
            let style = pill(Tone::Pending);
            rsx! { span { style: "{style}", "Draft" } }
        }
        CellView::RichText { excerpt, title } => rsx! {
            span { title: "{title}", "{excerpt}" }
        },
        CellView::Image { src, alt } => rsx! {
            img { src: "{src}", alt: "{alt}", style: "width: 40px; height: 40px; object-fit: cover; border-radius: 4px;" }
        },
        CellView::Avatar { src, initials, name, subtitle } => rsx! {
            div { style: "display: flex; align-items: center; gap: 8px;",
                if let Some(src) = src {
                    img { src: "{src}", alt: "{name}", style: "width: 32px; height: 32px; border-radius: 50%;" }
                } else {
                    span { style: "width: 32px; height: 32px; border-radius: 50%; background: #e5e7eb; display: inline-flex; align-items: center; justify-content: center; font-size: 12px;",
                        "{initials}"
                    }
                }
                div {
                    div { "{name}" }
                    if let Some(subtitle) = subtitle {
                        div { style: "font-size: 11px; {MUTED}", "{subtitle}" }
                    }
                }
            }
        },
        CellView::File { name, extension, url } => {
            let style = pill(Tone::Neutral);
            rsx! {
                a { href: "{url}", target: "_blank",
                    span { style: "{style} margin-right: 6px;", "{extension}" }
                    "{name}"
                }
            }
        }
        CellView::Link { href, label }
        | CellView::Email { href, label }
        | CellView::Phone { href, label } => rsx! {
            a { href: "{href}", target: "_blank", style: "color: #2563eb;", "{label}" }
        },
        CellView::Progress { percent } => rsx! {
            div { style: "display: flex; align-items: center; gap: 6px;",
                div { style: "width: 80px; height: 6px; background: #e5e7eb; border-radius: 3px;",
                    div { style: "width: {percent}%; height: 6px; background: #16a34a; border-radius: 3px;" }
                }
                span { "{percent:.0}%" }
            }
        },
        CellView::Rating { value, label } => {
            let filled = value.round().clamp(0.0, 5.0) as usize;
            let stars = format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled));
            rsx! {
                span { title: "{label}", style: "color: #f59e0b;", "{stars}" }
            }
        }
        CellView::Json { preview, pretty } => rsx! {
            code { title: "{pretty}", style: "font-size: 12px;", "{preview}" }
        },
        CellView::Code(text) => rsx! {
            code { style: "font-size: 12px; background: #f3f4f6; padding: 1px 4px; border-radius: 3px;", "{text}" }
        },
        CellView::Color { hex, label } => rsx! {
            div { style: "display: flex; align-items: center; gap: 6px;",
                span { style: "width: 14px; height: 14px; border-radius: 3px; border: 1px solid #d1d5db; background: {hex};" }
                span { "{label}" }
            }
        },
        CellView::Share(links) => {
            let facebook = links.facebook();
            let twitter = links.twitter();
            let linkedin = links.linkedin();
            let embed = links.embed_code();
            let url = links.url;
            rsx! {
                div { style: "display: flex; gap: 6px; font-size: 12px;",
                    a { href: "{url}", target: "_blank", "Open" }
                    a { href: "{facebook}", target: "_blank", "Facebook" }
                    a { href: "{twitter}", target: "_blank", "X" }
                    a { href: "{linkedin}", target: "_blank", "LinkedIn" }
                    span { title: "{embed}", style: MUTED, "Embed" }
                }
            }
        }
    }
}
