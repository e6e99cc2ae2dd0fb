use std::path::{Path, PathBuf};

use chrono::Utc;
use dioxus::prelude::*;
use rfd::FileDialog;
use serde_json::Value;

use crate::domain::entities::error::BackendError;
use crate::domain::entities::row::{row_str, value_to_text, Row};
use crate::platform::desktop::blocking::run_blocking;
use crate::ui::state::app_state::Services;
use crate::usecase::ports::backend::SelectRequest;
use crate::usecase::ports::notifier::{Notification, Notifier};
use crate::usecase::services::press_release_service::{RejectionReason, ReportUpload, USERS};

const OVERLAY: &str = "position: fixed; inset: 0; background: rgba(0,0,0,0.35); display: flex; align-items: center; justify-content: center; z-index: 1000;";
const PANEL: &str = "background: #fff; border-radius: 10px; padding: 20px; width: 480px; box-shadow: 0 20px 40px rgba(0,0,0,0.2);";

#[component]
pub fn RejectDialog(release: Row, on_done: EventHandler<bool>) -> Element {
    let services = use_context::<Services>();
    let mut reason = use_signal(String::new);
    let mut error = use_signal(|| None::<String>);
    let mut busy = use_signal(|| false);
    let title = row_str(&release, "title").unwrap_or("this press release").to_string();
    let length = reason().trim().chars().count();

    rsx! {
        div { style: OVERLAY,
            div { style: PANEL,
                h3 { style: "margin-top: 0;", "Reject Press Release" }
                p { style: "color: #4b5563;", "Tell the author why \"{title}\" was rejected." }
                textarea {
                    style: "width: 100%; min-height: 120px; box-sizing: border-box; padding: 8px;",
                    value: "{reason}",
                    oninput: move |event| reason.set(event.value()),
                }
                div { style: "font-size: 12px; color: #6b7280;", "{length}/1000" }
                if let Some(message) = error() {
                    div { style: "color: #b91c1c; margin-top: 6px;", "{message}" }
                }
                div { style: "display: flex; justify-content: flex-end; gap: 8px; margin-top: 12px;",
                    button { onclick: move |_| on_done.call(false), "Cancel" }
                    button {
                        disabled: busy(),
                        style: "background: #b91c1c; color: #fff; border: none; padding: 6px 14px; border-radius: 6px;",
                        onclick: move |_| {
                            let parsed = match RejectionReason::parse(&reason()) {
                                Ok(parsed) => parsed,
                                Err(field_error) => {
                                    error.set(Some(field_error.message));
                                    return;
                                }
                            };
                            error.set(None);
                            *busy.write() = true;
                            let press = services.press_releases.clone();
                            let release = release.clone();
                            spawn(async move {
                                let result =
                                    run_blocking(move || press.reject(&release, &parsed)).await;
                                *busy.write() = false;
                                on_done.call(result.is_ok());
                            });
                        },
                        if busy() { "Rejecting..." } else { "Reject" }
                    }
                }
            }
        }
    }
}

fn report_upload(
    services: &Services,
    release: &Row,
    path: &Path,
) -> Result<ReportUpload, BackendError> {
    let bytes = std::fs::read(path).map_err(|err| {
        BackendError::unknown(format!("failed to read {}: {err}", path.display()))
    })?;
    let user_id = release.get("user_id").cloned().unwrap_or(Value::Null);
    let user_email = services
        .backend
        .select(
            USERS,
            &SelectRequest::default().eq("user_id", user_id.clone()),
        )
        .ok()
        .and_then(|response| response.rows.into_iter().next())
        .and_then(|user| row_str(&user, "email").map(str::to_string))
        .unwrap_or_default();
    Ok(ReportUpload {
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bytes,
        release_id: release.get("id").map(value_to_text).unwrap_or_default(),
        user_id: value_to_text(&user_id),
        user_email,
    })
}

#[component]
pub fn UploadReportDialog(release: Row, on_done: EventHandler<bool>) -> Element {
    let services = use_context::<Services>();
    let mut picked = use_signal(|| None::<PathBuf>);
    let mut busy = use_signal(|| false);
    let picked_label = picked()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "No file selected".to_string());

    rsx! {
        div { style: OVERLAY,
            div { style: PANEL,
                h3 { style: "margin-top: 0;", "Add Report" }
                p { style: "color: #4b5563;", "Attach the distribution report (PDF) for this press release." }
                div { style: "display: flex; align-items: center; gap: 8px;",
                    button {
                        onclick: move |_| {
                            if let Some(path) = FileDialog::new().add_filter("PDF", &["pdf"]).pick_file() {
                                picked.set(Some(path));
                            }
                        },
                        "Choose PDF"
                    }
                    span { style: "font-size: 12px; color: #6b7280;", "{picked_label}" }
                }
                div { style: "display: flex; justify-content: flex-end; gap: 8px; margin-top: 16px;",
                    button { onclick: move |_| on_done.call(false), "Cancel" }
                    button {
                        disabled: busy() || picked().is_none(),
                        style: "background: #111827; color: #fff; border: none; padding: 6px 14px; border-radius: 6px;",
                        onclick: move |_| {
                            let Some(path) = picked() else {
                                return;
                            };
                            *busy.write() = true;
                            let services = services.clone();
                            let release = release.clone();
                            spawn(async move {
                                let press = services.press_releases.clone();
                                let result = run_blocking(move || {
                                    match report_upload(&services, &release, &path) {
                                        Ok(upload) => press.upload_report(&upload, Utc::now()),
                                        Err(err) => {
                                            let message = err.message.clone();
                                            services.toasts.notify(Notification::error(message));
                                            Err(err)
                                        }
                                    }
                                })
                                .await;
                                *busy.write() = false;
                                on_done.call(result.is_ok());
                            });
                        },
                        if busy() { "Uploading..." } else { "Upload" }
                    }
                }
            }
        }
    }
}
