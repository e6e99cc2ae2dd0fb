use dioxus::prelude::*;
use rfd::FileDialog;

use crate::domain::entities::error::BackendError;
use crate::platform::desktop::blocking::run_blocking;
use crate::ui::components::dashboard::Dashboard;
use crate::ui::components::table::InToolTable;
use crate::ui::state::app_state::{AppState, Services};
use crate::usecase::ports::notifier::{Notification, NotificationLevel};
use crate::usecase::services::pages::{page_layout, PageId};

const NAV_ITEM: &str = "display: block; width: 100%; text-align: left; padding: 8px 12px; border: none; border-radius: 6px; cursor: pointer; font-size: 14px;";

fn toast_style(level: NotificationLevel) -> String {
    let background = match level {
        NotificationLevel::Success => "#166534",
        NotificationLevel::Error => "#991b1b",
    };
    format!("background: {background}; color: #fff; padding: 10px 14px; border-radius: 8px; min-width: 240px; display: flex; justify-content: space-between; gap: 12px;")
}

fn nav_style(active: bool) -> String {
    if active {
        format!("{NAV_ITEM} background: #1f2937; color: #fff;")
    } else {
        format!("{NAV_ITEM} background: transparent; color: #d1d5db;")
    }
}

#[component]
pub fn App() -> Element {
    let services = use_context::<Services>();
    let AppState {
        mut current_page,
        mut toasts,
        mut status,
        mut busy,
        table_locations,
    } = AppState::new();
    use_context_provider(|| toasts);
    use_context_provider(|| table_locations);

    let import_service = services.imports.clone();
    let handle_import = move |_| {
        let Some(file_path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .add_filter("All files", &["*"])
            .pick_file()
        else {
            return;
        };
        *busy.write() = true;
        *status.write() = format!("Importing {}", file_path.display());
        let imports = import_service.clone();
        spawn(async move {
            let result = run_blocking(move || {
                imports
                    .import_csv(&file_path, None)
                    .map_err(|err| BackendError::unknown(format!("{err:#}")))
            })
            .await;
            match result {
                Ok(imported) => {
                    *status.write() = format!(
                        "Imported {} rows into {}",
                        imported.row_count, imported.collection
                    );
                    toasts
                        .write()
                        .push(Notification::success(format!("Imported {}", imported.collection)));
                }
                Err(err) => {
                    *status.write() = format!("Import failed: {err}");
                    toasts.write().push(Notification::error(err.message));
                }
            }
            *busy.write() = false;
        });
    };

    let page = current_page();
    let heading = page.map(PageId::title).unwrap_or("Dashboard");
    let toast_list = toasts();

    rsx! {
        div {
            style: "font-family: 'Inter', sans-serif; display: flex; height: 100vh; background: #f9fafb;",

            nav {
                style: "width: 220px; background: #111827; padding: 16px 10px; display: flex; flex-direction: column; gap: 4px; overflow-y: auto;",
                h2 { style: "color: #fff; margin: 0 0 16px 8px; font-size: 18px;", "InTool Admin" }
                button {
                    style: nav_style(page.is_none()),
                    onclick: move |_| current_page.set(None),
                    "Dashboard"
                }
                for id in PageId::ALL {
                    button {
                        key: "{id.route()}",
                        style: nav_style(page == Some(id)),
                        onclick: move |_| current_page.set(Some(id)),
                        "{id.title()}"
                    }
                }
            }

            main { style: "flex: 1; padding: 20px; overflow: auto;",
                div { style: "display: flex; align-items: center; justify-content: space-between; margin-bottom: 16px;",
                    h1 { style: "margin: 0; font-size: 22px;", "{heading}" }
                    div { style: "display: flex; align-items: center; gap: 10px;",
                        span { style: "font-size: 12px; color: #6b7280;", "{status}" }
                        button {
                            disabled: busy(),
                            onclick: handle_import,
                            "Import CSV"
                        }
                    }
                }
                match page {
                    None => rsx! { Dashboard {} },
                    Some(id) => rsx! {
                        div { style: "display: flex; flex-direction: column; gap: 20px;",
                            for index in 0..page_layout(id).tables.len() {
                                InToolTable { key: "{id.route()}-{index}", page: id, index: index }
                            }
                        }
                    },
                }
            }

            div {
                style: "position: fixed; right: 16px; bottom: 16px; display: flex; flex-direction: column; gap: 8px; z-index: 2000;",
                for (idx, toast) in toast_list.into_iter().enumerate() {
                    div {
                        key: "{idx}-{toast.message}",
                        style: toast_style(toast.level),
                        span { "{toast.message}" }
                        button {
                            style: "background: transparent; border: none; color: #fff; cursor: pointer;",
                            onclick: move |_| {
                                if idx < toasts.read().len() {
                                    toasts.write().remove(idx);
                                }
                            },
                            "×"
                        }
                    }
                }
            }
        }
    }
}
