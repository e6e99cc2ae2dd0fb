use dioxus::prelude::*;
use serde_json::Value;

use crate::domain::entities::column::{CellType, ColumnDescriptor};
use crate::domain::entities::query::SortDirection;
use crate::domain::entities::row::Row;
use crate::platform::desktop::blocking::run_blocking;
use crate::platform::desktop::debounce::Debouncer;
use crate::ui::components::cell::Cell;
use crate::ui::components::form::FormDialog;
use crate::ui::components::moderation::{RejectDialog, UploadReportDialog};
use crate::ui::state::app_state::{Services, TableLocations};
use crate::usecase::ports::notifier::Notification;
use crate::usecase::services::pages::{
    newsroom_url, page_layout, press_release_overrides, PageId, ViewBehavior, ADD_REPORT_ACTION,
    APPROVE_ACTION, REJECT_ACTION,
};
use crate::usecase::services::render::CellView;
use crate::usecase::services::table_controller::{
    ActionKind, Dialog, LoadState, SubmitRequest, TableAction, TableBody, TableController,
};

const BUTTON: &str = "border: 1px solid #d1d5db; background: #fff; padding: 4px 10px; border-radius: 6px; cursor: pointer;";
const DANGER: &str = "border: 1px solid #fecaca; background: #fef2f2; color: #b91c1c; padding: 4px 10px; border-radius: 6px; cursor: pointer;";
const OVERLAY: &str = "position: fixed; inset: 0; background: rgba(0,0,0,0.35); display: flex; align-items: center; justify-content: center; z-index: 1000;";
const PANEL: &str = "background: #fff; border-radius: 10px; padding: 20px; width: 520px; max-height: 85vh; overflow-y: auto;";

/// Moves queued toasts from the services into the rendered list.
pub fn flush_toasts(services: &Services, mut toasts: Signal<Vec<Notification>>) {
    let drained = services.toasts.drain();
    if !drained.is_empty() {
        toasts.write().extend(drained);
    }
}

enum BodyView {
    Skeleton(usize),
    Empty(&'static str),
    Rows(Vec<(String, Row, bool)>),
}

#[derive(Clone, PartialEq)]
enum Moderation {
    Reject(Row),
    Report(Row),
}

#[component]
pub fn InToolTable(page: PageId, index: usize) -> Element {
    let services = use_context::<Services>();
    let toasts = use_context::<Signal<Vec<Notification>>>();
    let layout = page_layout(page);
    let Some(config) = layout.tables.get(index).cloned() else {
        return rsx! {};
    };
    let view_behavior = layout.view;

    let mut locations = use_context::<Signal<TableLocations>>();
    let location_key = TableLocations::key(page, index);
    let page_size = services.config.page_size;
    let size_options = services.config.page_size_options.clone();
    let restore_key = location_key.clone();
    let mut controller = use_signal(move || {
        let mut config = config;
        config.page_size_options = size_options;
        let remembered = locations.peek().get(&restore_key).map(str::to_string);
        let (controller, assigned_defaults) =
            TableController::restore(config, remembered.as_deref(), page_size);
        if assigned_defaults {
            log::debug!("{restore_key} starts at {}", controller.query_string());
        }
        controller
    });

    // Writes the defaulted position on first run, then every change.
    use_effect(move || {
        let current = controller.read().query_string();
        if locations.peek().get(&location_key) != Some(current.as_str()) {
            locations.write().remember(&location_key, current);
        }
    });
    let mut reload = use_signal(|| 0_u64);
    let mut search_text = use_signal(String::new);
    let mut moderation = use_signal(|| None::<Moderation>);
    let debounce_ms = services.config.search_debounce_ms;
    let debouncer = use_hook(move || Debouncer::from_millis(debounce_ms));

    let fetch_services = services.clone();
    use_effect(move || {
        let _ = reload();
        let ticket = controller.write().begin_fetch();
        let crud = fetch_services.crud.clone();
        let generation = ticket.generation;
        spawn(async move {
            let result = run_blocking(move || crud.fetch(&ticket.collection, &ticket.query)).await;
            controller.write().apply_fetch(generation, result);
        });
    });

    let option_services = services.clone();
    use_effect(move || {
        if page != PageId::PressReleases {
            return;
        }
        let packages = option_services.records("packages");
        let industries = option_services.records("industries");
        spawn(async move {
            let loaded = run_blocking(move || {
                Ok((packages.fetch_all(&[])?, industries.fetch_all(&[])?))
            })
            .await;
            match loaded {
                Ok((packages, industries)) => controller
                    .write()
                    .replace_overrides(press_release_overrides(&packages, &industries)),
                Err(err) => log::warn!("failed to load press release options: {err}"),
            }
        });
    });

    let ctl = controller.read();
    let title = ctl.table_title();
    let columns: Vec<ColumnDescriptor> = ctl.display_columns().into_iter().cloned().collect();
    let body = match ctl.body() {
        TableBody::Skeleton(count) => BodyView::Skeleton(count),
        TableBody::Empty(message) => BodyView::Empty(message),
        TableBody::Rows(rows) => BodyView::Rows(
            rows.into_iter()
                .map(|(key, row)| (key.to_string(), row.clone(), ctl.is_selected(key)))
                .collect(),
        ),
    };
    let row_actions = ctl.row_actions();
    let toolbar = ctl.toolbar_buttons();
    let display_range = ctl.display_range();
    let current_page = ctl.query().page;
    let total_pages = ctl.total_pages();
    let current_size = ctl.query().page_size;
    let size_options = ctl.config().page_size_options.clone();
    let search_enabled = ctl.config().search_enabled;
    let all_selected = ctl.all_selected();
    let sort = ctl.sort().cloned();
    let filters = ctl.column_filters().to_vec();
    let dialog = ctl.dialog().clone();
    let dialog_title = ctl.dialog_title();
    let field_errors = ctl.field_errors().to_vec();
    let submit_error = ctl.submit_error().map(str::to_string);
    let submitting = ctl.is_submitting();
    let load_error = match ctl.load_state() {
        LoadState::Failed(err) => Some(err.message.clone()),
        _ => None,
    };
    let schema = ctl.form_schema(services.acting_user().as_ref());
    let collection = ctl.collection().clone();
    let view_cells: Vec<(String, CellView)> = match &dialog {
        Dialog::View(row) => ctl
            .view_fields(row)
            .into_iter()
            .map(|(label, value)| {
                let column = ctl
                    .columns()
                    .iter()
                    .find(|column| column.header == label)
                    .cloned()
                    .unwrap_or_else(|| ColumnDescriptor::new(label.clone(), CellType::Text));
                let view = services.renderers.render_value(&column, Some(value), row);
                (label, view)
            })
            .collect(),
        _ => Vec::new(),
    };
    let delete_prompt = ctl.delete_prompt();
    drop(ctl);

    let renderers = services.renderers.clone();
    let newsroom_base = services.config.newsroom_base_url.clone();

    let action_services = services.clone();
    let run_action = move |action: TableAction, row: Row| match action.kind {
        ActionKind::Edit => controller.write().open_edit(row),
        ActionKind::View => controller.write().open_view(row),
        ActionKind::Delete => controller.write().request_delete_row(&row),
        ActionKind::Custom(id) if id == APPROVE_ACTION => {
            let press = action_services.press_releases.clone();
            let services = action_services.clone();
            spawn(async move {
                let approved = run_blocking(move || press.approve(&row)).await;
                flush_toasts(&services, toasts);
                if approved.is_ok() {
                    *reload.write() += 1;
                }
            });
        }
        ActionKind::Custom(id) if id == REJECT_ACTION => {
            moderation.set(Some(Moderation::Reject(row)))
        }
        ActionKind::Custom(id) if id == ADD_REPORT_ACTION => {
            moderation.set(Some(Moderation::Report(row)))
        }
        other => log::debug!("unhandled row action {other:?}"),
    };

    let submit_services = services.clone();
    let submit_schema = schema.clone();
    let submit_collection = collection.clone();
    let on_submit = move |values: Row| {
        let Some(request) = controller.write().prepare_submit(&submit_schema, &values) else {
            return;
        };
        let crud = submit_services.crud.clone();
        let services = submit_services.clone();
        let collection = submit_collection.clone();
        spawn(async move {
            let result = run_blocking(move || match request {
                SubmitRequest::Create(payload) => crud.create(&collection, &payload),
                SubmitRequest::Update { id, patch } => crud.update(&collection, &id, &patch),
            })
            .await;
            let refetch = controller.write().finish_submit(result);
            flush_toasts(&services, toasts);
            if refetch {
                *reload.write() += 1;
            }
        });
    };

    let delete_services = services.clone();
    let delete_collection = collection.clone();
    let on_confirm_delete = move |_| {
        let Some(ids) = controller.write().confirm_delete() else {
            return;
        };
        let crud = delete_services.crud.clone();
        let services = delete_services.clone();
        let collection = delete_collection.clone();
        spawn(async move {
            let result = run_blocking(move || crud.delete(&collection, &ids)).await;
            let refetch = controller.write().finish_delete(result);
            flush_toasts(&services, toasts);
            if refetch {
                *reload.write() += 1;
            }
        });
    };

    let form_key = match &dialog {
        Dialog::Edit(row) => format!(
            "edit-{}",
            row.get(&collection.id_column).map(Value::to_string).unwrap_or_default()
        ),
        _ => "create".to_string(),
    };
    let initial = match &dialog {
        Dialog::Edit(row) => schema.initial_values(Some(row)),
        _ => schema.initial_values(None),
    };
    let prev_disabled = current_page <= 1;
    let span = columns.len() + 2;
    let pending_moderation = moderation();
    let reject_services = services.clone();
    let report_services = services.clone();
    let next_disabled = current_page >= total_pages;

    rsx! {
        div { style: "border: 1px solid #e5e7eb; border-radius: 10px; padding: 16px; background: #fff;",
            div { style: "display: flex; align-items: center; justify-content: space-between; gap: 12px; margin-bottom: 12px;",
                h2 { style: "margin: 0; font-size: 18px;", "{title}" }
                div { style: "display: flex; align-items: center; gap: 8px;",
                    if search_enabled {
                        input {
                            placeholder: "Search...",
                            style: "padding: 5px 8px; border: 1px solid #d1d5db; border-radius: 6px;",
                            value: "{search_text}",
                            oninput: move |event| {
                                let text = event.value();
                                search_text.set(text.clone());
                                let debouncer = debouncer.clone();
                                spawn(async move {
                                    if debouncer.settle().await && controller.write().set_search(&text) {
                                        *reload.write() += 1;
                                    }
                                });
                            },
                        }
                    }
                    {toolbar.into_iter().map(|button| {
                        let style = if button.destructive { DANGER } else { BUTTON };
                        let label = button.label.clone();
                        rsx! {
                            button {
                                style: style,
                                onclick: move |_| match &button.kind {
                                    ActionKind::CreateNew => controller.write().open_create(),
                                    ActionKind::DeleteSelected => controller.write().request_bulk_delete(),
                                    other => log::debug!("unhandled toolbar action {other:?}"),
                                },
                                "{label}"
                            }
                        }
                    })}
                }
            }

            if let Some(message) = load_error {
                div { style: "color: #b91c1c; margin-bottom: 8px;", "{message}" }
            }

            div { style: "overflow-x: auto;",
                table { style: "width: 100%; border-collapse: collapse; font-size: 13px;",
                    thead {
                        tr { style: "border-bottom: 1px solid #e5e7eb; text-align: left;",
                            th { style: "width: 32px; padding: 6px;",
                                input {
                                    r#type: "checkbox",
                                    checked: all_selected,
                                    onclick: move |_| controller.write().toggle_all(),
                                }
                            }
                            {columns.iter().map(|column| {
                                let key = column.key.clone();
                                let arrow = match &sort {
                                    Some(current) if current.column == column.key => match current.direction {
                                        SortDirection::Asc => " ▲",
                                        SortDirection::Desc => " ▼",
                                    },
                                    _ => "",
                                };
                                let min_width = column.min_width;
                                rsx! {
                                    th {
                                        key: "{column.key}",
                                        style: "padding: 6px; min-width: {min_width}px; cursor: pointer; white-space: nowrap;",
                                        onclick: move |_| controller.write().toggle_sort(&key),
                                        "{column.header}{arrow}"
                                    }
                                }
                            })}
                            th { style: "padding: 6px;", "Actions" }
                        }
                        tr {
                            th {}
                            {columns.iter().map(|column| {
                                let key = column.key.clone();
                                let current = filters
                                    .iter()
                                    .find(|filter| filter.column == column.key)
                                    .map(|filter| filter.term.clone())
                                    .unwrap_or_default();
                                let filterable = column.filterable;
                                rsx! {
                                    th { key: "filter-{column.key}", style: "padding: 4px 6px;",
                                        if filterable {
                                            input {
                                                style: "width: 100%; box-sizing: border-box; padding: 3px 6px; border: 1px solid #e5e7eb; border-radius: 4px; font-weight: normal;",
                                                placeholder: "Filter",
                                                value: "{current}",
                                                oninput: move |event| controller.write().set_column_filter(&key, &event.value()),
                                            }
                                        }
                                    }
                                }
                            })}
                            th {}
                        }
                    }
                    tbody {
                        match body {
                            BodyView::Skeleton(count) => rsx! {
                                {(0..count).map(|idx| rsx! {
                                    tr { key: "skeleton-{idx}",
                                        td { colspan: "{span}", style: "padding: 10px;",
                                            div { style: "height: 12px; background: #f3f4f6; border-radius: 4px;" }
                                        }
                                    }
                                })}
                            },
                            BodyView::Empty(message) => rsx! {
                                tr {
                                    td { colspan: "{span}", style: "padding: 24px; text-align: center; color: #6b7280;",
                                        "{message}"
                                    }
                                }
                            },
                            BodyView::Rows(rows) => rsx! {
                                {rows.into_iter().map(|(row_key, row, selected)| {
                                    let toggle_key = row_key.clone();
                                    let background = if selected { "#eff6ff" } else { "transparent" };
                                    rsx! {
                                        tr { key: "{row_key}", style: "border-bottom: 1px solid #f3f4f6; background: {background};",
                                            td { style: "padding: 6px;",
                                                input {
                                                    r#type: "checkbox",
                                                    checked: selected,
                                                    onclick: move |_| controller.write().toggle_row(&toggle_key),
                                                }
                                            }
                                            {columns.iter().map(|column| {
                                                let view = renderers.render(column, &row);
                                                let tooltip = view.plain_text();
                                                let align = if column.cell_type.is_numeric() { "right" } else { "left" };
                                                rsx! {
                                                    td { key: "{column.key}", title: "{tooltip}", style: "padding: 6px; vertical-align: top; text-align: {align};",
                                                        Cell { view: view }
                                                    }
                                                }
                                            })}
                                            td { style: "padding: 6px; white-space: nowrap;",
                                                {row_actions.iter().cloned().map(|action| {
                                                    let style = if action.destructive { DANGER } else { BUTTON };
                                                    let label = action.label.clone();
                                                    let external = (action.kind == ActionKind::View
                                                        && view_behavior == ViewBehavior::Newsroom)
                                                        .then(|| newsroom_url(&newsroom_base, &row))
                                                        .flatten();
                                                    let row = row.clone();
                                                    let mut run_action = run_action.clone();
                                                    rsx! {
                                                        if let Some(href) = external {
                                                            a { href: "{href}", target: "_blank", style: "{BUTTON} margin-right: 4px; text-decoration: none; color: inherit;", "{label}" }
                                                        } else {
                                                            button {
                                                                style: "{style} margin-right: 4px;",
                                                                onclick: move |_| run_action(action.clone(), row.clone()),
                                                                "{label}"
                                                            }
                                                        }
                                                    }
                                                })}
                                            }
                                        }
                                    }
                                })}
                            },
                        }
                    }
                }
            }

            div { style: "display: flex; align-items: center; justify-content: space-between; margin-top: 12px; font-size: 13px;",
                span { style: "color: #6b7280;", "{display_range}" }
                div { style: "display: flex; align-items: center; gap: 8px;",
                    select {
                        value: "{current_size}",
                        onchange: move |event| {
                            if let Ok(size) = event.value().parse::<i64>() {
                                if controller.write().set_page_size(size) {
                                    *reload.write() += 1;
                                }
                            }
                        },
                        {size_options.iter().map(|size| {
                            let selected = *size == current_size;
                            rsx! { option { value: "{size}", selected: selected, "{size} / page" } }
                        })}
                    }
                    button {
                        style: BUTTON,
                        disabled: prev_disabled,
                        onclick: move |_| {
                            if controller.write().set_page(current_page - 1) {
                                *reload.write() += 1;
                            }
                        },
                        "Previous"
                    }
                    span { "Page {current_page} of {total_pages}" }
                    button {
                        style: BUTTON,
                        disabled: next_disabled,
                        onclick: move |_| {
                            if controller.write().set_page(current_page + 1) {
                                *reload.write() += 1;
                            }
                        },
                        "Next"
                    }
                }
            }

            match dialog {
                Dialog::Create | Dialog::Edit(_) => rsx! {
                    FormDialog {
                        key: "{form_key}",
                        title: dialog_title.clone(),
                        schema: schema.clone(),
                        initial: initial.clone(),
                        errors: field_errors.clone(),
                        submit_error: submit_error.clone(),
                        submitting: submitting,
                        on_submit: on_submit,
                        on_cancel: move |_| controller.write().close_dialog(),
                    }
                },
                Dialog::View(_) => rsx! {
                    div { style: OVERLAY,
                        div { style: PANEL,
                            h3 { style: "margin-top: 0;", "{dialog_title}" }
                            {view_cells.into_iter().map(|(label, view)| rsx! {
                                div { key: "{label}", style: "display: grid; grid-template-columns: 160px 1fr; gap: 8px; padding: 6px 0; border-bottom: 1px solid #f3f4f6;",
                                    span { style: "color: #6b7280;", "{label}" }
                                    Cell { view: view }
                                }
                            })}
                            div { style: "display: flex; justify-content: flex-end; gap: 8px; margin-top: 16px;",
                                button { style: BUTTON, onclick: move |_| controller.write().edit_from_view(), "Edit" }
                                button { style: BUTTON, onclick: move |_| controller.write().close_dialog(), "Close" }
                            }
                        }
                    }
                },
                Dialog::ConfirmDelete(_) => rsx! {
                    if let Some(prompt) = delete_prompt {
                        div { style: OVERLAY,
                            div { style: PANEL,
                                h3 { style: "margin-top: 0;", "{prompt.title}" }
                                p { style: "color: #4b5563;", "{prompt.description}" }
                                if let Some(error) = submit_error.clone() {
                                    div { style: "color: #b91c1c;", "{error}" }
                                }
                                div { style: "display: flex; justify-content: flex-end; gap: 8px; margin-top: 16px;",
                                    button { style: BUTTON, onclick: move |_| controller.write().close_dialog(), "Cancel" }
                                    button {
                                        style: DANGER,
                                        disabled: submitting,
                                        onclick: on_confirm_delete,
                                        if submitting { "Deleting..." } else { "Delete" }
                                    }
                                }
                            }
                        }
                    }
                },
                Dialog::Closed => rsx! {},
            }

            match pending_moderation {
                Some(Moderation::Reject(row)) => rsx! {
                    RejectDialog {
                        release: row,
                        on_done: move |changed: bool| {
                            moderation.set(None);
                            flush_toasts(&reject_services, toasts);
                            if changed {
                                *reload.write() += 1;
                            }
                        },
                    }
                },
                Some(Moderation::Report(row)) => rsx! {
                    UploadReportDialog {
                        release: row,
                        on_done: move |changed: bool| {
                            moderation.set(None);
                            flush_toasts(&report_services, toasts);
                            if changed {
                                *reload.write() += 1;
                            }
                        },
                    }
                },
                None => rsx! {},
            }
        }
    }
}
