use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::column::{find_override, CellType, ColumnDescriptor, ColumnOverride};
use crate::domain::entities::error::{BackendError, FieldError};
use crate::domain::entities::query::{
    ColumnFilter, PageResult, SortDirection, SortSpec, TableQuery,
};
use crate::domain::entities::row::{compare_values, row_identity, value_to_text, Row};
use crate::usecase::services::crud_service::CollectionConfig;
use crate::usecase::services::form_schema::{generate_form, ActingUser, FormSchema};
use crate::usecase::services::inference::generate_columns;

pub const EMPTY_MESSAGE: &str = "No results found.";
pub const DEFAULT_PAGE_SIZE_OPTIONS: [i64; 4] = [10, 20, 50, 100];

pub type RowKeyFn = Arc<dyn Fn(&Row) -> Option<String> + Send + Sync>;

/// What a row action or toolbar button does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Edit,
    View,
    Delete,
    CreateNew,
    DeleteSelected,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAction {
    pub kind: ActionKind,
    pub label: String,
    pub destructive: bool,
}

impl TableAction {
    pub fn custom(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Custom(id.into()),
            label: label.into(),
            destructive: false,
        }
    }

    fn builtin(kind: ActionKind, label: impl Into<String>, destructive: bool) -> Self {
        Self {
            kind,
            label: label.into(),
            destructive,
        }
    }
}

#[derive(Clone)]
pub struct TableConfig {
    pub collection: CollectionConfig,
    pub hidden_columns: Vec<String>,
    pub overrides: Vec<ColumnOverride>,
    pub extra_actions: Vec<TableAction>,
    pub extra_buttons: Vec<TableAction>,
    pub create_enabled: bool,
    pub search_enabled: bool,
    pub page_size_options: Vec<i64>,
    pub row_key: Option<RowKeyFn>,
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("collection", &self.collection)
            .field("hidden_columns", &self.hidden_columns)
            .field("overrides", &self.overrides)
            .field("extra_actions", &self.extra_actions)
            .field("extra_buttons", &self.extra_buttons)
            .field("create_enabled", &self.create_enabled)
            .field("search_enabled", &self.search_enabled)
            .field("page_size_options", &self.page_size_options)
            .field("row_key", &self.row_key.is_some())
            .finish()
    }
}

impl TableConfig {
    pub fn new(collection: CollectionConfig) -> Self {
        Self {
            collection,
            hidden_columns: Vec::new(),
            overrides: Vec::new(),
            extra_actions: Vec::new(),
            extra_buttons: Vec::new(),
            create_enabled: true,
            search_enabled: true,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            row_key: None,
        }
    }

    pub fn hiding(mut self, columns: &[&str]) -> Self {
        self.hidden_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Issued by `begin_fetch`; only the newest ticket's result is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub collection: CollectionConfig,
    pub query: TableQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(BackendError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableBody<'a> {
    Skeleton(usize),
    Empty(&'static str),
    Rows(Vec<(&'a str, &'a Row)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dialog {
    Closed,
    Create,
    Edit(Row),
    View(Row),
    ConfirmDelete(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub title: String,
    pub description: String,
}

/// Validated mutation ready to be sent to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitRequest {
    Create(Row),
    Update { id: Value, patch: Row },
}

/// Grid state for one collection page: query, columns, selection, dialogs.
pub struct TableController {
    config: TableConfig,
    query: TableQuery,
    generation: u64,
    load: LoadState,
    page: PageResult,
    row_keys: Vec<String>,
    columns: Vec<ColumnDescriptor>,
    selection: BTreeSet<String>,
    client_sort: Option<SortSpec>,
    client_filters: Vec<ColumnFilter>,
    dialog: Dialog,
    field_errors: Vec<FieldError>,
    submit_error: Option<String>,
    submitting: bool,
}

impl TableController {
    pub fn new(config: TableConfig, query: TableQuery) -> Self {
        Self {
            config,
            query,
            generation: 0,
            load: LoadState::Idle,
            page: PageResult::default(),
            row_keys: Vec::new(),
            columns: Vec::new(),
            selection: BTreeSet::new(),
            client_sort: None,
            client_filters: Vec::new(),
            dialog: Dialog::Closed,
            field_errors: Vec::new(),
            submit_error: None,
            submitting: false,
        }
    }

    /// Builds from a navigable query string. The flag asks the caller to
    /// write the defaulted `page`/`pageSize` back once.
    pub fn from_query_string(config: TableConfig, query_string: &str) -> (Self, bool) {
        let (query, assigned_defaults) = TableQuery::from_query_string(query_string);
        (Self::new(config, query), assigned_defaults)
    }

    /// Reopens a table at its remembered query string. Without one, or when
    /// pagination is missing from it, the table starts on page 1 with the
    /// configured page size and the flag is set.
    pub fn restore(config: TableConfig, remembered: Option<&str>, page_size: i64) -> (Self, bool) {
        let (mut controller, assigned_defaults) =
            Self::from_query_string(config, remembered.unwrap_or_default());
        if assigned_defaults && page_size > 0 {
            controller.query.page_size = page_size;
        }
        (controller, assigned_defaults)
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn collection(&self) -> &CollectionConfig {
        &self.config.collection
    }

    pub fn query(&self) -> &TableQuery {
        &self.query
    }

    pub fn query_string(&self) -> String {
        self.query.to_query_string()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_loading(&self) -> bool {
        self.load == LoadState::Loading
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total_count(&self) -> i64 {
        self.page.count
    }

    pub fn rows(&self) -> &[Row] {
        &self.page.rows
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn replace_overrides(&mut self, overrides: Vec<ColumnOverride>) {
        self.config.overrides = overrides;
        self.columns = self.resolve_columns();
    }

    // ----- fetch lifecycle -----

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.load = LoadState::Loading;
        FetchTicket {
            generation: self.generation,
            collection: self.config.collection.clone(),
            query: self.query.clone(),
        }
    }

    /// Applies a fetch result. Returns false when the ticket is stale.
    pub fn apply_fetch(
        &mut self,
        generation: u64,
        result: Result<PageResult, BackendError>,
    ) -> bool {
        if generation != self.generation {
            log::warn!(
                "dropping stale {} response (generation {generation}, current {})",
                self.config.collection.name,
                self.generation
            );
            return false;
        }
        match result {
            Ok(page) => {
                self.row_keys = page.rows.iter().map(|row| self.key_for(row)).collect();
                self.page = page;
                self.columns = self.resolve_columns();
                let present: BTreeSet<&String> = self.row_keys.iter().collect();
                self.selection.retain(|key| present.contains(key));
                self.load = LoadState::Loaded;
            }
            Err(err) => {
                log::warn!("fetch of {} failed: {err}", self.config.collection.name);
                self.load = LoadState::Failed(err);
            }
        }
        true
    }

    fn key_for(&self, row: &Row) -> String {
        let key = match &self.config.row_key {
            Some(key_fn) => key_fn(row),
            None => row_identity(row, &self.config.collection.id_column),
        };
        key.unwrap_or_else(|| Uuid::new_v4().simple().to_string())
    }

    fn resolve_columns(&self) -> Vec<ColumnDescriptor> {
        generate_columns(&self.page.rows)
            .into_iter()
            .map(|mut column| {
                if let Some(cell_type) =
                    find_override(&self.config.overrides, &column.key).and_then(|o| o.cell_type)
                {
                    column = ColumnDescriptor::new(column.key, cell_type);
                }
                column
            })
            .collect()
    }

    // ----- query state -----

    /// Each setter returns true when the query changed and a refetch is due.
    pub fn set_page(&mut self, page: i64) -> bool {
        let page = page.clamp(1, self.total_pages().max(1));
        self.replace_query(TableQuery {
            page,
            ..self.query.clone()
        })
    }

    pub fn set_page_size(&mut self, page_size: i64) -> bool {
        if page_size <= 0 {
            return false;
        }
        self.replace_query(TableQuery {
            page: 1,
            page_size,
            ..self.query.clone()
        })
    }

    pub fn set_search(&mut self, term: &str) -> bool {
        if !self.config.search_enabled {
            return false;
        }
        if self.query.search == term {
            return false;
        }
        self.replace_query(TableQuery {
            page: 1,
            search: term.to_string(),
            ..self.query.clone()
        })
    }

    fn replace_query(&mut self, next: TableQuery) -> bool {
        if next == self.query {
            return false;
        }
        self.query = next;
        true
    }

    pub fn total_pages(&self) -> i64 {
        let size = self.query.page_size.max(1);
        (self.page.count + size - 1) / size
    }

    /// "Showing A to B of T entries", or "No entries to display".
    pub fn display_range(&self) -> String {
        if self.page.count <= 0 || self.page.rows.is_empty() {
            return "No entries to display".to_string();
        }
        let start = (self.query.page - 1) * self.query.page_size + 1;
        let end = (self.query.page * self.query.page_size).min(self.page.count);
        format!("Showing {start} to {end} of {} entries", self.page.count)
    }

    // ----- columns -----

    /// Columns shown in the grid. `id` is always hidden.
    pub fn display_columns(&self) -> Vec<&ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|column| {
                column.key != "id" && !self.config.hidden_columns.contains(&column.key)
            })
            .collect()
    }

    pub fn form_columns(&self) -> Vec<ColumnDescriptor> {
        let collection = &self.config.collection;
        self.columns
            .iter()
            .filter(|column| {
                !collection.is_excluded(&column.key) && column.key != collection.id_column
            })
            .cloned()
            .collect()
    }

    pub fn required_columns(&self) -> Vec<String> {
        self.form_columns()
            .into_iter()
            .filter(|column| matches!(column.cell_type, CellType::Text | CellType::Email))
            .map(|column| column.key)
            .collect()
    }

    pub fn form_schema(&self, acting_user: Option<&ActingUser>) -> FormSchema {
        generate_form(
            &self.form_columns(),
            &self.required_columns(),
            &self.config.overrides,
            acting_user,
        )
    }

    // ----- client side sort and filter -----

    /// Cycles asc, desc, off.
    pub fn toggle_sort(&mut self, column: &str) {
        self.client_sort = match &self.client_sort {
            Some(sort) if sort.column == column => match sort.direction {
                SortDirection::Asc => Some(SortSpec {
                    column: column.to_string(),
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                column: column.to_string(),
                direction: SortDirection::Asc,
            }),
        };
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.client_sort.as_ref()
    }

    pub fn set_column_filter(&mut self, column: &str, term: &str) {
        self.client_filters.retain(|filter| filter.column != column);
        if !term.trim().is_empty() {
            self.client_filters.push(ColumnFilter {
                column: column.to_string(),
                term: term.to_string(),
            });
        }
    }

    pub fn column_filters(&self) -> &[ColumnFilter] {
        &self.client_filters
    }

    /// Current page after column filters and sort, paired with selection keys.
    pub fn visible_rows(&self) -> Vec<(&str, &Row)> {
        let mut rows: Vec<(&str, &Row)> = self
            .row_keys
            .iter()
            .map(String::as_str)
            .zip(self.page.rows.iter())
            .filter(|(_, row)| {
                self.client_filters.iter().all(|filter| {
                    row.get(&filter.column)
                        .map(value_to_text)
                        .unwrap_or_default()
                        .to_lowercase()
                        .contains(&filter.term.trim().to_lowercase())
                })
            })
            .collect();

        if let Some(sort) = &self.client_sort {
            rows.sort_by(|(_, a), (_, b)| {
                let ordering = compare_values(a.get(&sort.column), b.get(&sort.column));
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        rows
    }

    pub fn body(&self) -> TableBody<'_> {
        if self.is_loading() {
            return TableBody::Skeleton(self.query.page_size.max(1) as usize);
        }
        let rows = self.visible_rows();
        if rows.is_empty() {
            TableBody::Empty(EMPTY_MESSAGE)
        } else {
            TableBody::Rows(rows)
        }
    }

    // ----- selection -----

    pub fn toggle_row(&mut self, key: &str) {
        if !self.selection.remove(key) && self.row_keys.iter().any(|k| k == key) {
            self.selection.insert(key.to_string());
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selection.contains(key)
    }

    pub fn all_selected(&self) -> bool {
        !self.row_keys.is_empty() && self.row_keys.iter().all(|key| self.selection.contains(key))
    }

    pub fn toggle_all(&mut self) {
        if self.all_selected() {
            self.selection.clear();
        } else {
            self.selection = self.row_keys.iter().cloned().collect();
        }
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn selected_rows(&self) -> Vec<&Row> {
        self.row_keys
            .iter()
            .zip(self.page.rows.iter())
            .filter(|(key, _)| self.selection.contains(*key))
            .map(|(_, row)| row)
            .collect()
    }

    // ----- actions -----

    /// Edit, View, the page's extra actions, then Delete.
    pub fn row_actions(&self) -> Vec<TableAction> {
        let mut actions = vec![
            TableAction::builtin(ActionKind::Edit, "Edit", false),
            TableAction::builtin(ActionKind::View, "View", false),
        ];
        actions.extend(self.config.extra_actions.iter().cloned());
        actions.push(TableAction::builtin(ActionKind::Delete, "Delete", true));
        actions
    }

    pub fn toolbar_buttons(&self) -> Vec<TableAction> {
        let mut buttons = Vec::new();
        if self.config.create_enabled {
            buttons.push(TableAction::builtin(ActionKind::CreateNew, "Create New", false));
        }
        if !self.selection.is_empty() {
            buttons.push(TableAction::builtin(
                ActionKind::DeleteSelected,
                format!("Delete Selected ({})", self.selection.len()),
                true,
            ));
        }
        buttons.extend(self.config.extra_buttons.iter().cloned());
        buttons
    }

    // ----- dialogs -----

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn open(&mut self, dialog: Dialog) {
        self.field_errors.clear();
        self.submit_error = None;
        self.submitting = false;
        self.dialog = dialog;
    }

    pub fn open_create(&mut self) {
        if self.config.create_enabled {
            self.open(Dialog::Create);
        }
    }

    pub fn open_edit(&mut self, row: Row) {
        self.open(Dialog::Edit(row));
    }

    pub fn open_view(&mut self, row: Row) {
        self.open(Dialog::View(row));
    }

    /// Hands the viewed row over to the edit dialog.
    pub fn edit_from_view(&mut self) {
        if let Dialog::View(row) = std::mem::replace(&mut self.dialog, Dialog::Closed) {
            self.open(Dialog::Edit(row));
        }
    }

    pub fn close_dialog(&mut self) {
        self.open(Dialog::Closed);
    }

    pub fn table_title(&self) -> String {
        crate::domain::entities::column::header_from_key(&self.config.collection.name)
    }

    fn singular_title(&self) -> String {
        let mut title = self.table_title();
        title.pop();
        title
    }

    pub fn dialog_title(&self) -> String {
        match &self.dialog {
            Dialog::Create => format!("Create New {}", self.singular_title()),
            Dialog::Edit(_) => format!("Edit {}", self.singular_title()),
            Dialog::View(_) => format!("View {}", self.singular_title()),
            Dialog::ConfirmDelete(ids) => {
                delete_prompt(ids.len(), &self.config.collection.name).title
            }
            Dialog::Closed => String::new(),
        }
    }

    /// Label/value pairs of the viewed row, without id or excluded fields.
    pub fn view_fields<'a>(&self, row: &'a Row) -> Vec<(String, &'a Value)> {
        let collection = &self.config.collection;
        row.iter()
            .filter(|(key, _)| **key != collection.id_column && !collection.is_excluded(key))
            .map(|(key, value)| (crate::domain::entities::column::header_from_key(key), value))
            .collect()
    }

    // ----- delete -----

    pub fn request_delete_row(&mut self, row: &Row) {
        let id_column = &self.config.collection.id_column;
        match row.get(id_column) {
            Some(id) if !id.is_null() && !value_to_text(id).is_empty() => {
                self.open(Dialog::ConfirmDelete(vec![id.clone()]));
            }
            _ => log::warn!("row without {id_column} cannot be deleted"),
        }
    }

    pub fn request_bulk_delete(&mut self) {
        let id_column = self.config.collection.id_column.clone();
        let ids: Vec<Value> = self
            .selected_rows()
            .into_iter()
            .filter_map(|row| row.get(&id_column))
            .filter(|id| !id.is_null() && !value_to_text(id).is_empty())
            .cloned()
            .collect();
        if !ids.is_empty() {
            self.open(Dialog::ConfirmDelete(ids));
        }
    }

    pub fn delete_prompt(&self) -> Option<DeletePrompt> {
        match &self.dialog {
            Dialog::ConfirmDelete(ids) if !ids.is_empty() => {
                Some(delete_prompt(ids.len(), &self.config.collection.name))
            }
            _ => None,
        }
    }

    /// Clears the selection and hands out the ids to delete.
    pub fn confirm_delete(&mut self) -> Option<Vec<Value>> {
        match &self.dialog {
            Dialog::ConfirmDelete(ids) if !self.submitting => {
                let ids = ids.clone();
                self.submitting = true;
                Some(ids)
            }
            _ => None,
        }
    }

    /// Returns true when a refetch is due.
    pub fn finish_delete(&mut self, result: Result<Vec<Row>, BackendError>) -> bool {
        self.submitting = false;
        match result {
            Ok(_) => {
                self.selection.clear();
                self.close_dialog();
                true
            }
            Err(err) => {
                self.submit_error = Some(err.message);
                false
            }
        }
    }

    // ----- submit -----

    /// Validates the form values. Field errors keep the request local.
    pub fn prepare_submit(&mut self, schema: &FormSchema, values: &Row) -> Option<SubmitRequest> {
        if self.submitting {
            return None;
        }
        let payload = match schema.validate(values) {
            Ok(payload) => payload,
            Err(errors) => {
                self.field_errors = errors;
                return None;
            }
        };
        self.field_errors.clear();
        self.submit_error = None;

        let request = match &self.dialog {
            Dialog::Create => SubmitRequest::Create(payload),
            Dialog::Edit(row) => {
                let id = row
                    .get(&self.config.collection.id_column)
                    .cloned()
                    .unwrap_or(Value::Null);
                SubmitRequest::Update { id, patch: payload }
            }
            _ => return None,
        };
        self.submitting = true;
        Some(request)
    }

    /// Success closes the dialog and asks for a refetch; failure keeps it open.
    pub fn finish_submit(&mut self, result: Result<Row, BackendError>) -> bool {
        self.submitting = false;
        match result {
            Ok(_) => {
                self.close_dialog();
                true
            }
            Err(err) => {
                self.submit_error = Some(err.message);
                false
            }
        }
    }
}

pub fn delete_prompt(count: usize, table_name: &str) -> DeletePrompt {
    let (noun_title, noun) = if count == 1 {
        ("Record", "record")
    } else {
        ("Records", "records")
    };
    DeletePrompt {
        title: format!("Delete {count} {noun_title}"),
        description: format!(
            "Are you sure you want to delete {count} {noun} from {}? This action cannot be undone.",
            table_name.replace('_', " ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::error::ROW_NOT_FOUND;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        values
            .as_array()
            .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    fn page(values: Value, count: i64) -> PageResult {
        PageResult {
            count,
            rows: rows(values),
        }
    }

    fn controller() -> TableController {
        let config = TableConfig::new(CollectionConfig::new("press_releases").excluding(&["fts"]))
            .hiding(&["slug"]);
        TableController::new(config, TableQuery::default())
    }

    fn loaded() -> TableController {
        let mut table = controller();
        let ticket = table.begin_fetch();
        table.apply_fetch(
            ticket.generation,
            Ok(page(
                json!([
                    {"id": "r1", "title": "Beta", "slug": "beta", "views": 20, "fts": "x"},
                    {"id": "r2", "title": "alpha", "slug": "alpha", "views": 5, "fts": "y"},
                    {"id": "r3", "title": "Gamma", "slug": "gamma", "views": null, "fts": "z"}
                ]),
                23,
            )),
        );
        table
    }

    #[test]
    fn restore_keeps_a_remembered_position() {
        let config = controller().config().clone();
        let (table, assigned) =
            TableController::restore(config.clone(), Some("page=3&pageSize=20&q=launch"), 10);
        assert!(!assigned);
        assert_eq!(table.query_string(), "page=3&pageSize=20&q=launch");

        let (table, assigned) = TableController::restore(config.clone(), None, 50);
        assert!(assigned);
        assert_eq!(table.query_string(), "page=1&pageSize=50");

        let (table, assigned) = TableController::restore(config, Some("page=4"), 20);
        assert!(assigned);
        assert_eq!((table.query().page, table.query().page_size), (1, 20));
    }

    #[test]
    fn stale_generations_are_dropped() {
        let mut table = controller();
        let first = table.begin_fetch();
        let second = table.begin_fetch();

        assert!(table.apply_fetch(second.generation, Ok(page(json!([{"id": "new"}]), 1))));
        assert!(!table.apply_fetch(first.generation, Ok(page(json!([{"id": "old"}]), 1))));
        assert_eq!(table.rows()[0]["id"], json!("new"));
        assert_eq!(table.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn loading_body_shows_page_size_skeleton_rows() {
        let mut table = controller();
        table.set_page_size(20);
        table.begin_fetch();
        assert_eq!(table.body(), TableBody::Skeleton(20));

        let ticket = table.begin_fetch();
        table.apply_fetch(ticket.generation, Ok(PageResult::default()));
        assert_eq!(table.body(), TableBody::Empty("No results found."));
        assert_eq!(table.display_range(), "No entries to display");
    }

    #[test]
    fn columns_hide_id_and_configured_columns() {
        let table = loaded();
        let shown: Vec<&str> = table.display_columns().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(shown, vec!["title", "views", "fts"]);

        let form: Vec<String> = table.form_columns().into_iter().map(|c| c.key).collect();
        assert_eq!(form, vec!["title", "slug", "views"]);
        assert_eq!(table.required_columns(), vec!["title", "slug"]);
    }

    #[test]
    fn page_size_and_search_reset_page() {
        let mut table = loaded();
        assert!(table.set_page(3));
        assert_eq!(table.query().range().from, 20);
        assert!(table.set_page_size(50));
        assert_eq!(table.query().page, 1);
        table.set_page(2);
        assert!(table.set_search("launch"));
        assert_eq!(table.query().page, 1);
        assert!(!table.set_search("launch"));
        assert_eq!(table.query_string(), "page=1&pageSize=50&q=launch");
    }

    #[test]
    fn display_range_and_total_pages() {
        let mut table = loaded();
        assert_eq!(table.display_range(), "Showing 1 to 10 of 23 entries");
        assert_eq!(table.total_pages(), 3);
        table.set_page(3);
        assert_eq!(table.display_range(), "Showing 21 to 23 of 23 entries");
    }

    #[test]
    fn client_sort_cycles_and_filters_narrow() {
        let mut table = loaded();
        table.toggle_sort("title");
        let titles = |t: &TableController| -> Vec<String> {
            t.visible_rows()
                .iter()
                .map(|(_, row)| value_to_text(&row["title"]))
                .collect()
        };
        assert_eq!(titles(&table), vec!["alpha", "Beta", "Gamma"]);
        table.toggle_sort("title");
        assert_eq!(titles(&table), vec!["Gamma", "Beta", "alpha"]);
        table.toggle_sort("title");
        assert_eq!(titles(&table), vec!["Beta", "alpha", "Gamma"]);

        table.toggle_sort("views");
        assert_eq!(titles(&table), vec!["alpha", "Beta", "Gamma"]);
        table.toggle_sort("views");

        table.set_column_filter("title", "MM");
        assert_eq!(titles(&table), vec!["Gamma"]);
        table.set_column_filter("title", "");
        assert_eq!(table.visible_rows().len(), 3);
    }

    #[test]
    fn bulk_delete_uses_one_prompt_and_clears_selection() {
        let mut table = loaded();
        table.toggle_row("r1");
        table.toggle_row("r3");
        table.toggle_row("missing");
        assert_eq!(table.selected_count(), 2);
        let labels: Vec<String> = table.toolbar_buttons().into_iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["Create New", "Delete Selected (2)"]);

        table.request_bulk_delete();
        let prompt = table.delete_prompt().expect("prompt should be open");
        assert_eq!(prompt.title, "Delete 2 Records");
        assert_eq!(
            prompt.description,
            "Are you sure you want to delete 2 records from press releases? This action cannot be undone."
        );

        let ids = table.confirm_delete().expect("ids to delete");
        assert_eq!(ids, vec![json!("r1"), json!("r3")]);
        assert_eq!(table.selected_count(), 2);
        assert!(table.finish_delete(Ok(Vec::new())));
        assert_eq!(table.selected_count(), 0);
        assert_eq!(table.dialog(), &Dialog::Closed);
    }

    #[test]
    fn failed_bulk_delete_keeps_dialog_and_selection() {
        let mut table = loaded();
        table.toggle_row("r1");
        table.toggle_row("r2");
        table.request_bulk_delete();
        table.confirm_delete().expect("ids to delete");

        let refetch = table.finish_delete(Err(BackendError::new("23503", "row is referenced")));
        assert!(!refetch);
        assert_eq!(table.selected_count(), 2);
        assert!(table.delete_prompt().is_some());
        assert_eq!(table.submit_error(), Some("row is referenced"));

        let ids = table.confirm_delete().expect("retry should hand out the same ids");
        assert_eq!(ids, vec![json!("r1"), json!("r2")]);
    }

    #[test]
    fn single_delete_prompt_is_singular() {
        let mut table = loaded();
        let row = table.rows()[1].clone();
        table.request_delete_row(&row);
        assert_eq!(
            table.delete_prompt().map(|p| p.title),
            Some("Delete 1 Record".to_string())
        );
    }

    #[test]
    fn rows_without_identity_get_random_keys() {
        let mut table = controller();
        let ticket = table.begin_fetch();
        table.apply_fetch(ticket.generation, Ok(page(json!([{"title": "a"}, {"title": "b"}]), 2)));
        let keys: Vec<&str> = table.visible_rows().iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn submit_keeps_dialog_open_on_errors() {
        let mut table = loaded();
        let row = table.rows()[0].clone();
        table.open_edit(row);
        let schema = table.form_schema(None);

        let mut values = schema.initial_values(table.rows().first());
        values.insert("title".to_string(), json!(""));
        assert_eq!(table.prepare_submit(&schema, &values), None);
        assert_eq!(table.field_errors()[0].field, "title");

        values.insert("title".to_string(), json!("Beta 2"));
        let request = table.prepare_submit(&schema, &values).expect("valid form");
        match request {
            SubmitRequest::Update { id, patch } => {
                assert_eq!(id, json!("r1"));
                assert_eq!(patch["title"], json!("Beta 2"));
            }
            other => panic!("unexpected request {other:?}"),
        }

        let failed = table.finish_submit(Err(BackendError::new(ROW_NOT_FOUND, "gone")));
        assert!(!failed);
        assert!(matches!(table.dialog(), Dialog::Edit(_)));
        assert_eq!(table.submit_error(), Some("gone"));
        assert_eq!(table.rows()[0]["title"], json!("Beta"));
    }

    #[test]
    fn actions_and_dialog_titles() {
        let mut config = TableConfig::new(CollectionConfig::new("press_releases"));
        config.extra_actions = vec![TableAction::custom("approve", "Approve")];
        config.create_enabled = false;
        let mut table = TableController::new(config, TableQuery::default());

        let labels: Vec<String> = table.row_actions().into_iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["Edit", "View", "Approve", "Delete"]);
        assert!(table.toolbar_buttons().is_empty());

        table.open_create();
        assert_eq!(table.dialog(), &Dialog::Closed);

        table.open_view(rows(json!([{"id": "r1", "title": "x"}])).remove(0));
        assert_eq!(table.dialog_title(), "View Press Release");
        table.edit_from_view();
        assert_eq!(table.dialog_title(), "Edit Press Release");
    }
}
