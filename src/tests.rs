use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use serde_json::{json, Value};

use crate::domain::entities::error::{BackendError, CONSTRAINT_VIOLATION, ROW_NOT_FOUND};
use crate::domain::entities::query::TableQuery;
use crate::domain::entities::row::{row_str, Row};
use crate::infra::sqlite::repo::SqliteBackend;
use crate::infra::sqlite::schema::init_db;
use crate::infra::storage::fs_store::FsObjectStore;
use crate::usecase::ports::backend::{
    CollectionBackend, SearchRequest, SearchResponse, SelectRequest, SelectResponse,
};
use crate::usecase::ports::notifier::{Notification, Notifier, ToastQueue};
use crate::usecase::services::crud_service::{CollectionConfig, CrudService, QueryCache};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::press_release_service::{
    PressReleaseService, RejectionReason, ReportUpload, PRESS_RELEASES, REJECTIONS,
};
use crate::usecase::services::record_service::RecordService;
use crate::usecase::services::render::CurrencyFormat;
use crate::usecase::services::stats_service::StatsService;
use crate::usecase::services::table_controller::{TableConfig, TableController};

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("intool-{prefix}-{nanos}"))
}

fn rows(values: Value) -> Vec<Row> {
    values
        .as_array()
        .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect())
        .unwrap_or_default()
}

struct Fixture {
    temp_dir: PathBuf,
    sqlite: Arc<SqliteBackend>,
    toasts: Arc<ToastQueue>,
    cache: Arc<QueryCache>,
}

impl Fixture {
    fn new(prefix: &str) -> Self {
        let temp_dir = unique_test_dir(prefix);
        fs::create_dir_all(&temp_dir).expect("should create temp dir");
        let sqlite =
            SqliteBackend::open(temp_dir.join("app.sqlite")).expect("backend should open");
        Self {
            temp_dir,
            sqlite: Arc::new(sqlite),
            toasts: Arc::new(ToastQueue::new()),
            cache: Arc::new(QueryCache::new()),
        }
    }

    fn backend(&self) -> Arc<dyn CollectionBackend> {
        self.sqlite.clone()
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        self.toasts.clone()
    }

    fn crud(&self) -> CrudService {
        CrudService::new(self.backend(), self.notifier(), self.cache.clone())
    }

    fn seed(&self, collection: &str, values: Value) {
        self.sqlite
            .insert_many(collection, &rows(values))
            .expect("should seed rows");
    }

    fn all(&self, collection: &str) -> Vec<Row> {
        self.sqlite
            .select(collection, &SelectRequest::default())
            .expect("select should succeed")
            .rows
    }

    fn last_toast(&self) -> Option<Notification> {
        self.toasts.snapshot().last().cloned()
    }

    fn cleanup(self) {
        fs::remove_dir_all(&self.temp_dir).expect("should cleanup temp dir");
    }
}

fn query(page: i64, page_size: i64) -> TableQuery {
    TableQuery {
        page,
        page_size,
        ..TableQuery::default()
    }
}

fn numbered_users(count: i64) -> Value {
    Value::Array(
        (0..count)
            .map(|seq| json!({ "name": format!("user-{seq}"), "seq": seq }))
            .collect(),
    )
}

fn seq_of(row: &Row) -> Option<i64> {
    row.get("seq").and_then(Value::as_i64)
}

#[test]
fn init_db_creates_collection_table() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'collection_row'",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 1, "collection table should exist");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn insert_assigns_an_id_when_missing() {
    let fixture = Fixture::new("insert-id");

    let stored = fixture
        .sqlite
        .insert("plans", &rows(json!([{ "name": "Basic" }]))[0])
        .expect("insert should succeed");

    let row = &stored[0];
    assert_eq!(row.keys().next().map(String::as_str), Some("id"));
    assert!(row_str(row, "id").is_some_and(|id| !id.is_empty()));
    assert_eq!(fixture.all("plans").len(), 1);

    fixture.cleanup();
}

#[test]
fn duplicate_ids_are_rejected() {
    let fixture = Fixture::new("duplicate-id");
    fixture.seed("plans", json!([{ "id": "p1", "name": "Basic" }]));

    let result = fixture
        .sqlite
        .insert("plans", &rows(json!([{ "id": "p1", "name": "Again" }]))[0]);

    assert!(result.is_err(), "second insert with same id should fail");
    assert_eq!(fixture.all("plans").len(), 1);

    fixture.cleanup();
}

#[test]
fn fetch_pages_newest_first_with_exact_count() {
    let fixture = Fixture::new("paging");
    fixture.seed("users", numbered_users(60));
    let crud = fixture.crud();
    let config = CollectionConfig::new("users");

    let first = crud.fetch(&config, &query(1, 10)).expect("first page should load");
    assert_eq!(first.count, 60);
    assert_eq!(first.rows.len(), 10);
    assert_eq!(seq_of(&first.rows[0]), Some(59));
    assert_eq!(seq_of(&first.rows[9]), Some(50));

    let third = crud.fetch(&config, &query(3, 20)).expect("third page should load");
    assert_eq!(third.count, 60);
    assert_eq!(third.rows.len(), 20);
    assert_eq!(seq_of(&third.rows[0]), Some(19));
    assert_eq!(seq_of(&third.rows[19]), Some(0));

    fixture.cleanup();
}

#[test]
fn fetch_past_the_end_is_empty_but_counted() {
    let fixture = Fixture::new("past-end");
    fixture.seed("users", numbered_users(5));

    let page = fixture
        .crud()
        .fetch(&CollectionConfig::new("users"), &query(4, 10))
        .expect("page should load");

    assert!(page.rows.is_empty());
    assert_eq!(page.count, 5);

    fixture.cleanup();
}

#[test]
fn excluded_columns_never_reach_pages_or_search() {
    let fixture = Fixture::new("excluded");
    fixture.seed(
        "users",
        json!([
            { "name": "Alice", "password": "hunter2" },
            { "name": "Bob", "password": "alice-secret" }
        ]),
    );
    let crud = fixture.crud();
    let config = CollectionConfig::new("users").excluding(&["password"]);

    let page = crud.fetch(&config, &query(1, 10)).expect("page should load");
    assert_eq!(page.rows.len(), 2);
    assert!(page.rows.iter().all(|row| !row.contains_key("password")));

    let search = TableQuery {
        search: "alice".to_string(),
        ..query(1, 10)
    };
    let found = crud.fetch(&config, &search).expect("search should succeed");
    assert_eq!(found.count, 1, "excluded column should not match");
    assert_eq!(row_str(&found.rows[0], "name"), Some("Alice"));
    assert!(!found.rows[0].contains_key("password"));

    fixture.cleanup();
}

#[test]
fn mutations_notify_and_invalidate_the_cache() {
    let fixture = Fixture::new("mutations");
    fixture.seed("plans", json!([{ "id": "p1", "name": "Basic", "price": 49900 }]));
    let crud = fixture.crud();
    let config = CollectionConfig::new("plans");

    crud.fetch(&config, &query(1, 10)).expect("page should load");
    assert_eq!(fixture.cache.len("plans"), 1);

    let created = crud
        .create(&config, &rows(json!([{ "name": "Pro", "price": 99900 }]))[0])
        .expect("create should succeed");
    assert!(fixture.cache.is_empty("plans"));
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::success("Successfully created record"))
    );

    let id = created.get("id").cloned().expect("created row should carry an id");
    let updated = crud
        .update(&config, &id, &rows(json!([{ "price": 89900 }]))[0])
        .expect("update should succeed");
    assert_eq!(updated.get("price"), Some(&json!(89900)));
    assert_eq!(updated.get("name"), Some(&json!("Pro")));

    let deleted = crud
        .delete(&config, &[json!("p1"), id])
        .expect("delete should succeed");
    assert_eq!(deleted.len(), 2);
    assert!(fixture.all("plans").is_empty());
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::success("Successfully deleted record"))
    );

    fixture.cleanup();
}

#[test]
fn update_of_missing_row_reports_not_found() {
    let fixture = Fixture::new("missing-row");
    let crud = fixture.crud();

    let err = crud
        .update(
            &CollectionConfig::new("plans"),
            &json!("nope"),
            &rows(json!([{ "name": "x" }]))[0],
        )
        .expect_err("update should fail");

    assert_eq!(err.code, ROW_NOT_FOUND);
    assert_eq!(fixture.last_toast(), Some(Notification::error(err.message)));

    fixture.cleanup();
}

/// Delegates to SQLite but refuses every update.
struct ReadOnlyBackend {
    inner: Arc<SqliteBackend>,
}

impl CollectionBackend for ReadOnlyBackend {
    fn select(
        &self,
        collection: &str,
        request: &SelectRequest,
    ) -> Result<SelectResponse, BackendError> {
        self.inner.select(collection, request)
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.inner.search(request)
    }

    fn insert(&self, collection: &str, row: &Row) -> Result<Vec<Row>, BackendError> {
        self.inner.insert(collection, row)
    }

    fn update(
        &self,
        _collection: &str,
        _id_column: &str,
        _id: &Value,
        _patch: &Row,
    ) -> Result<Vec<Row>, BackendError> {
        Err(BackendError::new(
            CONSTRAINT_VIOLATION,
            "price must be positive",
        ))
    }

    fn delete(
        &self,
        collection: &str,
        id_column: &str,
        ids: &[Value],
    ) -> Result<Vec<Row>, BackendError> {
        self.inner.delete(collection, id_column, ids)
    }
}

#[test]
fn failed_update_leaves_rows_and_cache_untouched() {
    let fixture = Fixture::new("failed-update");
    fixture.seed("plans", json!([{ "id": "p1", "name": "Basic", "price": 49900 }]));
    let backend: Arc<dyn CollectionBackend> = Arc::new(ReadOnlyBackend {
        inner: fixture.sqlite.clone(),
    });
    let crud = CrudService::new(backend, fixture.notifier(), fixture.cache.clone());
    let config = CollectionConfig::new("plans");
    crud.fetch(&config, &query(1, 10)).expect("page should load");

    let err = crud
        .update(&config, &json!("p1"), &rows(json!([{ "price": -1 }]))[0])
        .expect_err("update should fail");

    assert_eq!(err.code, CONSTRAINT_VIOLATION);
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::error("price must be positive"))
    );
    assert_eq!(fixture.cache.len("plans"), 1, "failed update keeps the cache");
    assert_eq!(fixture.all("plans")[0].get("price"), Some(&json!(49900)));

    fixture.cleanup();
}

#[test]
fn record_service_fetch_one_needs_exactly_one_match() {
    let fixture = Fixture::new("fetch-one");
    fixture.seed(
        "users",
        json!([
            { "user_id": "u1", "email": "one@example.com" },
            { "user_id": "u2", "email": "two@example.com" },
            { "user_id": "u2", "email": "dup@example.com" }
        ]),
    );
    let users = RecordService::new(
        "users",
        fixture.backend(),
        fixture.notifier(),
        fixture.cache.clone(),
    );

    let one = users.fetch_one("user_id", "u1").expect("u1 should resolve");
    assert_eq!(row_str(&one, "email"), Some("one@example.com"));
    assert!(users.fetch_one("user_id", "u2").is_err());
    assert!(users.fetch_one("user_id", "u3").is_err());
    assert_eq!(
        users
            .fetch_all(&[("user_id", json!("u2"))])
            .expect("fetch_all should succeed")
            .len(),
        2
    );

    fixture.cleanup();
}

fn press_fixture(prefix: &str) -> (Fixture, PressReleaseService, PathBuf) {
    let fixture = Fixture::new(prefix);
    fixture.seed(
        "users",
        json!([{ "user_id": "u1", "email": "author@example.com", "first_name": "Asha" }]),
    );
    fixture.seed(
        PRESS_RELEASES,
        json!([{
            "id": "pr1",
            "user_id": "u1",
            "title": "Launch day",
            "admin_status": "pending"
        }]),
    );
    let storage_dir = fixture.temp_dir.join("storage");
    let store = FsObjectStore::new(&storage_dir).expect("store should open");
    let service = PressReleaseService::new(
        fixture.backend(),
        Arc::new(store),
        fixture.notifier(),
        fixture.cache.clone(),
    );
    (fixture, service, storage_dir)
}

#[test]
fn approving_twice_is_refused() {
    let (fixture, service, _) = press_fixture("approve");
    let release = fixture.all(PRESS_RELEASES).remove(0);

    let approved = service.approve(&release).expect("approve should succeed");
    assert_eq!(row_str(&approved, "admin_status"), Some("approved"));

    let err = service.approve(&approved).expect_err("second approve should fail");
    assert_eq!(err.message, "Press release already approved");
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::error("Press release already approved"))
    );

    fixture.cleanup();
}

#[test]
fn rejecting_records_the_reason_and_marks_the_release() {
    let (fixture, service, _) = press_fixture("reject");
    let release = fixture.all(PRESS_RELEASES).remove(0);
    let reason = RejectionReason::parse("  Missing contact details for the press desk  ")
        .expect("reason should be accepted");

    service.reject(&release, &reason).expect("reject should succeed");

    let rejections = fixture.all(REJECTIONS);
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].get("release_id"), Some(&json!("pr1")));
    assert_eq!(
        row_str(&rejections[0], "reason"),
        Some("Missing contact details for the press desk")
    );
    assert_eq!(row_str(&rejections[0], "email"), Some("author@example.com"));
    assert_eq!(
        row_str(&fixture.all(PRESS_RELEASES)[0], "admin_status"),
        Some("rejected")
    );
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::success(
            "Press release has been rejected successfully"
        ))
    );

    fixture.cleanup();
}

#[test]
fn rejecting_without_a_known_author_changes_nothing() {
    let (fixture, service, _) = press_fixture("reject-no-user");
    let mut release = fixture.all(PRESS_RELEASES).remove(0);
    release.insert("user_id".to_string(), json!("ghost"));
    let reason = RejectionReason::parse("Duplicate of an earlier release")
        .expect("reason should be accepted");

    let err = service.reject(&release, &reason).expect_err("reject should fail");

    assert_eq!(err.message, "User email not loaded. Please try again.");
    assert!(fixture.all(REJECTIONS).is_empty());
    assert_eq!(
        row_str(&fixture.all(PRESS_RELEASES)[0], "admin_status"),
        Some("pending")
    );

    fixture.cleanup();
}

fn report_upload(file_name: &str, bytes: &[u8]) -> ReportUpload {
    ReportUpload {
        file_name: file_name.to_string(),
        bytes: bytes.to_vec(),
        release_id: "pr1".to_string(),
        user_id: "u1".to_string(),
        user_email: "author@example.com".to_string(),
    }
}

#[test]
fn uploading_a_report_stores_the_pdf_and_links_it() {
    let (fixture, service, storage_dir) = press_fixture("report");
    let now = Utc
        .with_ymd_and_hms(2026, 5, 4, 10, 30, 0)
        .single()
        .expect("valid timestamp");

    let receipt = service
        .upload_report(&report_upload("report.pdf", b"%PDF-1.7 body"), now)
        .expect("upload should succeed");

    assert_eq!(
        receipt.upload_path,
        format!("u1/pr1/{}-report.pdf", now.timestamp_millis())
    );
    let stored = storage_dir
        .join("press-release-reports")
        .join(&receipt.upload_path);
    assert_eq!(
        fs::read(&stored).expect("stored report should exist"),
        b"%PDF-1.7 body".to_vec()
    );

    let release = fixture.all(PRESS_RELEASES).remove(0);
    assert_eq!(row_str(&release, "pr_pdf_url"), Some(receipt.report_url.as_str()));
    assert!(receipt.report_url.starts_with("file://"));
    assert_eq!(
        row_str(&release, "report_sent_at"),
        Some("2026-05-04T10:30:00.000Z")
    );
    assert_eq!(
        fixture.last_toast(),
        Some(Notification::success("Report uploaded successfully"))
    );

    fixture.cleanup();
}

#[test]
fn uploading_a_non_pdf_is_refused() {
    let (fixture, service, _) = press_fixture("report-not-pdf");

    let err = service
        .upload_report(&report_upload("notes.txt", b"plain text"), Utc::now())
        .expect_err("upload should fail");

    assert_eq!(err.message, "File must be a PDF");
    assert_eq!(fixture.last_toast(), Some(Notification::error("File must be a PDF")));
    assert!(row_str(&fixture.all(PRESS_RELEASES)[0], "pr_pdf_url").is_none());

    fixture.cleanup();
}

#[test]
fn import_csv_appends_typed_rows() {
    let fixture = Fixture::new("import-csv");
    let csv_path = fixture.temp_dir.join("packages.csv");
    fs::write(
        &csv_path,
        "name,price,active,pincode\nBasic,49900,true,00123\nPro,,false,560001\n",
    )
    .expect("should write csv");
    let imports = ImportService::new(fixture.sqlite.db_path().to_path_buf(), fixture.cache.clone());

    let result = imports
        .import_csv(&csv_path, None)
        .expect("import should succeed");

    assert_eq!(result.collection, "packages");
    assert_eq!(result.row_count, 2);
    let imported = fixture.all("packages");
    assert_eq!(imported[0].get("price"), Some(&json!(49900)));
    assert_eq!(imported[0].get("active"), Some(&json!(true)));
    assert_eq!(imported[0].get("pincode"), Some(&json!("00123")));
    assert_eq!(imported[1].get("price"), Some(&Value::Null));
    assert!(imported.iter().all(|row| row.contains_key("id")));

    fixture.cleanup();
}

fn load(controller: &mut TableController, crud: &CrudService) {
    let ticket = controller.begin_fetch();
    let result = crud.fetch(&ticket.collection, &ticket.query);
    assert!(controller.apply_fetch(ticket.generation, result));
}

#[test]
fn table_controller_pages_through_sqlite() {
    let fixture = Fixture::new("controller-paging");
    fixture.seed("users", numbered_users(25));
    let crud = fixture.crud();
    let (mut controller, defaulted) = TableController::from_query_string(
        TableConfig::new(CollectionConfig::new("users")),
        "",
    );
    assert!(defaulted);

    load(&mut controller, &crud);
    assert_eq!(controller.display_range(), "Showing 1 to 10 of 25 entries");
    assert_eq!(controller.total_pages(), 3);
    assert!(controller.columns().iter().any(|column| column.key == "seq"));

    assert!(controller.set_page(3));
    load(&mut controller, &crud);
    assert_eq!(controller.display_range(), "Showing 21 to 25 of 25 entries");
    assert_eq!(controller.rows().len(), 5);

    assert!(!controller.set_page(3), "same page is not a change");

    fixture.cleanup();
}

#[test]
fn stale_fetches_are_dropped() {
    let fixture = Fixture::new("controller-stale");
    fixture.seed("users", numbered_users(3));
    let crud = fixture.crud();
    let mut controller =
        TableController::new(TableConfig::new(CollectionConfig::new("users")), query(1, 10));

    let stale = controller.begin_fetch();
    let fresh = controller.begin_fetch();
    let stale_result = crud.fetch(&stale.collection, &stale.query);

    assert!(!controller.apply_fetch(stale.generation, stale_result));
    assert!(controller.is_loading());

    let fresh_result = crud.fetch(&fresh.collection, &fresh.query);
    assert!(controller.apply_fetch(fresh.generation, fresh_result));
    assert_eq!(controller.rows().len(), 3);

    fixture.cleanup();
}

#[test]
fn bulk_delete_through_the_controller_refetches_fewer_rows() {
    let fixture = Fixture::new("controller-delete");
    fixture.seed("users", numbered_users(4));
    let crud = fixture.crud();
    let config = CollectionConfig::new("users");
    let mut controller = TableController::new(TableConfig::new(config.clone()), query(1, 10));
    load(&mut controller, &crud);

    controller.toggle_all();
    assert_eq!(controller.selected_count(), 4);
    controller.request_bulk_delete();
    let prompt = controller.delete_prompt().expect("delete prompt should open");
    assert_eq!(prompt.title, "Delete 4 Records");

    let ids = controller.confirm_delete().expect("ids should be handed out");
    let refetch = controller.finish_delete(crud.delete(&config, &ids));
    assert!(refetch);
    assert_eq!(controller.selected_count(), 0);

    load(&mut controller, &crud);
    assert!(controller.rows().is_empty());
    assert_eq!(controller.display_range(), "No entries to display");

    fixture.cleanup();
}

#[test]
fn monthly_release_counts_only_the_current_year() {
    let fixture = Fixture::new("stats-monthly");
    fixture.seed(
        PRESS_RELEASES,
        json!([
            { "id": "a", "release_date": "2026-03-05" },
            { "id": "b", "release_date": "2026-03-28" },
            { "id": "c", "release_date": "2026-11-01" },
            { "id": "d", "release_date": "2025-03-01" },
            { "id": "e", "release_date": null }
        ]),
    );
    let stats = StatsService::new(fixture.backend(), CurrencyFormat::new("INR", "en-IN"));
    let now = Utc
        .with_ymd_and_hms(2026, 6, 1, 0, 0, 0)
        .single()
        .expect("valid timestamp");

    let monthly = stats
        .monthly_press_releases(now)
        .expect("monthly stats should load");

    assert_eq!(monthly.year, 2026);
    assert_eq!(monthly.monthly_press_releases.len(), 12);
    assert_eq!(monthly.monthly_press_releases[2].count, 2);
    assert_eq!(monthly.monthly_press_releases[10].count, 1);
    assert_eq!(
        monthly
            .monthly_press_releases
            .iter()
            .map(|month| month.count)
            .sum::<u32>(),
        3
    );

    fixture.cleanup();
}

#[test]
fn dashboard_stats_tolerate_empty_collections() {
    let fixture = Fixture::new("stats-empty");
    let stats = StatsService::new(fixture.backend(), CurrencyFormat::new("INR", "en-IN"));
    let now = Utc::now();

    let activities = stats.activities(now).expect("activities should load");
    assert!(activities.activities.is_empty());
    assert!(stats.business_metrics(now).is_ok());

    fixture.cleanup();
}

#[test]
fn custom_id_column_drives_updates_and_deletes() {
    let fixture = Fixture::new("custom-id");
    fixture.seed(
        "user_business_info",
        json!([
            { "user_id": "u1", "company_name": "Acme" },
            { "user_id": "u2", "company_name": "Globex" }
        ]),
    );
    let crud = fixture.crud();
    let config = CollectionConfig::new("user_business_info").with_id_column("user_id");

    let patch = rows(json!([{ "user_id": "ignored", "company_name": "Initech" }]));
    let updated = crud
        .update(&config, &json!("u2"), &patch[0])
        .expect("update should succeed");
    assert_eq!(row_str(&updated, "user_id"), Some("u2"), "id column is never patched");
    assert_eq!(row_str(&updated, "company_name"), Some("Initech"));

    crud.delete(&config, &[json!("u1")]).expect("delete should succeed");
    let remaining = fixture.all("user_business_info");
    assert_eq!(remaining.len(), 1);
    assert_eq!(row_str(&remaining[0], "user_id"), Some("u2"));

    fixture.cleanup();
}
