use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use dioxus::prelude::{use_signal, Signal};

use crate::config::AppConfig;
use crate::infra::sqlite::repo::SqliteBackend;
use crate::infra::storage::fs_store::FsObjectStore;
use crate::usecase::ports::backend::CollectionBackend;
use crate::usecase::ports::notifier::{Notification, Notifier, ToastQueue};
use crate::usecase::services::crud_service::{CrudService, QueryCache};
use crate::usecase::services::form_schema::ActingUser;
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::pages::PageId;
use crate::usecase::services::press_release_service::PressReleaseService;
use crate::usecase::services::record_service::RecordService;
use crate::usecase::services::render::{share_renderer, CurrencyFormat, RendererRegistry};
use crate::usecase::services::stats_service::StatsService;

/// Everything the views call into, shared through the Dioxus context.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn CollectionBackend>,
    pub cache: Arc<QueryCache>,
    pub toasts: Arc<ToastQueue>,
    pub crud: Arc<CrudService>,
    pub press_releases: Arc<PressReleaseService>,
    pub stats: Arc<StatsService>,
    pub imports: Arc<ImportService>,
    pub renderers: Arc<RendererRegistry>,
}

impl Services {
    pub fn build(config: AppConfig) -> Result<Self> {
        let sqlite = SqliteBackend::open(&config.db_path)?;
        let store = FsObjectStore::new(&config.storage_dir)?;
        let backend: Arc<dyn CollectionBackend> = Arc::new(sqlite);
        let cache = Arc::new(QueryCache::new());
        let toasts = Arc::new(ToastQueue::new());
        let notifier: Arc<dyn Notifier> = toasts.clone();
        let currency = CurrencyFormat::new(config.currency.clone(), config.locale.clone());

        Ok(Self {
            crud: Arc::new(CrudService::new(
                backend.clone(),
                notifier.clone(),
                cache.clone(),
            )),
            press_releases: Arc::new(PressReleaseService::new(
                backend.clone(),
                Arc::new(store),
                notifier,
                cache.clone(),
            )),
            stats: Arc::new(StatsService::new(backend.clone(), currency.clone())),
            imports: Arc::new(ImportService::new(config.db_path.clone(), cache.clone())),
            renderers: Arc::new(
                RendererRegistry::new(currency)
                    .with("share", share_renderer(&config.newsroom_base_url)),
            ),
            config: Arc::new(config),
            backend,
            cache,
            toasts,
        })
    }

    pub fn records(&self, collection: &str) -> RecordService {
        RecordService::new(
            collection,
            self.backend.clone(),
            self.toasts.clone(),
            self.cache.clone(),
        )
    }

    pub fn acting_user(&self) -> Option<ActingUser> {
        self.config
            .acting_user_id
            .as_ref()
            .map(|id| ActingUser::new("user_id", id.clone()))
    }
}

/// Query string of every table, keyed by `<route>-<index>`, so a table
/// reopens where it was left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableLocations(HashMap<String, String>);

impl TableLocations {
    pub fn key(page: PageId, index: usize) -> String {
        format!("{}-{index}", page.route())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns false when the table was already at `query_string`.
    pub fn remember(&mut self, key: &str, query_string: String) -> bool {
        if self.get(key) == Some(query_string.as_str()) {
            return false;
        }
        self.0.insert(key.to_string(), query_string);
        true
    }
}

pub struct AppState {
    /// `None` shows the dashboard.
    pub current_page: Signal<Option<PageId>>,
    pub toasts: Signal<Vec<Notification>>,
    pub status: Signal<String>,
    pub busy: Signal<bool>,
    pub table_locations: Signal<TableLocations>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            current_page: use_signal(|| None::<PageId>),
            toasts: use_signal(Vec::<Notification>::new),
            status: use_signal(|| "Ready".to_string()),
            busy: use_signal(|| false),
            table_locations: use_signal(TableLocations::default),
        }
    }
}
