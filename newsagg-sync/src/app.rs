//! Application wiring and command execution.

use std::sync::Arc;

use newsagg_client::{
    ApiClient, ClientConfig, FileSessionStorage, HttpTransport, InMemoryNavigator, Navigator,
    SessionStore, Transport,
};
use newsagg_core::LoginRequest;
use newsagg_query::{QueryCache, QueryConfig};
use serde_json::{json, Value};
use tracing::info;

use crate::buckets::{evict_target, EvictTarget};
use crate::command::Command;
use crate::error::{AppError, AppResult};
use crate::mutation::MutationCoordinator;
use crate::queries::{settle, Queries};
use crate::ui::UiState;

/// Articles per feed page.
pub const FEED_PAGE_SIZE: u32 = 12;

/// Every layer, wired over one transport and one session.
pub struct App {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    client: ApiClient,
    queries: Queries,
    mutations: MutationCoordinator,
    ui: UiState,
}

impl App {
    /// Wire the HTTP stack from `config`, restoring the persisted session.
    pub fn from_config(config: &ClientConfig) -> AppResult<Self> {
        let storage = FileSessionStorage::new(config.session_dir.clone());
        let session = SessionStore::new(Arc::new(storage));
        let navigator: Arc<dyn Navigator> = Arc::new(InMemoryNavigator::default());
        let transport = HttpTransport::new(config, session.clone(), navigator.clone())?;
        Ok(Self::with_transport(
            Arc::new(transport),
            session,
            navigator,
            QueryConfig::default(),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        query_config: QueryConfig,
    ) -> Self {
        let client = ApiClient::new(transport);
        let cache = QueryCache::new(query_config);
        Self {
            queries: Queries::new(cache.clone(), client.clone(), session.clone()),
            mutations: MutationCoordinator::new(client.clone(), cache, session.clone()),
            session,
            navigator,
            client,
            ui: UiState::new(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    /// Execute `command` and return what it produced as JSON.
    pub async fn run(&mut self, command: Command) -> AppResult<Value> {
        if command.requires_session() && !self.session.is_authenticated() {
            return Err(AppError::usage("Login required: run `newsagg login <email> <password>`"));
        }

        let output = match command {
            Command::Feed { page, category } => {
                self.ui.select_category(category);
                let query = self.ui.article_query(page, FEED_PAGE_SIZE);
                let mut subscription = self.queries.articles(query);
                serde_json::to_value(&*settle(&mut subscription).await?)?
            }
            Command::Article { id } => {
                let mut subscription = self.queries.article(id);
                serde_json::to_value(&*settle(&mut subscription).await?)?
            }
            Command::Login { email, password } => {
                let request = LoginRequest { email, password };
                let auth = self.mutations.login(&request).await?;
                info!(user_id = auth.data.user_id, "logged in");
                json!({ "user": self.session.principal() })
            }
            Command::Logout => {
                self.mutations.logout();
                json!({ "loggedOut": true })
            }
            Command::WhoAmI => json!({
                "authenticated": self.session.is_authenticated(),
                "user": self.session.principal(),
            }),
            Command::Bookmarks => {
                let mut subscription = self.queries.bookmarks();
                serde_json::to_value(&*settle(&mut subscription).await?)?
            }
            Command::Bookmark { article_id } => {
                let response = self.mutations.add_bookmark(article_id).await?;
                json!({ "message": response.message })
            }
            Command::Unbookmark { article_id } => {
                let response = self.mutations.remove_bookmark(article_id).await?;
                json!({ "message": response.message })
            }
            Command::Sources => {
                let mut subscription = self.queries.sources();
                serde_json::to_value(&*settle(&mut subscription).await?)?
            }
            Command::Crawl { source_id: Some(id) } => {
                serde_json::to_value(self.mutations.crawl_one(id).await?.into_data())?
            }
            Command::Crawl { source_id: None } => {
                json!({ "message": self.mutations.crawl_all().await?.into_data() })
            }
            Command::Stats => {
                let mut crawler = self.queries.crawler_stats();
                let mut cache = self.queries.cache_stats();
                let mut digest = self.queries.digest_stats();
                let crawler = settle(&mut crawler).await?;
                let cache = settle(&mut cache).await?;
                let digest = settle(&mut digest).await?;
                json!({
                    "crawler": &*crawler,
                    "cache": &*cache,
                    "digest": &*digest,
                })
            }
            Command::Evict { bucket } => {
                let target = evict_target(&bucket);
                let response = match target {
                    EvictTarget::Articles => self.mutations.evict_article_cache().await?,
                    EvictTarget::Sources => self.mutations.evict_source_cache().await?,
                    EvictTarget::All => self.mutations.evict_all_cache().await?,
                };
                json!({ "bucket": bucket, "evicted": target.to_string(), "message": response.message })
            }
            Command::Digest { user_id: Some(id) } => {
                json!({ "message": self.mutations.trigger_digest_one(id).await?.into_data() })
            }
            Command::Digest { user_id: None } => {
                json!({ "message": self.mutations.trigger_digest_all().await?.into_data() })
            }
        };
        Ok(output)
    }
}
