//! News aggregator client - session, transport and resource clients
//!
//! Everything that talks to the API server lives here: the session store
//! and its persistence, the HTTP transport with its 401 handling, and one
//! typed client per resource family.

pub mod config;
pub mod error;
pub mod navigation;
pub mod persistence;
pub mod resources;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use navigation::{is_public_route, InMemoryNavigator, Navigator};
pub use persistence::{
    FileSessionStorage, MemorySessionStorage, PersistedSession, PersistenceError, SessionStorage,
    SESSION_STORAGE_KEY,
};
pub use resources::{
    decode_envelope, ApiClient, ArticleQuery, ArticlesApi, AuthApi, BookmarksApi, CacheApi,
    CrawlerApi, DigestApi, SourcesApi, UsersApi,
};
pub use session::{Authenticated, Credential, Principal, Session, SessionStore};
pub use transport::{ApiRequest, HttpMethod, HttpTransport, Transport, UnauthorizedHook};
