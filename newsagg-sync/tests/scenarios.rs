//! End-to-end flows over a scripted transport: reads through the query
//! facade, writes through the coordinator, and the session reacting to both.

use std::sync::Arc;
use std::time::Duration;

use newsagg_client::{
    ArticleQuery, ClientConfig, HttpMethod, InMemoryNavigator, MemorySessionStorage, Navigator,
    SessionStore, UnauthorizedHook,
};
use newsagg_core::{DigestFrequency, LoginRequest, PreferenceRequest, SourceRequest};
use newsagg_query::{QueryCache, QueryConfig, QueryKey};
use newsagg_sync::{keys, settle, App, AppError, Command, MutationCoordinator, MutationKind, Queries};
use newsagg_test_utils::assertions::{assert_displayable, assert_unauthorized};
use newsagg_test_utils::{fixtures, Reply, Role, ScriptedTransport, TransportError};
use proptest::prelude::*;
use serde_json::json;

struct Harness {
    transport: Arc<ScriptedTransport>,
    session: SessionStore,
    navigator: Arc<InMemoryNavigator>,
    cache: QueryCache,
    queries: Queries,
    mutations: MutationCoordinator,
}

fn harness_at(route: &str, session: SessionStore) -> Harness {
    let navigator = Arc::new(InMemoryNavigator::new(route));
    let hook = UnauthorizedHook::new(
        session.clone(),
        navigator.clone() as Arc<dyn Navigator>,
        &ClientConfig::default(),
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_latency(Duration::from_millis(10))
            .with_unauthorized_hook(hook),
    );
    let client = newsagg_client::ApiClient::new(transport.clone());
    let cache = QueryCache::new(QueryConfig::new().with_retry_delay(Duration::from_millis(5)));
    Harness {
        queries: Queries::new(cache.clone(), client.clone(), session.clone()),
        mutations: MutationCoordinator::new(client, cache.clone(), session.clone()),
        transport,
        session,
        navigator,
        cache,
    }
}

fn harness() -> Harness {
    harness_at("/", SessionStore::in_memory())
}

fn logged_in(route: &str) -> Harness {
    let session = SessionStore::in_memory();
    session.set("t1", fixtures::user_profile(7, Role::Admin));
    harness_at(route, session)
}

fn source_request() -> SourceRequest {
    SourceRequest {
        name: "Tempo".to_string(),
        url: "https://rss.tempo.co/nasional".to_string(),
        website_url: None,
        category: "nasional".to_string(),
        is_active: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_crawl_one_refreshes_dependents_once() {
    let h = harness();
    h.transport
        .reply(HttpMethod::Get, "/sources", Reply::json(&vec![fixtures::source(3, true)]))
        .reply(HttpMethod::Get, "/crawler/stats", Reply::json(&fixtures::crawl_stats(1)))
        .reply(HttpMethod::Get, "/crawler/stats", Reply::json(&fixtures::crawl_stats(3)))
        .reply(HttpMethod::Get, "/articles", Reply::json(&fixtures::article_page(&[1], 0, true)))
        .reply(
            HttpMethod::Post,
            "/crawler/crawl/3",
            Reply::json(&fixtures::crawl_result("Sumber 3")),
        );

    let mut sources = h.queries.sources();
    let mut stats = h.queries.crawler_stats();
    let mut articles = h.queries.articles(ArticleQuery::new().page(0));
    settle(&mut sources).await.unwrap();
    assert_eq!(settle(&mut stats).await.unwrap().articles_saved_today, 1);
    settle(&mut articles).await.unwrap();

    let result = h.mutations.crawl_one(3).await.unwrap().into_data();
    assert_eq!(result.articles_saved, 2);

    // Old values stay visible while the refetch runs.
    assert!(sources.state().is_revalidating());
    assert!(stats.state().is_revalidating());
    assert!(articles.state().is_revalidating());

    // A second view mounting now joins the refetch in flight.
    let mut late = h.queries.sources();
    settle(&mut late).await.unwrap();
    settle(&mut sources).await.unwrap();
    assert_eq!(settle(&mut stats).await.unwrap().articles_saved_today, 3);
    settle(&mut articles).await.unwrap();

    assert_eq!(h.transport.count(HttpMethod::Get, "/sources"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/crawler/stats"), 2);
    assert_eq!(h.transport.count(HttpMethod::Get, "/articles"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_bookmark_leaves_cache_untouched() {
    let h = logged_in("/");
    h.transport
        .reply(
            HttpMethod::Get,
            "/bookmarks",
            Reply::json(&vec![fixtures::article_summary(1)]),
        )
        .reply(
            HttpMethod::Post,
            "/bookmarks/42",
            Reply::error(TransportError::Network("connection reset".to_string())),
        );

    let mut bookmarks = h.queries.bookmarks();
    settle(&mut bookmarks).await.unwrap();

    let result = h.mutations.add_bookmark(42).await;
    assert_displayable(&result);
    assert_eq!(result.unwrap_err().message(), "connection reset");

    let state = bookmarks.state();
    assert!(!state.is_fetching);
    assert!(!state.is_invalidated);
    assert_eq!(state.data().map(|list| list.len()), Some(1));
    // Writes are not retried.
    assert_eq!(h.transport.count(HttpMethod::Post, "/bookmarks/42"), 1);
    assert_eq!(h.transport.count(HttpMethod::Get, "/bookmarks"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bookmark_refreshes_list() {
    let h = logged_in("/");
    h.transport
        .reply(HttpMethod::Get, "/bookmarks", Reply::json(&Vec::<u8>::new()))
        .reply(
            HttpMethod::Get,
            "/bookmarks",
            Reply::json(&vec![fixtures::article_summary(42)]),
        )
        .reply(HttpMethod::Post, "/bookmarks/42", Reply::data(serde_json::Value::Null));

    assert!(h.queries.bookmark_ids().await.unwrap().is_empty());
    h.mutations.add_bookmark(42).await.unwrap();
    // The list has no subscribers, so it was dropped and reloads on demand.
    assert!(!h.cache.contains(&keys::bookmarks()));
    assert!(h.queries.bookmark_ids().await.unwrap().contains(&42));
}

#[tokio::test(start_paused = true)]
async fn test_login_establishes_session() {
    let h = harness_at("/login", SessionStore::in_memory());
    h.transport.reply(
        HttpMethod::Post,
        "/auth/login",
        Reply::json(&fixtures::auth_response("t1", 7, "ADMIN")),
    );

    let request = LoginRequest {
        email: "user7@example.com".to_string(),
        password: "rahasia".to_string(),
    };
    h.mutations.login(&request).await.unwrap();

    let session = h.session.get();
    assert_eq!(session.credential().map(|c| c.expose()), Some("t1"));
    let principal = session.principal().unwrap();
    assert_eq!(principal.id, 7);
    assert_eq!(principal.role, Role::Admin);
    assert!(h.session.is_admin());
}

#[tokio::test(start_paused = true)]
async fn test_failed_login_keeps_anonymous_session() {
    let h = harness_at("/login", SessionStore::in_memory());
    h.transport.reply(
        HttpMethod::Post,
        "/auth/login",
        Reply::error(TransportError::api("Email atau password salah", 400)),
    );

    let request = LoginRequest {
        email: "user7@example.com".to_string(),
        password: "keliru".to_string(),
    };
    let err = h.mutations.login(&request).await.unwrap_err();
    assert_eq!(err.message(), "Email atau password salah");
    assert!(!h.session.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_read_clears_session_and_redirects() {
    let h = logged_in("/bookmarks");
    h.transport.reply(
        HttpMethod::Get,
        "/bookmarks",
        Reply::error(TransportError::unauthorized("Token expired")),
    );

    let mut bookmarks = h.queries.bookmarks();
    let result = settle(&mut bookmarks).await;
    assert_unauthorized(&result);

    assert!(!h.session.is_authenticated());
    assert_eq!(h.navigator.current_route(), "/login");
    // No retry once the session is gone.
    assert_eq!(h.transport.count(HttpMethod::Get, "/bookmarks"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_on_register_page_stays_put() {
    let h = logged_in("/daftar");
    h.transport.reply(
        HttpMethod::Get,
        "/users/me",
        Reply::error(TransportError::unauthorized("Token expired")),
    );

    let mut profile = h.queries.profile();
    assert_unauthorized(&settle(&mut profile).await);

    assert!(!h.session.is_authenticated());
    assert_eq!(h.navigator.history(), vec!["/daftar".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_beats_stale_time() {
    let h = harness();
    h.transport
        .reply(HttpMethod::Get, "/sources", Reply::json(&vec![fixtures::source(1, true)]))
        .reply(HttpMethod::Get, "/sources/categories", Reply::json(&vec!["nasional"]))
        .reply(HttpMethod::Post, "/sources", Reply::json(&fixtures::source(2, true)));

    let mut sources = h.queries.sources();
    settle(&mut sources).await.unwrap();
    sources.unsubscribe();

    // Well inside the five-minute window the cached list is served.
    tokio::time::advance(Duration::from_secs(60)).await;
    let mut again = h.queries.sources();
    settle(&mut again).await.unwrap();
    assert_eq!(h.transport.count(HttpMethod::Get, "/sources"), 1);
    again.unsubscribe();

    h.mutations.create_source(&source_request()).await.unwrap();

    let mut after = h.queries.sources();
    settle(&mut after).await.unwrap();
    assert_eq!(h.transport.count(HttpMethod::Get, "/sources"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_logout_purges_user_scoped_entries() {
    let h = logged_in("/");
    h.transport
        .reply(
            HttpMethod::Get,
            "/bookmarks",
            Reply::json(&vec![fixtures::article_summary(1)]),
        )
        .reply(
            HttpMethod::Get,
            "/users/me",
            Reply::json(&fixtures::user_profile(7, Role::Admin)),
        );

    let mut bookmarks = h.queries.bookmarks();
    let mut profile = h.queries.profile();
    settle(&mut bookmarks).await.unwrap();
    settle(&mut profile).await.unwrap();
    let before = h.transport.total();

    assert_eq!(h.mutations.logout(), 2);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!h.session.is_authenticated());
    assert!(!h.cache.contains(&keys::bookmarks()));
    assert!(!h.cache.contains(&keys::profile()));
    assert!(!bookmarks.state().has_value());
    assert_eq!(h.transport.total(), before);
}

#[tokio::test(start_paused = true)]
async fn test_preferences_update_principal() {
    let h = logged_in("/");
    let mut updated = fixtures::user_profile(7, Role::Admin);
    updated.digest_enabled = true;
    updated.digest_frequency = DigestFrequency::Weekly;
    updated.categories = vec!["teknologi".to_string()];
    h.transport
        .reply(HttpMethod::Get, "/users/me", Reply::json(&fixtures::user_profile(7, Role::Admin)))
        .reply(HttpMethod::Get, "/users/me", Reply::json(&updated))
        .reply(HttpMethod::Put, "/users/me/preferences", Reply::json(&updated));

    let mut profile = h.queries.profile();
    assert!(!settle(&mut profile).await.unwrap().digest_enabled);

    h.mutations
        .update_preferences(&PreferenceRequest {
            categories: vec!["teknologi".to_string()],
            digest_enabled: true,
            digest_frequency: DigestFrequency::Weekly,
        })
        .await
        .unwrap();

    assert!(settle(&mut profile).await.unwrap().digest_enabled);
    let principal = h.session.principal().unwrap();
    assert_eq!(principal.digest_frequency, DigestFrequency::Weekly);
    assert_eq!(h.session.credential().unwrap().expose(), "t1");
}

#[tokio::test]
async fn test_session_survives_reload() {
    let storage = MemorySessionStorage::new();
    let session = SessionStore::new(Arc::new(storage.clone()));
    let h = harness_at("/login", session);
    h.transport.reply(
        HttpMethod::Post,
        "/auth/login",
        Reply::json(&fixtures::auth_response("t1", 7, "ADMIN")),
    );
    h.mutations
        .login(&LoginRequest {
            email: "user7@example.com".to_string(),
            password: "rahasia".to_string(),
        })
        .await
        .unwrap();

    let reloaded = SessionStore::new(Arc::new(storage.clone()));
    assert_eq!(reloaded.get(), h.session.get());

    h.mutations.logout();
    let reloaded = SessionStore::new(Arc::new(storage));
    assert!(!reloaded.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_app_evict_uses_bucket_table() {
    let transport = Arc::new(ScriptedTransport::new());
    transport
        .reply(HttpMethod::Delete, "/cache/articles", Reply::data(serde_json::Value::Null))
        .reply(HttpMethod::Delete, "/cache", Reply::data(serde_json::Value::Null));
    let mut app = App::with_transport(
        transport.clone(),
        SessionStore::in_memory(),
        Arc::new(InMemoryNavigator::default()),
        QueryConfig::default(),
    );

    let output = app
        .run(Command::Evict {
            bucket: "article_detail".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(output["evicted"], "articles");

    app.run(Command::Evict {
        bucket: "digest".to_string(),
    })
    .await
    .unwrap();
    assert_eq!(transport.count(HttpMethod::Delete, "/cache/articles"), 1);
    assert_eq!(transport.count(HttpMethod::Delete, "/cache"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_app_feed_and_session_gate() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply(
        HttpMethod::Get,
        "/articles",
        Reply::json(&fixtures::article_page(&[5, 6], 1, true)),
    );
    let mut app = App::with_transport(
        transport.clone(),
        SessionStore::in_memory(),
        Arc::new(InMemoryNavigator::default()),
        QueryConfig::default(),
    );

    let output = app
        .run(Command::Feed {
            page: 1,
            category: Some("olahraga".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(output["content"][0]["id"], json!(5));
    assert_eq!(app.ui().selected_category.as_deref(), Some("olahraga"));
    let sent = &transport.requests()[0].request;
    assert!(sent
        .query
        .contains(&("category".to_string(), "olahraga".to_string())));

    let err = app.run(Command::Bookmarks).await.unwrap_err();
    assert!(matches!(err, AppError::Usage(_)));
}

fn every_key() -> Vec<QueryKey> {
    vec![
        keys::article_list(&ArticleQuery::new()),
        keys::article_detail(1),
        keys::sources(),
        keys::source_detail(1),
        keys::categories(),
        keys::bookmarks(),
        keys::crawler_stats(),
        keys::crawl_logs(1),
        keys::cache_stats(),
        keys::digest_stats(),
        keys::profile(),
    ]
}

fn run_mutation(kind: MutationKind, succeed: bool) -> Vec<(QueryKey, bool)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async move {
        let h = harness();
        for key in every_key() {
            h.cache
                .query(key, Default::default(), || async { Ok::<u32, TransportError>(1) })
                .await
                .unwrap();
        }
        let outcome = if succeed {
            Ok(())
        } else {
            Err(TransportError::api("Gagal", 500))
        };
        let _ = h.mutations.mutate(kind, async move { outcome }).await;
        every_key()
            .into_iter()
            .map(|key| {
                let kept = h.cache.contains(&key);
                (key, kept)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_failed_mutation_touches_nothing(
        kind in prop::sample::select(MutationKind::all().to_vec()),
    ) {
        for (key, kept) in run_mutation(kind, false) {
            prop_assert!(kept, "{} lost {}", kind, key);
        }
    }

    #[test]
    fn prop_successful_mutation_drops_exactly_its_dependents(
        kind in prop::sample::select(MutationKind::all().to_vec()),
    ) {
        for (key, kept) in run_mutation(kind, true) {
            let dependent = kind.invalidates().iter().any(|p| p.matches(&key));
            prop_assert_eq!(kept, !dependent, "{} on {}", kind, key);
        }
    }
}
