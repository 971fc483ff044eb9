//! Session store: the single owner of the authentication state.
//!
//! Readers get snapshots; the only writers are [`SessionStore::set`] and
//! [`SessionStore::clear`], and every write is persisted before the lock is
//! released so memory and storage never disagree about ordering.

use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

use newsagg_core::{AuthResponse, Role, UserProfile};
use tracing::{debug, info, warn};

use crate::persistence::{
    MemorySessionStorage, PersistedSession, SessionStorage, SESSION_STORAGE_KEY,
};

/// Opaque bearer token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Profile of the authenticated user.
pub type Principal = UserProfile;

#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub credential: Credential,
    pub principal: Principal,
}

/// Snapshot of the authentication state.
///
/// A principal exists exactly when a credential does.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    auth: Option<Authenticated>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(credential: Credential, principal: Principal) -> Self {
        Self {
            auth: Some(Authenticated {
                credential,
                principal,
            }),
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.auth.as_ref().map(|auth| &auth.credential)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.auth.as_ref().map(|auth| &auth.principal)
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.principal()
            .map_or(false, |principal| principal.role == Role::Admin)
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            token: self.credential().map(|c| c.expose().to_string()),
            user: self.principal().cloned(),
        }
    }

    fn from_persisted(persisted: PersistedSession) -> Self {
        match (persisted.token, persisted.user) {
            (Some(token), Some(user)) if !token.is_empty() => {
                Self::authenticated(Credential::new(token), user)
            }
            _ => Self::anonymous(),
        }
    }
}

struct StoreInner {
    session: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
}

/// Process-wide session owner. Cloning shares the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Build a store, restoring whatever session `storage` holds.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let session = restore(storage.as_ref());
        if let Some(principal) = session.principal() {
            info!(user_id = principal.id, role = %principal.role, "restored persisted session");
        }
        Self {
            inner: Arc::new(StoreInner {
                session: RwLock::new(session),
                storage,
            }),
        }
    }

    /// Store backed by a fresh in-memory map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::new()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Session {
        self.read().clone()
    }

    pub fn credential(&self) -> Option<Credential> {
        self.read().credential().cloned()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.read().principal().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.read().is_admin()
    }

    /// Replace the session and persist it.
    pub fn set(&self, credential: impl Into<Credential>, principal: Principal) {
        let next = Session::authenticated(credential.into(), principal);
        let mut guard = self.write();
        self.persist(&next);
        if let Some(principal) = next.principal() {
            info!(user_id = principal.id, role = %principal.role, "session established");
        }
        *guard = next;
    }

    /// Establish the session from a login or registration response.
    pub fn set_from_auth(&self, auth: &AuthResponse) {
        self.set(auth.token.as_str(), UserProfile::from(auth));
    }

    /// Reset to anonymous. Idempotent.
    pub fn clear(&self) {
        let mut guard = self.write();
        if let Err(err) = self.inner.storage.remove(SESSION_STORAGE_KEY) {
            warn!(error = %err, "failed to remove persisted session");
        }
        if guard.is_authenticated() {
            info!("session cleared");
        }
        *guard = Session::anonymous();
    }

    fn persist(&self, session: &Session) {
        let result = session
            .to_persisted()
            .encode()
            .and_then(|raw| self.inner.storage.save(SESSION_STORAGE_KEY, &raw));
        if let Err(err) = result {
            warn!(error = %err, "failed to persist session");
        }
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.read())
            .finish()
    }
}

fn restore(storage: &dyn SessionStorage) -> Session {
    let raw = match storage.load(SESSION_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Session::anonymous(),
        Err(err) => {
            warn!(error = %err, "failed to read persisted session");
            return Session::anonymous();
        }
    };
    match PersistedSession::decode(&raw) {
        Ok(persisted) => Session::from_persisted(persisted),
        Err(err) => {
            debug!(error = %err, "ignoring undecodable persisted session");
            Session::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FileSessionStorage;
    use newsagg_core::DigestFrequency;

    fn principal(id: i64, role: Role) -> Principal {
        UserProfile {
            id,
            email: format!("user{}@example.com", id),
            full_name: "Budi Santoso".to_string(),
            digest_enabled: true,
            digest_frequency: DigestFrequency::Daily,
            categories: vec!["teknologi".to_string()],
            role,
        }
    }

    #[test]
    fn test_starts_anonymous() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert!(store.get().principal().is_none());
        assert!(store.credential().is_none());
    }

    #[test]
    fn test_set_and_clear() {
        let store = SessionStore::in_memory();
        store.set("t1", principal(7, Role::Admin));
        assert!(store.is_authenticated());
        assert!(store.is_admin());
        assert_eq!(store.credential().unwrap().expose(), "t1");

        store.clear();
        assert_eq!(store.get(), Session::anonymous());
        store.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_reload_restores_identical_session() {
        let storage = MemorySessionStorage::new();
        let store = SessionStore::new(Arc::new(storage.clone()));
        store.set("t1", principal(7, Role::User));

        let reloaded = SessionStore::new(Arc::new(storage.clone()));
        assert_eq!(reloaded.get(), store.get());

        store.clear();
        assert_eq!(storage.raw(SESSION_STORAGE_KEY), None);
        let reloaded = SessionStore::new(Arc::new(storage));
        assert!(!reloaded.is_authenticated());
    }

    #[test]
    fn test_reload_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(Arc::new(FileSessionStorage::new(dir.path())));
        store.set("file-token", principal(3, Role::Admin));

        let reloaded = SessionStore::new(Arc::new(FileSessionStorage::new(dir.path())));
        assert_eq!(reloaded.get(), store.get());
    }

    #[test]
    fn test_half_present_value_is_logged_out() {
        let storage = MemorySessionStorage::new();
        storage
            .save(SESSION_STORAGE_KEY, "{\"token\":\"t1\",\"user\":null}")
            .unwrap();
        let store = SessionStore::new(Arc::new(storage.clone()));
        assert!(!store.is_authenticated());

        storage.save(SESSION_STORAGE_KEY, "not json").unwrap();
        let store = SessionStore::new(Arc::new(storage));
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_set_from_auth_maps_unknown_role_to_user() {
        let store = SessionStore::in_memory();
        let auth = AuthResponse {
            token: "t9".to_string(),
            user_id: 9,
            email: "x@example.com".to_string(),
            full_name: "X".to_string(),
            digest_enabled: false,
            digest_frequency: DigestFrequency::Weekly,
            categories: vec![],
            role: "EDITOR".to_string(),
        };
        store.set_from_auth(&auth);
        let principal = store.principal().unwrap();
        assert_eq!(principal.id, 9);
        assert_eq!(principal.role, Role::User);
        assert!(!store.is_admin());
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let rendered = format!("{:?}", Credential::new("secret-token"));
        assert!(!rendered.contains("secret-token"));
    }

    mod reload {
        use super::*;
        use proptest::prelude::*;

        fn arb_principal() -> impl Strategy<Value = Principal> {
            (
                any::<i64>(),
                "[a-z0-9.]{1,12}@[a-z]{1,8}\\.id",
                "\\PC{0,24}",
                any::<bool>(),
                prop_oneof![Just(DigestFrequency::Daily), Just(DigestFrequency::Weekly)],
                prop::collection::vec("[a-z]{1,10}", 0..4),
                prop_oneof![Just(Role::Admin), Just(Role::User)],
            )
                .prop_map(
                    |(id, email, full_name, digest_enabled, digest_frequency, categories, role)| {
                        UserProfile {
                            id,
                            email,
                            full_name,
                            digest_enabled,
                            digest_frequency,
                            categories,
                            role,
                        }
                    },
                )
        }

        proptest! {
            #[test]
            fn prop_persisted_session_reloads_identically(
                token in "[A-Za-z0-9._-]{1,64}",
                principal in arb_principal(),
            ) {
                let storage = MemorySessionStorage::new();
                let store = SessionStore::new(Arc::new(storage.clone()));
                store.set(token.as_str(), principal);

                let reloaded = SessionStore::new(Arc::new(storage));
                prop_assert_eq!(reloaded.get(), store.get());
                prop_assert_eq!(reloaded.is_admin(), store.is_admin());
            }
        }
    }
}
