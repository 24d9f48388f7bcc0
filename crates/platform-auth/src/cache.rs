//! TTL cache of per-token permissions (C3, spec.md §4.3).
//!
//! Lookups never hold the lock across network I/O: a miss releases the lock,
//! fetches from the auth source, then re-acquires the lock to install the
//! result — unless a concurrent fetch already installed a fresher entry.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::AuthError;

/// The permission tuple resolved for one token (spec.md §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub r#override: bool,
    pub username: String,
}

#[derive(Debug, Clone)]
struct Entry {
    permissions: Permissions,
    expires_at: DateTime<Utc>,
}

/// An upstream source the cache fetches permissions from on a miss.
///
/// Implemented by `platform-server` against its own auth endpoint; kept as
/// a trait here so the cache itself stays decoupled from any particular
/// transport, matching `SPEC_FULL.md`'s "inject into handlers" guidance.
#[async_trait::async_trait]
pub trait AuthSource: Send + Sync {
    async fn fetch(&self, token: &str) -> Result<Permissions, AuthError>;
}

struct Inner {
    entries: HashMap<String, Entry>,
    by_expiry: BTreeSet<(DateTime<Utc>, String)>,
}

/// TTL cache mapping `token -> Permissions`, shared across the control
/// plane's request handlers behind an `Arc`.
pub struct PermissionCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    source: Arc<dyn AuthSource>,
}

impl PermissionCache {
    /// Default TTL per spec.md §4.3 — 5 minutes.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    #[must_use]
    pub fn new(source: Arc<dyn AuthSource>, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                by_expiry: BTreeSet::new(),
            }),
            ttl,
            source,
        }
    }

    /// Resolve `token`'s permissions, fetching from [`AuthSource`] on a
    /// miss or expiry.
    ///
    /// # Errors
    ///
    /// Returns whatever [`AuthSource::fetch`] returns on a cache miss.
    pub async fn get_permissions(&self, token: &str) -> Result<Permissions, AuthError> {
        let now = Utc::now();

        if let Some(permissions) = self.lookup_fresh(token, now) {
            return Ok(permissions);
        }

        let permissions = self.source.fetch(token).await?;
        let expires_at = now + self.ttl;
        self.install(token, permissions.clone(), expires_at);
        Ok(permissions)
    }

    fn lookup_fresh(&self, token: &str, now: DateTime<Utc>) -> Option<Permissions> {
        let inner = self.inner.lock();
        let entry = inner.entries.get(token)?;
        (entry.expires_at > now).then(|| entry.permissions.clone())
    }

    /// Install a freshly fetched entry, unless a concurrent fetch already
    /// installed one that expires no earlier than this one.
    fn install(&self, token: &str, permissions: Permissions, expires_at: DateTime<Utc>) {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.get(token)
            && existing.expires_at >= expires_at
        {
            return;
        }

        if let Some(existing) = inner.entries.remove(token) {
            inner.by_expiry.remove(&(existing.expires_at, token.to_owned()));
        }

        inner.by_expiry.insert((expires_at, token.to_owned()));
        inner.entries.insert(
            token.to_owned(),
            Entry {
                permissions,
                expires_at,
            },
        );
    }

    /// Evict every entry whose TTL has lapsed as of `now`. O(k) in the
    /// number of expired entries thanks to the `by_expiry` ordering.
    pub fn sweep_expired(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        loop {
            let Some((expires_at, token)) = inner.by_expiry.iter().next().cloned() else {
                break;
            };
            if expires_at > now {
                break;
            }
            inner.by_expiry.remove(&(expires_at, token.clone()));
            inner.entries.remove(&token);
        }
    }

    /// Remove every cached entry for `token` immediately — used when a
    /// user is deleted so stale permissions are not served until the next
    /// TTL-bounded refetch would have caught it anyway (Testable Property
    /// §8: "deleting the user invalidates all tokens on next refresh").
    pub fn invalidate(&self, token: &str) {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.entries.remove(token) {
            inner.by_expiry.remove(&(existing.expires_at, token.to_owned()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AuthSource for CountingSource {
        async fn fetch(&self, token: &str) -> Result<Permissions, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Permissions {
                read: true,
                write: token == "writer",
                r#override: false,
                username: token.to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn second_lookup_within_ttl_does_not_refetch() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cache = PermissionCache::new(source.clone(), Duration::from_secs(60));

        cache.get_permissions("writer").await.unwrap();
        cache.get_permissions("writer").await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_refetch() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cache = PermissionCache::new(source.clone(), Duration::from_millis(0));

        cache.get_permissions("writer").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get_permissions("writer").await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sweep_expired_removes_only_lapsed_entries() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cache = PermissionCache::new(source, Duration::from_secs(60));
        let now = Utc::now();
        cache.install(
            "stale",
            Permissions {
                read: true,
                write: false,
                r#override: false,
                username: "stale".to_owned(),
            },
            now - chrono::Duration::seconds(1),
        );
        cache.install(
            "fresh",
            Permissions {
                read: true,
                write: false,
                r#override: false,
                username: "fresh".to_owned(),
            },
            now + chrono::Duration::seconds(60),
        );

        cache.sweep_expired(now);

        let inner = cache.inner.lock();
        assert!(!inner.entries.contains_key("stale"));
        assert!(inner.entries.contains_key("fresh"));
    }
}
