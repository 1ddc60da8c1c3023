//! Per-request key/value scope shared between a policy's hooks and the handler.
//!
//! The scope is the side-channel a `before` hook uses to hand resources to the
//! handler (and to its own `after` hook): a db session, a cache client, an
//! authenticated user name. It lives in the request extensions, and the
//! wrapper keeps a clone so `after` can still reach it once the handler has
//! consumed the request.
//!
//! Key usage is cooperative: policies attached to the same handler must pick
//! non-colliding keys unless they mean to share (the bundled policies prefix
//! their keys, e.g. `db_session.<name>`).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::Request;

type Entries = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Cloneable handle to the per-request store. Clones share the same entries.
#[derive(Clone, Default)]
pub struct Scope {
    entries: Arc<Mutex<Entries>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scope already attached to `req`, creating and inserting a
    /// fresh one otherwise. Nested attachments therefore share one scope.
    pub fn attach_to(req: &mut Request) -> Scope {
        if let Some(existing) = req.extensions().get::<Scope>() {
            return existing.clone();
        }
        let scope = Scope::new();
        req.extensions_mut().insert(scope.clone());
        scope
    }

    /// Read-only lookup of the scope on a request, if any wrapper put one there.
    pub fn of(req: &Request) -> Option<Scope> {
        req.extensions().get::<Scope>().cloned()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.lock().insert(key.into(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.lock()
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Removes the entry; returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries are plain data; a panic while holding the guard does not
        // leave them in a state worth failing the whole request over.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        f.debug_set().entries(entries.keys()).finish()
    }
}
