//! Store lock acquisition.
//!
//! A panic while holding a store lock poisons it. Cached payloads are
//! disposable, so the guard is taken anyway and the incident logged instead
//! of propagating the panic to every later caller.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn read_or_recover<'a, T>(
    lock: &'a RwLock<T>,
    what: &'static str,
) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(lock = what, mode = "read", "cache lock poisoned, recovering");
        poisoned.into_inner()
    })
}

pub(crate) fn write_or_recover<'a, T>(
    lock: &'a RwLock<T>,
    what: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(lock = what, mode = "write", "cache lock poisoned, recovering");
        poisoned.into_inner()
    })
}
