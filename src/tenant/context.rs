//! Request-scoped tenant slot.
//!
//! Each inbound request runs inside [`TenantSlot::scope`], which installs a
//! fresh task-local cell for the lifetime of that request's future. Values
//! written by one request are invisible to every other task, including tasks
//! interleaved on the same worker thread, and the cell is dropped together
//! with the future when the request finishes or is cancelled.

use std::cell::Cell;
use std::future::Future;

use super::TenantId;

tokio::task_local! {
    static CURRENT_TENANT: Cell<Option<TenantId>>;
}

/// Accessor for the current task's tenant slot
pub struct TenantSlot;

impl TenantSlot {
    /// Run `fut` with an empty slot of its own
    pub async fn scope<F: Future>(fut: F) -> F::Output {
        CURRENT_TENANT.scope(Cell::new(None), fut).await
    }

    /// Synchronous variant of [`TenantSlot::scope`]
    pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
        CURRENT_TENANT.sync_scope(Cell::new(None), f)
    }

    /// Carry the current tenant into a future that will run on another task.
    ///
    /// `tokio::spawn` does not inherit task-locals, so background work started
    /// from a request must be wrapped explicitly.
    pub fn propagate<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        CURRENT_TENANT.scope(Cell::new(Self::current()), fut)
    }

    /// Overwrite the slot for the current task.
    ///
    /// Outside a scope there is no slot to write; the call is ignored.
    pub fn set(tenant: Option<TenantId>) {
        if CURRENT_TENANT.try_with(|slot| slot.set(tenant)).is_err() {
            tracing::warn!("tenant slot written outside a request scope; ignoring");
        }
    }

    /// Current value, or `default` when unset or outside a scope
    pub fn get(default: Option<TenantId>) -> Option<TenantId> {
        CURRENT_TENANT
            .try_with(Cell::get)
            .ok()
            .flatten()
            .or(default)
    }

    pub fn current() -> Option<TenantId> {
        Self::get(None)
    }

    pub fn clear() {
        // A missing scope already reads as empty
        let _ = CURRENT_TENANT.try_with(|slot| slot.set(None));
    }

    /// Set the slot and return a guard that clears it when dropped
    pub fn enter(tenant: Option<TenantId>) -> SlotGuard {
        Self::set(tenant);
        SlotGuard { _private: () }
    }
}

/// Clears the tenant slot on drop, covering early returns, panics and
/// cancellation of the owning future.
#[must_use = "the slot is cleared as soon as the guard is dropped"]
pub struct SlotGuard {
    _private: (),
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        TenantSlot::clear();
    }
}
