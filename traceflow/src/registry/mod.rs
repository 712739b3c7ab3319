//! Per-coroutine context snapshots and the active slot.
//!
//! The registry owns, per wrapped coroutine, one immutable snapshot of a
//! context stack, captured when the coroutine is wrapped and never mutated
//! afterwards. A thread-local *active slot* names the coroutine whose
//! snapshot should answer context queries right now; the slot supports
//! nested LIFO save/restore so that a driver driving another driver composes
//! like a call stack.
//!
//! The snapshot map is process-global and mutex-protected, so a coroutine
//! may be registered on one thread and reclaimed on another. The active slot
//! is deliberately thread-local: two threads each driving their own
//! coroutines can never observe each other's snapshot.

use std::cell::Cell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::warn;

use crate::trace::{self, ContextStack};

#[cfg(test)]
mod registry_tests;

/// Identifies one wrapped coroutine instance.
///
/// Handles are plain non-owning tokens: holding one keeps nothing alive, and
/// dropping the [`RegistryEntry`] that minted it reclaims the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoroutineId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn snapshots() -> &'static Mutex<HashMap<CoroutineId, ContextStack>> {
    static SNAPSHOTS: OnceLock<Mutex<HashMap<CoroutineId, ContextStack>>> = OnceLock::new();
    SNAPSHOTS.get_or_init(|| Mutex::new(HashMap::new()))
}

thread_local! {
    static ACTIVE: Cell<Option<CoroutineId>> = const { Cell::new(None) };
}

static PROVIDER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the registry as the process-wide stack provider.
///
/// Idempotent; called automatically the first time a coroutine is wrapped.
/// While a coroutine is active on the current thread, context queries answer
/// with its registered snapshot instead of the ambient stack.
///
/// The provider slot is process-wide and set once. If the host application
/// installed its own provider first, the registry cannot pre-empt it: every
/// snapshot is then captured from whatever stack that provider (or the
/// ambient fallback) reports, and a warning is logged.
pub fn use_coroutine_context() {
    if trace::install_stack_provider(active_stack) {
        PROVIDER_INSTALLED.store(true, Ordering::Relaxed);
    } else if !PROVIDER_INSTALLED.load(Ordering::Relaxed) {
        warn!(
            "stack provider slot is held by another provider; \
             coroutine snapshots will not pre-empt it"
        );
    }
}

/// Registers a new coroutine and captures the current context stack for it.
///
/// The snapshot is captured exactly once, here. Because every entry mints a
/// fresh handle, registering the same coroutine twice is unrepresentable.
/// The capture goes through [`trace::current_stack`], so a coroutine wrapped
/// during another wrapped coroutine's step snapshots that coroutine's stack.
#[must_use]
pub fn register() -> RegistryEntry {
    use_coroutine_context();
    let id = CoroutineId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let snapshot = trace::current_stack();
    snapshots().lock().insert(id, snapshot);
    RegistryEntry { id }
}

/// Returns the snapshot for the coroutine named by this thread's active
/// slot, or `None` when no coroutine is active.
///
/// # Panics
///
/// Panics if the active handle has no registered snapshot. That can only
/// happen when a caller bypasses [`wrap`](crate::driver::wrap) and
/// [`combine`](crate::driver::combine); it is a programming error, not a
/// recoverable condition.
#[must_use]
pub fn active_stack() -> Option<ContextStack> {
    let id = ACTIVE.with(Cell::get)?;
    match snapshots().lock().get(&id) {
        Some(snapshot) => Some(snapshot.clone()),
        None => panic!(
            "coroutine {id:?} is active but has no registered context snapshot; \
             resume coroutines only through wrap() or combine()"
        ),
    }
}

#[cfg(test)]
pub(crate) fn is_registered(id: CoroutineId) -> bool {
    snapshots().lock().contains_key(&id)
}

/// Owns one coroutine's registry entry.
///
/// Dropping the entry reclaims the snapshot, so a coroutine abandoned by its
/// scheduler leaks nothing and needs no teardown protocol.
#[derive(Debug)]
pub struct RegistryEntry {
    id: CoroutineId,
}

impl RegistryEntry {
    /// Returns the handle this entry owns.
    #[must_use]
    pub fn id(&self) -> CoroutineId {
        self.id
    }

    /// Returns the registered snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ContextStack {
        snapshots().lock().get(&self.id).cloned().unwrap_or_default()
    }

    /// Makes this coroutine the active one for the current thread.
    ///
    /// The previous value of the active slot is restored when the guard
    /// drops, on every exit path including unwinding, so activation windows
    /// nest strictly LIFO and never straddle a suspension.
    #[must_use]
    pub fn activate(&self) -> ActivationGuard {
        let previous = ACTIVE.with(|slot| slot.replace(Some(self.id)));
        ActivationGuard {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for RegistryEntry {
    fn drop(&mut self) {
        snapshots().lock().remove(&self.id);
    }
}

/// Restores the previous active-slot value on drop.
///
/// The guard is not `Send`: it must restore the slot of the thread that
/// created it.
#[derive(Debug)]
pub struct ActivationGuard {
    previous: Option<CoroutineId>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        ACTIVE.with(|slot| slot.set(self.previous));
    }
}
