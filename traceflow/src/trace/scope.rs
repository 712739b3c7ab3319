//! Action scopes, context stacks, and the stack provider hook.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// An opaque marker identifying one active action scope.
///
/// Markers carry a human-readable label and a task UUID. Their contents are
/// otherwise opaque to this crate: ordering and identity are what matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeMarker {
    task_uuid: Uuid,
    label: String,
}

impl ScopeMarker {
    /// Creates a new marker with a fresh task UUID.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            task_uuid: Uuid::new_v4(),
            label: label.into(),
        }
    }

    /// Returns the marker's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the marker's task UUID.
    #[must_use]
    pub fn task_uuid(&self) -> Uuid {
        self.task_uuid
    }
}

impl fmt::Display for ScopeMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// An immutable ordered sequence of scope markers.
///
/// Stacks are cheap to clone (`Arc`-backed) and are never mutated after
/// capture; pushing a scope produces a new ambient state, not a new stack
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextStack {
    markers: Arc<[ScopeMarker]>,
}

impl ContextStack {
    /// Creates a stack by copying the given markers.
    #[must_use]
    pub fn from_markers(markers: &[ScopeMarker]) -> Self {
        Self {
            markers: markers.into(),
        }
    }

    /// Returns the number of markers in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if no scope is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Returns the markers, outermost first.
    #[must_use]
    pub fn markers(&self) -> &[ScopeMarker] {
        &self.markers
    }

    /// Returns the outermost marker, if any.
    #[must_use]
    pub fn root(&self) -> Option<&ScopeMarker> {
        self.markers.first()
    }

    /// Returns the marker labels, outermost first.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.markers.iter().map(ScopeMarker::label).collect()
    }
}

thread_local! {
    static AMBIENT: RefCell<Vec<ScopeMarker>> = const { RefCell::new(Vec::new()) };
}

/// A process-wide hook that can pre-empt the ambient stack.
///
/// A `Some` return is used as the current stack; `None` defers to the
/// ambient thread-local default.
pub type StackProvider = fn() -> Option<ContextStack>;

static PROVIDER: OnceLock<StackProvider> = OnceLock::new();

/// Installs the process-wide stack provider.
///
/// The provider can be set exactly once. Returns `false` if a provider was
/// already installed, in which case the existing provider stays in effect.
pub fn install_stack_provider(provider: StackProvider) -> bool {
    PROVIDER.set(provider).is_ok()
}

/// Returns the current context stack.
///
/// Consults the installed stack provider first; when the provider is absent
/// or returns `None`, falls back to this thread's ambient scope stack.
#[must_use]
pub fn current_stack() -> ContextStack {
    if let Some(provider) = PROVIDER.get() {
        if let Some(stack) = provider() {
            return stack;
        }
    }
    ambient_stack()
}

/// Returns this thread's ambient scope stack, ignoring any provider.
#[must_use]
pub fn ambient_stack() -> ContextStack {
    AMBIENT.with(|stack| ContextStack::from_markers(&stack.borrow()))
}

/// Enters a new action scope on this thread's ambient stack.
///
/// The scope stays active until the returned guard is dropped.
#[must_use]
pub fn enter_scope(label: impl Into<String>) -> ScopeGuard {
    let marker = ScopeMarker::new(label);
    AMBIENT.with(|stack| stack.borrow_mut().push(marker.clone()));
    ScopeGuard { marker }
}

/// RAII guard for an entered action scope.
///
/// Dropping the guard removes the scope from the ambient stack. Guards are
/// expected to be dropped in LIFO order; an out-of-order drop is logged and
/// the matching marker is removed wherever it sits.
#[derive(Debug)]
pub struct ScopeGuard {
    marker: ScopeMarker,
}

impl ScopeGuard {
    /// Returns the marker this guard owns.
    #[must_use]
    pub fn marker(&self) -> &ScopeMarker {
        &self.marker
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        AMBIENT.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.last() == Some(&self.marker) {
                stack.pop();
            } else if let Some(position) = stack.iter().rposition(|m| m == &self.marker) {
                warn!(label = %self.marker.label(), "scope guard dropped out of order");
                stack.remove(position);
            }
        });
    }
}
