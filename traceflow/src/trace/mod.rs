//! The ambient structured tracing facility.
//!
//! This module provides:
//! - Opaque action-scope markers and the immutable stacks built from them
//! - The thread-local ambient scope stack with RAII entry guards
//! - The process-wide stack provider hook consulted by [`current_stack`]
//! - Structured trace messages attributed to the current stack

mod message;
mod scope;
#[cfg(test)]
mod trace_tests;

pub use message::{iso_timestamp, TraceMessage};
pub use scope::{
    ambient_stack, current_stack, enter_scope, install_stack_provider, ContextStack, ScopeGuard,
    ScopeMarker, StackProvider,
};
