//! The context-preserving suspension trampoline.
//!
//! [`wrap`] turns any [`Coroutine`] into an equivalent coroutine whose every
//! resumption runs under the context stack captured at wrap time. The
//! sequencing is strict: activate, step, mark the suspension, deactivate,
//! and only then hand the yielded value back to whatever is driving. As a
//! result activation windows never straddle a suspension, and two coroutines
//! interleaved on one thread can never observe each other's snapshot.

mod async_bridge;

pub use async_bridge::{combine, drive_to_completion};

use std::marker::PhantomData;

use crate::registry::{self, CoroutineId, RegistryEntry};
use crate::trace::TraceMessage;

/// The outcome of one coroutine step: a yielded value or completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoroutineResult<Y, R> {
    /// The coroutine suspended, producing a value.
    Yielded(Y),
    /// The coroutine finished with a return payload.
    Complete(R),
}

impl<Y, R> CoroutineResult<Y, R> {
    /// Returns the yielded value, if this is a suspension.
    pub fn into_yielded(self) -> Option<Y> {
        match self {
            Self::Yielded(value) => Some(value),
            Self::Complete(_) => None,
        }
    }

    /// Returns the completion payload, if the coroutine finished.
    pub fn into_complete(self) -> Option<R> {
        match self {
            Self::Yielded(_) => None,
            Self::Complete(value) => Some(value),
        }
    }
}

/// A suspendable computation with a two-channel resumption protocol.
///
/// Each resumption delivers either a value (`Ok`) or an injected error
/// (`Err`) into the coroutine at its current suspension point, and yields
/// either a produced value or a completion payload. An error the coroutine
/// does not handle propagates out of `resume` as `Err`; after that the
/// coroutine must not be resumed again.
///
/// This is the externally defined protocol the driver adapts; traceflow
/// does not schedule coroutines itself.
pub trait Coroutine {
    /// The value delivered into the coroutine on resumption.
    type Input;
    /// The value produced at each suspension.
    type Yield;
    /// The completion payload.
    type Return;
    /// The error type flowing on the failure channel.
    type Error;

    /// Steps the coroutine with a pending value or injected error.
    fn resume(
        &mut self,
        input: Result<Self::Input, Self::Error>,
    ) -> Result<CoroutineResult<Self::Yield, Self::Return>, Self::Error>;
}

/// A coroutine backed by a closure.
///
/// Built with [`from_fn`]; handy for step machines that keep their state in
/// captured variables.
pub struct FnCoroutine<F, I, Y, R, E> {
    step: F,
    _marker: PhantomData<fn(Result<I, E>) -> Result<CoroutineResult<Y, R>, E>>,
}

/// Creates a coroutine from a step closure.
///
/// # Examples
///
/// ```rust
/// use traceflow::driver::{from_fn, Coroutine, CoroutineResult};
///
/// let mut step = 0;
/// let mut doubler = from_fn(move |input: Result<i32, String>| {
///     step += 1;
///     let value = input?;
///     if step > 3 {
///         Ok(CoroutineResult::Complete(value))
///     } else {
///         Ok(CoroutineResult::Yielded(value * 2))
///     }
/// });
///
/// assert_eq!(doubler.resume(Ok(1)), Ok(CoroutineResult::Yielded(2)));
/// ```
pub fn from_fn<F, I, Y, R, E>(step: F) -> FnCoroutine<F, I, Y, R, E>
where
    F: FnMut(Result<I, E>) -> Result<CoroutineResult<Y, R>, E>,
{
    FnCoroutine {
        step,
        _marker: PhantomData,
    }
}

impl<F, I, Y, R, E> Coroutine for FnCoroutine<F, I, Y, R, E>
where
    F: FnMut(Result<I, E>) -> Result<CoroutineResult<Y, R>, E>,
{
    type Input = I;
    type Yield = Y;
    type Return = R;
    type Error = E;

    fn resume(
        &mut self,
        input: Result<Self::Input, Self::Error>,
    ) -> Result<CoroutineResult<Self::Yield, Self::Return>, Self::Error> {
        (self.step)(input)
    }
}

/// Wraps a coroutine so that every resumption runs under the context stack
/// that was current when `wrap` was called.
///
/// Wrapping is observationally transparent: values, completion, and errors
/// flow through unchanged. The only additions are corrected context
/// attribution and one optional diagnostic marker per suspension.
#[must_use]
pub fn wrap<C: Coroutine>(inner: C) -> ContextPreserving<C> {
    ContextPreserving::new(inner)
}

/// A coroutine whose resumptions are scoped to a captured context stack.
///
/// See [`wrap`].
#[derive(Debug)]
pub struct ContextPreserving<C> {
    inner: C,
    entry: RegistryEntry,
    suspend_markers: bool,
}

impl<C: Coroutine> ContextPreserving<C> {
    /// Wraps `inner`, capturing the current context stack for it.
    ///
    /// The capture is provider-aware: wrapping a coroutine during another
    /// wrapped coroutine's step snapshots that coroutine's stack.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            entry: registry::register(),
            suspend_markers: true,
        }
    }

    /// Enables or disables the per-suspension "suspended" diagnostic marker.
    ///
    /// On by default. The marker is emitted inside the activation window, so
    /// it is attributed to the wrapped coroutine's own stack and records
    /// where the yield occurred.
    #[must_use]
    pub fn with_suspend_markers(mut self, enabled: bool) -> Self {
        self.suspend_markers = enabled;
        self
    }

    /// Returns the handle under which this coroutine is registered.
    #[must_use]
    pub fn coroutine_id(&self) -> CoroutineId {
        self.entry.id()
    }

    /// Returns a reference to the wrapped coroutine.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the coroutine, reclaiming its registry entry.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: Coroutine> Coroutine for ContextPreserving<C> {
    type Input = C::Input;
    type Yield = C::Yield;
    type Return = C::Return;
    type Error = C::Error;

    fn resume(
        &mut self,
        input: Result<Self::Input, Self::Error>,
    ) -> Result<CoroutineResult<Self::Yield, Self::Return>, Self::Error> {
        let _active = self.entry.activate();
        let step = self.inner.resume(input);
        if self.suspend_markers {
            if let Ok(CoroutineResult::Yielded(_)) = &step {
                // Still inside the activation window: the marker is
                // attributed to this coroutine's stack, not whatever is
                // ambient when the outer driver gets rescheduled.
                TraceMessage::new("suspended").emit();
            }
        }
        // `_active` drops here, restoring the previous slot value before
        // control leaves the driver, on the error path too.
        step
    }
}
