//! Async integration for context-preserving coroutines.
//!
//! The drive loop here interprets each yielded value as "suspend until this
//! asynchronous operation completes, then resume with its result". It is a
//! strict pass-through adapter: the driver's context bookkeeping is
//! invisible to it, and it runs on any future-resolving scheduler.

use std::future::Future;

use super::{wrap, Coroutine, CoroutineResult};

/// Drives a coroutine to completion, resolving each yielded future.
///
/// Every yielded value is awaited; its `Ok` output becomes the next
/// resumption value, and its `Err` output is delivered back into the
/// coroutine on the error channel at the same suspension point. An error
/// the coroutine raises (or leaves unhandled) propagates to the caller
/// unmodified.
pub async fn drive_to_completion<C>(mut coroutine: C, first: C::Input) -> Result<C::Return, C::Error>
where
    C: Coroutine,
    C::Yield: Future<Output = Result<C::Input, C::Error>>,
{
    let mut input = Ok(first);
    loop {
        match coroutine.resume(input)? {
            CoroutineResult::Complete(value) => return Ok(value),
            CoroutineResult::Yielded(pending) => input = pending.await,
        }
    }
}

/// Wraps a coroutine for context preservation and drives it to completion.
///
/// The context stack is captured when `combine` is called, before the
/// returned future is first polled. Code in the coroutine observes the
/// stack from this call site regardless of what is ambient at poll time.
pub fn combine<C>(
    coroutine: C,
    first: C::Input,
) -> impl Future<Output = Result<C::Return, C::Error>>
where
    C: Coroutine,
    C::Yield: Future<Output = Result<C::Input, C::Error>>,
{
    drive_to_completion(wrap(coroutine), first)
}
