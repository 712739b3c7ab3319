//! Test fixtures for driving coroutines.

use std::collections::VecDeque;

use crate::driver::{Coroutine, CoroutineResult};

/// A coroutine that follows a fixed script.
///
/// Yields each scripted value in order, then completes with the scripted
/// result. Every resumption input is recorded for later inspection; an
/// injected error is recorded and then propagated unhandled, at whichever
/// suspension point received it.
#[derive(Debug)]
pub struct ScriptedCoroutine<I, Y, R, E> {
    yields: VecDeque<Y>,
    result: Option<R>,
    received: Vec<Result<I, E>>,
}

impl<I, Y, R, E> ScriptedCoroutine<I, Y, R, E> {
    /// Creates a coroutine that yields `yields` in order and then completes
    /// with `result`.
    #[must_use]
    pub fn new(yields: Vec<Y>, result: R) -> Self {
        Self {
            yields: yields.into(),
            result: Some(result),
            received: Vec::new(),
        }
    }

    /// Returns every input delivered so far, in resumption order.
    #[must_use]
    pub fn received(&self) -> &[Result<I, E>] {
        &self.received
    }
}

impl<I, Y, R, E: Clone> Coroutine for ScriptedCoroutine<I, Y, R, E> {
    type Input = I;
    type Yield = Y;
    type Return = R;
    type Error = E;

    fn resume(
        &mut self,
        input: Result<Self::Input, Self::Error>,
    ) -> Result<CoroutineResult<Self::Yield, Self::Return>, Self::Error> {
        match input {
            Ok(value) => {
                self.received.push(Ok(value));
                match self.yields.pop_front() {
                    Some(yielded) => Ok(CoroutineResult::Yielded(yielded)),
                    None => match self.result.take() {
                        Some(result) => Ok(CoroutineResult::Complete(result)),
                        None => panic!("scripted coroutine resumed after completion"),
                    },
                }
            }
            Err(error) => {
                self.received.push(Err(error.clone()));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_coroutine_plays_script() {
        let mut coro = ScriptedCoroutine::<i32, i32, &str, String>::new(vec![1, 2], "end");

        assert_eq!(coro.resume(Ok(0)), Ok(CoroutineResult::Yielded(1)));
        assert_eq!(coro.resume(Ok(1)), Ok(CoroutineResult::Yielded(2)));
        assert_eq!(coro.resume(Ok(2)), Ok(CoroutineResult::Complete("end")));
        assert_eq!(coro.received(), &[Ok(0), Ok(1), Ok(2)]);
    }

    #[test]
    fn test_scripted_coroutine_propagates_injected_error() {
        let mut coro = ScriptedCoroutine::<i32, i32, &str, String>::new(vec![1], "end");

        assert_eq!(coro.resume(Ok(0)), Ok(CoroutineResult::Yielded(1)));
        assert_eq!(coro.resume(Err("boom".to_string())), Err("boom".to_string()));
        assert_eq!(coro.received(), &[Ok(0), Err("boom".to_string())]);
    }
}
