//! One-shot asynchronous result of a dispatched call.
//!
//! A `Pending` is created when a call is issued and resolves exactly once:
//! immediately for calls that failed before reaching the transport, or when
//! the transport answers through its `Completion`. Continuations added with
//! `and_then` run at that point, on whichever thread polls the future.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{ApiError, CompletionDropped};
use crate::http::TransportReply;
use crate::transport::Completion;

type Finish<T> = Box<dyn FnOnce(TransportReply) -> Result<T, ApiError> + Send>;

enum State<T> {
    Settled(Result<T, ApiError>),
    Waiting {
        rx: oneshot::Receiver<TransportReply>,
        finish: Finish<T>,
    },
    Done,
}

/// Future resolving to the result of one call.
#[must_use = "a Pending does nothing useful unless awaited or waited on"]
pub struct Pending<T> {
    state: State<T>,
}

// `T` is only ever moved out, never pinned in place.
impl<T> Unpin for Pending<T> {}

impl<T: Send + 'static> Pending<T> {
    pub fn settled(result: Result<T, ApiError>) -> Self {
        Pending {
            state: State::Settled(result),
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self::settled(Err(error))
    }

    /// A completion for the transport plus the future it settles. `finish`
    /// turns the raw reply into the call's result.
    pub(crate) fn channel<F>(finish: F) -> (Completion, Self)
    where
        F: FnOnce(TransportReply) -> Result<T, ApiError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let pending = Pending {
            state: State::Waiting {
                rx,
                finish: Box::new(finish),
            },
        };
        (Completion::new(tx), pending)
    }

    /// Chain a fallible step onto a successful result. Errors pass through
    /// unchanged and `f` is not called.
    pub fn and_then<U, F>(self, f: F) -> Pending<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, ApiError> + Send + 'static,
    {
        let state = match self.state {
            State::Settled(result) => State::Settled(result.and_then(f)),
            State::Waiting { rx, finish } => State::Waiting {
                rx,
                finish: Box::new(move |reply| finish(reply).and_then(f)),
            },
            State::Done => State::Done,
        };
        Pending { state }
    }

    /// Block the current thread until the call settles.
    ///
    /// # Panics
    /// When called from inside an async runtime; `.await` the future there.
    pub fn wait(self) -> Result<T, ApiError> {
        match self.state {
            State::Settled(result) => result,
            State::Waiting { rx, finish } => match rx.blocking_recv() {
                Ok(reply) => finish(reply),
                Err(_) => Err(dropped()),
            },
            State::Done => panic!("`Pending` waited on after completion"),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, State::Settled(_))
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let received = match &mut this.state {
            State::Waiting { rx, .. } => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(received) => Some(received),
            },
            _ => None,
        };

        match (std::mem::replace(&mut this.state, State::Done), received) {
            (State::Settled(result), _) => Poll::Ready(result),
            (State::Waiting { finish, .. }, Some(Ok(reply))) => Poll::Ready(finish(reply)),
            (State::Waiting { .. }, _) => Poll::Ready(Err(dropped())),
            (State::Done, _) => panic!("`Pending` polled after completion"),
        }
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Settled(Ok(_)) => "settled",
            State::Settled(Err(_)) => "failed",
            State::Waiting { .. } => "waiting",
            State::Done => "done",
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}

fn dropped() -> ApiError {
    ApiError::TransportError(Box::new(CompletionDropped))
}
