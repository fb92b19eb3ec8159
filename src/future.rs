use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::Result;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::util::lock_unpoisoned;

/// Runs submitted units of work. The runner alone decides where and when a
/// task executes — inline, on a worker, or deferred until manually
/// triggered.
pub trait TaskRunner {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs every submitted task on its own thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadTaskRunner;

impl TaskRunner for ThreadTaskRunner {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        std::thread::spawn(task);
    }
}

enum FutureState {
    Pending,
    Running,
    Canceled,
    Done(Result<Response>),
    Consumed,
}

struct FutureShared {
    state: Mutex<FutureState>,
    condvar: Condvar,
}

/// Handle on an asynchronously executing request.
///
/// Supports completion polling, cancellation of work that has not started,
/// and blocking retrieval with or without a bound. The outcome can be
/// retrieved exactly once.
pub struct ResponseFuture {
    shared: Arc<FutureShared>,
}

impl ResponseFuture {
    /// Whether the underlying task has finished (or was canceled).
    pub fn is_done(&self) -> bool {
        let state = lock_unpoisoned(&self.shared.state);
        matches!(
            *state,
            FutureState::Canceled | FutureState::Done(_) | FutureState::Consumed
        )
    }

    /// Request cancellation. Returns true only when the task had not started
    /// yet; once the request is running it is left to finish, and its
    /// outcome is discarded.
    pub fn cancel(&self) -> bool {
        let mut state = lock_unpoisoned(&self.shared.state);
        match *state {
            FutureState::Pending => {
                *state = FutureState::Canceled;
                self.shared.condvar.notify_all();
                true
            }
            FutureState::Running => {
                *state = FutureState::Canceled;
                self.shared.condvar.notify_all();
                false
            }
            _ => false,
        }
    }

    /// Block until the outcome is available and take it.
    pub fn get(&self) -> Result<Response> {
        self.wait(None)
    }

    /// Block up to `timeout` for the outcome. On timeout the task keeps
    /// running and a later retrieval can still succeed.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Response> {
        self.wait(Some(timeout))
    }

    fn wait(&self, timeout: Option<Duration>) -> Result<Response> {
        let deadline = timeout.map(|bound| Instant::now() + bound);
        let mut state = lock_unpoisoned(&self.shared.state);
        loop {
            match *state {
                FutureState::Canceled => return Err(Error::FutureCanceled),
                FutureState::Consumed => return Err(Error::FutureConsumed),
                FutureState::Done(_) => {
                    let done = std::mem::replace(&mut *state, FutureState::Consumed);
                    match done {
                        FutureState::Done(result) => return result,
                        _ => unreachable!("state was matched as done"),
                    }
                }
                FutureState::Pending | FutureState::Running => match deadline {
                    None => {
                        state = match self.shared.condvar.wait(state) {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                    }
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            return Err(Error::FutureTimeout {
                                timeout_ms: timeout.unwrap_or_default().as_millis(),
                            });
                        }
                        state = match self.shared.condvar.wait_timeout(state, deadline - now) {
                            Ok((guard, _)) => guard,
                            Err(poisoned) => poisoned.into_inner().0,
                        };
                    }
                },
            }
        }
    }
}

impl Request {
    /// Submit this request to `runner` and return a handle immediately.
    ///
    /// The submitted unit of work is equivalent to [`Request::execute`]; the
    /// wrapper performs no scheduling beyond the single submission.
    pub fn execute_async(mut self, runner: &dyn TaskRunner) -> ResponseFuture {
        let shared = Arc::new(FutureShared {
            state: Mutex::new(FutureState::Pending),
            condvar: Condvar::new(),
        });
        let task_shared = Arc::clone(&shared);

        runner.execute(Box::new(move || {
            {
                let mut state = lock_unpoisoned(&task_shared.state);
                if matches!(*state, FutureState::Canceled) {
                    return;
                }
                *state = FutureState::Running;
            }

            let result = self.execute();

            let mut state = lock_unpoisoned(&task_shared.state);
            if !matches!(*state, FutureState::Canceled) {
                *state = FutureState::Done(result);
            }
            task_shared.condvar.notify_all();
        }));

        ResponseFuture { shared }
    }
}
