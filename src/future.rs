use crate::error::RunError;
use crate::types::TokenVec;
use crossbeam_channel::{Receiver, TryRecvError};

/// Pending result of one graph run.
///
/// One-shot, single producer, single consumer: the worker that fires the
/// run's terminal node publishes its output vector here. Dropping the
/// future without consuming it is allowed; the output is released with it.
#[must_use]
#[derive(Debug)]
pub struct RunFuture {
    rx: Receiver<TokenVec>,
    value: Option<Result<TokenVec, RunError>>,
}

impl RunFuture {
    pub(crate) fn new(rx: Receiver<TokenVec>) -> Self {
        Self { rx, value: None }
    }

    /// Block until the run has finished, successfully or not.
    pub fn wait(&mut self) {
        if self.value.is_none() {
            self.value = Some(self.rx.recv().map_err(|_| RunError::Aborted));
        }
    }

    /// Poll without blocking; true when [`get`](RunFuture::get) will return
    /// immediately.
    pub fn try_wait(&mut self) -> bool {
        if self.value.is_none() {
            match self.rx.try_recv() {
                Ok(outputs) => self.value = Some(Ok(outputs)),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => self.value = Some(Err(RunError::Aborted)),
            }
        }
        true
    }

    /// Block until the run has finished and take ownership of the terminal
    /// node's output vector.
    ///
    /// # Errors
    /// [`RunError::Aborted`] when the run can no longer produce a result:
    /// a node callable panicked, or the executor shut down before the
    /// terminal node fired.
    pub fn get(mut self) -> Result<TokenVec, RunError> {
        self.wait();
        self.value.expect("RunFuture::get: wait fulfils the value")
    }
}
