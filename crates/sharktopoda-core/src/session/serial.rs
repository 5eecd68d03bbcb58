use crate::{CoreResult, ProtocolError};

use std::panic::Location;

use error_location::ErrorLocation;
use tokio::sync::mpsc;

/// A unit of work to run on the session's serialized context.
pub type Job = Box<dyn FnOnce() + Send>;

/// Posts jobs onto the session task.
///
/// Jobs run one at a time, in posting order, interleaved with command
/// dispatch and response routing.
#[derive(Clone)]
pub struct SerialContext {
    jobs_tx: mpsc::UnboundedSender<Job>,
}

impl SerialContext {
    /// Queue `job` to run on the session task.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SessionClosed`] once the session has stopped.
    #[track_caller]
    pub fn post<F>(&self, job: F) -> CoreResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.jobs_tx
            .send(Box::new(job))
            .map_err(|_| ProtocolError::SessionClosed {
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

/// Receiving end of a [`SerialContext`], drained by the session loop.
pub(crate) struct SerialQueue {
    jobs_rx: mpsc::UnboundedReceiver<Job>,
}

impl SerialQueue {
    pub(crate) async fn next(&mut self) -> Option<Job> {
        self.jobs_rx.recv().await
    }
}

pub(crate) fn channel() -> (SerialContext, SerialQueue) {
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
    (SerialContext { jobs_tx }, SerialQueue { jobs_rx })
}
