use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Where a fit/predict task runs.
///
/// Both variants share one contract: submit a closure, block until its
/// result comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRunner {
    /// On the calling thread.
    #[default]
    Inline,
    /// On a dedicated worker thread, result handed back over a channel and
    /// the worker joined before returning.
    Isolated,
}

impl TaskRunner {
    pub fn run<T, F>(self, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match self {
            TaskRunner::Inline => task(),
            TaskRunner::Isolated => {
                let (tx, rx) = mpsc::sync_channel(1);
                let worker = thread::Builder::new()
                    .name("rolbearing-task".into())
                    .spawn(move || {
                        // The receiver only disappears if the caller is gone.
                        let _ = tx.send(task());
                    })
                    .context("spawning task worker")?;

                let received = rx.recv();
                worker
                    .join()
                    .map_err(|_| anyhow!("task worker panicked"))?;
                received.map_err(|_| anyhow!("task worker exited without a result"))?
            }
        }
    }
}
