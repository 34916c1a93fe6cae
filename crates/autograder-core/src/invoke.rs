//! Timeout-bounded invocation of scoring procedures.
//!
//! Each procedure runs on its own worker thread with a private
//! current-thread runtime and reports back over a oneshot channel. The caller
//! only waits on the channel, so a procedure that blocks its thread cannot
//! hold up the caller's timer. When the deadline fires the caller drops the
//! cancel handle and stops listening; a result that arrives later is never
//! read.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::oneshot;

/// Outcome of a procedure that did not raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation<T> {
    /// Finished within the deadline.
    Completed(T),
    /// Still running when the deadline passed; the procedure was cancelled.
    TimedOut,
    /// The worker itself failed to report a result.
    Failed(String),
}

/// What a worker thread sends back.
enum Report<T> {
    Returned(Result<T>),
    Panicked(String),
    Unavailable(String),
}

/// Run `procedure` to completion or until `timeout` elapses.
///
/// An error returned by the procedure, or a panic inside it, propagates as
/// `Err`. Timeouts and worker failures are reported through [`Invocation`].
pub async fn invoke_with_timeout<F, T>(timeout: Duration, procedure: F) -> Result<Invocation<T>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let (report_tx, report_rx) = oneshot::channel();
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    let spawned = std::thread::Builder::new()
        .name("autograder-scorer".into())
        .spawn(move || run_worker(procedure, cancel_rx, report_tx));
    if let Err(e) = spawned {
        return Ok(Invocation::Failed(format!("could not start worker thread: {e}")));
    }

    let outcome = await_report(timeout, report_rx).await;
    // Dropping the handle cancels a procedure that is still running.
    drop(cancel_tx);
    outcome
}

fn run_worker<F, T>(procedure: F, cancel: oneshot::Receiver<()>, report: oneshot::Sender<Report<T>>)
where
    F: Future<Output = Result<T>> + Send + 'static,
{
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = report.send(Report::Unavailable(format!(
                "could not start worker runtime: {e}"
            )));
            return;
        }
    };

    let run = std::panic::catch_unwind(AssertUnwindSafe(|| {
        runtime.block_on(async {
            tokio::select! {
                result = procedure => Some(result),
                _ = cancel => None,
            }
        })
    }));

    let message = match run {
        Ok(Some(result)) => Report::Returned(result),
        Ok(None) => return,
        Err(payload) => Report::Panicked(panic_message(payload.as_ref())),
    };
    // The caller may have stopped listening; a late report is dropped here.
    let _ = report.send(message);
}

async fn await_report<T>(
    timeout: Duration,
    report: oneshot::Receiver<Report<T>>,
) -> Result<Invocation<T>> {
    match tokio::time::timeout(timeout, report).await {
        Ok(Ok(Report::Returned(result))) => result.map(Invocation::Completed),
        Ok(Ok(Report::Panicked(message))) => anyhow::bail!("panicked: {message}"),
        Ok(Ok(Report::Unavailable(reason))) => Ok(Invocation::Failed(reason)),
        Ok(Err(_)) => Ok(Invocation::Failed(
            "worker exited without reporting a result".into(),
        )),
        Err(_elapsed) => {
            tracing::debug!("procedure abandoned after {}s", timeout.as_secs_f64());
            Ok(Invocation::TimedOut)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
