//! Invocation context carrying a cancellation signal.
//!
//! Each capability invocation receives a [`Context`]. The I/O steps of an
//! invocation race their future against [`Context::cancelled`] so that a
//! cancelled invocation returns promptly with [`Cancelled`] instead of
//! leaving an ambiguous partial state.

use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;

/// Returned when an operation observed cancellation of its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Cancellation scope shared by every step of one invocation.
#[derive(Debug, Clone)]
pub struct Context {
	cancel_rx: watch::Receiver<bool>,
}

/// Handle that cancels the [`Context`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
	cancel_tx: watch::Sender<bool>,
}

impl Context {
	/// A context that is never cancelled.
	pub fn background() -> Self {
		let (_cancel_tx, cancel_rx) = watch::channel(false);
		Self { cancel_rx }
	}

	/// A context together with the handle that cancels it.
	pub fn with_cancel() -> (Self, CancelHandle) {
		let (cancel_tx, cancel_rx) = watch::channel(false);
		(Self { cancel_rx }, CancelHandle { cancel_tx })
	}

	pub fn is_cancelled(&self) -> bool {
		*self.cancel_rx.borrow()
	}

	/// Resolves once the context is cancelled. Never resolves for a context
	/// whose handle was dropped without cancelling.
	pub async fn cancelled(&self) {
		let mut rx = self.cancel_rx.clone();
		loop {
			if *rx.borrow_and_update() {
				return;
			}
			if rx.changed().await.is_err() {
				std::future::pending::<()>().await;
			}
		}
	}

	/// Drives `fut` to completion unless the context is cancelled first.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
	where
		F: Future,
	{
		tokio::select! {
			biased;
			_ = self.cancelled() => Err(Cancelled),
			output = fut => Ok(output),
		}
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::background()
	}
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.cancel_tx.send_replace(true);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn test_background_runs_to_completion() {
		let ctx = Context::background();
		assert!(!ctx.is_cancelled());
		assert_eq!(ctx.run(async { 7 }).await, Ok(7));
	}

	#[tokio::test]
	async fn test_cancelled_before_run() {
		let (ctx, handle) = Context::with_cancel();
		handle.cancel();
		assert!(ctx.is_cancelled());
		assert_eq!(ctx.run(async { 7 }).await, Err(Cancelled));
	}

	#[tokio::test]
	async fn test_cancel_interrupts_pending_future() {
		let (ctx, handle) = Context::with_cancel();
		let task = tokio::spawn(async move { ctx.run(std::future::pending::<()>()).await });

		tokio::time::sleep(Duration::from_millis(10)).await;
		handle.cancel();

		assert_eq!(task.await.unwrap(), Err(Cancelled));
	}

	#[tokio::test]
	async fn test_dropped_handle_never_cancels() {
		let (ctx, handle) = Context::with_cancel();
		drop(handle);
		assert_eq!(ctx.run(async { "done" }).await, Ok("done"));
	}
}
