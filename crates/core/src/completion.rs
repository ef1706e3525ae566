//! One-shot completion latch.
//!
//! A [`Completion`] starts pending and can be completed exactly once; any
//! number of clones can await it, before or after the fact, without consuming
//! it. Sessions use one to announce that the process output is exhausted and
//! another to mark the connection as closed.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Completion {
	tx: Arc<watch::Sender<bool>>,
}

impl Completion {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(false);
		Self { tx: Arc::new(tx) }
	}

	/// Marks the latch complete and wakes every waiter. Idempotent.
	pub fn complete(&self) {
		self.tx.send_replace(true);
	}

	pub fn is_complete(&self) -> bool {
		*self.tx.borrow()
	}

	/// Resolves once [`complete`](Self::complete) has been called.
	pub async fn wait(&self) {
		let mut rx = self.tx.subscribe();
		// The sender lives as long as `self`, so this cannot fail.
		let _ = rx.wait_for(|done| *done).await;
	}
}

impl Default for Completion {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn test_wakes_every_waiter() {
		let latch = Completion::new();
		let first = tokio::spawn({
			let latch = latch.clone();
			async move { latch.wait().await }
		});
		let second = tokio::spawn({
			let latch = latch.clone();
			async move { latch.wait().await }
		});

		tokio::task::yield_now().await;
		assert!(!latch.is_complete());
		latch.complete();

		first.await.unwrap();
		second.await.unwrap();
		assert!(latch.is_complete());
	}

	#[tokio::test]
	async fn test_wait_after_complete_returns_immediately() {
		let latch = Completion::new();
		latch.complete();
		latch.complete();
		tokio::time::timeout(Duration::from_millis(100), latch.wait())
			.await
			.expect("completed latch must not block");
		tokio::time::timeout(Duration::from_millis(100), latch.clone().wait())
			.await
			.expect("waiting does not consume the completion");
	}

	#[tokio::test(start_paused = true)]
	async fn test_pending_latch_blocks() {
		let latch = Completion::new();
		let waited = tokio::time::timeout(Duration::from_secs(5), latch.wait()).await;
		assert!(waited.is_err());
	}
}
