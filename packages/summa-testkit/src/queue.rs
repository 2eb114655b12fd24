use std::{
	collections::{HashMap, VecDeque},
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use tokio::{sync::Notify, time};

use summa_queue::{BoxFuture, Delivery, Error, JobDescriptor, JobQueue, Result};

/// In-process [`JobQueue`] with at-least-once semantics.
///
/// Unacknowledged deliveries stay in flight until `ack` or `retry`; `redeliver_in_flight`
/// simulates a consumer that died mid-job.
#[derive(Default)]
pub struct MemoryJobQueue {
	state: Mutex<QueueState>,
	next_receipt: AtomicU64,
	next_job: AtomicU64,
	notify: Notify,
}

#[derive(Default)]
struct QueueState {
	pending: VecDeque<(String, u32)>,
	in_flight: HashMap<String, (String, u32)>,
	acked: u64,
	retried: Vec<String>,
}

impl MemoryJobQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes a raw payload, bypassing the descriptor codec.
	pub fn push_raw(&self, payload: impl Into<String>) {
		self.lock().pending.push_back((payload.into(), 0));
		self.notify.notify_one();
	}

	pub fn pending(&self) -> usize {
		self.lock().pending.len()
	}

	pub fn in_flight(&self) -> usize {
		self.lock().in_flight.len()
	}

	pub fn acked(&self) -> u64 {
		self.lock().acked
	}

	/// Error messages passed to `retry`, in order.
	pub fn retried(&self) -> Vec<String> {
		self.lock().retried.clone()
	}

	/// Descriptors waiting to be delivered, oldest first.
	pub fn pending_descriptors(&self) -> Vec<JobDescriptor> {
		self.lock()
			.pending
			.iter()
			.filter_map(|(payload, _)| JobDescriptor::decode(payload).ok())
			.collect()
	}

	/// Moves every unacknowledged delivery back to the pending list.
	pub fn redeliver_in_flight(&self) {
		let mut state = self.lock();
		let in_flight = state.in_flight.drain().map(|(_, job)| job).collect::<Vec<_>>();

		state.pending.extend(in_flight);
		drop(state);
		self.notify.notify_waiters();
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn try_take(&self) -> Option<Delivery> {
		let mut state = self.lock();
		let (payload, attempts) = state.pending.pop_front()?;
		let attempts = attempts.saturating_add(1);
		let receipt = self.next_receipt.fetch_add(1, Ordering::SeqCst).to_string();

		state.in_flight.insert(receipt.clone(), (payload.clone(), attempts));

		Some(Delivery { receipt, payload, attempts })
	}
}
impl JobQueue for MemoryJobQueue {
	fn enqueue<'a>(&'a self, descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			self.push_raw(descriptor.encode());

			Ok(format!("memory-job-{}", self.next_job.fetch_add(1, Ordering::SeqCst)))
		})
	}

	fn dequeue(&self, wait: Duration) -> BoxFuture<'_, Result<Option<Delivery>>> {
		Box::pin(async move {
			let deadline = time::Instant::now() + wait;

			loop {
				let notified = self.notify.notified();

				if let Some(delivery) = self.try_take() {
					return Ok(Some(delivery));
				}
				if time::timeout_at(deadline, notified).await.is_err() {
					return Ok(self.try_take());
				}
			}
		})
	}

	fn ack<'a>(&'a self, delivery: &'a Delivery) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();

			if state.in_flight.remove(&delivery.receipt).is_some() {
				state.acked += 1;
			}

			Ok(())
		})
	}

	fn retry<'a>(&'a self, delivery: &'a Delivery, error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut state = self.lock();

			if let Some(job) = state.in_flight.remove(&delivery.receipt) {
				state.pending.push_back(job);
			}

			state.retried.push(error.to_string());
			drop(state);
			self.notify.notify_one();

			Ok(())
		})
	}
}

/// A queue whose broker is always unreachable.
#[derive(Default)]
pub struct FailingJobQueue;
impl JobQueue for FailingJobQueue {
	fn enqueue<'a>(&'a self, _descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>> {
		Box::pin(async { Err(Error::Unavailable("connection refused".to_string())) })
	}

	fn dequeue(&self, _wait: Duration) -> BoxFuture<'_, Result<Option<Delivery>>> {
		Box::pin(async { Err(Error::Unavailable("connection refused".to_string())) })
	}

	fn ack<'a>(&'a self, _delivery: &'a Delivery) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Err(Error::Unavailable("connection refused".to_string())) })
	}

	fn retry<'a>(&'a self, _delivery: &'a Delivery, _error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Err(Error::Unavailable("connection refused".to_string())) })
	}
}

/// A queue whose `enqueue` never completes, like a broker that accepts the connection and then
/// stops responding.
#[derive(Default)]
pub struct HangingJobQueue;
impl JobQueue for HangingJobQueue {
	fn enqueue<'a>(&'a self, _descriptor: &'a JobDescriptor) -> BoxFuture<'a, Result<String>> {
		Box::pin(std::future::pending())
	}

	fn dequeue(&self, wait: Duration) -> BoxFuture<'_, Result<Option<Delivery>>> {
		Box::pin(async move {
			time::sleep(wait).await;

			Ok(None)
		})
	}

	fn ack<'a>(&'a self, _delivery: &'a Delivery) -> BoxFuture<'a, Result<()>> {
		Box::pin(std::future::pending())
	}

	fn retry<'a>(&'a self, _delivery: &'a Delivery, _error: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(std::future::pending())
	}
}
