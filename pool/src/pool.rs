// Copyright (c) 2022, 37 Miners, LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use mthttpd_err::{Error, ErrorKind};
use mthttpd_log::*;
use mthttpd_util::lock;
use mthttpd_util::BoundedQueue;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

info!();

// how long a blocked worker or submitter sleeps before rechecking the
// running flag
const POLL_MILLIS: u64 = 1_000;

/// Configuration of a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
	/// Number of worker threads. Each worker processes one item at a time.
	pub workers: usize,
	/// Capacity of the hand-off queue. [`WorkerPool::submit`] blocks while
	/// the queue is full.
	pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
	fn default() -> Self {
		Self {
			workers: 10,
			queue_capacity: 50,
		}
	}
}

#[derive(Clone)]
struct Callbacks<OnItem, OnPanic> {
	on_item: Option<Pin<Box<OnItem>>>,
	on_panic: Option<Pin<Box<OnPanic>>>,
}

/// A fixed set of long-lived worker threads draining a bounded FIFO
/// hand-off queue. Items are submitted by a producer ([`WorkerPool::submit`])
/// and picked up by exactly one worker, which runs the `on_item` callback on
/// them. A callback that panics is trapped by the worker: the pool logs the
/// fault, invokes `on_panic` and the worker returns to the queue.
pub struct WorkerPool<T, OnItem, OnPanic> {
	config: WorkerPoolConfig,
	queue: Arc<(Mutex<BoundedQueue<T>>, Condvar, Condvar)>,
	active: Arc<Mutex<usize>>,
	running: Arc<AtomicBool>,
	callbacks: Callbacks<OnItem, OnPanic>,
}

impl<T, OnItem, OnPanic> WorkerPool<T, OnItem, OnPanic>
where
	T: Send + 'static,
	OnItem: Fn(usize, T) -> Result<(), Error> + Send + 'static + Clone + Sync + Unpin,
	OnPanic: Fn() -> Result<(), Error> + Send + 'static + Clone + Sync + Unpin,
{
	pub fn new(config: WorkerPoolConfig) -> Result<Self, Error> {
		if config.workers == 0 {
			return Err(ErrorKind::WorkerPoolConfigurationError(
				"workers must be greater than zero".to_string(),
			)
			.into());
		}
		if config.queue_capacity == 0 {
			return Err(ErrorKind::WorkerPoolConfigurationError(
				"queue_capacity must be greater than zero".to_string(),
			)
			.into());
		}
		let queue = Arc::new((
			Mutex::new(BoundedQueue::new(config.queue_capacity)),
			Condvar::new(),
			Condvar::new(),
		));
		Ok(Self {
			config,
			queue,
			active: Arc::new(Mutex::new(0)),
			running: Arc::new(AtomicBool::new(true)),
			callbacks: Callbacks {
				on_item: None,
				on_panic: None,
			},
		})
	}

	pub fn set_on_item(&mut self, on_item: OnItem) -> Result<(), Error> {
		self.callbacks.on_item = Some(Box::pin(on_item));
		Ok(())
	}

	pub fn set_on_panic(&mut self, on_panic: OnPanic) -> Result<(), Error> {
		self.callbacks.on_panic = Some(Box::pin(on_panic));
		Ok(())
	}

	pub fn start(&self) -> Result<(), Error> {
		self.check_callbacks()?;
		for tid in 0..self.config.workers {
			self.start_thread(tid)?;
		}
		Ok(())
	}

	/// Number of workers currently running the `on_item` callback.
	pub fn active_count(&self) -> Result<usize, Error> {
		let active = lock!(self.active)?;
		Ok(*active)
	}

	/// Number of items waiting in the hand-off queue.
	pub fn queue_size(&self) -> Result<usize, Error> {
		let (queue, _not_empty, _not_full) = &*self.queue;
		let queue = lock!(queue)?;
		Ok(queue.size())
	}

	pub fn worker_count(&self) -> usize {
		self.config.workers
	}

	/// Transfer ownership of an item to the pool. Blocks while the queue is
	/// full so accepted items are never dropped.
	pub fn submit(&self, item: T) -> Result<(), Error> {
		let (queue, not_empty, not_full) = &*self.queue;
		let mut guard = lock!(queue)?;
		while guard.size() >= guard.capacity() {
			if !self.running.load(Ordering::SeqCst) {
				return Err(
					ErrorKind::ApplicationError("worker pool is stopped".to_string()).into(),
				);
			}
			guard = Self::wait(not_full, guard)?;
		}
		guard.enqueue(item)?;
		not_empty.notify_one();
		Ok(())
	}

	/// Stop the pool. Workers finish the item they are on, observe the
	/// running flag and exit. The workers are not joined; they are detached
	/// like the rest of the pool and die with the process.
	pub fn stop(&self) -> Result<(), Error> {
		self.running.store(false, Ordering::SeqCst);
		let (_queue, not_empty, not_full) = &*self.queue;
		not_empty.notify_all();
		not_full.notify_all();
		Ok(())
	}

	fn check_callbacks(&self) -> Result<(), Error> {
		if self.callbacks.on_item.is_none() {
			return Err(ErrorKind::WorkerPoolConfigurationError(
				"set_on_item must be called before calling start".to_string(),
			)
			.into());
		}
		if self.callbacks.on_panic.is_none() {
			return Err(ErrorKind::WorkerPoolConfigurationError(
				"set_on_panic must be called before calling start".to_string(),
			)
			.into());
		}
		Ok(())
	}

	fn start_thread(&self, tid: usize) -> Result<(), Error> {
		let queue = self.queue.clone();
		let active = self.active.clone();
		let running = self.running.clone();
		let callbacks = self.callbacks.clone();
		thread::spawn(move || {
			let _ = debug!("starting worker {}", tid);
			loop {
				match Self::worker_loop(tid, &queue, &active, &running, &callbacks) {
					Ok(true) => {}
					Ok(false) => break,
					Err(e) => {
						let _ = fatal!("unexpected error in worker loop: {}", e);
					}
				}
			}
			let _ = debug!("worker {} stopped", tid);
		});
		Ok(())
	}

	// Ok(true) means an item was processed, Ok(false) means shutdown.
	fn worker_loop(
		tid: usize,
		queue: &Arc<(Mutex<BoundedQueue<T>>, Condvar, Condvar)>,
		active: &Arc<Mutex<usize>>,
		running: &Arc<AtomicBool>,
		callbacks: &Callbacks<OnItem, OnPanic>,
	) -> Result<bool, Error> {
		let item = {
			let (queue, not_empty, not_full) = &**queue;
			let mut guard = lock!(queue)?;
			loop {
				match guard.dequeue()? {
					Some(item) => {
						not_full.notify_one();
						break item;
					}
					None => {
						if !running.load(Ordering::SeqCst) {
							return Ok(false);
						}
						guard = Self::wait(not_empty, guard)?;
					}
				}
			}
		};

		{
			let mut active = lock!(active)?;
			*active += 1;
		}

		let res = match &callbacks.on_item {
			Some(on_item) => catch_unwind(AssertUnwindSafe(|| (**on_item)(tid, item))),
			None => {
				let mut active = lock!(active)?;
				*active -= 1;
				return Err(ErrorKind::WorkerPoolConfigurationError(
					"on_item not set".to_string(),
				)
				.into());
			}
		};

		{
			let mut active = lock!(active)?;
			*active -= 1;
		}

		match res {
			Ok(Ok(_)) => {}
			Ok(Err(e)) => {
				warn!("worker {} handler returned error: {}", tid, e)?;
			}
			Err(_) => {
				warn!("worker {} handler panicked", tid)?;
				match &callbacks.on_panic {
					Some(on_panic) => (**on_panic)()?,
					None => {}
				}
			}
		}

		Ok(true)
	}

	fn wait<'a>(
		condvar: &Condvar,
		guard: MutexGuard<'a, BoundedQueue<T>>,
	) -> Result<MutexGuard<'a, BoundedQueue<T>>, Error> {
		let (guard, _timeout) = condvar
			.wait_timeout(guard, Duration::from_millis(POLL_MILLIS))
			.map_err(|e| {
				let error: Error =
					ErrorKind::PoisonError(format!("Poison Error: {}", e.to_string())).into();
				error
			})?;
		Ok(guard)
	}
}
