// Copyright © SurrealDB Ltd
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

//! This module stores the permit pool semaphore logic.

use crate::err::{Error, Result};
use crate::interrupt::Interrupt;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A counting semaphore with a fixed number of permits.
///
/// Threads block in [`PermitPool::acquire`] while no permit is
/// available, and are woken one at a time as permits are returned.
/// Cloning a pool is cheap, and every clone shares the same permits.
#[derive(Clone)]
pub struct PermitPool {
	shared: Arc<Shared>,
}

pub(crate) struct Shared {
	/// The fixed number of permits in this pool
	capacity: usize,
	/// The permit counter and statistics
	state: Mutex<State>,
	/// Condition variable for waiting threads
	condvar: Condvar,
}

struct State {
	/// Number of available permits
	available: usize,
	/// Highest number of permits held at once
	peak_held: usize,
	/// Total number of permits granted
	acquired: u64,
	/// Total number of permits returned
	released: u64,
	/// Total number of acquisitions abandoned after an interrupt
	interrupted: u64,
	/// Total number of releases refused at full capacity
	rejected_releases: u64,
}

impl Shared {
	/// Wakes every waiting thread so that it can recheck its interrupt
	pub(crate) fn wake_all(&self) {
		// Take the lock so a thread between its check and its wait can't miss this
		let _state = self.state.lock();
		self.condvar.notify_all();
	}

	/// Returns a single permit to the pool
	fn put_back(&self) -> Result<()> {
		let mut state = self.state.lock();
		if state.available >= self.capacity {
			state.rejected_releases += 1;
			tracing::warn!(capacity = self.capacity, "Release without a matching acquire refused");
			return Err(Error::ReleaseOverflow {
				capacity: self.capacity,
			});
		}
		state.available += 1;
		state.released += 1;
		self.condvar.notify_one();
		Ok(())
	}
}

impl PermitPool {
	/// Create a new pool with `capacity` permits available
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	pub fn new(capacity: usize) -> Self {
		assert!(capacity > 0, "capacity must be > 0");
		Self {
			shared: Arc::new(Shared {
				capacity,
				state: Mutex::new(State {
					available: capacity,
					peak_held: 0,
					acquired: 0,
					released: 0,
					interrupted: 0,
					rejected_releases: 0,
				}),
				condvar: Condvar::new(),
			}),
		}
	}

	/// The fixed number of permits in this pool
	pub fn capacity(&self) -> usize {
		self.shared.capacity
	}

	/// The number of permits which can currently be acquired
	pub fn available_permits(&self) -> usize {
		self.shared.state.lock().available
	}

	/// Acquire a permit, blocking until one is available.
	///
	/// Returns [`Error::Interrupted`] if `interrupt` is already set, or
	/// is triggered while waiting. In that case no permit was taken and
	/// nothing needs to be released.
	pub fn acquire(&self, interrupt: &Interrupt) -> Result<Permit<'_>> {
		self.acquire_until(Some(interrupt), None)
	}

	/// Acquire a permit, blocking until one is available or `timeout` elapses.
	///
	/// A timeout too long to be represented as a deadline waits like
	/// [`PermitPool::acquire`].
	pub fn acquire_timeout(&self, interrupt: &Interrupt, timeout: Duration) -> Result<Permit<'_>> {
		self.acquire_until(Some(interrupt), Instant::now().checked_add(timeout))
	}

	/// Acquire a permit, blocking until one is available, without any way to cancel the wait
	pub fn acquire_uninterruptible(&self) -> Permit<'_> {
		let mut state = self.shared.state.lock();
		while state.available == 0 {
			self.shared.condvar.wait(&mut state);
		}
		self.grant(state)
	}

	/// Acquire a permit only if one is available right now
	pub fn try_acquire(&self) -> Option<Permit<'_>> {
		let state = self.shared.state.lock();
		if state.available == 0 {
			return None;
		}
		Some(self.grant(state))
	}

	/// Release a permit, allowing another waiting thread to proceed.
	///
	/// This is the counterpart of [`Permit::forget`]. A release without
	/// a matching acquire is refused with [`Error::ReleaseOverflow`], so
	/// the number of available permits never exceeds the capacity.
	pub fn release(&self) -> Result<()> {
		self.shared.put_back()
	}

	/// Take a snapshot of the pool counters
	pub fn stats(&self) -> PoolStats {
		let state = self.shared.state.lock();
		PoolStats {
			capacity: self.shared.capacity,
			available: state.available,
			held: self.shared.capacity - state.available,
			peak_held: state.peak_held,
			acquired: state.acquired,
			released: state.released,
			interrupted: state.interrupted,
			rejected_releases: state.rejected_releases,
		}
	}

	fn acquire_until(
		&self,
		interrupt: Option<&Interrupt>,
		deadline: Option<Instant>,
	) -> Result<Permit<'_>> {
		// Let the interrupt find us before checking its flag
		let _parked = interrupt.map(|i| i.park_on(&self.shared));
		// Wait on the counter until a permit is free
		let mut state = self.shared.state.lock();
		loop {
			// Give up the wait without touching the counter
			if interrupt.is_some_and(Interrupt::is_interrupted) {
				state.interrupted += 1;
				// Hand on any wakeup this thread may have consumed
				if state.available > 0 {
					self.shared.condvar.notify_one();
				}
				return Err(Error::Interrupted);
			}
			if state.available > 0 {
				return Ok(self.grant(state));
			}
			match deadline {
				Some(deadline) => {
					if Instant::now() >= deadline {
						return Err(Error::Timeout);
					}
					self.shared.condvar.wait_until(&mut state, deadline);
				}
				None => self.shared.condvar.wait(&mut state),
			}
		}
	}

	fn grant(&self, mut state: MutexGuard<'_, State>) -> Permit<'_> {
		state.available -= 1;
		state.acquired += 1;
		let held = self.shared.capacity - state.available;
		state.peak_held = state.peak_held.max(held);
		Permit {
			pool: self,
			active: true,
		}
	}
}

/// A permit held from a [`PermitPool`].
///
/// The permit is returned to the pool when dropped, on every exit
/// path including unwinding.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
	pool: &'a PermitPool,
	active: bool,
}

impl Permit<'_> {
	/// Keep the permit held without returning it on drop.
	///
	/// The permit stays counted as held until [`PermitPool::release`]
	/// is called.
	pub fn forget(mut self) {
		self.active = false;
	}
}

impl Drop for Permit<'_> {
	fn drop(&mut self) {
		if self.active {
			if let Err(e) = self.pool.shared.put_back() {
				tracing::error!("Failed to return permit to pool: {e}");
			}
		}
	}
}

/// Immutable snapshot of the counters of a [`PermitPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
	pub capacity: usize,
	pub available: usize,
	pub held: usize,
	pub peak_held: usize,
	pub acquired: u64,
	pub released: u64,
	pub interrupted: u64,
	pub rejected_releases: u64,
}

impl fmt::Display for PoolStats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"held={}/{}, peak_held={}, acquired={}, released={}, interrupted={}, rejected_releases={}",
			self.held,
			self.capacity,
			self.peak_held,
			self.acquired,
			self.released,
			self.interrupted,
			self.rejected_releases
		)
	}
}

#[cfg(test)]
mod tests {

	use super::*;
	use std::thread;

	#[test]
	#[should_panic(expected = "capacity must be > 0")]
	fn zero_capacity_is_rejected() {
		let _ = PermitPool::new(0);
	}

	#[test]
	fn try_acquire_until_exhausted() {
		let pool = PermitPool::new(2);
		let p1 = pool.try_acquire();
		assert!(p1.is_some());
		let p2 = pool.try_acquire();
		assert!(p2.is_some());
		assert_eq!(pool.available_permits(), 0);
		assert!(pool.try_acquire().is_none());
		drop(p1);
		assert_eq!(pool.available_permits(), 1);
		assert!(pool.try_acquire().is_some());
	}

	#[test]
	fn dropped_permit_returns_to_pool() {
		let pool = PermitPool::new(1);
		let interrupt = Interrupt::new();
		{
			let _permit = pool.acquire(&interrupt).unwrap();
			assert_eq!(pool.available_permits(), 0);
		}
		assert_eq!(pool.available_permits(), 1);
		let stats = pool.stats();
		assert_eq!(stats.acquired, 1);
		assert_eq!(stats.released, 1);
		assert_eq!(stats.peak_held, 1);
	}

	#[test]
	fn release_without_acquire_is_refused() {
		let pool = PermitPool::new(2);
		assert_eq!(pool.release(), Err(Error::ReleaseOverflow { capacity: 2 }));
		assert_eq!(pool.available_permits(), 2);
		assert_eq!(pool.stats().rejected_releases, 1);
	}

	#[test]
	fn forgotten_permit_is_released_manually() {
		let pool = PermitPool::new(1);
		pool.acquire_uninterruptible().forget();
		assert_eq!(pool.available_permits(), 0);
		assert!(pool.try_acquire().is_none());
		assert_eq!(pool.release(), Ok(()));
		assert_eq!(pool.available_permits(), 1);
		// A second release has nothing to match
		assert!(pool.release().is_err());
	}

	#[test]
	fn acquire_fails_when_already_interrupted() {
		let pool = PermitPool::new(1);
		let interrupt = Interrupt::new();
		interrupt.interrupt();
		assert!(matches!(pool.acquire(&interrupt), Err(Error::Interrupted)));
		assert_eq!(pool.available_permits(), 1);
		assert_eq!(pool.stats().interrupted, 1);
	}

	#[test]
	fn acquire_timeout_leaves_count_unchanged() {
		let pool = PermitPool::new(1);
		let interrupt = Interrupt::new();
		let _held = pool.try_acquire().unwrap();
		let start = Instant::now();
		let res = pool.acquire_timeout(&interrupt, Duration::from_millis(30));
		assert!(matches!(res, Err(Error::Timeout)));
		assert!(start.elapsed() >= Duration::from_millis(30));
		assert_eq!(pool.available_permits(), 0);
		assert_eq!(pool.stats().acquired, 1);
	}

	#[test]
	fn unbounded_timeout_acquires_free_permit() {
		let pool = PermitPool::new(1);
		let interrupt = Interrupt::new();
		let permit = pool.acquire_timeout(&interrupt, Duration::MAX);
		assert!(permit.is_ok());
		drop(permit);
		assert_eq!(pool.available_permits(), 1);
	}

	#[test]
	fn unbounded_timeout_is_woken_by_interrupt() {
		let pool = PermitPool::new(1);
		let _held = pool.try_acquire().unwrap();
		let interrupt = Interrupt::new();
		let waiter = pool.clone();
		let signal = interrupt.clone();
		let handle =
			thread::spawn(move || waiter.acquire_timeout(&signal, Duration::MAX).map(drop));
		thread::sleep(Duration::from_millis(50));
		interrupt.interrupt();
		assert_eq!(handle.join().unwrap(), Err(Error::Interrupted));
		assert_eq!(pool.available_permits(), 0);
	}

	#[test]
	fn shared_interrupt_wakes_remaining_waiter() {
		let pool = PermitPool::new(1);
		let _held = pool.try_acquire().unwrap();
		let interrupt = Interrupt::new();
		// The first thread waits with no deadline
		let waiter = pool.clone();
		let signal = interrupt.clone();
		let blocked = thread::spawn(move || waiter.acquire(&signal).map(drop));
		// The second thread shares the interrupt and gives up on its own
		let waiter = pool.clone();
		let signal = interrupt.clone();
		let timed = thread::spawn(move || {
			waiter.acquire_timeout(&signal, Duration::from_millis(50)).map(drop)
		});
		assert_eq!(timed.join().unwrap(), Err(Error::Timeout));
		thread::sleep(Duration::from_millis(20));
		// The remaining waiter must still be reachable
		let start = Instant::now();
		interrupt.interrupt();
		assert_eq!(blocked.join().unwrap(), Err(Error::Interrupted));
		assert!(start.elapsed() < Duration::from_secs(10));
		assert_eq!(pool.available_permits(), 0);
	}

	#[test]
	fn blocked_acquire_is_woken_by_release() {
		let pool = PermitPool::new(1);
		let held = pool.try_acquire().unwrap();
		let waiter = pool.clone();
		let handle = thread::spawn(move || {
			let interrupt = Interrupt::new();
			waiter.acquire(&interrupt).map(drop)
		});
		thread::sleep(Duration::from_millis(50));
		drop(held);
		assert_eq!(handle.join().unwrap(), Ok(()));
		assert_eq!(pool.available_permits(), 1);
		assert_eq!(pool.stats().acquired, 2);
	}

	#[test]
	fn blocked_acquire_is_woken_by_interrupt() {
		let pool = PermitPool::new(1);
		let _held = pool.try_acquire().unwrap();
		let interrupt = Interrupt::new();
		let waiter = pool.clone();
		let signal = interrupt.clone();
		let handle = thread::spawn(move || waiter.acquire(&signal).map(drop));
		thread::sleep(Duration::from_millis(50));
		interrupt.interrupt();
		assert_eq!(handle.join().unwrap(), Err(Error::Interrupted));
		// The interrupted waiter took nothing
		assert_eq!(pool.available_permits(), 0);
		let stats = pool.stats();
		assert_eq!(stats.acquired, 1);
		assert_eq!(stats.interrupted, 1);
	}

	#[test]
	fn permit_is_released_on_panic() {
		let pool = PermitPool::new(1);
		let worker = pool.clone();
		let res = thread::spawn(move || {
			let _permit = worker.acquire_uninterruptible();
			panic!("worker failed while holding a permit");
		})
		.join();
		assert!(res.is_err());
		assert_eq!(pool.available_permits(), 1);
	}

	#[test]
	fn stats_display() {
		let pool = PermitPool::new(2);
		let _permit = pool.try_acquire().unwrap();
		assert_eq!(
			pool.stats().to_string(),
			"held=1/2, peak_held=1, acquired=1, released=0, interrupted=0, rejected_releases=0"
		);
	}
}
