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

//! This module stores the cooperative interrupt signal used to
//! cancel threads which are blocked on a permit pool.

use crate::err::{Error, Result};
use crate::semaphore::Shared;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A sticky interrupt flag which can wake a blocked thread.
///
/// An `Interrupt` is normally owned by a single worker thread, with
/// clones handed to whoever may need to cancel that worker. Once set,
/// the flag stays set, and every subsequent blocking call made with it
/// returns [`Error::Interrupted`] straight away.
#[derive(Clone, Default)]
pub struct Interrupt {
	inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
	/// Whether this interrupt has been triggered
	flag: AtomicBool,
	/// The lock guarding interruptible sleeps
	lock: Mutex<()>,
	/// The condition variable sleeping threads wait on
	condvar: Condvar,
	/// The permit pools threads are currently blocked on, once per waiting thread
	parked: Mutex<Vec<Arc<Shared>>>,
}

impl Interrupt {
	/// Creates a new interrupt which has not been triggered
	pub fn new() -> Self {
		Self::default()
	}

	/// Triggers the interrupt, waking the owning thread if it is blocked
	pub fn interrupt(&self) {
		// Set the flag before looking for a blocked thread
		self.inner.flag.store(true, Ordering::SeqCst);
		// Wake the thread if it is in an interruptible sleep
		{
			let _guard = self.inner.lock.lock();
			self.inner.condvar.notify_all();
		}
		// Wake any thread waiting for a permit
		let parked = self.inner.parked.lock().clone();
		for shared in parked {
			shared.wake_all();
		}
	}

	/// Checks whether the interrupt has been triggered
	pub fn is_interrupted(&self) -> bool {
		self.inner.flag.load(Ordering::SeqCst)
	}

	/// Sleeps for `duration`, returning early if interrupted.
	///
	/// A duration too long to be represented as a deadline sleeps until
	/// the interrupt is triggered.
	pub fn sleep(&self, duration: Duration) -> Result<()> {
		let deadline = Instant::now().checked_add(duration);
		let mut guard = self.inner.lock.lock();
		loop {
			if self.is_interrupted() {
				return Err(Error::Interrupted);
			}
			match deadline {
				Some(deadline) => {
					if Instant::now() >= deadline {
						return Ok(());
					}
					self.inner.condvar.wait_until(&mut guard, deadline);
				}
				None => self.inner.condvar.wait(&mut guard),
			}
		}
	}

	/// Records that a thread is about to block on a pool
	pub(crate) fn park_on(&self, shared: &Arc<Shared>) -> Parked<'_> {
		self.inner.parked.lock().push(Arc::clone(shared));
		Parked {
			interrupt: self,
			shared: Arc::clone(shared),
		}
	}
}

/// Removes one parked entry once its thread stops waiting
pub(crate) struct Parked<'a> {
	interrupt: &'a Interrupt,
	shared: Arc<Shared>,
}

impl Drop for Parked<'_> {
	fn drop(&mut self) {
		let mut parked = self.interrupt.inner.parked.lock();
		// Other threads may still be waiting on the same pool
		if let Some(pos) = parked.iter().position(|s| Arc::ptr_eq(s, &self.shared)) {
			parked.swap_remove(pos);
		}
	}
}
