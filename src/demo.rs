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

//! This module stores the logic for starting a set of workers against one pool.

use crate::err::{Error, Result};
use crate::interrupt::Interrupt;
use crate::options::DemoOptions;
use crate::semaphore::PermitPool;
use crate::worker::{EventSink, Worker, WorkerOutcome};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A running set of workers sharing a single permit pool
pub struct Demo {
	/// The pool every worker competes for
	pool: PermitPool,
	/// The interrupt and thread handle of each worker, indexed by id
	workers: Vec<(Interrupt, JoinHandle<WorkerOutcome>)>,
}

/// Starts `options.workers` threads, all at once, against a new pool
///
/// Returns [`Error::InvalidCapacity`] if `options.capacity` is zero.
pub fn spawn(options: &DemoOptions, sink: Arc<dyn EventSink>) -> Result<Demo> {
	// A pool needs at least one permit
	if options.capacity == 0 {
		return Err(Error::InvalidCapacity(options.capacity));
	}
	// Create the shared pool
	let pool = PermitPool::new(options.capacity);
	// Keep the reference to the threads
	let mut workers = Vec::with_capacity(options.workers);
	// Spin up a thread per worker
	for id in 0..options.workers {
		let interrupt = Interrupt::new();
		let worker = Worker::new(id, pool.clone(), interrupt.clone(), options.hold, sink.clone());
		let handle = thread::Builder::new()
			.name(format!("worker-{id}"))
			.spawn(move || worker.run())
			.map_err(|e| Error::Spawn {
				id,
				message: e.to_string(),
			});
		match handle {
			Ok(handle) => workers.push((interrupt, handle)),
			Err(e) => {
				// Stop the workers which did start before bailing out
				for (interrupt, _) in &workers {
					interrupt.interrupt();
				}
				return Err(e);
			}
		}
	}
	tracing::debug!(
		workers = options.workers,
		capacity = options.capacity,
		"Started workers"
	);
	Ok(Demo {
		pool,
		workers,
	})
}

impl Demo {
	/// The pool shared by the workers
	pub fn pool(&self) -> &PermitPool {
		&self.pool
	}

	/// The number of workers started
	pub fn len(&self) -> usize {
		self.workers.len()
	}

	/// Whether no workers were started
	pub fn is_empty(&self) -> bool {
		self.workers.is_empty()
	}

	/// Interrupts a single worker, returning false if there is no such worker
	pub fn interrupt(&self, id: usize) -> bool {
		match self.workers.get(id) {
			Some((interrupt, _)) => {
				interrupt.interrupt();
				true
			}
			None => false,
		}
	}

	/// Interrupts every worker
	pub fn interrupt_all(&self) {
		for (interrupt, _) in &self.workers {
			interrupt.interrupt();
		}
	}

	/// Waits for every worker to finish, returning their outcomes by id
	pub fn join(self) -> Result<Vec<WorkerOutcome>> {
		let mut outcomes = Vec::with_capacity(self.workers.len());
		let mut panicked = None;
		for (id, (_, handle)) in self.workers.into_iter().enumerate() {
			match handle.join() {
				Ok(outcome) => outcomes.push(outcome),
				Err(_) => {
					tracing::error!(worker = id, "Worker thread panicked");
					panicked.get_or_insert(id);
				}
			}
		}
		tracing::debug!("All workers finished: {}", self.pool.stats());
		match panicked {
			Some(id) => Err(Error::WorkerPanicked(id)),
			None => Ok(outcomes),
		}
	}

	/// Lets the workers run on without waiting for them
	pub fn detach(self) {
		tracing::debug!(workers = self.workers.len(), "Detaching workers");
	}
}
