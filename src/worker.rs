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

//! This module stores the worker task which competes for permits.

use crate::err::Error;
use crate::interrupt::Interrupt;
use crate::semaphore::PermitPool;
use crossbeam_queue::SegQueue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A status change reported by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
	/// The worker is about to wait for a permit
	Requesting,
	/// The worker holds a permit
	Acquired,
	/// The worker is about to return its permit
	Releasing,
	/// The worker has returned its permit
	Released,
}

impl WorkerEvent {
	/// Pairs this event with a worker id for display
	pub fn line(self, id: usize) -> EventLine {
		EventLine {
			id,
			event: self,
		}
	}
}

/// A worker event rendered as a human-readable status line
pub struct EventLine {
	id: usize,
	event: WorkerEvent,
}

impl fmt::Display for EventLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let id = self.id;
		match self.event {
			WorkerEvent::Requesting => write!(f, "Thread {id} is trying to acquire a permit."),
			WorkerEvent::Acquired => write!(f, "Thread {id} has acquired a permit."),
			WorkerEvent::Releasing => write!(f, "Thread {id} is releasing the permit."),
			WorkerEvent::Released => write!(f, "Thread {id} has released the permit."),
		}
	}
}

/// Destination for worker status events
pub trait EventSink: Send + Sync {
	fn emit(&self, id: usize, event: WorkerEvent);
}

/// Prints every event to standard output
#[derive(Default)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
	fn emit(&self, id: usize, event: WorkerEvent) {
		println!("{}", event.line(id));
	}
}

/// Records every event in emission order
#[derive(Default)]
pub struct RecordingSink {
	events: SegQueue<(usize, WorkerEvent)>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drains the recorded events, oldest first
	pub fn events(&self) -> Vec<(usize, WorkerEvent)> {
		std::iter::from_fn(|| self.events.pop()).collect()
	}
}

impl EventSink for RecordingSink {
	fn emit(&self, id: usize, event: WorkerEvent) {
		self.events.push((id, event));
	}
}

/// How a worker finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
	/// The permit was held for the full duration, then released
	Completed,
	/// The worker was interrupted before it obtained a permit
	InterruptedWhileWaiting,
	/// The worker was interrupted while holding its permit, which was released early
	InterruptedWhileHolding,
}

/// A single task which acquires a permit, holds it, and releases it
pub struct Worker {
	/// The id reported in status events
	pub(crate) id: usize,
	/// The shared pool this worker competes for
	pub(crate) pool: PermitPool,
	/// The signal used to cancel this worker
	pub(crate) interrupt: Interrupt,
	/// How long the permit is held for
	pub(crate) hold: Duration,
	/// Where status events are sent
	pub(crate) sink: Arc<dyn EventSink>,
}

impl Worker {
	pub fn new(
		id: usize,
		pool: PermitPool,
		interrupt: Interrupt,
		hold: Duration,
		sink: Arc<dyn EventSink>,
	) -> Self {
		Self {
			id,
			pool,
			interrupt,
			hold,
			sink,
		}
	}

	pub fn id(&self) -> usize {
		self.id
	}

	/// Runs the worker to completion on the calling thread
	pub fn run(self) -> WorkerOutcome {
		let id = self.id;
		self.sink.emit(id, WorkerEvent::Requesting);
		// Wait for a permit, or give up if interrupted
		let permit = match self.pool.acquire(&self.interrupt) {
			Ok(permit) => permit,
			Err(e) => {
				// Nothing was taken, so nothing is released
				tracing::debug!(worker = id, "Stopped waiting for a permit: {e}");
				return WorkerOutcome::InterruptedWhileWaiting;
			}
		};
		self.sink.emit(id, WorkerEvent::Acquired);
		tracing::trace!(worker = id, hold = ?self.hold, "Holding permit");
		// Simulate some work while holding the permit
		let outcome = match self.interrupt.sleep(self.hold) {
			Ok(()) => WorkerOutcome::Completed,
			Err(Error::Interrupted) => {
				tracing::debug!(worker = id, "Interrupted while holding a permit");
				WorkerOutcome::InterruptedWhileHolding
			}
			Err(e) => {
				tracing::error!(worker = id, "Unexpected error while holding a permit: {e}");
				WorkerOutcome::InterruptedWhileHolding
			}
		};
		self.sink.emit(id, WorkerEvent::Releasing);
		drop(permit);
		self.sink.emit(id, WorkerEvent::Released);
		outcome
	}
}
