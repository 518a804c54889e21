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

//! This module stores the permit pool error types.

use thiserror::Error;

/// A specialised result type for permit pool operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors which can be emitted from a permit pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// The calling thread was interrupted while blocked.
	#[error("Interrupted while waiting")]
	Interrupted,

	/// No permit became available within the timeout.
	#[error("Timed out waiting for a permit")]
	Timeout,

	/// A permit was released without a matching acquire.
	#[error("Release would exceed the pool capacity of {capacity}")]
	ReleaseOverflow {
		/// The capacity of the pool.
		capacity: usize,
	},

	/// A permit pool was configured without any permits.
	#[error("Invalid pool capacity {0}, at least one permit is required")]
	InvalidCapacity(usize),

	/// A worker thread could not be started.
	#[error("Failed to spawn worker {id}: {message}")]
	Spawn {
		/// The id of the worker.
		id: usize,
		/// The reason reported by the operating system.
		message: String,
	},

	/// A worker thread panicked before finishing.
	#[error("Worker {0} panicked")]
	WorkerPanicked(usize),
}
