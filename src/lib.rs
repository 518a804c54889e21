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

//! A blocking counting semaphore for bounding concurrent access to a
//! shared resource among threads.
//!
//! A [`PermitPool`] hands out a fixed number of [`Permit`]s. Threads
//! which find no permit available block until one is returned, or
//! until their [`Interrupt`] is triggered. Permits are returned to the
//! pool when dropped.
//!
//! ```
//! use permitpool::{Interrupt, PermitPool};
//!
//! let pool = PermitPool::new(2);
//! let interrupt = Interrupt::new();
//! let permit = pool.acquire(&interrupt).unwrap();
//! assert_eq!(pool.available_permits(), 1);
//! drop(permit);
//! assert_eq!(pool.available_permits(), 2);
//! ```

mod demo;
mod err;
mod interrupt;
mod options;
mod semaphore;
mod worker;

pub use demo::{spawn, Demo};
pub use err::{Error, Result};
pub use interrupt::Interrupt;
pub use options::{DemoOptions, DEFAULT_CAPACITY, DEFAULT_HOLD, DEFAULT_WORKERS};
pub use semaphore::{Permit, PermitPool, PoolStats};
pub use worker::{
	EventLine, EventSink, RecordingSink, StdoutSink, Worker, WorkerEvent, WorkerOutcome,
};
