use std::time::Duration;

/// Default number of permits in the pool.
pub const DEFAULT_CAPACITY: usize = 2;

/// Default number of workers competing for permits.
pub const DEFAULT_WORKERS: usize = 5;

/// Default time each worker holds its permit.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(2000);

/// Configuration options for [`spawn`](crate::spawn).
#[derive(Debug, Clone)]
pub struct DemoOptions {
	/// Number of permits in the shared pool.
	pub capacity: usize,
	/// Number of worker threads started at once.
	pub workers: usize,
	/// How long each worker holds its permit.
	pub hold: Duration,
	/// Whether the entry point waits for every worker before exiting.
	pub join_workers: bool,
}

impl Default for DemoOptions {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_CAPACITY,
			workers: DEFAULT_WORKERS,
			hold: DEFAULT_HOLD,
			join_workers: true,
		}
	}
}

impl DemoOptions {
	/// Sets the number of permits in the shared pool
	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity;
		self
	}

	/// Sets the number of worker threads
	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers;
		self
	}

	/// Sets how long each worker holds its permit
	pub fn with_hold(mut self, hold: Duration) -> Self {
		self.hold = hold;
		self
	}

	/// Sets whether the entry point waits for the workers
	pub fn with_join_workers(mut self, join_workers: bool) -> Self {
		self.join_workers = join_workers;
		self
	}
}
