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

use permitpool::{DemoOptions, StdoutSink};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
	// Diagnostics go to stderr, leaving stdout for the status lines
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();
	// Run the reference configuration
	let opts = DemoOptions::default();
	let demo = match permitpool::spawn(&opts, Arc::new(StdoutSink)) {
		Ok(demo) => demo,
		Err(e) => {
			tracing::error!("Failed to start workers: {e}");
			return;
		}
	};
	// Wait for the workers unless asked to abandon them
	if opts.join_workers {
		if let Err(e) = demo.join() {
			tracing::error!("{e}");
		}
	} else {
		demo.detach();
	}
}
