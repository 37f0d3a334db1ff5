// Copyright 2024 Saptak Santra
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

//! Tracing setup for profiling builds
//!
//! The crate emits `tracing` events unconditionally and, with the
//! `profiling` feature, spans around entity creation, flushes, query
//! refreshes, frames and phases. [`init_tracing`] installs a subscriber
//! that prints them:
//!
//! ```ignore
//! use chunked_ecs::profiling::{init_tracing, LogFormat, LogTarget};
//!
//! // Keep the guard alive for as long as logs should be written
//! let _guard = init_tracing(LogFormat::Json, LogTarget::Stdout)?;
//! ```
//!
//! Filtering follows `RUST_LOG` (e.g. `RUST_LOG=chunked_ecs=debug`) and
//! defaults to `info`.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{EcsError, Result};

/// Output encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Output destination
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    #[default]
    Stdout,
    /// Single, non-rotating log file
    File { directory: PathBuf, file_name: String },
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set. Logs are written from a
/// background worker that stops when the returned guard is dropped.
pub fn init_tracing(format: LogFormat, target: LogTarget) -> Result<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let (writer, guard) = match target {
        LogTarget::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogTarget::File {
            directory,
            file_name,
        } => tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Text => registry.with(fmt::layer().with_writer(writer)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };
    installed.map_err(|err| EcsError::InvalidConfig(format!("tracing subscriber: {err}")))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let first = init_tracing(LogFormat::Json, LogTarget::Stdout);
        let second = init_tracing(LogFormat::Text, LogTarget::Stdout);
        // Another test may already have installed a subscriber; either way
        // two installs never both succeed.
        assert!(first.is_err() || second.is_err());
    }
}
