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

//! Phased system scheduler and execution profiler

use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::error;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::error::{EcsError, Result};
use crate::system::{BoxedSystem, Phase, SystemId};
use crate::world::World;

/// Timing summary of one system
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStats {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
    pub call_count: u64,
}

#[derive(Debug, Clone, Copy)]
struct TimingAccumulator {
    min: Duration,
    max: Duration,
    total: Duration,
    calls: u64,
}

/// System profiler for collecting timing data
#[derive(Debug, Default)]
pub struct SystemProfiler {
    timings: FxHashMap<SystemId, TimingAccumulator>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_execution(&mut self, id: SystemId, duration: Duration) {
        self.timings
            .entry(id)
            .and_modify(|t| {
                t.min = t.min.min(duration);
                t.max = t.max.max(duration);
                t.total += duration;
                t.calls += 1;
            })
            .or_insert(TimingAccumulator {
                min: duration,
                max: duration,
                total: duration,
                calls: 1,
            });
    }

    pub fn get_stats(&self, id: SystemId) -> Option<SystemStats> {
        let timing = self.timings.get(&id)?;
        Some(SystemStats {
            min: timing.min,
            max: timing.max,
            avg: timing.total / timing.calls.max(1) as u32,
            call_count: timing.calls,
        })
    }

    pub fn clear(&mut self) {
        self.timings.clear();
    }
}

/// Per-system timing data for a single frame
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub id: SystemId,
    pub name: &'static str,
    pub phase: Phase,
    pub duration: Duration,
}

/// Execution profile for a frame
#[derive(Debug, Clone)]
pub struct ExecutionProfile {
    pub frame: u64,
    pub total_frame_time: Duration,
    pub system_timings: Vec<SystemTiming>,
}

struct SystemEntry {
    id: SystemId,
    system: BoxedSystem,
}

/// Runs systems phase by phase, flushing deferred commands between phases
///
/// Within a phase systems run in registration order and share one command
/// buffer, which is submitted to the world and flushed when the phase ends.
#[derive(Default)]
pub struct Scheduler {
    phases: [Vec<SystemEntry>; 2],
    profiler: SystemProfiler,
    last_profile: Option<ExecutionProfile>,
    frame_count: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_system(&mut self, id: SystemId, system: BoxedSystem) {
        let phase = system.phase();
        self.phases[phase.index()].push(SystemEntry { id, system });
    }

    pub fn system_count(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    /// System names of one phase in run order
    pub fn system_names(&self, phase: Phase) -> Vec<&'static str> {
        self.phases[phase.index()]
            .iter()
            .map(|entry| entry.system.name())
            .collect()
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.phases
            .iter()
            .flatten()
            .any(|entry| entry.id == id)
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn last_profile(&self) -> Option<&ExecutionProfile> {
        self.last_profile.as_ref()
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Execute one frame
    ///
    /// A failing system is logged and the frame continues; the first
    /// failure (or flush error) is returned at the end.
    pub(crate) fn run_frame(&mut self, world: &mut World) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("schedule.frame", frame = self.frame_count);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let frame_start = Instant::now();
        let mut system_timings = Vec::with_capacity(self.system_count());
        let mut first_error = None;

        for phase in Phase::ALL {
            #[cfg(feature = "profiling")]
            let phase_span = info_span!("schedule.phase", phase = phase.name());
            #[cfg(feature = "profiling")]
            let _phase_guard = phase_span.enter();

            let mut commands = world.command_buffer();
            for entry in &mut self.phases[phase.index()] {
                let name = entry.system.name();

                #[cfg(feature = "profiling")]
                let system_span = info_span!("schedule.system", system = name);
                #[cfg(feature = "profiling")]
                let _system_guard = system_span.enter();

                let start = Instant::now();
                let result = entry.system.on_update(world, &mut commands);
                let duration = start.elapsed();

                self.profiler.record_execution(entry.id, duration);
                system_timings.push(SystemTiming {
                    id: entry.id,
                    name,
                    phase,
                    duration,
                });

                if let Err(err) = result {
                    error!(system = name, phase = phase.name(), error = %err, "system failed");
                    first_error.get_or_insert(EcsError::SystemFailed {
                        system: name,
                        reason: err.to_string(),
                    });
                }
            }

            // The phase buffer and the world queue share one sequence, so
            // the flush interleaves them in recording order
            let flushed = world.submit(commands).and_then(|()| world.flush_deferred());
            if let Err(err) = flushed {
                error!(phase = phase.name(), error = %err, "phase flush failed");
                first_error.get_or_insert(err);
            }
        }

        self.frame_count += 1;
        self.last_profile = Some(ExecutionProfile {
            frame: self.frame_count,
            total_frame_time: frame_start.elapsed(),
            system_timings,
        });

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Append every system of `other`, keeping its registration order
    pub(crate) fn absorb(&mut self, other: Scheduler) {
        for (phase, systems) in other.phases.into_iter().enumerate() {
            self.phases[phase].extend(systems);
        }
    }

    /// Run `on_destroy` for every system in phase order and drop them
    pub(crate) fn destroy_all(&mut self, world: &mut World) {
        for systems in &mut self.phases {
            for entry in systems.iter_mut() {
                entry.system.on_destroy(world);
            }
            systems.clear();
        }
        self.profiler.clear();
        self.last_profile = None;
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("logic", &self.system_names(Phase::Logic))
            .field("sync", &self.system_names(Phase::Sync))
            .field("frame_count", &self.frame_count)
            .finish()
    }
}
