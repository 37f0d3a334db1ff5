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

//! Frame clock
//!
//! The world advances its [`Time`] once per [`World::update`] before any
//! system runs, so every system of a frame sees the same delta.
//!
//! [`World::update`]: crate::world::World::update

use std::time::Duration;

/// Frame timing state
#[derive(Clone, Debug)]
pub struct Time {
    /// Scaled seconds covered by the current frame
    delta: f32,
    /// Unscaled seconds requested for the current frame
    raw_delta: f32,
    /// Total scaled seconds since the world was created
    elapsed: f64,
    frame_count: u64,
    /// Time scale multiplier (1.0 = normal speed)
    time_scale: f32,
}

impl Time {
    pub fn new() -> Self {
        Self {
            delta: 0.0,
            raw_delta: 0.0,
            elapsed: 0.0,
            frame_count: 0,
            time_scale: 1.0,
        }
    }

    /// Start a new frame covering `delta` seconds
    ///
    /// Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, delta: f32) {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.raw_delta = delta;
        self.delta = delta * self.time_scale;
        self.elapsed += f64::from(self.delta);
        self.frame_count += 1;
    }

    /// Scaled delta in seconds
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Scaled delta as a duration
    pub fn delta_duration(&self) -> Duration {
        Duration::from_secs_f32(self.delta)
    }

    /// Delta before time scaling
    pub fn raw_delta(&self) -> f32 {
        self.raw_delta
    }

    /// Get total elapsed time in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Get current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Set time scale (1.0 = normal, 0.5 = half speed, 2.0 = double speed)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Pause time (set scale to 0)
    pub fn pause(&mut self) {
        self.time_scale = 0.0;
    }

    /// Resume time (set scale to 1)
    pub fn resume(&mut self) {
        self.time_scale = 1.0;
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
