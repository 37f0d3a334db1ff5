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

//! Chunked ECS - archetype Entity Component System core
//!
//! Entities live in archetypes keyed by their exact component signature.
//! Each archetype stores its rows in fixed-capacity columnar chunks, kept
//! dense by archetype-wide swap-remove. Queries cache matching archetypes
//! and refresh lazily, structural changes can be deferred through command
//! buffers, and a two-phase scheduler drives systems frame by frame.

pub mod archetype;
pub mod chunk;
pub mod command;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod prelude;
#[cfg(feature = "profiling")]
pub mod profiling;
pub mod query;
pub mod schedule;
pub mod stats;
pub mod system;
pub mod time;
pub mod world;

pub use archetype::*;
pub use chunk::*;
pub use command::*;
pub use component::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use query::*;
pub use schedule::*;
pub use stats::*;
pub use system::*;
pub use time::*;
pub use world::*;
