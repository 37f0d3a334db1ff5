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

//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```ignore
//! use chunked_ecs::prelude::*;
//! ```

pub use crate::archetype::{Archetype, ArchetypeId, ArchetypeMut};
pub use crate::chunk::{Chunk, ChunkMut};
pub use crate::command::CommandBuffer;
pub use crate::component::{Bundle, Component, ComponentRegistry, ComponentValues, Signature};
pub use crate::config::WorldConfig;
pub use crate::entity::{Entity, EntityLocation, ExternalRef};
pub use crate::error::{EcsError, Result};
pub use crate::query::{Query, QueryFetch};
pub use crate::stats::WorldStats;
pub use crate::system::{FnSystem, Phase, System, SystemId};
pub use crate::time::Time;
pub use crate::world::{FlushReport, World};
