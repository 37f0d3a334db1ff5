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

//! Error types

use std::fmt;

use crate::archetype::ArchetypeId;
use crate::entity::Entity;

/// ECS error type
#[derive(Debug, Clone, PartialEq)]
pub enum EcsError {
    /// Entity has no current location (destroyed or never created)
    EntityNotFound(Entity),

    /// Entity exists but its archetype does not store the component
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    /// Archetype id does not belong to this world
    ArchetypeNotFound(ArchetypeId),

    /// `flush_deferred` was called while a flush was already running
    ReentrantFlush,

    /// World configuration rejected at construction
    InvalidConfig(String),

    /// A system returned an error from one of its callbacks
    SystemFailed {
        system: &'static str,
        reason: String,
    },

    /// Command buffer error
    CommandError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound(entity) => write!(f, "Entity not found: {entity}"),
            EcsError::ComponentNotFound { entity, component } => {
                write!(f, "Component {component} not found on {entity}")
            }
            EcsError::ArchetypeNotFound(id) => write!(f, "Archetype not found: {}", id.index()),
            EcsError::ReentrantFlush => {
                write!(f, "Deferred commands are already being flushed")
            }
            EcsError::InvalidConfig(msg) => write!(f, "Invalid world config: {msg}"),
            EcsError::SystemFailed { system, reason } => {
                write!(f, "System {system} failed: {reason}")
            }
            EcsError::CommandError(msg) => write!(f, "Command error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::InvalidConfig(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_entity() {
        let err = EcsError::EntityNotFound(Entity::from_raw(7));
        assert_eq!(err.to_string(), "Entity not found: Entity(7)");
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let err: EcsError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }
}
