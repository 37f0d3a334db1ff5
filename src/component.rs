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

//! Component registry, signatures and bundles
//!
//! Components are fixed-size plain-old-data values. Every component type is
//! registered once in a process-wide table and receives a stable
//! [`ComponentId`]; archetypes, chunks and queries only ever talk in ids.

use std::any::{type_name, TypeId};
use std::sync::{Arc, OnceLock};

use ahash::AHashMap;
use bytemuck::Pod;
use parking_lot::RwLock;
use smallvec::SmallVec;

/// Largest component accepted by the registry, in bytes
pub const MAX_COMPONENT_SIZE: usize = 4096;

/// Strictest alignment a chunk column can honour
pub const MAX_COMPONENT_ALIGN: usize = 16;

/// Number of component ids stored inline before a signature spills to the heap
pub const SIGNATURE_INLINE: usize = 8;

/// Marker trait for components
///
/// Components must be plain old data (`bytemuck::Pod`): bitwise copyable,
/// no drop glue, no padding. `Default` supplies the value written when an
/// entity is created from a bare signature.
///
/// The layout limits are enforced when a type is first registered: a
/// zero-sized, oversized or over-aligned type fails to compile.
pub trait Component: Pod + Default + Send + Sync {
    #[doc(hidden)]
    const LAYOUT_CHECK: () = {
        assert!(
            std::mem::size_of::<Self>() > 0,
            "zero-sized types cannot be stored as components"
        );
        assert!(
            std::mem::size_of::<Self>() <= MAX_COMPONENT_SIZE,
            "component type exceeds MAX_COMPONENT_SIZE"
        );
        assert!(
            std::mem::align_of::<Self>() <= MAX_COMPONENT_ALIGN,
            "component alignment exceeds MAX_COMPONENT_ALIGN"
        );
    };
}

/// Automatically implement Component for all valid types
impl<T: Pod + Default + Send + Sync> Component for T {}

/// Stable, process-wide component type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registered metadata for one component type
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub type_id: TypeId,
    pub name: &'static str,
    pub size: usize,
    pub align: usize,
    default_value: Arc<[u8]>,
}

impl ComponentInfo {
    /// Bytes of `T::default()`
    pub fn default_bytes(&self) -> &[u8] {
        &self.default_value
    }
}

#[derive(Default)]
struct RegistryTable {
    by_type: AHashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
}

fn table() -> &'static RwLock<RegistryTable> {
    static TABLE: OnceLock<RwLock<RegistryTable>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(RegistryTable::default()))
}

/// Process-wide component type registry
pub struct ComponentRegistry;

impl ComponentRegistry {
    /// Register `T` (idempotent) and return its id
    pub fn register<T: Component>() -> ComponentId {
        #[allow(clippy::let_unit_value)]
        let () = T::LAYOUT_CHECK;

        let type_id = TypeId::of::<T>();
        if let Some(&id) = table().read().by_type.get(&type_id) {
            return id;
        }

        let mut table = table().write();
        // Another thread may have won the race between the two locks
        if let Some(&id) = table.by_type.get(&type_id) {
            return id;
        }

        let id = ComponentId(table.infos.len() as u32);
        let default = T::default();
        table.infos.push(ComponentInfo {
            id,
            type_id,
            name: type_name::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            default_value: Arc::from(bytemuck::bytes_of(&default)),
        });
        table.by_type.insert(type_id, id);

        tracing::debug!(component = type_name::<T>(), id = id.0, "registered component");
        id
    }

    /// Look up `T` without registering it
    pub fn id_of<T: 'static>() -> Option<ComponentId> {
        table().read().by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Full metadata for a registered id
    pub fn info(id: ComponentId) -> Option<ComponentInfo> {
        table().read().infos.get(id.index()).cloned()
    }

    pub fn size_of(id: ComponentId) -> Option<usize> {
        table().read().infos.get(id.index()).map(|info| info.size)
    }

    pub fn align_of(id: ComponentId) -> Option<usize> {
        table().read().infos.get(id.index()).map(|info| info.align)
    }

    pub fn name_of(id: ComponentId) -> Option<&'static str> {
        table().read().infos.get(id.index()).map(|info| info.name)
    }

    /// Number of registered component types
    pub fn count() -> usize {
        table().read().infos.len()
    }
}

/// Archetype signature: sorted, de-duplicated set of component ids
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature(SmallVec<[ComponentId; SIGNATURE_INLINE]>);

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add component `T`, registering it if needed
    pub fn with<T: Component>(mut self) -> Self {
        self.insert(ComponentRegistry::register::<T>());
        self
    }

    /// Builder: add an already-registered id
    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.insert(id);
        self
    }

    /// Insert an id, keeping the set ordered. Returns false if already present.
    pub fn insert(&mut self, id: ComponentId) -> bool {
        match self.0.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, id);
                true
            }
        }
    }

    /// Remove an id. Returns false if it was absent.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        match self.0.binary_search(&id) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// True if every id of `other` is in `self`
    pub fn contains_all(&self, other: &Signature) -> bool {
        other.iter().all(|id| self.contains(id))
    }

    /// True if the two sets share at least one id
    pub fn intersects(&self, other: &Signature) -> bool {
        other.iter().any(|id| self.contains(id))
    }

    /// Column position of `id` inside an archetype with this signature
    pub fn position(&self, id: ComponentId) -> Option<usize> {
        self.0.binary_search(&id).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[ComponentId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut signature = Signature::new();
        for id in iter {
            signature.insert(id);
        }
        signature
    }
}

#[derive(Debug, Clone, Copy)]
struct ValueEntry {
    component: ComponentId,
    offset: usize,
    len: usize,
}

/// Component values keyed by id, stored as raw bytes
///
/// This is the runtime payload behind entity creation and archetype
/// transitions. Typed access goes through `with`/`set`/`get`.
#[derive(Debug, Clone, Default)]
pub struct ComponentValues {
    entries: SmallVec<[ValueEntry; SIGNATURE_INLINE]>,
    bytes: Vec<u8>,
}

impl ComponentValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the values of a bundle
    pub fn from_bundle<B: Bundle>(bundle: B) -> Self {
        let mut values = Self::new();
        bundle.write_values(&mut values);
        values
    }

    /// Builder: set `T`
    pub fn with<T: Component>(mut self, value: T) -> Self {
        self.set(value);
        self
    }

    /// Set (or overwrite) the value for `T`
    pub fn set<T: Component>(&mut self, value: T) {
        let id = ComponentRegistry::register::<T>();
        self.set_raw(id, bytemuck::bytes_of(&value));
    }

    /// Set (or overwrite) the raw bytes for a component id
    pub fn set_raw(&mut self, component: ComponentId, bytes: &[u8]) {
        match self
            .entries
            .binary_search_by_key(&component, |entry| entry.component)
        {
            Ok(pos) => {
                let entry = self.entries[pos];
                if entry.len == bytes.len() {
                    self.bytes[entry.offset..entry.offset + entry.len].copy_from_slice(bytes);
                } else {
                    let offset = self.bytes.len();
                    self.bytes.extend_from_slice(bytes);
                    self.entries[pos] = ValueEntry {
                        component,
                        offset,
                        len: bytes.len(),
                    };
                }
            }
            Err(pos) => {
                let offset = self.bytes.len();
                self.bytes.extend_from_slice(bytes);
                self.entries.insert(
                    pos,
                    ValueEntry {
                        component,
                        offset,
                        len: bytes.len(),
                    },
                );
            }
        }
    }

    /// Raw bytes for a component id
    pub fn get_raw(&self, component: ComponentId) -> Option<&[u8]> {
        let pos = self
            .entries
            .binary_search_by_key(&component, |entry| entry.component)
            .ok()?;
        let entry = self.entries[pos];
        Some(&self.bytes[entry.offset..entry.offset + entry.len])
    }

    /// Typed copy of the value for `T`
    pub fn get<T: Component>(&self) -> Option<T> {
        let bytes = self.get_raw(ComponentRegistry::id_of::<T>()?)?;
        (bytes.len() == std::mem::size_of::<T>()).then(|| bytemuck::pod_read_unaligned(bytes))
    }

    /// Drop the value for a component id. Returns false if it was absent.
    pub fn remove(&mut self, component: ComponentId) -> bool {
        match self
            .entries
            .binary_search_by_key(&component, |entry| entry.component)
        {
            Ok(pos) => {
                self.entries.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, component: ComponentId) -> bool {
        self.entries
            .binary_search_by_key(&component, |entry| entry.component)
            .is_ok()
    }

    /// Signature made of every id that has a value
    pub fn signature(&self) -> Signature {
        Signature(self.entries.iter().map(|entry| entry.component).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Bundle of components
///
/// Compile-time convenience over [`ComponentValues`] for spawning entities
/// from a tuple of components.
pub trait Bundle: Send + 'static {
    /// Signature of the bundle
    fn signature() -> Signature
    where
        Self: Sized;

    /// Write every component of the bundle into `values`
    fn write_values(self, values: &mut ComponentValues);
}

// Macro for tuple Bundle implementations
macro_rules! impl_bundle {
    ($($T:ident),*) => {
        impl<$($T: Component),*> Bundle for ($($T,)*) {
            fn signature() -> Signature {
                let mut signature = Signature::new();
                $(signature.insert(ComponentRegistry::register::<$T>());)*
                signature
            }

            #[allow(non_snake_case)]
            fn write_values(self, values: &mut ComponentValues) {
                let ($($T,)*) = self;
                $(values.set($T);)*
            }
        }
    };
}

// Implement for tuples of 1-8 components
impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Health(u32);

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Mass(f64);

    impl Default for Mass {
        fn default() -> Self {
            Mass(1.5)
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let a = ComponentRegistry::register::<Health>();
        let b = ComponentRegistry::register::<Health>();
        assert_eq!(a, b);
        assert_eq!(ComponentRegistry::id_of::<Health>(), Some(a));
        assert_eq!(ComponentRegistry::size_of(a), Some(4));
        assert_eq!(ComponentRegistry::align_of(a), Some(4));
    }

    #[test]
    fn test_default_bytes_are_recorded() {
        let id = ComponentRegistry::register::<Mass>();
        let info = ComponentRegistry::info(id).unwrap();
        assert_eq!(info.default_bytes(), bytemuck::bytes_of(&Mass(1.5)));
        assert!(info.name.ends_with("Mass"));
    }

    #[test]
    fn test_signature_is_sorted_and_deduplicated() {
        let health = ComponentRegistry::register::<Health>();
        let mass = ComponentRegistry::register::<Mass>();

        let a = Signature::new().with::<Mass>().with::<Health>().with::<Mass>();
        let b: Signature = [health, mass, health].into_iter().collect();

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.as_slice().windows(2).all(|w| w[0] < w[1]));
        assert!(a.contains_all(&Signature::new().with_id(mass)));
    }

    #[test]
    fn test_component_values_overwrite() {
        let mut values = ComponentValues::new().with(Health(3));
        values.set(Health(9));
        values.set(Mass(2.0));

        assert_eq!(values.len(), 2);
        assert_eq!(values.get::<Health>(), Some(Health(9)));
        assert_eq!(values.get::<Mass>(), Some(Mass(2.0)));
        assert_eq!(values.signature(), <(Health, Mass)>::signature());
    }

    #[test]
    fn test_bundle_values() {
        let values = ComponentValues::from_bundle((Health(1), Mass(4.0)));
        assert_eq!(values.get::<Health>(), Some(Health(1)));
        assert!(values.contains(ComponentRegistry::register::<Mass>()));
    }
}
