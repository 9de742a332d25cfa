//! Module pools.
//!
//! A [`ModulePool`] is frozen and reference counted: every task derived
//! from one base task holds a clone of the same pool, so a slice module
//! inserted for one task is visible (though unused) from all of them.
//! Which modules actually run for a task is decided by its flow alone.
//! Mutation happens only on a [`PoolBuilder`] before freezing.

use crate::core::module::ModuleRef;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ModulePool {
    modules: Arc<BTreeMap<String, ModuleRef>>,
}

impl ModulePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRef> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleRef)> {
        self.modules.iter().map(|(name, module)| (name.as_str(), module))
    }

    /// True when both handles point at the same pool object.
    pub fn ptr_eq(&self, other: &ModulePool) -> bool {
        Arc::ptr_eq(&self.modules, &other.modules)
    }

    /// Start a new builder seeded with this pool's entries.
    ///
    /// Entries are shared handles; the pool itself is left untouched.
    pub fn to_builder(&self) -> PoolBuilder {
        PoolBuilder {
            modules: (*self.modules).clone(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, ModuleRef)> for ModulePool {
    fn from_iter<I: IntoIterator<Item = (S, ModuleRef)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PoolBuilder::new(), |mut builder, (name, module)| {
                builder.insert(name, module);
                builder
            })
            .freeze()
    }
}

impl std::fmt::Debug for ModulePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.modules.iter().map(|(name, module)| (name, module.kind())))
            .finish()
    }
}

/// Mutable staging area for a pool under construction.
#[derive(Default)]
pub struct PoolBuilder {
    modules: BTreeMap<String, ModuleRef>,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module, returning the entry it replaced (last write wins).
    pub fn insert(&mut self, name: impl Into<String>, module: ModuleRef) -> Option<ModuleRef> {
        self.modules.insert(name.into(), module)
    }

    pub fn remove(&mut self, name: &str) -> Option<ModuleRef> {
        self.modules.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRef> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn freeze(self) -> ModulePool {
        ModulePool {
            modules: Arc::new(self.modules),
        }
    }
}
