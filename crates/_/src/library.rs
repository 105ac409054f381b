use anput::{
    component::Component,
    commands::Command,
    database::WorldDestroyIteratorExt,
    world::World,
};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Name a stored asset or a pending load operation is keyed by.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetName(pub String);

impl AssetName {
    pub fn new(name: impl ToString) -> Self {
        Self(name.to_string())
    }
}

/// Raw payload stored for resources no parser claimed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetBlob(pub Vec<u8>);

/// Named store of typed assets produced by parsers.
///
/// Backed by an ECS world: every named asset is an entity carrying the typed
/// components its parser produced. The loader consults it for cache
/// short-circuiting and stores unparsed payloads as [`AssetBlob`]s; parsers
/// store whatever typed data they decode.
#[derive(Default)]
pub struct AssetLibrary {
    storage: World,
}

impl AssetLibrary {
    /// Stores a typed asset under a name, reusing the entry if the name is
    /// already tracked.
    pub fn store<T: Component>(
        &mut self,
        name: impl AsRef<str>,
        asset: T,
    ) -> Result<(), Box<dyn Error>> {
        let name = name.as_ref();
        let entity = match self.storage.find_by::<true, _>(&AssetName::new(name)) {
            Some(entity) => entity,
            None => self.storage.spawn((AssetName::new(name),))?,
        };
        // anput's insert is a no-op for components the entity already has,
        // so drop the previous value of this kind before storing the new one.
        self.storage.remove::<(T,)>(entity)?;
        self.storage.insert(entity, (asset,))?;
        Ok(())
    }

    /// Stores raw bytes under a name.
    pub fn store_blob(
        &mut self,
        name: impl AsRef<str>,
        bytes: Vec<u8>,
    ) -> Result<(), Box<dyn Error>> {
        self.store(name, AssetBlob(bytes))
    }

    /// Gets a typed asset stored under a name.
    pub fn get<T: Component>(&self, name: impl AsRef<str>) -> Option<&T> {
        let entity = self
            .storage
            .find_by::<true, _>(&AssetName::new(name.as_ref()))?;
        self.storage.lookup_access::<true, &T>().access(entity)
    }

    /// Gets the raw bytes stored under a name.
    pub fn blob(&self, name: impl AsRef<str>) -> Option<&[u8]> {
        self.get::<AssetBlob>(name).map(|blob| blob.0.as_slice())
    }

    /// Tells if a typed asset of the given kind is stored under a name.
    pub fn contains<T: Component>(&self, name: impl AsRef<str>) -> bool {
        self.storage
            .find_by::<true, _>(&AssetName::new(name.as_ref()))
            .map(|entity| self.storage.has_entity_component::<T>(entity))
            .unwrap_or_default()
    }

    /// Tells if any asset, of whatever kind, is stored under a name.
    pub fn contains_any(&self, name: impl AsRef<str>) -> bool {
        self.storage
            .find_by::<true, _>(&AssetName::new(name.as_ref()))
            .is_some()
    }

    /// Removes whatever is stored under a name.
    pub fn unload(&mut self, name: impl AsRef<str>) {
        if let Some(entity) = self
            .storage
            .find_by::<true, _>(&AssetName::new(name.as_ref()))
        {
            std::iter::once(entity)
                .to_despawn_command()
                .execute(&mut self.storage);
        }
    }

    /// Returns an iterator over the names of all stored assets.
    pub fn assets(&self) -> impl Iterator<Item = &str> + '_ {
        self.storage
            .query::<true, (anput::entity::Entity, &AssetName)>()
            .map(|(_, name)| name.0.as_str())
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.assets().count()
    }

    /// Tells if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
