use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    sync::Arc,
};

use keel_config::ConfigValue;

use crate::{
    errors::LookupError,
    types::{Injectable, Resolved, TypeInfo},
};

/// Resolved arguments handed to constructors and lifecycle callbacks
#[derive(Default)]
pub struct Args {
    components: HashMap<TypeId, Resolved>,
    settings: HashMap<String, Resolved>,
}

impl Args {
    pub(crate) fn insert_component(&mut self, key: TypeInfo, value: Resolved) {
        self.components.insert(key.type_id, value);
    }

    pub(crate) fn insert_setting(&mut self, name: &str, value: Resolved) {
        self.settings.insert(name.to_string(), value);
    }

    /// The component resolved for key `K`
    pub fn component<K: ?Sized + Injectable>(&self) -> Result<Arc<K>, LookupError> {
        let resolved = self
            .components
            .get(&TypeId::of::<K>())
            .ok_or(LookupError::NotFound(type_name::<K>()))?;

        resolved.get::<K>().ok_or(LookupError::DowncastFailed {
            required_type: type_name::<K>(),
            actual_type: resolved.info().type_name,
        })
    }

    /// The component resolved for key `K`, `None` if it was optional and is not bound
    pub fn optional<K: ?Sized + Injectable>(&self) -> Option<Arc<K>> {
        self.component::<K>().ok()
    }

    /// The resolved value of the config parameter `name`
    pub fn setting<V: ConfigValue>(&self, name: &str) -> Result<V, LookupError> {
        let resolved = self
            .settings
            .get(name)
            .ok_or_else(|| LookupError::SettingMissing(name.to_string()))?;

        resolved.value::<V>().ok_or(LookupError::DowncastFailed {
            required_type: type_name::<V>(),
            actual_type: resolved.info().type_name,
        })
    }
}
