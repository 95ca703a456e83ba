use std::collections::{hash_map, HashMap};

use crate::usb::DeviceId;

/// Set of live device instances keyed by their USB identity
#[derive(Debug)]
pub struct Registry<T> {
    devices: HashMap<DeviceId, T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Add the given instance. Returns the instance back if one with the
    /// same identity is already live.
    pub fn insert(&mut self, id: DeviceId, device: T) -> Result<(), T> {
        match self.devices.entry(id) {
            hash_map::Entry::Occupied(_) => Err(device),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(device);
                Ok(())
            }
        }
    }

    pub fn find(&self, id: &DeviceId) -> Option<&T> {
        self.devices.get(id)
    }

    pub fn find_mut(&mut self, id: &DeviceId) -> Option<&mut T> {
        self.devices.get_mut(id)
    }

    /// Remove the instance with the given identity from the live set
    pub fn remove(&mut self, id: &DeviceId) -> Option<T> {
        self.devices.remove(id)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.find(id).is_some()
    }

    /// Returns a sorted snapshot of all live identities
    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Remove and return every instance
    pub fn drain(&mut self) -> Vec<(DeviceId, T)> {
        let mut devices: Vec<(DeviceId, T)> = self.devices.drain().collect();
        devices.sort_by_key(|(id, _)| *id);
        devices
    }
}
