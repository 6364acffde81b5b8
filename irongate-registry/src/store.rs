//! Persistent storage of service descriptors and events.
//!
//! The manager calls the store while holding its registry write lock, so
//! store calls are totally ordered with respect to registry mutations.

use crate::descriptor::{ServiceDescriptor, ServiceIdentity};
use crate::error::StoreError;
use crate::events::ServiceEvent;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage backend for service descriptors and the event journal.
pub trait ServiceStore: Send + Sync {
    /// Stores a new descriptor.
    fn add_service_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<(), StoreError>;

    /// Deletes the descriptor stored under `identity`.
    fn remove_service_descriptor(&self, identity: &ServiceIdentity) -> Result<(), StoreError>;

    /// Replaces the descriptor stored under `identity`; the new descriptor may
    /// carry a different identity.
    fn update_service_descriptor(
        &self,
        identity: &ServiceIdentity,
        descriptor: &ServiceDescriptor,
    ) -> Result<(), StoreError>;

    /// Returns every stored descriptor.
    fn list_service_descriptors(&self) -> Result<Vec<ServiceDescriptor>, StoreError>;

    /// Appends an event to the journal.
    fn append_service_event(&self, event: &ServiceEvent) -> Result<(), StoreError>;
}

type Descriptors = BTreeMap<ServiceIdentity, ServiceDescriptor>;

fn insert(descriptors: &mut Descriptors, descriptor: &ServiceDescriptor) -> Result<(), StoreError> {
    let identity = descriptor.identity();
    if descriptors.contains_key(&identity) {
        return Err(StoreError::AlreadyExists { identity });
    }
    descriptors.insert(identity, descriptor.clone());
    Ok(())
}

fn remove(descriptors: &mut Descriptors, identity: &ServiceIdentity) -> Result<ServiceDescriptor, StoreError> {
    descriptors.remove(identity).ok_or_else(|| StoreError::NotFound {
        identity: identity.clone(),
    })
}

fn replace(
    descriptors: &mut Descriptors,
    identity: &ServiceIdentity,
    descriptor: &ServiceDescriptor,
) -> Result<(), StoreError> {
    let previous = remove(descriptors, identity)?;
    if let Err(err) = insert(descriptors, descriptor) {
        descriptors.insert(identity.clone(), previous);
        return Err(err);
    }
    Ok(())
}

/// Volatile store, the default.
#[derive(Debug, Default)]
pub struct InMemoryServiceStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    descriptors: Descriptors,
    events: Vec<ServiceEvent>,
}

impl InMemoryServiceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `descriptors`.
    ///
    /// # Errors
    /// Returns [`StoreError::AlreadyExists`] on duplicate identities.
    pub fn with_descriptors(
        descriptors: impl IntoIterator<Item = ServiceDescriptor>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for descriptor in descriptors {
            store.add_service_descriptor(&descriptor)?;
        }
        Ok(store)
    }

    /// Returns a copy of the event journal.
    #[must_use]
    pub fn events(&self) -> Vec<ServiceEvent> {
        self.inner.lock().events.clone()
    }
}

impl ServiceStore for InMemoryServiceStore {
    fn add_service_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<(), StoreError> {
        insert(&mut self.inner.lock().descriptors, descriptor)
    }

    fn remove_service_descriptor(&self, identity: &ServiceIdentity) -> Result<(), StoreError> {
        remove(&mut self.inner.lock().descriptors, identity).map(drop)
    }

    fn update_service_descriptor(
        &self,
        identity: &ServiceIdentity,
        descriptor: &ServiceDescriptor,
    ) -> Result<(), StoreError> {
        replace(&mut self.inner.lock().descriptors, identity, descriptor)
    }

    fn list_service_descriptors(&self) -> Result<Vec<ServiceDescriptor>, StoreError> {
        Ok(self.inner.lock().descriptors.values().cloned().collect())
    }

    fn append_service_event(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        self.inner.lock().events.push(event.clone());
        Ok(())
    }
}

/// JSON files in a directory.
///
/// Descriptors live in `services.json`, rewritten through a temporary file
/// and a rename. Events are appended to `events.jsonl`, one JSON object per
/// line.
#[derive(Debug)]
pub struct FileServiceStore {
    dir: PathBuf,
    descriptors: Mutex<Descriptors>,
}

const SERVICES_FILE: &str = "services.json";
const EVENTS_FILE: &str = "events.jsonl";

impl FileServiceStore {
    /// Opens (creating if needed) a store in `dir`.
    ///
    /// # Errors
    /// Returns an I/O or parse error if the directory or an existing
    /// `services.json` cannot be read.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(SERVICES_FILE);
        let mut descriptors = Descriptors::new();
        if path.exists() {
            let list: Vec<ServiceDescriptor> = serde_json::from_slice(&fs::read(&path)?)?;
            for descriptor in &list {
                insert(&mut descriptors, descriptor)?;
            }
        }
        tracing::debug!(dir = %dir.display(), services = descriptors.len(), "opened service store");
        Ok(Self {
            dir,
            descriptors: Mutex::new(descriptors),
        })
    }

    /// Directory holding the store files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the event journal back.
    ///
    /// # Errors
    /// Returns an I/O or parse error.
    pub fn read_events(&self) -> Result<Vec<ServiceEvent>, StoreError> {
        let path = self.dir.join(EVENTS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    /// Applies `change` to a copy and persists it; memory is only updated
    /// once the file has been written.
    fn mutate(
        &self,
        change: impl FnOnce(&mut Descriptors) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut descriptors = self.descriptors.lock();
        let mut next = descriptors.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *descriptors = next;
        Ok(())
    }

    fn persist(&self, descriptors: &Descriptors) -> Result<(), StoreError> {
        let list: Vec<&ServiceDescriptor> = descriptors.values().collect();
        let json = serde_json::to_vec_pretty(&list)?;
        let tmp = self.dir.join(format!("{SERVICES_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.dir.join(SERVICES_FILE))?;
        Ok(())
    }
}

impl ServiceStore for FileServiceStore {
    fn add_service_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<(), StoreError> {
        self.mutate(|d| insert(d, descriptor))
    }

    fn remove_service_descriptor(&self, identity: &ServiceIdentity) -> Result<(), StoreError> {
        self.mutate(|d| remove(d, identity).map(drop))
    }

    fn update_service_descriptor(
        &self,
        identity: &ServiceIdentity,
        descriptor: &ServiceDescriptor,
    ) -> Result<(), StoreError> {
        self.mutate(|d| replace(d, identity, descriptor))
    }

    fn list_service_descriptors(&self) -> Result<Vec<ServiceDescriptor>, StoreError> {
        Ok(self.descriptors.lock().values().cloned().collect())
    }

    fn append_service_event(&self, event: &ServiceEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(EVENTS_FILE))?;
        file.write_all(&line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLevel;

    fn descriptor(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, "NTG_CLIENT").setting("port", "9000")
    }

    #[test]
    fn test_memory_store_crud() {
        let store = InMemoryServiceStore::new();
        store.add_service_descriptor(&descriptor("a")).unwrap();
        assert!(matches!(
            store.add_service_descriptor(&descriptor("a")),
            Err(StoreError::AlreadyExists { .. })
        ));

        let moved = descriptor("a").environment("uat");
        store
            .update_service_descriptor(&ServiceIdentity::in_default("a"), &moved)
            .unwrap();
        assert_eq!(store.list_service_descriptors().unwrap(), vec![moved.clone()]);

        assert!(matches!(
            store.remove_service_descriptor(&ServiceIdentity::in_default("a")),
            Err(StoreError::NotFound { .. })
        ));
        store.remove_service_descriptor(&moved.identity()).unwrap();
        assert!(store.list_service_descriptors().unwrap().is_empty());
    }

    #[test]
    fn test_update_onto_existing_identity_keeps_original() {
        let store = InMemoryServiceStore::with_descriptors([descriptor("a"), descriptor("b")]).unwrap();
        let clash = descriptor("b");
        assert!(
            store
                .update_service_descriptor(&ServiceIdentity::in_default("a"), &clash)
                .is_err()
        );
        assert_eq!(store.list_service_descriptors().unwrap().len(), 2);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileServiceStore::open(dir.path()).unwrap();
            store.add_service_descriptor(&descriptor("a")).unwrap();
            store.add_service_descriptor(&descriptor("b")).unwrap();
            store
                .remove_service_descriptor(&ServiceIdentity::in_default("a"))
                .unwrap();
            store
                .append_service_event(&ServiceEvent::new(
                    ServiceIdentity::in_default("b"),
                    EventLevel::Info,
                    None,
                    "added",
                ))
                .unwrap();
        }

        let store = FileServiceStore::open(dir.path()).unwrap();
        let names: Vec<_> = store
            .list_service_descriptors()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["b"]);
        let events = store.read_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "added");
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SERVICES_FILE), b"not json").unwrap();
        assert!(matches!(
            FileServiceStore::open(dir.path()),
            Err(StoreError::Serialization(_))
        ));
    }
}
