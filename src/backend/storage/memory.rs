/**
 * In-Memory Blob Storage
 *
 * Map-backed `Storage` implementation with the same path discipline as the
 * disk store. Used by tests that do not care about durability.
 */

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::Storage;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_object(&self, content: &[u8]) -> io::Result<String> {
        let path = Uuid::new_v4().to_string().replace('-', "/");
        self.objects
            .lock()
            .unwrap()
            .insert(path.clone(), content.to_vec());
        Ok(path)
    }

    async fn write_object(&self, path: &str, content: &[u8]) -> io::Result<()> {
        let mut objects = self.objects.lock().unwrap();
        match objects.get_mut(path) {
            Some(existing) => {
                *existing = content.to_vec();
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no object at {path}"),
            )),
        }
    }

    async fn read_object(&self, path: &str) -> io::Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no object at {path}")))
    }

    async fn delete_object(&self, path: &str) -> io::Result<()> {
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }
}
