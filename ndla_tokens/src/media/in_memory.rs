//! An in-memory store medium

use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use async_trait::async_trait;

use super::AsyncStoreMedium;

/// A token store medium held in memory
///
/// Clones share the same contents, so a clone can be kept to inspect what a
/// [`CredentialCache`](crate::CredentialCache) wrote.
#[derive(Clone, Default, Debug)]
pub struct InMemoryStoreMedium {
    contents: Arc<Mutex<Option<String>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStoreMedium {
    /// Constructs a new, empty medium
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a medium that already holds `contents`
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.into()))),
            writes: Arc::default(),
        }
    }

    /// The current contents, if anything has been stored
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The number of writes performed so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }
}

#[async_trait]
impl AsyncStoreMedium for InMemoryStoreMedium {
    async fn read_to_string(&mut self) -> io::Result<String> {
        self.contents()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no token store available"))
    }

    async fn write_all(&mut self, contents: &str) -> io::Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_owned());
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
