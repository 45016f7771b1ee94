//! Backing media for the persisted token store

use std::io;

use async_trait::async_trait;

pub mod file;
pub mod in_memory;

pub use file::FileStoreMedium;
pub use in_memory::InMemoryStoreMedium;

/// A place the token store can be read from and written to as a whole
///
/// Reads return the complete text. Writes replace the complete text; there are
/// no partial or appending writes.
#[async_trait]
pub trait AsyncStoreMedium: Send + Sync {
    /// Reads the full contents of the medium
    async fn read_to_string(&mut self) -> io::Result<String>;

    /// Overwrites the full contents of the medium with `contents`
    async fn write_all(&mut self, contents: &str) -> io::Result<()>;
}
