pub mod file;
pub mod memory;

use crate::{channel::EventChannel, options::LoadOptions};
use std::{error::Error, path::Path, sync::Arc};

/// Value record of one fetch attempt.
///
/// Created by the loader when a resource is dispatched and owned exclusively
/// by the protocol instance handling the attempt; handed back inside
/// [`ProtocolEvent::Complete`] and released when the batch finalizes or the
/// attempt errors out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct File {
    /// Name the resource was requested under.
    pub filename: String,
    /// Concrete path the request resolved to.
    pub resolved_filename: String,
    /// Fetched bytes.
    pub data: Vec<u8>,
    /// Scratch space for protocols that fetch in chunks.
    pub buffer: Vec<u8>,
    /// Set when the bytes were satisfied by a byte-range cache without I/O.
    pub loaded_from_cache: bool,
}

impl File {
    pub fn new(filename: impl ToString, resolved_filename: impl ToString) -> Self {
        Self {
            filename: filename.to_string(),
            resolved_filename: resolved_filename.to_string(),
            ..Default::default()
        }
    }
}

/// Events emitted by a protocol over the course of one fetch attempt.
///
/// Exactly one of `Complete`/`Error` terminates an attempt, with zero or more
/// interleaved `Progress`/`Buffer` events before it. Progress fractions are
/// not guaranteed monotonic by contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    /// Fetch progress fraction in [0, 1].
    Progress(f32),
    /// The protocol buffered a chunk of data.
    Buffer,
    /// The fetch finished; the file record carries the bytes.
    Complete(File),
    /// The fetch failed with the given message.
    Error(String),
}

/// Polymorphic capability that fetches raw bytes for one resolved path.
///
/// Implementations may fetch on internal worker threads; all outcomes must be
/// reported through the instance's [`EventChannel`], which the loader drains
/// from its own thread during the maintenance pump. Dropping a protocol
/// instance closes the channel and orphans any in-progress worker.
pub trait AssetProtocol: Send + Sync {
    /// Event queue this protocol reports through.
    fn events(&self) -> &EventChannel<ProtocolEvent>;

    /// Begins the protocol-specific fetch for the given file record.
    fn fetch(&mut self, file: File, options: Arc<LoadOptions>);

    /// Synchronous existence probe, used during include path resolution only.
    fn file_exists(&self, filename: &str) -> bool;

    /// Syntactic absolute path check, no I/O.
    fn is_absolute_path(&self, filename: &str) -> bool {
        Path::new(filename).is_absolute()
    }

    /// Begins loading a file record.
    ///
    /// When a byte range is requested and a configured cache satisfies it,
    /// completes without performing any I/O; otherwise delegates to
    /// [`AssetProtocol::fetch`].
    fn load(&mut self, mut file: File, options: Arc<LoadOptions>) {
        if let (Some(cache), Some(offset), Some(length)) = (
            options.cache(),
            options.seeking_offset(),
            options.seeked_length(),
        ) {
            if cache.get(&mut file, offset, length) {
                file.loaded_from_cache = true;
                self.events().send(ProtocolEvent::Complete(file));
                return;
            }
        }
        self.fetch(file, options);
    }

    /// Maintains protocol state, e.g. reaping finished worker threads.
    fn maintain(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

pub(crate) fn apply_byte_range(
    bytes: Vec<u8>,
    offset: Option<usize>,
    length: Option<usize>,
) -> Result<Vec<u8>, String> {
    match (offset, length) {
        (Some(offset), Some(length)) => {
            if offset.saturating_add(length) <= bytes.len() {
                Ok(bytes[offset..offset + length].to_vec())
            } else {
                Err(format!(
                    "requested byte range {}..{} exceeds resource size {}",
                    offset,
                    offset + length,
                    bytes.len()
                ))
            }
        }
        _ => Ok(bytes),
    }
}
