use crate::{
    channel::EventChannel,
    options::LoadOptions,
    protocol::{AssetProtocol, File, ProtocolEvent, apply_byte_range},
};
use std::{collections::HashMap, sync::Arc};

/// Protocol that serves bytes from an in-memory collection.
///
/// Useful for packaged resources and tests. Fetches complete on the next
/// maintenance pump, never synchronously inside `load`.
#[derive(Default)]
pub struct MemoryProtocol {
    assets: HashMap<String, Vec<u8>>,
    events: EventChannel<ProtocolEvent>,
}

impl MemoryProtocol {
    pub fn with_asset(mut self, filename: impl ToString, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(filename.to_string(), bytes.into());
        self
    }
}

impl From<HashMap<String, Vec<u8>>> for MemoryProtocol {
    fn from(assets: HashMap<String, Vec<u8>>) -> Self {
        Self {
            assets,
            events: Default::default(),
        }
    }
}

impl AssetProtocol for MemoryProtocol {
    fn events(&self) -> &EventChannel<ProtocolEvent> {
        &self.events
    }

    fn fetch(&mut self, mut file: File, options: Arc<LoadOptions>) {
        match self.assets.get(&file.resolved_filename) {
            Some(bytes) => {
                match apply_byte_range(
                    bytes.clone(),
                    options.seeking_offset(),
                    options.seeked_length(),
                ) {
                    Ok(bytes) => {
                        self.events.send(ProtocolEvent::Progress(1.0));
                        file.data = bytes;
                        self.events.send(ProtocolEvent::Complete(file));
                    }
                    Err(message) => self.events.send(ProtocolEvent::Error(message)),
                }
            }
            None => self.events.send(ProtocolEvent::Error(format!(
                "no asset under `{}`",
                file.resolved_filename
            ))),
        }
    }

    fn file_exists(&self, filename: &str) -> bool {
        self.assets.contains_key(filename)
    }
}
