pub mod closure;

use crate::{
    channel::EventChannel, library::AssetLibrary, options::LoadOptions, protocol::File,
};
use std::{
    error::Error,
    sync::{Arc, RwLock},
};

/// Events emitted by a parser over the course of one parse.
///
/// Exactly one of `Complete`/`Error` terminates a parse, with zero or more
/// `Progress` events before it.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    /// Parse progress fraction in [0, 1].
    Progress(f32),
    /// Parsing finished; `dependencies` are resource names the parsed asset
    /// needs, queued into the same batch before it can complete.
    Complete { dependencies: Vec<String> },
    /// Parsing failed with the given message, surfaced verbatim.
    Error(String),
}

/// Polymorphic capability that turns fetched bytes into a typed asset stored
/// in the asset library.
///
/// Mirrors [`crate::protocol::AssetProtocol`]: work may happen on worker
/// threads, outcomes are reported through the instance's [`EventChannel`] and
/// drained by the loader's maintenance pump.
pub trait AssetParser: Send + Sync {
    /// Event queue this parser reports through.
    fn events(&self) -> &EventChannel<ParserEvent>;

    /// Begins parsing the fetched bytes of the given file record.
    fn parse(&mut self, file: &File, options: Arc<LoadOptions>, library: Arc<RwLock<AssetLibrary>>);

    /// Maintains parser state, e.g. reaping finished worker threads.
    fn maintain(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}
