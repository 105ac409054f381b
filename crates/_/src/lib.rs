//! # Sherpa - Asset Loading Pipeline for Rust
//! **A modular pipeline for resolving, fetching, parsing and retrying asset loads**
//!
//! This crate provides a cooperative asset loading pipeline: resources are queued by
//! name, resolved to concrete paths through configurable include paths, fetched by
//! pluggable protocols (local file system, in-memory stores, or custom sources),
//! decoded by pluggable parsers into a typed asset library, and driven to a single
//! batch completion with aggregated progress reporting along the way.
//!
//! ### Key Features:
//! - **Pluggable Protocols**: Fetch bytes from the file system, memory, or any custom source implementing the `AssetProtocol` trait.
//! - **Pluggable Parsers**: Decode fetched bytes into typed assets by file extension, with parser-discovered dependencies queued into the same batch.
//! - **Include Path Resolution**: Relative names resolve against an ordered list of fallback base paths, probed in order.
//! - **Retry Policies**: Transient fetch failures replay under a caller-supplied predicate, with per-file attempt tracking.
//! - **Byte-Range Caching**: Partial fetches consult and fill a range cache, skipping repeated I/O for already seen ranges.
//! - **Polled Event Model**: Protocols and parsers report through event queues drained by a maintenance pump, so no callback ever runs on a worker thread.
//!
//! ### Example Usage:
//! ```rust
//! use sherpa::{
//!     loader::Loader, options::LoadOptions, parser::closure::ClosureParser,
//!     protocol::memory::MemoryProtocol,
//! };
//! use std::{error::Error, sync::Arc};
//!
//! fn main() -> Result<(), Box<dyn Error>> {
//!     let options = Arc::new(
//!         LoadOptions::default()
//!             .with_protocol_function(|_| {
//!                 Box::new(
//!                     MemoryProtocol::default()
//!                         .with_asset("greeting.txt", b"hello".to_vec()),
//!                 )
//!             })
//!             .with_parser("txt", || {
//!                 Box::new(ClosureParser::new(|file, library| {
//!                     let text = String::from_utf8(file.data.clone())?;
//!                     library.store(&file.filename, text)?;
//!                     Ok(vec![])
//!                 }))
//!             }),
//!     );
//!
//!     let mut loader = Loader::new(options.clone());
//!     loader.queue("greeting.txt")?;
//!     loader.load()?;
//!     while loader.is_loading() {
//!         loader.maintain()?;
//!     }
//!
//!     let library = options.asset_library().read().unwrap();
//!     assert_eq!(library.get::<String>("greeting.txt").unwrap(), "hello");
//!     Ok(())
//! }
//! ```
//!
//! ### Use Cases:
//! - **Game Development**: Stream textures, effects and scenes from disk or archives, with effects pulling their own dependencies into the batch.
//! - **Content Tools**: Batch-convert resources with progress bars fed by aggregated fetch and parse progress.
//! - **Embedded Resources**: Serve assets from in-memory bundles in tests or shipped binaries through `MemoryProtocol`.
//!
//! The pipeline never blocks the calling thread: `load` dispatches, `maintain` pumps,
//! and the embedding application decides how often to turn the crank.

pub mod channel;
pub mod error;
pub mod events;
pub mod library;
pub mod loader;
pub mod options;
pub mod parser;
pub mod protocol;

pub mod third_party {
    pub use anput;
}
