use crate::{
    error::LoadError,
    library::AssetLibrary,
    parser::AssetParser,
    protocol::{AssetProtocol, File, file::FileProtocol},
};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

/// Creates a protocol instance for one resolved path candidate.
pub type ProtocolFunction = Box<dyn Fn(&str) -> Box<dyn AssetProtocol> + Send + Sync>;
/// Creates a parser instance for one recognized extension.
pub type ParserFunction = Box<dyn Fn() -> Box<dyn AssetParser> + Send + Sync>;
/// Rewrites a raw path into the concrete path handed to protocols.
pub type UriFunction = Box<dyn Fn(&str) -> String + Send + Sync>;
/// Decides whether a failed fetch should be replayed, given the requested
/// name, the error and the number of attempts made so far.
pub type RetryFunction = Box<dyn Fn(&str, &LoadError, usize) -> bool + Send + Sync>;

/// Cache of byte ranges fetched from resources, consulted by protocols before
/// any I/O and filled by the loader after partial fetches.
pub trait RangeCache: Send + Sync {
    /// Fills `file.data` when the exact range is cached; returns whether it was.
    fn get(&self, file: &mut File, offset: usize, length: usize) -> bool;

    /// Stores `file.data` as the range starting at `offset`.
    fn set(&self, file: &File, offset: usize);
}

/// In-memory [`RangeCache`], keyed by resolved filename and range offset.
#[derive(Default)]
pub struct MemoryRangeCache {
    #[allow(clippy::type_complexity)]
    ranges: RwLock<HashMap<String, HashMap<usize, Vec<u8>>>>,
}

impl RangeCache for MemoryRangeCache {
    fn get(&self, file: &mut File, offset: usize, length: usize) -> bool {
        let Ok(ranges) = self.ranges.read() else {
            return false;
        };
        let Some(bytes) = ranges
            .get(&file.resolved_filename)
            .and_then(|ranges| ranges.get(&offset))
        else {
            return false;
        };
        if bytes.len() != length {
            return false;
        }
        file.data = bytes.clone();
        true
    }

    fn set(&self, file: &File, offset: usize) {
        if let Ok(mut ranges) = self.ranges.write() {
            ranges
                .entry(file.resolved_filename.clone())
                .or_default()
                .insert(offset, file.data.clone());
        }
    }
}

/// Configuration shared by every file of a batch, unless a per-file override
/// is supplied at queue time.
///
/// All pluggable behavior is an explicit value here, threaded through
/// construction; there is no process-wide default state. The default protocol
/// function instantiates [`FileProtocol`], the default uri function is the
/// identity and the default retry predicate always declines.
pub struct LoadOptions {
    include_paths: Vec<String>,
    uri_function: UriFunction,
    protocol_function: ProtocolFunction,
    parsers: HashMap<String, ParserFunction>,
    retry_function: RetryFunction,
    cache: Option<Arc<dyn RangeCache>>,
    seeking_offset: Option<usize>,
    seeked_length: Option<usize>,
    store_data_if_not_parsed: bool,
    asset_library: Arc<RwLock<AssetLibrary>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            include_paths: Default::default(),
            uri_function: Box::new(|path| path.to_owned()),
            protocol_function: Box::new(|_| Box::new(FileProtocol::default())),
            parsers: Default::default(),
            retry_function: Box::new(|_, _, _| false),
            cache: None,
            seeking_offset: None,
            seeked_length: None,
            store_data_if_not_parsed: false,
            asset_library: Default::default(),
        }
    }
}

impl LoadOptions {
    /// Appends an include path used as an ordered fallback base when resolving
    /// relative names.
    pub fn with_include_path(mut self, path: impl ToString) -> Self {
        self.include_paths.push(path.to_string());
        self
    }

    pub fn with_uri_function(
        mut self,
        function: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.uri_function = Box::new(function);
        self
    }

    pub fn with_protocol_function(
        mut self,
        function: impl Fn(&str) -> Box<dyn AssetProtocol> + Send + Sync + 'static,
    ) -> Self {
        self.protocol_function = Box::new(function);
        self
    }

    /// Registers a parser factory for a lowercase extension.
    pub fn with_parser(
        mut self,
        extension: impl ToString,
        function: impl Fn() -> Box<dyn AssetParser> + Send + Sync + 'static,
    ) -> Self {
        self.parsers
            .insert(extension.to_string().to_lowercase(), Box::new(function));
        self
    }

    pub fn with_retry_function(
        mut self,
        function: impl Fn(&str, &LoadError, usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_function = Box::new(function);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn RangeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Requests a partial fetch bounded by an offset and length instead of the
    /// whole resource.
    pub fn with_byte_range(mut self, offset: usize, length: usize) -> Self {
        self.seeking_offset = Some(offset);
        self.seeked_length = Some(length);
        self
    }

    /// Stores raw bytes of resources no parser claims as library blobs.
    pub fn with_store_data_if_not_parsed(mut self) -> Self {
        self.store_data_if_not_parsed = true;
        self
    }

    pub fn with_asset_library(mut self, library: Arc<RwLock<AssetLibrary>>) -> Self {
        self.asset_library = library;
        self
    }

    pub fn include_paths(&self) -> &[String] {
        &self.include_paths
    }

    /// Resolves a raw path through the uri function.
    pub fn uri(&self, path: &str) -> String {
        (self.uri_function)(path)
    }

    /// Instantiates a protocol for a resolved path candidate.
    pub fn protocol(&self, resolved_filename: &str) -> Box<dyn AssetProtocol> {
        (self.protocol_function)(resolved_filename)
    }

    /// Instantiates a parser for a lowercase extension, if one is registered.
    pub fn parser(&self, extension: &str) -> Option<Box<dyn AssetParser>> {
        self.parsers.get(extension).map(|function| function())
    }

    pub fn retry(&self, filename: &str, error: &LoadError, attempts: usize) -> bool {
        (self.retry_function)(filename, error, attempts)
    }

    pub fn cache(&self) -> Option<&Arc<dyn RangeCache>> {
        self.cache.as_ref()
    }

    pub fn seeking_offset(&self) -> Option<usize> {
        self.seeking_offset
    }

    pub fn seeked_length(&self) -> Option<usize> {
        self.seeked_length
    }

    pub fn store_data_if_not_parsed(&self) -> bool {
        self.store_data_if_not_parsed
    }

    pub fn asset_library(&self) -> &Arc<RwLock<AssetLibrary>> {
        &self.asset_library
    }
}
