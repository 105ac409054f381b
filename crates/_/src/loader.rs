use crate::{
    error::LoadError,
    events::EventBindings,
    library::AssetName,
    options::LoadOptions,
    parser::{AssetParser, ParserEvent},
    protocol::{AssetProtocol, File, ProtocolEvent},
};
use anput::{
    entity::Entity,
    commands::Command,
    database::WorldDestroyIteratorExt,
    world::World,
};
use log::{debug, error, warn};
use std::{collections::HashMap, error::Error, path::Path, sync::Arc};

/// Lifecycle events dispatched by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    /// Aggregated fetch progress of the current batch, in [0, 1].
    Progress(f32),
    /// Aggregated parse progress of the current batch, in [0, 1].
    ParsingProgress(f32),
    /// A protocol buffered a chunk of data, independent of batch completion.
    Buffer,
    /// The whole batch drained, including late-queued dependents.
    /// Fired exactly once per batch.
    Complete,
}

/// Marks an operation record queued for dispatch.
pub struct AwaitsDispatch;

/// Marks an operation record whose fetch was handed to a protocol.
pub struct FetchInFlight;

/// Marks an operation record whose bytes were handed to a parser.
pub struct ParseInFlight;

/// Marks an operation record that reached its successful terminal outcome.
pub struct LoadFinished;

/// Marks an operation record that surfaced an error.
pub struct LoadFailed;

/// Options effective for one operation record.
pub struct OperationOptions(pub Arc<LoadOptions>);

/// Fetch attempts made for one operation record so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadAttempts(pub usize);

/// Last fetch progress fraction a protocol reported for one record.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FetchProgress(pub f32);

/// Last parse progress fraction a parser reported for one record.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParseProgress(pub f32);

/// Concrete path an operation record resolved to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedPath(pub String);

/// Orchestrator of the asset loading pipeline.
///
/// Resources are queued by name, resolved to concrete paths through the
/// options' include paths, fetched by pluggable protocols and handed to
/// pluggable parsers; the loader aggregates progress across all in-flight
/// work, replays transient fetch failures under the options' retry predicate
/// and dispatches [`LoaderEvent::Complete`] exactly once per batch.
///
/// Every queued name becomes an operation record in an internal ECS world,
/// living until the batch finalizes. Protocols and parsers report through
/// polled event queues rather than callbacks, so all loader state is mutated
/// from the owning thread only and dropping the loader cancels outstanding
/// work without any dangling-callback hazard.
///
/// The embedding application drives the pipeline cooperatively:
///
/// ```no_run
/// # use sherpa::{loader::Loader, options::LoadOptions};
/// # use std::{error::Error, sync::Arc};
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let mut loader = Loader::new(Arc::new(LoadOptions::default()));
/// loader.queue("textures/stone.png")?;
/// loader.queue("effects/fire.effect")?;
/// loader.load()?;
/// while loader.is_loading() {
///     loader.maintain()?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Loader {
    storage: World,
    queue: Vec<Entity>,
    in_flight: HashMap<Entity, Box<dyn AssetProtocol>>,
    parsing: HashMap<Entity, Box<dyn AssetParser>>,
    pending_parses: usize,
    batch_size: usize,
    batch_active: bool,
    last_progress: f32,
    last_parsing_progress: f32,
    options: Arc<LoadOptions>,
    /// Lifecycle listeners: progress, parsing progress, buffer, completion.
    pub events: EventBindings<LoaderEvent>,
    /// Error listeners. With none bound, surfaced errors escalate as `Err`
    /// returns from the triggering `load`/`maintain` call.
    pub errors: EventBindings<LoadError>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl Loader {
    pub fn new(options: Arc<LoadOptions>) -> Self {
        Self {
            storage: Default::default(),
            queue: Default::default(),
            in_flight: Default::default(),
            parsing: Default::default(),
            pending_parses: 0,
            batch_size: 0,
            batch_active: false,
            last_progress: 0.0,
            last_parsing_progress: 0.0,
            options,
            events: Default::default(),
            errors: Default::default(),
        }
    }

    /// Default options applied to queued names without a per-file override.
    pub fn options(&self) -> &Arc<LoadOptions> {
        &self.options
    }

    /// Appends a name to the dispatch queue.
    ///
    /// Idempotent: empty names are ignored and re-queuing an already tracked
    /// name reuses its operation record, attempt counter included.
    pub fn queue(&mut self, filename: impl AsRef<str>) -> Result<(), Box<dyn Error>> {
        self.queue_for(filename.as_ref(), None)
    }

    /// Appends a name with options overriding the loader-wide defaults for
    /// this file only.
    pub fn queue_with(
        &mut self,
        filename: impl AsRef<str>,
        options: Arc<LoadOptions>,
    ) -> Result<(), Box<dyn Error>> {
        self.queue_for(filename.as_ref(), Some(options))
    }

    /// Dispatches every queued name, in queue order.
    ///
    /// Never blocks: resources already present in the asset library are
    /// short-circuited, the rest resolve through include paths and hand off
    /// to their protocols. Fetch outcomes surface through subsequent
    /// [`Loader::maintain`] calls.
    pub fn load(&mut self) -> Result<(), Box<dyn Error>> {
        self.batch_active = true;
        self.dispatch_pending()?;
        self.finalize_if_done();
        Ok(())
    }

    /// Pumps the pipeline: collects protocol and parser events, applies
    /// transitions (including retries and parser-queued dependents) and fires
    /// completion once everything drained.
    ///
    /// Call once per frame/tick of the embedding application.
    pub fn maintain(&mut self) -> Result<(), Box<dyn Error>> {
        let mut protocol_events = Vec::new();
        for (entity, protocol) in self.in_flight.iter_mut() {
            protocol.maintain()?;
            protocol_events.extend(protocol.events().drain().into_iter().map(|e| (*entity, e)));
        }
        for (entity, event) in protocol_events {
            self.on_protocol_event(entity, event)?;
        }

        let mut parser_events = Vec::new();
        for (entity, parser) in self.parsing.iter_mut() {
            parser.maintain()?;
            parser_events.extend(parser.events().drain().into_iter().map(|e| (*entity, e)));
        }
        for (entity, event) in parser_events {
            self.on_parser_event(entity, event)?;
        }

        // Retries and parser dependencies queued above dispatch here, in an
        // explicit work loop instead of handler recursion. Names queued
        // before any `load` call stay put until it runs.
        if self.batch_active {
            self.dispatch_pending()?;
        }
        self.finalize_if_done();
        Ok(())
    }

    /// Tells if any queued, in-flight or parsing work remains.
    pub fn is_loading(&self) -> bool {
        !self.queue.is_empty() || !self.in_flight.is_empty() || self.pending_parses > 0
    }

    /// Number of names awaiting dispatch.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn queue_for(
        &mut self,
        filename: &str,
        options: Option<Arc<LoadOptions>>,
    ) -> Result<(), Box<dyn Error>> {
        if filename.is_empty() {
            return Ok(());
        }
        if let Some(entity) = self.storage.find_by::<true, _>(&AssetName::new(filename)) {
            if let Some(options) = options {
                let mut slot = self
                    .storage
                    .component_mut::<true, OperationOptions>(entity)?;
                slot.0 = options;
            }
            let terminal = self.storage.has_entity_component::<LoadFinished>(entity)
                || self.storage.has_entity_component::<LoadFailed>(entity);
            if !terminal
                && !self.queue.contains(&entity)
                && !self.in_flight.contains_key(&entity)
                && !self.parsing.contains_key(&entity)
            {
                self.storage.insert(entity, (AwaitsDispatch,))?;
                self.queue.push(entity);
            }
            return Ok(());
        }
        let options = options.unwrap_or_else(|| self.options.clone());
        let entity = self.storage.spawn((
            AssetName::new(filename),
            OperationOptions(options),
            LoadAttempts(0),
            FetchProgress(0.0),
            ParseProgress(0.0),
            AwaitsDispatch,
        ))?;
        self.queue.push(entity);
        Ok(())
    }

    fn dispatch_pending(&mut self) -> Result<(), Box<dyn Error>> {
        while !self.queue.is_empty() {
            // Progress divides by the queue size captured when this pass
            // begins, not by a cumulative count across retries.
            self.batch_size = self.queue.len();
            let snapshot = std::mem::take(&mut self.queue);
            for entity in snapshot {
                self.dispatch_one(entity)?;
            }
        }
        Ok(())
    }

    fn dispatch_one(&mut self, entity: Entity) -> Result<(), Box<dyn Error>> {
        let (filename, options) = {
            let name = self.storage.component::<true, AssetName>(entity)?;
            let options = self.storage.component::<true, OperationOptions>(entity)?;
            (name.0.clone(), options.0.clone())
        };
        self.storage.remove::<(AwaitsDispatch,)>(entity)?;
        if options.seeking_offset().is_none() {
            let hit = options
                .asset_library()
                .read()
                .map_err(|e| format!("{}", e))?
                .contains_any(&filename);
            if hit {
                debug!("`{}` already in asset library, skipping dispatch", filename);
                std::iter::once(entity)
                    .to_despawn_command()
                    .execute(&mut self.storage);
                return Ok(());
            }
        }
        match self.resolve(&filename, &options) {
            Ok((resolved, mut protocol)) => {
                debug!("dispatching `{}` as `{}`", filename, resolved);
                // A retried entity still carries the previous attempt's
                // resolved path; anput's insert cannot overwrite it in place.
                self.storage.remove::<(ResolvedPath,)>(entity)?;
                self.storage
                    .insert(entity, (FetchInFlight, ResolvedPath(resolved.clone())))?;
                protocol.load(File::new(&filename, &resolved), options);
                self.in_flight.insert(entity, protocol);
            }
            Err(resolution) => {
                self.storage.insert(entity, (LoadFailed,))?;
                self.error_thrown(resolution)?;
            }
        }
        Ok(())
    }

    /// Resolves a name to the first reachable candidate path and the protocol
    /// instance that claimed it.
    ///
    /// Search order is the direct candidate followed by each include path
    /// base, every candidate re-resolved through the uri function. With no
    /// include paths configured the direct candidate dispatches without any
    /// existence probe; failures then surface later as protocol errors.
    fn resolve(
        &self,
        filename: &str,
        options: &LoadOptions,
    ) -> Result<(String, Box<dyn AssetProtocol>), LoadError> {
        let direct = options.uri(filename);
        if options.include_paths().is_empty() {
            let protocol = options.protocol(&direct);
            return Ok((direct, protocol));
        }
        let protocol = options.protocol(&direct);
        if protocol.is_absolute_path(&direct) || protocol.file_exists(&direct) {
            return Ok((direct, protocol));
        }
        for include_path in options.include_paths() {
            let candidate = options.uri(&format!("{}/{}", include_path, filename));
            let protocol = options.protocol(&candidate);
            if protocol.is_absolute_path(&candidate) || protocol.file_exists(&candidate) {
                return Ok((candidate, protocol));
            }
        }
        Err(LoadError::resolution(filename, options.include_paths()))
    }

    fn on_protocol_event(
        &mut self,
        entity: Entity,
        event: ProtocolEvent,
    ) -> Result<(), Box<dyn Error>> {
        // Stale events from a concluded attempt are dropped here.
        if !self.in_flight.contains_key(&entity) || !self.storage.has_entity(entity) {
            return Ok(());
        }
        match event {
            ProtocolEvent::Progress(fraction) => self.update_fetch_progress(entity, fraction),
            ProtocolEvent::Buffer => {
                self.events.dispatch(LoaderEvent::Buffer);
                Ok(())
            }
            ProtocolEvent::Complete(file) => self.on_protocol_complete(entity, file),
            ProtocolEvent::Error(message) => self.on_protocol_error(entity, message),
        }
    }

    fn on_protocol_complete(&mut self, entity: Entity, file: File) -> Result<(), Box<dyn Error>> {
        self.in_flight.remove(&entity);
        self.storage.remove::<(FetchInFlight,)>(entity)?;
        self.update_fetch_progress(entity, 1.0)?;
        let options = self.operation_options(entity)?;
        if !file.loaded_from_cache {
            if let (Some(cache), Some(offset)) = (options.cache(), options.seeking_offset()) {
                cache.set(&file, offset);
            }
        }
        self.pending_parses += 1;
        let file = self.process_data(entity, file, options)?;
        // The record keeps its file until the batch finalizes.
        self.storage.insert(entity, (file,))?;
        Ok(())
    }

    fn process_data(
        &mut self,
        entity: Entity,
        mut file: File,
        options: Arc<LoadOptions>,
    ) -> Result<File, Box<dyn Error>> {
        let extension = Path::new(&file.filename)
            .extension()
            .map(|extension| extension.to_string_lossy().to_lowercase());
        match extension.as_deref().and_then(|ext| options.parser(ext)) {
            Some(mut parser) => {
                debug!("parsing `{}`", file.filename);
                parser.parse(&file, options.clone(), options.asset_library().clone());
                self.storage.insert(entity, (ParseInFlight,))?;
                self.parsing.insert(entity, parser);
            }
            None => {
                if options.store_data_if_not_parsed() {
                    let mut library = options
                        .asset_library()
                        .write()
                        .map_err(|e| format!("{}", e))?;
                    library.store_blob(&file.filename, std::mem::take(&mut file.data))?;
                }
                self.storage.insert(entity, (LoadFinished,))?;
                self.pending_parses -= 1;
            }
        }
        Ok(file)
    }

    fn on_protocol_error(&mut self, entity: Entity, message: String) -> Result<(), Box<dyn Error>> {
        self.in_flight.remove(&entity);
        self.storage.remove::<(FetchInFlight,)>(entity)?;
        let filename = self.operation_name(entity)?;
        let attempts = {
            let mut attempts = self.storage.component_mut::<true, LoadAttempts>(entity)?;
            attempts.0 += 1;
            attempts.0
        };
        let error = LoadError::protocol(&filename, message);
        let options = self.operation_options(entity)?;
        if options.retry(&filename, &error, attempts) {
            warn!("retrying `{}` after fetch failure, attempt {}", filename, attempts);
            self.storage.insert(entity, (AwaitsDispatch,))?;
            self.queue.push(entity);
        } else {
            self.storage.insert(entity, (LoadFailed,))?;
            self.error_thrown(error)?;
        }
        Ok(())
    }

    fn on_parser_event(
        &mut self,
        entity: Entity,
        event: ParserEvent,
    ) -> Result<(), Box<dyn Error>> {
        match event {
            ParserEvent::Progress(fraction) => {
                if self.parsing.contains_key(&entity) {
                    self.update_parse_progress(entity, fraction)?;
                }
            }
            ParserEvent::Complete { dependencies } => {
                if self.parsing.remove(&entity).is_none() {
                    return Ok(());
                }
                self.storage.remove::<(ParseInFlight,)>(entity)?;
                self.storage.insert(entity, (LoadFinished,))?;
                self.update_parse_progress(entity, 1.0)?;
                self.pending_parses -= 1;
                let options = self.operation_options(entity)?;
                for dependency in dependencies {
                    self.queue_for(&dependency, Some(options.clone()))?;
                }
            }
            ParserEvent::Error(message) => {
                if self.parsing.remove(&entity).is_none() {
                    return Ok(());
                }
                self.storage.remove::<(ParseInFlight,)>(entity)?;
                self.storage.insert(entity, (LoadFailed,))?;
                self.pending_parses -= 1;
                let filename = self.operation_name(entity)?;
                self.error_thrown(LoadError::parser(filename, message))?;
            }
        }
        Ok(())
    }

    fn update_fetch_progress(
        &mut self,
        entity: Entity,
        fraction: f32,
    ) -> Result<(), Box<dyn Error>> {
        let changed = {
            let mut progress = self.storage.component_mut::<true, FetchProgress>(entity)?;
            // Deduped by exact equality, not monotonicity.
            if progress.0 == fraction {
                false
            } else {
                progress.0 = fraction;
                true
            }
        };
        if changed {
            self.emit_progress();
        }
        Ok(())
    }

    fn update_parse_progress(
        &mut self,
        entity: Entity,
        fraction: f32,
    ) -> Result<(), Box<dyn Error>> {
        let changed = {
            let mut progress = self.storage.component_mut::<true, ParseProgress>(entity)?;
            if progress.0 == fraction {
                false
            } else {
                progress.0 = fraction;
                true
            }
        };
        if changed {
            self.emit_parsing_progress();
        }
        Ok(())
    }

    fn emit_progress(&mut self) {
        if self.batch_size == 0 {
            return;
        }
        let total: f32 = self
            .storage
            .query::<true, (Entity, &FetchProgress)>()
            .map(|(_, progress)| progress.0)
            .sum();
        let total = (total / self.batch_size as f32).min(1.0);
        if total != self.last_progress {
            self.last_progress = total;
            self.events.dispatch(LoaderEvent::Progress(total));
        }
    }

    fn emit_parsing_progress(&mut self) {
        if self.batch_size == 0 {
            return;
        }
        let total: f32 = self
            .storage
            .query::<true, (Entity, &ParseProgress)>()
            .map(|(_, progress)| progress.0)
            .sum();
        let total = (total / self.batch_size as f32).min(1.0);
        if total != self.last_parsing_progress {
            self.last_parsing_progress = total;
            self.events.dispatch(LoaderEvent::ParsingProgress(total));
        }
    }

    fn error_thrown(&mut self, error: LoadError) -> Result<(), Box<dyn Error>> {
        error!("{}", error);
        if self.errors.is_empty() {
            // An unobserved error channel is a programming mistake; escalate.
            return Err(error.into());
        }
        self.errors.dispatch(error);
        Ok(())
    }

    fn finalize_if_done(&mut self) {
        if !self.batch_active
            || !self.queue.is_empty()
            || !self.in_flight.is_empty()
            || self.pending_parses > 0
        {
            return;
        }
        let records = self
            .storage
            .query::<true, (Entity, &AssetName)>()
            .map(|(entity, _)| entity)
            .collect::<Vec<_>>();
        records
            .into_iter()
            .to_despawn_command()
            .execute(&mut self.storage);
        self.batch_size = 0;
        self.batch_active = false;
        self.last_progress = 0.0;
        self.last_parsing_progress = 0.0;
        debug!("batch complete");
        self.events.dispatch(LoaderEvent::Complete);
    }

    fn operation_name(&self, entity: Entity) -> Result<String, Box<dyn Error>> {
        Ok(self.storage.component::<true, AssetName>(entity)?.0.clone())
    }

    fn operation_options(&self, entity: Entity) -> Result<Arc<LoadOptions>, Box<dyn Error>> {
        Ok(self
            .storage
            .component::<true, OperationOptions>(entity)?
            .0
            .clone())
    }
}
