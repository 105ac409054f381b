use sherpa::{
    channel::EventChannel,
    error::LoadError,
    library::AssetLibrary,
    loader::{Loader, LoaderEvent},
    options::{LoadOptions, MemoryRangeCache},
    parser::{AssetParser, ParserEvent, closure::ClosureParser},
    protocol::{AssetProtocol, File, ProtocolEvent},
};
use std::{
    collections::HashMap,
    error::Error,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Scriptable protocol: serves an in-memory collection, records existence
/// probes and fetched paths, and fails the first N fetches of rigged names.
struct RiggedProtocol {
    events: EventChannel<ProtocolEvent>,
    assets: Arc<HashMap<String, Vec<u8>>>,
    fetched: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, usize>>>,
    probes: Arc<Mutex<Vec<String>>>,
    emit_buffer: bool,
}

impl AssetProtocol for RiggedProtocol {
    fn events(&self) -> &EventChannel<ProtocolEvent> {
        &self.events
    }

    fn fetch(&mut self, mut file: File, options: Arc<LoadOptions>) {
        self.fetched
            .lock()
            .unwrap()
            .push(file.resolved_filename.clone());
        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&file.filename) {
            if *remaining > 0 {
                *remaining -= 1;
                self.events
                    .send(ProtocolEvent::Error("rigged failure".to_owned()));
                return;
            }
        }
        match self.assets.get(&file.resolved_filename) {
            Some(bytes) => {
                if self.emit_buffer {
                    self.events.send(ProtocolEvent::Buffer);
                }
                self.events.send(ProtocolEvent::Progress(1.0));
                file.data = match (options.seeking_offset(), options.seeked_length()) {
                    (Some(offset), Some(length)) => bytes[offset..offset + length].to_vec(),
                    _ => bytes.clone(),
                };
                self.events.send(ProtocolEvent::Complete(file));
            }
            None => self.events.send(ProtocolEvent::Error(format!(
                "no asset under `{}`",
                file.resolved_filename
            ))),
        }
    }

    fn file_exists(&self, filename: &str) -> bool {
        self.probes.lock().unwrap().push(filename.to_owned());
        self.assets.contains_key(filename)
    }
}

#[derive(Default)]
struct Rig {
    assets: HashMap<String, Vec<u8>>,
    fetched: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, usize>>>,
    probes: Arc<Mutex<Vec<String>>>,
    emit_buffer: bool,
}

impl Rig {
    fn with_asset(mut self, name: &str, bytes: &[u8]) -> Self {
        self.assets.insert(name.to_owned(), bytes.to_vec());
        self
    }

    fn with_failures(self, name: &str, count: usize) -> Self {
        self.failures.lock().unwrap().insert(name.to_owned(), count);
        self
    }

    fn with_buffer_events(mut self) -> Self {
        self.emit_buffer = true;
        self
    }

    fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    fn protocol_function(&self) -> impl Fn(&str) -> Box<dyn AssetProtocol> + Send + Sync + use<> {
        let assets = Arc::new(self.assets.clone());
        let fetched = self.fetched.clone();
        let failures = self.failures.clone();
        let probes = self.probes.clone();
        let emit_buffer = self.emit_buffer;
        move |_| {
            Box::new(RiggedProtocol {
                events: Default::default(),
                assets: assets.clone(),
                fetched: fetched.clone(),
                failures: failures.clone(),
                probes: probes.clone(),
                emit_buffer,
            })
        }
    }
}

fn pump(loader: &mut Loader) -> Result<(), Box<dyn Error>> {
    let mut turns = 0;
    while loader.is_loading() {
        loader.maintain()?;
        turns += 1;
        assert!(turns < 1000, "pipeline stalled");
    }
    Ok(())
}

fn count_completions(loader: &mut Loader) -> Arc<AtomicUsize> {
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = completions.clone();
    loader.events.bind(move |event: LoaderEvent| {
        if event == LoaderEvent::Complete {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    completions
}

#[test]
fn batch_dispatches_each_name_once_and_completes_once() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("a.bin", &[1])
        .with_asset("b.bin", &[2])
        .with_asset("c.bin", &[3]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);

    loader.queue("a.bin")?;
    loader.queue("b.bin")?;
    loader.queue("c.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 3);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("a.bin").unwrap(), &[1]);
    assert_eq!(library.blob("b.bin").unwrap(), &[2]);
    assert_eq!(library.blob("c.bin").unwrap(), &[3]);
    Ok(())
}

#[test]
fn queueing_same_name_twice_dispatches_once() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("a.bin", &[1]);
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options);

    loader.queue("a.bin")?;
    loader.queue("a.bin")?;
    assert_eq!(loader.queued(), 1);
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 1);
    Ok(())
}

#[test]
fn empty_names_are_ignored() -> Result<(), Box<dyn Error>> {
    let mut loader = Loader::default();
    loader.queue("")?;
    assert_eq!(loader.queued(), 0);
    loader.load()?;
    assert!(!loader.is_loading());
    Ok(())
}

#[test]
fn aggregated_progress_is_non_decreasing_and_reaches_one() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("a.bin", &[1])
        .with_asset("b.bin", &[2])
        .with_asset("c.bin", &[3]);
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options);
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    loader.events.bind(move |event: LoaderEvent| {
        if let LoaderEvent::Progress(fraction) = event {
            sink.lock().unwrap().push(fraction);
        }
    });

    loader.queue("a.bin")?;
    loader.queue("b.bin")?;
    loader.queue("c.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    let observed = observed.lock().unwrap();
    assert!(!observed.is_empty());
    assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(*observed.last().unwrap(), 1.0);
    Ok(())
}

#[test]
fn fetch_failures_replay_under_retry_predicate() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_failures("a.bin", usize::MAX);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_retry_function(|_, _, attempts| attempts < 3),
    );
    let mut loader = Loader::new(options);
    let completions = count_completions(&mut loader);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    loader
        .errors
        .bind(move |error: LoadError| sink.lock().unwrap().push(error));

    loader.queue("a.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 3);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], LoadError::Protocol { filename, .. } if filename == "a.bin"));
    // A failed file does not block batch completion.
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn names_already_in_library_skip_dispatch() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("a.bin", &[1])
        .with_asset("b.bin", &[2])
        .with_asset("c.bin", &[3]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    options
        .asset_library()
        .write()
        .unwrap()
        .store_blob("b.bin", vec![9])?;
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);

    loader.queue("a.bin")?;
    loader.queue("b.bin")?;
    loader.queue("c.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 2);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    // The already stored asset is untouched.
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("b.bin").unwrap(), &[9]);
    Ok(())
}

#[test]
fn include_paths_probe_in_order() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("b/res.bin", &[7]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_include_path("a")
            .with_include_path("b")
            .with_store_data_if_not_parsed(),
    );
    let mut loader = Loader::new(options.clone());

    loader.queue("res.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(
        *rig.probes.lock().unwrap(),
        vec!["res.bin", "a/res.bin", "b/res.bin"]
    );
    assert_eq!(*rig.fetched.lock().unwrap(), vec!["b/res.bin"]);
    // Stored under the requested name, not the resolved path.
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("res.bin").unwrap(), &[7]);
    Ok(())
}

#[test]
fn mixed_batch_with_transient_failures_parses_everything() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("tex.png", &[1, 2])
        .with_asset("fx.effect", b"glow")
        .with_failures("fx.effect", 2);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_retry_function(|_, _, attempts| attempts < 3)
            .with_parser("png", || {
                Box::new(ClosureParser::new(|file, library| {
                    library.store(&file.filename, file.data.clone())?;
                    Ok(vec![])
                }))
            })
            .with_parser("effect", || {
                Box::new(ClosureParser::new(|file, library| {
                    let source = String::from_utf8(file.data.clone())?;
                    library.store(&file.filename, source)?;
                    Ok(vec![])
                }))
            }),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    loader
        .errors
        .bind(move |error: LoadError| sink.lock().unwrap().push(error));

    loader.queue("tex.png")?;
    loader.queue("fx.effect")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 4);
    assert!(errors.lock().unwrap().is_empty());
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.get::<Vec<u8>>("tex.png").unwrap(), &[1, 2]);
    assert_eq!(library.get::<String>("fx.effect").unwrap(), "glow");
    Ok(())
}

#[test]
fn unparsed_bytes_store_as_blobs_only_when_requested() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("raw.bin", &[1, 2, 3]);
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options.clone());
    loader.queue("raw.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    assert!(options.asset_library().read().unwrap().is_empty());

    let rig = Rig::default().with_asset("raw.bin", &[1, 2, 3]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    let mut loader = Loader::new(options.clone());
    loader.queue("raw.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("raw.bin").unwrap(), &[1, 2, 3]);
    Ok(())
}

#[test]
fn unobserved_fetch_errors_escalate() {
    let rig = Rig::default().with_failures("a.bin", usize::MAX);
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options);
    loader.queue("a.bin").unwrap();
    loader.load().unwrap();
    let error = loader.maintain().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<LoadError>(),
        Some(LoadError::Protocol { filename, .. }) if filename == "a.bin"
    ));
    assert!(!loader.is_loading());
}

#[test]
fn unresolvable_names_escalate_from_load() {
    let rig = Rig::default();
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_include_path("a")
            .with_include_path("b"),
    );
    let mut loader = Loader::new(options);
    loader.queue("missing.bin").unwrap();
    let error = loader.load().unwrap_err();
    assert!(matches!(
        error.downcast_ref::<LoadError>(),
        Some(LoadError::Resolution { filename, include_paths })
            if filename == "missing.bin" && include_paths == &["a", "b"]
    ));
    assert_eq!(rig.fetch_count(), 0);
}

#[test]
fn observed_errors_keep_the_batch_alive() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("good.bin", &[1])
        .with_failures("bad.bin", usize::MAX);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    loader
        .errors
        .bind(move |error: LoadError| sink.lock().unwrap().push(error));

    loader.queue("good.bin")?;
    loader.queue("bad.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("good.bin").unwrap(), &[1]);
    Ok(())
}

#[test]
fn buffer_events_forward_to_lifecycle_listeners() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("a.bin", &[1])
        .with_buffer_events();
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options);
    let buffers = Arc::new(AtomicUsize::new(0));
    let counter = buffers.clone();
    loader.events.bind(move |event: LoaderEvent| {
        if event == LoaderEvent::Buffer {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    loader.queue("a.bin")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(buffers.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn loader_is_reusable_across_batches() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("first.bin", &[1])
        .with_asset("second.bin", &[2]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);

    loader.queue("first.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    loader.queue("second.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    assert_eq!(completions.load(Ordering::SeqCst), 2);

    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("first.bin").unwrap(), &[1]);
    assert_eq!(library.blob("second.bin").unwrap(), &[2]);
    Ok(())
}

#[test]
fn parser_dependencies_join_the_same_batch() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("scene.effect", b"uses textures")
        .with_asset("a.png", &[1])
        .with_asset("b.png", &[2]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_parser("effect", || {
                Box::new(ClosureParser::new(|file, library| {
                    library.store(&file.filename, file.data.len())?;
                    Ok(vec!["a.png".to_owned(), "b.png".to_owned()])
                }))
            })
            .with_parser("png", || {
                Box::new(ClosureParser::new(|file, library| {
                    library.store(&file.filename, file.data.clone())?;
                    Ok(vec![])
                }))
            }),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);

    loader.queue("scene.effect")?;
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(rig.fetch_count(), 3);
    // Completion waits for dependencies the parser discovered.
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let library = options.asset_library().read().unwrap();
    assert!(library.contains::<usize>("scene.effect"));
    assert_eq!(library.get::<Vec<u8>>("a.png").unwrap(), &[1]);
    assert_eq!(library.get::<Vec<u8>>("b.png").unwrap(), &[2]);
    Ok(())
}

#[test]
fn byte_ranges_fill_and_reuse_the_cache() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("res.bin", &[0, 1, 2, 3, 4, 5]);
    let cache = Arc::new(MemoryRangeCache::default());
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_cache(cache)
            .with_byte_range(2, 3)
            .with_store_data_if_not_parsed(),
    );

    let mut loader = Loader::new(options.clone());
    loader.queue("res.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    assert_eq!(rig.fetch_count(), 1);
    assert_eq!(
        options.asset_library().read().unwrap().blob("res.bin").unwrap(),
        &[2, 3, 4]
    );

    // Same range again: satisfied by the cache, no further fetch.
    let mut loader = Loader::new(options.clone());
    loader.queue("res.bin")?;
    loader.load()?;
    pump(&mut loader)?;
    assert_eq!(rig.fetch_count(), 1);
    Ok(())
}

/// Parser reporting staged fractions (with a duplicate) before completing.
struct StagedParser {
    events: EventChannel<ParserEvent>,
}

impl AssetParser for StagedParser {
    fn events(&self) -> &EventChannel<ParserEvent> {
        &self.events
    }

    fn parse(&mut self, file: &File, _options: Arc<LoadOptions>, library: Arc<RwLock<AssetLibrary>>) {
        self.events.send(ParserEvent::Progress(0.25));
        self.events.send(ParserEvent::Progress(0.25));
        self.events.send(ParserEvent::Progress(0.5));
        let _ = library
            .write()
            .unwrap()
            .store_blob(&file.filename, file.data.clone());
        self.events.send(ParserEvent::Complete {
            dependencies: vec![],
        });
    }
}

#[test]
fn parsing_progress_aggregates_deduped_and_reaches_one() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default()
        .with_asset("a.dat", &[1])
        .with_asset("b.dat", &[2]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_parser("dat", || {
                Box::new(StagedParser {
                    events: Default::default(),
                })
            }),
    );
    let mut loader = Loader::new(options.clone());
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    loader.events.bind(move |event: LoaderEvent| {
        if let LoaderEvent::ParsingProgress(fraction) = event {
            sink.lock().unwrap().push(fraction);
        }
    });

    loader.queue("a.dat")?;
    loader.queue("b.dat")?;
    loader.load()?;
    pump(&mut loader)?;

    let observed = observed.lock().unwrap();
    assert!(!observed.is_empty());
    // Repeated fractions from one parser collapse, so the aggregate is
    // strictly increasing.
    assert!(observed.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(*observed.last().unwrap(), 1.0);
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("a.dat").unwrap(), &[1]);
    assert_eq!(library.blob("b.dat").unwrap(), &[2]);
    Ok(())
}

#[test]
fn per_file_option_overrides_govern_only_their_file() -> Result<(), Box<dyn Error>> {
    let shared = Rig::default().with_asset("a.bin", &[1]);
    let special = Rig::default().with_asset("b.bin", &[2, 2]);
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(shared.protocol_function())
            .with_store_data_if_not_parsed(),
    );
    let override_options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(special.protocol_function())
            .with_store_data_if_not_parsed()
            .with_asset_library(options.asset_library().clone()),
    );
    let mut loader = Loader::new(options.clone());
    let completions = count_completions(&mut loader);

    loader.queue("a.bin")?;
    // Under the shared options `b.bin` would fail; the override queued for
    // the same name replaces its options without duplicating the record.
    loader.queue("b.bin")?;
    loader.queue_with("b.bin", override_options)?;
    assert_eq!(loader.queued(), 2);
    loader.load()?;
    pump(&mut loader)?;

    assert_eq!(*shared.fetched.lock().unwrap(), vec!["a.bin"]);
    assert_eq!(*special.fetched.lock().unwrap(), vec!["b.bin"]);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let library = options.asset_library().read().unwrap();
    assert_eq!(library.blob("a.bin").unwrap(), &[1]);
    assert_eq!(library.blob("b.bin").unwrap(), &[2, 2]);
    Ok(())
}

#[test]
fn queued_names_wait_for_load() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("a.bin", &[1]);
    let options = Arc::new(LoadOptions::default().with_protocol_function(rig.protocol_function()));
    let mut loader = Loader::new(options);
    let completions = count_completions(&mut loader);

    loader.queue("a.bin")?;
    loader.maintain()?;
    loader.maintain()?;
    assert_eq!(rig.fetch_count(), 0);
    assert_eq!(loader.queued(), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 0);

    loader.load()?;
    pump(&mut loader)?;
    assert_eq!(rig.fetch_count(), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn parse_failures_surface_as_parser_errors() -> Result<(), Box<dyn Error>> {
    let rig = Rig::default().with_asset("broken.json", b"{");
    let options = Arc::new(
        LoadOptions::default()
            .with_protocol_function(rig.protocol_function())
            .with_parser("json", || {
                Box::new(ClosureParser::new(|file, library| {
                    let value = serde_json::from_slice::<serde_json::Value>(&file.data)?;
                    library.store(&file.filename, value)?;
                    Ok(vec![])
                }))
            }),
    );
    let mut loader = Loader::new(options);
    let completions = count_completions(&mut loader);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    loader
        .errors
        .bind(move |error: LoadError| sink.lock().unwrap().push(error));

    loader.queue("broken.json")?;
    loader.load()?;
    pump(&mut loader)?;

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], LoadError::Parser { filename, .. } if filename == "broken.json"));
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    Ok(())
}
