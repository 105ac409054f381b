use crate::{
    channel::EventChannel,
    library::AssetLibrary,
    options::LoadOptions,
    parser::{AssetParser, ParserEvent},
    protocol::File,
};
use std::{
    error::Error,
    sync::{Arc, RwLock},
};

/// Adapts a closure into a parser.
///
/// The closure receives the fetched file record and the asset library, stores
/// whatever typed assets it produces and returns the names of dependencies to
/// queue into the same batch.
pub struct ClosureParser {
    events: EventChannel<ParserEvent>,
    #[allow(clippy::type_complexity)]
    processor: Box<
        dyn FnMut(&File, &mut AssetLibrary) -> Result<Vec<String>, Box<dyn Error>> + Send + Sync,
    >,
}

impl ClosureParser {
    pub fn new(
        processor: impl FnMut(&File, &mut AssetLibrary) -> Result<Vec<String>, Box<dyn Error>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            events: Default::default(),
            processor: Box::new(processor),
        }
    }
}

impl AssetParser for ClosureParser {
    fn events(&self) -> &EventChannel<ParserEvent> {
        &self.events
    }

    fn parse(
        &mut self,
        file: &File,
        _options: Arc<LoadOptions>,
        library: Arc<RwLock<AssetLibrary>>,
    ) {
        let mut library = match library.write() {
            Ok(library) => library,
            Err(error) => {
                self.events.send(ParserEvent::Error(format!("{}", error)));
                return;
            }
        };
        match (self.processor)(file, &mut library) {
            Ok(dependencies) => {
                self.events.send(ParserEvent::Progress(1.0));
                self.events.send(ParserEvent::Complete { dependencies });
            }
            Err(error) => self.events.send(ParserEvent::Error(format!("{}", error))),
        }
    }
}
