use crate::{
    channel::EventChannel,
    options::LoadOptions,
    protocol::{AssetProtocol, File, ProtocolEvent, apply_byte_range},
};
use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
    thread::JoinHandle,
};

/// Protocol that fetches bytes from the local file system.
///
/// Each fetch runs on its own worker thread; completion surfaces on the next
/// maintenance pump. This is what the default protocol function of
/// [`LoadOptions`] instantiates.
#[derive(Default)]
pub struct FileProtocol {
    events: EventChannel<ProtocolEvent>,
    workers: Vec<JoinHandle<()>>,
}

impl AssetProtocol for FileProtocol {
    fn events(&self) -> &EventChannel<ProtocolEvent> {
        &self.events
    }

    fn fetch(&mut self, mut file: File, options: Arc<LoadOptions>) {
        let sender = self.events.sender();
        let offset = options.seeking_offset();
        let length = options.seeked_length();
        self.workers.push(std::thread::spawn(move || {
            let path = PathBuf::from(&file.resolved_filename);
            match std::fs::read(&path) {
                Ok(bytes) => match apply_byte_range(bytes, offset, length) {
                    Ok(bytes) => {
                        let _ = sender.send(ProtocolEvent::Progress(1.0));
                        file.data = bytes;
                        let _ = sender.send(ProtocolEvent::Complete(file));
                    }
                    Err(message) => {
                        let _ = sender.send(ProtocolEvent::Error(message));
                    }
                },
                Err(error) => {
                    let _ = sender.send(ProtocolEvent::Error(format!(
                        "failed to read `{}`: {}",
                        path.display(),
                        error
                    )));
                }
            }
        }));
    }

    fn file_exists(&self, filename: &str) -> bool {
        Path::new(filename).exists()
    }

    fn maintain(&mut self) -> Result<(), Box<dyn Error>> {
        self.workers.retain(|worker| !worker.is_finished());
        Ok(())
    }
}
