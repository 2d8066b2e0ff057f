// Desktop audio over rodio. Sound files are read from the asset directory.
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use crate::sounds::backend::{ActiveSound, AudioBackend, PlayRequest, PlaybackError, PlaybackTicket};

pub const ASSET_DIR_ENV: &str = "SOUNDCUE_ASSET_DIR";
const DEFAULT_ASSET_DIR: &str = "assets";

pub struct RodioBackend {
    asset_root: PathBuf,
    // Opened lazily: headless machines should still start the app.
    output: Option<(OutputStream, OutputStreamHandle)>,
}

impl Default for RodioBackend {
    fn default() -> Self {
        let asset_root = std::env::var(ASSET_DIR_ENV)
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSET_DIR));
        Self::new(asset_root)
    }
}

impl RodioBackend {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            output: None,
        }
    }

    fn output_handle(&mut self) -> Result<&OutputStreamHandle, PlaybackError> {
        if self.output.is_none() {
            let output = OutputStream::try_default()
                .map_err(|err| PlaybackError::OutputUnavailable(err.to_string()))?;
            debug!("opened default audio output");
            self.output = Some(output);
        }
        self.output
            .as_ref()
            .map(|(_, handle)| handle)
            .ok_or_else(|| PlaybackError::OutputUnavailable("no output stream".to_string()))
    }

    fn read(&self, url: &str) -> Result<Arc<[u8]>, PlaybackError> {
        let path = asset_path(&self.asset_root, url);
        let bytes = std::fs::read(&path)
            .map_err(|err| PlaybackError::resource(url, format!("{}: {err}", path.display())))?;
        Ok(Arc::from(bytes))
    }
}

pub struct RodioSound {
    sink: Sink,
}

impl ActiveSound for RodioSound {
    fn halt(&mut self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}

impl AudioBackend for RodioBackend {
    type Clip = Arc<[u8]>;
    type Sound = RodioSound;

    fn load(&mut self, url: &str) -> Result<Self::Clip, PlaybackError> {
        let bytes = self.read(url)?;
        Decoder::new(Cursor::new(Arc::clone(&bytes)))
            .map_err(|err| PlaybackError::resource(url, err.to_string()))?;
        Ok(bytes)
    }

    fn start(
        &mut self,
        request: &PlayRequest<'_>,
        clip: Option<&Self::Clip>,
    ) -> Result<Self::Sound, PlaybackError> {
        let bytes = match clip {
            Some(bytes) => Arc::clone(bytes),
            None => self.read(request.url)?,
        };
        let source = Decoder::new(Cursor::new(bytes))
            .map_err(|err| PlaybackError::resource(request.url, err.to_string()))?;

        let handle = self.output_handle()?;
        let sink = Sink::try_new(handle)
            .map_err(|err| PlaybackError::OutputUnavailable(err.to_string()))?;
        sink.set_volume(request.volume as f32);
        if request.looped {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }
        Ok(RodioSound { sink })
    }

    /// Desktop output has no autoplay gate; opening the device is enough.
    fn unlock(&mut self) -> Result<(), PlaybackError> {
        self.output_handle().map(|_| ())
    }

    fn take_failures(&mut self) -> Vec<(PlaybackTicket, PlaybackError)> {
        Vec::new()
    }
}

fn asset_path(root: &Path, url: &str) -> PathBuf {
    root.join(url.trim_start_matches('/'))
}
