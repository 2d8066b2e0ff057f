// Browser audio over HtmlAudioElement. Playback start is asynchronous, so
// refusals arrive later through the shared failure queue.
use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlAudioElement;

use crate::sounds::backend::{ActiveSound, AudioBackend, PlayRequest, PlaybackError, PlaybackTicket};

// 8 samples of 8-bit silence; enough for iOS/Safari to count as a played element.
const SILENT_WAV: &str =
    "data:audio/wav;base64,UklGRiwAAABXQVZFZm10IBAAAAABAAEAQB8AAEAfAAABAAgAZGF0YQgAAACAgICAgICAgA==";

type FailureQueue = Rc<RefCell<Vec<(PlaybackTicket, PlaybackError)>>>;

#[derive(Default)]
pub struct WebAudioBackend {
    failures: FailureQueue,
}

pub struct WebSound {
    audio: HtmlAudioElement,
}

impl ActiveSound for WebSound {
    fn halt(&mut self) {
        let _ = self.audio.pause();
        self.audio.set_current_time(0.0);
    }

    fn is_finished(&self) -> bool {
        self.audio.ended() || self.audio.error().is_some()
    }
}

impl AudioBackend for WebAudioBackend {
    type Clip = HtmlAudioElement;
    type Sound = WebSound;

    fn load(&mut self, url: &str) -> Result<Self::Clip, PlaybackError> {
        let audio = new_audio(url)?;
        audio.load();
        Ok(audio)
    }

    fn start(
        &mut self,
        request: &PlayRequest<'_>,
        clip: Option<&Self::Clip>,
    ) -> Result<Self::Sound, PlaybackError> {
        // A fresh element per playback; replaying the cached one would cut it off
        // when two previews overlap. The cached element keeps the resource warm.
        let audio = match clip {
            Some(cached) => cached
                .clone_node()
                .ok()
                .and_then(|node| node.dyn_into::<HtmlAudioElement>().ok())
                .map_or_else(|| new_audio(request.url), Ok)?,
            None => new_audio(request.url)?,
        };
        audio.set_volume(request.volume);
        audio.set_loop(request.looped);

        let promise = audio
            .play()
            .map_err(|err| classify_js_error(request.url, &err))?;
        watch_play(promise, request.url.to_string(), request.ticket, &self.failures);

        Ok(WebSound { audio })
    }

    fn unlock(&mut self) -> Result<(), PlaybackError> {
        let audio = new_audio(SILENT_WAV)?;
        audio.set_volume(0.0);
        let promise = audio
            .play()
            .map_err(|err| classify_js_error("silent unlock", &err))?;
        watch_play(
            promise,
            "silent unlock".to_string(),
            PlaybackTicket::UNLOCK,
            &self.failures,
        );
        Ok(())
    }

    fn take_failures(&mut self) -> Vec<(PlaybackTicket, PlaybackError)> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }
}

fn new_audio(url: &str) -> Result<HtmlAudioElement, PlaybackError> {
    let audio = HtmlAudioElement::new_with_src(url)
        .map_err(|err| PlaybackError::OutputUnavailable(js_error_text(&err)))?;
    audio.set_preload("auto");
    Ok(audio)
}

fn watch_play(promise: js_sys::Promise, url: String, ticket: PlaybackTicket, failures: &FailureQueue) {
    let failures = Rc::clone(failures);
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
            failures
                .borrow_mut()
                .push((ticket, classify_js_error(&url, &err)));
        }
    });
}

fn classify_js_error(url: &str, err: &JsValue) -> PlaybackError {
    let name = err
        .dyn_ref::<web_sys::DomException>()
        .map(|exception| exception.name())
        .unwrap_or_default();
    match name.as_str() {
        "NotAllowedError" => PlaybackError::PermissionDenied(js_error_text(err)),
        "AbortError" => PlaybackError::resource(url, "playback was aborted before the sound loaded"),
        "NotSupportedError" => PlaybackError::resource(url, "no supported source was found"),
        _ => PlaybackError::resource(url, js_error_text(err)),
    }
}

fn js_error_text(err: &JsValue) -> String {
    if let Some(exception) = err.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
