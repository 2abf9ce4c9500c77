pub mod cache;
pub mod normalize;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::AudioClip;
use crate::services::platform::{AudioOutput, LocalSynthesizer};
use crate::services::remote::SpeechProvider;

pub use cache::{cache_key, AudioCache};
pub use normalize::normalize_for_speech;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("local speech synthesis is not available")]
    SynthesisUnavailable,

    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
enum VoiceStrategy {
    RemoteTts,
    LocalSynthesis,
}

// Tried in order until one yields something playable.
const VOICE_CHAIN: [VoiceStrategy; 2] = [VoiceStrategy::RemoteTts, VoiceStrategy::LocalSynthesis];

enum Playback {
    Clip { clip: Arc<AudioClip>, text: String },
    Speech(String),
}

// Shared with the host so voice can be muted or stopped while a turn is in flight.
pub struct VoiceControl {
    enabled: AtomicBool,
    speaking: AtomicBool,
    // Bumped by every cancellation; a playback only owns `speaking` while
    // its generation is current.
    generation: AtomicU64,
    output: Arc<dyn AudioOutput>,
    synth: Option<Arc<dyn LocalSynthesizer>>,
}

impl VoiceControl {
    fn new(output: Arc<dyn AudioOutput>, synth: Option<Arc<dyn LocalSynthesizer>>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            speaking: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            output,
            synth,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.cancel();
        }
    }

    // Synchronous and immediate: in-flight fetches are dropped on return.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.output.stop();
        if let Some(synth) = &self.synth {
            synth.cancel();
        }
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_enabled() && self.generation.load(Ordering::SeqCst) == generation
    }
}

// Speaks bot replies: remote text-to-speech through the audio cache, local
// synthesis when that fails. One playback at a time.
pub struct VoicePipeline {
    tts: Arc<dyn SpeechProvider>,
    cache: AudioCache,
    control: Arc<VoiceControl>,
}

impl VoicePipeline {
    pub fn new(
        tts: Arc<dyn SpeechProvider>,
        output: Arc<dyn AudioOutput>,
        synth: Option<Arc<dyn LocalSynthesizer>>,
        cache: AudioCache,
    ) -> Self {
        Self {
            tts,
            cache,
            control: Arc::new(VoiceControl::new(output, synth)),
        }
    }

    pub fn control(&self) -> Arc<VoiceControl> {
        self.control.clone()
    }

    pub fn is_speaking(&self) -> bool {
        self.control.is_speaking()
    }

    pub fn is_enabled(&self) -> bool {
        self.control.is_enabled()
    }

    pub fn cache(&self) -> &AudioCache {
        &self.cache
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.control.set_enabled(enabled);
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub async fn speak(&mut self, text: &str) {
        if !self.control.is_enabled() || text.trim().is_empty() {
            return;
        }

        self.control.cancel();
        let generation = self.control.generation.load(Ordering::SeqCst);
        self.control.speaking.store(true, Ordering::SeqCst);

        for strategy in VOICE_CHAIN {
            match self.prepare(strategy, text).await {
                // Muted or superseded while fetching: cancel already cleared `speaking`.
                Ok(_) if !self.control.is_current(generation) => return,
                Ok(playback) => {
                    self.start(generation, playback);
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, strategy = ?strategy, "voice strategy failed, falling through");
                }
            }
        }

        if self.control.is_current(generation) {
            self.control.speaking.store(false, Ordering::SeqCst);
        }
    }

    async fn prepare(&mut self, strategy: VoiceStrategy, text: &str) -> Result<Playback, VoiceError> {
        match strategy {
            VoiceStrategy::RemoteTts => {
                let key = cache_key(text);
                if let Some(clip) = self.cache.get(&key) {
                    tracing::debug!("audio cache hit");
                    return Ok(Playback::Clip {
                        clip,
                        text: text.to_string(),
                    });
                }

                let clip = Arc::new(self.tts.synthesize(text).await?);
                if let Some(evicted) = self.cache.insert(key, clip.clone()) {
                    tracing::debug!(evicted = %evicted.chars().take(24).collect::<String>(), "audio cache eviction");
                }
                Ok(Playback::Clip {
                    clip,
                    text: text.to_string(),
                })
            }
            VoiceStrategy::LocalSynthesis => match self.control.synth {
                Some(_) => Ok(Playback::Speech(normalize_for_speech(text))),
                None => Err(VoiceError::SynthesisUnavailable),
            },
        }
    }

    fn start(&self, generation: u64, playback: Playback) {
        let control = self.control.clone();

        tokio::spawn(async move {
            if !control.is_current(generation) {
                return;
            }

            let result = match playback {
                Playback::Clip { clip, text } => match control.output.play(&clip).await {
                    Err(e) if control.is_current(generation) => {
                        tracing::warn!(error = %e, "audio playback failed, using local synthesis");
                        match &control.synth {
                            Some(synth) => synth.speak(&normalize_for_speech(&text)).await,
                            None => Err(e),
                        }
                    }
                    other => other,
                },
                Playback::Speech(text) => match &control.synth {
                    Some(synth) => synth.speak(&text).await,
                    None => Ok(()),
                },
            };

            if let Err(e) = result {
                tracing::warn!(error = %e, "voice playback ended with error");
            }
            if control.is_current(generation) {
                control.speaking.store(false, Ordering::SeqCst);
            }
        });
    }
}
