use std::sync::Arc;

use crate::services::platform::SpeechRecognizer;
use crate::services::voice::VoicePipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    Started,
    Stopped,
    Unsupported { first_notice: bool },
}

// Transcripts fill the input field and are never submitted on their own.
pub struct SpeechInput {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    listening: bool,
    unsupported_noticed: bool,
    input_field: String,
}

impl SpeechInput {
    pub fn new(recognizer: Option<Arc<dyn SpeechRecognizer>>) -> Self {
        Self {
            recognizer,
            listening: false,
            unsupported_noticed: false,
            input_field: String::new(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn input_field(&self) -> &str {
        &self.input_field
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input_field)
    }

    pub fn toggle_listening(&mut self, voice: &VoicePipeline) -> ListenOutcome {
        let Some(recognizer) = &self.recognizer else {
            let first_notice = !self.unsupported_noticed;
            self.unsupported_noticed = true;
            if first_notice {
                tracing::warn!("speech recognition is not supported on this host");
            }
            return ListenOutcome::Unsupported { first_notice };
        };

        if self.listening {
            recognizer.stop();
            self.listening = false;
            return ListenOutcome::Stopped;
        }

        // Keep the microphone from picking up the bot's own voice.
        voice.cancel();

        match recognizer.start() {
            Ok(()) => {
                self.listening = true;
                ListenOutcome::Started
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech capture failed to start");
                self.listening = false;
                ListenOutcome::Stopped
            }
        }
    }

    pub fn on_final_transcript(&mut self, transcript: &str) {
        self.input_field = transcript.trim().to_string();
        self.listening = false;
    }

    pub fn on_error(&mut self, error: &str) {
        tracing::debug!(error, "speech capture error");
        self.listening = false;
    }

    pub fn on_end(&mut self) {
        self.listening = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::services::voice::tests::{MockOutput, MockTts};
    use crate::services::voice::AudioCache;

    #[derive(Default)]
    struct MockRecognizer {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl SpeechRecognizer for MockRecognizer {
        fn start(&self) -> anyhow::Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn voice(output: Arc<MockOutput>) -> VoicePipeline {
        VoicePipeline::new(Arc::new(MockTts::default()), output, None, AudioCache::default())
    }

    #[test]
    fn test_unsupported_notice_surfaces_once() {
        let voice = voice(Arc::new(MockOutput::default()));
        let mut input = SpeechInput::new(None);

        assert_eq!(
            input.toggle_listening(&voice),
            ListenOutcome::Unsupported { first_notice: true }
        );
        assert_eq!(
            input.toggle_listening(&voice),
            ListenOutcome::Unsupported { first_notice: false }
        );
        assert!(!input.is_listening());
    }

    #[test]
    fn test_start_cancels_voice_then_toggle_stops() {
        let output = Arc::new(MockOutput::default());
        let voice = voice(output.clone());
        let recognizer = Arc::new(MockRecognizer::default());
        let mut input = SpeechInput::new(Some(recognizer.clone()));

        assert_eq!(input.toggle_listening(&voice), ListenOutcome::Started);
        assert!(input.is_listening());
        assert_eq!(*output.log.lock().unwrap(), vec!["stop".to_string()]);

        assert_eq!(input.toggle_listening(&voice), ListenOutcome::Stopped);
        assert!(!input.is_listening());
        assert_eq!(recognizer.starts.load(Ordering::SeqCst), 1);
        assert_eq!(recognizer.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transcript_fills_input_without_sending() {
        let voice = voice(Arc::new(MockOutput::default()));
        let mut input = SpeechInput::new(Some(Arc::new(MockRecognizer::default())));

        input.toggle_listening(&voice);
        input.on_final_transcript(" je voudrais un rendez-vous ");
        assert!(!input.is_listening());
        assert_eq!(input.input_field(), "je voudrais un rendez-vous");

        assert_eq!(input.take_input(), "je voudrais un rendez-vous");
        assert_eq!(input.input_field(), "");
    }

    #[test]
    fn test_error_and_end_clear_listening() {
        let voice = voice(Arc::new(MockOutput::default()));
        let mut input = SpeechInput::new(Some(Arc::new(MockRecognizer::default())));

        input.toggle_listening(&voice);
        input.on_error("no-speech");
        assert!(!input.is_listening());

        input.toggle_listening(&voice);
        input.on_end();
        assert!(!input.is_listening());
        assert_eq!(input.input_field(), "");
    }
}
