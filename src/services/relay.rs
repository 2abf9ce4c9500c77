use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::models::AudioClip;
use crate::services::platform::{AudioOutput, LocalSynthesizer, SpeechRecognizer};

// Longest we wait for the page to report the end of a playback.
const PLAYBACK_TIMEOUT: Duration = Duration::from_secs(120);

// Commands pushed to the dev page, which owns the real speaker and microphone.
// The page echoes `id` back when a playback ends.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    PlayAudio { id: u64, format: String, audio: String },
    SpeakLocally { id: u64, text: String },
    StopPlayback,
    StartListening,
    StopListening,
}

pub struct BrowserRelay {
    tx: broadcast::Sender<HostCommand>,
    // Id of the playback the page is currently running.
    current: AtomicU64,
    // Highest playback id known to be over.
    ended: watch::Sender<u64>,
}

impl BrowserRelay {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        let (ended, _) = watch::channel(0);
        Arc::new(Self {
            tx,
            current: AtomicU64::new(0),
            ended,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostCommand> {
        self.tx.subscribe()
    }

    // Reports for anything but the current playback are stale and ignored.
    pub fn playback_ended(&self, id: u64) {
        if id != self.current.load(Ordering::SeqCst) {
            tracing::debug!(id, "ignoring stale playback report");
            return;
        }
        self.finish(id);
    }

    fn finish(&self, id: u64) {
        self.ended.send_modify(|done| *done = (*done).max(id));
    }

    fn send(&self, command: HostCommand) -> anyhow::Result<()> {
        self.tx
            .send(command)
            .map(|_| ())
            .map_err(|_| anyhow::anyhow!("no host page connected"))
    }

    async fn run(&self, command: impl FnOnce(u64) -> HostCommand) -> anyhow::Result<()> {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let mut done = self.ended.subscribe();
        self.send(command(id))?;

        let finished = done.wait_for(|ended| *ended >= id);
        if tokio::time::timeout(PLAYBACK_TIMEOUT, finished).await.is_err() {
            tracing::debug!(id, "host page never reported playback end");
        }
        Ok(())
    }
}

#[async_trait]
impl AudioOutput for BrowserRelay {
    async fn play(&self, clip: &AudioClip) -> anyhow::Result<()> {
        let audio = base64::engine::general_purpose::STANDARD.encode(&clip.bytes);
        let format = clip.format.clone();
        self.run(|id| HostCommand::PlayAudio { id, format, audio }).await
    }

    fn stop(&self) {
        let _ = self.tx.send(HostCommand::StopPlayback);
        self.finish(self.current.load(Ordering::SeqCst));
    }
}

#[async_trait]
impl LocalSynthesizer for BrowserRelay {
    async fn speak(&self, text: &str) -> anyhow::Result<()> {
        let text = text.to_string();
        self.run(|id| HostCommand::SpeakLocally { id, text }).await
    }

    fn cancel(&self) {
        AudioOutput::stop(self);
    }
}

impl SpeechRecognizer for BrowserRelay {
    fn start(&self) -> anyhow::Result<()> {
        self.send(HostCommand::StartListening)
    }

    fn stop(&self) {
        let _ = self.tx.send(HostCommand::StopListening);
    }
}
