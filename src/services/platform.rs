use async_trait::async_trait;

use crate::models::AudioClip;

#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, clip: &AudioClip) -> anyhow::Result<()>;

    // Must take effect immediately.
    fn stop(&self);
}

#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> anyhow::Result<()>;

    fn cancel(&self);
}

pub trait SpeechRecognizer: Send + Sync {
    fn start(&self) -> anyhow::Result<()>;
    fn stop(&self);
}
