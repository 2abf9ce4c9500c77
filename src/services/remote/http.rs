use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use super::{
    AppointmentProvider, AppointmentRequest, ChatProvider, ChatRequest, ChatResponse, QaTopic,
    SpeechProvider,
};
use crate::models::AudioClip;

pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TtsResponse {
    #[serde(default)]
    success: bool,
    audio: Option<String>,
    format: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ChatProvider for HttpBackend {
    async fn chat(&self, request: &ChatRequest) -> anyhow::Result<String> {
        let resp = self
            .post("/api/chat")
            .json(request)
            .send()
            .await
            .context("failed to call chat endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("chat endpoint error ({status})");
        }

        let data: ChatResponse = resp
            .json()
            .await
            .context("failed to parse chat response")?;

        if !data.success {
            anyhow::bail!(
                "chat endpoint reported failure: {}",
                data.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        data.response
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing response in chat reply"))
    }

    async fn ask(&self, topic: QaTopic, question: &str) -> anyhow::Result<String> {
        let path = match topic {
            QaTopic::Profile => "/api/profile/ask",
            QaTopic::Analytics => "/api/analytics/ask",
        };

        let resp = self
            .post(path)
            .json(&json!({ "question": question }))
            .send()
            .await
            .with_context(|| format!("failed to call {path}"))?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("{path} error ({status}): {data}");
        }

        data["answer"]
            .as_str()
            .or_else(|| data["response"].as_str())
            .filter(|a| !a.trim().is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing answer in {path} response"))
    }
}

#[async_trait]
impl AppointmentProvider for HttpBackend {
    async fn create_appointment(&self, request: &AppointmentRequest) -> anyhow::Result<()> {
        let resp = self
            .post("/api/appointments")
            .json(request)
            .send()
            .await
            .context("failed to call appointment endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("appointment endpoint error ({status})");
        }

        let data: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        if data["success"] == json!(false) || data["error"].is_string() {
            anyhow::bail!("appointment endpoint reported failure: {}", data["error"]);
        }

        Ok(())
    }
}

#[async_trait]
impl SpeechProvider for HttpBackend {
    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioClip> {
        let resp = self
            .post("/api/tts")
            .json(&json!({ "text": text }))
            .send()
            .await
            .context("failed to call text-to-speech endpoint")?
            .error_for_status()
            .context("text-to-speech endpoint returned error")?;

        let data: TtsResponse = resp
            .json()
            .await
            .context("failed to parse text-to-speech response")?;

        let audio = match (data.success, data.audio) {
            (true, Some(audio)) => audio,
            _ => anyhow::bail!("text-to-speech endpoint reported failure"),
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio.as_bytes())
            .context("failed to decode text-to-speech audio")?;

        Ok(AudioClip {
            bytes,
            format: data.format.unwrap_or_else(|| "mp3".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::remote::HistoryEntry;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(server.uri(), Some("issued-token".to_string()))
    }

    #[tokio::test]
    async fn test_chat_sends_history_and_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("authorization", "Bearer issued-token"))
            .and(body_json(json!({
                "message": "Bonjour",
                "conversationHistory": [{"role": "assistant", "content": "Salut !"}],
                "profileContext": "ctx"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "response": "Bonjour à vous"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend(&server)
            .chat(&ChatRequest {
                message: "Bonjour".to_string(),
                conversation_history: vec![HistoryEntry {
                    role: "assistant".to_string(),
                    content: "Salut !".to_string(),
                }],
                profile_context: "ctx".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "Bonjour à vous");
    }

    #[tokio::test]
    async fn test_chat_reported_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "quota"})),
            )
            .mount(&server)
            .await;

        let result = backend(&server)
            .chat(&ChatRequest {
                message: "x".to_string(),
                conversation_history: vec![],
                profile_context: String::new(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ask_accepts_answer_or_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profile/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "Dix ans"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/analytics/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "42"})))
            .mount(&server)
            .await;

        let backend = backend(&server);
        assert_eq!(backend.ask(QaTopic::Profile, "exp ?").await.unwrap(), "Dix ans");
        assert_eq!(backend.ask(QaTopic::Analytics, "visites ?").await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_appointment_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/appointments"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let request = AppointmentRequest {
            full_name: "Jean Dupont".to_string(),
            email: "jean@ex.com".to_string(),
            company: String::new(),
            phone: String::new(),
            preferred_slot: "mardi 14h".to_string(),
            message: "rdv".to_string(),
            source: "chatbot".to_string(),
            context: String::new(),
        };
        assert!(backend(&server).create_appointment(&request).await.is_err());
    }

    #[tokio::test]
    async fn test_tts_decodes_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tts"))
            .and(body_json(json!({"text": "Bonjour"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "audio": "AQID",
                "format": "wav"
            })))
            .mount(&server)
            .await;

        let clip = backend(&server).synthesize("Bonjour").await.unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3]);
        assert_eq!(clip.format, "wav");
    }

    #[tokio::test]
    async fn test_tts_bad_payload_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "audio": "***not base64***"
            })))
            .mount(&server)
            .await;

        assert!(backend(&server).synthesize("Bonjour").await.is_err());
    }
}
