use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use portfolio_assistant::config::AppConfig;
use portfolio_assistant::db;
use portfolio_assistant::handlers;
use portfolio_assistant::services::conversation::{Assistant, Capabilities, Collaborators};
use portfolio_assistant::services::platform::{LocalSynthesizer, SpeechRecognizer};
use portfolio_assistant::services::quota::SystemClock;
use portfolio_assistant::services::relay::BrowserRelay;
use portfolio_assistant::services::remote::http::HttpBackend;
use portfolio_assistant::services::theme::{self, ThemeBus};
use portfolio_assistant::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::shared(db::init_db(&config.store_path)?);

    tracing::info!("using collaborator endpoints at {}", config.api_base_url);
    let backend = Arc::new(HttpBackend::new(
        config.api_base_url.clone(),
        config.api_token.clone(),
    ));

    let relay = BrowserRelay::new();
    let synthesizer: Option<Arc<dyn LocalSynthesizer>> = if config.local_synthesis {
        Some(relay.clone())
    } else {
        tracing::warn!("local speech synthesis disabled");
        None
    };
    let recognizer: Option<Arc<dyn SpeechRecognizer>> = if config.speech_input {
        Some(relay.clone())
    } else {
        tracing::warn!("speech input disabled");
        None
    };

    let theme_bus = ThemeBus::new();
    theme::spawn_preference_writer(conn.clone(), &theme_bus);

    let assistant = Assistant::new(
        config.assistant(),
        Collaborators {
            chat: backend.clone(),
            appointments: backend.clone(),
            speech: backend,
        },
        Capabilities {
            output: relay.clone(),
            synthesizer,
            recognizer,
        },
        conn.clone(),
        Arc::new(SystemClock),
        theme_bus.clone(),
    );

    let voice = assistant.voice_control();
    let state = Arc::new(AppState {
        db: conn,
        config: config.clone(),
        assistant: Mutex::new(assistant),
        voice,
        relay,
        theme_bus,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/dev", get(handlers::dev::dev_page))
        .route("/api/dev/history", get(handlers::dev::get_history))
        .route("/api/dev/turn", post(handlers::dev::send_turn))
        .route("/api/dev/voice", post(handlers::dev::set_voice))
        .route("/api/dev/voice/stop", post(handlers::dev::stop_voice))
        .route("/api/dev/listen", post(handlers::dev::toggle_listening))
        .route("/api/dev/transcript", post(handlers::dev::speech_event))
        .route("/api/dev/playback/ended", post(handlers::dev::playback_ended))
        .route("/api/dev/consent", post(handlers::dev::set_consent))
        .route("/api/dev/events", get(handlers::events::events_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("127.0.0.1:{}", config.port);
    tracing::info!("dev host listening on http://{addr}/dev");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
