use tokio::sync::broadcast;

use crate::db::{self, queries, SharedConnection};
use crate::models::ThemeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ThemeChange {
    pub theme: ThemeKey,
}

#[derive(Clone)]
pub struct ThemeBus {
    tx: broadcast::Sender<ThemeChange>,
}

impl Default for ThemeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn emit(&self, theme: ThemeKey) {
        // No listeners is fine.
        let _ = self.tx.send(ThemeChange { theme });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.tx.subscribe()
    }
}

pub fn spawn_preference_writer(conn: SharedConnection, bus: &ThemeBus) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(change) => {
                    let saved = db::lock(&conn)
                        .and_then(|guard| queries::set_theme_preference(&guard, change.theme));
                    match saved {
                        Ok(()) => tracing::info!(theme = change.theme.as_str(), "theme preference saved"),
                        Err(e) => tracing::warn!(error = %e, "failed to save theme preference"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_the_change() {
        let bus = ThemeBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(ThemeKey::Dark);
        assert_eq!(a.recv().await.unwrap().theme, ThemeKey::Dark);
        assert_eq!(b.recv().await.unwrap().theme, ThemeKey::Dark);
    }

    #[tokio::test]
    async fn test_preference_writer_persists_theme() {
        let conn = db::shared(db::init_db(":memory:").unwrap());
        let bus = ThemeBus::new();
        let writer = spawn_preference_writer(conn.clone(), &bus);

        bus.emit(ThemeKey::Dark);
        drop(bus);
        writer.await.unwrap();

        let stored = queries::get_theme_preference(&conn.lock().unwrap()).unwrap();
        assert_eq!(stored, Some(ThemeKey::Dark));
    }
}
