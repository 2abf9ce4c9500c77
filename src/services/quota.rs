use std::sync::Arc;

use chrono::Local;

use crate::db::{self, queries, SharedConnection};
use crate::models::UsageRecord;

pub const CHAT_FEATURE: &str = "chatbot";

pub trait Clock: Send + Sync {
    fn today(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        Local::now().format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("daily limit of {ceiling} messages reached")]
pub struct QuotaExceeded {
    pub ceiling: u32,
}

// Dropping a permit consumes nothing.
#[derive(Debug)]
#[must_use]
pub struct QuotaPermit {
    bypass: bool,
}

pub struct UsageGate {
    db: SharedConnection,
    clock: Arc<dyn Clock>,
    feature: String,
    ceiling: u32,
    admin: bool,
    limit_reached_on: Option<String>,
}

impl UsageGate {
    pub fn new(db: SharedConnection, clock: Arc<dyn Clock>, ceiling: u32, admin: bool) -> Self {
        Self {
            db,
            clock,
            feature: CHAT_FEATURE.to_string(),
            ceiling,
            admin,
            limit_reached_on: None,
        }
    }

    pub fn check_and_consume(&mut self) -> Result<QuotaPermit, QuotaExceeded> {
        if self.admin {
            return Ok(QuotaPermit { bypass: true });
        }

        if self.limit_reached() || self.used_today() >= self.ceiling {
            tracing::info!(ceiling = self.ceiling, "daily usage limit reached");
            self.limit_reached_on = Some(self.clock.today());
            return Err(QuotaExceeded {
                ceiling: self.ceiling,
            });
        }

        Ok(QuotaPermit { bypass: false })
    }

    pub fn consume(&mut self, permit: QuotaPermit) {
        if permit.bypass {
            return;
        }

        let today = self.clock.today();
        let record = UsageRecord {
            count: self.used_today() + 1,
            day: today.clone(),
        };

        let saved = db::lock(&self.db)
            .and_then(|conn| queries::save_usage_record(&conn, &self.feature, &record));
        if let Err(e) = saved {
            tracing::warn!(error = %e, "failed to persist usage record");
        }

        if record.count >= self.ceiling {
            self.limit_reached_on = Some(today);
        }
    }

    pub fn used_today(&self) -> u32 {
        let today = self.clock.today();
        let record = db::lock(&self.db)
            .and_then(|conn| queries::get_usage_record(&conn, &self.feature));

        match record {
            Ok(Some(r)) if r.day == today => r.count,
            Ok(_) => 0,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read usage record, assuming none");
                0
            }
        }
    }

    pub fn remaining(&self) -> Option<u32> {
        if self.admin {
            return None;
        }
        Some(self.ceiling.saturating_sub(self.used_today()))
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached_on
            .as_deref()
            .is_some_and(|day| day == self.clock.today())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    pub(crate) struct FixedClock(pub Mutex<String>);

    impl FixedClock {
        pub(crate) fn new(day: &str) -> Arc<Self> {
            Arc::new(Self(Mutex::new(day.to_string())))
        }

        pub(crate) fn set(&self, day: &str) {
            *self.0.lock().unwrap() = day.to_string();
        }
    }

    impl Clock for FixedClock {
        fn today(&self) -> String {
            self.0.lock().unwrap().clone()
        }
    }

    fn gate(clock: Arc<FixedClock>, ceiling: u32, admin: bool) -> UsageGate {
        let conn = db::shared(db::init_db(":memory:").unwrap());
        UsageGate::new(conn, clock, ceiling, admin)
    }

    #[test]
    fn test_refuses_after_ceiling_and_resets_next_day() {
        let clock = FixedClock::new("2025-06-16");
        let mut gate = gate(clock.clone(), 3, false);

        for _ in 0..3 {
            let permit = gate.check_and_consume().unwrap();
            gate.consume(permit);
        }
        assert_eq!(gate.used_today(), 3);
        assert!(gate.limit_reached());
        assert_eq!(gate.check_and_consume().unwrap_err(), QuotaExceeded { ceiling: 3 });
        assert_eq!(gate.used_today(), 3);

        clock.set("2025-06-17");
        assert!(!gate.limit_reached());
        assert_eq!(gate.used_today(), 0);
        assert!(gate.check_and_consume().is_ok());
    }

    #[test]
    fn test_unconsumed_permit_costs_nothing() {
        let clock = FixedClock::new("2025-06-16");
        let mut gate = gate(clock, 2, false);

        for _ in 0..5 {
            let _ = gate.check_and_consume().unwrap();
        }
        assert_eq!(gate.used_today(), 0);
        assert_eq!(gate.remaining(), Some(2));
    }

    #[test]
    fn test_admin_bypasses_and_never_counts() {
        let clock = FixedClock::new("2025-06-16");
        let mut gate = gate(clock, 1, true);

        for _ in 0..10 {
            let permit = gate.check_and_consume().unwrap();
            gate.consume(permit);
        }
        assert_eq!(gate.used_today(), 0);
        assert_eq!(gate.remaining(), None);
    }

    #[test]
    fn test_counter_survives_a_new_gate() {
        let clock = FixedClock::new("2025-06-16");
        let conn = db::shared(db::init_db(":memory:").unwrap());

        let mut first = UsageGate::new(conn.clone(), clock.clone(), 2, false);
        let permit = first.check_and_consume().unwrap();
        first.consume(permit);
        let permit = first.check_and_consume().unwrap();
        first.consume(permit);

        let mut reloaded = UsageGate::new(conn, clock, 2, false);
        assert!(reloaded.check_and_consume().is_err());
    }
}
