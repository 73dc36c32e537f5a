//! Caller-owned sessions.
//!
//! A [`Session`] accumulates the audit entries of every run made with it.
//! Nothing is global: a service shell keeps sessions in a
//! [`SessionRegistry`] and passes one into each deliberation.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use nyaya_core::{AuditEntry, Verdict};

/// History of one conversation with the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    history: Vec<AuditEntry>,
    runs: usize,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            history: Vec::new(),
            runs: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a finished run's audit log.
    pub fn record(&mut self, verdict: &Verdict) {
        self.history.extend(verdict.logs().entries().iter().cloned());
        self.runs += 1;
    }

    /// Clear accumulated history.
    pub fn reset(&mut self) {
        self.history.clear();
        self.runs = 0;
        tracing::info!(session = %self.id, "Session reset");
    }

    pub fn history(&self) -> &[AuditEntry] {
        &self.history
    }

    /// Number of runs recorded since creation or the last reset.
    pub fn runs(&self) -> usize {
        self.runs
    }
}

/// Sessions keyed by id, for a service that serves many callers.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().get(id) {
            return session.clone();
        }
        self.sessions
            .write()
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(id))))
            .clone()
    }

    /// Reset a session's history. Returns false if no such session exists.
    pub fn reset(&self, id: &str) -> bool {
        match self.sessions.read().get(id) {
            Some(session) => {
                session.lock().reset();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyaya_core::{AuditLog, StageKind};

    fn refused() -> Verdict {
        let mut logs = AuditLog::new();
        logs.record(StageKind::Language, "someone stole my bike");
        logs.record(StageKind::Ethics, "VETO Triggered: Violence");
        Verdict::Refused {
            reason: "Violence".to_string(),
            logs,
        }
    }

    #[test]
    fn test_record_and_reset() {
        let mut session = Session::new("s1");
        session.record(&refused());
        session.record(&refused());

        assert_eq!(session.runs(), 2);
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[1].agent, "Ethics");

        session.reset();
        assert_eq!(session.runs(), 0);
        assert!(session.history().is_empty());
        assert_eq!(session.id(), "s1");
    }

    #[test]
    fn test_registry_returns_same_session() {
        let registry = SessionRegistry::new();
        let a = registry.get_or_create("abc");
        a.lock().record(&refused());

        let b = registry.get_or_create("abc");
        assert_eq!(b.lock().runs(), 1);
        assert_eq!(registry.len(), 1);

        assert!(registry.reset("abc"));
        assert_eq!(a.lock().runs(), 0);
        assert!(!registry.reset("missing"));

        assert!(registry.remove("abc").is_some());
        assert!(registry.is_empty());
    }
}
