//! Persistent local storage: invitation log, per-day counters, resume session.
//!
//! Everything lives in one JSON file. Each mutation is a single
//! read-modify-write, which is all the atomicity the agent needs: only one
//! page context runs the agent at a time, so there are no concurrent writers.

use crate::errors::AutomationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Minutes after which a persisted resume session is no longer honored.
pub const SESSION_TTL_MINUTES: i64 = 10;

/// One accepted invitation. Appended to the log, never mutated or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Checkpoint persisted right before a forced page reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeSession {
    pub total_accepted: u64,
    pub timestamp: DateTime<Utc>,
}

impl ResumeSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > chrono::Duration::minutes(SESSION_TTL_MINUTES)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    invitations: Vec<InvitationEntry>,
    #[serde(default)]
    daily_stats: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<ResumeSession>,
}

/// File-backed store shared by the agent and the control surface.
#[derive(Debug, Clone)]
pub struct InvitationStore {
    path: PathBuf,
}

impl InvitationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a log entry and bump the matching day's counter in one write.
    pub fn record_acceptance(
        &self,
        name: &str,
        profile_url: Option<String>,
    ) -> Result<InvitationEntry, AutomationError> {
        let entry = InvitationEntry {
            name: name.to_string(),
            profile_url,
            timestamp: Utc::now(),
        };
        let mut data = self.read()?;
        let day = entry.timestamp.format("%Y-%m-%d").to_string();
        *data.daily_stats.entry(day).or_default() += 1;
        data.invitations.push(entry.clone());
        self.write(&data)?;
        Ok(entry)
    }

    /// The full invitation log, in acceptance order.
    pub fn invitations(&self) -> Result<Vec<InvitationEntry>, AutomationError> {
        Ok(self.read()?.invitations)
    }

    /// Per-day acceptance counters keyed by `YYYY-MM-DD`.
    pub fn daily_stats(&self) -> Result<BTreeMap<String, u64>, AutomationError> {
        Ok(self.read()?.daily_stats)
    }

    /// Persist the resume checkpoint, replacing any previous one.
    pub fn save_session(&self, total_accepted: u64) -> Result<(), AutomationError> {
        let mut data = self.read()?;
        data.session = Some(ResumeSession {
            total_accepted,
            timestamp: Utc::now(),
        });
        self.write(&data)?;
        debug!(total_accepted, "saved resume session");
        Ok(())
    }

    /// The live resume session, if any. The TTL is enforced here: an expired
    /// record is cleared and reported as absent.
    pub fn load_session(&self) -> Result<Option<ResumeSession>, AutomationError> {
        let mut data = self.read()?;
        match data.session.take() {
            Some(session) if session.is_expired(Utc::now()) => {
                warn!(
                    total_accepted = session.total_accepted,
                    "discarding expired resume session"
                );
                self.write(&data)?;
                Ok(None)
            }
            Some(session) => Ok(Some(session)),
            None => Ok(None),
        }
    }

    pub fn clear_session(&self) -> Result<(), AutomationError> {
        let mut data = self.read()?;
        if data.session.take().is_some() {
            self.write(&data)?;
        }
        Ok(())
    }

    fn read(&self) -> Result<StoreData, AutomationError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &StoreData) -> Result<(), AutomationError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(data)?)?;
        Ok(())
    }
}
