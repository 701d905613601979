use crate::cipher::Key;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollMetadata {
    pub poll_id: Uuid,
    pub title: String,
    pub organization: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub has_voted: bool,
    pub vote_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    CreatePoll { poll_id: Uuid },
    AddVoter { email: String },
    RemoveVoter { email: String },
    CastVote { email: String, option: String },
}

impl AuditEvent {
    pub fn action(&self) -> &'static str {
        match self {
            AuditEvent::CreatePoll { .. } => "CREATE_POLL",
            AuditEvent::AddVoter { .. } => "ADD_VOTER",
            AuditEvent::RemoveVoter { .. } => "REMOVE_VOTER",
            AuditEvent::CastVote { .. } => "CAST_VOTE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub event: AuditEvent,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn now(event: AuditEvent) -> Self {
        AuditEntry {
            event,
            timestamp: Utc::now(),
        }
    }
}

/// Everything known about one poll. This is what gets encrypted at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRecord {
    pub metadata: PollMetadata,
    /// Option label -> vote count, in the order the organizer listed them.
    pub options: IndexMap<String, u64>,
    /// Keyed by email.
    pub voters: IndexMap<String, Voter>,
    pub audit_log: Vec<AuditEntry>,
}

impl PollRecord {
    pub fn new(metadata: PollMetadata, option_labels: &[String]) -> Self {
        let poll_id = metadata.poll_id;
        PollRecord {
            metadata,
            options: option_labels.iter().map(|label| (label.clone(), 0)).collect(),
            voters: IndexMap::new(),
            audit_log: vec![AuditEntry::now(AuditEvent::CreatePoll { poll_id })],
        }
    }

    pub fn log(&mut self, event: AuditEvent) {
        debug!(poll_id = %self.metadata.poll_id, action = event.action(), "audit entry");
        self.audit_log.push(AuditEntry::now(event));
    }

    /// Linear scan: the record is keyed by email, not by token.
    pub fn voter_by_token(&self, token: &str) -> Option<(&String, &Voter)> {
        self.voters.iter().find(|(_, voter)| voter.vote_token == token)
    }
}

/// Where a vote token leads: the poll and the key needed to open it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub poll_id: Uuid,
    pub key: Key,
}

pub type TokenIndex = IndexMap<String, TokenEntry>;
