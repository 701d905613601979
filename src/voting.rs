use crate::cipher::{self, Key};
use crate::db::models::{AuditEntry, AuditEvent, PollMetadata, PollRecord, TokenEntry, Voter};
use crate::db::{PollRepository, TokenRepository};
use crate::error::PollError;
use crate::locks::KeyedLocks;
use crate::storage::ObjectStore;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewPoll {
    pub title: String,
    pub option_labels: Vec<String>,
    pub organization: Option<String>,
    pub logo: Option<String>,
}

/// What a voter sees before casting their vote.
#[derive(Debug, Clone, Serialize)]
pub struct Ballot {
    pub options: Vec<String>,
    pub metadata: PollMetadata,
    pub already_voted: bool,
}

/// Result of a cast. Rejections here are normal outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    AlreadyVoted,
    UnknownOption,
}

impl VoteOutcome {
    pub fn success(self) -> bool {
        self == VoteOutcome::Recorded
    }
}

/// Poll lifecycle on top of the record store and the token index.
///
/// Every read-modify-write of a poll record runs under that poll's lock, and
/// every read-modify-write of the token index runs under `index_lock`. When
/// both are needed the poll lock is taken first.
pub struct PollService<S> {
    polls: PollRepository<S>,
    tokens: TokenRepository<S>,
    poll_locks: KeyedLocks<Uuid>,
    index_lock: Mutex<()>,
}

impl<S: ObjectStore> PollService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        PollService {
            polls: PollRepository::new(storage.clone()),
            tokens: TokenRepository::new(storage),
            poll_locks: KeyedLocks::new(),
            index_lock: Mutex::new(()),
        }
    }

    /// The returned key is not kept anywhere; losing it loses the poll.
    pub async fn create_poll(&self, poll: NewPoll) -> Result<(Uuid, Key), PollError> {
        let poll_id = Uuid::new_v4();
        let key = cipher::generate_key();

        let record = PollRecord::new(
            PollMetadata {
                poll_id,
                title: poll.title,
                organization: poll.organization,
                logo: poll.logo,
            },
            &poll.option_labels,
        );

        self.polls.save(poll_id, &record, &key).await?;
        info!(%poll_id, options = record.options.len(), "poll created");

        Ok((poll_id, key))
    }

    pub async fn get_poll(&self, poll_id: Uuid, key: &Key) -> Result<PollRecord, PollError> {
        self.polls.load(poll_id, key).await
    }

    pub async fn get_audit_log(
        &self,
        poll_id: Uuid,
        key: &Key,
    ) -> Result<Vec<AuditEntry>, PollError> {
        Ok(self.polls.load(poll_id, key).await?.audit_log)
    }

    /// Registers `email` and returns their fresh vote token.
    ///
    /// Re-adding a voter who has not voted yet replaces their token; the old
    /// token stays in the index and no longer matches any voter. A voter who
    /// has already voted cannot be re-added.
    pub async fn add_voter(
        &self,
        poll_id: Uuid,
        key: &Key,
        email: &str,
    ) -> Result<String, PollError> {
        let _poll_guard = self.poll_locks.lock(&poll_id).await;

        let mut record = self.polls.load(poll_id, key).await?;
        if record.voters.get(email).is_some_and(|voter| voter.has_voted) {
            return Err(PollError::InvalidState(
                "cannot re-add a voter who has already voted".to_owned(),
            ));
        }
        let vote_token = Uuid::new_v4().to_string();

        // Index first: if the record save fails the token is left unmatched,
        // never a voter without a token.
        {
            let _index_guard = self.index_lock.lock().await;
            let mut index = self.tokens.load().await?;
            index.insert(
                vote_token.clone(),
                TokenEntry {
                    poll_id,
                    key: key.clone(),
                },
            );
            self.tokens.save(&index).await?;
        }

        let replaced = record.voters.insert(
            email.to_owned(),
            Voter {
                has_voted: false,
                vote_token: vote_token.clone(),
            },
        );
        if replaced.is_some() {
            warn!(%poll_id, "voter re-added, previous vote token orphaned");
        }
        record.log(AuditEvent::AddVoter {
            email: email.to_owned(),
        });
        self.polls.save(poll_id, &record, key).await?;

        info!(%poll_id, voters = record.voters.len(), "voter added");
        Ok(vote_token)
    }

    pub async fn remove_voter(&self, poll_id: Uuid, key: &Key, email: &str) -> Result<(), PollError> {
        let _poll_guard = self.poll_locks.lock(&poll_id).await;

        let mut record = self.polls.load(poll_id, key).await?;
        let voter = record.voters.get(email).ok_or(PollError::VoterNotFound)?;
        if voter.has_voted {
            return Err(PollError::InvalidState(
                "cannot remove a voter who has already voted".to_owned(),
            ));
        }

        let vote_token = voter.vote_token.clone();
        record.voters.shift_remove(email);
        record.log(AuditEvent::RemoveVoter {
            email: email.to_owned(),
        });
        self.polls.save(poll_id, &record, key).await?;

        {
            let _index_guard = self.index_lock.lock().await;
            let mut index = self.tokens.load().await?;
            if index.shift_remove(&vote_token).is_some() {
                self.tokens.save(&index).await?;
            }
        }

        info!(%poll_id, voters = record.voters.len(), "voter removed");
        Ok(())
    }

    pub async fn get_ballot(&self, token: &str) -> Result<Ballot, PollError> {
        let entry = self.resolve_token(token).await?;
        let record = self.polls.load(entry.poll_id, &entry.key).await?;

        let (_, voter) = record.voter_by_token(token).ok_or(PollError::InvalidToken)?;
        Ok(Ballot {
            already_voted: voter.has_voted,
            options: record.options.keys().cloned().collect(),
            metadata: record.metadata,
        })
    }

    pub async fn cast_vote(&self, token: &str, option: &str) -> Result<VoteOutcome, PollError> {
        let TokenEntry { poll_id, key } = self.resolve_token(token).await?;
        let _poll_guard = self.poll_locks.lock(&poll_id).await;

        let mut record = self.polls.load(poll_id, &key).await?;
        let (email, already_voted) = record
            .voter_by_token(token)
            .map(|(email, voter)| (email.clone(), voter.has_voted))
            .ok_or(PollError::InvalidToken)?;
        if already_voted {
            info!(%poll_id, "vote rejected: voter already voted");
            return Ok(VoteOutcome::AlreadyVoted);
        }

        let Some(count) = record.options.get_mut(option) else {
            info!(%poll_id, "vote rejected: unknown option");
            return Ok(VoteOutcome::UnknownOption);
        };
        *count += 1;

        if let Some(voter) = record.voters.get_mut(&email) {
            voter.has_voted = true;
        }
        record.log(AuditEvent::CastVote {
            email,
            option: option.to_owned(),
        });
        self.polls.save(poll_id, &record, &key).await?;

        info!(%poll_id, "vote recorded");
        Ok(VoteOutcome::Recorded)
    }

    async fn resolve_token(&self, token: &str) -> Result<TokenEntry, PollError> {
        let _index_guard = self.index_lock.lock().await;
        let index = self.tokens.load().await?;
        index.get(token).cloned().ok_or(PollError::InvalidToken)
    }
}

/// Splits a comma separated option list, dropping blanks.
pub fn parse_option_labels(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_owned)
        .collect()
}
