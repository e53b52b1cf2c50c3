//! Bounded, insertion-ordered request ledger.
//!
//! The ledger keeps at most `capacity` records, oldest first. Request numbers
//! come from the embedded [`Sequencer`] and keep counting past evictions.

pub mod sequencer;

pub use sequencer::Sequencer;

use crate::core::{DeskError, GuestRequest, RequestStatus, Result, Submission, now_timestamp};
use crate::storage::Snapshot;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Number of records retained before the oldest is evicted.
pub const MAX_REQUESTS: usize = 500;

/// Which record goes when an insert overflows the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Drop the oldest record regardless of status.
    #[default]
    Fifo,
    /// Drop the oldest completed record; fall back to the oldest record.
    PreferCompleted,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(Self::Fifo),
            "prefer_completed" | "prefer-completed" => Ok(Self::PreferCompleted),
            other => Err(format!(
                "unknown eviction policy '{other}', expected fifo or prefer_completed"
            )),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::PreferCompleted => f.write_str("prefer_completed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    requests: VecDeque<GuestRequest>,
    sequencer: Sequencer,
    capacity: usize,
    policy: EvictionPolicy,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_capacity(MAX_REQUESTS)
    }

    /// A zero capacity is raised to one so the record just created is always retained.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            requests: VecDeque::with_capacity(capacity.min(MAX_REQUESTS) + 1),
            sequencer: Sequencer::new(),
            capacity,
            policy: EvictionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Request numbers issued so far, including evicted records.
    pub fn total_requests(&self) -> u64 {
        self.sequencer.current()
    }

    /// Appends a new record built from `submission`, evicting if over capacity.
    pub fn create(&mut self, submission: Submission) -> GuestRequest {
        let Submission { id, at, fields } = submission;

        let request_number = self.sequencer.next();
        let id = id.unwrap_or_else(|| self.sequencer.fresh_id());
        let at = at.unwrap_or_else(now_timestamp);

        let record = GuestRequest {
            id,
            request_number,
            status_updated_at: at.clone(),
            at,
            status: RequestStatus::Sent,
            fields,
        };

        self.requests.push_back(record.clone());
        self.enforce_capacity();
        record
    }

    /// All retained records, oldest first.
    pub fn list(&self) -> Vec<GuestRequest> {
        self.requests.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GuestRequest> {
        self.requests.iter()
    }

    /// First record whose id matches; duplicates behind it are shadowed.
    pub fn find_by_id(&self, id: &str) -> Option<&GuestRequest> {
        self.requests.iter().find(|record| record.id == id)
    }

    /// Moves a record to `status`; the status string is checked before the lookup.
    pub fn update_status(&mut self, id: &str, status: &str) -> Result<GuestRequest> {
        let status: RequestStatus = status.parse()?;

        let record = self
            .requests
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| DeskError::not_found(format!("request '{id}' not found")))?;

        record.status = status;
        record.status_updated_at = now_timestamp();
        Ok(record.clone())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            requests: self.list(),
            total_request_count: self.sequencer.current(),
        }
    }

    /// Replaces the in-memory state with a persisted snapshot.
    ///
    /// The counter is raised to the highest stored request number if the
    /// snapshot's own count lags behind it.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let Snapshot {
            requests,
            total_request_count,
        } = snapshot;

        let highest = requests
            .iter()
            .map(|record| record.request_number)
            .max()
            .unwrap_or(0);

        self.requests = requests
            .into_iter()
            .map(|mut record| {
                record.backfill();
                record
            })
            .collect();
        self.sequencer.restore(total_request_count.max(highest));
        self.enforce_capacity();
    }

    fn enforce_capacity(&mut self) {
        while self.requests.len() > self.capacity {
            let victim = match self.policy {
                EvictionPolicy::Fifo => 0,
                EvictionPolicy::PreferCompleted => self
                    .requests
                    .iter()
                    .position(|record| record.status.is_terminal())
                    .unwrap_or(0),
            };
            if let Some(evicted) = self.requests.remove(victim) {
                debug!(
                    id = %evicted.id,
                    request_number = evicted.request_number,
                    status = %evicted.status,
                    "evicted request"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn towels() -> Submission {
        Submission::default().field("room", "301").field("item", "towels")
    }

    #[test]
    fn create_assigns_identity_and_initial_status() {
        let mut ledger = Ledger::new();
        let record = ledger.create(towels());

        assert_eq!(record.request_number, 1);
        assert!(!record.id.is_empty());
        assert_eq!(record.status, RequestStatus::Sent);
        assert_eq!(record.status_updated_at, record.at);
        assert_eq!(record.fields["room"], "301");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn create_keeps_caller_id_and_timestamp() {
        let mut ledger = Ledger::new();
        let submission = Submission {
            id: Some("guest-1".to_string()),
            at: Some("2026-01-01T00:00:00.000Z".to_string()),
            ..Submission::default()
        };
        let record = ledger.create(submission);

        assert_eq!(record.id, "guest-1");
        assert_eq!(record.at, "2026-01-01T00:00:00.000Z");
        assert_eq!(record.status_updated_at, "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn fifo_evicts_oldest_and_keeps_counting() {
        let mut ledger = Ledger::with_capacity(3);
        for _ in 0..5 {
            ledger.create(towels());
        }

        let numbers: Vec<u64> = ledger.iter().map(|r| r.request_number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
        assert_eq!(ledger.total_requests(), 5);
        assert_eq!(ledger.create(towels()).request_number, 6);
    }

    #[test]
    fn prefer_completed_spares_open_requests() {
        let mut ledger = Ledger::with_capacity(3).with_policy(EvictionPolicy::PreferCompleted);
        let first = ledger.create(towels());
        let second = ledger.create(towels());
        ledger.create(towels());
        ledger.update_status(&second.id, "completed").unwrap();

        ledger.create(towels());

        assert!(ledger.find_by_id(&first.id).is_some());
        assert!(ledger.find_by_id(&second.id).is_none());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn prefer_completed_falls_back_to_oldest() {
        let mut ledger = Ledger::with_capacity(2).with_policy(EvictionPolicy::PreferCompleted);
        let first = ledger.create(towels());
        ledger.create(towels());
        ledger.create(towels());

        assert!(ledger.find_by_id(&first.id).is_none());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn update_status_validates_before_lookup() {
        let mut ledger = Ledger::new();
        let record = ledger.create(towels());

        let err = ledger.update_status("missing", "bogus").unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));

        let err = ledger.update_status("missing", "read").unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)));

        let updated = ledger.update_status(&record.id, "On The Way").unwrap();
        assert_eq!(updated.status, RequestStatus::OnTheWay);
        assert_eq!(updated.request_number, record.request_number);
        assert_eq!(updated.at, record.at);
        assert_eq!(ledger.find_by_id(&record.id).unwrap().status, RequestStatus::OnTheWay);
    }

    #[test]
    fn restore_trusts_highest_request_number() {
        let mut source = Ledger::new();
        source.create(towels());
        source.create(towels());
        let mut snapshot = source.snapshot();
        snapshot.total_request_count = 0;

        let mut ledger = Ledger::new();
        ledger.restore(snapshot);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total_requests(), 2);
        assert_eq!(ledger.create(towels()).request_number, 3);
    }

    #[test]
    fn restore_trims_to_capacity() {
        let mut source = Ledger::with_capacity(10);
        for _ in 0..10 {
            source.create(towels());
        }

        let mut ledger = Ledger::with_capacity(4);
        ledger.restore(source.snapshot());

        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.iter().next().unwrap().request_number, 7);
    }

    #[test]
    fn eviction_policy_parses() {
        assert_eq!("FIFO".parse::<EvictionPolicy>(), Ok(EvictionPolicy::Fifo));
        assert_eq!(
            "prefer-completed".parse::<EvictionPolicy>(),
            Ok(EvictionPolicy::PreferCompleted)
        );
        assert!("lifo".parse::<EvictionPolicy>().is_err());
    }
}
