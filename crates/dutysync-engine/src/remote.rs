//! The remote schedule service, as an injected capability.
//!
//! The engine never talks HTTP itself. Anything that can list a schedule's
//! intervals and create/update/delete them implements [`RemoteSchedule`];
//! [`InMemoryRemote`] is a complete in-process implementation used by tests
//! and by the CLI's local state file.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, MutationError, RemoteErrorKind};
use crate::interval::{AssignmentInterval, RemoteInterval, Window};

/// Operations the reconciler needs from a schedule service.
///
/// Calls are blocking. Implementations own their transport concerns (auth,
/// pagination, rate limiting, per-call timeouts) and report a timed-out call
/// with [`RemoteErrorKind::Timeout`] rather than retrying indefinitely.
pub trait RemoteSchedule {
    /// Every stored interval overlapping `window`, in start order.
    fn fetch(&self, schedule_id: &str, window: &Window) -> Result<Vec<RemoteInterval>, FetchError>;

    /// Store a new interval and return its remote id.
    fn create(
        &mut self,
        schedule_id: &str,
        interval: &AssignmentInterval,
    ) -> Result<String, MutationError>;

    /// Replace the bounds and assignee of an existing interval.
    fn update(
        &mut self,
        schedule_id: &str,
        remote_id: &str,
        interval: &AssignmentInterval,
    ) -> Result<(), MutationError>;

    fn delete(&mut self, schedule_id: &str, remote_id: &str) -> Result<(), MutationError>;

    /// Whether [`update`](Self::update) is available. When false the diff
    /// decomposes updates into delete + create.
    fn supports_update(&self) -> bool {
        true
    }
}

/// A schedule service held in memory.
///
/// Only the stored intervals and the id counter are serialized; failure
/// injection settings are per-process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRemote {
    schedules: BTreeMap<String, Vec<RemoteInterval>>,
    next_id: u64,
    #[serde(skip)]
    rejected: BTreeSet<String>,
    #[serde(skip)]
    unavailable: Option<FetchError>,
    #[serde(skip)]
    update_unsupported: bool,
    #[serde(skip)]
    strict: bool,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a schedule with intervals under their given remote ids.
    pub fn with_schedule(
        mut self,
        schedule_id: impl Into<String>,
        intervals: Vec<RemoteInterval>,
    ) -> Self {
        self.schedules.insert(schedule_id.into(), intervals);
        self
    }

    /// Refuse any create or update assigning `participant`.
    pub fn reject_participant(mut self, participant: impl Into<String>) -> Self {
        self.rejected.insert(participant.into());
        self
    }

    /// Make every fetch fail.
    pub fn unavailable(mut self, kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        self.unavailable = Some(FetchError::new(kind, message));
        self
    }

    /// Behave like a service without in-place updates.
    pub fn without_update_support(mut self) -> Self {
        self.update_unsupported = true;
        self
    }

    /// Reject creates and updates that would overlap another stored interval.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// All intervals stored for a schedule, in start order.
    pub fn intervals(&self, schedule_id: &str) -> Vec<RemoteInterval> {
        let mut out = self.schedules.get(schedule_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| {
            (a.interval.start, &a.remote_id).cmp(&(b.interval.start, &b.remote_id))
        });
        out
    }

    pub fn schedule_ids(&self) -> impl Iterator<Item = &str> {
        self.schedules.keys().map(String::as_str)
    }

    fn check_payload(
        &self,
        schedule_id: &str,
        remote_id: Option<&str>,
        interval: &AssignmentInterval,
    ) -> Result<(), MutationError> {
        if interval.start >= interval.end {
            return Err(MutationError::new(
                RemoteErrorKind::Rejected,
                remote_id,
                "interval start must be before end",
            ));
        }
        if let Some(p) = interval.assignee.as_participant() {
            if self.rejected.contains(p) {
                return Err(MutationError::new(
                    RemoteErrorKind::Rejected,
                    remote_id,
                    format!("unknown participant '{p}'"),
                ));
            }
        }
        if self.strict {
            let clash = self
                .schedules
                .get(schedule_id)
                .into_iter()
                .flatten()
                .filter(|r| Some(r.remote_id.as_str()) != remote_id)
                .find(|r| r.interval.start < interval.end && interval.start < r.interval.end);
            if let Some(clash) = clash {
                return Err(MutationError::new(
                    RemoteErrorKind::Rejected,
                    remote_id,
                    format!("overlaps {}", clash.remote_id),
                ));
            }
        }
        Ok(())
    }

    fn position(&self, schedule_id: &str, remote_id: &str) -> Result<usize, MutationError> {
        self.schedules
            .get(schedule_id)
            .and_then(|ivs| ivs.iter().position(|r| r.remote_id == remote_id))
            .ok_or_else(|| {
                MutationError::new(
                    RemoteErrorKind::NotFound,
                    Some(remote_id),
                    format!("no interval in schedule '{schedule_id}'"),
                )
            })
    }
}

impl RemoteSchedule for InMemoryRemote {
    fn fetch(&self, schedule_id: &str, window: &Window) -> Result<Vec<RemoteInterval>, FetchError> {
        if let Some(err) = &self.unavailable {
            return Err(err.clone());
        }
        Ok(self
            .intervals(schedule_id)
            .into_iter()
            .filter(|r| r.interval.start < window.to() && window.from() < r.interval.end)
            .collect())
    }

    fn create(
        &mut self,
        schedule_id: &str,
        interval: &AssignmentInterval,
    ) -> Result<String, MutationError> {
        self.check_payload(schedule_id, None, interval)?;
        self.next_id += 1;
        let remote_id = format!("R{}", self.next_id);
        self.schedules
            .entry(schedule_id.to_string())
            .or_default()
            .push(RemoteInterval::new(remote_id.clone(), interval.clone()));
        Ok(remote_id)
    }

    fn update(
        &mut self,
        schedule_id: &str,
        remote_id: &str,
        interval: &AssignmentInterval,
    ) -> Result<(), MutationError> {
        if self.update_unsupported {
            return Err(MutationError::new(
                RemoteErrorKind::Unsupported,
                Some(remote_id),
                "in-place update is not supported",
            ));
        }
        let idx = self.position(schedule_id, remote_id)?;
        self.check_payload(schedule_id, Some(remote_id), interval)?;
        if let Some(ivs) = self.schedules.get_mut(schedule_id) {
            ivs[idx].interval = interval.clone();
        }
        Ok(())
    }

    fn delete(&mut self, schedule_id: &str, remote_id: &str) -> Result<(), MutationError> {
        let idx = self.position(schedule_id, remote_id)?;
        if let Some(ivs) = self.schedules.get_mut(schedule_id) {
            ivs.remove(idx);
        }
        Ok(())
    }

    fn supports_update(&self) -> bool {
        !self.update_unsupported
    }
}
