//! Executing mutation operations against a [`RemoteSchedule`].
//!
//! Operations run strictly in the order given. A failed operation is
//! recorded and the driver moves on: operations touch independent remote
//! entities, so one bad override must not block the rest of the schedule
//! from converging. Whether a run with failures counts as a success is the
//! caller's decision, based on [`ApplyReport::has_failures`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::diff::{MutationOp, OpCounts};
use crate::error::MutationError;
use crate::remote::RemoteSchedule;

/// Cooperative cancellation flag, checked before each operation.
///
/// Clones share the flag, so another thread (a signal handler, say) can stop
/// a run between remote calls. A call already in flight is not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpOutcome {
    /// The remote accepted the call. Creates carry the new remote id.
    Applied { remote_id: Option<String> },
    Failed { error: MutationError },
    /// Dry-run: the call was not made.
    Skipped,
    /// The run was cancelled before this operation.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpRecord {
    pub op: MutationOp,
    pub outcome: OpOutcome,
}

/// Per-operation results of one apply pass, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub dry_run: bool,
    pub records: Vec<OpRecord>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True iff at least one operation failed.
    pub fn has_failures(&self) -> bool {
        self.records
            .iter()
            .any(|r| matches!(r.outcome, OpOutcome::Failed { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&MutationOp, &MutationError)> {
        self.records.iter().filter_map(|r| match &r.outcome {
            OpOutcome::Failed { error } => Some((&r.op, error)),
            _ => None,
        })
    }

    pub fn was_cancelled(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.outcome == OpOutcome::Cancelled)
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, OpOutcome::Applied { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, OpOutcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| *o == OpOutcome::Cancelled)
    }

    /// The operations this report covers, in order.
    pub fn ops(&self) -> Vec<MutationOp> {
        self.records.iter().map(|r| r.op.clone()).collect()
    }

    pub fn op_counts(&self) -> OpCounts {
        OpCounts::of(&self.ops())
    }

    fn count(&self, pred: impl Fn(&OpOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            return write!(f, "dry run: {} would be applied", self.op_counts());
        }
        write!(f, "{} applied, {} failed", self.applied(), self.failed())?;
        if self.was_cancelled() {
            write!(f, ", {} cancelled", self.cancelled())?;
        }
        Ok(())
    }
}

/// Drives a list of operations against one remote schedule.
///
/// ```
/// use dutysync_engine::{Applier, InMemoryRemote, MutationOp};
///
/// let mut remote = InMemoryRemote::new();
/// let ops = vec![MutationOp::Delete { remote_id: "R1".into() }];
/// let report = Applier::new(&mut remote, "primary").dry_run(true).apply(ops);
/// assert!(report.dry_run);
/// assert!(!report.has_failures());
/// ```
pub struct Applier<'a, R: RemoteSchedule + ?Sized> {
    remote: &'a mut R,
    schedule_id: &'a str,
    dry_run: bool,
    cancel: Option<CancelToken>,
}

impl<'a, R: RemoteSchedule + ?Sized> Applier<'a, R> {
    pub fn new(remote: &'a mut R, schedule_id: &'a str) -> Self {
        Self {
            remote,
            schedule_id,
            dry_run: false,
            cancel: None,
        }
    }

    /// Report every operation as skipped without calling the remote.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn apply(self, ops: Vec<MutationOp>) -> ApplyReport {
        let Applier {
            remote,
            schedule_id,
            dry_run,
            cancel,
        } = self;

        let mut records = Vec::with_capacity(ops.len());
        let mut cancelled = false;

        for op in ops {
            if !cancelled && cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                tracing::warn!(schedule = schedule_id, "apply cancelled");
                cancelled = true;
            }
            let outcome = if cancelled {
                OpOutcome::Cancelled
            } else if dry_run {
                tracing::info!(schedule = schedule_id, "would {op}");
                OpOutcome::Skipped
            } else {
                execute(remote, schedule_id, &op)
            };
            records.push(OpRecord { op, outcome });
        }

        ApplyReport { dry_run, records }
    }
}

fn execute<R: RemoteSchedule + ?Sized>(
    remote: &mut R,
    schedule_id: &str,
    op: &MutationOp,
) -> OpOutcome {
    let result = match op {
        MutationOp::Create { interval } => remote.create(schedule_id, interval).map(Some),
        MutationOp::Update {
            remote_id,
            interval,
        } => remote.update(schedule_id, remote_id, interval).map(|()| None),
        MutationOp::Delete { remote_id } => remote.delete(schedule_id, remote_id).map(|()| None),
    };
    match result {
        Ok(remote_id) => {
            tracing::debug!(schedule = schedule_id, remote_id = ?remote_id, "{op}");
            OpOutcome::Applied { remote_id }
        }
        Err(error) => {
            tracing::warn!(schedule = schedule_id, error = %error, "failed to {op}");
            OpOutcome::Failed { error }
        }
    }
}

/// Apply `ops` to `remote` in order, continuing past failures.
pub fn apply<R: RemoteSchedule + ?Sized>(
    remote: &mut R,
    schedule_id: &str,
    ops: Vec<MutationOp>,
) -> ApplyReport {
    Applier::new(remote, schedule_id).apply(ops)
}
