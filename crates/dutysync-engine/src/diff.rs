//! Desired-vs-remote interval diffing.
//!
//! [`diff`] turns two interval sequences into the smallest ordered list of
//! [`MutationOp`]s that makes the remote side equal the desired side:
//!
//! 1. Exact matches (same assignee, start, end) are left alone.
//! 2. Remaining desired/remote pairs that overlap in time are matched
//!    one-to-one, largest overlap first, and become updates.
//! 3. Unmatched desired intervals are created; unmatched remote intervals
//!    are deleted.
//!
//! Operations are ordered so that applying them in sequence never asks the
//! remote to hold two intervals over the same time. Deletes come first.
//! Updates and creates follow, each one only after the time it claims has
//! been released by the intervals currently holding it; among those ready,
//! the earliest start goes first. When updates wait on each other in a
//! cycle, one of them is replaced by a delete and a later create.

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::interval::{AssignmentInterval, RemoteInterval};

/// One change to apply to the remote schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    Create {
        interval: AssignmentInterval,
    },
    Update {
        remote_id: String,
        interval: AssignmentInterval,
    },
    Delete {
        remote_id: String,
    },
}

impl MutationOp {
    pub fn kind(&self) -> &'static str {
        match self {
            MutationOp::Create { .. } => "create",
            MutationOp::Update { .. } => "update",
            MutationOp::Delete { .. } => "delete",
        }
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            MutationOp::Create { .. } => None,
            MutationOp::Update { remote_id, .. } | MutationOp::Delete { remote_id } => {
                Some(remote_id)
            }
        }
    }

    pub fn interval(&self) -> Option<&AssignmentInterval> {
        match self {
            MutationOp::Create { interval } | MutationOp::Update { interval, .. } => Some(interval),
            MutationOp::Delete { .. } => None,
        }
    }
}

impl fmt::Display for MutationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOp::Create { interval } => write!(f, "create {interval}"),
            MutationOp::Update {
                remote_id,
                interval,
            } => write!(f, "update {remote_id} -> {interval}"),
            MutationOp::Delete { remote_id } => write!(f, "delete {remote_id}"),
        }
    }
}

/// Options for [`diff_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Whether the remote can change an interval's bounds or assignee in
    /// place. When false, every update is emitted as a delete plus a create.
    pub supports_update: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            supports_update: true,
        }
    }
}

/// Compute the ordered operations that turn `actual` into `desired`,
/// assuming the remote supports in-place updates.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use dutysync_engine::{diff, Assignee, AssignmentInterval, MutationOp, RemoteInterval};
///
/// let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
/// let t1 = Utc.with_ymd_and_hms(2026, 1, 12, 0, 0, 0).unwrap();
/// let desired = vec![AssignmentInterval::new(Assignee::participant("alice"), t0, t1)];
/// let actual = vec![RemoteInterval::new(
///     "R1",
///     AssignmentInterval::new(Assignee::participant("bob"), t0, t1),
/// )];
///
/// let ops = diff(&desired, &actual);
/// assert!(matches!(&ops[..], [MutationOp::Update { remote_id, .. }] if remote_id == "R1"));
/// ```
pub fn diff(desired: &[AssignmentInterval], actual: &[RemoteInterval]) -> Vec<MutationOp> {
    diff_with_options(desired, actual, DiffOptions::default())
}

/// Compute the ordered operations that turn `actual` into `desired`.
pub fn diff_with_options(
    desired: &[AssignmentInterval],
    actual: &[RemoteInterval],
    options: DiffOptions,
) -> Vec<MutationOp> {
    let mut desired_done = vec![false; desired.len()];
    let mut actual_done = vec![false; actual.len()];

    // 1. Exact matches. Duplicated remote copies of one interval match once;
    // the spares fall through to deletion.
    let mut by_interval: HashMap<&AssignmentInterval, VecDeque<usize>> = HashMap::new();
    for (j, remote) in actual.iter().enumerate() {
        by_interval.entry(&remote.interval).or_default().push_back(j);
    }
    for (i, d) in desired.iter().enumerate() {
        if let Some(j) = by_interval.get_mut(d).and_then(VecDeque::pop_front) {
            desired_done[i] = true;
            actual_done[j] = true;
        }
    }

    // 2. Overlapping pairs, largest overlap first.
    let mut pairs = Vec::new();
    for (i, d) in desired.iter().enumerate().filter(|(i, _)| !desired_done[*i]) {
        for (j, a) in actual.iter().enumerate().filter(|(j, _)| !actual_done[*j]) {
            let overlap = d.overlap(&a.interval);
            if overlap > Duration::zero() {
                pairs.push((overlap, i, j));
            }
        }
    }
    // Ties prefer keeping the same assignee, then the earliest desired start.
    let rank = |&(overlap, i, j): &(Duration, usize, usize)| {
        let (d, a) = (&desired[i], &actual[j]);
        (
            Reverse(overlap),
            d.assignee != a.interval.assignee,
            d.start,
            a.interval.start,
            a.remote_id.as_str(),
        )
    };
    pairs.sort_by(|x, y| rank(x).cmp(&rank(y)));

    let mut updates: Vec<(usize, usize)> = Vec::new();
    for (_, i, j) in pairs {
        if desired_done[i] || actual_done[j] {
            continue;
        }
        desired_done[i] = true;
        actual_done[j] = true;
        updates.push((i, j));
    }

    // 3. Leftovers.
    let mut deletes: Vec<usize> = (0..actual.len()).filter(|j| !actual_done[*j]).collect();
    let mut creates: Vec<usize> = (0..desired.len()).filter(|i| !desired_done[*i]).collect();

    if !options.supports_update {
        for (i, j) in updates.drain(..) {
            deletes.push(j);
            creates.push(i);
        }
    }

    // Ordering. Deletes only free time, so they go first.
    deletes.sort_by(|a, b| {
        (actual[*a].interval.start, &actual[*a].remote_id)
            .cmp(&(actual[*b].interval.start, &actual[*b].remote_id))
    });

    let mut gone = vec![false; actual.len()];
    for &j in &deletes {
        gone[j] = true;
    }
    let mut held: Vec<Slot> = actual
        .iter()
        .enumerate()
        .filter(|(j, _)| !gone[*j])
        .map(|(j, a)| Slot {
            holder: Some(j),
            start: a.interval.start,
            end: a.interval.end,
        })
        .collect();

    let mut pending: Vec<Claim> = updates
        .into_iter()
        .map(|(i, j)| Claim {
            desired: i,
            holder: Some(j),
        })
        .chain(creates.into_iter().map(|i| Claim {
            desired: i,
            holder: None,
        }))
        .collect();
    pending.sort_by_key(|c| (desired[c.desired].start, c.holder.is_none(), c.desired));

    let mut ops = Vec::with_capacity(deletes.len() + pending.len());
    ops.extend(deletes.into_iter().map(|j| MutationOp::Delete {
        remote_id: actual[j].remote_id.clone(),
    }));

    // Emit the earliest claim whose target time nobody else holds, then
    // replay it onto `held`. A claim waits until the intervals in its way
    // have been moved or deleted.
    while !pending.is_empty() {
        let k = match pending
            .iter()
            .position(|c| is_free(&held, &desired[c.desired], c.holder))
        {
            Some(k) => k,
            None => match pending.iter().position(|c| c.holder.is_some()) {
                // Updates waiting on each other: release one holder outright
                // and recreate its interval once the way is clear.
                Some(k) => {
                    if let Some(j) = pending[k].holder.take() {
                        held.retain(|s| s.holder != Some(j));
                        tracing::debug!(
                            remote_id = %actual[j].remote_id,
                            "update blocked in a cycle, replacing with delete and create"
                        );
                        ops.push(MutationOp::Delete {
                            remote_id: actual[j].remote_id.clone(),
                        });
                    }
                    continue;
                }
                // Only reachable when the remote already overlaps itself.
                None => 0,
            },
        };

        let claim = pending.remove(k);
        let target = &desired[claim.desired];
        match claim.holder {
            Some(j) => {
                if let Some(slot) = held.iter_mut().find(|s| s.holder == Some(j)) {
                    slot.start = target.start;
                    slot.end = target.end;
                }
                ops.push(MutationOp::Update {
                    remote_id: actual[j].remote_id.clone(),
                    interval: target.clone(),
                });
            }
            None => {
                held.push(Slot {
                    holder: None,
                    start: target.start,
                    end: target.end,
                });
                ops.push(MutationOp::Create {
                    interval: target.clone(),
                });
            }
        }
    }

    tracing::debug!(
        desired = desired.len(),
        actual = actual.len(),
        ops = ops.len(),
        "computed schedule diff"
    );
    ops
}

/// Time a remote interval occupies while the operations are replayed.
/// `holder` is the index into `actual`, or `None` for a fresh create.
struct Slot {
    holder: Option<usize>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// A desired interval waiting to be written, by update of `holder` or by create.
struct Claim {
    desired: usize,
    holder: Option<usize>,
}

fn is_free(held: &[Slot], target: &AssignmentInterval, holder: Option<usize>) -> bool {
    held.iter().all(|s| {
        (holder.is_some() && s.holder == holder) || s.end <= target.start || target.end <= s.start
    })
}

/// Counts per operation kind, for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl OpCounts {
    pub fn of(ops: &[MutationOp]) -> Self {
        ops.iter().fold(OpCounts::default(), |mut c, op| {
            match op {
                MutationOp::Create { .. } => c.creates += 1,
                MutationOp::Update { .. } => c.updates += 1,
                MutationOp::Delete { .. } => c.deletes += 1,
            }
            c
        })
    }

    pub fn total(&self) -> usize {
        self.creates + self.updates + self.deletes
    }
}

impl fmt::Display for OpCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} create, {} update, {} delete",
            self.creates, self.updates, self.deletes
        )
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
