//! Time-bounded assignments and query windows.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DutyError, Result};

/// Who holds an interval: a participant, or nobody.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Assignee {
    Participant(String),
    /// Explicit gap marker. Sent to the remote as a real "nobody on call" state.
    Unassigned,
}

impl Assignee {
    pub fn participant(id: impl Into<String>) -> Self {
        Assignee::Participant(id.into())
    }

    pub fn as_participant(&self) -> Option<&str> {
        match self {
            Assignee::Participant(id) => Some(id),
            Assignee::Unassigned => None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, Assignee::Unassigned)
    }
}

impl From<Option<String>> for Assignee {
    fn from(value: Option<String>) -> Self {
        value.map_or(Assignee::Unassigned, Assignee::Participant)
    }
}

impl From<Assignee> for Option<String> {
    fn from(value: Assignee) -> Self {
        match value {
            Assignee::Participant(id) => Some(id),
            Assignee::Unassigned => None,
        }
    }
}

impl fmt::Display for Assignee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignee::Participant(id) => f.pad(id),
            Assignee::Unassigned => f.pad("(unassigned)"),
        }
    }
}

/// A contiguous span `[start, end)` held by one assignee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentInterval {
    pub assignee: Assignee,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AssignmentInterval {
    pub fn new(assignee: Assignee, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            assignee,
            start,
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length of the time both intervals cover; zero when disjoint.
    pub fn overlap(&self, other: &AssignmentInterval) -> Duration {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            end - start
        } else {
            Duration::zero()
        }
    }

    pub fn same_bounds(&self, other: &AssignmentInterval) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl fmt::Display for AssignmentInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {})",
            self.assignee,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// An interval as the remote service stores it, keyed by the service's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInterval {
    pub remote_id: String,
    #[serde(flatten)]
    pub interval: AssignmentInterval,
}

impl RemoteInterval {
    pub fn new(remote_id: impl Into<String>, interval: AssignmentInterval) -> Self {
        Self {
            remote_id: remote_id.into(),
            interval,
        }
    }
}

/// A half-open query window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl Window {
    /// # Errors
    ///
    /// Returns [`DutyError::InvalidWindow`] unless `from < to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from >= to {
            return Err(DutyError::InvalidWindow(format!(
                "start {} is not before end {}",
                from.to_rfc3339(),
                to.to_rfc3339()
            )));
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from <= t && t < self.to
    }

    /// Clip `[start, end)` to the window; `None` when nothing remains.
    pub fn clip(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = start.max(self.from);
        let end = end.min(self.to);
        (start < end).then_some((start, end))
    }

    /// Smallest window covering this one and every given interval.
    pub fn hull<'a>(&self, intervals: impl IntoIterator<Item = &'a AssignmentInterval>) -> Window {
        intervals.into_iter().fold(*self, |w, iv| Window {
            from: w.from.min(iv.start),
            to: w.to.max(iv.end),
        })
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}
