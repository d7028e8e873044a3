//! # dutysync-engine
//!
//! Declarative on-call schedule reconciliation.
//!
//! An operator describes a rotation in a YAML document; the engine expands it
//! into concrete assignment intervals, compares them with what a remote
//! scheduling service currently holds, and applies the smallest ordered set
//! of mutations that makes the service match the document.
//!
//! ## Modules
//!
//! - [`model`] — YAML document → validated [`ScheduleSpec`]
//! - [`duration`] — rotation length strings (`7d`, `1d12h`, ...)
//! - [`interval`] — assignment intervals, remote intervals, query windows
//! - [`expander`] — ScheduleSpec + window → gap-free interval sequence
//! - [`diff`] — desired vs remote intervals → ordered [`MutationOp`]s
//! - [`remote`] — the [`RemoteSchedule`] capability and an in-memory implementation
//! - [`apply`] — execute operations in order, collecting failures
//! - [`reconcile`] — one end-to-end run
//! - [`error`] — Error types

pub mod apply;
pub mod diff;
pub mod duration;
pub mod error;
pub mod expander;
pub mod interval;
pub mod model;
pub mod reconcile;
pub mod remote;

pub use apply::{apply, Applier, ApplyReport, CancelToken, OpOutcome, OpRecord};
pub use diff::{diff, diff_with_options, DiffOptions, MutationOp, OpCounts};
pub use duration::{format_duration, parse_duration};
pub use error::{DutyError, FetchError, MutationError, RemoteErrorKind};
pub use expander::{assignee_at, expand, on_call_totals};
pub use interval::{Assignee, AssignmentInterval, RemoteInterval, Window};
pub use model::{Override, Restriction, RotationLayer, ScheduleSpec};
pub use reconcile::{reconcile, ReconcileOptions, ReconcileOutcome};
pub use remote::{InMemoryRemote, RemoteSchedule};
