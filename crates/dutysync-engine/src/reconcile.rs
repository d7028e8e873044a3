//! One reconciliation run: expand, fetch, diff, apply.

use serde::Serialize;

use crate::apply::{Applier, ApplyReport, CancelToken};
use crate::diff::{diff_with_options, DiffOptions, MutationOp};
use crate::error::Result;
use crate::expander::expand;
use crate::interval::{AssignmentInterval, RemoteInterval, Window};
use crate::model::ScheduleSpec;
use crate::remote::RemoteSchedule;

/// Options for [`reconcile`].
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Compute and report operations without calling the remote mutation API.
    pub dry_run: bool,
    pub cancel: Option<CancelToken>,
}

/// Everything a run computed, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub schedule_id: String,
    /// The window the caller asked for.
    pub window: Window,
    /// The window actually compared: `window` widened to cover every remote
    /// interval that straddles its edges.
    pub effective_window: Window,
    pub desired: Vec<AssignmentInterval>,
    pub actual: Vec<RemoteInterval>,
    pub report: ApplyReport,
}

impl ReconcileOutcome {
    pub fn ops(&self) -> Vec<MutationOp> {
        self.report.ops()
    }

    /// The remote already matched the document; nothing was planned.
    pub fn in_sync(&self) -> bool {
        self.report.is_empty()
    }
}

/// Reconcile `schedule_id` on `remote` with `spec` over `window`.
///
/// Remote intervals that cross the window's edges are compared whole, against
/// the schedule expanded over the widened window, so a run never truncates
/// remote history it was not asked about.
///
/// # Errors
///
/// Returns [`DutyError::Fetch`](crate::DutyError::Fetch) if the remote state
/// cannot be read; no mutation is attempted in that case. Individual
/// mutation failures are not errors; they are collected in the report.
pub fn reconcile<R: RemoteSchedule + ?Sized>(
    spec: &ScheduleSpec,
    remote: &mut R,
    schedule_id: &str,
    window: Window,
    options: &ReconcileOptions,
) -> Result<ReconcileOutcome> {
    tracing::info!(
        schedule = schedule_id,
        document = spec.name(),
        window = %window,
        dry_run = options.dry_run,
        "starting reconciliation"
    );

    let actual = remote.fetch(schedule_id, &window)?;
    let effective_window = window.hull(actual.iter().map(|r| &r.interval));
    if effective_window != window {
        tracing::debug!(
            schedule = schedule_id,
            effective_window = %effective_window,
            "widened window to cover straddling remote intervals"
        );
    }

    let desired = expand(spec, &effective_window);
    let ops = diff_with_options(
        &desired,
        &actual,
        DiffOptions {
            supports_update: remote.supports_update(),
        },
    );

    let mut applier = Applier::new(remote, schedule_id).dry_run(options.dry_run);
    if let Some(token) = &options.cancel {
        applier = applier.cancel_token(token.clone());
    }
    let report = applier.apply(ops);

    if report.has_failures() {
        tracing::warn!(
            schedule = schedule_id,
            summary = %report,
            "reconciliation finished with failures"
        );
    } else {
        tracing::info!(schedule = schedule_id, summary = %report, "reconciliation finished");
    }

    Ok(ReconcileOutcome {
        schedule_id: schedule_id.to_string(),
        window,
        effective_window,
        desired,
        actual,
        report,
    })
}
