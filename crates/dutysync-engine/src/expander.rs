//! Rotation expansion: [`ScheduleSpec`] + [`Window`] → concrete assignment intervals.
//!
//! The answer to "who is on call at instant t" only changes at a finite set
//! of instants inside the window: rotation hand-offs, restriction
//! open/close times, and override bounds. [`expand`] collects those
//! breakpoints, evaluates each elementary segment at its start, and merges
//! neighbours with the same assignee. The result covers the window exactly,
//! with explicit [`Assignee::Unassigned`] spans where no layer is active.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::interval::{Assignee, AssignmentInterval, Window};
use crate::model::{Restriction, RotationLayer, ScheduleSpec};

/// Expand a schedule into ordered, non-overlapping intervals covering `window`.
///
/// Precedence at any instant: the last-declared override covering it, else
/// the highest-indexed active layer, else [`Assignee::Unassigned`].
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use dutysync_engine::{expand, Assignee, RotationLayer, ScheduleSpec, Window};
///
/// let day0 = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
/// let people = vec!["alice".into(), "bob".into()];
/// let layer = RotationLayer::new(people, Duration::days(7), day0).unwrap();
/// let spec = ScheduleSpec::new("primary", chrono_tz::UTC).with_layer(layer);
/// let window = Window::new(day0, day0 + Duration::days(21)).unwrap();
///
/// let intervals = expand(&spec, &window);
/// assert_eq!(intervals.len(), 3);
/// assert_eq!(intervals[1].assignee, Assignee::participant("bob"));
/// ```
pub fn expand(spec: &ScheduleSpec, window: &Window) -> Vec<AssignmentInterval> {
    let points = breakpoints(spec, window);
    let tz = spec.time_zone();

    let mut out: Vec<AssignmentInterval> = Vec::new();
    for (i, &start) in points.iter().enumerate() {
        let end = points.get(i + 1).copied().unwrap_or(window.to());
        let assignee = resolve_at(spec, &tz, start);
        match out.last_mut() {
            Some(prev) if prev.assignee == assignee => prev.end = end,
            _ => out.push(AssignmentInterval::new(assignee, start, end)),
        }
    }

    tracing::debug!(
        schedule = spec.name(),
        window = %window,
        segments = points.len(),
        intervals = out.len(),
        "expanded schedule"
    );
    out
}

/// Who holds the schedule at instant `t`.
pub fn assignee_at(spec: &ScheduleSpec, t: DateTime<Utc>) -> Assignee {
    resolve_at(spec, &spec.time_zone(), t)
}

/// Total time held per assignee across a set of intervals.
pub fn on_call_totals(intervals: &[AssignmentInterval]) -> BTreeMap<Assignee, Duration> {
    let mut totals = BTreeMap::new();
    for iv in intervals {
        *totals.entry(iv.assignee.clone()).or_insert_with(Duration::zero) += iv.duration();
    }
    totals
}

fn resolve_at(spec: &ScheduleSpec, tz: &Tz, t: DateTime<Utc>) -> Assignee {
    if let Some(ov) = spec.overrides().iter().rev().find(|o| o.covers(t)) {
        return Assignee::participant(ov.participant());
    }
    spec.layers()
        .iter()
        .rev()
        .find_map(|layer| layer.active_participant_at(t, tz))
        .map_or(Assignee::Unassigned, Assignee::participant)
}

// ── Breakpoints ─────────────────────────────────────────────────────────────

/// Sorted, deduplicated instants in `[from, to)` at which the assignment may
/// change. Always starts with `window.from()`. A superset is harmless: equal
/// neighbours are merged afterwards.
fn breakpoints(spec: &ScheduleSpec, window: &Window) -> Vec<DateTime<Utc>> {
    let tz = spec.time_zone();
    let mut points = vec![window.from()];

    for layer in spec.layers() {
        rotation_boundaries(layer, window, &mut points);
        if let Some(r) = layer.restriction() {
            restriction_boundaries(r, &tz, window, &mut points);
        }
    }

    for ov in spec.overrides() {
        for t in [ov.start(), ov.end()] {
            if window.contains(t) {
                points.push(t);
            }
        }
    }

    points.sort_unstable();
    points.dedup();
    points
}

fn rotation_boundaries(layer: &RotationLayer, window: &Window, points: &mut Vec<DateTime<Utc>>) {
    let mut k = layer.period_index(window.from()) + 1;
    loop {
        let t = layer.period_start(k);
        if t >= window.to() {
            break;
        }
        points.push(t);
        k += 1;
    }
}

fn restriction_boundaries(
    r: &Restriction,
    tz: &Tz,
    window: &Window,
    points: &mut Vec<DateTime<Utc>>,
) {
    // One day of slack on each side catches overnight ranges opened the day
    // before the window and offsets that move the local date.
    let first = window.from().with_timezone(tz).date_naive() - Duration::days(1);
    let last = window.to().with_timezone(tz).date_naive() + Duration::days(1);

    for day in first.iter_days().take_while(|d| *d <= last) {
        let close_day = if r.wraps_midnight() {
            day + Duration::days(1)
        } else {
            day
        };
        let open = day.and_time(r.start_time());
        let close = close_day.and_time(r.end_time());
        for naive in [open, close] {
            for t in local_instants(tz, naive) {
                if window.contains(t) && t > window.from() {
                    points.push(t);
                }
            }
        }
    }
}

/// Every UTC instant at which the local wall clock reads `naive`, or crosses
/// it when a DST gap skips that reading.
fn local_instants(tz: &Tz, naive: NaiveDateTime) -> Vec<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => vec![dt.with_timezone(&Utc)],
        LocalResult::Ambiguous(a, b) => vec![a.with_timezone(&Utc), b.with_timezone(&Utc)],
        LocalResult::None => {
            // Inside a spring-forward gap: the wall clock crosses `naive` at
            // the first valid reading after it.
            let base = naive - Duration::seconds(i64::from(naive.second()));
            (1..=180)
                .map(|m| base + Duration::minutes(m))
                .find_map(|later| tz.from_local_datetime(&later).earliest())
                .map(|dt| vec![dt.with_timezone(&Utc)])
                .unwrap_or_default()
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
