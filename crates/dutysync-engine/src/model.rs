//! The declarative rotation model.
//!
//! A schedule document is YAML with a stable set of keys:
//!
//! ```yaml
//! name: platform-primary
//! time_zone: America/New_York
//! layers:
//!   - participants: [alice, bob]
//!     rotation_length: 7d
//!     anchor: 2026-01-05T09:00:00-05:00
//!     restriction:
//!       start_time: "09:00"
//!       end_time: "17:00"
//!       days: [mon, tue, wed, thu, fri]
//! overrides:
//!   - participant: carol
//!     start: 2026-01-15T00:00:00Z
//!     end: 2026-01-17T00:00:00Z
//! ```
//!
//! Parsing is total: [`ScheduleSpec::from_yaml`] checks every rule before
//! returning, so a `ScheduleSpec` in hand is always valid for expansion.
//! Errors name the offending field (`layers[1].rotation_length`,
//! `overrides[0]`, ...).

use std::path::Path;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::duration::parse_duration;
use crate::error::{DutyError, Result};

// ── Document shape ──────────────────────────────────────────────────────────

// Every key is optional at the serde level so that a missing key is reported
// with its path instead of a generic deserialization message.

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    name: Option<String>,
    time_zone: Option<String>,
    #[serde(default)]
    layers: Vec<RawLayer>,
    #[serde(default)]
    overrides: Vec<RawOverride>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLayer {
    #[serde(default)]
    participants: Vec<String>,
    rotation_length: Option<String>,
    anchor: Option<String>,
    restriction: Option<RawRestriction>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRestriction {
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    days: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOverride {
    participant: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

// ── Validated model ─────────────────────────────────────────────────────────

/// A time-of-day range, optionally limited to certain weekdays, inside which
/// a layer is active. Evaluated in the schedule's time zone.
///
/// When `end_time` is not after `start_time` the range wraps past midnight,
/// and the weekday filter applies to the day the range opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    start_time: NaiveTime,
    end_time: NaiveTime,
    days: Vec<Weekday>,
}

impl Restriction {
    /// An empty `days` list means every day.
    pub fn new(start_time: NaiveTime, end_time: NaiveTime, days: Vec<Weekday>) -> Result<Self> {
        if start_time == end_time {
            return Err(DutyError::malformed(
                "restriction",
                "start_time and end_time must differ",
            ));
        }
        Ok(Self {
            start_time,
            end_time,
            days,
        })
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end_time <= self.start_time
    }

    pub fn applies_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    /// Whether a local wall-clock instant falls inside the restriction.
    pub fn is_open(&self, local: NaiveDateTime) -> bool {
        let time = local.time();
        let date = local.date();
        if self.wraps_midnight() {
            let opened_today = time >= self.start_time && self.applies_on(date.weekday());
            let opened_yesterday = time < self.end_time
                && date
                    .pred_opt()
                    .is_some_and(|prev| self.applies_on(prev.weekday()));
            opened_today || opened_yesterday
        } else {
            time >= self.start_time && time < self.end_time && self.applies_on(date.weekday())
        }
    }
}

/// One rotation rule: participants take turns, each holding the layer for
/// `rotation_length`, counted from `anchor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationLayer {
    participants: Vec<String>,
    rotation_length: Duration,
    anchor: DateTime<Utc>,
    restriction: Option<Restriction>,
}

impl RotationLayer {
    /// # Errors
    ///
    /// Returns [`DutyError::MalformedSpec`] if `participants` is empty or
    /// contains a blank id, or if `rotation_length` is not strictly positive.
    pub fn new(
        participants: Vec<String>,
        rotation_length: Duration,
        anchor: DateTime<Utc>,
    ) -> Result<Self> {
        if participants.is_empty() {
            return Err(DutyError::malformed(
                "participants",
                "participant list is empty",
            ));
        }
        if let Some(i) = participants.iter().position(|p| p.trim().is_empty()) {
            return Err(DutyError::malformed(
                format!("participants[{i}]"),
                "participant id is blank",
            ));
        }
        if rotation_length.num_milliseconds() <= 0 {
            return Err(DutyError::malformed(
                "rotation_length",
                "rotation length must be positive",
            ));
        }
        Ok(Self {
            participants,
            rotation_length,
            anchor,
            restriction: None,
        })
    }

    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn rotation_length(&self) -> Duration {
        self.rotation_length
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    /// Index of the rotation period containing `t`. Floors for instants
    /// before the anchor, so period -1 ends exactly at the anchor.
    pub fn period_index(&self, t: DateTime<Utc>) -> i64 {
        let elapsed = (t - self.anchor).num_milliseconds();
        elapsed.div_euclid(self.rotation_length.num_milliseconds())
    }

    /// Start of the rotation period with the given index.
    pub fn period_start(&self, index: i64) -> DateTime<Utc> {
        self.anchor + Duration::milliseconds(self.rotation_length.num_milliseconds() * index)
    }

    /// The participant whose turn it is at `t`, ignoring the restriction.
    pub fn participant_at(&self, t: DateTime<Utc>) -> &str {
        let len = self.participants.len() as i64;
        let idx = self.period_index(t).rem_euclid(len) as usize;
        &self.participants[idx]
    }

    /// The participant on this layer at `t`, or `None` when a restriction
    /// makes the layer inactive.
    pub fn active_participant_at(&self, t: DateTime<Utc>, tz: &Tz) -> Option<&str> {
        match &self.restriction {
            Some(r) if !r.is_open(t.with_timezone(tz).naive_local()) => None,
            _ => Some(self.participant_at(t)),
        }
    }
}

/// A manually pinned assignment that wins over every layer for its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    participant: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Override {
    /// # Errors
    ///
    /// Returns [`DutyError::MalformedSpec`] if the participant is blank or
    /// `start >= end`.
    pub fn new(
        participant: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        let participant = participant.into();
        if participant.trim().is_empty() {
            return Err(DutyError::malformed("participant", "participant id is blank"));
        }
        if start >= end {
            return Err(DutyError::malformed(
                "start",
                format!(
                    "override start {} is not before end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                ),
            ));
        }
        Ok(Self {
            participant,
            start,
            end,
        })
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn covers(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

/// A named, validated schedule. Layers are ordered lowest to highest
/// precedence; overrides keep declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSpec {
    name: String,
    time_zone: Tz,
    layers: Vec<RotationLayer>,
    overrides: Vec<Override>,
}

impl ScheduleSpec {
    pub fn new(name: impl Into<String>, time_zone: Tz) -> Self {
        Self {
            name: name.into(),
            time_zone,
            layers: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: RotationLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn with_override(mut self, ov: Override) -> Self {
        self.overrides.push(ov);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn layers(&self) -> &[RotationLayer] {
        &self.layers
    }

    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// Every distinct participant named anywhere in the schedule, in first-seen order.
    pub fn participants(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let names = self
            .layers
            .iter()
            .flat_map(|l| l.participants.iter().map(String::as_str))
            .chain(self.overrides.iter().map(|o| o.participant.as_str()));
        for name in names {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Read and validate a schedule document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded schedule document");
        Self::from_yaml(&text)
    }

    /// Parse and validate a schedule document.
    ///
    /// # Errors
    ///
    /// Returns [`DutyError::MalformedSpec`] naming the first offending field.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(text)
            .map_err(|e| DutyError::malformed("document", e.to_string()))?;

        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| DutyError::malformed("name", "schedule name is required"))?;

        let tz_name = raw
            .time_zone
            .ok_or_else(|| DutyError::malformed("time_zone", "time zone is required"))?;
        let time_zone = parse_timezone(&tz_name)?;

        if raw.layers.is_empty() && raw.overrides.is_empty() {
            return Err(DutyError::malformed(
                "layers",
                "schedule declares no layers and no overrides",
            ));
        }

        let mut spec = ScheduleSpec::new(name, time_zone);

        for (i, layer) in raw.layers.into_iter().enumerate() {
            let layer = build_layer(layer, &time_zone)
                .map_err(|e| prefix_field(e, &format!("layers[{i}]")))?;
            spec.layers.push(layer);
        }

        for (i, ov) in raw.overrides.into_iter().enumerate() {
            let ov = build_override(ov).map_err(|e| prefix_field(e, &format!("overrides[{i}]")))?;
            spec.overrides.push(ov);
        }

        tracing::debug!(
            schedule = %spec.name,
            layers = spec.layers.len(),
            overrides = spec.overrides.len(),
            "validated schedule"
        );
        Ok(spec)
    }
}

fn build_layer(raw: RawLayer, tz: &Tz) -> Result<RotationLayer> {
    let length_str = raw
        .rotation_length
        .ok_or_else(|| DutyError::malformed("rotation_length", "rotation length is required"))?;
    let rotation_length = parse_duration(&length_str)
        .map_err(|reason| DutyError::malformed("rotation_length", reason))?;

    let anchor = match raw.anchor {
        Some(s) => parse_rfc3339(&s).map_err(|e| prefix_field(e, "anchor"))?,
        None => default_anchor(tz),
    };

    let mut layer = RotationLayer::new(raw.participants, rotation_length, anchor)?;

    if let Some(r) = raw.restriction {
        let restriction = build_restriction(r).map_err(|e| prefix_field(e, "restriction"))?;
        layer = layer.with_restriction(restriction);
    }
    Ok(layer)
}

fn build_restriction(raw: RawRestriction) -> Result<Restriction> {
    let start = raw
        .start_time
        .ok_or_else(|| DutyError::malformed("start_time", "start time is required"))?;
    let end = raw
        .end_time
        .ok_or_else(|| DutyError::malformed("end_time", "end time is required"))?;
    let start_time = parse_time_of_day(&start).map_err(|e| prefix_field(e, "start_time"))?;
    let end_time = parse_time_of_day(&end).map_err(|e| prefix_field(e, "end_time"))?;

    let mut days = Vec::with_capacity(raw.days.len());
    for (i, d) in raw.days.iter().enumerate() {
        let day = parse_weekday(&d.trim().to_lowercase()).ok_or_else(|| {
            DutyError::malformed(format!("days[{i}]"), format!("unknown weekday '{d}'"))
        })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }

    Restriction::new(start_time, end_time, days).map_err(strip_field)
}

fn build_override(raw: RawOverride) -> Result<Override> {
    let participant = raw
        .participant
        .ok_or_else(|| DutyError::malformed("participant", "participant is required"))?;
    let start = raw
        .start
        .ok_or_else(|| DutyError::malformed("start", "start is required"))?;
    let end = raw
        .end
        .ok_or_else(|| DutyError::malformed("end", "end is required"))?;
    let start = parse_rfc3339(&start).map_err(|e| prefix_field(e, "start"))?;
    let end = parse_rfc3339(&end).map_err(|e| prefix_field(e, "end"))?;
    Override::new(participant, start, end).map_err(strip_field)
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Prepend a path segment to a `MalformedSpec` field. An empty inner field
/// means the error belongs to the parent itself.
fn prefix_field(err: DutyError, parent: &str) -> DutyError {
    match err {
        DutyError::MalformedSpec { field, reason } => {
            let field = if field.is_empty() {
                parent.to_string()
            } else if field.starts_with('[') {
                format!("{parent}{field}")
            } else {
                format!("{parent}.{field}")
            };
            DutyError::MalformedSpec { field, reason }
        }
        other => other,
    }
}

/// Errors raised by whole-entity constructors (start/end ordering, equal
/// restriction bounds) belong to the entity, not one of its keys.
fn strip_field(err: DutyError) -> DutyError {
    match err {
        DutyError::MalformedSpec { field, reason }
            if field == "start" || field == "restriction" =>
        {
            DutyError::MalformedSpec {
                field: String::new(),
                reason,
            }
        }
        other => other,
    }
}

/// Midnight on 1970-01-01 in the schedule's zone: rotation phase must not
/// depend on the queried window.
fn default_anchor(tz: &Tz) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parse an RFC 3339 string into a UTC datetime.
pub(crate) fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DutyError::malformed("", format!("invalid timestamp '{s}': {e}")))
}

/// Parse an IANA timezone string into `Tz`.
fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| DutyError::malformed("time_zone", format!("unknown time zone '{s}'")))
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| DutyError::malformed("", format!("invalid time of day '{s}', expected HH:MM")))
}

/// Parse a weekday name (full and abbreviated, lowercase).
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = r#"
name: platform-primary
time_zone: America/New_York
layers:
  - participants: [alice, bob]
    rotation_length: 7d
    anchor: "2026-01-05T09:00:00-05:00"
  - participants: [carol]
    rotation_length: 1d
    anchor: "2026-01-05T00:00:00Z"
    restriction:
      start_time: "18:00"
      end_time: "08:00"
      days: [mon, Tuesday, fri]
overrides:
  - participant: dave
    start: "2026-01-15T00:00:00Z"
    end: "2026-01-17T00:00:00Z"
"#;

    fn field_of(err: DutyError) -> String {
        match err {
            DutyError::MalformedSpec { field, .. } => field,
            other => panic!("expected MalformedSpec, got {other:?}"),
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    // ── parsing ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_full_document() {
        let spec = ScheduleSpec::from_yaml(FULL_DOC).unwrap();
        assert_eq!(spec.name(), "platform-primary");
        assert_eq!(spec.time_zone(), chrono_tz::America::New_York);
        assert_eq!(spec.layers().len(), 2);
        assert_eq!(spec.overrides().len(), 1);

        let base = &spec.layers()[0];
        assert_eq!(base.participants(), ["alice", "bob"]);
        assert_eq!(base.rotation_length(), Duration::days(7));
        assert_eq!(base.anchor(), utc("2026-01-05T14:00:00Z"));
        assert!(base.restriction().is_none());

        let nights = spec.layers()[1].restriction().unwrap();
        assert!(nights.wraps_midnight());
        assert_eq!(nights.days(), [Weekday::Mon, Weekday::Tue, Weekday::Fri]);

        assert_eq!(spec.overrides()[0].participant(), "dave");
        assert_eq!(spec.participants(), ["alice", "bob", "carol", "dave"]);
    }

    #[test]
    fn test_missing_anchor_defaults_to_local_epoch() {
        let doc = "name: s\ntime_zone: Europe/Berlin\nlayers:\n  - participants: [a]\n    rotation_length: 1d\n";
        let spec = ScheduleSpec::from_yaml(doc).unwrap();
        // Berlin was UTC+1 on 1970-01-01
        assert_eq!(spec.layers()[0].anchor(), utc("1969-12-31T23:00:00Z"));
    }

    #[test]
    fn test_overrides_only_document_is_valid() {
        let doc = r#"
name: s
time_zone: UTC
overrides:
  - participant: a
    start: "2026-01-01T00:00:00Z"
    end: "2026-01-02T00:00:00Z"
"#;
        let spec = ScheduleSpec::from_yaml(doc).unwrap();
        assert!(spec.layers().is_empty());
    }

    // ── validation failures ─────────────────────────────────────────────

    #[test]
    fn test_reject_yaml_syntax_error() {
        let err = ScheduleSpec::from_yaml("name: [unterminated").unwrap_err();
        assert_eq!(field_of(err), "document");
    }

    #[test]
    fn test_reject_unknown_key() {
        let doc = "name: s\ntime_zone: UTC\nlayerz: []\n";
        let err = ScheduleSpec::from_yaml(doc).unwrap_err();
        assert_eq!(field_of(err), "document");
    }

    #[test]
    fn test_reject_missing_name() {
        let doc = "time_zone: UTC\nlayers:\n  - participants: [a]\n    rotation_length: 1d\n";
        assert_eq!(field_of(ScheduleSpec::from_yaml(doc).unwrap_err()), "name");
    }

    #[test]
    fn test_reject_unknown_timezone() {
        let doc = "name: s\ntime_zone: Mars/Olympus\nlayers:\n  - participants: [a]\n    rotation_length: 1d\n";
        let err = ScheduleSpec::from_yaml(doc).unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"), "got: {err}");
        assert_eq!(field_of(err), "time_zone");
    }

    #[test]
    fn test_reject_empty_schedule() {
        let doc = "name: s\ntime_zone: UTC\n";
        assert_eq!(field_of(ScheduleSpec::from_yaml(doc).unwrap_err()), "layers");
    }

    #[test]
    fn test_reject_missing_participant_list() {
        let doc = r#"
name: s
time_zone: UTC
layers:
  - participants: [a]
    rotation_length: 1d
  - rotation_length: 1d
"#;
        let err = ScheduleSpec::from_yaml(doc).unwrap_err();
        assert!(err.to_string().contains("participant list is empty"), "got: {err}");
        assert_eq!(field_of(err), "layers[1].participants");
    }

    #[test]
    fn test_reject_blank_participant() {
        let doc = "name: s\ntime_zone: UTC\nlayers:\n  - participants: [a, '  ']\n    rotation_length: 1d\n";
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].participants[1]"
        );
    }

    #[test]
    fn test_reject_zero_rotation_length() {
        let doc = "name: s\ntime_zone: UTC\nlayers:\n  - participants: [a]\n    rotation_length: 0h\n";
        let err = ScheduleSpec::from_yaml(doc).unwrap_err();
        assert!(err.to_string().contains("must be positive"), "got: {err}");
        assert_eq!(field_of(err), "layers[0].rotation_length");
    }

    #[test]
    fn test_reject_unparseable_rotation_length() {
        let doc = "name: s\ntime_zone: UTC\nlayers:\n  - participants: [a]\n    rotation_length: weekly\n";
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].rotation_length"
        );
    }

    #[test]
    fn test_reject_bad_anchor() {
        let doc = "name: s\ntime_zone: UTC\nlayers:\n  - participants: [a]\n    rotation_length: 1d\n    anchor: yesterday\n";
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].anchor"
        );
    }

    #[test]
    fn test_reject_override_start_not_before_end() {
        let doc = r#"
name: s
time_zone: UTC
overrides:
  - participant: a
    start: "2026-01-01T00:00:00Z"
    end: "2026-01-02T00:00:00Z"
  - participant: b
    start: "2026-01-03T00:00:00Z"
    end: "2026-01-03T00:00:00Z"
"#;
        let err = ScheduleSpec::from_yaml(doc).unwrap_err();
        assert!(err.to_string().contains("not before end"), "got: {err}");
        assert_eq!(field_of(err), "overrides[1]");
    }

    #[test]
    fn test_reject_override_missing_end() {
        let doc = "name: s\ntime_zone: UTC\noverrides:\n  - participant: a\n    start: \"2026-01-01T00:00:00Z\"\n";
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "overrides[0].end"
        );
    }

    #[test]
    fn test_reject_unknown_weekday() {
        let doc = r#"
name: s
time_zone: UTC
layers:
  - participants: [a]
    rotation_length: 1d
    restriction:
      start_time: "09:00"
      end_time: "17:00"
      days: [mon, funday]
"#;
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].restriction.days[1]"
        );
    }

    #[test]
    fn test_reject_equal_restriction_bounds() {
        let doc = r#"
name: s
time_zone: UTC
layers:
  - participants: [a]
    rotation_length: 1d
    restriction:
      start_time: "09:00"
      end_time: "09:00:00"
"#;
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].restriction"
        );
    }

    #[test]
    fn test_reject_bad_time_of_day() {
        let doc = r#"
name: s
time_zone: UTC
layers:
  - participants: [a]
    rotation_length: 1d
    restriction:
      start_time: "9am"
      end_time: "17:00"
"#;
        assert_eq!(
            field_of(ScheduleSpec::from_yaml(doc).unwrap_err()),
            "layers[0].restriction.start_time"
        );
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let err = ScheduleSpec::from_path("/nonexistent/dutysync/schedule.yaml").unwrap_err();
        assert!(matches!(err, DutyError::Io(_)), "got: {err:?}");
    }

    // ── rotation arithmetic ─────────────────────────────────────────────

    #[test]
    fn test_participant_at_cycles() {
        let anchor = utc("2026-01-01T00:00:00Z");
        let layer = RotationLayer::new(
            vec!["a".into(), "b".into(), "c".into()],
            Duration::days(1),
            anchor,
        )
        .unwrap();
        assert_eq!(layer.participant_at(anchor), "a");
        assert_eq!(layer.participant_at(anchor + Duration::hours(36)), "b");
        assert_eq!(layer.participant_at(anchor + Duration::days(3)), "a");
    }

    #[test]
    fn test_participant_before_anchor_floors() {
        let anchor = utc("2026-01-01T00:00:00Z");
        let layer =
            RotationLayer::new(vec!["a".into(), "b".into()], Duration::days(7), anchor).unwrap();
        assert_eq!(layer.period_index(anchor - Duration::seconds(1)), -1);
        assert_eq!(layer.participant_at(anchor - Duration::seconds(1)), "b");
        assert_eq!(layer.participant_at(anchor - Duration::days(8)), "a");
    }

    #[test]
    fn test_restriction_daytime() {
        let r = Restriction::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            vec![Weekday::Mon],
        )
        .unwrap();
        // 2026-01-05 is a Monday
        let monday = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(r.is_open(monday.and_hms_opt(9, 0, 0).unwrap()));
        assert!(!r.is_open(monday.and_hms_opt(17, 0, 0).unwrap()));
        assert!(!r.is_open(monday.succ_opt().unwrap().and_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn test_restriction_overnight_uses_opening_day() {
        let r = Restriction::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            vec![Weekday::Fri],
        )
        .unwrap();
        let friday = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let saturday = friday.succ_opt().unwrap();
        assert!(r.is_open(friday.and_hms_opt(23, 0, 0).unwrap()));
        assert!(r.is_open(saturday.and_hms_opt(5, 59, 0).unwrap()));
        assert!(!r.is_open(saturday.and_hms_opt(23, 0, 0).unwrap()));
        assert!(!r.is_open(friday.and_hms_opt(5, 0, 0).unwrap()));
    }

    #[test]
    fn test_active_participant_respects_timezone() {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let layer = RotationLayer::new(vec!["a".into()], Duration::days(1), epoch)
            .unwrap()
            .with_restriction(
                Restriction::new(
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                    vec![],
                )
                .unwrap(),
            );
        let tz = chrono_tz::Asia::Tokyo;
        // 01:00 UTC = 10:00 JST
        assert_eq!(layer.active_participant_at(utc("2026-03-02T01:00:00Z"), &tz), Some("a"));
        // 12:00 UTC = 21:00 JST
        assert_eq!(layer.active_participant_at(utc("2026-03-02T12:00:00Z"), &tz), None);
    }
}
