//! Session and target records, their status, and the reveal transition.
//!
//! A [`Session`] is serialized as one JSON document with camelCase keys.
//! Timestamps are written as RFC 3339 strings.

use crate::code;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::{Duration, Month, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A batch of targets created together and sharing one reveal time.
pub struct Session {
    /// 16-character lowercase hex id; also the file stem on disk.
    pub id: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Targets in creation order.
    pub targets: Vec<Target>,
    /// When the session was created.
    #[serde(with = "timestamp")]
    pub created_at: OffsetDateTime,
    /// When targets become eligible for reveal without forcing.
    #[serde(with = "timestamp")]
    pub reveal_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One image assignment within a session, hidden until revealed.
pub struct Target {
    /// Code the user records and later types to reveal.
    pub code: String,
    /// Image (or panorama) URL.
    #[serde(rename = "targetUrl")]
    pub url: String,
    /// Human-readable description of the image.
    #[serde(rename = "targetDescription")]
    pub description: String,
    /// Provider tag, e.g. `unsplash`.
    #[serde(rename = "targetSource")]
    pub source: String,
    /// Provider page for the image.
    #[serde(
        rename = "targetSourceUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_url: Option<String>,
    /// Map pin for the image location, when the provider knows one.
    #[serde(
        rename = "targetLocationUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub location_url: Option<String>,
    /// Capture date in `YYYY-MM` form, when known.
    #[serde(rename = "targetDate", default, skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<String>,
    /// Whether the target has been revealed.
    pub revealed: bool,
    /// When the target was revealed. Present iff `revealed`.
    #[serde(
        rename = "revealedAt",
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub revealed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a session or target stands relative to its reveal time.
pub enum Status {
    /// Reveal time not reached yet.
    Active {
        /// Time left until the reveal time.
        remaining: Duration,
    },
    /// Reveal time reached and something is still hidden.
    Ready,
    /// Already revealed (for a session: every target).
    Revealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Result of [`Target::reveal`].
pub enum RevealOutcome {
    /// The target flipped from hidden to revealed.
    Revealed,
    /// The target was revealed earlier; nothing changed.
    AlreadyRevealed,
}

impl Session {
    /// Build a session with no targets yet.
    ///
    /// # Errors
    /// Returns an error if `duration` is negative.
    pub fn new(
        id: String,
        name: Option<String>,
        created_at: OffsetDateTime,
        duration: Duration,
    ) -> anyhow::Result<Self> {
        if duration.is_negative() {
            return Err(anyhow::anyhow!("duration must not be negative"));
        }
        let reveal_at = created_at
            .checked_add(duration)
            .context("reveal time out of range")?;
        Ok(Self {
            id,
            name,
            targets: Vec::new(),
            created_at,
            reveal_at,
        })
    }

    /// Name if set, otherwise the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Whether the reveal time has been reached.
    #[must_use]
    pub fn can_reveal(&self, now: OffsetDateTime) -> bool {
        now >= self.reveal_at
    }

    /// Time left until the reveal time; zero once reached.
    #[must_use]
    pub fn time_remaining(&self, now: OffsetDateTime) -> Duration {
        if self.can_reveal(now) {
            Duration::ZERO
        } else {
            self.reveal_at - now
        }
    }

    /// Number of revealed targets.
    #[must_use]
    pub fn revealed_count(&self) -> usize {
        self.targets.iter().filter(|t| t.revealed).count()
    }

    /// Whether every target has been revealed.
    #[must_use]
    pub fn fully_revealed(&self) -> bool {
        self.targets.iter().all(|t| t.revealed)
    }

    /// Whether at least one target is still hidden.
    #[must_use]
    pub fn has_unrevealed(&self) -> bool {
        !self.fully_revealed()
    }

    /// Session-level status.
    #[must_use]
    pub fn status(&self, now: OffsetDateTime) -> Status {
        if self.fully_revealed() {
            Status::Revealed
        } else {
            self.time_status(now)
        }
    }

    fn time_status(&self, now: OffsetDateTime) -> Status {
        if self.can_reveal(now) {
            Status::Ready
        } else {
            Status::Active {
                remaining: self.time_remaining(now),
            }
        }
    }

    /// Status of one of this session's targets.
    #[must_use]
    pub fn target_status(&self, target: &Target, now: OffsetDateTime) -> Status {
        if target.revealed {
            Status::Revealed
        } else {
            self.time_status(now)
        }
    }

    /// Index of the target whose code matches `code` (ignoring case and separators).
    #[must_use]
    pub fn find_target(&self, code: &str) -> Option<usize> {
        self.targets
            .iter()
            .position(|t| code::codes_match(&t.code, code))
    }

    /// Check the record invariants.
    ///
    /// # Errors
    /// Returns an error if the reveal time precedes creation, or a target's
    /// `revealed`/`revealedAt` pair is inconsistent or predates the session.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.reveal_at < self.created_at {
            return Err(anyhow::anyhow!(
                "session {}: revealAt precedes createdAt",
                self.id
            ));
        }
        for t in &self.targets {
            match (t.revealed, t.revealed_at) {
                (true, Some(at)) if at < self.created_at => {
                    return Err(anyhow::anyhow!(
                        "session {}: target {} revealed before the session was created",
                        self.id,
                        t.code
                    ));
                }
                (true, Some(_)) | (false, None) => {}
                (true, None) => {
                    return Err(anyhow::anyhow!(
                        "session {}: target {} is revealed but has no revealedAt",
                        self.id,
                        t.code
                    ));
                }
                (false, Some(_)) => {
                    return Err(anyhow::anyhow!(
                        "session {}: target {} has revealedAt but is not revealed",
                        self.id,
                        t.code
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Target {
    /// A hidden target.
    #[must_use]
    pub fn new(code: String, url: String, description: String, source: String) -> Self {
        Self {
            code,
            url,
            description,
            source,
            source_url: None,
            location_url: None,
            capture_date: None,
            revealed: false,
            revealed_at: None,
        }
    }

    /// Flip the target to revealed at `now`. A second call keeps the first timestamp.
    pub fn reveal(&mut self, now: OffsetDateTime) -> RevealOutcome {
        if self.revealed {
            return RevealOutcome::AlreadyRevealed;
        }
        self.revealed = true;
        self.revealed_at = Some(now);
        RevealOutcome::Revealed
    }
}

/// Render a `YYYY-MM` capture date as e.g. `January 2018`.
///
/// Anything else is returned unchanged.
#[must_use]
pub fn format_capture_date(raw: &str) -> String {
    let parsed = raw.split_once('-').and_then(|(year, month)| {
        let year: i32 = year.parse().ok()?;
        let month: u8 = month.parse().ok()?;
        let month = Month::try_from(month).ok()?;
        Some(format!("{month} {year}"))
    });
    parsed.unwrap_or_else(|| raw.to_string())
}

/// Serde helpers for RFC 3339 timestamps.
///
/// Reading also accepts naive `YYYY-MM-DDTHH:MM:SS[.ffffff]` values. Older
/// session files wrote local wall-clock time that way, so naive values are
/// placed at the offset set by [`timestamp::with_naive_offset`] (UTC outside
/// of it).
pub mod timestamp {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::cell::Cell;
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

    thread_local! {
        static NAIVE_OFFSET: Cell<UtcOffset> = const { Cell::new(UtcOffset::UTC) };
    }

    /// Run `f` with naive timestamps read at `offset`.
    pub fn with_naive_offset<T>(offset: UtcOffset, f: impl FnOnce() -> T) -> T {
        let previous = NAIVE_OFFSET.with(|cell| cell.replace(offset));
        let out = f();
        NAIVE_OFFSET.with(|cell| cell.set(previous));
        out
    }

    /// Parse an RFC 3339 timestamp, or a naive ISO-8601 one at the current
    /// naive offset.
    ///
    /// # Errors
    /// Returns an error if `s` is neither form.
    pub fn parse(s: &str) -> anyhow::Result<OffsetDateTime> {
        parse_at(s, NAIVE_OFFSET.with(Cell::get))
    }

    /// Parse an RFC 3339 timestamp, or a naive ISO-8601 one at `naive_offset`.
    ///
    /// # Errors
    /// Returns an error if `s` is neither form.
    pub fn parse_at(s: &str, naive_offset: UtcOffset) -> anyhow::Result<OffsetDateTime> {
        if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(ts);
        }
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        let base = PrimitiveDateTime::parse(
            whole,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
        .map_err(|err| anyhow::anyhow!("invalid timestamp {s:?}: {err}"))?;
        let nanos = parse_fraction(fraction)
            .ok_or_else(|| anyhow::anyhow!("invalid fractional seconds in {s:?}"))?;
        let ts = base
            .replace_nanosecond(nanos)
            .map_err(|err| anyhow::anyhow!("invalid timestamp {s:?}: {err}"))?;
        Ok(ts.assume_offset(naive_offset).to_offset(UtcOffset::UTC))
    }

    fn parse_fraction(digits: &str) -> Option<u32> {
        if digits.is_empty() {
            return Some(0);
        }
        if digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u32 = digits.parse().ok()?;
        let scale = 10_u32.checked_pow(u32::try_from(9 - digits.len()).ok()?)?;
        value.checked_mul(scale)
    }

    /// Format as RFC 3339.
    ///
    /// # Errors
    /// Returns an error if the timestamp cannot be represented.
    pub fn format(ts: OffsetDateTime) -> anyhow::Result<String> {
        ts.format(&Rfc3339)
            .map_err(|err| anyhow::anyhow!("format RFC3339 timestamp: {err}"))
    }

    /// Serialize an [`OffsetDateTime`] as RFC 3339.
    ///
    /// # Errors
    /// Returns the serializer's error if formatting fails.
    pub fn serialize<S: Serializer>(ts: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
        let raw = format(*ts).map_err(serde::ser::Error::custom)?;
        s.serialize_str(&raw)
    }

    /// Deserialize an [`OffsetDateTime`] from RFC 3339 or naive ISO-8601.
    ///
    /// # Errors
    /// Returns the deserializer's error for malformed input.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Same as the parent module, for `Option<OffsetDateTime>`.
    pub mod option {
        use serde::{de, Deserialize, Deserializer, Serializer};
        use time::OffsetDateTime;

        /// Serialize an optional timestamp (`null` when absent).
        ///
        /// # Errors
        /// Returns the serializer's error if formatting fails.
        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            ts: &Option<OffsetDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => super::serialize(ts, s),
                None => s.serialize_none(),
            }
        }

        /// Deserialize an optional timestamp.
        ///
        /// # Errors
        /// Returns the deserializer's error for malformed input.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            let raw: Option<String> = Option::deserialize(d)?;
            raw.map(|raw| super::parse(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, ensure};
    use time::macros::{datetime, offset};

    fn sample(duration: Duration) -> anyhow::Result<Session> {
        let mut session = Session::new(
            "0123456789abcdef".to_string(),
            Some("morning".to_string()),
            datetime!(2026-01-11 12:00 UTC),
            duration,
        )?;
        session.targets.push(Target::new(
            "AB3D-X7K2".to_string(),
            "https://images.example/1.jpg".to_string(),
            "A red barn in a snowy field".to_string(),
            "unsplash".to_string(),
        ));
        session.targets.push(Target::new(
            "QRST-0001".to_string(),
            "https://images.example/2.jpg".to_string(),
            "Lighthouse".to_string(),
            "unsplash".to_string(),
        ));
        Ok(session)
    }

    #[test]
    fn zero_duration_is_immediately_revealable() -> anyhow::Result<()> {
        let session = sample(Duration::ZERO)?;
        ensure!(session.reveal_at == session.created_at);
        ensure!(session.can_reveal(session.created_at));
        ensure!(session.status(session.created_at) == Status::Ready);
        ensure!(session.time_remaining(session.created_at) == Duration::ZERO);
        Ok(())
    }

    #[test]
    fn negative_duration_is_rejected() -> anyhow::Result<()> {
        let res = Session::new(
            "00".to_string(),
            None,
            datetime!(2026-01-11 12:00 UTC),
            Duration::minutes(-1),
        );
        ensure!(res.is_err());
        Ok(())
    }

    #[test]
    fn status_moves_from_active_to_ready_to_revealed() -> anyhow::Result<()> {
        let mut session = sample(Duration::minutes(60))?;
        let early = datetime!(2026-01-11 12:29:30 UTC);
        match session.status(early) {
            Status::Active { remaining } => {
                ensure!(remaining.whole_minutes() == 30);
                ensure!(remaining.whole_seconds() == 30 * 60 + 30);
            }
            other => bail!("expected Active, got {other:?}"),
        }

        let late = datetime!(2026-01-11 13:00 UTC);
        ensure!(session.status(late) == Status::Ready);

        for t in &mut session.targets {
            t.reveal(late);
        }
        ensure!(session.status(early) == Status::Revealed);
        ensure!(session.fully_revealed());
        ensure!(!session.has_unrevealed());
        Ok(())
    }

    #[test]
    fn target_status_tracks_each_target() -> anyhow::Result<()> {
        let mut session = sample(Duration::minutes(5))?;
        let now = datetime!(2026-01-11 12:10 UTC);
        if let Some(t) = session.targets.first_mut() {
            t.reveal(now);
        }
        let first = session.targets.first().cloned();
        let second = session.targets.get(1).cloned();
        let (Some(first), Some(second)) = (first, second) else {
            bail!("missing targets");
        };
        ensure!(session.target_status(&first, now) == Status::Revealed);
        ensure!(session.target_status(&second, now) == Status::Ready);
        ensure!(session.status(now) == Status::Ready);
        ensure!(session.revealed_count() == 1);
        Ok(())
    }

    #[test]
    fn reveal_is_one_way_and_keeps_first_timestamp() -> anyhow::Result<()> {
        let mut target = Target::new(
            "AB3D-X7K2".to_string(),
            "u".to_string(),
            "d".to_string(),
            "unsplash".to_string(),
        );
        let first = datetime!(2026-01-11 13:00 UTC);
        let second = datetime!(2026-01-12 09:00 UTC);
        ensure!(target.reveal(first) == RevealOutcome::Revealed);
        ensure!(target.reveal(second) == RevealOutcome::AlreadyRevealed);
        ensure!(target.revealed);
        ensure!(target.revealed_at == Some(first));
        Ok(())
    }

    #[test]
    fn find_target_ignores_case_and_separators() -> anyhow::Result<()> {
        let session = sample(Duration::minutes(1))?;
        ensure!(session.find_target("ab3dx7k2") == Some(0));
        ensure!(session.find_target("qrst-0001") == Some(1));
        ensure!(session.find_target("ZZZZ-ZZZZ").is_none());
        Ok(())
    }

    #[test]
    fn validate_catches_inconsistent_targets() -> anyhow::Result<()> {
        let mut session = sample(Duration::minutes(1))?;
        session.validate()?;

        if let Some(t) = session.targets.first_mut() {
            t.revealed = true;
        }
        ensure!(session.validate().is_err());

        if let Some(t) = session.targets.first_mut() {
            t.revealed_at = Some(datetime!(2026-01-10 00:00 UTC));
        }
        ensure!(session.validate().is_err());

        if let Some(t) = session.targets.first_mut() {
            t.revealed_at = Some(datetime!(2026-01-11 12:30 UTC));
        }
        session.validate()?;

        session.reveal_at = datetime!(2026-01-11 11:00 UTC);
        ensure!(session.validate().is_err());
        Ok(())
    }

    #[test]
    fn json_uses_camel_case_and_rfc3339() -> anyhow::Result<()> {
        let mut session = sample(Duration::minutes(60))?;
        if let Some(t) = session.targets.first_mut() {
            t.reveal(datetime!(2026-01-11 13:05 UTC));
            t.source_url = Some("https://unsplash.com/photos/x".to_string());
        }
        let value = serde_json::to_value(&session)?;
        ensure!(value["createdAt"] == "2026-01-11T12:00:00Z");
        ensure!(value["revealAt"] == "2026-01-11T13:00:00Z");
        ensure!(value["targets"][0]["targetSource"] == "unsplash");
        ensure!(value["targets"][0]["targetSourceUrl"] == "https://unsplash.com/photos/x");
        ensure!(value["targets"][0]["revealedAt"] == "2026-01-11T13:05:00Z");
        ensure!(value["targets"][1].get("revealedAt").is_none());
        ensure!(value["targets"][1].get("targetLocationUrl").is_none());

        let back: Session = serde_json::from_value(value)?;
        ensure!(back == session);
        Ok(())
    }

    #[test]
    fn naive_timestamps_default_to_utc() -> anyhow::Result<()> {
        ensure!(timestamp::parse("2025-11-02T08:15:30")? == datetime!(2025-11-02 08:15:30 UTC));
        ensure!(
            timestamp::parse("2025-11-02T08:15:30.250000")?
                == datetime!(2025-11-02 08:15:30.25 UTC)
        );
        ensure!(
            timestamp::parse("2025-11-02T08:15:30+02:00")? == datetime!(2025-11-02 06:15:30 UTC)
        );
        ensure!(timestamp::parse("yesterday").is_err());
        ensure!(timestamp::parse("2025-11-02T08:15:30.12x").is_err());
        Ok(())
    }

    #[test]
    fn naive_timestamps_follow_the_local_offset() -> anyhow::Result<()> {
        let plus_two = offset!(+2);
        ensure!(
            timestamp::parse_at("2025-11-02T08:15:30", plus_two)?
                == datetime!(2025-11-02 06:15:30 UTC)
        );
        let explicit = timestamp::parse_at("2025-11-02T08:15:30Z", plus_two)?;
        ensure!(explicit == datetime!(2025-11-02 08:15:30 UTC));

        let scoped = timestamp::with_naive_offset(offset!(-5), || {
            timestamp::parse("2025-11-02T08:15:30")
        })?;
        ensure!(scoped == datetime!(2025-11-02 13:15:30 UTC));
        ensure!(timestamp::parse("2025-11-02T08:15:30")? == datetime!(2025-11-02 08:15:30 UTC));

        let legacy = r#"{"id":"0123456789abcdef","targets":[],
            "createdAt":"2025-11-02T08:15:30","revealAt":"2025-11-02T09:15:30"}"#;
        let session = timestamp::with_naive_offset(plus_two, || {
            serde_json::from_str::<Session>(legacy)
        })?;
        ensure!(session.created_at == datetime!(2025-11-02 06:15:30 UTC));
        ensure!(session.reveal_at == datetime!(2025-11-02 07:15:30 UTC));
        Ok(())
    }

    #[test]
    fn capture_date_formatting() -> anyhow::Result<()> {
        ensure!(format_capture_date("2018-01") == "January 2018");
        ensure!(format_capture_date("2021-12") == "December 2021");
        ensure!(format_capture_date("2021-13") == "2021-13");
        ensure!(format_capture_date("sometime") == "sometime");
        Ok(())
    }
}
