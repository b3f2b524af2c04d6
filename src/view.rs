//! JSON views of sessions for `--json` output.
//!
//! Stored records carry every target's image. These views drop the image
//! fields of targets that are still hidden, so machine-readable output shows
//! no more than the text views do.

use crate::commands::{Lookup, RevealReport, RevealStatus};
use crate::session::{timestamp, Session, Target};
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// A target as shown to the user.
pub struct TargetView<'a> {
    /// Target code.
    pub code: &'a str,
    /// Provider tag.
    #[serde(rename = "targetSource")]
    pub source: &'a str,
    /// Whether the target has been revealed.
    pub revealed: bool,
    /// When it was revealed.
    #[serde(with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<OffsetDateTime>,
    /// Image URL; absent while hidden.
    #[serde(rename = "targetUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    /// Image description; absent while hidden.
    #[serde(rename = "targetDescription", skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    /// Provider page; absent while hidden.
    #[serde(rename = "targetSourceUrl", skip_serializing_if = "Option::is_none")]
    pub source_url: Option<&'a str>,
    /// Map pin; absent while hidden.
    #[serde(rename = "targetLocationUrl", skip_serializing_if = "Option::is_none")]
    pub location_url: Option<&'a str>,
    /// Capture date; absent while hidden.
    #[serde(rename = "targetDate", skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<&'a str>,
}

impl<'a> TargetView<'a> {
    /// Show the image fields only if the target is revealed.
    #[must_use]
    pub fn redacted(target: &'a Target) -> Self {
        if target.revealed {
            Self::full(target)
        } else {
            Self {
                url: None,
                description: None,
                source_url: None,
                location_url: None,
                capture_date: None,
                ..Self::full(target)
            }
        }
    }

    /// Show everything, hidden or not.
    #[must_use]
    pub fn full(target: &'a Target) -> Self {
        Self {
            code: &target.code,
            source: &target.source,
            revealed: target.revealed,
            revealed_at: target.revealed_at,
            url: Some(&target.url),
            description: Some(&target.description),
            source_url: target.source_url.as_deref(),
            location_url: target.location_url.as_deref(),
            capture_date: target.capture_date.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// A session as shown to the user.
pub struct SessionView<'a> {
    /// Session id.
    pub id: &'a str,
    /// Optional display name.
    pub name: Option<&'a str>,
    /// Targets in creation order.
    pub targets: Vec<TargetView<'a>>,
    /// Creation time.
    #[serde(with = "timestamp")]
    pub created_at: OffsetDateTime,
    /// Reveal time.
    #[serde(with = "timestamp")]
    pub reveal_at: OffsetDateTime,
}

impl<'a> SessionView<'a> {
    /// Hidden targets keep only their code, source and state.
    #[must_use]
    pub fn redacted(session: &'a Session) -> Self {
        Self::with_targets(session, TargetView::redacted)
    }

    /// Every target in full; used by `create --debug`.
    #[must_use]
    pub fn full(session: &'a Session) -> Self {
        Self::with_targets(session, TargetView::full)
    }

    fn with_targets(session: &'a Session, view: fn(&'a Target) -> TargetView<'a>) -> Self {
        Self {
            id: &session.id,
            name: session.name.as_deref(),
            targets: session.targets.iter().map(view).collect(),
            created_at: session.created_at,
            reveal_at: session.reveal_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// JSON form of a `status <query>` result.
pub enum LookupView<'a> {
    /// The query was a session id.
    Session {
        /// The matching session.
        session: SessionView<'a>,
    },
    /// The query was a target code.
    Target {
        /// Session holding the target.
        session: SessionView<'a>,
        /// Index of the target within the session.
        index: usize,
    },
}

impl<'a> From<&'a Lookup> for LookupView<'a> {
    fn from(found: &'a Lookup) -> Self {
        match found {
            Lookup::Session { session } => Self::Session {
                session: SessionView::redacted(session),
            },
            Lookup::Target { session, index } => Self::Target {
                session: SessionView::redacted(session),
                index: *index,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
/// JSON form of a reveal result.
pub struct RevealView<'a> {
    /// How the request ended.
    pub status: RevealStatus,
    /// The session after the request.
    pub session: SessionView<'a>,
    /// Index of the requested target.
    pub index: usize,
}

impl<'a> From<&'a RevealReport> for RevealView<'a> {
    fn from(report: &'a RevealReport) -> Self {
        Self {
            status: report.status,
            session: SessionView::redacted(&report.session),
            index: report.index,
        }
    }
}
