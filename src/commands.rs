//! Command orchestration shared by the CLI and the tests.
//!
//! Functions here take their collaborators (store, image source, confirmation
//! prompt, clock reading) as arguments and return typed results; the binary
//! decides how to print them.

use crate::code;
use crate::id;
use crate::session::{RevealOutcome, Session, Target};
use crate::source::{ImageSource, ImageSourceKind};
use crate::store::SessionStore;
use indicatif::ProgressBar;
use serde::Serialize;
use std::ops::RangeInclusive;
use time::{Duration, OffsetDateTime};

/// Allowed number of targets per session.
pub const TARGET_COUNT_RANGE: RangeInclusive<usize> = 1..=10;

#[derive(Debug, Clone)]
/// Parameters for [`create_session`].
pub struct CreateParams {
    /// Minutes until the targets may be revealed.
    pub duration_minutes: u32,
    /// Number of targets to create.
    pub targets: usize,
    /// Optional session name.
    pub name: Option<String>,
}

fn target_count_error() -> anyhow::Error {
    anyhow::anyhow!(
        "Target count must be between {} and {}",
        TARGET_COUNT_RANGE.start(),
        TARGET_COUNT_RANGE.end()
    )
}

/// Check a requested target count as typed on the command line.
///
/// # Errors
/// Returns an error describing the allowed range for zero, negative or too
/// large counts.
pub fn validate_target_count(count: i64) -> anyhow::Result<usize> {
    usize::try_from(count)
        .ok()
        .filter(|n| TARGET_COUNT_RANGE.contains(n))
        .ok_or_else(target_count_error)
}

/// Create a session with freshly fetched targets and save it.
///
/// Nothing is written unless every target was fetched.
///
/// # Errors
/// Returns an error for an invalid target count, a failed fetch, or a failed save.
pub fn create_session(
    store: &SessionStore,
    source: &dyn ImageSource,
    params: &CreateParams,
    now: OffsetDateTime,
    progress: &ProgressBar,
) -> anyhow::Result<Session> {
    if !TARGET_COUNT_RANGE.contains(&params.targets) {
        return Err(target_count_error());
    }

    let mut session = Session::new(
        id::new_session_id()?,
        params.name.clone(),
        now,
        Duration::minutes(i64::from(params.duration_minutes)),
    )?;

    progress.set_length(u64::try_from(params.targets).unwrap_or(u64::MAX));
    for n in 1..=params.targets {
        let code = code::generate_default()?;
        let image = source
            .fetch_random_image()
            .map_err(|err| anyhow::anyhow!("Error creating target {n}: {err:#}"))?;
        let mut target = Target::new(
            code,
            image.url,
            image.description,
            source.kind().tag().to_string(),
        );
        target.source_url = Some(image.source_url);
        target.location_url = image.location_url;
        target.capture_date = image.capture_date;
        session.targets.push(target);
        progress.inc(1);
    }
    progress.finish_and_clear();

    store.save(&session)?;
    tracing::info!(
        session_id = %session.id,
        targets = session.targets.len(),
        source = %source.kind(),
        "created session"
    );
    Ok(session)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which sessions `list` shows.
pub enum ListFilter {
    /// Sessions with at least one hidden target.
    #[default]
    Unrevealed,
    /// Everything.
    All,
    /// Sessions whose targets are all revealed.
    Revealed,
}

impl ListFilter {
    /// Map the `--all` / `--revealed` flags; `--all` wins.
    #[must_use]
    pub const fn from_flags(all: bool, revealed: bool) -> Self {
        match (all, revealed) {
            (true, _) => Self::All,
            (false, true) => Self::Revealed,
            (false, false) => Self::Unrevealed,
        }
    }

    /// Whether `session` passes this filter.
    #[must_use]
    pub fn matches(self, session: &Session) -> bool {
        match self {
            Self::Unrevealed => session.has_unrevealed(),
            Self::All => true,
            Self::Revealed => session.fully_revealed(),
        }
    }
}

/// Stored sessions passing `filter`, newest first.
///
/// # Errors
/// Returns an error if the sessions cannot be listed.
pub fn list_sessions(store: &SessionStore, filter: ListFilter) -> anyhow::Result<Vec<Session>> {
    Ok(store
        .list()?
        .into_iter()
        .filter(|s| filter.matches(s))
        .collect())
}

#[derive(Debug, Clone)]
/// What a `status` query resolved to.
pub enum Lookup {
    /// The query was a session id.
    Session {
        /// The matching session.
        session: Session,
    },
    /// The query was a target code.
    Target {
        /// Session holding the target.
        session: Session,
        /// Index of the target within the session.
        index: usize,
    },
}

/// Resolve `query` as a session id first, then as a target code.
///
/// # Errors
/// Returns a not-found error if neither matches, or if storage fails.
pub fn lookup(store: &SessionStore, query: &str) -> anyhow::Result<Lookup> {
    let query = query.trim();
    if let Some(session) = store.get(query)? {
        return Ok(Lookup::Session { session });
    }
    match store.find_by_code(query)? {
        Some((session, index)) => Ok(Lookup::Target { session, index }),
        None => Err(anyhow::anyhow!("No session or target found for: {query}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A session whose reveal time has passed, with its hidden codes.
pub struct ReadySession {
    /// Session name, or its id when unnamed.
    pub name: String,
    /// Codes still hidden.
    pub unrevealed_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Totals across all sessions.
pub struct Overview {
    /// Number of sessions.
    pub total_sessions: usize,
    /// Sessions whose reveal time has passed.
    pub ready_sessions: usize,
    /// Number of targets.
    pub total_targets: usize,
    /// Number of revealed targets.
    pub revealed_targets: usize,
    /// Ready sessions that still hide something.
    pub ready: Vec<ReadySession>,
}

impl Overview {
    /// Summarize `sessions` as of `now`.
    #[must_use]
    pub fn build(sessions: &[Session], now: OffsetDateTime) -> Self {
        let ready_sessions: Vec<&Session> =
            sessions.iter().filter(|s| s.can_reveal(now)).collect();
        let ready = ready_sessions
            .iter()
            .filter(|s| s.has_unrevealed())
            .map(|s| ReadySession {
                name: s.display_name().to_string(),
                unrevealed_codes: s
                    .targets
                    .iter()
                    .filter(|t| !t.revealed)
                    .map(|t| t.code.clone())
                    .collect(),
            })
            .collect();
        Self {
            total_sessions: sessions.len(),
            ready_sessions: ready_sessions.len(),
            total_targets: sessions.iter().map(|s| s.targets.len()).sum(),
            revealed_targets: sessions.iter().map(Session::revealed_count).sum(),
            ready,
        }
    }

    /// Targets not yet revealed.
    #[must_use]
    pub const fn pending_targets(&self) -> usize {
        self.total_targets.saturating_sub(self.revealed_targets)
    }
}

/// Asks the user whether to reveal a target before its reveal time.
pub trait Confirm {
    /// Return `true` to reveal anyway. Called at most once per reveal.
    ///
    /// # Errors
    /// Returns an error if no answer can be obtained.
    fn confirm_early_reveal(
        &mut self,
        session: &Session,
        target: &Target,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool>;
}

/// Whether a typed answer to the early-reveal question means yes.
#[must_use]
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// How a reveal request ended.
pub enum RevealStatus {
    /// The target was revealed by this request.
    Revealed,
    /// The target had been revealed before; nothing changed.
    AlreadyRevealed,
    /// The user declined an early reveal; nothing changed.
    Cancelled,
}

#[derive(Debug, Clone)]
/// Result of [`reveal_target`].
pub struct RevealReport {
    /// How the request ended.
    pub status: RevealStatus,
    /// The session after the request.
    pub session: Session,
    /// Index of the requested target.
    pub index: usize,
}

impl RevealReport {
    /// The requested target.
    #[must_use]
    pub fn target(&self) -> Option<&Target> {
        self.session.targets.get(self.index)
    }
}

/// Reveal the target whose code matches `code`.
///
/// Already revealed targets are left untouched. Before the reveal time, and
/// unless `force` is set, `confirm` decides whether to go ahead.
///
/// # Errors
/// Returns a not-found error for an unknown code, or an error from the prompt
/// or the store.
pub fn reveal_target(
    store: &SessionStore,
    code: &str,
    force: bool,
    now: OffsetDateTime,
    confirm: &mut dyn Confirm,
) -> anyhow::Result<RevealReport> {
    let (session, index) = store
        .find_by_code(code)?
        .ok_or_else(|| anyhow::anyhow!("Target not found: {code}"))?;
    let target = session
        .targets
        .get(index)
        .ok_or_else(|| anyhow::anyhow!("Target not found: {code}"))?;

    if target.revealed {
        return Ok(RevealReport {
            status: RevealStatus::AlreadyRevealed,
            session,
            index,
        });
    }

    if !force
        && !session.can_reveal(now)
        && !confirm.confirm_early_reveal(&session, target, now)?
    {
        return Ok(RevealReport {
            status: RevealStatus::Cancelled,
            session,
            index,
        });
    }

    let mut outcome = RevealOutcome::AlreadyRevealed;
    let session = store.update(&session.id, |s| {
        if let Some(t) = s.targets.get_mut(index) {
            outcome = t.reveal(now);
        }
    })?;
    let status = match outcome {
        RevealOutcome::Revealed => RevealStatus::Revealed,
        RevealOutcome::AlreadyRevealed => RevealStatus::AlreadyRevealed,
    };
    tracing::info!(session_id = %session.id, code, ?status, "reveal requested");
    Ok(RevealReport {
        status,
        session,
        index,
    })
}

#[derive(Debug, Clone, Serialize)]
/// Result of a provider connectivity check.
pub struct CheckReport {
    /// Provider checked.
    pub source: ImageSourceKind,
    /// Whether it answered.
    pub reachable: bool,
}

/// Run the provider's connectivity self-test.
#[must_use]
pub fn check_source(source: &dyn ImageSource) -> CheckReport {
    CheckReport {
        source: source.kind(),
        reachable: source.test_connection(),
    }
}
