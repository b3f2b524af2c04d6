//! Human-readable output: terminal views and the per-session Markdown summary.
//!
//! Everything here builds strings; printing is left to the binary.

use crate::commands::Overview;
use crate::session::{format_capture_date, Session, Status, Target};
use crate::source::ImageSourceKind;
use colored::Colorize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

const SHORT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const LONG_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[month repr:long] [day], [year] at [hour repr:12]:[minute]:[second] [period]"
);
const WRAP_WIDTH: usize = 60;

fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// `YYYY-MM-DD HH:MM:SS` in the given offset.
#[must_use]
pub fn format_ts(ts: OffsetDateTime, offset: UtcOffset) -> String {
    ts.to_offset(offset)
        .format(SHORT_FORMAT)
        .unwrap_or_else(|_| ts.to_string())
}

fn format_ts_long(ts: OffsetDateTime, offset: UtcOffset) -> String {
    ts.to_offset(offset)
        .format(LONG_FORMAT)
        .unwrap_or_else(|_| ts.to_string())
}

/// Whole minutes left, truncated.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    format!("{} minutes remaining", remaining.whole_minutes().max(0))
}

/// Greedy word wrap; words longer than `width` get a line of their own.
#[must_use]
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn status_text(status: Status) -> String {
    match status {
        Status::Active { remaining } => format_remaining(remaining).yellow().to_string(),
        Status::Ready => "Ready to reveal".green().to_string(),
        Status::Revealed => "All targets revealed".bright_black().to_string(),
    }
}

fn target_marker(status: Status) -> &'static str {
    match status {
        Status::Revealed => "[X]",
        Status::Ready | Status::Active { .. } => "[ ]",
    }
}

/// Summary printed after `create`.
#[must_use]
pub fn created(session: &Session, duration_minutes: u32, offset: UtcOffset) -> String {
    let bar = rule('=', 58).green().to_string();
    let mut lines = vec![
        String::new(),
        bar.clone(),
        "  SESSION CREATED".green().bold().to_string(),
        bar.clone(),
        String::new(),
    ];
    if let Some(name) = &session.name {
        lines.push(format!("  Name: {}", name.bold()));
    }
    lines.push(format!("  Session ID: {}", session.id.bright_black()));
    lines.push(format!(
        "  Targets: {}",
        session.targets.len().to_string().bright_black()
    ));
    lines.push(String::new());
    lines.push("  Target Codes:".to_string());
    for (i, t) in session.targets.iter().enumerate() {
        lines.push(format!("    {}. {}", i + 1, t.code.cyan().bold()));
    }
    lines.push(String::new());
    lines.push(format!(
        "  Created: {}",
        format_ts(session.created_at, offset).bright_black()
    ));
    lines.push(format!(
        "  Reveal At: {}",
        format_ts(session.reveal_at, offset).bright_black()
    ));
    lines.push(format!(
        "  Duration: {}",
        format!("{duration_minutes} minutes").bright_black()
    ));
    lines.push(String::new());
    lines.push(format!(
        "  {}",
        "Record your impressions, then reveal targets with:".yellow()
    ));
    lines.push(format!("  {}", "glimpse reveal <code>".cyan()));
    lines.push(String::new());
    lines.push(bar);
    lines.join("\n")
}

/// Full target details, shown by `create --debug`.
#[must_use]
pub fn debug_targets(session: &Session) -> String {
    let bar = rule('=', 70).yellow().to_string();
    let mut lines = vec![
        bar.clone(),
        "  DEBUG: TARGET DETAILS".yellow().bold().to_string(),
        bar.clone(),
        String::new(),
    ];
    for (i, t) in session.targets.iter().enumerate() {
        lines.push(format!("Target {}: {}", i + 1, t.code).cyan().bold().to_string());
        lines.push(String::new());
        lines.push(format!("  Description: {}", t.description));
        lines.push(String::new());
        lines.push(format!("  {}", url_label(t)));
        lines.push(format!("  {}", t.url));
        lines.push(String::new());
        if let Some(location) = &t.location_url {
            lines.push("  Location on Map:".to_string());
            lines.push(format!("  {location}"));
            lines.push(String::new());
        }
        if let Some(date) = &t.capture_date {
            lines.push(format!("  Captured: {date}"));
            lines.push(String::new());
        }
        lines.push(rule('-', 70).bright_black().to_string());
        lines.push(String::new());
    }
    lines.push(bar);
    lines.join("\n")
}

fn url_label(target: &Target) -> &'static str {
    match ImageSourceKind::from_tag(&target.source) {
        Some(ImageSourceKind::GoogleStreetview) => "Street View Panorama:",
        Some(ImageSourceKind::Unsplash) | None => "Image URL:",
    }
}

/// Hint shown when there is nothing to list.
#[must_use]
pub fn no_sessions() -> String {
    format!(
        "\n{}\n{}\n",
        "No sessions found.".yellow(),
        "Create one with: glimpse create".bright_black()
    )
}

fn session_header(session: &Session) -> Vec<String> {
    match &session.name {
        Some(name) => vec![
            format!("  {name}").cyan().bold().to_string(),
            format!("  ID: {}", session.id).bright_black().to_string(),
        ],
        None => vec![format!("  Session: {}", session.id)
            .cyan()
            .bold()
            .to_string()],
    }
}

fn session_block(session: &Session, now: OffsetDateTime, offset: UtcOffset) -> Vec<String> {
    let mut lines = session_header(session);
    lines.push(format!(
        "  Created: {}",
        format_ts(session.created_at, offset)
    ));
    lines.push(format!(
        "  Reveal At: {}",
        format_ts(session.reveal_at, offset)
    ));
    lines.push(format!("  Status: {}", status_text(session.status(now))));
    lines.push(format!(
        "  Targets: {}/{} revealed",
        session.revealed_count(),
        session.targets.len()
    ));
    lines.push(String::new());
    for t in &session.targets {
        let status = session.target_status(t, now);
        lines.push(format!("    {} {}", target_marker(status), t.code.cyan()));
    }
    lines
}

/// The `list` view.
#[must_use]
pub fn session_list(sessions: &[Session], now: OffsetDateTime, offset: UtcOffset) -> String {
    let mut lines = vec![
        String::new(),
        format!("Found {} session(s):", sessions.len())
            .cyan()
            .bold()
            .to_string(),
        String::new(),
    ];
    for session in sessions {
        lines.extend(session_block(session, now, offset));
        lines.push(String::new());
        lines.push(format!("  {}", rule('-', 60)).bright_black().to_string());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// The `status <session-id>` view.
#[must_use]
pub fn session_status(session: &Session, now: OffsetDateTime, offset: UtcOffset) -> String {
    let mut lines = vec![String::new()];
    lines.extend(session_block(session, now, offset));
    lines.push(String::new());
    lines.join("\n")
}

/// The `status <code>` view. Hidden targets never show their image.
#[must_use]
pub fn target_status(
    session: &Session,
    target: &Target,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> String {
    let mut lines = vec![
        String::new(),
        format!("  Target: {}", target.code.cyan().bold()),
        format!("  Session: {}", session.display_name().bright_black()),
        format!("  Reveal At: {}", format_ts(session.reveal_at, offset)),
    ];
    let state = match session.target_status(target, now) {
        Status::Active { remaining } => format_remaining(remaining).yellow().to_string(),
        Status::Ready => format!(
            "{} (run: glimpse reveal {})",
            "Ready to reveal".green(),
            target.code
        ),
        Status::Revealed => match target.revealed_at {
            Some(at) => format!("Revealed at {}", format_ts(at, offset)),
            None => "Revealed".to_string(),
        },
    };
    lines.push(format!("  Status: {state}"));
    lines.push(String::new());
    lines.join("\n")
}

/// The `status` overview across all sessions.
#[must_use]
pub fn overview(o: &Overview) -> String {
    let bar = rule('-', 50).cyan().to_string();
    let mut lines = vec![
        String::new(),
        bar.clone(),
        "  GLIMPSE STATUS".cyan().bold().to_string(),
        bar.clone(),
        String::new(),
        format!(
            "  Total Sessions: {}",
            o.total_sessions.to_string().green().bold()
        ),
        format!(
            "  Ready to Reveal: {}",
            o.ready_sessions.to_string().yellow().bold()
        ),
        format!(
            "  Total Targets: {}",
            o.total_targets.to_string().cyan().bold()
        ),
        format!(
            "  Revealed: {} / Pending: {}",
            o.revealed_targets.to_string().green().bold(),
            o.pending_targets().to_string().yellow().bold()
        ),
        String::new(),
    ];
    if !o.ready.is_empty() {
        lines.push("  Sessions ready to reveal:".green().bold().to_string());
        lines.push(String::new());
        for entry in &o.ready {
            lines.push(format!("    * {}", entry.name.cyan()));
            for code in &entry.unrevealed_codes {
                lines.push(format!("      - {}", code.yellow()));
            }
        }
        lines.push(String::new());
    }
    lines.push(bar);
    lines.join("\n")
}

/// Notice shown before asking whether to reveal early.
#[must_use]
pub fn not_ready(
    target: &Target,
    session: &Session,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> String {
    format!(
        "\n{}\n\n{}\n{}\n",
        format!("Target {} is not ready to reveal yet.", target.code).yellow(),
        format!(
            "Time remaining: {} minutes",
            session.time_remaining(now).whole_minutes()
        )
        .bright_black(),
        format!("Reveal at: {}", format_ts(session.reveal_at, offset)).bright_black()
    )
}

/// The revealed-target view.
#[must_use]
pub fn revealed_target(target: &Target, session: &Session, offset: UtcOffset) -> String {
    let bar = rule('=', 68).green().to_string();
    let mut lines = vec![
        bar.clone(),
        "  TARGET REVEALED".green().bold().to_string(),
        bar.clone(),
        String::new(),
        format!("  Code: {}", target.code.cyan().bold()),
    ];
    if let Some(name) = &session.name {
        lines.push(format!("  Session: {}", name.bright_black()));
    }
    lines.push(format!("  Source: {}", target.source.bright_black()));
    lines.push(String::new());
    lines.push("  Description:".to_string());
    for line in wrap_words(&target.description, WRAP_WIDTH) {
        lines.push(format!("  {}", line.yellow()));
    }
    lines.push(String::new());
    lines.push(format!("  {}", url_label(target)));
    lines.push(format!("  {}", target.url.blue()));

    let street_view =
        ImageSourceKind::from_tag(&target.source) == Some(ImageSourceKind::GoogleStreetview);
    if street_view {
        if let Some(location) = &target.location_url {
            lines.push(String::new());
            lines.push("  Location on Map:".to_string());
            lines.push(format!("  {}", location.blue()));
        }
        if let Some(date) = &target.capture_date {
            lines.push(String::new());
            lines.push(format!(
                "  Captured: {}",
                format_capture_date(date).bright_black()
            ));
        }
    } else if let Some(page) = target.source_url.as_ref().filter(|p| **p != target.url) {
        lines.push(String::new());
        lines.push("  Source Page:".to_string());
        lines.push(format!("  {}", page.blue()));
    }
    lines.push(String::new());
    if let Some(at) = target.revealed_at {
        lines.push(format!(
            "  Revealed: {}",
            format_ts(at, offset).bright_black()
        ));
    }
    lines.push(String::new());
    lines.push(bar);
    lines.join("\n")
}

fn markdown_links(target: &Target) -> String {
    let source_url = target.source_url.as_deref().unwrap_or(&target.url);
    match ImageSourceKind::from_tag(&target.source) {
        Some(ImageSourceKind::GoogleStreetview) => {
            let mut links = format!("[View in Street View]({source_url})");
            if let Some(location) = &target.location_url {
                links.push_str(&format!(" • [View Location on Map]({location})"));
            }
            links
        }
        Some(ImageSourceKind::Unsplash) => format!("[View on Unsplash]({source_url})"),
        None => format!("[View Source]({source_url})"),
    }
}

/// Markdown summary stored next to each session file. Hidden targets only list their code.
#[must_use]
pub fn session_markdown(session: &Session, offset: UtcOffset) -> String {
    let mut lines = vec![
        format!("# Session: {}", session.display_name()),
        String::new(),
        format!("**Session ID:** {}", session.id),
        format!(
            "**Created:** {}",
            format_ts_long(session.created_at, offset)
        ),
        format!(
            "**Reveal At:** {}",
            format_ts_long(session.reveal_at, offset)
        ),
        format!("**Number of Targets:** {}", session.targets.len()),
        String::new(),
        "## Targets".to_string(),
        String::new(),
    ];

    for (i, t) in session.targets.iter().enumerate() {
        lines.push(format!("### Target {}: {}", i + 1, t.code));
        lines.push(String::new());
        lines.push(format!("**Code:** `{}`", t.code));
        let status = if t.revealed { "Revealed" } else { "Pending" };
        lines.push(format!("**Status:** {status}"));
        lines.push(format!("**Source:** {}", t.source));

        if t.revealed {
            lines.push(String::new());
            lines.push("**Description:**".to_string());
            lines.push(String::new());
            lines.push(t.description.clone());
            lines.push(String::new());
            lines.push("**Image:**".to_string());
            lines.push(String::new());
            lines.push(format!("![Target Image]({})", t.url));
            lines.push(String::new());
            lines.push(markdown_links(t));
            lines.push(String::new());
            if let Some(date) = &t.capture_date {
                lines.push(format!("**Captured:** {}", format_capture_date(date)));
                lines.push(String::new());
            }
            if let Some(at) = t.revealed_at {
                lines.push(format!("**Revealed At:** {}", format_ts_long(at, offset)));
            }
        }

        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.push("*Generated by glimpse*".to_string());
    lines.push(String::new());
    lines.join("\n")
}
