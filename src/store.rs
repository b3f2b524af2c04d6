//! On-disk session storage.
//!
//! Each session is stored as `<data_dir>/sessions/<id>.json`, next to a
//! human-readable `<id>.md` summary that is regenerated on every save.
//! Writes go through a temp file and a rename. There is no locking; when two
//! invocations race on the same session the last writer wins.

use crate::config::Config;
use crate::id;
use crate::render;
use crate::session::{timestamp, Session};
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::UtcOffset;

const SESSIONS_DIR: &str = "sessions";

#[derive(Debug, Clone)]
/// File-per-session store rooted at a data directory.
pub struct SessionStore {
    sessions_dir: PathBuf,
    display_offset: UtcOffset,
}

impl SessionStore {
    /// Store under `<data_dir>/sessions`, rendering summaries in UTC.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            sessions_dir: data_dir.join(SESSIONS_DIR),
            display_offset: UtcOffset::UTC,
        }
    }

    /// Same store, rendering summaries and reading naive legacy timestamps at
    /// `offset`.
    #[must_use]
    pub fn with_display_offset(mut self, offset: UtcOffset) -> Self {
        self.display_offset = offset;
        self
    }

    /// Store for the configured data directory and display offset.
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.data_dir()).with_display_offset(cfg.display_offset)
    }

    /// Directory holding the session files.
    #[must_use]
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn json_path(&self, session_id: &str) -> anyhow::Result<PathBuf> {
        if !id::is_session_id(session_id) {
            return Err(anyhow::anyhow!("invalid session id: {session_id}"));
        }
        Ok(self.sessions_dir.join(format!("{session_id}.json")))
    }

    fn markdown_path(&self, session_id: &str) -> anyhow::Result<PathBuf> {
        Ok(self.json_path(session_id)?.with_extension("md"))
    }

    /// Create the sessions directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.sessions_dir)
            .with_context(|| format!("create sessions dir {}", self.sessions_dir.display()))
    }

    /// Write `session` and its Markdown summary, replacing any previous version.
    ///
    /// # Errors
    /// Returns an error if the id is malformed, the session violates its
    /// invariants, or a file cannot be written.
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        session.validate()?;
        let json_path = self.json_path(&session.id)?;
        self.ensure_dir()?;

        let body = serde_json::to_string_pretty(session).context("serialize session JSON")? + "\n";
        write_atomic(&json_path, &body)?;

        let md_path = self.markdown_path(&session.id)?;
        let markdown = render::session_markdown(session, self.display_offset);
        write_atomic(&md_path, &markdown)?;

        tracing::debug!(session_id = %session.id, path = %json_path.display(), "saved session");
        Ok(())
    }

    /// Load a session by id. Ids that are absent, or not shaped like an id, yield `None`.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        if !id::is_session_id(session_id) {
            return Ok(None);
        }
        let path = self.json_path(session_id)?;
        match fs::read_to_string(&path) {
            Ok(raw) => self.parse_session(&path, &raw).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("read session file {}", path.display()))
            }
        }
    }

    /// All readable sessions, newest first. Unparseable files are skipped.
    ///
    /// # Errors
    /// Returns an error if the sessions directory cannot be listed.
    pub fn list(&self) -> anyhow::Result<Vec<Session>> {
        let entries = match fs::read_dir(&self.sessions_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("list sessions dir {}", self.sessions_dir.display())
                })
            }
        };

        let mut sessions = Vec::new();
        for entry in entries {
            let path = entry.context("read sessions dir entry")?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let loaded = fs::read_to_string(&path)
                .with_context(|| format!("read session file {}", path.display()))
                .and_then(|raw| self.parse_session(&path, &raw));
            match loaded {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %format!("{err:#}"),
                        "skipping unreadable session file"
                    );
                }
            }
        }

        sessions.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(sessions)
    }

    /// Apply `mutate` to the stored session and save the result.
    ///
    /// # Errors
    /// Returns an error if the session does not exist or cannot be saved.
    pub fn update<F>(&self, session_id: &str, mutate: F) -> anyhow::Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut session = self
            .get(session_id)?
            .ok_or_else(|| anyhow::anyhow!("Session {session_id} not found"))?;
        mutate(&mut session);
        self.save(&session)?;
        Ok(session)
    }

    /// Remove a session's files.
    ///
    /// # Errors
    /// Returns an error if the session does not exist or cannot be removed.
    pub fn delete(&self, session_id: &str) -> anyhow::Result<()> {
        if !id::is_session_id(session_id) {
            return Err(anyhow::anyhow!("Session {session_id} not found"));
        }
        let json_path = self.json_path(session_id)?;
        match fs::remove_file(&json_path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(anyhow::anyhow!("Session {session_id} not found"));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("remove session file {}", json_path.display()))
            }
        }
        let md_path = self.markdown_path(session_id)?;
        match fs::remove_file(&md_path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("remove session summary {}", md_path.display()))
            }
        }
        tracing::info!(session_id, "deleted session");
        Ok(())
    }

    /// First session (newest first) holding a target whose code matches `code`,
    /// with that target's index.
    ///
    /// # Errors
    /// Returns an error if the sessions cannot be listed.
    pub fn find_by_code(&self, code: &str) -> anyhow::Result<Option<(Session, usize)>> {
        Ok(self
            .list()?
            .into_iter()
            .find_map(|s| s.find_target(code).map(|i| (s, i))))
    }

    fn parse_session(&self, path: &Path, raw: &str) -> anyhow::Result<Session> {
        let session = timestamp::with_naive_offset(self.display_offset, || {
            serde_json::from_str::<Session>(raw)
        })
        .with_context(|| format!("parse JSON {}", path.display()))?;
        session
            .validate()
            .with_context(|| format!("invalid session file {}", path.display()))?;
        Ok(session)
    }
}

fn write_atomic(path: &Path, body: &str) -> anyhow::Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    fs::write(&tmp, body).with_context(|| format!("write temp file {}", tmp.display()))?;

    // rename() does not replace an existing file on Windows.
    #[cfg(windows)]
    {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("remove existing file {}", path.display()))?;
        }
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("replace {} via {}", path.display(), tmp.display()))?;
    Ok(())
}
