//! Random identifier generation for sessions.
//!
//! Session ids are 16 lowercase hex characters (8 random bytes) and double as
//! the session's file name inside the sessions directory.

use anyhow::Context;
use rand::RngCore;
use std::fmt::Write as _;

const SESSION_ID_BYTES: usize = 8;

/// Generate a new 16-character session id.
///
/// # Errors
/// Returns an error if OS randomness cannot be read.
pub fn new_session_id() -> anyhow::Result<String> {
    let mut raw = [0_u8; SESSION_ID_BYTES];
    rand::rngs::OsRng
        .try_fill_bytes(&mut raw)
        .context("read OS randomness for session id")?;
    Ok(raw
        .iter()
        .fold(String::with_capacity(SESSION_ID_BYTES * 2), |mut id, b| {
            let _ = write!(id, "{b:02x}");
            id
        }))
}

/// Whether `s` looks like a session id (lowercase hex, non-empty).
///
/// Used to keep caller-supplied ids from escaping the sessions directory.
#[must_use]
pub fn is_session_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;
    use std::collections::HashSet;

    #[test]
    fn session_ids_are_sixteen_hex_chars() -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = new_session_id()?;
            ensure!(id.len() == 16, "{id}");
            ensure!(is_session_id(&id), "{id}");
            ensure!(seen.insert(id));
        }
        Ok(())
    }

    #[test]
    fn is_session_id_rejects_paths() -> anyhow::Result<()> {
        ensure!(!is_session_id(""));
        ensure!(!is_session_id("../etc"));
        ensure!(!is_session_id("ABCDEF"));
        ensure!(!is_session_id("AB3D-X7K2"));
        ensure!(is_session_id("0123abcd"));
        Ok(())
    }
}
