//! Target codes: short, human-typable identifiers such as `AB3D-X7K2`.
//!
//! Codes are drawn from a 32-symbol alphabet (digits plus uppercase letters
//! without `I`, `L`, `O`, `U`). The separator is purely cosmetic: validation
//! and comparison strip it and ignore letter case.

use anyhow::Context;
use rand::RngCore;

/// The 32 symbols a code may contain.
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Default number of symbols in a generated code.
pub const DEFAULT_LENGTH: usize = 8;
/// Default separator inserted into a generated code.
pub const DEFAULT_SEPARATOR: char = '-';
/// Default 1-indexed symbol position after which the separator is inserted.
pub const DEFAULT_SEPARATOR_POSITION: usize = 4;

fn symbol(byte: u8) -> char {
    // 256 is a multiple of 32, so the lookup never misses.
    ALPHABET
        .get(usize::from(byte) % ALPHABET.len())
        .map_or('0', |b| char::from(*b))
}

/// Generate a random code of `length` symbols.
///
/// Each symbol comes from one OS-random byte taken modulo 32. The separator is
/// inserted once, right after the symbol at `separator_position` (1-indexed),
/// unless that symbol is the last one. No uniqueness check is performed.
///
/// # Errors
/// Returns an error if OS randomness cannot be read.
pub fn generate(
    length: usize,
    separator: char,
    separator_position: usize,
) -> anyhow::Result<String> {
    let mut raw = vec![0_u8; length];
    rand::rngs::OsRng
        .try_fill_bytes(&mut raw)
        .context("read OS randomness")?;

    let mut out = String::with_capacity(length.saturating_add(separator.len_utf8()));
    for (i, b) in raw.into_iter().enumerate() {
        out.push(symbol(b));
        if i.saturating_add(1) == separator_position && i.saturating_add(1) < length {
            out.push(separator);
        }
    }
    Ok(out)
}

/// Generate a code with the default shape (`XXXX-XXXX`).
///
/// # Errors
/// Returns an error if OS randomness cannot be read.
pub fn generate_default() -> anyhow::Result<String> {
    generate(DEFAULT_LENGTH, DEFAULT_SEPARATOR, DEFAULT_SEPARATOR_POSITION)
}

/// Strip separators and upper-case the remainder.
#[must_use]
pub fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| *c != DEFAULT_SEPARATOR)
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether every non-separator character (case-insensitively) is in [`ALPHABET`].
///
/// An empty string, or one made only of separators, is valid.
#[must_use]
pub fn validate(code: &str) -> bool {
    normalize(code)
        .bytes()
        .all(|b| ALPHABET.contains(&b))
}

/// Compare two codes ignoring separators and case.
#[must_use]
pub fn codes_match(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;
    use std::collections::HashSet;

    #[test]
    fn alphabet_excludes_ambiguous_letters() -> anyhow::Result<()> {
        ensure!(ALPHABET.len() == 32);
        for banned in [b'I', b'L', b'O', b'U'] {
            ensure!(!ALPHABET.contains(&banned));
        }
        ensure!(symbol(0) == '0');
        ensure!(symbol(31) == 'Z');
        ensure!(symbol(32) == '0');
        ensure!(symbol(255) == 'Z');
        Ok(())
    }

    #[test]
    fn default_codes_have_expected_shape() -> anyhow::Result<()> {
        for _ in 0..50 {
            let code = generate_default()?;
            ensure!(code.len() == 9, "unexpected length: {code}");
            ensure!(code.as_bytes().get(4) == Some(&b'-'), "separator misplaced: {code}");
            ensure!(code
                .bytes()
                .filter(|b| *b != b'-')
                .all(|b| ALPHABET.contains(&b)));
            ensure!(validate(&code));
        }
        Ok(())
    }

    #[test]
    fn generated_codes_are_distinct() -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            ensure!(seen.insert(generate_default()?));
        }
        Ok(())
    }

    #[test]
    fn separator_is_skipped_at_last_position() -> anyhow::Result<()> {
        let code = generate(4, '-', 4)?;
        ensure!(code.len() == 4);
        ensure!(!code.contains('-'));

        let code = generate(6, '_', 2)?;
        ensure!(code.len() == 7);
        ensure!(code.as_bytes().get(2) == Some(&b'_'));

        ensure!(generate(0, '-', 4)?.is_empty());
        Ok(())
    }

    #[test]
    fn validate_examples() -> anyhow::Result<()> {
        ensure!(validate("AB3D-X7K2"));
        ensure!(validate("AB3DX7K2"));
        ensure!(validate("ab3d-x7k2"));
        ensure!(!validate("ILOU-1234"));
        ensure!(!validate("AB3D X7K2"));
        ensure!(validate(""));
        ensure!(validate("--"));
        Ok(())
    }

    #[test]
    fn normalize_examples_and_properties() -> anyhow::Result<()> {
        ensure!(normalize("ab3d-x7k2") == "AB3DX7K2");
        ensure!(normalize("--a-b--") == "AB");

        for input in ["ab3d-x7k2", "ILOU-1234", "", "ünïcode-ß", "  spaced - out "] {
            let once = normalize(input);
            ensure!(normalize(&once) == once, "not idempotent for {input:?}");
            ensure!(validate(&once) == validate(input), "validity changed for {input:?}");
        }

        ensure!(codes_match("ab3d-x7k2", "AB3DX7K2"));
        ensure!(!codes_match("AB3D-X7K2", "AB3D-X7K3"));
        Ok(())
    }
}
