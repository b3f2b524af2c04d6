//! Integration tests for target codes through the public API.

use anyhow::ensure;
use glimpse::code::{self, ALPHABET};
use std::collections::HashSet;

#[test]
fn generated_codes_use_only_the_alphabet() -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let c = code::generate_default()?;
        ensure!(c.len() == 9);
        ensure!(c.find('-') == Some(4));
        ensure!(c.bytes().filter(|b| *b != b'-').all(|b| ALPHABET.contains(&b)));
        ensure!(seen.insert(c));
    }
    Ok(())
}

#[test]
fn custom_shapes() -> anyhow::Result<()> {
    let long = code::generate(12, '-', 6)?;
    ensure!(long.len() == 13);
    ensure!(long.find('-') == Some(6));

    let short = code::generate(3, '-', 4)?;
    ensure!(short.len() == 3);
    ensure!(code::validate(&short));
    Ok(())
}

#[test]
fn normalization_is_stable_and_validation_agrees() -> anyhow::Result<()> {
    let inputs = [
        "AB3D-X7K2",
        "ab3d-x7k2",
        "AB3DX7K2",
        "ILOU-1234",
        "",
        "-",
        "a-b-c-d",
        "hello world",
    ];
    for x in inputs {
        let n = code::normalize(x);
        ensure!(code::normalize(&n) == n, "normalize not idempotent for {x:?}");
        ensure!(code::validate(&n) == code::validate(x), "validity changed for {x:?}");
    }
    ensure!(code::normalize("ab3d-x7k2") == "AB3DX7K2");
    ensure!(code::validate("AB3D-X7K2"));
    ensure!(!code::validate("ILOU-1234"));
    ensure!(code::validate("AB3DX7K2"));
    Ok(())
}
