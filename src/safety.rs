//! Confirmation gate in front of every mutating pass.
//!
//! Nothing is added or removed until the user answers affirmatively (or
//! passes `--yes`). Declining is the only cancellation point.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Answers accepted as "go ahead", compared trimmed and lower-cased.
const AFFIRMATIVE: &[&str] = &["si", "sí", "yes", "s", "y"];

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE.contains(&answer.as_str())
}

/// Ask `prompt` on `output` and read one line from `input`.
///
/// Returns `Ok(true)` without prompting when `assume_yes` is set. End of
/// input counts as declining.
pub fn confirm<R: BufRead, W: Write>(
    prompt: &str,
    assume_yes: bool,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    write!(output, "{} [yes/no]: ", prompt).context("Failed to write prompt")?;
    output.flush().context("Failed to flush prompt")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(is_affirmative(&answer))
}
