use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed metadata used for logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    /// Token the seed was parsed from, when it was not a plain integer.
    pub source: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: u64) -> Self {
        Self { seed, source: None }
    }

    #[must_use]
    pub fn from_token(seed: u64, token: &str) -> Self {
        Self {
            seed,
            source: Some(token.to_string()),
        }
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports decimal integers (negative values use their magnitude), `0x` hex
/// literals, and the keyword `random`, which draws a fresh seed from entropy.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut pending: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if token.eq_ignore_ascii_case("random") {
            let seed = rand::random::<u64>();
            log::debug!("drew random seed {seed}");
            pending.push(SeedInfo::from_token(seed, token));
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            pending.push(SeedInfo::from_numeric(value.unsigned_abs()));
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            pending.push(SeedInfo::from_numeric(value));
            continue;
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            let seed = u64::from_str_radix(hex, 16)
                .with_context(|| format!("invalid hex seed: {token}"))?;
            pending.push(SeedInfo::from_token(seed, token));
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<SeedInfo> = pending
        .into_iter()
        .filter(|info| seen.insert(info.seed))
        .collect();

    if deduped.is_empty() {
        deduped.push(SeedInfo::from_numeric(1337));
    }

    Ok(deduped)
}
