//! Resolve a requested version against a supported-version set.
//!
//! A request may be an exact version (`18.17.1`), a partial version (`18`,
//! `7.4`) meaning any version under that prefix, or an npm/composer style
//! range (`^8`, `>=10 <12`, `^7.4 || ^8.0`, `^7.2|^8.0`, `14 - 16`, `8.x`). The highest supported
//! version satisfying the request wins, compared numerically per
//! dot-separated component.

use super::catalog::{SupportedVersionInfo, PHP_TOOL};
use crate::error::BuildError;
use semver::{Version, VersionReq};
use std::cmp::Ordering;
use tracing::debug;

/// Whether versions containing letters (`7.4.0RC4`) form a separate,
/// lower-priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewPolicy {
    /// Only numeric versions take part in range matching.
    StableOnly,
    /// Numeric versions first; if none match, preview versions starting
    /// with the request.
    StableThenPreview,
}

impl PreviewPolicy {
    /// PHP ships release candidates worth falling back to; every other tool
    /// resolves against stable releases only.
    pub fn for_tool(tool: &str) -> Self {
        if tool == PHP_TOOL {
            Self::StableThenPreview
        } else {
            Self::StableOnly
        }
    }
}

/// Pick the requested version: explicit caller value, then the version
/// detected from the repository, then the default. Empty strings count as
/// absent.
pub fn resolve_requested<'a>(
    explicit: Option<&'a str>,
    detected: Option<&'a str>,
    default_version: &'a str,
) -> &'a str {
    explicit
        .filter(|v| !v.trim().is_empty())
        .or_else(|| detected.filter(|v| !v.trim().is_empty()))
        .unwrap_or(default_version)
}

/// Resolve `requested` to a member of `info.supported_versions`.
pub fn resolve(
    platform: &str,
    requested: &str,
    info: &SupportedVersionInfo,
    policy: PreviewPolicy,
) -> Result<String, BuildError> {
    let requested = requested.trim();

    if info.contains(requested) {
        return Ok(requested.to_string());
    }

    let stable = info
        .supported_versions
        .iter()
        .map(String::as_str)
        .filter(|v| !is_preview(v));
    let mut resolved = max_satisfying_version(requested, stable);

    if resolved.is_none() && policy == PreviewPolicy::StableThenPreview {
        let previews = info
            .supported_versions
            .iter()
            .map(String::as_str)
            .filter(|v| is_preview(v));
        resolved = max_preview_version(requested, previews);
    }

    match resolved {
        Some(version) => {
            debug!(platform, requested, resolved = %version, "Resolved version");
            Ok(version)
        }
        None => Err(BuildError::UnsupportedVersion {
            platform: platform.to_string(),
            requested: requested.to_string(),
            supported: info.supported_versions.clone(),
        }),
    }
}

/// Highest candidate satisfying `requested`, or `None`. Candidates that are
/// not plain numeric versions are ignored.
pub fn max_satisfying_version<'a>(
    requested: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let requirements = parse_requirements(requested);
    if requirements.is_empty() {
        return None;
    }

    candidates
        .into_iter()
        .filter_map(|candidate| coerce(candidate).map(|v| (v, candidate)))
        .filter(|(version, _)| requirements.iter().any(|req| req.matches(version)))
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, candidate)| candidate.to_string())
}

/// Greatest preview candidate starting with `requested`.
///
/// Ordering is plain case-insensitive string order, so `8.0.0rc9` sorts
/// above `8.0.0rc10`.
pub fn max_preview_version<'a>(
    requested: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .into_iter()
        .filter(|v| v.starts_with(requested))
        .max_by(|a, b| compare_case_insensitive(a, b))
        .map(str::to_string)
}

fn compare_case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub fn is_preview(version: &str) -> bool {
    version.chars().any(|c| c.is_alphabetic())
}

/// `10.1` -> 10.1.0. More than three components or any non-numeric part
/// yields `None`.
fn coerce(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.trim().split('.').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
    }
    Some(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Alternatives are separated by `||` (npm) or a single `|` (composer).
fn parse_requirements(requested: &str) -> Vec<VersionReq> {
    let mut alternatives: Vec<&str> = requested
        .split('|')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if alternatives.is_empty() {
        alternatives.push("");
    }

    alternatives
        .into_iter()
        .filter_map(|alternative| {
            let normalized = normalize_alternative(alternative);
            match VersionReq::parse(&normalized) {
                Ok(req) => Some(req),
                Err(e) => {
                    debug!(requested, alternative = %normalized, error = %e, "Unparseable version range");
                    None
                }
            }
        })
        .collect()
}

fn normalize_alternative(alternative: &str) -> String {
    let alternative = alternative.trim();
    let alternative = alternative.strip_prefix('v').unwrap_or(alternative);

    if alternative.is_empty() {
        return "*".to_string();
    }

    // A bare version pins every component it names: `7.4` means 7.4.x.
    if alternative.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return format!("={}", alternative.trim_end_matches('.'));
    }

    if alternative.contains(',') {
        return alternative.to_string();
    }

    // Hyphen range: `14 - 16` is `>=14, <=16`, and a partial upper bound
    // covers everything under it.
    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(">={}, <={}", range_bound(low), range_bound(high));
    }

    // npm separates comparators with whitespace, semver wants commas. An
    // operator standing alone (`>= 10`) is glued to the version after it.
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_operator = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_operator.push_str(token);
            continue;
        }
        let token = token.strip_prefix('v').unwrap_or(token);
        comparators.push(format!("{}{}", pending_operator, token));
        pending_operator.clear();
    }

    comparators.join(", ")
}

fn range_bound(bound: &str) -> &str {
    let mut bound = bound.trim();
    bound = bound.strip_prefix('v').unwrap_or(bound);
    loop {
        let trimmed = bound
            .strip_suffix(".x")
            .or(bound.strip_suffix(".X"))
            .or(bound.strip_suffix(".*"));
        match trimmed {
            Some(rest) => bound = rest,
            None => return bound,
        }
    }
}
