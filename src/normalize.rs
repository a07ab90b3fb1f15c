//! Value normalization rules.
//!
//! Pure functions turning raw device-reported strings into numbers. Every
//! collector maps each of its properties to one [`Rule`].

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

const WEEK: f64 = 604_800.0;
const DAY: f64 = 86_400.0;
const HOUR: f64 = 3_600.0;
const MINUTE: f64 = 60.0;

/// A single raw value could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueParseError {
    #[error("invalid number '{0}'")]
    Number(String),

    #[error("invalid duration '{0}'")]
    Duration(String),

    #[error("invalid counter pair '{0}'")]
    Pair(String),

    #[error("unexpected status '{0}'")]
    Status(String),
}

/// Parse a RouterOS duration such as `15w3d3h42m53s` into seconds.
///
/// Groups must appear in `w d h m s` order without separators; any subset
/// may be present. An empty string (or a bare unit with no digits) is zero.
pub fn parse_duration(raw: &str) -> Result<f64, ValueParseError> {
    static DURATION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = DURATION_REGEX.get_or_init(|| {
        Regex::new(r"^(?:(\d*)w)?(?:(\d*)d)?(?:(\d*)h)?(?:(\d*)m)?(?:(\d*)s)?$")
            .expect("failed to compile duration regex")
    });

    let caps = regex
        .captures(raw)
        .ok_or_else(|| ValueParseError::Duration(raw.to_string()))?;

    let units = [WEEK, DAY, HOUR, MINUTE, 1.0];
    let mut total = 0.0;
    for (i, unit) in units.iter().enumerate() {
        let Some(group) = caps.get(i + 1) else {
            continue;
        };
        if group.as_str().is_empty() {
            continue;
        }
        let count: u64 = group
            .as_str()
            .parse()
            .map_err(|_| ValueParseError::Duration(raw.to_string()))?;
        total += count as f64 * unit;
    }
    Ok(total)
}

/// Split a `"<tx>,<rx>"` counter pair. Tokens after the second are ignored.
pub fn split_pair(raw: &str) -> Result<(f64, f64), ValueParseError> {
    let mut parts = raw.split(',');
    let mut next = || {
        parts
            .next()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .ok_or_else(|| ValueParseError::Pair(raw.to_string()))
    };
    let first = next()?;
    let second = next()?;
    Ok((first, second))
}

/// Drop an `@qualifier` suffix, e.g. `-65@HT20-1` becomes `-65`.
pub fn strip_qualifier(raw: &str) -> &str {
    match raw.find('@') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

/// Decimal parse of a plain numeric value.
pub fn parse_number(raw: &str) -> Result<f64, ValueParseError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ValueParseError::Number(raw.to_string()))
}

/// `"true"` is 1, anything else 0.
pub fn parse_flag(raw: &str) -> f64 {
    if raw == "true" { 1.0 } else { 0.0 }
}

/// `"established"` is 1, anything else (including absent) 0.
pub fn parse_established(raw: &str) -> f64 {
    if raw == "established" { 1.0 } else { 0.0 }
}

/// Host reachability: `up` 1, `unknown` 0, `down` -1.
pub fn parse_up_down(raw: &str) -> Result<f64, ValueParseError> {
    match raw {
        "up" => Ok(1.0),
        "unknown" => Ok(0.0),
        "down" => Ok(-1.0),
        other => Err(ValueParseError::Status(other.to_string())),
    }
}

/// Ethernet link rate in Mbps. Unknown rates map to 0.
pub fn parse_rate(raw: &str) -> f64 {
    match raw {
        "10Mbps" => 10.0,
        "100Mbps" => 100.0,
        "1Gbps" => 1_000.0,
        "2.5Gbps" => 2_500.0,
        "5Gbps" => 5_000.0,
        "10Gbps" => 10_000.0,
        "25Gbps" => 25_000.0,
        "40Gbps" => 40_000.0,
        "100Gbps" => 100_000.0,
        _ => 0.0,
    }
}

/// How a property's raw value becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Plain decimal.
    Number,
    /// Decimal after stripping an `@qualifier` suffix.
    QualifiedNumber,
    /// `w/d/h/m/s` duration in seconds.
    Duration,
    /// `true` → 1, else 0.
    Flag,
    /// `true` → 0, else 1 (fault/loss indicators reported as health).
    InverseFlag,
    /// `established` → 1, else 0. Absent also maps to 0.
    Established,
    /// `up`/`unknown`/`down` → 1/0/-1; other tokens are errors.
    UpDown,
    /// `link-ok` → 1, else 0.
    LinkOk,
    /// Link speed token in Mbps.
    Rate,
}

impl Rule {
    /// Apply the rule.
    ///
    /// `Ok(None)` means the property is absent (missing or empty) and no
    /// observation should be produced; this is never an error.
    pub fn apply(self, raw: Option<&str>) -> Result<Option<f64>, ValueParseError> {
        if self == Self::Established {
            return Ok(Some(parse_established(raw.unwrap_or(""))));
        }

        let raw = match raw {
            Some(r) if !r.is_empty() => r,
            _ => return Ok(None),
        };

        let value = match self {
            Self::Number => parse_number(raw)?,
            Self::QualifiedNumber => {
                let stripped = strip_qualifier(raw);
                if stripped.is_empty() {
                    return Ok(None);
                }
                parse_number(stripped)?
            }
            Self::Duration => parse_duration(strip_qualifier(raw))?,
            Self::Flag => parse_flag(raw),
            Self::InverseFlag => 1.0 - parse_flag(raw),
            Self::Established => parse_established(raw),
            Self::UpDown => parse_up_down(raw)?,
            Self::LinkOk => {
                if raw == "link-ok" {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Rate => parse_rate(raw),
        };
        Ok(Some(value))
    }
}
