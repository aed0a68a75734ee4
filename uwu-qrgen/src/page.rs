//! Structured append page descriptors.
//!
//! A descriptor is written `current/last:parity`, e.g. `2/3:0x11`.
//! `current` and `last` are 1-based ordinals in `1..=16`, `parity` is a
//! byte given in decimal or as `0x`-prefixed hex.

use crate::error::QrgenError;
use log::debug;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([1-9][0-9]?)/([1-9][0-9]?):(?:0x([0-9a-fA-F]{1,2})|([1-9][0-9]{0,2}|0))$")
        .expect("page descriptor pattern is valid")
});

const MAX_ORDINAL: u8 = 16;

/// Position of one symbol within a structured append sequence.
///
/// Indices are 0-based. `current <= last` is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuredAppend {
    pub current: u8,
    pub last: u8,
    pub parity: u8,
}

/// Parses the `-p` flag value. An empty value means no structured append.
pub fn parse_page(arg: &str) -> Result<Option<StructuredAppend>, QrgenError> {
    if arg.is_empty() {
        return Ok(None);
    }
    arg.parse().map(Some)
}

impl FromStr for StructuredAppend {
    type Err = QrgenError;

    fn from_str(arg: &str) -> Result<Self, Self::Err> {
        let invalid = || QrgenError::InvalidPage(arg.to_string());

        let caps = PAGE_RE.captures(arg).ok_or_else(|| {
            debug!("page descriptor {:?} does not match grammar", arg);
            invalid()
        })?;
        if caps.len() != 5 {
            return Err(invalid());
        }

        let current = parse_ordinal(&caps[1]).ok_or_else(invalid)?;
        let last = parse_ordinal(&caps[2]).ok_or_else(invalid)?;

        let parity = match (caps.get(3), caps.get(4)) {
            (Some(hex), None) => u8::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u8>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            debug!("page descriptor {:?} has parity outside 0..=255", arg);
            invalid()
        })?;

        let page = StructuredAppend {
            current: current - 1,
            last: last - 1,
            parity,
        };
        debug!("parsed page descriptor {:?} as {:?}", arg, page);
        Ok(page)
    }
}

fn parse_ordinal(digits: &str) -> Option<u8> {
    match digits.parse::<u8>() {
        Ok(n) if (1..=MAX_ORDINAL).contains(&n) => Some(n),
        _ => {
            debug!("page ordinal {} outside 1..={}", digits, MAX_ORDINAL);
            None
        }
    }
}
