//! Windows security identifiers.
//!
//! Binary layout (as stored in `objectSid`):
//!
//! ```text
//! [0]      revision (always 1)
//! [1]      sub-authority count (0..=15)
//! [2..8]   identifier authority, 48-bit big-endian
//! [8..]    sub-authorities, 32-bit little-endian each
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SID_REVISION: u8 = 1;
const MAX_SUB_AUTHORITIES: usize = 15;
const HEADER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SidParseError {
    #[error("SID buffer too short ({0} bytes)")]
    Truncated(usize),
    #[error("unsupported SID revision {0}")]
    Revision(u8),
    #[error("too many sub-authorities ({0})")]
    TooManySubAuthorities(usize),
    #[error("SID length {actual} does not match {expected} declared bytes")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("invalid SID string '{0}'")]
    Syntax(String),
}

/// Stable identity token used for membership writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecurityIdentifier {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl SecurityIdentifier {
    /// Builds a SID from its numeric parts. The authority is truncated to 48 bits.
    pub fn from_parts<const N: usize>(authority: u64, sub_authorities: [u32; N]) -> Self {
        const { assert!(N <= MAX_SUB_AUTHORITIES, "a SID holds at most 15 sub-authorities") };
        Self {
            authority: authority & 0xFFFF_FFFF_FFFF,
            sub_authorities: sub_authorities.to_vec(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SidParseError> {
        if bytes.len() < HEADER_LEN {
            return Err(SidParseError::Truncated(bytes.len()));
        }
        if bytes[0] != SID_REVISION {
            return Err(SidParseError::Revision(bytes[0]));
        }

        let count: usize = bytes[1] as usize;
        if count > MAX_SUB_AUTHORITIES {
            return Err(SidParseError::TooManySubAuthorities(count));
        }

        let expected: usize = HEADER_LEN + count * 4;
        if bytes.len() != expected {
            return Err(SidParseError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let authority: u64 = bytes[2..HEADER_LEN]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

        let sub_authorities: Vec<u32> = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self {
            authority,
            sub_authorities,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(HEADER_LEN + self.sub_authorities.len() * 4);
        out.push(SID_REVISION);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
        out
    }

    /// The relative identifier, i.e. the last sub-authority.
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }
}

impl fmt::Display for SecurityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{SID_REVISION}-")?;
        if self.authority >= 1 << 32 {
            write!(f, "0x{:012X}", self.authority)?;
        } else {
            write!(f, "{}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl FromStr for SecurityIdentifier {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = || SidParseError::Syntax(s.to_string());

        let mut parts = s.split('-');
        if !parts.next().is_some_and(|p| p.eq_ignore_ascii_case("S")) {
            return Err(syntax());
        }

        let revision: u8 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(syntax)?;
        if revision != SID_REVISION {
            return Err(SidParseError::Revision(revision));
        }

        let authority_str: &str = parts.next().ok_or_else(syntax)?;
        let authority: u64 = match authority_str.strip_prefix("0x").or_else(|| authority_str.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).map_err(|_| syntax())?,
            None => authority_str.parse().map_err(|_| syntax())?,
        };
        if authority >= 1 << 48 {
            return Err(syntax());
        }

        let sub_authorities: Vec<u32> = parts
            .map(|p| p.parse::<u32>().map_err(|_| syntax()))
            .collect::<Result<_, _>>()?;
        if sub_authorities.len() > MAX_SUB_AUTHORITIES {
            return Err(SidParseError::TooManySubAuthorities(sub_authorities.len()));
        }

        Ok(Self {
            authority,
            sub_authorities,
        })
    }
}
