//! Security identifiers (SIDs), the principals named in access control entries.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

/// The only SID revision defined by MS-DTYP.
pub const SID_REVISION: u8 = 1;

/// The maximum number of sub-authorities a SID may carry.
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;

/// Identifier authorities are 48-bit values.
const MAX_AUTHORITY: u64 = (1 << 48) - 1;

/// Possible errors while parsing the `S-1-...` text form of a SID.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SidParseError {
    /// The string doesn't start with `S-`.
    #[error("SID must start with \"S-\"")]
    MissingPrefix,

    /// The revision component isn't `1`.
    #[error("unsupported SID revision: {0}")]
    Revision(String),

    /// The identifier authority is missing, unparseable or wider than 48 bits.
    #[error("invalid SID identifier authority: {0:?}")]
    Authority(String),

    /// A sub-authority isn't a 32-bit unsigned integer.
    #[error("invalid SID sub-authority: {0:?}")]
    SubAuthority(String),

    /// More than [`SID_MAX_SUB_AUTHORITIES`] sub-authorities.
    #[error("SID has {0} sub-authorities, at most {SID_MAX_SUB_AUTHORITIES} are allowed")]
    TooManySubAuthorities(usize),
}

/// A Windows security identifier.
///
/// This is an owned, opaque value: two `Sid`s are equal exactly when their
/// binary encodings are equal, so they can be used as set members without
/// consulting any platform identity provider.
///
/// ```text
/// SID ::= Revision(1) SubAuthorityCount(1) IdentifierAuthority(6, BE)
///         SubAuthority(4, LE) * SubAuthorityCount
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid {
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// Builds a SID from its identifier authority and sub-authorities.
    ///
    /// Callers are expected to have checked the 48-bit authority and the
    /// sub-authority count already.
    pub(crate) fn from_parts(authority: u64, sub_authorities: Vec<u32>) -> Self {
        debug_assert!(authority <= MAX_AUTHORITY);
        debug_assert!(sub_authorities.len() <= SID_MAX_SUB_AUTHORITIES);

        Self {
            authority,
            sub_authorities,
        }
    }

    /// Returns the 48-bit identifier authority.
    pub fn authority(&self) -> u64 {
        self.authority
    }

    /// Returns the sub-authorities, the last of which is the relative identifier.
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Returns the length of this SID's binary encoding.
    pub fn encoded_len(&self) -> usize {
        8 + 4 * self.sub_authorities.len()
    }

    /// Returns the binary (MS-DTYP 2.4.2.2) encoding of this SID.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(SID_REVISION);
        bytes.push(self.sub_authorities.len() as u8);
        bytes.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub_authority in &self.sub_authorities {
            bytes.extend_from_slice(&sub_authority.to_le_bytes());
        }
        bytes
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{SID_REVISION}-")?;

        // MS-DTYP 2.4.2.1: authorities that don't fit in 32 bits are
        // written in hex.
        if self.authority > u32::MAX as u64 {
            write!(f, "0x{:012X}", self.authority)?;
        } else {
            write!(f, "{}", self.authority)?;
        }

        if !self.sub_authorities.is_empty() {
            write!(f, "-{}", self.sub_authorities.iter().join("-"))?;
        }

        Ok(())
    }
}

impl FromStr for Sid {
    type Err = SidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');

        match parts.next() {
            Some(prefix) if prefix.eq_ignore_ascii_case("S") => {}
            _ => return Err(SidParseError::MissingPrefix),
        }

        match parts.next() {
            Some("1") => {}
            Some(other) => return Err(SidParseError::Revision(other.into())),
            None => return Err(SidParseError::Revision(String::new())),
        }

        let authority = match parts.next() {
            Some(raw) => parse_authority(raw).ok_or_else(|| SidParseError::Authority(raw.into()))?,
            None => return Err(SidParseError::Authority(String::new())),
        };

        let sub_authorities = parts
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| SidParseError::SubAuthority(raw.into()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(SidParseError::TooManySubAuthorities(
                sub_authorities.len(),
            ));
        }

        Ok(Self::from_parts(authority, sub_authorities))
    }
}

fn parse_authority(raw: &str) -> Option<u64> {
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => raw.parse::<u64>().ok()?,
    };

    (value <= MAX_AUTHORITY).then_some(value)
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display() {
        for text in [
            "S-1-1-0",
            "S-1-5-32-544",
            "S-1-5-21-3623811015-3361044348-30300820-1013",
            "S-1-5",
        ] {
            let sid: Sid = text.parse().unwrap();
            assert_eq!(sid.to_string(), text);
        }

        let sid: Sid = "s-1-5-18".parse().unwrap();
        assert_eq!(sid.to_string(), "S-1-5-18");
    }

    #[test]
    fn test_wide_authority() {
        let sid: Sid = "S-1-0x123456789ABC-7".parse().unwrap();
        assert_eq!(sid.authority(), 0x1234_5678_9ABC);
        assert_eq!(sid.to_string(), "S-1-0x123456789ABC-7");

        assert_eq!(
            "S-1-0x1000000000000-7".parse::<Sid>(),
            Err(SidParseError::Authority("0x1000000000000".into()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("X-1-5".parse::<Sid>(), Err(SidParseError::MissingPrefix));
        assert_eq!(
            "S-2-5".parse::<Sid>(),
            Err(SidParseError::Revision("2".into()))
        );
        assert_eq!(
            "S-1-5-abc".parse::<Sid>(),
            Err(SidParseError::SubAuthority("abc".into()))
        );
        assert_eq!(
            "S-1-5-1-2-3-4-5-6-7-8-9-10-11-12-13-14-15-16".parse::<Sid>(),
            Err(SidParseError::TooManySubAuthorities(16))
        );
    }

    #[test]
    fn test_to_bytes() {
        // S-1-5-32-544 (BUILTIN\Administrators)
        let sid: Sid = "S-1-5-32-544".parse().unwrap();
        assert_eq!(
            sid.to_bytes(),
            b"\x01\x02\x00\x00\x00\x00\x00\x05\x20\x00\x00\x00\x20\x02\x00\x00"
        );
        assert_eq!(sid.encoded_len(), 16);
    }
}
