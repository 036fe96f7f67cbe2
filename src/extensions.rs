//! Summaries of the key usage and extended key usage extensions a template
//! puts in issued certificates.

use der::asn1::ObjectIdentifier;
use flagset::FlagSet;
#[cfg(feature = "serde")]
use serde::ser::SerializeStruct;
#[cfg(feature = "serde")]
use serde::Serialize;
use x509_cert::ext::pkix::{ExtendedKeyUsage, KeyUsage, KeyUsages};

use crate::{parse_oid, TemplateError};

/// `szOID_KEY_USAGE`
pub const KEY_USAGE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");

/// `szOID_ENHANCED_KEY_USAGE`
pub const ENHANCED_KEY_USAGE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.37");

/// `szOID_APPLICATION_CERT_POLICIES`: Microsoft's application policies
/// extension, which mirrors the EKU extension.
pub const APPLICATION_CERT_POLICIES_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.21.10");

/// The key usage extension of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyUsageExtension {
    /// The key usages.
    pub usage: KeyUsage,

    /// Whether the extension is marked critical.
    pub critical: bool,
}

impl KeyUsageExtension {
    /// Builds the extension from the template's `KeyUsage` value.
    ///
    /// The value holds the bytes of a DER `BIT STRING`: bit 0
    /// (`digitalSignature`) is the most significant bit of the first byte,
    /// bit 8 (`decipherOnly`) the most significant bit of the second.
    /// Missing bytes are zero and bits past `decipherOnly` are ignored.
    pub fn from_template_bits(bits: &[u8], critical: bool) -> Self {
        let mut flags = 0u16;
        for bit in 0..9 {
            let set = bits
                .get(bit / 8)
                .map_or(false, |byte| byte & (0x80 >> (bit % 8)) != 0);
            if set {
                flags |= 1 << bit;
            }
        }

        Self {
            usage: KeyUsage(FlagSet::<KeyUsages>::new_truncated(flags)),
            critical,
        }
    }

    /// Returns `true` if no key usage is set.
    pub fn is_empty(&self) -> bool {
        self.usage.0.is_empty()
    }
}

#[cfg(feature = "serde")]
impl Serialize for KeyUsageExtension {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let usages = self
            .usage
            .0
            .into_iter()
            .map(|usage| format!("{usage:?}"))
            .collect::<Vec<_>>();

        let mut s = serializer.serialize_struct("KeyUsageExtension", 2)?;
        s.serialize_field("usages", &usages)?;
        s.serialize_field("critical", &self.critical)?;
        s.end()
    }
}

/// The extended key usage extension of a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedKeyUsageExtension {
    /// The extended key usages, in the template's order.
    pub usages: ExtendedKeyUsage,

    /// Whether the extension is marked critical.
    pub critical: bool,
}

impl ExtendedKeyUsageExtension {
    /// Builds the extension from the template's `ExtKeyUsageSyntax` value.
    pub fn from_template_oids<S: AsRef<str>>(
        oids: &[S],
        critical: bool,
    ) -> Result<Self, TemplateError> {
        let usages = oids
            .iter()
            .map(|oid| parse_oid(oid.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            usages: ExtendedKeyUsage(usages),
            critical,
        })
    }

    /// Returns `true` if the given usage is listed.
    pub fn contains(&self, usage: &ObjectIdentifier) -> bool {
        self.usages.0.contains(usage)
    }
}

#[cfg(feature = "serde")]
impl Serialize for ExtendedKeyUsageExtension {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let usages = self
            .usages
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let mut s = serializer.serialize_struct("ExtendedKeyUsageExtension", 2)?;
        s.serialize_field("usages", &usages)?;
        s.serialize_field("critical", &self.critical)?;
        s.end()
    }
}
