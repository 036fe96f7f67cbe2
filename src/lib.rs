//! A crate for decoding Windows certificate templates and deciding who may
//! enroll for them.
//!
//! Certificate templates are the policy objects an Active Directory
//! Certificate Services CA issues against. Each template's values are cached
//! on every machine under `HKLM\SOFTWARE\Microsoft\Cryptography\CertificateTemplateCache`;
//! this crate decodes those values (most importantly the binary security
//! descriptor and the validity periods) and evaluates the template's
//! enrollment permissions for a given identity.
//!
//! Reading the cache itself is left to a [`TemplateStore`] implementation.
//!
//! The `serde` feature adds `Serialize` for the decoded types and
//! `Deserialize` for [`TemplateRecord`] and [`MemoryStore`]. The crate's own
//! tests always build with it.

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![allow(clippy::redundant_field_names)]
#![forbid(unsafe_code)]

use der::asn1::ObjectIdentifier;
use thiserror::Error;

pub mod algorithm;
pub mod descriptor;
pub mod enrollment;
pub mod extensions;
pub mod period;
pub mod sid;
pub mod store;
pub mod template;

pub use algorithm::KeyAlgorithmType;
pub use descriptor::{decode_object_aces, AccessControlEntry, AceKind, DescriptorError};
pub use enrollment::{authorize, EnrollmentPermissions, Identity, ENROLL_EXTENDED_RIGHT};
pub use extensions::{ExtendedKeyUsageExtension, KeyUsageExtension};
pub use period::decode_period;
pub use sid::{Sid, SidParseError};
pub use store::{MemoryStore, TemplateStore};
pub use template::{CertificateTemplate, TemplateRecord};

/// Possible errors while building a certificate template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The `Security` value isn't a well-formed security descriptor.
    #[error("malformed security descriptor")]
    MalformedDescriptor(#[from] DescriptorError),

    /// A period value is shorter than 8 bytes.
    #[error("malformed period: expected 8 bytes, got {len}")]
    MalformedPeriod {
        /// The length of the value.
        len: usize,
    },

    /// A required value is missing or empty.
    #[error("missing template value: {0}")]
    MissingField(&'static str),

    /// A value that should hold an object identifier doesn't.
    #[error("invalid object identifier: {value:?}")]
    Oid {
        /// The offending value.
        value: String,
        /// The underlying parse error.
        #[source]
        source: der::Error,
    },
}

/// Parses a dotted-decimal object identifier.
pub(crate) fn parse_oid(value: &str) -> Result<ObjectIdentifier, TemplateError> {
    ObjectIdentifier::new(value).map_err(|e| TemplateError::Oid {
        value: value.into(),
        source: e.into(),
    })
}
