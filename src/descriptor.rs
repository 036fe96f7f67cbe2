//! Decoding of the object access control entries in a template's
//! security descriptor.
//!
//! The descriptor is the self-relative `SECURITY_DESCRIPTOR` from MS-DTYP
//! 2.4.6, as stored in the template's `Security` value. Only the
//! discretionary ACL is traversed, and only object-scoped allow/deny entries
//! are kept: they're the only ones that can govern an extended right such as
//! enrollment.

use std::io::Cursor;

use binrw::{BinRead, BinReaderExt};
use thiserror::Error;
use uuid::Uuid;

use crate::sid::{Sid, SID_MAX_SUB_AUTHORITIES, SID_REVISION};

/// The only security descriptor revision defined by MS-DTYP.
pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;

/// `SE_DACL_PRESENT`
pub const SE_DACL_PRESENT: u16 = 0x0004;

/// `SE_SELF_RELATIVE`
pub const SE_SELF_RELATIVE: u16 = 0x8000;

/// `ACL_REVISION`
pub const ACL_REVISION: u8 = 2;

/// `ACL_REVISION_DS`, required for ACLs containing object ACEs.
pub const ACL_REVISION_DS: u8 = 4;

/// `ACCESS_ALLOWED_OBJECT_ACE_TYPE`
pub const ACCESS_ALLOWED_OBJECT_ACE_TYPE: u8 = 0x05;

/// `ACCESS_DENIED_OBJECT_ACE_TYPE`
pub const ACCESS_DENIED_OBJECT_ACE_TYPE: u8 = 0x06;

/// `INHERITED_ACE`
pub const INHERITED_ACE: u8 = 0x10;

/// `ACE_OBJECT_TYPE_PRESENT`
pub const ACE_OBJECT_TYPE_PRESENT: u32 = 0x1;

/// `ACE_INHERITED_OBJECT_TYPE_PRESENT`
pub const ACE_INHERITED_OBJECT_TYPE_PRESENT: u32 = 0x2;

const DESCRIPTOR_HEADER_LEN: usize = 20;
const ACL_HEADER_LEN: usize = 8;
const ACE_HEADER_LEN: usize = 4;

/// Possible errors while decoding a security descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A fixed-layout structure ran past the end of its buffer.
    #[error("truncated security descriptor structure")]
    Read(#[from] binrw::Error),

    /// The descriptor's revision isn't [`SECURITY_DESCRIPTOR_REVISION`].
    #[error("unsupported security descriptor revision: {0}")]
    Revision(u8),

    /// The descriptor is in absolute (pointer-based) form.
    #[error("security descriptor is not self-relative (control: {0:#06x})")]
    NotSelfRelative(u16),

    /// One of the header's offsets points outside the descriptor.
    #[error("{field} offset {offset} is outside the {len}-byte descriptor")]
    Offset {
        /// The header field holding the offset.
        field: &'static str,
        /// The offending offset.
        offset: u32,
        /// The length of the descriptor.
        len: usize,
    },

    /// The DACL's revision is neither [`ACL_REVISION`] nor [`ACL_REVISION_DS`].
    #[error("unsupported ACL revision: {0}")]
    AclRevision(u8),

    /// The DACL's declared size is too small or runs past the descriptor.
    #[error("ACL size {size} is invalid, {available} bytes available")]
    AclSize {
        /// The declared `AclSize`.
        size: u16,
        /// The bytes remaining in the descriptor at the ACL's offset.
        available: usize,
    },

    /// The DACL declares more ACEs than fit in it.
    #[error("ACL ends before ACE {index}")]
    MissingAce {
        /// The index of the first missing ACE.
        index: u16,
    },

    /// An ACE's declared size is too small or runs past the ACL.
    #[error("ACE {index} has invalid size {size}")]
    AceSize {
        /// The index of the ACE within the DACL.
        index: u16,
        /// The declared `AceSize`.
        size: u16,
    },

    /// A SID's revision isn't [`SID_REVISION`].
    #[error("unsupported SID revision: {0}")]
    SidRevision(u8),

    /// A SID has more than [`SID_MAX_SUB_AUTHORITIES`] sub-authorities.
    #[error("SID has {0} sub-authorities")]
    SidSubAuthorities(u8),
}

/// Whether an [`AccessControlEntry`] grants or denies its right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AceKind {
    /// `ACCESS_ALLOWED_OBJECT_ACE`
    Allow,
    /// `ACCESS_DENIED_OBJECT_ACE`
    Deny,
}

/// An object-scoped access control entry from a discretionary ACL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessControlEntry {
    /// Whether this entry allows or denies access.
    pub kind: AceKind,

    /// The extended right (or property set, or child object class) this entry
    /// is scoped to.
    pub object_type: Uuid,

    /// The user or group this entry applies to.
    pub principal: Sid,

    /// The raw access mask. Nothing in this crate interprets it.
    pub mask: u32,

    /// Whether the entry was inherited from a parent object.
    pub inherited: bool,
}

/// ```text
/// SECURITY_DESCRIPTOR_RELATIVE ::= Revision(1) Sbz1(1) Control(2)
///     OffsetOwner(4) OffsetGroup(4) OffsetSacl(4) OffsetDacl(4)
/// ```
#[derive(BinRead, Debug)]
#[br(little)]
struct DescriptorHeader {
    revision: u8,
    #[br(pad_before = 1)]
    control: u16,
    offset_owner: u32,
    offset_group: u32,
    offset_sacl: u32,
    offset_dacl: u32,
}

/// ```text
/// ACL ::= AclRevision(1) Sbz1(1) AclSize(2) AceCount(2) Sbz2(2)
/// ```
#[derive(BinRead, Debug)]
#[br(little)]
struct AclHeader {
    revision: u8,
    #[br(pad_before = 1)]
    size: u16,
    #[br(pad_after = 2)]
    ace_count: u16,
}

/// ```text
/// ACE_HEADER ::= AceType(1) AceFlags(1) AceSize(2)
/// ```
#[derive(BinRead, Debug)]
#[br(little)]
struct AceHeader {
    ace_type: u8,
    flags: u8,
    size: u16,
}

/// The body of `ACCESS_ALLOWED_OBJECT_ACE` and `ACCESS_DENIED_OBJECT_ACE`,
/// which share a layout. `Flags` only decides which GUIDs follow.
#[binrw::binread]
#[derive(Debug)]
#[br(little)]
struct ObjectAceBody {
    mask: u32,
    #[br(temp)]
    flags: u32,
    #[br(if((flags & ACE_OBJECT_TYPE_PRESENT) != 0))]
    object_type: Option<[u8; 16]>,
    #[br(if((flags & ACE_INHERITED_OBJECT_TYPE_PRESENT) != 0))]
    inherited_object_type: Option<[u8; 16]>,
    sid: RawSid,
}

#[derive(BinRead, Debug)]
#[br(little)]
struct RawSid {
    revision: u8,
    sub_authority_count: u8,
    identifier_authority: [u8; 6],
    #[br(count = sub_authority_count)]
    sub_authorities: Vec<u32>,
}

impl TryFrom<RawSid> for Sid {
    type Error = DescriptorError;

    fn try_from(raw: RawSid) -> Result<Self, Self::Error> {
        if raw.revision != SID_REVISION {
            return Err(DescriptorError::SidRevision(raw.revision));
        }

        if raw.sub_authority_count as usize > SID_MAX_SUB_AUTHORITIES {
            return Err(DescriptorError::SidSubAuthorities(raw.sub_authority_count));
        }

        // The identifier authority is a 48-bit big-endian integer.
        let mut authority = [0u8; 8];
        authority[2..].copy_from_slice(&raw.identifier_authority);

        Ok(Sid::from_parts(
            u64::from_be_bytes(authority),
            raw.sub_authorities,
        ))
    }
}

/// Decodes the object-scoped allow and deny entries of a self-relative
/// security descriptor's DACL, in the order they're stored.
///
/// Every other ACE (plain allow/deny, audit, alarm, callback variants, and
/// object ACEs without an object type) is skipped. A descriptor without a
/// DACL yields no entries.
pub fn decode_object_aces(bytes: &[u8]) -> Result<Vec<AccessControlEntry>, DescriptorError> {
    let header: DescriptorHeader = Cursor::new(bytes).read_le()?;

    if header.revision != SECURITY_DESCRIPTOR_REVISION {
        return Err(DescriptorError::Revision(header.revision));
    }

    if header.control & SE_SELF_RELATIVE == 0 {
        return Err(DescriptorError::NotSelfRelative(header.control));
    }

    for (field, offset) in [
        ("owner", header.offset_owner),
        ("group", header.offset_group),
        ("SACL", header.offset_sacl),
        ("DACL", header.offset_dacl),
    ] {
        let in_bounds = (DESCRIPTOR_HEADER_LEN..bytes.len()).contains(&(offset as usize));
        if offset != 0 && !in_bounds {
            return Err(DescriptorError::Offset {
                field,
                offset,
                len: bytes.len(),
            });
        }
    }

    if header.control & SE_DACL_PRESENT == 0 || header.offset_dacl == 0 {
        tracing::trace!("security descriptor has no DACL");
        return Ok(vec![]);
    }

    decode_dacl(&bytes[header.offset_dacl as usize..])
}

/// Decodes the ACL at the start of `bytes`, which may extend past the ACL.
fn decode_dacl(bytes: &[u8]) -> Result<Vec<AccessControlEntry>, DescriptorError> {
    let header: AclHeader = Cursor::new(bytes).read_le()?;

    if header.revision != ACL_REVISION && header.revision != ACL_REVISION_DS {
        return Err(DescriptorError::AclRevision(header.revision));
    }

    let acl_len = header.size as usize;
    if acl_len < ACL_HEADER_LEN || acl_len > bytes.len() {
        return Err(DescriptorError::AclSize {
            size: header.size,
            available: bytes.len(),
        });
    }
    let acl = &bytes[..acl_len];

    let mut entries = vec![];
    let mut pos = ACL_HEADER_LEN;
    for index in 0..header.ace_count {
        if pos + ACE_HEADER_LEN > acl.len() {
            return Err(DescriptorError::MissingAce { index });
        }

        let ace: AceHeader = Cursor::new(&acl[pos..]).read_le()?;
        let ace_len = ace.size as usize;
        if ace_len < ACE_HEADER_LEN || pos + ace_len > acl.len() {
            return Err(DescriptorError::AceSize {
                index,
                size: ace.size,
            });
        }
        let body = &acl[pos + ACE_HEADER_LEN..pos + ace_len];
        pos += ace_len;

        let kind = match ace.ace_type {
            ACCESS_ALLOWED_OBJECT_ACE_TYPE => AceKind::Allow,
            ACCESS_DENIED_OBJECT_ACE_TYPE => AceKind::Deny,
            other => {
                tracing::trace!(index, ace_type = other, "skipping non-object ACE");
                continue;
            }
        };

        let object_ace: ObjectAceBody = Cursor::new(body).read_le()?;
        let principal = Sid::try_from(object_ace.sid)?;

        let Some(object_type) = object_ace.object_type else {
            tracing::trace!(
                index,
                %principal,
                inherited_object_type = object_ace.inherited_object_type.is_some(),
                "skipping object ACE without an object type"
            );
            continue;
        };

        entries.push(AccessControlEntry {
            kind,
            object_type: Uuid::from_bytes_le(object_type),
            principal,
            mask: object_ace.mask,
            inherited: ace.flags & INHERITED_ACE != 0,
        });
    }

    Ok(entries)
}
