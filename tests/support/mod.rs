//! Builders for the binary values of a template record.

#![allow(dead_code)]

use uuid::Uuid;
use windows_cert_template::descriptor::{
    ACCESS_ALLOWED_OBJECT_ACE_TYPE, ACCESS_DENIED_OBJECT_ACE_TYPE, ACE_OBJECT_TYPE_PRESENT,
    ACL_REVISION_DS, SECURITY_DESCRIPTOR_REVISION, SE_DACL_PRESENT, SE_SELF_RELATIVE,
};
use windows_cert_template::period::encode_period;
use windows_cert_template::{Sid, TemplateRecord, ENROLL_EXTENDED_RIGHT};

/// ADS_RIGHT_DS_CONTROL_ACCESS
const CONTROL_ACCESS: u32 = 0x100;

pub fn sid(text: &str) -> Sid {
    text.parse().unwrap()
}

/// An entry of the DACL being built.
pub enum Ace {
    /// ACCESS_ALLOWED_ACE granting everything.
    AllowAll(Sid),
    /// ACCESS_ALLOWED_OBJECT_ACE for the given right.
    Allow(Uuid, Sid),
    /// ACCESS_DENIED_OBJECT_ACE for the given right.
    Deny(Uuid, Sid),
}

impl Ace {
    pub fn allow_enroll(principal: &str) -> Self {
        Self::Allow(ENROLL_EXTENDED_RIGHT, sid(principal))
    }

    pub fn deny_enroll(principal: &str) -> Self {
        Self::Deny(ENROLL_EXTENDED_RIGHT, sid(principal))
    }

    fn encode(&self) -> Vec<u8> {
        let (ace_type, body) = match self {
            Self::AllowAll(principal) => {
                let mut body = 0x000F_01FFu32.to_le_bytes().to_vec();
                body.extend_from_slice(&principal.to_bytes());
                (0x00, body)
            }
            Self::Allow(right, principal) | Self::Deny(right, principal) => {
                let mut body = CONTROL_ACCESS.to_le_bytes().to_vec();
                body.extend_from_slice(&ACE_OBJECT_TYPE_PRESENT.to_le_bytes());
                body.extend_from_slice(&right.to_bytes_le());
                body.extend_from_slice(&principal.to_bytes());

                let ace_type = if matches!(self, Self::Allow(..)) {
                    ACCESS_ALLOWED_OBJECT_ACE_TYPE
                } else {
                    ACCESS_DENIED_OBJECT_ACE_TYPE
                };
                (ace_type, body)
            }
        };

        let mut ace = vec![ace_type, 0];
        ace.extend_from_slice(&((4 + body.len()) as u16).to_le_bytes());
        ace.extend_from_slice(&body);
        ace
    }
}

/// A self-relative security descriptor with the given DACL and no owner,
/// group or SACL.
pub fn security_descriptor(aces: &[Ace]) -> Vec<u8> {
    let aces = aces.iter().map(Ace::encode).collect::<Vec<_>>();
    let acl_size = 8 + aces.iter().map(Vec::len).sum::<usize>();

    let mut sd = vec![SECURITY_DESCRIPTOR_REVISION, 0];
    sd.extend_from_slice(&(SE_SELF_RELATIVE | SE_DACL_PRESENT).to_le_bytes());
    sd.extend_from_slice(&[0; 12]);
    sd.extend_from_slice(&20u32.to_le_bytes());
    sd.extend_from_slice(&[ACL_REVISION_DS, 0]);
    sd.extend_from_slice(&(acl_size as u16).to_le_bytes());
    sd.extend_from_slice(&(aces.len() as u16).to_le_bytes());
    sd.extend_from_slice(&[0, 0]);
    for ace in aces {
        sd.extend_from_slice(&ace);
    }
    sd
}

/// A version 2 template record with the given DACL.
pub fn template_record(oid: &str, aces: &[Ace]) -> TemplateRecord {
    TemplateRecord {
        display_name: "User".into(),
        minimal_key_size: 2048,
        revision: 3,
        minor_revision: 1,
        schema_version: 2,
        template_oids: vec![oid.into()],
        supported_csps: vec!["Microsoft Enhanced Cryptographic Provider v1.0".into()],
        validity_period: encode_period(chrono::TimeDelta::days(365)).to_vec(),
        renewal_overlap: encode_period(chrono::TimeDelta::weeks(6)).to_vec(),
        certificate_name_flag: 0,
        critical_extensions: vec![],
        key_usage: vec![0xA0, 0x00],
        ext_key_usage_syntax: vec![
            "1.3.6.1.4.1.311.10.3.4".into(),
            "1.3.6.1.5.5.7.3.4".into(),
            "1.3.6.1.5.5.7.3.2".into(),
        ],
        ra_application_policies: vec![],
        security: security_descriptor(aces),
    }
}
