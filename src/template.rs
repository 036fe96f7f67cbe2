//! Certificate templates, built from the values a [`TemplateStore`] holds for them.

use chrono::TimeDelta;
use der::asn1::ObjectIdentifier;
#[cfg(feature = "serde")]
use serde::ser::SerializeStruct;
#[cfg(feature = "serde")]
use serde::Serialize;

use crate::algorithm::KeyAlgorithmType;
use crate::descriptor::decode_object_aces;
use crate::enrollment::{EnrollmentPermissions, Identity};
use crate::extensions::{
    ExtendedKeyUsageExtension, KeyUsageExtension, APPLICATION_CERT_POLICIES_OID,
    ENHANCED_KEY_USAGE_OID, KEY_USAGE_OID,
};
use crate::period::decode_period;
use crate::store::TemplateStore;
use crate::{parse_oid, TemplateError};

/// `CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT`, from `msPKI-Certificate-Name-Flag`.
pub const CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT: u32 = 0x1;

/// The raw values of one template, as cached in the registry.
///
/// Each field is named after the registry value it holds. With the `serde`
/// feature a record can be deserialized using those value names as keys,
/// with binary values as hex strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct TemplateRecord {
    /// `DisplayName`
    #[cfg_attr(feature = "serde", serde(rename = "DisplayName"))]
    pub display_name: String,

    /// `msPKI-Minimal-Key-Size`
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-Minimal-Key-Size"))]
    pub minimal_key_size: u32,

    /// `Revision`, the template's major version.
    #[cfg_attr(feature = "serde", serde(rename = "Revision"))]
    pub revision: u32,

    /// `msPKI-Template-Minor-Revision`
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-Template-Minor-Revision"))]
    pub minor_revision: u32,

    /// `msPKI-Template-Schema-Version`
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-Template-Schema-Version"))]
    pub schema_version: u32,

    /// `msPKI-Cert-Template-OID`. Only the first entry is meaningful.
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-Cert-Template-OID", default))]
    pub template_oids: Vec<String>,

    /// `SupportedCSPs`
    #[cfg_attr(feature = "serde", serde(rename = "SupportedCSPs", default))]
    pub supported_csps: Vec<String>,

    /// `ValidityPeriod`
    #[cfg_attr(feature = "serde", serde(rename = "ValidityPeriod", with = "hex::serde"))]
    pub validity_period: Vec<u8>,

    /// `RenewalOverlap`
    #[cfg_attr(feature = "serde", serde(rename = "RenewalOverlap", with = "hex::serde"))]
    pub renewal_overlap: Vec<u8>,

    /// `msPKI-Certificate-Name-Flag`
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-Certificate-Name-Flag", default))]
    pub certificate_name_flag: u32,

    /// `CriticalExtensions`
    #[cfg_attr(feature = "serde", serde(rename = "CriticalExtensions", default))]
    pub critical_extensions: Vec<String>,

    /// `KeyUsage`
    #[cfg_attr(feature = "serde", serde(rename = "KeyUsage", with = "hex::serde", default))]
    pub key_usage: Vec<u8>,

    /// `ExtKeyUsageSyntax`
    #[cfg_attr(feature = "serde", serde(rename = "ExtKeyUsageSyntax", default))]
    pub ext_key_usage_syntax: Vec<String>,

    /// `msPKI-RA-Application-Policies`
    #[cfg_attr(feature = "serde", serde(rename = "msPKI-RA-Application-Policies", default))]
    pub ra_application_policies: Vec<String>,

    /// `Security`, the template's self-relative security descriptor.
    #[cfg_attr(feature = "serde", serde(rename = "Security", with = "hex::serde"))]
    pub security: Vec<u8>,
}

/// A certificate template.
///
/// Templates are fully decoded when they're built and never change
/// afterwards; in particular they don't go back to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateTemplate {
    name: String,
    display_name: String,
    object_identifier: ObjectIdentifier,
    enrollee_supplies_subject: bool,
    key_algorithm: KeyAlgorithmType,
    minimum_key_length: u32,
    validity_period: TimeDelta,
    renewal_overlap: TimeDelta,
    key_storage_providers: Vec<String>,
    major_version: u32,
    minor_version: u32,
    schema_version: u32,
    key_usage: KeyUsageExtension,
    extended_key_usage: ExtendedKeyUsageExtension,
    enrollment_permissions: EnrollmentPermissions,
}

impl CertificateTemplate {
    /// Builds a template from its raw values.
    ///
    /// Fails if any value can't be decoded; there's no partially built
    /// template.
    pub fn build(name: impl Into<String>, record: &TemplateRecord) -> Result<Self, TemplateError> {
        let name = name.into();

        let object_identifier = record
            .template_oids
            .first()
            .ok_or(TemplateError::MissingField("msPKI-Cert-Template-OID"))
            .and_then(|oid| parse_oid(oid))?;

        let validity_period = decode_period(&record.validity_period)?;
        let renewal_overlap = decode_period(&record.renewal_overlap)?;

        let is_critical = |oid: ObjectIdentifier| {
            let oid = oid.to_string();
            record.critical_extensions.iter().any(|c| *c == oid)
        };

        let key_usage = KeyUsageExtension::from_template_bits(
            &record.key_usage,
            is_critical(KEY_USAGE_OID),
        );
        let extended_key_usage = ExtendedKeyUsageExtension::from_template_oids(
            &record.ext_key_usage_syntax,
            is_critical(ENHANCED_KEY_USAGE_OID) || is_critical(APPLICATION_CERT_POLICIES_OID),
        )?;

        let key_algorithm = record
            .ra_application_policies
            .first()
            .map(|policy| KeyAlgorithmType::from_application_policy(policy))
            .unwrap_or_default();

        let entries = decode_object_aces(&record.security)?;
        let enrollment_permissions = EnrollmentPermissions::from_entries(&entries);

        tracing::debug!(
            template = name.as_str(),
            oid = %object_identifier,
            aces = entries.len(),
            allowed = enrollment_permissions.allowed().len(),
            denied = enrollment_permissions.denied().len(),
            "built certificate template"
        );

        Ok(Self {
            name,
            display_name: record.display_name.clone(),
            object_identifier,
            enrollee_supplies_subject: record.certificate_name_flag
                & CT_FLAG_ENROLLEE_SUPPLIES_SUBJECT
                != 0,
            key_algorithm,
            minimum_key_length: record.minimal_key_size,
            validity_period,
            renewal_overlap,
            key_storage_providers: record.supported_csps.clone(),
            major_version: record.revision,
            minor_version: record.minor_revision,
            schema_version: record.schema_version,
            key_usage,
            extended_key_usage,
            enrollment_permissions,
        })
    }

    /// Looks up the template with the given name and builds it.
    ///
    /// Returns `Ok(None)` if the store has no such template.
    pub fn lookup<S: TemplateStore + ?Sized>(
        store: &S,
        name: &str,
    ) -> Result<Option<Self>, TemplateError> {
        match store.record(name) {
            Some(record) => Self::build(name, &record).map(Some),
            None => {
                tracing::debug!(template = name, "no such template");
                Ok(None)
            }
        }
    }

    /// Looks up the template with the given object identifier and builds it.
    ///
    /// Templates are matched on the first entry of their
    /// `msPKI-Cert-Template-OID` value, in the store's name order. Returns
    /// `Ok(None)` if no template matches.
    pub fn lookup_by_oid<S: TemplateStore + ?Sized>(
        store: &S,
        oid: &ObjectIdentifier,
    ) -> Result<Option<Self>, TemplateError> {
        let oid = oid.to_string();

        for name in store.template_names() {
            let Some(record) = store.record(&name) else {
                continue;
            };

            if record.template_oids.first() == Some(&oid) {
                return Self::build(name, &record).map(Some);
            }
        }

        tracing::debug!(%oid, "no template with this OID");
        Ok(None)
    }

    /// Whether `identity` may enroll for this template.
    ///
    /// With `explicit_only`, only entries naming the identity's user count:
    /// its group memberships are ignored, both for allows and for denies.
    pub fn allows_enrollment(&self, identity: &Identity, explicit_only: bool) -> bool {
        self.enrollment_permissions.authorize(identity, explicit_only)
    }

    /// The template's common name. Use this when submitting requests.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template's display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The template's object identifier.
    pub fn object_identifier(&self) -> &ObjectIdentifier {
        &self.object_identifier
    }

    /// Whether the enrollee may supply the subject in its request.
    pub fn enrollee_supplies_subject(&self) -> bool {
        self.enrollee_supplies_subject
    }

    /// The required public key algorithm.
    pub fn key_algorithm(&self) -> KeyAlgorithmType {
        self.key_algorithm
    }

    /// The minimum accepted key length, in bits.
    pub fn minimum_key_length(&self) -> u32 {
        self.minimum_key_length
    }

    /// The validity period of issued certificates.
    pub fn validity_period(&self) -> TimeDelta {
        self.validity_period
    }

    /// How long before expiry certificates should be renewed.
    pub fn renewal_overlap(&self) -> TimeDelta {
        self.renewal_overlap
    }

    /// The preferred key storage providers, in order.
    pub fn key_storage_providers(&self) -> &[String] {
        &self.key_storage_providers
    }

    /// The template's major version.
    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    /// The template's minor version.
    pub fn minor_version(&self) -> u32 {
        self.minor_version
    }

    /// The template's Active Directory schema version.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// The key usage extension of issued certificates.
    pub fn key_usage(&self) -> &KeyUsageExtension {
        &self.key_usage
    }

    /// The extended key usage extension of issued certificates.
    pub fn extended_key_usage(&self) -> &ExtendedKeyUsageExtension {
        &self.extended_key_usage
    }

    /// The principals allowed and denied enrollment.
    pub fn enrollment_permissions(&self) -> &EnrollmentPermissions {
        &self.enrollment_permissions
    }
}

#[cfg(feature = "serde")]
impl Serialize for CertificateTemplate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("CertificateTemplate", 15)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("display_name", &self.display_name)?;
        s.serialize_field("oid", &self.object_identifier.to_string())?;
        s.serialize_field("enrollee_supplies_subject", &self.enrollee_supplies_subject)?;
        s.serialize_field("key_algorithm", self.key_algorithm.cng_name())?;
        s.serialize_field("minimum_key_length", &self.minimum_key_length)?;
        s.serialize_field("validity_period_secs", &self.validity_period.num_seconds())?;
        s.serialize_field("renewal_overlap_secs", &self.renewal_overlap.num_seconds())?;
        s.serialize_field("key_storage_providers", &self.key_storage_providers)?;
        s.serialize_field("major_version", &self.major_version)?;
        s.serialize_field("minor_version", &self.minor_version)?;
        s.serialize_field("schema_version", &self.schema_version)?;
        s.serialize_field("key_usage", &self.key_usage)?;
        s.serialize_field("extended_key_usage", &self.extended_key_usage)?;
        s.serialize_field("enrollment_permissions", &self.enrollment_permissions)?;
        s.end()
    }
}
