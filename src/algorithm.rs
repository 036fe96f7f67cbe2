//! The public key algorithm a template requires.

use std::fmt;

/// Supported public key algorithm types.
///
/// Version 4 templates name their algorithm in `msPKI-RA-Application-Policies`;
/// older templates are always RSA.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyAlgorithmType {
    /// RSA
    #[default]
    Rsa,
    /// ECDSA on NIST P-256
    EcdsaP256,
    /// ECDSA on NIST P-384
    EcdsaP384,
    /// ECDSA on NIST P-521
    EcdsaP521,
    /// ECDH on NIST P-256
    EcdhP256,
    /// ECDH on NIST P-384
    EcdhP384,
    /// ECDH on NIST P-521
    EcdhP521,
    /// DSA
    Dsa,
}

impl KeyAlgorithmType {
    /// All algorithm types, in the order they're matched against a policy.
    pub const ALL: [KeyAlgorithmType; 8] = [
        Self::Rsa,
        Self::EcdsaP256,
        Self::EcdsaP384,
        Self::EcdsaP521,
        Self::EcdhP256,
        Self::EcdhP384,
        Self::EcdhP521,
        Self::Dsa,
    ];

    /// The CNG name of the algorithm, as used in template policies.
    pub fn cng_name(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcdsaP256 => "ECDSA_P256",
            Self::EcdsaP384 => "ECDSA_P384",
            Self::EcdsaP521 => "ECDSA_P521",
            Self::EcdhP256 => "ECDH_P256",
            Self::EcdhP384 => "ECDH_P384",
            Self::EcdhP521 => "ECDH_P521",
            Self::Dsa => "DSA",
        }
    }

    /// Finds the algorithm named in a `msPKI-RA-Application-Policies` entry,
    /// which looks like ``msPKI-Asymmetric-Algorithm`PZPWSTR`ECDSA_P256`...``.
    ///
    /// Falls back to RSA when no known algorithm is named.
    pub fn from_application_policy(policy: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|algorithm| {
                let needle = format!(
                    "msPKI-Asymmetric-Algorithm`PZPWSTR`{}`",
                    algorithm.cng_name()
                );
                policy.contains(&needle)
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for KeyAlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cng_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_application_policy() {
        let policy = "msPKI-Asymmetric-Algorithm`PZPWSTR`ECDSA_P384`msPKI-Hash-Algorithm`PZPWSTR`SHA384`msPKI-Key-Usage`DWORD`16777215`msPKI-Symmetric-Algorithm`PZPWSTR`3DES`msPKI-Symmetric-Key-Length`DWORD`168`";
        assert_eq!(
            KeyAlgorithmType::from_application_policy(policy),
            KeyAlgorithmType::EcdsaP384
        );

        assert_eq!(
            KeyAlgorithmType::from_application_policy(
                "msPKI-Asymmetric-Algorithm`PZPWSTR`DSA`"
            ),
            KeyAlgorithmType::Dsa
        );
    }

    #[test]
    fn test_unknown_is_rsa() {
        assert_eq!(
            KeyAlgorithmType::from_application_policy(""),
            KeyAlgorithmType::Rsa
        );
        assert_eq!(
            KeyAlgorithmType::from_application_policy(
                "msPKI-Asymmetric-Algorithm`PZPWSTR`ECDSA_P999`"
            ),
            KeyAlgorithmType::Rsa
        );
    }
}
