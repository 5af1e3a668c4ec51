//! Enumerations of the certificate schema.
//!
//! Values the client does not know about are kept in an `Unknown` variant, so that a resource
//! read from a newer API version still round-trips. Only desired states are rejected for them.

use dcl::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

#[derive(Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
pub enum SubjectMode {
    #[default]
    #[strum(serialize = "SUBJECT_REQUEST_MODE_UNSPECIFIED")]
    Unspecified,
    #[strum(serialize = "DEFAULT")]
    Default,
    #[strum(serialize = "REFLECTED_SPIFFE")]
    ReflectedSpiffe,
    #[strum(default)]
    Unknown(String),
}

/// Why a certificate was revoked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
pub enum RevocationReason {
    #[default]
    #[strum(serialize = "REVOCATION_REASON_UNSPECIFIED")]
    Unspecified,
    #[strum(serialize = "KEY_COMPROMISE")]
    KeyCompromise,
    #[strum(serialize = "CERTIFICATE_AUTHORITY_COMPROMISE")]
    CertificateAuthorityCompromise,
    #[strum(serialize = "AFFILIATION_CHANGED")]
    AffiliationChanged,
    #[strum(serialize = "SUPERSEDED")]
    Superseded,
    #[strum(serialize = "CESSATION_OF_OPERATION")]
    CessationOfOperation,
    #[strum(serialize = "CERTIFICATE_HOLD")]
    CertificateHold,
    #[strum(serialize = "PRIVILEGE_WITHDRAWN")]
    PrivilegeWithdrawn,
    #[strum(serialize = "ATTRIBUTE_AUTHORITY_COMPROMISE")]
    AttributeAuthorityCompromise,
    #[strum(default)]
    Unknown(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
pub enum PublicKeyFormat {
    #[default]
    #[strum(serialize = "KEY_FORMAT_UNSPECIFIED")]
    Unspecified,
    #[strum(serialize = "PEM")]
    Pem,
    #[strum(default)]
    Unknown(String),
}

macro_rules! api_enum {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
                match self {
                    Self::Unknown(value) => Err(ValidationError::InvalidEnum {
                        field: field.to_string(),
                        value: value.clone(),
                    }),
                    _ => Ok(()),
                }
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer)?
                    .parse()
                    .map_err(serde::de::Error::custom)
            }
        }
    )*};
}

api_enum!(SubjectMode, RevocationReason, PublicKeyFormat);
