//! Diffs between certificates, and the operations that resolve them.

use std::collections::BTreeMap;

use dcl::diff::{
    diff_map, diff_object, diff_reference, diff_value, DiffInfo, FieldDiff, FieldName, RECREATE,
};
use snafu::{OptionExt, Snafu};
use strum::{Display, EnumString, IntoStaticStr};

use super::Certificate;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum Error {
    #[snafu(display("no operation is known by the name {name:?}"))]
    UnknownOperation { name: String },
}

/// API calls that update a certificate in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum UpdateOperation {
    /// `PATCH` with an update mask, only labels can be changed this way
    #[strum(serialize = "updateCertificateUpdateCertificateOperation")]
    UpdateCertificate,
}

/// A set of field diffs that can be resolved together.
#[derive(Clone, Debug, PartialEq)]
pub enum CertificateDiff {
    /// The certificate has to be reissued, which apply refuses to do
    Recreate { field_diffs: Vec<FieldDiff> },
    Update {
        operation: UpdateOperation,
        field_diffs: Vec<FieldDiff>,
    },
}

impl CertificateDiff {
    pub fn requires_recreate(&self) -> bool {
        matches!(self, CertificateDiff::Recreate { .. })
    }

    pub fn field_diffs(&self) -> &[FieldDiff] {
        match self {
            CertificateDiff::Recreate { field_diffs }
            | CertificateDiff::Update { field_diffs, .. } => field_diffs,
        }
    }
}

/// Compares a desired certificate with an actual one, both canonicalized.
///
/// Output-only fields are never compared. Labels are updated in place, any other change
/// requires recreation.
pub fn diff_certificate(desired: &Certificate, actual: &Certificate) -> Vec<FieldDiff> {
    let root = FieldName::root();
    let recreate = DiffInfo::recreate();
    let update = DiffInfo::triggers(UpdateOperation::UpdateCertificate.into());
    [
        diff_reference(&desired.name, &actual.name, &recreate, root.nest("name")),
        diff_value(&desired.pem_csr, &actual.pem_csr, &recreate, root.nest("pemCsr")),
        diff_object(&desired.config, &actual.config, &recreate, root.nest("config")),
        diff_value(&desired.lifetime, &actual.lifetime, &recreate, root.nest("lifetime")),
        diff_reference(
            &desired.certificate_template,
            &actual.certificate_template,
            &recreate,
            root.nest("certificateTemplate"),
        ),
        diff_value(
            &desired.subject_mode,
            &actual.subject_mode,
            &recreate,
            root.nest("subjectMode"),
        ),
        diff_map(&desired.labels, &actual.labels, &update, root.nest("labels")),
        diff_reference(&desired.project, &actual.project, &recreate, root.nest("project")),
        diff_reference(&desired.location, &actual.location, &recreate, root.nest("location")),
        diff_reference(&desired.ca_pool, &actual.ca_pool, &recreate, root.nest("caPool")),
        diff_reference(
            &desired.certificate_authority,
            &actual.certificate_authority,
            &recreate,
            root.nest("certificateAuthority"),
        ),
    ]
    .concat()
}

/// Groups field diffs by the operation that resolves them.
pub fn convert_field_diffs_to_certificate_diffs(
    field_diffs: Vec<FieldDiff>,
) -> Result<Vec<CertificateDiff>, Error> {
    let mut by_operation = BTreeMap::<String, Vec<FieldDiff>>::new();
    for diff in field_diffs {
        for operation in &diff.resulting_operation {
            by_operation
                .entry(operation.clone())
                .or_default()
                .push(diff.clone());
        }
    }

    by_operation
        .into_iter()
        .map(|(name, field_diffs)| {
            if name == RECREATE {
                Ok(CertificateDiff::Recreate { field_diffs })
            } else {
                let operation = name.parse().ok().context(UnknownOperationSnafu { name })?;
                Ok(CertificateDiff::Update {
                    operation,
                    field_diffs,
                })
            }
        })
        .collect()
}
