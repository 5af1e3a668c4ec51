//! Declarative apply: brings a certificate to a desired state, creating it if needed.

use dcl::{
    apply::{fetch_lifecycle_params, fetch_state_hint, has_lifecycle_param},
    codec::{Codec, JsonMap},
    object::Extract,
    retry::{retry, Attempt},
    validation::Validate,
    ApplyOption, FieldDiff, LifecycleParam,
};
use snafu::ResultExt;
use tracing::{debug, info};

use super::{
    ApplyInfeasibleSnafu, Client, DiffAfterApplySnafu, Error, InitialStateSnafu, PlanSnafu,
    ValidateSnafu,
};
use crate::certificate::{
    canonicalize::{
        canonicalize_desired_state, canonicalize_initial_state, canonicalize_new_state,
    },
    compare::{convert_field_diffs_to_certificate_diffs, diff_certificate, CertificateDiff},
    Certificate,
};

/// What an apply starts from.
struct Plan {
    /// The live certificate, if there is one
    initial: Option<Certificate>,
    desired: Certificate,
    field_diffs: Vec<FieldDiff>,
}

impl Client {
    /// Makes the live certificate match `raw_desired` and returns the resulting state.
    ///
    /// Only labels can change in place. Any other difference makes the apply infeasible, as does
    /// anything the [`LifecycleParam`]s in `opts` block. Attempts that run into a conflict are
    /// retried.
    pub async fn apply_certificate(
        &self,
        raw_desired: &Certificate,
        opts: &[ApplyOption<Certificate>],
    ) -> Result<Certificate, Error> {
        self.run("apply", &raw_desired.id(), async {
            retry(self.config.retry_provider.as_ref(), || async {
                match self.apply_certificate_helper(raw_desired, opts).await {
                    Ok(certificate) => Attempt::Done(certificate),
                    Err(err) if err.is_conflict() => Attempt::Retry(err),
                    Err(err) => Attempt::Fail(err),
                }
            })
            .await
        })
        .await
    }

    async fn apply_certificate_helper(
        &self,
        raw_desired: &Certificate,
        opts: &[ApplyOption<Certificate>],
    ) -> Result<Certificate, Error> {
        let kind = raw_desired.describe();
        info!(
            service = kind.service,
            resource = kind.type_name,
            "Beginning apply"
        );
        debug!(?raw_desired, "User specified desired state");

        raw_desired.validate().context(ValidateSnafu)?;
        let mut raw_desired = raw_desired.clone();
        raw_desired.extract_fields();

        let Plan {
            initial,
            desired,
            field_diffs,
        } = self.diffs_for_raw_desired(&raw_desired, opts).await?;
        let diffs = convert_field_diffs_to_certificate_diffs(field_diffs).context(PlanSnafu)?;

        let lifecycle_params = fetch_lifecycle_params(opts);
        let create = match &initial {
            None if has_lifecycle_param(&lifecycle_params, LifecycleParam::BlockCreation) => {
                return ApplyInfeasibleSnafu {
                    message: format!("creation blocked by lifecycle params: {desired:?}"),
                }
                .fail();
            }
            None => true,
            Some(initial)
                if has_lifecycle_param(&lifecycle_params, LifecycleParam::BlockAcquire) =>
            {
                return ApplyInfeasibleSnafu {
                    message: format!(
                        "certificate already exists, apply blocked by lifecycle params: {initial:?}"
                    ),
                }
                .fail();
            }
            Some(_) => {
                for diff in &diffs {
                    if diff.requires_recreate() {
                        return ApplyInfeasibleSnafu {
                            message: format!(
                                "certificate requires recreation: {}",
                                describe_diffs(diff.field_diffs())
                            ),
                        }
                        .fail();
                    }
                    if has_lifecycle_param(&lifecycle_params, LifecycleParam::BlockModification) {
                        return ApplyInfeasibleSnafu {
                            message: format!(
                                "modification blocked by lifecycle params: {}",
                                describe_diffs(diff.field_diffs())
                            ),
                        }
                        .fail();
                    }
                }
                false
            }
        };

        let mut create_response = None;
        if create {
            create_response = Some(self.create_certificate(&desired).await?);
        } else {
            for diff in diffs {
                if let CertificateDiff::Update {
                    operation,
                    field_diffs,
                } = diff
                {
                    self.update_certificate(&desired, operation, &field_diffs)
                        .await?;
                }
            }
        }

        self.apply_certificate_diff(&desired, &raw_desired, create_response)
            .await
    }

    /// Reads the initial state and diffs it against the canonicalized desired state.
    ///
    /// The last state hint in `opts` addresses the lookup if there is one.
    async fn diffs_for_raw_desired(
        &self,
        raw_desired: &Certificate,
        opts: &[ApplyOption<Certificate>],
    ) -> Result<Plan, Error> {
        let fetch_state = fetch_state_hint(opts).unwrap_or(raw_desired);
        let raw_initial = match self.fetch_certificate(fetch_state).await {
            Ok(raw_initial) => raw_initial,
            Err(err) if err.is_not_found() => {
                info!("Certificate does not exist yet");
                return Ok(Plan {
                    initial: None,
                    desired: canonicalize_desired_state(raw_desired, None),
                    field_diffs: Vec::new(),
                });
            }
            Err(err) => {
                return Err(err).context(InitialStateSnafu {
                    id: fetch_state.id(),
                })
            }
        };

        let initial = canonicalize_initial_state(raw_initial);
        let desired = canonicalize_desired_state(raw_desired, Some(&initial));
        let field_diffs = diff_certificate(&desired, &initial);
        info!(diffs = field_diffs.len(), "Compared with initial state");
        debug!(?field_diffs);
        Ok(Plan {
            initial: Some(initial),
            desired,
            field_diffs,
        })
    }

    /// Reads back the applied certificate and checks that nothing differs any longer.
    async fn apply_certificate_diff(
        &self,
        desired: &Certificate,
        raw_desired: &Certificate,
        create_response: Option<JsonMap>,
    ) -> Result<Certificate, Error> {
        let mut raw_new = self.fetch_certificate(desired).await?;
        if let Some(response) = create_response {
            raw_new = canonicalize_new_state(raw_new, &Certificate::flatten(&response));
        }

        let mut new_state = canonicalize_new_state(raw_new, raw_desired);
        let mut new_desired = canonicalize_desired_state(raw_desired, Some(&new_state));
        new_state.post_read_extract_fields();
        new_desired.post_read_extract_fields();

        let new_diffs = diff_certificate(&new_desired, &new_state);
        if new_diffs.is_empty() {
            info!("No diffs found, apply was successful");
            return Ok(new_state);
        }
        info!(diffs = %describe_diffs(&new_diffs), "Found diffs after apply");
        DiffAfterApplySnafu {
            diffs: new_diffs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            new_state: Box::new(new_state),
        }
        .fail()
    }
}

fn describe_diffs(diffs: &[FieldDiff]) -> String {
    diffs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dcl::Method;

    use super::*;
    use crate::{
        certificate::tests::desired_certificate,
        client::fake_api::FakePrivateCa,
    };

    const CERTIFICATES: &str = "projects/my-project/locations/us-central1/caPools/pool/certificates";

    fn with_team(team: &str) -> Certificate {
        Certificate {
            labels: BTreeMap::from([("team".to_string(), team.to_string())]),
            ..desired_certificate()
        }
    }

    fn count(fake: &FakePrivateCa, method: Method) -> usize {
        fake.requests()
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }

    #[tokio::test]
    async fn apply_creates_missing_certificate() {
        let fake = FakePrivateCa::new();
        let certificate = fake
            .client()
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();

        assert_eq!(certificate.name.as_deref(), Some("web"));
        assert_eq!(certificate.project.as_deref(), Some("my-project"));
        assert!(certificate.pem_certificate.is_some());
        assert!(certificate.certificate_description.is_some());
        assert!(!certificate.is_revoked());

        let stored = fake.certificate(&format!("{CERTIFICATES}/web")).unwrap();
        assert_eq!(
            stored["config"]["x509Config"]["caOptions"],
            serde_json::json!({"isCa": false})
        );
        assert!(fake
            .requests()
            .contains(&(Method::Post, format!("{CERTIFICATES}?certificateId=web"))));
    }

    #[tokio::test]
    async fn apply_passes_issuing_authority() {
        let fake = FakePrivateCa::new();
        let desired = Certificate {
            certificate_authority: Some("ca-2".to_string()),
            ..desired_certificate()
        };
        let certificate = fake
            .client()
            .apply_certificate(&desired, &[])
            .await
            .unwrap();
        assert!(certificate
            .issuer_certificate_authority
            .unwrap()
            .ends_with("/certificateAuthorities/ca-2"));
        assert!(fake.requests().contains(&(
            Method::Post,
            format!("{CERTIFICATES}?certificateId=web&issuingCertificateAuthorityId=ca-2")
        )));
    }

    #[tokio::test]
    async fn apply_ignores_csr_next_to_config() {
        let fake = FakePrivateCa::new();
        let mut issued = desired_certificate().expand();
        issued.insert(
            "pemCsr".to_string(),
            "-----BEGIN CERTIFICATE REQUEST-----".into(),
        );
        issued.insert("subjectMode".to_string(), "DEFAULT".into());
        fake.insert(serde_json::Value::Object(issued));

        let certificate = fake
            .client()
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();
        assert_eq!(certificate.name.as_deref(), Some("web"));
        assert_eq!(count(&fake, Method::Post), 0);
        assert_eq!(count(&fake, Method::Patch), 0);
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let fake = FakePrivateCa::new();
        let client = fake.client();
        let first = client
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();
        let second = client
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&fake, Method::Post), 1);
        assert_eq!(count(&fake, Method::Patch), 0);
    }

    #[tokio::test]
    async fn apply_updates_labels_in_place() {
        let fake = FakePrivateCa::new();
        let client = fake.client();
        client
            .apply_certificate(&with_team("platform"), &[])
            .await
            .unwrap();
        let certificate = client
            .apply_certificate(&with_team("security"), &[])
            .await
            .unwrap();

        assert_eq!(certificate.labels["team"], "security");
        assert_eq!(
            fake.certificate(&format!("{CERTIFICATES}/web")).unwrap()["labels"],
            serde_json::json!({"team": "security"})
        );
        assert!(fake.requests().contains(&(
            Method::Patch,
            format!("{CERTIFICATES}/web?updateMask=labels")
        )));
        assert_eq!(count(&fake, Method::Post), 1);
    }

    #[tokio::test]
    async fn apply_refuses_recreation() {
        let fake = FakePrivateCa::new();
        let client = fake.client();
        client
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();

        let changed = Certificate {
            lifetime: Some("3600s".to_string()),
            ..desired_certificate()
        };
        let err = client.apply_certificate(&changed, &[]).await.unwrap_err();
        let Error::ApplyInfeasible { message } = err else {
            panic!("expected an infeasible apply, got {err:?}");
        };
        assert!(message.contains("recreation"), "{message}");
        assert!(message.contains("lifetime"), "{message}");
    }

    #[tokio::test]
    async fn lifecycle_params_block_changes() {
        let fake = FakePrivateCa::new();
        let client = fake.client();

        let err = client
            .apply_certificate(
                &desired_certificate(),
                &[ApplyOption::Lifecycle(LifecycleParam::BlockCreation)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApplyInfeasible { .. }));
        assert_eq!(count(&fake, Method::Post), 0);

        client
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();

        let err = client
            .apply_certificate(
                &desired_certificate(),
                &[ApplyOption::Lifecycle(LifecycleParam::BlockAcquire)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApplyInfeasible { .. }));

        let err = client
            .apply_certificate(
                &with_team("security"),
                &[ApplyOption::Lifecycle(LifecycleParam::BlockModification)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApplyInfeasible { .. }));
        assert_eq!(count(&fake, Method::Patch), 0);

        // Nothing to modify, so nothing is blocked
        client
            .apply_certificate(
                &desired_certificate(),
                &[ApplyOption::Lifecycle(LifecycleParam::BlockModification)],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn apply_uses_state_hint() {
        let fake = FakePrivateCa::new();
        let client = fake.client();
        let old = Certificate {
            name: Some("old".to_string()),
            ..desired_certificate()
        };
        client.apply_certificate(&old, &[]).await.unwrap();

        let err = client
            .apply_certificate(&desired_certificate(), &[ApplyOption::StateHint(old)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApplyInfeasible { .. }));
        assert!(fake
            .requests()
            .ends_with(&[(Method::Get, format!("{CERTIFICATES}/old"))]));
        assert!(fake.certificate(&format!("{CERTIFICATES}/web")).is_none());
    }

    #[tokio::test]
    async fn apply_retries_conflicts() {
        let fake = FakePrivateCa::new();
        fake.fail_next(409);
        fake.fail_next(409);
        let certificate = fake
            .client()
            .apply_certificate(&desired_certificate(), &[])
            .await
            .unwrap();
        assert_eq!(certificate.name.as_deref(), Some("web"));
        assert_eq!(count(&fake, Method::Post), 1);
    }

    #[tokio::test]
    async fn apply_rejects_invalid_certificates() {
        let fake = FakePrivateCa::new();
        let invalid = Certificate {
            pem_csr: Some("-----BEGIN CERTIFICATE REQUEST-----".to_string()),
            ..desired_certificate()
        };
        let err = fake
            .client()
            .apply_certificate(&invalid, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validate { .. }));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn apply_reports_remaining_diffs() {
        let fake = FakePrivateCa::new();
        let client = fake.client();
        client
            .apply_certificate(&with_team("platform"), &[])
            .await
            .unwrap();

        fake.ignore_label_updates();
        let err = client
            .apply_certificate(&with_team("security"), &[])
            .await
            .unwrap_err();
        let Error::DiffAfterApply { diffs, new_state } = err else {
            panic!("expected remaining diffs, got {err:?}");
        };
        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].starts_with("labels:"), "{diffs:?}");
        assert_eq!(new_state.labels["team"], "platform");
    }
}
