use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use dcl::{utils::Unloggable, ApplyOption, LifecycleParam};
use privateca::Certificate;

#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,

    /// Overrides the Private CA API base URL, for example to talk to a local emulator
    #[arg(long, env = "PRIVATECA_BASE_PATH")]
    pub base_path: Option<String>,

    /// OAuth access token sent as bearer token. Requests are sent unauthenticated without one.
    #[arg(
        long,
        env = "GOOGLE_OAUTH_ACCESS_TOKEN",
        hide_env_values = true,
        value_parser = parse_access_token,
    )]
    pub access_token: Option<Unloggable<String>>,

    /// Upper bound for each operation, including retries. Defaults to 20 minutes.
    #[arg(long)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Create the certificate of a manifest, or update the labels of an existing one
    Apply(ApplyArgs),

    /// Print the live state of the certificate of a manifest
    Get(ManifestArgs),

    /// Print all certificates of a CA pool
    List(ListArgs),

    /// Revoke the certificate of a manifest
    Delete(ManifestArgs),

    /// Revoke all certificates of a CA pool that carry the given labels
    DeleteAll(DeleteAllArgs),
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Path to a YAML manifest describing the certificate
    #[arg(long, short)]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Fail instead of creating the certificate if it does not exist yet
    #[arg(long)]
    pub block_creation: bool,

    /// Fail if the certificate already exists
    #[arg(long)]
    pub block_acquire: bool,

    /// Fail instead of updating an existing certificate
    #[arg(long)]
    pub block_modification: bool,
}

#[derive(Args, Debug)]
pub struct PoolArgs {
    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub location: String,

    #[arg(long)]
    pub ca_pool: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Number of certificates requested per page. The server decides if not set.
    #[arg(long)]
    pub page_size: Option<i32>,
}

#[derive(Args, Debug)]
pub struct DeleteAllArgs {
    #[command(flatten)]
    pub pool: PoolArgs,

    /// Only revoke certificates with this label, can be repeated
    ///
    /// Without any label every certificate of the pool is revoked.
    #[arg(long = "label", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,
}

impl Cli {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl ApplyArgs {
    pub fn apply_options(&self) -> Vec<ApplyOption<Certificate>> {
        [
            (self.block_creation, LifecycleParam::BlockCreation),
            (self.block_acquire, LifecycleParam::BlockAcquire),
            (self.block_modification, LifecycleParam::BlockModification),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, param)| ApplyOption::Lifecycle(param))
        .collect()
    }
}

impl DeleteAllArgs {
    pub fn matches(&self, certificate: &Certificate) -> bool {
        self.labels
            .iter()
            .all(|(key, value)| certificate.labels.get(key) == Some(value))
    }
}

fn parse_access_token(cli_argument: &str) -> Result<Unloggable<String>, String> {
    Ok(Unloggable(cli_argument.to_string()))
}

fn parse_label(cli_argument: &str) -> Result<(String, String), String> {
    let (key, value) = cli_argument
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {cli_argument:?}"))?;
    if key.is_empty() {
        return Err("label key can not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_apply() {
        let cli = Cli::try_parse_from([
            "privateca-cli",
            "--timeout-seconds",
            "60",
            "--access-token",
            "secret",
            "apply",
            "--file",
            "web.yaml",
            "--block-creation",
            "--block-modification",
        ])
        .unwrap();
        assert_eq!(cli.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(format!("{:?}", cli.access_token), "Some(<redacted>)");

        let CliCommand::Apply(args) = cli.command else {
            panic!("expected apply, got {:?}", cli.command);
        };
        assert_eq!(args.manifest.file, PathBuf::from("web.yaml"));
        assert_eq!(
            args.apply_options()
                .into_iter()
                .map(|opt| match opt {
                    ApplyOption::Lifecycle(param) => param,
                    ApplyOption::StateHint(_) => panic!("unexpected state hint"),
                })
                .collect::<Vec<_>>(),
            vec![
                LifecycleParam::BlockCreation,
                LifecycleParam::BlockModification
            ]
        );
    }

    #[test]
    fn parse_labels() {
        assert_eq!(
            parse_label("team=platform"),
            Ok(("team".to_string(), "platform".to_string()))
        );
        assert_eq!(
            parse_label("empty="),
            Ok(("empty".to_string(), String::new()))
        );
        assert!(parse_label("team").is_err());
        assert!(parse_label("=platform").is_err());
    }

    #[test]
    fn delete_all_filters_by_labels() {
        let cli = Cli::try_parse_from([
            "privateca-cli",
            "delete-all",
            "--project",
            "my-project",
            "--location",
            "us-central1",
            "--ca-pool",
            "pool",
            "--label",
            "team=platform",
        ])
        .unwrap();
        let CliCommand::DeleteAll(args) = cli.command else {
            panic!("expected delete-all, got {:?}", cli.command);
        };

        let labelled = |team: &str| Certificate {
            labels: BTreeMap::from([("team".to_string(), team.to_string())]),
            ..Certificate::default()
        };
        assert!(args.matches(&labelled("platform")));
        assert!(!args.matches(&labelled("security")));
        assert!(!args.matches(&Certificate::default()));
    }
}
