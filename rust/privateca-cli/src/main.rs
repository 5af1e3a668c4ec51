use std::{fs, path::Path, sync::Arc};

use clap::Parser;
use cli_args::{ApplyArgs, Cli, CliCommand, DeleteAllArgs, ListArgs, ManifestArgs};
use dcl::{transport::ReqwestTransport, Config};
use privateca::{client::CERTIFICATE_MAX_PAGE, Certificate, Client};
use serde::Serialize;
use serde_json::Value;
use snafu::ResultExt;
use tracing::{info, level_filters::LevelFilter};

mod cli_args;

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
        .whatever_context("failed to create tracing subscriber EnvFilter")?;
    tracing_subscriber::fmt()
        // Short running tool does not need any complex output
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let client = build_client(&cli);

    match cli.command {
        CliCommand::Apply(args) => apply(&client, args).await?,
        CliCommand::Get(args) => get(&client, args).await?,
        CliCommand::List(args) => list(&client, args).await?,
        CliCommand::Delete(args) => delete(&client, args).await?,
        CliCommand::DeleteAll(args) => delete_all(&client, args).await?,
    }

    Ok(())
}

fn build_client(cli: &Cli) -> Client {
    let transport = ReqwestTransport::new(cli.access_token.as_ref().map(|token| token.0.clone()));
    let mut config = Config::new(Arc::new(transport));
    if let Some(base_path) = &cli.base_path {
        config = config.with_base_path(base_path);
    }
    if let Some(timeout) = cli.timeout() {
        config = config.with_timeout(timeout);
    }
    Client::new(config)
}

async fn apply(client: &Client, args: ApplyArgs) -> Result<(), snafu::Whatever> {
    let desired = read_manifest(&args.manifest.file)?;
    let certificate = client
        .apply_certificate(&desired, &args.apply_options())
        .await
        .with_whatever_context(|_| format!("failed to apply certificate {:?}", desired.id()))?;
    print_yaml(&certificate)
}

async fn get(client: &Client, args: ManifestArgs) -> Result<(), snafu::Whatever> {
    let request = read_manifest(&args.file)?;
    let certificate = client
        .get_certificate(&request)
        .await
        .with_whatever_context(|_| format!("failed to get certificate {:?}", request.id()))?;
    print_yaml(&certificate)
}

async fn list(client: &Client, args: ListArgs) -> Result<(), snafu::Whatever> {
    let ListArgs { pool, page_size } = args;
    let mut list = client
        .list_certificate_with_max_results(
            &pool.project,
            &pool.location,
            &pool.ca_pool,
            page_size.unwrap_or(CERTIFICATE_MAX_PAGE),
        )
        .await
        .whatever_context("failed to list certificates")?;

    let mut certificates = std::mem::take(&mut list.items);
    while list.has_next() {
        list.next(client)
            .await
            .whatever_context("failed to list next page of certificates")?;
        certificates.append(&mut list.items);
    }
    info!(certificates = certificates.len(), "Listed certificates");
    print_yaml(&certificates)
}

async fn delete(client: &Client, args: ManifestArgs) -> Result<(), snafu::Whatever> {
    let request = read_manifest(&args.file)?;
    client
        .delete_certificate(&request)
        .await
        .with_whatever_context(|_| format!("failed to revoke certificate {:?}", request.id()))
}

async fn delete_all(client: &Client, args: DeleteAllArgs) -> Result<(), snafu::Whatever> {
    client
        .delete_all_certificate(
            &args.pool.project,
            &args.pool.location,
            &args.pool.ca_pool,
            |certificate| args.matches(certificate),
        )
        .await
        .whatever_context("failed to revoke certificates")
}

fn read_manifest(path: &Path) -> Result<Certificate, snafu::Whatever> {
    let contents = fs::read_to_string(path)
        .with_whatever_context(|_| format!("failed to read manifest from {path:?}"))?;
    serde_yaml::from_str(&contents)
        .with_whatever_context(|_| format!("failed to parse manifest {path:?}"))
}

fn print_yaml(value: &impl Serialize) -> Result<(), snafu::Whatever> {
    let value = serde_json::to_value(value).whatever_context("failed to serialize result")?;
    let yaml = serde_yaml::to_string(&prune(value)).whatever_context("failed to render result")?;
    print!("{yaml}");
    Ok(())
}

/// Drops unset fields, which would otherwise show up as `null`, `[]` or `{}`.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, prune(value)))
                .filter(|(_, value)| !is_unset(value))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune).collect()),
        value => value,
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
