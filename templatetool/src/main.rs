use std::{fs::File, io::stdout, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use der::asn1::ObjectIdentifier;
use tracing_subscriber::EnvFilter;
use windows_cert_template::{CertificateTemplate, Identity, MemoryStore, Sid, TemplateStore};

fn main() -> Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Dump(args) => dump(args),
        Commands::Check(args) => check(args),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log decoding details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump the given template (or every template) as JSON.
    Dump(DumpArgs),
    /// Check whether an identity may enroll for a template.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// The template store (JSON, template name -> registry values)
    store: PathBuf,

    /// The template's name or OID; dumps every template if omitted
    template: Option<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// The template store (JSON, template name -> registry values)
    store: PathBuf,

    /// The template's name or OID
    template: String,

    /// The identity's user SID
    #[arg(short, long, value_name = "SID")]
    user: Sid,

    /// A group SID the user is a member of
    #[arg(short, long = "group", value_name = "SID")]
    groups: Vec<Sid>,

    /// Ignore group memberships
    #[arg(long)]
    explicit: bool,
}

fn load_store(input: PathBuf) -> Result<MemoryStore> {
    let file = File::open(&input).with_context(|| format!("failed to open {}", input.display()))?;

    serde_json::from_reader(file).context("failed to parse template store")
}

fn load_template(store: &MemoryStore, template: &str) -> Result<CertificateTemplate> {
    // Template names never look like OIDs, so try that first.
    let found = match template.parse::<ObjectIdentifier>() {
        Ok(oid) => CertificateTemplate::lookup_by_oid(store, &oid),
        Err(_) => CertificateTemplate::lookup(store, template),
    };

    found
        .with_context(|| format!("failed to decode template {template}"))?
        .ok_or_else(|| anyhow!("no such template: {template}"))
}

fn dump(args: DumpArgs) -> Result<()> {
    let store = load_store(args.store)?;

    let templates = match args.template {
        Some(template) => vec![load_template(&store, &template)?],
        None => store
            .template_names()
            .iter()
            .map(|name| load_template(&store, name))
            .collect::<Result<Vec<_>>>()?,
    };

    serde_json::to_writer(stdout(), &templates)?;

    Ok(())
}

fn check(args: CheckArgs) -> Result<()> {
    let store = load_store(args.store)?;
    let template = load_template(&store, &args.template)?;

    let identity = Identity::with_groups(args.user, args.groups);
    let allowed = template.allows_enrollment(&identity, args.explicit);

    println!(
        "{}: {} {} enroll for {}",
        if allowed { "allowed" } else { "denied" },
        identity.user,
        if allowed { "may" } else { "may not" },
        template.name()
    );

    Ok(())
}
