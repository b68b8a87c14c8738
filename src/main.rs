use anyhow::{anyhow, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;

mod cli;
mod components;
mod config;
mod model;
mod operator;
mod remote;
mod services;
mod transcript;
mod workflow;

use cli::Args;
use components::CacheComponentStore;
use model::{Outcome, SiteTarget};
use operator::{Operator, TerminalOperator};
use remote::RemoteConnector;
use transcript::Transcript;
use workflow::{Collaborators, Request};

fn main() -> Result<()> {
    let args = Args::parse();
    let log_file = match &args.log_file {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };
    let (transcript, _guard) = Transcript::start(&log_file)?;
    init_tracing(&transcript);

    let result = run(&args, &transcript);
    match &result {
        Ok(Outcome::Applied(assignment)) => tracing::info!(
            site_url = %assignment.site_url,
            label_id = %assignment.label_id,
            verified = assignment.verified,
            "run completed"
        ),
        Ok(Outcome::Aborted(reason)) => {
            tracing::info!(reason = %reason, "run stopped");
        }
        // `main` prints the error to stderr; the transcript gets it once here.
        Err(err) => transcript.record(&format!("ERROR: {err:#}")),
    }
    result.map(|_| ())
}

fn run(args: &Args, transcript: &Transcript) -> Result<Outcome> {
    for (label, value) in [
        ("--user-principal-name", &args.user_principal_name),
        ("--tenant-name", &args.tenant_name),
        ("--spo-site-name", &args.spo_site_name),
    ] {
        if value.trim().is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }

    let config = config::resolve_config(args.config.as_deref())?;
    let request = Request {
        user_principal_name: args.user_principal_name.trim().to_string(),
        target: SiteTarget::with_domain(
            &args.tenant_name,
            &args.spo_site_name,
            &config.sharepoint_domain,
        ),
        disable_name_checking: args.disable_name_checking,
        verify_assignment: args.verify_assignment || config.verify_assignment,
    };

    let mut components = CacheComponentStore::in_user_cache(config.clone());
    tracing::debug!(dir = %components.root().display(), "component cache");
    let mut connector = RemoteConnector::new(&config);
    let stdin = io::stdin();
    let mut operator = TerminalOperator::new(stdin.lock(), io::stdout(), Some(transcript.clone()));
    operator.notify(&format!("Transcript: {}", transcript.path().display()));

    workflow::run(
        &request,
        Collaborators {
            components: &mut components,
            connector: &mut connector,
            operator: &mut operator,
        },
    )
}

/// `<local data dir>/spolabel/logs/spolabel.log`
fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot determine home directory; pass --log-file"))?;
    Ok(data_dir.join("spolabel").join("logs").join("spolabel.log"))
}

/// Console gets `RUST_LOG` (default `warn`); the transcript gets this crate's info events.
fn init_tracing(transcript: &Transcript) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let sink = transcript.clone();
    let file = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(move || sink.writer())
        .with_filter(EnvFilter::new("spolabel=info"));

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
