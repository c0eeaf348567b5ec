//! difftide - CLI entry point.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use git2::Repository;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use difftide::config::Settings;
use difftide::error::{DifftideError, Result};
use difftide::generation::{generate_commit_message, GenerationOptions};
use difftide::git::collect_diff;
use difftide::{provider, registry};

/// Generate a conventional commit message from the current git diff.
#[derive(Parser, Debug)]
#[command(name = "difftide")]
#[command(about = "Generate a conventional commit message from the current git diff")]
#[command(version)]
struct Cli {
    /// Provider id to use (defaults to the configured default provider)
    #[arg(long)]
    provider: Option<String>,

    /// Model id to use (defaults to the provider's default model)
    #[arg(long)]
    model: Option<String>,

    /// Language tag for the commit message (e.g. en, zh-CN)
    #[arg(long)]
    language: Option<String>,

    /// Path to the config file (defaults to the per-user config path)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only consider staged changes
    #[arg(long)]
    staged_only: bool,

    /// List configured providers and exit
    #[arg(long)]
    list_providers: bool,

    /// Fetch and list the models a provider offers, then exit
    #[arg(long, value_name = "PROVIDER_ID")]
    list_models: Option<String>,

    /// Path to the git repository
    #[arg(default_value = ".")]
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => {}
        Err(DifftideError::Cancelled) => {
            eprintln!("cancelled");
            std::process::exit(130);
        }
        Err(e) => {
            eprintln!("error: {e}");
            if !e.is_configuration() {
                eprintln!("run with RUST_LOG=difftide=debug for more detail");
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(language) = cli.language.clone() {
        settings.language = Some(language);
    }

    if cli.list_providers {
        return list_providers(&settings);
    }
    if let Some(provider_id) = cli.list_models.as_deref() {
        return list_models(&settings, provider_id).await;
    }

    let repo = Repository::discover(&cli.path)?;
    let diff = collect_diff(&repo)?;

    let effective = if cli.staged_only {
        if diff.staged.is_empty() {
            Err(DifftideError::NoChanges)
        } else {
            Ok(diff.staged.as_str())
        }
    } else {
        diff.require_effective()
    };

    let diff_text = match effective {
        Ok(d) => d,
        Err(DifftideError::NoChanges) => {
            println!("No changes detected.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let options = GenerationOptions {
        provider_id: cli.provider.clone(),
        model_id: cli.model.clone(),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let root = repo
        .workdir()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| cli.path.clone());

    let mut stdout = std::io::stdout();
    let message = generate_commit_message(
        &settings,
        &[root],
        diff_text,
        &options,
        |chunk| {
            let _ = stdout.write_all(chunk.as_bytes());
            let _ = stdout.flush();
        },
        &cancel,
    )
    .await?;

    println!();
    tracing::info!(len = message.len(), "commit message generated");
    Ok(())
}

fn list_providers(settings: &Settings) -> Result<()> {
    let providers = registry::list_providers(settings);
    if providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    let default_id = registry::default_provider(settings).map(|p| p.id);
    for p in providers {
        let marker = if default_id.as_deref() == Some(p.id.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!(
            "{}  {}  [{}]  {} model(s){marker}",
            p.id,
            p.name,
            p.kind,
            p.models.len()
        );
    }
    Ok(())
}

async fn list_models(settings: &Settings, provider_id: &str) -> Result<()> {
    let provider = registry::find_provider(settings, provider_id).ok_or_else(|| {
        DifftideError::Configuration(format!("no provider with id '{provider_id}'"))
    })?;

    let models = provider::fetch_models(&provider).await?;
    if models.is_empty() {
        println!("No models reported by {}.", provider.name);
        return Ok(());
    }

    for m in &models {
        match &m.group {
            Some(group) => println!("{}  {}  ({group})", m.id, m.label()),
            None => println!("{}  {}", m.id, m.label()),
        }
    }
    Ok(())
}
