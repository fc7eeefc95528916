//! ollamactl - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use ollamactl::{
    cli::{self, report, Args, Commands, Verbosity},
    config::Config,
    models::{types::format_size, DaemonApi, OllamaModelClient, ProgressEvent},
    provision::{estimate_model_size, missing_models, normalize_model_name},
    InventoryReporter, ModelProvisioner, RemovePolicy, EXIT_CODE_SETUP_NEEDED,
};
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    cli::logging::init(args.verbosity());

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    if let Some(host) = &args.host {
        config.apply_ollama_host(host)?;
    }
    if let Some(port) = args.port {
        config.daemon.port = port;
    }
    config.validate().context("Invalid configuration")?;

    let client = OllamaModelClient::with_timeouts(
        Some(config.ollama_url()),
        config.request_timeout(),
        config.probe_timeout(),
    )?;

    // Commands that never touch the daemon
    match &args.command {
        Commands::Estimate { name } => return show_estimate(name),
        Commands::Disk { path } => {
            let path = path.clone().unwrap_or_else(|| config.models_dir());
            exit_on_error(show_disk(&path));
            return Ok(());
        }
        Commands::Config => return show_config(&config, args.verbosity()),
        _ => {}
    }

    if !client.is_available().await {
        eprintln!("{} Ollama is not reachable at {}", "✗".red(), client.base_url());
        eprintln!("\nStart Ollama with: ollama serve");
        std::process::exit(EXIT_CODE_SETUP_NEEDED);
    }

    let daemon: Arc<dyn DaemonApi> = Arc::new(client);
    let reporter = InventoryReporter::new(Arc::clone(&daemon))
        .with_timeouts(config.request_timeout(), config.probe_timeout());
    let provisioner = ModelProvisioner::new(Arc::clone(&daemon))
        .with_models_dir(config.models_dir())
        .with_remove_policy(config.remove_policy());

    let outcome = match args.command.clone() {
        Commands::Health => run_health(&reporter).await,
        Commands::List => run_list(&reporter).await,
        Commands::Status => run_status(&reporter, &config).await,
        Commands::Pull { name, retries, no_disk_check } => {
            let mut options = config.pull_options();
            if let Some(retries) = retries {
                options = options.with_max_retries(retries);
            }
            if no_disk_check {
                options = options.without_disk_check();
            }
            run_pull(&provisioner, &name, &options, args.verbosity()).await
        }
        Commands::Rm { name, idempotent } => {
            let provisioner = if idempotent {
                provisioner.with_remove_policy(RemovePolicy::Idempotent)
            } else {
                provisioner
            };
            provisioner.remove_model(&name).await.map(|()| {
                println!("{} Removed {}", "✓".green(), name);
            })
        }
        Commands::Ensure { models } => {
            let required = if models.is_empty() {
                config.provision.required_models.clone()
            } else {
                models
            };
            run_ensure(&provisioner, &required, &config, args.verbosity()).await
        }
        Commands::Estimate { .. } | Commands::Disk { .. } | Commands::Config => Ok(()),
    };

    exit_on_error(outcome);
    Ok(())
}

/// Print a command failure and exit 1
fn exit_on_error(outcome: ollamactl::Result<()>) {
    let Err(e) = outcome else {
        return;
    };

    let mut lines = report::failure_lines(&e).into_iter();
    if let Some(first) = lines.next() {
        eprintln!("{} {}", "Error:".red().bold(), first);
    }
    for line in lines {
        eprintln!("{}", line);
    }
    std::process::exit(1);
}

async fn run_health(reporter: &InventoryReporter) -> ollamactl::Result<()> {
    let info = reporter.check_health(None).await?;

    println!("{} Ollama is running", "✓".green());
    println!("  Version: {}", info.version.as_deref().unwrap_or("unknown"));
    println!("  Models:  {}", info.models.len());
    for model in &info.models {
        println!("    • {}", model);
    }
    Ok(())
}

async fn run_list(reporter: &InventoryReporter) -> ollamactl::Result<()> {
    let models = reporter.list_installed_models().await?;

    if models.is_empty() {
        println!("No models installed.");
        println!("\nPull a model with:");
        println!("  ollamactl pull qwen2.5:7b-instruct");
        return Ok(());
    }

    println!("{:<40} {:>12}  {}", "NAME", "SIZE", "MODIFIED");
    for model in models {
        println!("{:<40} {:>12}  {}", model.name, model.size, model.modified);
    }
    Ok(())
}

async fn run_status(reporter: &InventoryReporter, config: &Config) -> ollamactl::Result<()> {
    let installed: Vec<String> = reporter
        .list_installed_models()
        .await?
        .into_iter()
        .map(|m| m.name)
        .collect();

    let required = &config.provision.required_models;
    let mut known = required.clone();
    known.extend(missing_models(&installed, required));

    let health = reporter.get_model_health(&known).await;
    let installed_keys: HashSet<String> = installed.iter().map(|m| normalize_model_name(m)).collect();

    println!("{:<40} {}", "MODEL", "STATUS");
    println!("{}", "=".repeat(50));
    for name in &known {
        let status = if health.get(name).copied().unwrap_or(false) {
            "healthy".green()
        } else if installed_keys.contains(&normalize_model_name(name)) {
            "unresponsive".yellow()
        } else {
            "missing".red()
        };
        println!("{:<40} {}", name, status);
    }
    Ok(())
}

async fn run_pull(
    provisioner: &ModelProvisioner,
    name: &str,
    options: &ollamactl::PullOptions,
    verbosity: Verbosity,
) -> ollamactl::Result<()> {
    let bar = progress_bar(verbosity);
    bar.set_message(format!("pulling {}", name));

    let mut on_progress = |event: &ProgressEvent| update_bar(&bar, event);
    let result = provisioner
        .pull_model_with_retry(name, Some(&mut on_progress), options)
        .await;

    match &result {
        Ok(()) => bar.finish_with_message(format!("{} {}", "✓".green(), name)),
        Err(_) => bar.abandon(),
    }
    result
}

async fn run_ensure(
    provisioner: &ModelProvisioner,
    required: &[String],
    config: &Config,
    verbosity: Verbosity,
) -> ollamactl::Result<()> {
    let bar = progress_bar(verbosity);

    let mut on_progress = |model: &str, event: &ProgressEvent| {
        bar.set_prefix(model.to_string());
        update_bar(&bar, event);
    };
    let result = provisioner
        .ensure_required_models(required, &config.pull_options(), Some(&mut on_progress))
        .await;
    bar.finish_and_clear();

    let provisioned = result?;
    for name in &provisioned.already_installed {
        println!("{} {} (already installed)", "✓".green(), name);
    }
    for name in &provisioned.pulled {
        println!("{} {} (pulled)", "✓".green(), name);
    }
    Ok(())
}

fn progress_bar(verbosity: Verbosity) -> ProgressBar {
    if !verbosity.show_progress() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{prefix:.bold} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(style);
    bar
}

fn update_bar(bar: &ProgressBar, event: &ProgressEvent) {
    if let Some(status) = event.status() {
        bar.set_message(status.to_string());
    }
    if let Some(total) = event.total() {
        bar.set_length(total);
    }
    bar.set_position(event.completed().unwrap_or(0));
}

fn show_estimate(name: &str) -> Result<()> {
    let bytes = estimate_model_size(name);
    println!("{}: ~{} ({} bytes)", name, format_size(bytes), bytes);
    Ok(())
}

fn show_disk(path: &std::path::Path) -> ollamactl::Result<()> {
    println!("{}", report::disk_summary(path)?);
    Ok(())
}

fn show_config(config: &Config, verbosity: Verbosity) -> Result<()> {
    println!("Daemon:");
    println!("  URL:              {}", config.ollama_url());
    println!("  Request timeout:  {}s", config.daemon.request_timeout_secs);
    println!("  Probe timeout:    {}s", config.daemon.probe_timeout_secs);
    println!();

    println!("Provisioning:");
    println!("  Required models:  {}", config.provision.required_models.join(", "));
    println!("  Max retries:      {}", config.provision.max_retries);
    println!(
        "  Backoff:          {}ms doubling, capped at {}ms",
        config.provision.base_delay_ms, config.provision.max_delay_ms
    );
    println!("  Idempotent rm:    {}", config.provision.idempotent_remove);
    println!("  Disk check:       {}", config.provision.check_disk_space);
    println!("  Models dir:       {}", config.models_dir().display());
    println!();

    println!("Verbosity:          {}", verbosity.as_str());
    Ok(())
}
