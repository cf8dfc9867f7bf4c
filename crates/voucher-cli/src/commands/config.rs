//! Config command - manage configuration.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use voucher_core::models::config::{ProviderSettings, VoucherConfig, env};

use super::{any_provider_ready, default_config_path, missing_provider_vars};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "batch.concurrency")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },

    /// Show configuration file path
    Path,

    /// Report which provider environment variables are set
    Check,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path),
        ConfigCommand::Check => check_env(&path),
    }
}

fn read_or_default(path: &PathBuf) -> anyhow::Result<VoucherConfig> {
    if path.exists() {
        Ok(VoucherConfig::from_file(path)?)
    } else {
        Ok(VoucherConfig::default())
    }
}

fn show_config(path: &PathBuf) -> anyhow::Result<()> {
    if !path.exists() {
        eprintln!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }

    let config = read_or_default(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, path: PathBuf) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or(path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    VoucherConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(path: &PathBuf, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(read_or_default(path)?)?;

    let mut current = &json;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);

    Ok(())
}

fn set_config(path: &PathBuf, key: &str, value: &str) -> anyhow::Result<()> {
    let config = read_or_default(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let parsed_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut json = serde_json::to_value(&config)?;

    let parts: Vec<&str> = key.split('.').collect();
    let (last, parents) = parts
        .split_last()
        .ok_or_else(|| anyhow::anyhow!("Empty configuration key"))?;

    let mut current = &mut json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    match current.as_object_mut() {
        Some(obj) if obj.contains_key(*last) => {
            obj.insert((*last).to_string(), parsed_value.clone());
        }
        Some(_) => anyhow::bail!("Configuration key not found: {}", key),
        None => anyhow::bail!("Cannot set value at non-object path"),
    }

    let config: VoucherConfig = serde_json::from_value(json)?;
    config.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn show_path(path: &PathBuf) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'voucher config init' to create a configuration file.");
    }

    Ok(())
}

/// Presence of each provider variable. Values are never printed.
fn check_env(path: &PathBuf) -> anyhow::Result<()> {
    let config = read_or_default(path)?;
    let missing = missing_provider_vars(&config);

    println!("Provider environment:");
    for name in env::REQUIRED {
        if missing.contains(&name) {
            println!("  {:<18} {}", name, style("missing").red());
        } else {
            println!("  {:<18} {}", name, style("set").green());
        }
    }

    let qwen = ProviderSettings::qwen_from_env(&config.providers.qwen);
    let openai = ProviderSettings::openai_from_env(&config.providers.openai);
    println!();
    println!("  Qwen timeout:   {}ms", qwen.timeout.as_millis());
    println!("  OpenAI timeout: {}ms", openai.timeout.as_millis());

    println!();
    if missing.is_empty() {
        println!("{} Both providers configured", style("✓").green());
        Ok(())
    } else if any_provider_ready(&missing) {
        println!(
            "{} One provider configured, unset: {}",
            style("!").yellow(),
            missing.join(", ")
        );
        Ok(())
    } else {
        anyhow::bail!("Missing provider configuration: {}", missing.join(", "))
    }
}
