//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod output;
pub mod process;
pub mod words;

use std::path::{Path, PathBuf};

use console::style;
use tracing::{debug, warn};

use voucher_core::files::{DocumentKind, extract_images, prepare_for_upload};
use voucher_core::models::config::{ProviderSettings, VoucherConfig, env};
use voucher_core::{FailoverClient, SourceImage};

/// `<config dir>/voucher/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voucher")
        .join("config.json")
}

/// The `-c` file if given, else the default file if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<VoucherConfig> {
    if let Some(path) = config_path {
        return Ok(VoucherConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using config file {}", path.display());
        Ok(VoucherConfig::from_file(&path)?)
    } else {
        Ok(VoucherConfig::default())
    }
}

/// Required provider variables that are unset or empty.
pub fn missing_provider_vars(config: &VoucherConfig) -> Vec<&'static str> {
    let qwen = ProviderSettings::qwen_from_env(&config.providers.qwen);
    let openai = ProviderSettings::openai_from_env(&config.providers.openai);

    let mut missing = Vec::new();
    if qwen.host.is_none() {
        missing.push(env::VLLM_HOST);
    }
    if qwen.model.is_none() {
        missing.push(env::VLLM_MODEL);
    }
    if openai.api_key.is_none() {
        missing.push(env::OPENAI_API_KEY);
    }
    missing
}

/// Whether at least one provider has everything it needs.
pub fn any_provider_ready(missing: &[&str]) -> bool {
    let qwen_ready = !missing.contains(&env::VLLM_HOST) && !missing.contains(&env::VLLM_MODEL);
    let openai_ready = !missing.contains(&env::OPENAI_API_KEY);
    qwen_ready || openai_ready
}

/// Build the failover client, refusing to start with no provider configured.
///
/// An unconfigured provider is still wired in; its calls fail and fall through.
pub fn build_ocr(config: &VoucherConfig) -> anyhow::Result<FailoverClient> {
    let missing = missing_provider_vars(config);
    if !any_provider_ready(&missing) {
        anyhow::bail!(
            "Missing provider configuration: {}.\n\n\
             Set them in the environment or a .env file, then run 'voucher config check'.",
            missing.join(", ")
        );
    }
    if !missing.is_empty() {
        warn!("Running with one provider, unset: {}", missing.join(", "));
    }

    Ok(FailoverClient::from_config(&config.providers)?)
}

/// Extract and optimise every image in `path`.
///
/// Images that fail to decode are skipped with a warning. When `prefix` is
/// set, image names become `<input path>/<image name>`.
pub fn load_document(
    path: &Path,
    config: &VoucherConfig,
    prefix: bool,
) -> anyhow::Result<Vec<SourceImage>> {
    let kind = DocumentKind::from_path(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let data = std::fs::read(path)?;
    let raws = extract_images(&data, kind, file_name, &config.images)?;

    let mut sources = Vec::with_capacity(raws.len());
    for raw in &raws {
        match prepare_for_upload(raw, &config.images) {
            Ok(mut source) => {
                if prefix {
                    source.name = batch_image_name(path, &source.name);
                }
                sources.push(source);
            }
            Err(e) => warn!("Skipping {} in {}: {}", raw.name, file_name, e),
        }
    }

    Ok(sources)
}

/// Batch identity of one image. The whole input path keeps same-named files
/// in different directories apart.
pub fn batch_image_name(path: &Path, image_name: &str) -> String {
    format!("{}/{}", path.display(), image_name)
}

/// Print the failed images of a batch to stderr.
pub fn print_failures<'a>(failures: impl Iterator<Item = &'a voucher_core::OcrOutcome>) {
    let failures: Vec<_> = failures.collect();
    if failures.is_empty() {
        return;
    }

    eprintln!();
    eprintln!("{}", style("Failed images:").red());
    for outcome in failures {
        eprintln!(
            "  - {}: {}",
            outcome.image_name,
            outcome.error().unwrap_or("unknown error")
        );
    }
}
