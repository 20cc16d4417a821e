//! Resolve the run configuration from file, defaults and flags.

use std::path::PathBuf;

use tracing::debug;

use imgclass_core::models::config::{BackendConfig, ClassifyConfig};

use crate::Cli;

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imgclass")
        .join("config.json")
}

/// Load the configuration and apply command-line overrides.
pub fn load(cli: &Cli) -> anyhow::Result<ClassifyConfig> {
    let mut config = match &cli.config {
        Some(path) => ClassifyConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Using config from {}", path.display());
                ClassifyConfig::from_file(&path)?
            } else {
                ClassifyConfig::default()
            }
        }
    };

    if let Some(class_count) = cli.class_count {
        config.model.class_count = class_count;
    }
    if let Some(model) = &cli.model {
        config.model.backend = BackendConfig::Onnx {
            path: model.clone(),
            input: Default::default(),
        };
    }
    if cli.continue_on_error {
        config.batch.continue_on_error = true;
    }
    if cli.require_accelerator {
        config.device.require_accelerator = true;
    }
    if cli.ignore_case {
        config.batch.case_sensitive = false;
    }

    Ok(config)
}
