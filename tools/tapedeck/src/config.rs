use crate::errors::TapedeckError;
use crate::logging::{JsonlLogger, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::runtime::FileSystem;
use crate::types::DispatchMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_STORE_ROOT: &str = "tests/fixtures/http";

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub mode: Option<DispatchMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub path: Option<PathBuf>,
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                root: PathBuf::from(DEFAULT_STORE_ROOT),
            },
            dispatch: DispatchConfig {
                mode: DispatchMode::Replay,
            },
            logging: LoggingConfig {
                path: None,
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            },
        }
    }
}

impl AppConfig {
    pub fn logger(&self) -> Option<JsonlLogger> {
        self.logging.path.as_ref().map(|path| {
            let mut logger = JsonlLogger::new(path);
            logger.max_payload_bytes = self.logging.max_payload_bytes;
            logger
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    store: Option<PartialStoreConfig>,
    dispatch: Option<PartialDispatchConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialStoreConfig {
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialDispatchConfig {
    mode: Option<DispatchMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
}

/// Builds the effective config: defaults, then the TOML file named by
/// `--config`, then CLI overrides. Relative paths resolve against
/// `process_cwd`.
pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<AppConfig, TapedeckError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| TapedeckError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;

    cfg.store.root = absolutize_path(process_cwd, &cfg.store.root);
    cfg.logging.path = cfg
        .logging
        .path
        .as_deref()
        .map(|path| absolutize_path(process_cwd, path));
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(store) = partial.store {
        if let Some(root) = store.root {
            cfg.store.root = root;
        }
    }

    if let Some(dispatch) = partial.dispatch {
        if let Some(mode) = dispatch.mode {
            cfg.dispatch.mode = mode;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(path) = logging.path {
            cfg.logging.path = Some(path);
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(root) = &overrides.root {
        cfg.store.root = root.clone();
    }
    if let Some(mode) = overrides.mode {
        cfg.dispatch.mode = mode;
    }
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), TapedeckError> {
    if cfg.store.root.as_os_str().is_empty() {
        return Err(TapedeckError::InvalidConfig(
            "store.root must not be empty".to_string(),
        ));
    }

    if cfg.logging.max_payload_bytes == 0 {
        return Err(TapedeckError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
