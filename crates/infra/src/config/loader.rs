//! Configuration loader
//!
//! Loads the settings file and the environment once at startup. Every
//! failure here is a [`SyncError::Config`] and stops the process before a
//! pass begins.
//!
//! ## Environment Variables
//! - `JIRA_URL`: site URL shared by the Jira and Confluence REST surfaces
//! - `EMAIL`: account used for basic authentication
//! - `API_TOKEN`: API token for that account
//! - `DRY_RUN`: simulate when `true`/`1`/`yes`/`on` (case-insensitive)
//! - `CMDBSYNC_ENV_FILE`: env file to read instead of `.env`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./cmdb-sync.json` or `./cmdb-sync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use cmdbsync_domain::{AppConfig, Credentials, Result, RunMode, SyncError, SyncSettings};
use tracing::{debug, info, warn};

const ENV_FILE_VAR: &str = "CMDBSYNC_ENV_FILE";

/// Explicit locations given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Load the env file, credentials, run mode and settings file.
///
/// # Errors
/// Returns `SyncError::Config` if a credential is missing, the settings file
/// cannot be found or read, its format is invalid, or it fails validation.
pub fn load(options: &LoadOptions) -> Result<AppConfig> {
    load_env_file(options.env_file.as_deref())?;

    let credentials = credentials_from_env()?;
    let mode = run_mode_from_env();
    let settings = load_from_file(options.config_path.clone())?;

    info!(
        mode = %mode,
        project = %settings.jira.project_key,
        max_workers = settings.rate_limit.max_workers,
        "configuration loaded"
    );
    Ok(AppConfig { settings, credentials, mode })
}

/// Read an env file into the process environment.
///
/// Variables already set win. A missing file is not an error; missing
/// variables are reported when they are read.
///
/// # Errors
/// Returns `SyncError::Config` if the file exists but cannot be parsed.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    let explicit = path.map(Path::to_path_buf).or_else(|| std::env::var_os(ENV_FILE_VAR).map(PathBuf::from));

    let result = match &explicit {
        Some(path) => dotenvy::from_path(path).map(|()| path.clone()),
        None => dotenvy::dotenv(),
    };

    match result {
        Ok(path) => {
            debug!(path = %path.display(), "env file loaded");
            Ok(())
        }
        Err(err) if err.not_found() => {
            debug!(path = ?explicit, "no env file");
            Ok(())
        }
        Err(err) => Err(SyncError::Config(format!("Invalid env file: {err}"))),
    }
}

/// Basic-auth credentials from the environment.
///
/// # Errors
/// Returns `SyncError::Config` naming the first missing variable.
pub fn credentials_from_env() -> Result<Credentials> {
    let base_url = env_var("JIRA_URL")?.trim().trim_end_matches('/').to_string();
    let email = env_var("EMAIL")?;
    let api_token = env_var("API_TOKEN")?;
    Ok(Credentials { base_url, email, api_token })
}

/// Simulate when `DRY_RUN` is set to a true value, apply otherwise.
pub fn run_mode_from_env() -> RunMode {
    if env_bool("DRY_RUN", false) {
        RunMode::Simulate
    } else {
        RunMode::Apply
    }
}

/// Load settings from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<SyncSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SyncError::Config(format!("Failed to read config file: {e}")))?;

    let settings = parse_settings(&contents, &config_path)?;
    settings.validate()?;
    if settings.confluence.is_none() {
        warn!("no confluence section; the domain phase cannot run");
    }
    Ok(settings)
}

/// Parse settings from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_settings(contents: &str, path: &Path) -> Result<SyncSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 8] = [
        "config.json",
        "config.toml",
        "cmdb-sync.json",
        "cmdb-sync.toml",
        "../config.json",
        "../config.toml",
        "../../config.json",
        "../../config.toml",
    ];

    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `SyncError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SyncError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}
