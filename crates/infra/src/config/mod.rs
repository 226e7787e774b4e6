//! Configuration loading
//!
//! This module loads the settings file, the env file and the credentials
//! taken from the environment.

pub mod loader;

// Re-export commonly used items
pub use loader::{
    credentials_from_env, load, load_env_file, load_from_file, probe_config_paths,
    run_mode_from_env, LoadOptions,
};
