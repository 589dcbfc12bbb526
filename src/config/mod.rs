//! Project configuration
//!
//! Layered configuration for a mapt project:
//! 1. Built-in defaults
//! 2. Host/user config (~/.config/mapt/config.toml)
//! 3. Project config (<project>/mapt.toml)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod project;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{overlay, stack_layers};
pub use project::{host_config_path, EngineSettings, Project, ProjectConfig, PROJECT_CONFIG_FILE};
