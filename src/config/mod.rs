//! Configuration: types, default locations, XML loading and validation.
//! Precedence is defaults < config.xml < CLI flags (applied by the binary).

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{create_template_config, load_config_from_xml_path, load_or_init, LoadResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PHOTO_SORT_CONFIG";
/// exiftool executable used when nothing else is configured.
pub const EXIFTOOL_DEFAULT: &str = "exiftool";
/// Default per-read metadata timeout.
pub const READ_TIMEOUT_DEFAULT: std::time::Duration = std::time::Duration::from_secs(30);
/// Upper bound for the default worker count.
pub const MAX_DEFAULT_JOBS: usize = 4;
