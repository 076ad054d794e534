//! Settings – reads/writes `~/.wrt/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use wrt_types::{DEFAULT_ROOT_FRAME, DEFAULT_TOLERANCE};

/// Largest number of fractional digits accepted for matrix output.
const MAX_PRECISION: usize = 15;

/// Persisted user configuration stored in `~/.wrt/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database holding every world.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Name given to the root frame of newly created worlds.
    #[serde(default = "default_root_frame")]
    pub root_frame: String,

    /// Let `Set` create an unknown `Wrt` frame under the root.
    #[serde(default)]
    pub create_missing_reference: bool,

    /// Tolerance for rotation validity and the bottom row of `As` matrices.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Fractional digits printed for `Get` results.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}

fn default_database() -> PathBuf {
    wrt_dir_for_home(&home_dir()).join("worlds.db")
}
fn default_root_frame() -> String {
    DEFAULT_ROOT_FRAME.to_string()
}
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}
fn default_precision() -> usize {
    9
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            root_frame: default_root_frame(),
            create_missing_reference: false,
            tolerance: default_tolerance(),
            precision: default_precision(),
        }
    }
}

fn wrt_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".wrt")
}

/// Return the path to `~/.wrt/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    wrt_dir_for_home(home).join("config.toml")
}

/// Effective configuration: the file if present, defaults otherwise, then
/// `WRT_*` environment overrides.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply `WRT_*` environment variable overrides to `cfg`.  Values that do
/// not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `WRT_DATABASE` | `database` |
/// | `WRT_ROOT_FRAME` | `root_frame` |
/// | `WRT_CREATE_MISSING_REFERENCE` | `create_missing_reference` |
/// | `WRT_TOLERANCE` | `tolerance` |
/// | `WRT_PRECISION` | `precision` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WRT_DATABASE")
        && !v.trim().is_empty() {
            cfg.database = PathBuf::from(v);
        }
    if let Ok(v) = std::env::var("WRT_ROOT_FRAME")
        && !v.trim().is_empty() {
            cfg.root_frame = v.trim().to_string();
        }
    if let Ok(v) = std::env::var("WRT_CREATE_MISSING_REFERENCE")
        && let Some(flag) = parse_flag(&v) {
            cfg.create_missing_reference = flag;
        }
    if let Ok(v) = std::env::var("WRT_TOLERANCE")
        && let Ok(tol) = v.trim().parse::<f64>()
        && tol.is_finite() && tol > 0.0 {
            cfg.tolerance = tol;
        }
    if let Ok(v) = std::env::var("WRT_PRECISION")
        && let Ok(digits) = v.trim().parse::<usize>()
        && digits <= MAX_PRECISION {
            cfg.precision = digits;
        }
}

/// Save the config to disk, creating `~/.wrt/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
