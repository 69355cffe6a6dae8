use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Prefix for environment overrides, e.g. `VENUE_ARB_SCANNER__MAX_BUDGET=500`.
pub const ENV_PREFIX: &str = "VENUE_ARB_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the layered figment: defaults, then the TOML file, then an
    /// optional profile file next to it, then environment variables.
    #[must_use]
    pub fn figment(path: &Path, profile: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path));

        if let Some(profile) = profile {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Config");
            let profile_file = path.with_file_name(format!("{stem}.{profile}.toml"));
            figment = figment.merge(Toml::file(profile_file));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if the resulting configuration fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
        Self::load_with_profile(path, None)
    }

    /// Loads the configuration with a profile overlay (e.g. `Config.dev.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed, or
    /// if the resulting configuration fails validation.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: Option<&str>) -> Result<AppConfig> {
        let path = path.as_ref();
        let config: AppConfig = Self::figment(path, profile)
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        Ok(config)
    }
}
