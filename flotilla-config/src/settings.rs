//! Settings that control how documents are resolved.

use std::path::Path;

use bon::Builder;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// The file name used when looking for settings files.
pub const FILE_NAME: &str = "flotilla.toml";

/// The environment variable that may point to an additional settings file.
pub const FILE_ENV: &str = "FLOTILLA_CONFIG";

/// The prefix of environment variables that override individual settings
/// (e.g., `FLOTILLA_ENGINE_FAILURE_POLICY`).
pub const ENV_PREFIX: &str = "FLOTILLA_ENGINE";

/// An error related to loading [`Settings`].
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the configuration sources.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// What to do when one entry of a run list fails to resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole batch on the first failure.
    ///
    /// Running part of a batch against a mis-specified environment is
    /// considered more dangerous than running nothing at all.
    #[default]
    AbortBatch,

    /// Record the failing entry and continue with the rest of the run list.
    SkipEntry,
}

/// Settings for the resolution engine.
///
/// When loading, the default sources that are automatically included are:
///
/// * `<CONFIG DIR>/flotilla/flotilla.toml`.
/// * `<CWD>/flotilla.toml`.
/// * If the environment variable is present, the file pointed to by
///   `FLOTILLA_CONFIG`.
/// * Any environment variables prefixed with `FLOTILLA_ENGINE_`.
#[derive(Builder, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[builder(builder_type = Builder)]
pub struct Settings {
    /// The policy applied when a run-list entry fails to resolve.
    #[serde(default)]
    #[builder(default)]
    failure_policy: FailurePolicy,
}

impl Settings {
    /// Gets the failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Replaces the failure policy, keeping every other setting.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Gets a builder with the default file sources preloaded.
    pub fn default_sources() -> ConfigBuilder<DefaultState> {
        let mut builder = config::Config::builder();

        #[cfg(target_os = "macos")]
        {
            if let Some(home) = dirs::home_dir() {
                builder = builder.add_source(
                    File::from(home.join(".config").join("flotilla").join(FILE_NAME))
                        .required(false),
                );
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            if let Some(config_home) = dirs::config_dir() {
                builder = builder.add_source(
                    File::from(config_home.join("flotilla").join(FILE_NAME)).required(false),
                );
            }
        }

        if let Ok(mut path) = std::env::current_dir() {
            path.push(FILE_NAME);
            builder = builder.add_source(File::from(path).required(false));
        }

        if let Ok(settings_file) = std::env::var(FILE_ENV) {
            debug!("loading settings from `{settings_file}`");
            builder = builder.add_source(File::from(Path::new(&settings_file)));
        }

        builder
    }

    /// Loads [`Settings`] from the default set of sources.
    pub fn load() -> Result<Self> {
        Self::extract(Self::default_sources())
    }

    /// Loads [`Settings`] from a set of sources.
    ///
    /// The default set of sources are loaded first (see the docs for
    /// [`Settings`] for the listed default sources). After that, the files
    /// provided in the `paths` argument are added in order. Environment
    /// variables always take precedence.
    pub fn load_with_paths<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        let mut builder = Self::default_sources();

        for path in paths {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        Self::extract(builder)
    }

    /// Adds the environment overrides and deserializes the settings.
    fn extract(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        debug!(?settings, "loaded settings");
        Ok(settings)
    }

    /// Loads settings from a test fixture.
    #[cfg(test)]
    pub fn fixture(path: impl AsRef<Path>) -> Result<Self> {
        use std::path::PathBuf;

        let mut full_path = PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/test/fixtures/settings/",
        ));

        full_path.push(path);

        Ok(config::Config::builder()
            .add_source(File::from(full_path))
            .build()?
            .try_deserialize()?)
    }
}
