use super::{matmul::MatmulConfig, transcode::TranscodeConfig};
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static HMXKIT_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Represents the global configuration for hmxkit, combining matmul and transcoding settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for matrix multiplications.
    #[serde(default)]
    pub matmul: MatmulConfig,

    /// Configuration for layout transcoding.
    #[serde(default)]
    pub transcode: TranscodeConfig,
}

/// Error returned when loading a configuration file fails.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// The file could not be read.
    #[error("Can't read the config file\nCaused by:\n  {0}")]
    Io(#[from] std::io::Error),
    /// The file content is not a valid configuration.
    #[error("Invalid config file format\nCaused by:\n  {0}")]
    Format(#[from] toml::de::Error),
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `hmxkit.toml` or `HmxKit.toml` in
    /// the current directory or its parents, then applies the environment overrides. If no file is
    /// found, a default configuration is used.
    ///
    /// # Notes
    ///
    /// Calling this function takes a global lock. Read the values you need once per call, not once
    /// per tile.
    pub fn get() -> Arc<Self> {
        let mut state = HMXKIT_GLOBAL_CONFIG.lock();

        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                let config = Arc::new(Self::from_current_dir().override_from_env());
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = HMXKIT_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Overrides configuration fields based on environment variables.
    ///
    /// - `HMXKIT_DEBUG_LOG`: `stdout`, `stderr`, `1`/`true` (log to `/tmp/hmxkit.log`),
    ///   `0`/`false` (disable) or a file path. Enables full logging everywhere.
    /// - `HMXKIT_MATMUL_LOG`: `disabled`, `basic` or `full`.
    /// - `HMXKIT_SCRATCHPAD_SIZE`: default scratchpad size in bytes.
    pub fn override_from_env(mut self) -> Self {
        use super::{BinaryLogLevel, matmul::MatmulLogLevel};

        if let Ok(val) = std::env::var("HMXKIT_DEBUG_LOG") {
            self.matmul.logger.level = MatmulLogLevel::Full;
            self.transcode.logger.level = BinaryLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.matmul.logger.stdout = true;
                    self.transcode.logger.stdout = true;
                }
                "stderr" => {
                    self.matmul.logger.stderr = true;
                    self.transcode.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/hmxkit.log";
                    self.matmul.logger.file = Some(file_path.into());
                    self.transcode.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.matmul.logger.level = MatmulLogLevel::Disabled;
                    self.transcode.logger.level = BinaryLogLevel::Disabled;
                }
                file_path => {
                    self.matmul.logger.file = Some(file_path.into());
                    self.transcode.logger.file = Some(file_path.into());
                }
            }
        }

        if let Ok(val) = std::env::var("HMXKIT_MATMUL_LOG") {
            match val.as_str() {
                "disabled" | "0" => self.matmul.logger.level = MatmulLogLevel::Disabled,
                "basic" | "1" => self.matmul.logger.level = MatmulLogLevel::Basic,
                "full" | "2" => self.matmul.logger.level = MatmulLogLevel::Full,
                _ => {}
            }
        }

        if let Ok(val) = std::env::var("HMXKIT_SCRATCHPAD_SIZE") {
            match val.parse::<usize>() {
                Ok(size) => self.matmul.scratchpad_size = size,
                Err(_) => log::warn!("Ignoring invalid HMXKIT_SCRATCHPAD_SIZE value {val:?}"),
            }
        }

        self
    }

    // Traverses up the directory tree until a valid configuration file is found or the root is
    // reached.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["hmxkit.toml", "HmxKit.toml"] {
                match Self::from_file_path(dir.join(name)) {
                    Ok(config) => return config,
                    Err(ConfigLoadError::Io(_)) => {}
                    Err(err) => {
                        log::warn!("Skipping {}: {err}", dir.join(name).display());
                    }
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    /// Loads a configuration from the given file path.
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from its toml representation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(content)?)
    }
}
