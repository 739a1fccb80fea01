use super::logger::{LogLevel, LoggerConfig};

/// Default scratchpad size in bytes, a multiple of the activation slot alignment.
pub const DEFAULT_SCRATCHPAD_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for matrix multiplications.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MatmulConfig {
    /// Logger for pipeline selection, staging costs and tile counts.
    #[serde(default)]
    pub logger: LoggerConfig<MatmulLogLevel>,

    /// Size in bytes of the scratchpad allocated by callers that don't bring their own.
    #[serde(default = "scratchpad_size_default")]
    pub scratchpad_size: usize,
}

impl Default for MatmulConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            scratchpad_size: DEFAULT_SCRATCHPAD_SIZE,
        }
    }
}

fn scratchpad_size_default() -> usize {
    DEFAULT_SCRATCHPAD_SIZE
}

/// Verbosity of the matmul logger.
#[derive(Default, Clone, Copy, Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum MatmulLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
    /// Selected pipeline and weight staging cost, once per call.
    #[serde(rename = "basic")]
    Basic,
    /// Also logs the scratchpad plan and tile counts.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for MatmulLogLevel {
    fn is_disabled(&self) -> bool {
        matches!(self, MatmulLogLevel::Disabled)
    }
}
