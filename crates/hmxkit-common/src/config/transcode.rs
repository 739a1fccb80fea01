use super::logger::{BinaryLogLevel, LoggerConfig};

/// Configuration for whole-matrix layout conversions.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TranscodeConfig {
    /// Logger reporting every whole-matrix conversion with its size.
    #[serde(default)]
    pub logger: LoggerConfig<BinaryLogLevel>,
}
