#![warn(missing_docs)]

//! Shared building blocks of hmxkit.
//!
//! This crate holds everything the tensor and matmul crates agree on without depending on each
//! other: the global configuration and its loggers, stride arithmetic and the 4-bit quantization
//! helpers.

/// Global configuration and logging.
pub mod config;

/// Quantization schemes and 4-bit packing.
pub mod quant;

/// Stride helpers.
pub mod stride;
