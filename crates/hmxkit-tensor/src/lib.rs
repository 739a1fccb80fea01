#![warn(missing_docs)]

//! Tensor descriptors for hmxkit.
//!
//! A [TensorDescriptor] is a non-owning view over a caller buffer: shape, strides, dtype, layout
//! tag and quantization. This crate validates descriptors, checks multiply compatibility and
//! provides typed strided access to their elements.

mod check;
mod descriptor;
mod dtype;
mod element;
mod error;
mod layout;
mod validate;
mod view;

pub use check::*;
pub use descriptor::*;
pub use dtype::*;
pub use element::*;
pub use error::*;
pub use layout::*;
pub use validate::*;
pub use view::*;

pub use half::f16;
pub use hmxkit_common::quant::QuantScheme;
