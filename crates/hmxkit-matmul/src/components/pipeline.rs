use crate::components::MatmulError;
use hmxkit_tensor::DType;

/// Numeric pipeline selected from the operand dtypes.
///
/// The variant names read `left`, `right`, `result`. Float pipelines all run [F16Precision]
/// (f32 activations are narrowed when staged, f32 results are widened when written back).
///
/// [F16Precision]: crate::components::F16Precision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pipeline {
    /// f16 x f16 -> f16.
    F16F16F16,
    /// f32 x f16 -> f32.
    F32F16F32,
    /// f16 x f16 -> f32.
    F16F16F32,
    /// f32 x f16 -> f16.
    F32F16F16,
    /// u8 x i8 -> i32.
    U8I8I32,
    /// u8 x i4 -> i32.
    U8I4I32,
}

impl Pipeline {
    /// Select the pipeline handling the given operand dtypes.
    pub fn select(left: DType, right: DType, result: DType) -> Result<Self, MatmulError> {
        let pipeline = match (left, right, result) {
            (DType::F16, DType::F16, DType::F16) => Pipeline::F16F16F16,
            (DType::F32, DType::F16, DType::F32) => Pipeline::F32F16F32,
            (DType::F16, DType::F16, DType::F32) => Pipeline::F16F16F32,
            (DType::F32, DType::F16, DType::F16) => Pipeline::F32F16F16,
            (DType::U8, DType::I8, DType::I32) => Pipeline::U8I8I32,
            (DType::U8, DType::I4, DType::I32) => Pipeline::U8I4I32,
            _ => {
                return Err(MatmulError::unsupported(format!(
                    "no pipeline for {left:?} x {right:?} -> {result:?}"
                )));
            }
        };

        Ok(pipeline)
    }
}

impl core::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Pipeline::F16F16F16 => "f16 x f16 -> f16",
            Pipeline::F32F16F32 => "f32 x f16 -> f32",
            Pipeline::F16F16F32 => "f16 x f16 -> f32",
            Pipeline::F32F16F16 => "f32 x f16 -> f16",
            Pipeline::U8I8I32 => "u8 x i8 -> i32",
            Pipeline::U8I4I32 => "u8 x i4 -> i32",
        };
        f.write_str(name)
    }
}
