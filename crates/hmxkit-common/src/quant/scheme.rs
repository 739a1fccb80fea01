use serde::{Deserialize, Serialize};

/// Describes the quantization scheme of a weight tensor.
///
/// Only weights may be quantized. Quantized values are stored with the integer dtype of the same
/// bit width, the scheme tells how to interpret them. Scales and zero points are carried by the
/// caller, the engine only checks the storage.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuantScheme {
    /// The logical data type of quantized values.
    pub value: QuantValue,
    /// How quantized values are stored.
    pub store: QuantStore,
    /// Granularity level of quantization.
    pub level: QuantLevel,
}

impl Default for QuantScheme {
    fn default() -> Self {
        Self {
            value: QuantValue::QInt8,
            store: QuantStore::Native,
            level: QuantLevel::Tensor,
        }
    }
}

impl QuantScheme {
    /// Set the quantization level.
    pub fn with_level(mut self, level: QuantLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the data type used for quantized values.
    pub fn with_value(mut self, value: QuantValue) -> Self {
        self.value = value;
        self
    }

    /// Set how quantized values are stored.
    pub fn with_store(mut self, store: QuantStore) -> Self {
        self.store = store;
        self
    }

    /// Size of the storage unit in bits.
    pub fn size_bits_stored(&self) -> usize {
        match self.store {
            QuantStore::Native => self.value.size_bits(),
            QuantStore::PackedU8 => 8,
        }
    }

    /// Whether values of this scheme can live in a byte buffer of `dtype_bits`-wide integers.
    ///
    /// The value must have the dtype's width and the storage unit must be a whole byte, so 4-bit
    /// values are only accepted packed.
    pub fn is_stored_as(&self, dtype_bits: usize) -> bool {
        self.value.size_bits() == dtype_bits && self.size_bits_stored() == 8
    }
}

/// Level or granularity of quantization.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuantLevel {
    /// A single scale for the whole tensor.
    Tensor,
    /// One scale per row of the stored weights (per output channel).
    Channel,
    /// One scale per block of the given length along the inner dimension.
    Block(usize),
}

/// Data type used to represent quantized values.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuantValue {
    /// 8-bit signed integer.
    QInt8,
    /// 4-bit signed integer.
    QInt4,
}

impl QuantValue {
    /// Returns the size of the quantized type in bits.
    pub fn size_bits(&self) -> usize {
        match self {
            QuantValue::QInt8 => 8,
            QuantValue::QInt4 => 4,
        }
    }
}

/// Data type used to store quantized values.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuantStore {
    /// One value per storage element of the matching dtype.
    Native,
    /// Sub-byte values packed into bytes, low nibble first.
    PackedU8,
}
