//! Buffer element formats.
//!
//! [`BufferType`] is the closed set of element types a gpuip buffer can hold.
//! Every channel of every pixel is stored as one element of this type, so the
//! device size of a buffer is
//! `channels * element_size * width * height` bytes.
//!
//! ```rust
//! use gpuip_core::format::BufferType;
//!
//! assert_eq!(BufferType::F16.element_size(), 2);
//! assert_eq!(BufferType::F32.byte_size(4, 1920, 1080), 4 * 4 * 1920 * 1080);
//! ```

/// Element type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit half-precision float.
    ///
    /// Stored packed on the device and converted to `float` inside kernels.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
}

impl BufferType {
    /// All supported element types.
    pub const ALL: [BufferType; 3] = [Self::U8, Self::F16, Self::F32];

    /// Number of bytes per channel element.
    #[inline]
    pub const fn element_size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::F16 => 2,
            Self::F32 => 4,
        }
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Whether this is the packed half-precision format.
    #[inline]
    pub const fn is_half(&self) -> bool {
        matches!(self, Self::F16)
    }

    /// Total bytes for an image of this type.
    #[inline]
    pub const fn byte_size(&self, channels: u32, width: u32, height: u32) -> usize {
        (channels as usize) * self.element_size() * (width as usize) * (height as usize)
    }

    /// Short name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::F16 => "f16",
            Self::F32 => "f32",
        }
    }
}

impl std::fmt::Display for BufferType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BufferType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uchar" | "unsigned_byte" => Ok(Self::U8),
            "f16" | "half" => Ok(Self::F16),
            "f32" | "float" => Ok(Self::F32),
            _ => Err(crate::Error::unsupported_format(s)),
        }
    }
}
