//! Error types for gpuip-core descriptors and host storage.
//!
//! The [`Error`] enum covers failures that can be detected without a device:
//! - Descriptor validation (channel counts, unknown buffer references)
//! - Host buffer sizing (a host region must match the device buffer exactly)
//! - Parsing of element type names
//!
//! Device-side failures live in `gpuip-compute`, which wraps this enum.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by descriptor and host-buffer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A buffer was declared with zero channels.
    #[error("buffer '{name}' has invalid channel count {channels}")]
    InvalidChannels {
        /// Buffer name
        name: String,
        /// Requested channel count
        channels: u32,
    },

    /// A kernel refers to a buffer name that is not registered.
    #[error("kernel '{kernel}' references unknown buffer '{buffer}'")]
    UnknownBuffer {
        /// Kernel name
        kernel: String,
        /// Missing buffer name
        buffer: String,
    },

    /// Host data does not match the byte size of the device buffer.
    ///
    /// Transfers always move the full buffer, so the host side must be
    /// sized `channels * element_size * width * height`.
    #[error("size mismatch for buffer '{name}': expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Buffer name
        name: String,
        /// Expected byte count
        expected: usize,
        /// Provided byte count
        actual: usize,
    },

    /// Host data was viewed as an element type it does not hold.
    #[error("type mismatch: buffer holds {expected}, requested {requested}")]
    TypeMismatch {
        /// Stored element type
        expected: crate::BufferType,
        /// Requested element type
        requested: crate::BufferType,
    },

    /// Element type name could not be parsed.
    #[error("unsupported buffer format: {format}")]
    UnsupportedFormat {
        /// Format name as given
        format: String,
    },
}

impl Error {
    /// Creates an [`Error::InvalidChannels`] error.
    #[inline]
    pub fn invalid_channels(name: impl Into<String>, channels: u32) -> Self {
        Self::InvalidChannels {
            name: name.into(),
            channels,
        }
    }

    /// Creates an [`Error::UnknownBuffer`] error.
    #[inline]
    pub fn unknown_buffer(kernel: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self::UnknownBuffer {
            kernel: kernel.into(),
            buffer: buffer.into(),
        }
    }

    /// Creates an [`Error::SizeMismatch`] error.
    #[inline]
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Creates an [`Error::UnsupportedFormat`] error.
    #[inline]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Returns `true` if this is a sizing error.
    #[inline]
    pub fn is_size_error(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. })
    }
}
