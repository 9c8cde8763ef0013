//! # gpuip-core
//!
//! Backend-independent descriptors for the gpuip image-processing runtime.
//!
//! - [`BufferType`] - element formats (u8, f16, f32)
//! - [`Buffer`], [`BufferRegistry`] - named logical image buffers
//! - [`Kernel`] - kernel descriptors and the canonical [`Argument`] layout
//! - [`HostBuffer`] - host pixel storage matching a device buffer byte for byte
//!
//! ## Crate Structure
//!
//! ```text
//! gpuip-core (this crate)
//!    ^
//!    |
//!    +-- gpuip-compute (device environments, boilerplate generator)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use gpuip_core::prelude::*;
//!
//! let src = Buffer::new("in", BufferType::F32, 1)?;
//! let dst = Buffer::new("out", BufferType::F16, 4)?;
//!
//! let mut kernel = Kernel::new("tint");
//! kernel
//!     .set_in_buffer("src", &src)
//!     .set_out_buffer("dst", &dst)
//!     .set_param_float("gain", 1.5);
//!
//! let names: Vec<_> = kernel.arguments().iter().map(|a| a.name().to_string()).collect();
//! assert_eq!(names, ["src", "dst", "gain", "width", "height"]);
//! # Ok::<(), gpuip_core::Error>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod format;
pub mod host;
pub mod kernel;

pub use buffer::{Buffer, BufferRegistry};
pub use error::{Error, Result};
pub use format::BufferType;
pub use host::{HostBuffer, HostData};
pub use kernel::{Argument, BufferBinding, Kernel, Param};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::buffer::{Buffer, BufferRegistry};
    pub use crate::error::{Error, Result};
    pub use crate::format::BufferType;
    pub use crate::host::HostBuffer;
    pub use crate::kernel::{Argument, Kernel, Param};
}
