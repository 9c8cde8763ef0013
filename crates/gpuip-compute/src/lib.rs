//! Kernel runtime for gpuip image processing.
//!
//! Registers named buffers and kernels, compiles kernel sources for a device,
//! binds arguments in a fixed order and dispatches one work item per pixel.
//!
//! # Architecture
//!
//! ```text
//! Environment<D: ComputeDevice>
//!     +-- BufferRegistry / Vec<Kernel>   (gpuip-core descriptors)
//!     +-- device memory by buffer name   (allocate)
//!     +-- compiled kernels by index      (build)
//!     +-- boilerplate::generate          (pure source generator)
//!             |
//!             +-- OpenClDevice (feature `opencl`)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gpuip_compute::{OpenClEnvironment, CopyOperation};
//! use gpuip_core::BufferType;
//!
//! let mut env = OpenClEnvironment::new()?;
//! let src = env.create_buffer("in", BufferType::F32, 1)?.clone();
//! let dst = env.create_buffer("out", BufferType::F32, 1)?.clone();
//! env.create_kernel("copy").set_in_buffer("src", &src).set_out_buffer("dst", &dst);
//! env.set_dimensions(1920, 1080);
//!
//! let code = env.boilerplate_code("copy")?.replace("dst[idx] = 0;", "dst[idx] = src[idx];");
//! env.kernel_mut("copy").unwrap().set_code(code);
//!
//! env.allocate()?;
//! env.build()?;
//! env.write_buffer("in", &input)?;
//! let timing = env.process()?;
//! env.read_buffer("out", &mut output)?;
//! ```

pub mod backend;
pub mod boilerplate;
pub mod config;
pub mod environment;

pub use backend::{
    can_create_environment, describe_backends, detect_backends, Backend, BackendInfo,
    ComputeDevice, KernelArg, Stage, Status,
};
pub use config::{DeviceType, EnvironmentConfig};
pub use environment::{CopyOperation, Environment, KernelTiming, ProcessTiming};

#[cfg(feature = "opencl")]
pub use backend::OpenClDevice;

/// Environment driving an OpenCL device.
#[cfg(feature = "opencl")]
pub type OpenClEnvironment = Environment<OpenClDevice>;

use thiserror::Error;

/// Compute errors.
///
/// Device status codes are translated into `message` fields once, when a
/// device call fails; the variant records which object and stage failed.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("Failed to create environment: {message}")]
    EnvironmentInit { message: String },

    #[error("Failed to allocate buffer '{buffer}': {message}")]
    Allocation { buffer: String, message: String },

    #[error("Failed to release {resource}: {message}")]
    Release { resource: String, message: String },

    #[error("Failed to build kernel '{kernel}': {message}\n{log}")]
    Build {
        kernel: String,
        message: String,
        /// Compiler output; empty when the program could not be created.
        log: String,
    },

    #[error("Failed to create kernel '{kernel}': {message}")]
    KernelCreation { kernel: String, message: String },

    #[error("Failed to set argument {index} ('{argument}') of kernel '{kernel}': {message}")]
    ArgumentBinding {
        kernel: String,
        index: u32,
        argument: String,
        message: String,
    },

    #[error("Failed to enqueue kernel '{kernel}': {message}")]
    Dispatch { kernel: String, message: String },

    #[error("Failed to {direction} buffer '{buffer}': {message}")]
    Copy {
        buffer: String,
        direction: CopyOperation,
        message: String,
    },

    #[error("Failed to wait for device: {message}")]
    Finish { message: String },

    #[error("Unknown buffer '{0}'")]
    UnknownBuffer(String),

    #[error("Unknown kernel '{0}'")]
    UnknownKernel(String),

    #[error("Buffer '{0}' has no device memory, call allocate first")]
    NotAllocated(String),

    #[error(
        "Buffer '{buffer}' was allocated with {allocated} bytes but now needs {expected}, \
         call allocate again"
    )]
    StaleAllocation {
        buffer: String,
        allocated: usize,
        expected: usize,
    },

    #[error("Kernels are not built ({built} of {registered}), call build first")]
    NotBuilt { built: usize, registered: usize },

    #[error("Buffer '{buffer}' has {channels} channels: {reason}")]
    UnsupportedChannels {
        buffer: String,
        channels: u32,
        reason: &'static str,
    },

    #[error(transparent)]
    Core(#[from] gpuip_core::Error),
}

impl ComputeError {
    /// Kernel the error is attributed to, if any.
    pub fn kernel(&self) -> Option<&str> {
        match self {
            Self::Build { kernel, .. }
            | Self::KernelCreation { kernel, .. }
            | Self::ArgumentBinding { kernel, .. }
            | Self::Dispatch { kernel, .. } => Some(kernel),
            Self::UnknownKernel(kernel) => Some(kernel),
            _ => None,
        }
    }

    /// Returns `true` for failures of a build step.
    pub fn is_build_error(&self) -> bool {
        matches!(self, Self::Build { .. } | Self::KernelCreation { .. })
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_attribution() {
        let err = ComputeError::Dispatch {
            kernel: "blur".into(),
            message: "enqueue: CL_OUT_OF_RESOURCES (-5)".into(),
        };
        assert_eq!(err.kernel(), Some("blur"));
        assert!(!err.is_build_error());

        let err = ComputeError::StaleAllocation {
            buffer: "out".into(),
            allocated: 32,
            expected: 128,
        };
        assert_eq!(err.kernel(), None);
        let msg = err.to_string();
        assert!(msg.contains("32 bytes"));
        assert!(msg.contains("call allocate again"));
    }

    #[test]
    fn test_core_errors_convert() {
        let err: ComputeError = gpuip_core::Error::size_mismatch("in", 32, 31).into();
        assert!(matches!(err, ComputeError::Core(ref e) if e.is_size_error()));
    }
}
