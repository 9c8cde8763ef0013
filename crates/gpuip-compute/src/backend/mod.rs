//! Compute backends.
//!
//! ```text
//! Environment<D: ComputeDevice>
//!     +-- OpenClDevice (feature `opencl`)
//!     +-- CUDA / GLSL  (same contract, not implemented here)
//! ```
//!
//! Devices report raw [`Status`] codes; [`status::translate`] turns them
//! into messages at the environment boundary.

mod detect;
mod device;
pub mod status;

#[cfg(feature = "opencl")]
mod opencl_backend;

pub use detect::{detect_backends, describe_backends, BackendInfo};
pub use device::{ComputeDevice, KernelArg};
pub use status::{DeviceResult, Stage, Status};

#[cfg(feature = "opencl")]
pub use opencl_backend::OpenClDevice;

/// Kinds of compute environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// OpenCL via the `opencl3` crate.
    OpenCl,
    /// NVIDIA CUDA.
    Cuda,
    /// OpenGL shading language.
    Glsl,
}

impl Backend {
    /// Check if an environment of this kind can be created on this system.
    pub fn is_available(&self) -> bool {
        match self {
            #[cfg(feature = "opencl")]
            Self::OpenCl => OpenClDevice::is_available(),
            #[cfg(not(feature = "opencl"))]
            Self::OpenCl => false,
            Self::Cuda | Self::Glsl => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenCl => "opencl",
            Self::Cuda => "cuda",
            Self::Glsl => "glsl",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability probe: can an environment of `backend` be created here.
pub fn can_create_environment(backend: Backend) -> bool {
    backend.is_available()
}
