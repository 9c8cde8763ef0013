//! Backend detection.

use super::Backend;

/// Information about a compute backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether an environment can be created.
    pub available: bool,
    /// Description.
    pub description: &'static str,
}

/// Detect all backends, available ones first.
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut backends = vec![
        BackendInfo {
            backend: Backend::OpenCl,
            name: "OpenCL",
            available: Backend::OpenCl.is_available(),
            description: if cfg!(feature = "opencl") {
                "OpenCL device via opencl3"
            } else {
                "OpenCL (opencl feature not enabled)"
            },
        },
        BackendInfo {
            backend: Backend::Cuda,
            name: "CUDA",
            available: false,
            description: "NVIDIA CUDA (not implemented)",
        },
        BackendInfo {
            backend: Backend::Glsl,
            name: "GLSL",
            available: false,
            description: "OpenGL shaders (not implemented)",
        },
    ];

    backends.sort_by_key(|b| !b.available);
    backends
}

/// Get description of backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();

    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }

    desc
}
