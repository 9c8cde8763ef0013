//! Environment configuration.
//!
//! [`EnvironmentConfig`] selects the device an environment opens and the
//! options passed to the kernel compiler. Defaults match the classic
//! behaviour (first GPU of the first platform, no build options);
//! [`EnvironmentConfig::from_env`] lets deployments override them:
//!
//! | Variable              | Values                | Default |
//! |-----------------------|-----------------------|---------|
//! | `GPUIP_DEVICE_TYPE`   | `gpu`, `cpu`, `any`   | `gpu`   |
//! | `GPUIP_PLATFORM`      | platform index        | `0`     |
//! | `GPUIP_BUILD_OPTIONS` | compiler flags        | empty   |

use tracing::warn;

/// Environment variable selecting the device type.
pub const ENV_DEVICE_TYPE: &str = "GPUIP_DEVICE_TYPE";
/// Environment variable selecting the platform index.
pub const ENV_PLATFORM: &str = "GPUIP_PLATFORM";
/// Environment variable holding compiler build options.
pub const ENV_BUILD_OPTIONS: &str = "GPUIP_BUILD_OPTIONS";

/// Kind of device to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Gpu,
    /// CPU device; handy for testing on machines without a GPU.
    Cpu,
    /// First device of any type.
    Any,
}

impl std::str::FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gpu" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            "any" | "all" => Ok(Self::Any),
            other => Err(format!("unknown device type '{other}'")),
        }
    }
}

/// Device selection and build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Device type to open.
    pub device_type: DeviceType,
    /// Index into the platform list.
    pub platform_index: usize,
    /// Options passed to every program build (e.g. `-cl-fast-relaxed-math`).
    pub build_options: String,
}

impl EnvironmentConfig {
    /// Defaults overridden by `GPUIP_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEVICE_TYPE) {
            match value.parse() {
                Ok(device_type) => config.device_type = device_type,
                Err(e) => warn!(variable = ENV_DEVICE_TYPE, "{e}; using default"),
            }
        }
        if let Some(value) = lookup(ENV_PLATFORM) {
            match value.trim().parse() {
                Ok(index) => config.platform_index = index,
                Err(e) => warn!(variable = ENV_PLATFORM, value = %value, "invalid platform index: {e}"),
            }
        }
        if let Some(value) = lookup(ENV_BUILD_OPTIONS) {
            config.build_options = value;
        }
        config
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_platform(mut self, index: usize) -> Self {
        self.platform_index = index;
        self
    }

    pub fn with_build_options(mut self, options: impl Into<String>) -> Self {
        self.build_options = options.into();
        self
    }
}
