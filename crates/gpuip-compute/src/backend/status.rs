//! OpenCL status codes and their translation into diagnostics.
//!
//! Devices report failures as raw `cl_int` status codes. [`Status`] wraps
//! the code, and [`translate`] turns it into a message for the [`Stage`] at
//! which it happened. The environment calls this exactly once per failure,
//! when it converts a device result into a [`crate::ComputeError`].

use std::fmt;

/// Raw status code returned by a device call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

/// Result of a device call.
pub type DeviceResult<T> = Result<T, Status>;

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const DEVICE_NOT_FOUND: Status = Status(-1);
    pub const DEVICE_NOT_AVAILABLE: Status = Status(-2);
    pub const COMPILER_NOT_AVAILABLE: Status = Status(-3);
    pub const MEM_OBJECT_ALLOCATION_FAILURE: Status = Status(-4);
    pub const OUT_OF_RESOURCES: Status = Status(-5);
    pub const OUT_OF_HOST_MEMORY: Status = Status(-6);
    pub const PROFILING_INFO_NOT_AVAILABLE: Status = Status(-7);
    pub const BUILD_PROGRAM_FAILURE: Status = Status(-11);
    pub const EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST: Status = Status(-14);
    pub const INVALID_VALUE: Status = Status(-30);
    pub const INVALID_DEVICE_TYPE: Status = Status(-31);
    pub const INVALID_PLATFORM: Status = Status(-32);
    pub const INVALID_DEVICE: Status = Status(-33);
    pub const INVALID_CONTEXT: Status = Status(-34);
    pub const INVALID_QUEUE_PROPERTIES: Status = Status(-35);
    pub const INVALID_COMMAND_QUEUE: Status = Status(-36);
    pub const INVALID_HOST_PTR: Status = Status(-37);
    pub const INVALID_MEM_OBJECT: Status = Status(-38);
    pub const INVALID_BINARY: Status = Status(-42);
    pub const INVALID_BUILD_OPTIONS: Status = Status(-43);
    pub const INVALID_PROGRAM: Status = Status(-44);
    pub const INVALID_PROGRAM_EXECUTABLE: Status = Status(-45);
    pub const INVALID_KERNEL_NAME: Status = Status(-46);
    pub const INVALID_KERNEL_DEFINITION: Status = Status(-47);
    pub const INVALID_KERNEL: Status = Status(-48);
    pub const INVALID_ARG_INDEX: Status = Status(-49);
    pub const INVALID_ARG_VALUE: Status = Status(-50);
    pub const INVALID_ARG_SIZE: Status = Status(-51);
    pub const INVALID_KERNEL_ARGS: Status = Status(-52);
    pub const INVALID_WORK_DIMENSION: Status = Status(-53);
    pub const INVALID_WORK_GROUP_SIZE: Status = Status(-54);
    pub const INVALID_WORK_ITEM_SIZE: Status = Status(-55);
    pub const INVALID_GLOBAL_OFFSET: Status = Status(-56);
    pub const INVALID_EVENT_WAIT_LIST: Status = Status(-57);
    pub const INVALID_EVENT: Status = Status(-58);
    pub const INVALID_OPERATION: Status = Status(-59);
    pub const INVALID_BUFFER_SIZE: Status = Status(-61);
    pub const INVALID_GLOBAL_WORK_SIZE: Status = Status(-63);

    #[inline]
    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Symbolic OpenCL name of the code.
    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "CL_SUCCESS",
            -1 => "CL_DEVICE_NOT_FOUND",
            -2 => "CL_DEVICE_NOT_AVAILABLE",
            -3 => "CL_COMPILER_NOT_AVAILABLE",
            -4 => "CL_MEM_OBJECT_ALLOCATION_FAILURE",
            -5 => "CL_OUT_OF_RESOURCES",
            -6 => "CL_OUT_OF_HOST_MEMORY",
            -7 => "CL_PROFILING_INFO_NOT_AVAILABLE",
            -8 => "CL_MEM_COPY_OVERLAP",
            -9 => "CL_IMAGE_FORMAT_MISMATCH",
            -10 => "CL_IMAGE_FORMAT_NOT_SUPPORTED",
            -11 => "CL_BUILD_PROGRAM_FAILURE",
            -12 => "CL_MAP_FAILURE",
            -13 => "CL_MISALIGNED_SUB_BUFFER_OFFSET",
            -14 => "CL_EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST",
            -30 => "CL_INVALID_VALUE",
            -31 => "CL_INVALID_DEVICE_TYPE",
            -32 => "CL_INVALID_PLATFORM",
            -33 => "CL_INVALID_DEVICE",
            -34 => "CL_INVALID_CONTEXT",
            -35 => "CL_INVALID_QUEUE_PROPERTIES",
            -36 => "CL_INVALID_COMMAND_QUEUE",
            -37 => "CL_INVALID_HOST_PTR",
            -38 => "CL_INVALID_MEM_OBJECT",
            -39 => "CL_INVALID_IMAGE_FORMAT_DESCRIPTOR",
            -40 => "CL_INVALID_IMAGE_SIZE",
            -41 => "CL_INVALID_SAMPLER",
            -42 => "CL_INVALID_BINARY",
            -43 => "CL_INVALID_BUILD_OPTIONS",
            -44 => "CL_INVALID_PROGRAM",
            -45 => "CL_INVALID_PROGRAM_EXECUTABLE",
            -46 => "CL_INVALID_KERNEL_NAME",
            -47 => "CL_INVALID_KERNEL_DEFINITION",
            -48 => "CL_INVALID_KERNEL",
            -49 => "CL_INVALID_ARG_INDEX",
            -50 => "CL_INVALID_ARG_VALUE",
            -51 => "CL_INVALID_ARG_SIZE",
            -52 => "CL_INVALID_KERNEL_ARGS",
            -53 => "CL_INVALID_WORK_DIMENSION",
            -54 => "CL_INVALID_WORK_GROUP_SIZE",
            -55 => "CL_INVALID_WORK_ITEM_SIZE",
            -56 => "CL_INVALID_GLOBAL_OFFSET",
            -57 => "CL_INVALID_EVENT_WAIT_LIST",
            -58 => "CL_INVALID_EVENT",
            -59 => "CL_INVALID_OPERATION",
            -60 => "CL_INVALID_GL_OBJECT",
            -61 => "CL_INVALID_BUFFER_SIZE",
            -62 => "CL_INVALID_MIP_LEVEL",
            -63 => "CL_INVALID_GLOBAL_WORK_SIZE",
            _ => "CL_UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Call site of a device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    EnvironmentInit,
    Allocate,
    Release,
    ProgramCreate,
    ProgramBuild,
    KernelCreate,
    ArgumentBind,
    Enqueue,
    Copy,
    Finish,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnvironmentInit => "environment init",
            Self::Allocate => "allocate",
            Self::Release => "release",
            Self::ProgramCreate => "program create",
            Self::ProgramBuild => "program build",
            Self::KernelCreate => "kernel create",
            Self::ArgumentBind => "argument bind",
            Self::Enqueue => "enqueue",
            Self::Copy => "copy",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Human-readable message for `status` raised during `stage`.
pub fn translate(status: Status, stage: Stage) -> String {
    match hint(status, stage) {
        Some(hint) => format!("{stage}: {status}: {hint}"),
        None => format!("{stage}: {status}"),
    }
}

fn hint(status: Status, stage: Stage) -> Option<&'static str> {
    use Stage::*;

    let hint = match (stage, status) {
        (EnvironmentInit, Status::DEVICE_NOT_FOUND) => "no device of the requested type on this platform",
        (EnvironmentInit, Status::INVALID_PLATFORM) => "no OpenCL platform is installed",
        (Allocate, Status::INVALID_BUFFER_SIZE) => {
            "buffer size is zero or above the device limit; check the dimensions"
        }
        (Allocate, Status::MEM_OBJECT_ALLOCATION_FAILURE) => "device memory exhausted",
        (Release, Status::INVALID_MEM_OBJECT) => "memory object was already released",
        (Release, Status::INVALID_KERNEL) => "kernel object was already released",
        (ProgramCreate, Status::INVALID_VALUE) => "kernel source is empty",
        (ProgramBuild, Status::BUILD_PROGRAM_FAILURE) => "compilation failed; see the build log",
        (ProgramBuild, Status::INVALID_BUILD_OPTIONS) => "build options were rejected by the compiler",
        (ProgramBuild, Status::COMPILER_NOT_AVAILABLE) => "no online compiler is available for this device",
        (KernelCreate, Status::INVALID_KERNEL_NAME) => {
            "no __kernel function in the source matches the kernel name"
        }
        (KernelCreate, Status::INVALID_PROGRAM_EXECUTABLE) => "program has no successfully built executable",
        (ArgumentBind, Status::INVALID_ARG_INDEX) => {
            "kernel declares fewer parameters than inputs + outputs + ints + floats + width + height"
        }
        (ArgumentBind, Status::INVALID_ARG_SIZE) | (ArgumentBind, Status::INVALID_ARG_VALUE) => {
            "parameter types must follow the order inputs, outputs, ints, floats, width, height"
        }
        (ArgumentBind, Status::INVALID_MEM_OBJECT) => "buffer memory is not allocated",
        (Enqueue, Status::INVALID_KERNEL_ARGS) => "not every kernel argument has been set",
        (Enqueue, Status::INVALID_GLOBAL_WORK_SIZE) => "dispatch width or height is zero",
        (Enqueue, Status::INVALID_WORK_GROUP_SIZE) => "work-group size is not supported by the device",
        (Copy, Status::INVALID_VALUE) => "host region does not match the buffer size",
        (Copy, Status::INVALID_MEM_OBJECT) => "buffer memory is not allocated",
        (Finish, Status::PROFILING_INFO_NOT_AVAILABLE) => "command queue was created without profiling",
        (_, Status::OUT_OF_RESOURCES) => "device ran out of resources",
        (_, Status::OUT_OF_HOST_MEMORY) => "host ran out of memory",
        (_, Status::EXEC_STATUS_ERROR_FOR_EVENTS_IN_WAIT_LIST) => "a previously enqueued command failed",
        _ => return None,
    };
    Some(hint)
}
