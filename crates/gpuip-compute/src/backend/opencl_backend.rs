//! OpenCL compute device.
//!
//! Requires the `opencl` feature and an installed OpenCL ICD.

use std::ptr;

use opencl3::command_queue::{CommandQueue, CL_QUEUE_PROFILING_ENABLE};
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::ClError;
use opencl3::event::Event;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, ClMem, CL_MEM_READ_WRITE};
use opencl3::platform::get_platforms;
use opencl3::program::Program;
use opencl3::types::{cl_device_type, CL_BLOCKING};
use tracing::{debug, info};

use super::device::{ComputeDevice, KernelArg};
use super::status::{translate, DeviceResult, Stage, Status};
use crate::config::{DeviceType, EnvironmentConfig};
use crate::{ComputeError, ComputeResult};

impl From<ClError> for Status {
    fn from(e: ClError) -> Self {
        Status(e.0)
    }
}

fn device_type_bits(device_type: DeviceType) -> cl_device_type {
    match device_type {
        DeviceType::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceType::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceType::Any => CL_DEVICE_TYPE_ALL,
    }
}

fn init_error(what: &str, e: ClError) -> ComputeError {
    ComputeError::EnvironmentInit {
        message: format!("{what}: {}", translate(e.into(), Stage::EnvironmentInit)),
    }
}

/// One OpenCL device with its context and profiling command queue.
pub struct OpenClDevice {
    device: Device,
    context: Context,
    queue: CommandQueue,
    build_options: String,
    name: String,
}

impl OpenClDevice {
    /// Open the device selected by `config`.
    pub fn new(config: &EnvironmentConfig) -> ComputeResult<Self> {
        let platforms = get_platforms().map_err(|e| init_error("could not get platform id", e))?;
        let platform = platforms.get(config.platform_index).ok_or_else(|| {
            ComputeError::EnvironmentInit {
                message: format!(
                    "platform index {} out of range ({} platforms found)",
                    config.platform_index,
                    platforms.len()
                ),
            }
        })?;

        let device_ids = platform
            .get_devices(device_type_bits(config.device_type))
            .map_err(|e| init_error("could not get device id", e))?;
        let device_id = *device_ids.first().ok_or_else(|| ComputeError::EnvironmentInit {
            message: format!("no {:?} device on platform {}", config.device_type, config.platform_index),
        })?;

        let device = Device::new(device_id);
        let name = device.name().unwrap_or_default();

        let context = Context::from_device(&device)
            .map_err(|e| init_error("could not create context", e))?;
        let queue = CommandQueue::create_default_with_properties(&context, CL_QUEUE_PROFILING_ENABLE, 0)
            .map_err(|e| init_error("could not create command queue", e))?;

        info!(device = %name, platform = config.platform_index, "OpenCL device opened");

        Ok(Self {
            device,
            context,
            queue,
            build_options: config.build_options.clone(),
            name,
        })
    }

    /// Check whether any OpenCL device can be found.
    pub fn is_available() -> bool {
        get_platforms()
            .map(|platforms| {
                platforms.iter().any(|p| {
                    p.get_devices(CL_DEVICE_TYPE_ALL)
                        .map(|ids| !ids.is_empty())
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

impl ComputeDevice for OpenClDevice {
    type Memory = Buffer<u8>;
    type Program = Program;
    type Kernel = Kernel;
    type Event = Event;

    fn name(&self) -> &str {
        &self.name
    }

    fn create_memory(&mut self, size: usize) -> DeviceResult<Self::Memory> {
        // SAFETY: no host pointer is passed, the runtime owns the allocation.
        unsafe { Buffer::<u8>::create(&self.context, CL_MEM_READ_WRITE, size, ptr::null_mut()) }
            .map_err(Status::from)
    }

    fn release_memory(&mut self, memory: Self::Memory) -> DeviceResult<()> {
        drop(memory);
        Ok(())
    }

    fn create_program(&mut self, source: &str) -> DeviceResult<Self::Program> {
        Program::create_from_source(&self.context, source).map_err(Status::from)
    }

    fn build_program(&mut self, program: &mut Self::Program) -> DeviceResult<()> {
        program
            .build(self.context.devices(), &self.build_options)
            .map_err(Status::from)
    }

    fn build_log(&self, program: &Self::Program) -> String {
        program
            .get_build_log(self.device.id())
            .unwrap_or_else(|e| format!("<build log unavailable: {}>", Status::from(e)))
    }

    fn release_program(&mut self, program: Self::Program) -> DeviceResult<()> {
        drop(program);
        Ok(())
    }

    fn create_kernel(&mut self, program: &Self::Program, name: &str) -> DeviceResult<Self::Kernel> {
        Kernel::create(program, name).map_err(Status::from)
    }

    fn release_kernel(&mut self, kernel: Self::Kernel) -> DeviceResult<()> {
        drop(kernel);
        Ok(())
    }

    fn set_arg(
        &mut self,
        kernel: &mut Self::Kernel,
        index: u32,
        arg: KernelArg<'_, Self::Memory>,
    ) -> DeviceResult<()> {
        // SAFETY: argument sizes are those of the generated signature:
        // cl_mem for buffers, cl_int and cl_float for scalars.
        let result = unsafe {
            match arg {
                KernelArg::Memory(memory) => kernel.set_arg(index, &memory.get()),
                KernelArg::Int(value) => kernel.set_arg(index, &value),
                KernelArg::Float(value) => kernel.set_arg(index, &value),
            }
        };
        result.map_err(Status::from)
    }

    fn enqueue_2d(&mut self, kernel: &Self::Kernel, global: [usize; 2]) -> DeviceResult<Self::Event> {
        // SAFETY: every argument was set by the caller; `global` outlives the call.
        unsafe {
            self.queue.enqueue_nd_range_kernel(
                kernel.get(),
                2,
                ptr::null(),
                global.as_ptr(),
                ptr::null(),
                &[],
            )
        }
        .map_err(Status::from)
    }

    fn read(&mut self, memory: &Self::Memory, dst: &mut [u8]) -> DeviceResult<Self::Event> {
        // SAFETY: blocking read; `dst` is sized to the buffer by the caller.
        unsafe { self.queue.enqueue_read_buffer(memory, CL_BLOCKING, 0, dst, &[]) }
            .map_err(Status::from)
    }

    fn write(&mut self, memory: &mut Self::Memory, src: &[u8]) -> DeviceResult<Self::Event> {
        // SAFETY: blocking write; `src` is sized to the buffer by the caller.
        unsafe { self.queue.enqueue_write_buffer(memory, CL_BLOCKING, 0, src, &[]) }
            .map_err(Status::from)
    }

    fn finish(&mut self) -> DeviceResult<()> {
        self.queue.finish().map_err(Status::from)
    }

    fn elapsed_ms(&mut self, event: &Self::Event) -> DeviceResult<f64> {
        event.wait()?;
        let start = event.profiling_command_start()?;
        let end = event.profiling_command_end()?;
        debug!(start, end, "event profiling");
        Ok(end.saturating_sub(start) as f64 * 1.0e-6)
    }
}
