//! Compute environment: descriptor registries, device resources, dispatch.
//!
//! An [`Environment`] owns one device and drives it through four steps that
//! may each be repeated:
//!
//! - [`allocate`](Environment::allocate) - device memory for every buffer
//! - [`build`](Environment::build) - compile every kernel, in registration order
//! - [`process`](Environment::process) - bind arguments and dispatch every kernel
//! - [`copy`](Environment::copy) - move a whole buffer between host and device
//!
//! Allocate and build are replace-all: previous device objects are released
//! first, and a failure part-way releases whatever the failing call had
//! created. The device memory map and compiled kernel list are therefore
//! always either empty or complete.
//!
//! Every call blocks until its device work is finished. Copies go through the
//! same in-order queue as dispatches, so a read never observes a buffer that
//! a previous `process` is still writing.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use gpuip_core::{Argument, Buffer, BufferRegistry, BufferType, HostBuffer, Kernel};
use tracing::{debug, trace, warn};

use crate::backend::status::{translate, DeviceResult, Stage};
use crate::backend::{ComputeDevice, KernelArg};
use crate::boilerplate;
use crate::{ComputeError, ComputeResult};

/// Direction of a host/device transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOperation {
    /// Device to host.
    Read,
    /// Host to device.
    Write,
}

impl fmt::Display for CopyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
        })
    }
}

/// Device execution time of one kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelTiming {
    pub kernel: String,
    pub elapsed_ms: f64,
}

/// Per-kernel device times of one [`Environment::process`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessTiming {
    /// Timings in dispatch order.
    pub kernels: Vec<KernelTiming>,
}

impl ProcessTiming {
    /// Time of the last dispatched kernel, or zero when nothing ran.
    pub fn last_ms(&self) -> f64 {
        self.kernels.last().map_or(0.0, |t| t.elapsed_ms)
    }

    /// Sum over all kernels.
    pub fn total_ms(&self) -> f64 {
        self.kernels.iter().map(|t| t.elapsed_ms).sum()
    }

    pub fn get(&self, kernel: &str) -> Option<f64> {
        self.kernels
            .iter()
            .find(|t| t.kernel == kernel)
            .map(|t| t.elapsed_ms)
    }
}

struct Memory<M> {
    handle: M,
    size: usize,
}

enum Transfer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Transfer<'_> {
    fn op(&self) -> CopyOperation {
        match self {
            Self::Read(_) => CopyOperation::Read,
            Self::Write(_) => CopyOperation::Write,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Read(data) => data.len(),
            Self::Write(data) => data.len(),
        }
    }
}

/// Device objects created by one replace-all step.
///
/// Dropping a batch that was not committed releases every object in it.
struct Batch<'d, D: ComputeDevice, T> {
    device: &'d mut D,
    items: Vec<T>,
    release: fn(&mut D, T) -> DeviceResult<()>,
}

impl<'d, D: ComputeDevice, T> Batch<'d, D, T> {
    fn new(device: &'d mut D, release: fn(&mut D, T) -> DeviceResult<()>) -> Self {
        Self {
            device,
            items: Vec::new(),
            release,
        }
    }

    fn commit(mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }
}

impl<D: ComputeDevice, T> Drop for Batch<'_, D, T> {
    fn drop(&mut self) {
        let release = self.release;
        let device = &mut *self.device;
        for item in self.items.drain(..) {
            if let Err(status) = release(device, item) {
                warn!("{}", translate(status, Stage::Release));
            }
        }
    }
}

fn release_named_memory<D: ComputeDevice>(
    device: &mut D,
    (_, memory): (String, Memory<D::Memory>),
) -> DeviceResult<()> {
    device.release_memory(memory.handle)
}

/// Compute environment over a single device.
pub struct Environment<D: ComputeDevice> {
    device: D,
    buffers: BufferRegistry,
    kernels: Vec<Kernel>,
    width: u32,
    height: u32,
    memory: BTreeMap<String, Memory<D::Memory>>,
    compiled: Vec<D::Kernel>,
}

impl<D: ComputeDevice> Environment<D> {
    /// Wrap an opened device.
    pub fn from_device(device: D) -> Self {
        Self {
            device,
            buffers: BufferRegistry::new(),
            kernels: Vec::new(),
            width: 0,
            height: 0,
            memory: BTreeMap::new(),
            compiled: Vec::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    /// Register a buffer. An existing buffer of the same name is replaced.
    pub fn create_buffer(
        &mut self,
        name: impl Into<String>,
        buffer_type: BufferType,
        channels: u32,
    ) -> ComputeResult<&Buffer> {
        let buffer = Buffer::new(name, buffer_type, channels)?;
        Ok(self.buffers.insert(buffer))
    }

    /// Register a kernel, or return the existing kernel of that name.
    pub fn create_kernel(&mut self, name: impl Into<String>) -> &mut Kernel {
        let name = name.into();
        let index = match self.kernels.iter().position(|k| k.name() == name) {
            Some(index) => index,
            None => {
                self.kernels.push(Kernel::new(name));
                self.kernels.len() - 1
            }
        };
        &mut self.kernels[index]
    }

    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    pub fn kernel(&self, name: &str) -> Option<&Kernel> {
        self.kernels.iter().find(|k| k.name() == name)
    }

    pub fn kernel_mut(&mut self, name: &str) -> Option<&mut Kernel> {
        self.kernels.iter_mut().find(|k| k.name() == name)
    }

    /// Kernels in registration (and dispatch) order.
    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    /// Set the dispatch domain shared by every kernel.
    ///
    /// Takes effect for buffer sizes on the next `allocate`; until then
    /// `process` rejects memory sized for the old domain.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Names of buffers that currently have device memory.
    pub fn allocated_buffers(&self) -> impl Iterator<Item = &str> {
        self.memory.keys().map(String::as_str)
    }

    /// Number of compiled kernels currently held.
    pub fn built_kernels(&self) -> usize {
        self.compiled.len()
    }

    /// Source skeleton for the kernel `name`. See [`boilerplate::generate`].
    pub fn boilerplate_code(&self, name: &str) -> ComputeResult<String> {
        let kernel = self
            .kernel(name)
            .ok_or_else(|| ComputeError::UnknownKernel(name.to_string()))?;
        boilerplate::generate(kernel, &self.buffers)
    }

    // =========================================================================
    // Device lifecycle
    // =========================================================================

    /// Create device memory for every registered buffer.
    ///
    /// Releases all previously allocated memory first. Returns host
    /// wall-clock time spent.
    pub fn allocate(&mut self) -> ComputeResult<Duration> {
        let start = Instant::now();
        self.release_memory()?;

        let mut batch = Batch::new(&mut self.device, release_named_memory::<D>);
        for buffer in &self.buffers {
            let size = buffer.byte_size(self.width, self.height);
            trace!(buffer = buffer.name(), size, "create buffer");
            let handle = batch
                .device
                .create_memory(size)
                .map_err(|status| ComputeError::Allocation {
                    buffer: buffer.name().to_string(),
                    message: translate(status, Stage::Allocate),
                })?;
            batch.items.push((buffer.name().to_string(), Memory { handle, size }));
        }
        self.memory = batch.commit().into_iter().collect();

        let elapsed = start.elapsed();
        debug!(buffers = self.memory.len(), ?elapsed, "allocate");
        Ok(elapsed)
    }

    /// Compile every kernel from its current source.
    ///
    /// Always a full rebuild: previously compiled kernels are released first.
    /// Returns host wall-clock time spent.
    pub fn build(&mut self) -> ComputeResult<Duration> {
        let start = Instant::now();
        self.release_kernels()?;

        let mut batch = Batch::new(&mut self.device, D::release_kernel);
        for kernel in &self.kernels {
            let compiled = compile(&mut *batch.device, kernel)?;
            batch.items.push(compiled);
        }
        self.compiled = batch.commit();

        let elapsed = start.elapsed();
        debug!(kernels = self.compiled.len(), ?elapsed, "build");
        Ok(elapsed)
    }

    /// Dispatch every kernel over the `width x height` domain and wait.
    ///
    /// Kernels run in registration order. Device memory is checked against
    /// the current descriptors and dimensions before anything is enqueued.
    /// The first binding or enqueue failure aborts the call.
    pub fn process(&mut self) -> ComputeResult<ProcessTiming> {
        if self.compiled.len() != self.kernels.len() {
            return Err(ComputeError::NotBuilt {
                built: self.compiled.len(),
                registered: self.kernels.len(),
            });
        }
        self.check_memory()?;

        let global = [self.width as usize, self.height as usize];
        let mut events = Vec::with_capacity(self.kernels.len());
        for (kernel, compiled) in self.kernels.iter().zip(self.compiled.iter_mut()) {
            bind_arguments(&mut self.device, &self.memory, kernel, compiled, global)?;
            let event = self
                .device
                .enqueue_2d(compiled, global)
                .map_err(|status| ComputeError::Dispatch {
                    kernel: kernel.name().to_string(),
                    message: translate(status, Stage::Enqueue),
                })?;
            events.push((kernel.name(), event));
        }

        self.device.finish().map_err(|status| ComputeError::Finish {
            message: translate(status, Stage::Finish),
        })?;

        let mut timing = ProcessTiming::default();
        for (kernel, event) in &events {
            let elapsed_ms = self
                .device
                .elapsed_ms(event)
                .map_err(|status| ComputeError::Finish {
                    message: translate(status, Stage::Finish),
                })?;
            timing.kernels.push(KernelTiming {
                kernel: kernel.to_string(),
                elapsed_ms,
            });
        }

        debug!(kernels = timing.kernels.len(), total_ms = timing.total_ms(), "process");
        Ok(timing)
    }

    /// Copy the whole buffer `name` between device memory and `data`.
    ///
    /// `data` must be exactly the allocated size of the buffer. For
    /// [`CopyOperation::Write`] it is only read. Returns device transfer
    /// time in milliseconds.
    pub fn copy(&mut self, name: &str, op: CopyOperation, data: &mut [u8]) -> ComputeResult<f64> {
        let transfer = match op {
            CopyOperation::Read => Transfer::Read(data),
            CopyOperation::Write => Transfer::Write(data),
        };
        self.transfer(name, transfer)
    }

    /// Read device buffer `name` into `host`.
    pub fn read_buffer(&mut self, name: &str, host: &mut HostBuffer) -> ComputeResult<f64> {
        self.check_host(name, host)?;
        self.transfer(name, Transfer::Read(host.as_bytes_mut()))
    }

    /// Write `host` into device buffer `name`.
    pub fn write_buffer(&mut self, name: &str, host: &HostBuffer) -> ComputeResult<f64> {
        self.check_host(name, host)?;
        self.transfer(name, Transfer::Write(host.as_bytes()))
    }

    /// Every buffer a kernel binds must have device memory sized for its
    /// current descriptor over the current dimensions.
    fn check_memory(&self) -> ComputeResult<()> {
        for kernel in &self.kernels {
            for arg in kernel.arguments() {
                let Some(name) = arg.buffer() else { continue };
                let buffer = self
                    .buffers
                    .get(name)
                    .ok_or_else(|| gpuip_core::Error::unknown_buffer(kernel.name(), name))?;
                let memory = self
                    .memory
                    .get(name)
                    .ok_or_else(|| ComputeError::NotAllocated(name.to_string()))?;
                let expected = buffer.byte_size(self.width, self.height);
                if memory.size != expected {
                    return Err(ComputeError::StaleAllocation {
                        buffer: name.to_string(),
                        allocated: memory.size,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_host(&self, name: &str, host: &HostBuffer) -> ComputeResult<()> {
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| ComputeError::UnknownBuffer(name.to_string()))?;
        host.check_fits(buffer, self.width, self.height)?;
        Ok(())
    }

    fn transfer(&mut self, name: &str, transfer: Transfer<'_>) -> ComputeResult<f64> {
        if !self.buffers.contains(name) {
            return Err(ComputeError::UnknownBuffer(name.to_string()));
        }
        let memory = self
            .memory
            .get_mut(name)
            .ok_or_else(|| ComputeError::NotAllocated(name.to_string()))?;
        if transfer.len() != memory.size {
            return Err(gpuip_core::Error::size_mismatch(name, memory.size, transfer.len()).into());
        }

        let op = transfer.op();
        let copy_error = |status| ComputeError::Copy {
            buffer: name.to_string(),
            direction: op,
            message: translate(status, Stage::Copy),
        };

        let event = match transfer {
            Transfer::Read(data) => self.device.read(&memory.handle, data),
            Transfer::Write(data) => self.device.write(&mut memory.handle, data),
        }
        .map_err(copy_error)?;
        let elapsed_ms = self.device.elapsed_ms(&event).map_err(copy_error)?;

        trace!(buffer = name, %op, bytes = memory.size, elapsed_ms, "copy");
        Ok(elapsed_ms)
    }

    fn release_memory(&mut self) -> ComputeResult<()> {
        let mut first_error = None;
        for (name, memory) in std::mem::take(&mut self.memory) {
            if let Err(status) = self.device.release_memory(memory.handle) {
                let message = translate(status, Stage::Release);
                warn!(buffer = %name, "{message}");
                first_error.get_or_insert(ComputeError::Release {
                    resource: format!("buffer '{name}'"),
                    message,
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn release_kernels(&mut self) -> ComputeResult<()> {
        let mut first_error = None;
        let names = self.kernels.iter().map(|k| k.name());
        for (compiled, name) in std::mem::take(&mut self.compiled).into_iter().zip(names) {
            if let Err(status) = self.device.release_kernel(compiled) {
                let message = translate(status, Stage::Release);
                warn!(kernel = name, "{message}");
                first_error.get_or_insert(ComputeError::Release {
                    resource: format!("kernel '{name}'"),
                    message,
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(feature = "opencl")]
impl Environment<crate::backend::OpenClDevice> {
    /// Open an OpenCL environment configured from `GPUIP_*` variables.
    pub fn new() -> ComputeResult<Self> {
        Self::with_config(&crate::EnvironmentConfig::from_env())
    }

    pub fn with_config(config: &crate::EnvironmentConfig) -> ComputeResult<Self> {
        let device = crate::backend::OpenClDevice::new(config)?;
        Ok(Self::from_device(device))
    }
}

impl<D: ComputeDevice> Drop for Environment<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release_kernels() {
            warn!("{e}");
        }
        if let Err(e) = self.release_memory() {
            warn!("{e}");
        }
    }
}

impl<D: ComputeDevice> fmt::Debug for Environment<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("device", &self.device.name())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("buffers", &self.buffers.len())
            .field("kernels", &self.kernels.len())
            .field("allocated", &self.memory.len())
            .field("built", &self.compiled.len())
            .finish()
    }
}

/// Create, build and extract one kernel. The program is released either way.
fn compile<D: ComputeDevice>(device: &mut D, kernel: &Kernel) -> ComputeResult<D::Kernel> {
    let name = kernel.name();
    let mut program = device
        .create_program(kernel.code())
        .map_err(|status| ComputeError::Build {
            kernel: name.to_string(),
            message: translate(status, Stage::ProgramCreate),
            log: String::new(),
        })?;

    if let Err(status) = device.build_program(&mut program) {
        let log = device.build_log(&program);
        warn!(kernel = name, "build failed:\n{log}");
        release_program(device, program);
        return Err(ComputeError::Build {
            kernel: name.to_string(),
            message: translate(status, Stage::ProgramBuild),
            log,
        });
    }

    let created = device.create_kernel(&program, name);
    release_program(device, program);
    created.map_err(|status| ComputeError::KernelCreation {
        kernel: name.to_string(),
        message: translate(status, Stage::KernelCreate),
    })
}

fn release_program<D: ComputeDevice>(device: &mut D, program: D::Program) {
    if let Err(status) = device.release_program(program) {
        warn!("{}", translate(status, Stage::Release));
    }
}

/// Bind arguments in [`Kernel::arguments`] order, failing on the first error.
fn bind_arguments<D: ComputeDevice>(
    device: &mut D,
    memory: &BTreeMap<String, Memory<D::Memory>>,
    kernel: &Kernel,
    compiled: &mut D::Kernel,
    [width, height]: [usize; 2],
) -> ComputeResult<()> {
    for (index, arg) in kernel.arguments().iter().enumerate() {
        let index = index as u32;
        let value = match *arg {
            Argument::Input { buffer, .. } | Argument::Output { buffer, .. } => {
                let memory = memory
                    .get(buffer)
                    .ok_or_else(|| ComputeError::NotAllocated(buffer.to_string()))?;
                KernelArg::Memory(&memory.handle)
            }
            Argument::Int { value, .. } => KernelArg::Int(value),
            Argument::Float { value, .. } => KernelArg::Float(value),
            Argument::Width => KernelArg::Int(width as i32),
            Argument::Height => KernelArg::Int(height as i32),
        };
        trace!(kernel = kernel.name(), index, argument = arg.name(), "set arg");
        device
            .set_arg(compiled, index, value)
            .map_err(|status| ComputeError::ArgumentBinding {
                kernel: kernel.name().to_string(),
                index,
                argument: arg.name().to_string(),
                message: translate(status, Stage::ArgumentBind),
            })?;
    }
    Ok(())
}
