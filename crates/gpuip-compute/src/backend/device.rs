//! Device abstraction the environment drives.

use super::status::DeviceResult;

/// A scalar or memory argument for a compiled kernel.
#[derive(Debug)]
pub enum KernelArg<'a, M> {
    /// Device memory handle.
    Memory(&'a M),
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
}

/// Low-level operations of a single compute device.
///
/// Implementations own one context and one in-order command queue. Every
/// method reports failure as a raw [`Status`](super::status::Status);
/// translation into [`crate::ComputeError`] happens in the environment,
/// which knows the kernel or buffer being processed.
///
/// Resources are handed back through the `release_*` methods rather than
/// dropped so the environment decides when device objects die.
pub trait ComputeDevice {
    /// Device memory object.
    type Memory;
    /// Program object (compiled source).
    type Program;
    /// Kernel entry point extracted from a program.
    type Kernel;
    /// Completion event of an enqueued command.
    type Event;

    /// Device name, for logs.
    fn name(&self) -> &str;

    /// Create a read-write memory object of `size` bytes.
    fn create_memory(&mut self, size: usize) -> DeviceResult<Self::Memory>;

    fn release_memory(&mut self, memory: Self::Memory) -> DeviceResult<()>;

    /// Create a program from source text.
    fn create_program(&mut self, source: &str) -> DeviceResult<Self::Program>;

    /// Compile a program for this device.
    fn build_program(&mut self, program: &mut Self::Program) -> DeviceResult<()>;

    /// Compiler output for the last build of `program`.
    fn build_log(&self, program: &Self::Program) -> String;

    fn release_program(&mut self, program: Self::Program) -> DeviceResult<()>;

    /// Extract the `__kernel` function named `name`.
    fn create_kernel(&mut self, program: &Self::Program, name: &str) -> DeviceResult<Self::Kernel>;

    fn release_kernel(&mut self, kernel: Self::Kernel) -> DeviceResult<()>;

    /// Set argument `index` of `kernel`.
    fn set_arg(
        &mut self,
        kernel: &mut Self::Kernel,
        index: u32,
        arg: KernelArg<'_, Self::Memory>,
    ) -> DeviceResult<()>;

    /// Enqueue a 2D dispatch over `global` work items.
    fn enqueue_2d(&mut self, kernel: &Self::Kernel, global: [usize; 2]) -> DeviceResult<Self::Event>;

    /// Blocking copy of the whole of `memory` into `dst`.
    fn read(&mut self, memory: &Self::Memory, dst: &mut [u8]) -> DeviceResult<Self::Event>;

    /// Blocking copy of `src` into the whole of `memory`.
    fn write(&mut self, memory: &mut Self::Memory, src: &[u8]) -> DeviceResult<Self::Event>;

    /// Block until every enqueued command has completed.
    fn finish(&mut self) -> DeviceResult<()>;

    /// Wait for `event` and return its device execution time in milliseconds.
    fn elapsed_ms(&mut self, event: &Self::Event) -> DeviceResult<f64>;
}
