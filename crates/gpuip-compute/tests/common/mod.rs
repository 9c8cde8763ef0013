//! In-memory device that records every call the environment makes.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use gpuip_compute::{ComputeDevice, KernelArg, Status};
use gpuip_compute::backend::DeviceResult;

/// Marker that makes a program fail to compile.
pub const SYNTAX_ERROR: &str = "syntax error";

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedArg {
    Memory(usize),
    Int(i32),
    Float(f32),
}

#[derive(Debug)]
pub struct FakeMemory {
    pub id: usize,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct FakeProgram {
    source: String,
    built: bool,
}

#[derive(Debug)]
pub struct FakeKernel {
    pub name: String,
}

#[derive(Debug)]
pub struct FakeEvent(f64);

#[derive(Debug, Default)]
pub struct FakeDevice {
    pub memory_created: usize,
    pub memory_released: usize,
    pub programs_created: usize,
    pub programs_released: usize,
    pub kernels_created: usize,
    pub kernels_released: usize,
    /// `(kernel, index, value)` in call order.
    pub args: Vec<(String, u32, RecordedArg)>,
    /// `(kernel, global size)` in enqueue order.
    pub dispatches: Vec<(String, [usize; 2])>,
    pub finishes: usize,
    /// Fail the allocation after this many successful ones.
    pub fail_alloc_after: Option<usize>,
    /// Fail binding of this argument index.
    pub fail_arg_index: Option<u32>,
    /// Receives `(live memory, live kernels)` when the device is dropped.
    pub on_drop: Option<Rc<Cell<Option<(usize, usize)>>>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments bound for `kernel` in the most recent `process`.
    pub fn args_of(&self, kernel: &str) -> Vec<(u32, RecordedArg)> {
        let mut args: Vec<(u32, RecordedArg)> = Vec::new();
        for (name, index, value) in &self.args {
            if name != kernel {
                continue;
            }
            if *index == 0 {
                args.clear();
            }
            args.push((*index, value.clone()));
        }
        args
    }

    pub fn live_memory(&self) -> usize {
        self.memory_created - self.memory_released
    }

    pub fn live_kernels(&self) -> usize {
        self.kernels_created - self.kernels_released
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        if let Some(slot) = &self.on_drop {
            slot.set(Some((self.live_memory(), self.live_kernels())));
        }
    }
}

impl ComputeDevice for FakeDevice {
    type Memory = FakeMemory;
    type Program = FakeProgram;
    type Kernel = FakeKernel;
    type Event = FakeEvent;

    fn name(&self) -> &str {
        "fake"
    }

    fn create_memory(&mut self, size: usize) -> DeviceResult<FakeMemory> {
        if size == 0 {
            return Err(Status::INVALID_BUFFER_SIZE);
        }
        if self.fail_alloc_after == Some(self.memory_created - self.memory_released) {
            return Err(Status::MEM_OBJECT_ALLOCATION_FAILURE);
        }
        self.memory_created += 1;
        Ok(FakeMemory {
            id: self.memory_created,
            data: vec![0; size],
        })
    }

    fn release_memory(&mut self, _memory: FakeMemory) -> DeviceResult<()> {
        self.memory_released += 1;
        Ok(())
    }

    fn create_program(&mut self, source: &str) -> DeviceResult<FakeProgram> {
        if source.is_empty() {
            return Err(Status::INVALID_VALUE);
        }
        self.programs_created += 1;
        Ok(FakeProgram {
            source: source.to_string(),
            built: false,
        })
    }

    fn build_program(&mut self, program: &mut FakeProgram) -> DeviceResult<()> {
        if program.source.contains(SYNTAX_ERROR) {
            return Err(Status::BUILD_PROGRAM_FAILURE);
        }
        program.built = true;
        Ok(())
    }

    fn build_log(&self, program: &FakeProgram) -> String {
        if program.built {
            String::new()
        } else {
            format!("<source>:1:1: error: {SYNTAX_ERROR}")
        }
    }

    fn release_program(&mut self, _program: FakeProgram) -> DeviceResult<()> {
        self.programs_released += 1;
        Ok(())
    }

    fn create_kernel(&mut self, program: &FakeProgram, name: &str) -> DeviceResult<FakeKernel> {
        if !program.built {
            return Err(Status::INVALID_PROGRAM_EXECUTABLE);
        }
        if !program.source.contains(&format!("{name}(")) {
            return Err(Status::INVALID_KERNEL_NAME);
        }
        self.kernels_created += 1;
        Ok(FakeKernel { name: name.to_string() })
    }

    fn release_kernel(&mut self, _kernel: FakeKernel) -> DeviceResult<()> {
        self.kernels_released += 1;
        Ok(())
    }

    fn set_arg(
        &mut self,
        kernel: &mut FakeKernel,
        index: u32,
        arg: KernelArg<'_, FakeMemory>,
    ) -> DeviceResult<()> {
        if self.fail_arg_index == Some(index) {
            return Err(Status::INVALID_ARG_SIZE);
        }
        let value = match arg {
            KernelArg::Memory(memory) => RecordedArg::Memory(memory.id),
            KernelArg::Int(v) => RecordedArg::Int(v),
            KernelArg::Float(v) => RecordedArg::Float(v),
        };
        self.args.push((kernel.name.clone(), index, value));
        Ok(())
    }

    fn enqueue_2d(&mut self, kernel: &FakeKernel, global: [usize; 2]) -> DeviceResult<FakeEvent> {
        if global.contains(&0) {
            return Err(Status::INVALID_GLOBAL_WORK_SIZE);
        }
        self.dispatches.push((kernel.name.clone(), global));
        Ok(FakeEvent(self.dispatches.len() as f64))
    }

    fn read(&mut self, memory: &FakeMemory, dst: &mut [u8]) -> DeviceResult<FakeEvent> {
        if dst.len() != memory.data.len() {
            return Err(Status::INVALID_VALUE);
        }
        dst.copy_from_slice(&memory.data);
        Ok(FakeEvent(0.25))
    }

    fn write(&mut self, memory: &mut FakeMemory, src: &[u8]) -> DeviceResult<FakeEvent> {
        if src.len() != memory.data.len() {
            return Err(Status::INVALID_VALUE);
        }
        memory.data.copy_from_slice(src);
        Ok(FakeEvent(0.25))
    }

    fn finish(&mut self) -> DeviceResult<()> {
        self.finishes += 1;
        Ok(())
    }

    fn elapsed_ms(&mut self, event: &FakeEvent) -> DeviceResult<f64> {
        Ok(event.0)
    }
}
