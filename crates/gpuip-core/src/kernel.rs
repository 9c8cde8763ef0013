//! Kernel descriptors and the canonical argument layout.
//!
//! A [`Kernel`] names a compute entry point, the buffers it reads and writes
//! (each mapped to a formal parameter name), its scalar parameters and its
//! source text.
//!
//! # Argument layout
//!
//! Device kernels receive their arguments in one fixed order, regardless of
//! the order in which bindings were declared:
//!
//! 1. input buffers
//! 2. output buffers
//! 3. int parameters
//! 4. float parameters
//! 5. `width`
//! 6. `height`
//!
//! [`Kernel::arguments`] is the single producer of this sequence. Both the
//! source generator and the argument binder walk it, so a generated signature
//! and the bound arguments always agree position for position.

use crate::Buffer;

/// A buffer bound to a kernel under a formal parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferBinding {
    /// Registered buffer name.
    pub buffer: String,
    /// Parameter name used inside the kernel source.
    pub formal: String,
}

/// A named scalar kernel parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param<T> {
    pub name: String,
    pub value: T,
}

impl<T> Param<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self { name: name.into(), value }
    }
}

/// One slot of the argument layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Argument<'a> {
    /// Input buffer, bound as device memory.
    Input { buffer: &'a str, formal: &'a str },
    /// Output buffer, bound as device memory.
    Output { buffer: &'a str, formal: &'a str },
    /// 32-bit integer scalar.
    Int { name: &'a str, value: i32 },
    /// 32-bit float scalar.
    Float { name: &'a str, value: f32 },
    /// Dispatch width.
    Width,
    /// Dispatch height.
    Height,
}

impl Argument<'_> {
    /// Formal parameter name as it appears in kernel source.
    pub fn name(&self) -> &str {
        match self {
            Self::Input { formal, .. } | Self::Output { formal, .. } => formal,
            Self::Int { name, .. } | Self::Float { name, .. } => name,
            Self::Width => "width",
            Self::Height => "height",
        }
    }

    /// Registered buffer name for buffer arguments.
    pub fn buffer(&self) -> Option<&str> {
        match self {
            Self::Input { buffer, .. } | Self::Output { buffer, .. } => Some(buffer),
            _ => None,
        }
    }
}

/// Descriptor of a named compute kernel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kernel {
    name: String,
    code: String,
    in_buffers: Vec<BufferBinding>,
    out_buffers: Vec<BufferBinding>,
    params_int: Vec<Param<i32>>,
    params_float: Vec<Param<f32>>,
}

impl Kernel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Kernel entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current source text.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Replace the source text. Takes effect on the next build.
    pub fn set_code(&mut self, code: impl Into<String>) -> &mut Self {
        self.code = code.into();
        self
    }

    /// Bind `buffer` as input `formal`.
    ///
    /// Rebinding an existing formal name keeps its position.
    pub fn set_in_buffer(&mut self, formal: impl Into<String>, buffer: &Buffer) -> &mut Self {
        upsert_binding(&mut self.in_buffers, formal.into(), buffer.name());
        self
    }

    /// Bind `buffer` as output `formal`.
    ///
    /// Rebinding an existing formal name keeps its position.
    pub fn set_out_buffer(&mut self, formal: impl Into<String>, buffer: &Buffer) -> &mut Self {
        upsert_binding(&mut self.out_buffers, formal.into(), buffer.name());
        self
    }

    /// Set an int parameter, appending it if the name is new.
    pub fn set_param_int(&mut self, name: impl Into<String>, value: i32) -> &mut Self {
        upsert_param(&mut self.params_int, name.into(), value);
        self
    }

    /// Set a float parameter, appending it if the name is new.
    pub fn set_param_float(&mut self, name: impl Into<String>, value: f32) -> &mut Self {
        upsert_param(&mut self.params_float, name.into(), value);
        self
    }

    pub fn in_buffers(&self) -> &[BufferBinding] {
        &self.in_buffers
    }

    pub fn out_buffers(&self) -> &[BufferBinding] {
        &self.out_buffers
    }

    pub fn params_int(&self) -> &[Param<i32>] {
        &self.params_int
    }

    pub fn params_float(&self) -> &[Param<f32>] {
        &self.params_float
    }

    /// Arguments in device binding order. See the module docs.
    pub fn arguments(&self) -> Vec<Argument<'_>> {
        let mut args = Vec::with_capacity(
            self.in_buffers.len() + self.out_buffers.len()
                + self.params_int.len() + self.params_float.len() + 2,
        );
        args.extend(self.in_buffers.iter().map(|b| Argument::Input {
            buffer: &b.buffer,
            formal: &b.formal,
        }));
        args.extend(self.out_buffers.iter().map(|b| Argument::Output {
            buffer: &b.buffer,
            formal: &b.formal,
        }));
        args.extend(self.params_int.iter().map(|p| Argument::Int {
            name: &p.name,
            value: p.value,
        }));
        args.extend(self.params_float.iter().map(|p| Argument::Float {
            name: &p.name,
            value: p.value,
        }));
        args.push(Argument::Width);
        args.push(Argument::Height);
        args
    }
}

fn upsert_binding(bindings: &mut Vec<BufferBinding>, formal: String, buffer: &str) {
    match bindings.iter_mut().find(|b| b.formal == formal) {
        Some(existing) => existing.buffer = buffer.to_string(),
        None => bindings.push(BufferBinding {
            buffer: buffer.to_string(),
            formal,
        }),
    }
}

fn upsert_param<T>(params: &mut Vec<Param<T>>, name: String, value: T) {
    match params.iter_mut().find(|p| p.name == name) {
        Some(existing) => existing.value = value,
        None => params.push(Param { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BufferType;

    fn buf(name: &str) -> Buffer {
        Buffer::new(name, BufferType::F32, 1).unwrap()
    }

    #[test]
    fn test_argument_order_ignores_declaration_order() {
        let mut k = Kernel::new("mix");
        k.set_param_float("amount", 0.5)
            .set_out_buffer("dst", &buf("out"))
            .set_param_int("mode", 2)
            .set_in_buffer("a", &buf("in_a"))
            .set_in_buffer("b", &buf("in_b"));

        let names: Vec<_> = k.arguments().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, ["a", "b", "dst", "mode", "amount", "width", "height"]);
    }

    #[test]
    fn test_rebind_keeps_position() {
        let mut k = Kernel::new("k");
        k.set_in_buffer("a", &buf("one"))
            .set_in_buffer("b", &buf("two"))
            .set_in_buffer("a", &buf("three"));

        assert_eq!(k.in_buffers().len(), 2);
        assert_eq!(k.in_buffers()[0].formal, "a");
        assert_eq!(k.in_buffers()[0].buffer, "three");
    }

    #[test]
    fn test_param_update_in_place() {
        let mut k = Kernel::new("k");
        k.set_param_int("n", 1).set_param_int("m", 2).set_param_int("n", 7);
        assert_eq!(k.params_int(), &[Param::new("n", 7), Param::new("m", 2)]);
    }

    #[test]
    fn test_empty_kernel_has_dimensions_only() {
        let k = Kernel::new("noop");
        assert_eq!(k.arguments(), vec![Argument::Width, Argument::Height]);
        assert_eq!(k.arguments()[0].buffer(), None);
    }
}
