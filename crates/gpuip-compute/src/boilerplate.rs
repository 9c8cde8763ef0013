//! OpenCL C boilerplate generation.
//!
//! [`generate`] turns a kernel descriptor into a compilable skeleton: the
//! signature in argument-layout order, the per-pixel prologue, half to float
//! decoding of inputs, zero-initialised outputs and float to half stores.
//! The caller replaces the zero initialisation with the real computation
//! before building.
//!
//! Half buffers are always declared as scalar `half *` storage and accessed
//! with `vload_half`/`vstore_half`, since `halfN` vector types are not
//! supported everywhere. The kernel body works on a `float`/`floatN` local
//! of the same formal name; the storage parameter gets a `_half` suffix.
//!
//! ```text
//! __kernel void
//! copy(__global const float * src,
//!      __global float * dst,
//!      const int width,
//!      const int height)
//! {
//!     ...
//!     // kernel code
//!     dst[idx] = 0;
//! }
//! ```
//!
//! Generation is a pure function of its inputs: no device calls, and the
//! same descriptor and registry always produce the same text.

use gpuip_core::{Argument, Buffer, BufferRegistry, BufferType, Kernel};

use crate::{ComputeError, ComputeResult};

/// Suffix appended to the storage parameter of half buffers.
pub const HALF_SUFFIX: &str = "_half";

/// Vector component names used for half stores.
const COMPONENTS: [&str; 4] = [".x", ".y", ".z", ".w"];

/// Vector widths OpenCL C accepts for non-half buffers.
const VECTOR_WIDTHS: [u32; 6] = [1, 2, 3, 4, 8, 16];

const PROLOGUE: &str = "\
{
    const int x = get_global_id(0);
    const int y = get_global_id(1);

    // array index
    const int idx = x + width * y;

    // inside image bounds check
    if (x >= width || y >= height) {
        return;
    }

";

/// Generate the OpenCL source skeleton for `kernel`.
pub fn generate(kernel: &Kernel, buffers: &BufferRegistry) -> ComputeResult<String> {
    let params = kernel
        .arguments()
        .iter()
        .map(|arg| -> ComputeResult<String> {
            Ok(match *arg {
                Argument::Input { buffer, formal } => {
                    let b = lookup(kernel, buffers, buffer)?;
                    format!("__global const {} * {}{}", storage_type(b), formal, suffix(b))
                }
                Argument::Output { buffer, formal } => {
                    let b = lookup(kernel, buffers, buffer)?;
                    format!("__global {} * {}{}", storage_type(b), formal, suffix(b))
                }
                Argument::Int { name, .. } => format!("const int {name}"),
                Argument::Float { name, .. } => format!("const float {name}"),
                Argument::Width => "const int width".to_string(),
                Argument::Height => "const int height".to_string(),
            })
        })
        .collect::<ComputeResult<Vec<_>>>()?;

    let separator = format!(",\n{}", " ".repeat(kernel.name().len() + 1));

    let mut src = String::new();
    src.push_str(&format!("__kernel void\n{}({})\n", kernel.name(), params.join(&separator)));
    src.push_str(PROLOGUE);

    let half_inputs: Vec<_> = resolved(kernel.in_buffers(), buffers)
        .filter(|(b, _)| b.buffer_type().is_half())
        .collect();
    if !half_inputs.is_empty() {
        src.push_str("    // half to float conversion\n");
        for (buffer, formal) in &half_inputs {
            src.push_str(&decode_half(buffer.channels(), formal));
        }
        src.push('\n');
    }

    src.push_str("    // kernel code\n");
    for (buffer, formal) in resolved(kernel.out_buffers(), buffers) {
        src.push_str(&zero_init(buffer, formal));
    }

    let half_outputs: Vec<_> = resolved(kernel.out_buffers(), buffers)
        .filter(|(b, _)| b.buffer_type().is_half())
        .collect();
    if !half_outputs.is_empty() {
        src.push_str("\n    // float to half conversion\n");
        for (buffer, formal) in &half_outputs {
            src.push_str(&encode_half(buffer.channels(), formal));
        }
    }

    src.push_str("}\n");
    Ok(src)
}

fn lookup<'a>(kernel: &Kernel, buffers: &'a BufferRegistry, name: &str) -> ComputeResult<&'a Buffer> {
    let buffer = buffers
        .get(name)
        .ok_or_else(|| gpuip_core::Error::unknown_buffer(kernel.name(), name))?;
    check_channels(buffer)?;
    Ok(buffer)
}

/// Buffer bindings paired with their registered descriptors.
///
/// Only called after every binding resolved in the signature pass.
fn resolved<'a>(
    bindings: &'a [gpuip_core::BufferBinding],
    buffers: &'a BufferRegistry,
) -> impl Iterator<Item = (&'a Buffer, &'a str)> {
    bindings
        .iter()
        .filter_map(move |b| buffers.get(&b.buffer).map(|buffer| (buffer, b.formal.as_str())))
}

fn check_channels(buffer: &Buffer) -> ComputeResult<()> {
    let channels = buffer.channels();
    let reason = if buffer.buffer_type().is_half() {
        (channels > COMPONENTS.len() as u32)
            .then_some("half buffers are addressed through .x/.y/.z/.w, at most 4 channels")
    } else {
        (!VECTOR_WIDTHS.contains(&channels))
            .then_some("OpenCL vector types have 1, 2, 3, 4, 8 or 16 components")
    };
    match reason {
        Some(reason) => Err(ComputeError::UnsupportedChannels {
            buffer: buffer.name().to_string(),
            channels,
            reason,
        }),
        None => Ok(()),
    }
}

fn scalar_type(buffer_type: BufferType) -> &'static str {
    match buffer_type {
        BufferType::U8 => "uchar",
        BufferType::F16 => "half",
        BufferType::F32 => "float",
    }
}

/// Element type of the device pointer. Half storage is never vectorised.
fn storage_type(buffer: &Buffer) -> String {
    let scalar = scalar_type(buffer.buffer_type());
    if buffer.channels() > 1 && !buffer.buffer_type().is_half() {
        format!("{scalar}{}", buffer.channels())
    } else {
        scalar.to_string()
    }
}

fn suffix(buffer: &Buffer) -> &'static str {
    if buffer.buffer_type().is_half() { HALF_SUFFIX } else { "" }
}

/// `float` or `floatN` working type for half buffers.
fn float_type(channels: u32) -> String {
    if channels == 1 {
        "float".to_string()
    } else {
        format!("float{channels}")
    }
}

fn zeros(channels: u32) -> String {
    vec!["0"; channels as usize].join(", ")
}

fn decode_half(channels: u32, formal: &str) -> String {
    if channels == 1 {
        return format!("    const float {formal} = vload_half(idx, {formal}{HALF_SUFFIX});\n");
    }

    let ty = float_type(channels);
    let head = format!("    const {ty} {formal} = ({ty})(");
    let align = format!(",\n{}", " ".repeat(head.len()));
    let loads: Vec<String> = (0..channels)
        .map(|c| format!("vload_half({channels} * idx + {c}, {formal}{HALF_SUFFIX})"))
        .collect();
    format!("{head}{});\n", loads.join(&align))
}

fn zero_init(buffer: &Buffer, formal: &str) -> String {
    let channels = buffer.channels();
    match (buffer.buffer_type().is_half(), channels) {
        (false, 1) => format!("    {formal}[idx] = 0;\n"),
        (false, _) => format!(
            "    {formal}[idx] = ({})({});\n",
            storage_type(buffer),
            zeros(channels)
        ),
        (true, 1) => format!("    float {formal} = 0;\n"),
        (true, _) => {
            let ty = float_type(channels);
            format!("    {ty} {formal} = ({ty})({});\n", zeros(channels))
        }
    }
}

fn encode_half(channels: u32, formal: &str) -> String {
    if channels == 1 {
        return format!("    vstore_half({formal}, idx, {formal}{HALF_SUFFIX});\n");
    }

    COMPONENTS
        .iter()
        .take(channels as usize)
        .enumerate()
        .map(|(c, component)| {
            format!("    vstore_half({formal}{component}, {channels} * idx + {c}, {formal}{HALF_SUFFIX});\n")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_types() {
        let rgba8 = Buffer::new("a", BufferType::U8, 4).unwrap();
        let half3 = Buffer::new("b", BufferType::F16, 3).unwrap();
        let gray = Buffer::new("c", BufferType::F32, 1).unwrap();
        assert_eq!(storage_type(&rgba8), "uchar4");
        assert_eq!(storage_type(&half3), "half");
        assert_eq!(storage_type(&gray), "float");
    }

    #[test]
    fn test_decode_single_channel() {
        assert_eq!(
            decode_half(1, "src"),
            "    const float src = vload_half(idx, src_half);\n"
        );
    }

    #[test]
    fn test_decode_aligns_terms() {
        let text = decode_half(2, "uv");
        let head = "    const float2 uv = (float2)(";
        let expected = format!(
            "{head}vload_half(2 * idx + 0, uv_half),\n{}vload_half(2 * idx + 1, uv_half));\n",
            " ".repeat(head.len())
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_zero_init_variants() {
        let rgba8 = Buffer::new("a", BufferType::U8, 4).unwrap();
        let half1 = Buffer::new("b", BufferType::F16, 1).unwrap();
        let half4 = Buffer::new("c", BufferType::F16, 4).unwrap();
        assert_eq!(zero_init(&rgba8, "o"), "    o[idx] = (uchar4)(0, 0, 0, 0);\n");
        assert_eq!(zero_init(&half1, "o"), "    float o = 0;\n");
        assert_eq!(zero_init(&half4, "o"), "    float4 o = (float4)(0, 0, 0, 0);\n");
    }

    #[test]
    fn test_encode_single_channel_uses_bare_idx() {
        assert_eq!(encode_half(1, "dst"), "    vstore_half(dst, idx, dst_half);\n");
    }

    #[test]
    fn test_channel_limits() {
        let half5 = Buffer::new("h", BufferType::F16, 5).unwrap();
        let float5 = Buffer::new("f", BufferType::F32, 5).unwrap();
        let float8 = Buffer::new("g", BufferType::F32, 8).unwrap();
        assert!(check_channels(&half5).is_err());
        assert!(check_channels(&float5).is_err());
        assert!(check_channels(&float8).is_ok());
    }
}
