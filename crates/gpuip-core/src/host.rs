//! Host-side pixel storage for buffer transfers.
//!
//! [`HostBuffer`] owns interleaved pixel data laid out exactly like the
//! device buffer it mirrors (`idx = x + width * y`, channels interleaved), so
//! a transfer is a single byte copy. Typed storage keeps `f32`/`f16` slices
//! correctly aligned; [`HostBuffer::as_bytes`] exposes them as raw bytes via
//! `bytemuck`.

use half::f16;
use rayon::prelude::*;

use crate::{Buffer, BufferType, Error, Result};

/// Typed backing storage.
#[derive(Clone, PartialEq)]
pub enum HostData {
    U8(Vec<u8>),
    F16(Vec<f16>),
    F32(Vec<f32>),
}

impl HostData {
    fn zeroed(buffer_type: BufferType, len: usize) -> Self {
        match buffer_type {
            BufferType::U8 => Self::U8(vec![0; len]),
            BufferType::F16 => Self::F16(vec![f16::ZERO; len]),
            BufferType::F32 => Self::F32(vec![0.0; len]),
        }
    }

    pub fn buffer_type(&self) -> BufferType {
        match self {
            Self::U8(_) => BufferType::U8,
            Self::F16(_) => BufferType::F16,
            Self::F32(_) => BufferType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interleaved image data in host memory.
#[derive(Clone)]
pub struct HostBuffer {
    data: HostData,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u32,
}

impl HostBuffer {
    /// Zero-filled storage matching `buffer` over a `width x height` domain.
    pub fn for_buffer(buffer: &Buffer, width: u32, height: u32) -> Self {
        let len = element_count(width, height, buffer.channels());
        Self {
            data: HostData::zeroed(buffer.buffer_type(), len),
            width,
            height,
            channels: buffer.channels(),
        }
    }

    /// Wrap existing typed data.
    pub fn from_data(data: HostData, width: u32, height: u32, channels: u32) -> Result<Self> {
        let expected = element_count(width, height, channels);
        if data.len() != expected {
            let size = data.buffer_type().element_size();
            return Err(Error::size_mismatch(
                "host",
                expected * size,
                data.len() * size,
            ));
        }
        Ok(Self { data, width, height, channels })
    }

    /// Create from `f32` data.
    pub fn from_f32(data: Vec<f32>, width: u32, height: u32, channels: u32) -> Result<Self> {
        Self::from_data(HostData::F32(data), width, height, channels)
    }

    /// Create from `u8` data.
    pub fn from_u8(data: Vec<u8>, width: u32, height: u32, channels: u32) -> Result<Self> {
        Self::from_data(HostData::U8(data), width, height, channels)
    }

    /// Create half storage by converting `f32` values.
    pub fn from_f32_as_half(data: &[f32], width: u32, height: u32, channels: u32) -> Result<Self> {
        let halves: Vec<f16> = data.par_iter().map(|&v| f16::from_f32(v)).collect();
        Self::from_data(HostData::F16(halves), width, height, channels)
    }

    pub fn buffer_type(&self) -> BufferType {
        self.data.buffer_type()
    }

    pub fn data(&self) -> &HostData {
        &self.data
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * self.buffer_type().element_size()
    }

    /// Raw bytes, as transferred to the device.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            HostData::U8(v) => v,
            HostData::F16(v) => bytemuck::cast_slice(v),
            HostData::F32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Mutable raw bytes, as written by a device read.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.data {
            HostData::U8(v) => v,
            HostData::F16(v) => bytemuck::cast_slice_mut(v),
            HostData::F32(v) => bytemuck::cast_slice_mut(v),
        }
    }

    pub fn as_f32(&self) -> Result<&[f32]> {
        match &self.data {
            HostData::F32(v) => Ok(v),
            other => Err(self.type_mismatch(other, BufferType::F32)),
        }
    }

    pub fn as_f16(&self) -> Result<&[f16]> {
        match &self.data {
            HostData::F16(v) => Ok(v),
            other => Err(self.type_mismatch(other, BufferType::F16)),
        }
    }

    pub fn as_u8(&self) -> Result<&[u8]> {
        match &self.data {
            HostData::U8(v) => Ok(v),
            other => Err(self.type_mismatch(other, BufferType::U8)),
        }
    }

    /// Convert to `f32`. `u8` values are normalized to [0, 1].
    pub fn to_f32(&self) -> Vec<f32> {
        match &self.data {
            HostData::U8(v) => v.par_iter().map(|&b| b as f32 / 255.0).collect(),
            HostData::F16(v) => v.par_iter().map(|h| h.to_f32()).collect(),
            HostData::F32(v) => v.clone(),
        }
    }

    /// Check this storage can back `buffer` over a `width x height` domain.
    pub fn check_fits(&self, buffer: &Buffer, width: u32, height: u32) -> Result<()> {
        let expected = buffer.byte_size(width, height);
        if self.size_bytes() != expected {
            return Err(Error::size_mismatch(buffer.name(), expected, self.size_bytes()));
        }
        if self.buffer_type() != buffer.buffer_type() {
            return Err(Error::TypeMismatch {
                expected: buffer.buffer_type(),
                requested: self.buffer_type(),
            });
        }
        Ok(())
    }

    fn type_mismatch(&self, data: &HostData, requested: BufferType) -> Error {
        Error::TypeMismatch {
            expected: data.buffer_type(),
            requested,
        }
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("type", &self.buffer_type())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}

#[inline]
fn element_count(width: u32, height: u32, channels: u32) -> usize {
    (width as usize) * (height as usize) * (channels as usize)
}
