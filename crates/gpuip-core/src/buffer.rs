//! Named logical image buffers.
//!
//! A [`Buffer`] carries only metadata: name, element type and channel count.
//! It has no device memory of its own; the compute environment owns the
//! device side and keys it by buffer name.

use std::collections::BTreeMap;

use crate::{BufferType, Error, Result};

/// Descriptor of a named 2D image buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    name: String,
    buffer_type: BufferType,
    channels: u32,
}

impl Buffer {
    /// Create a buffer descriptor. Channel count must be at least one.
    pub fn new(name: impl Into<String>, buffer_type: BufferType, channels: u32) -> Result<Self> {
        let name = name.into();
        if channels == 0 {
            return Err(Error::invalid_channels(name, channels));
        }
        Ok(Self { name, buffer_type, channels })
    }

    /// Buffer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type.
    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    /// Channels per pixel.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Bytes needed on the device for a `width x height` domain.
    #[inline]
    pub fn byte_size(&self, width: u32, height: u32) -> usize {
        self.buffer_type.byte_size(self.channels, width, height)
    }
}

/// Buffers keyed by name, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct BufferRegistry {
    buffers: BTreeMap<String, Buffer>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer, replacing any previous descriptor with the same name.
    pub fn insert(&mut self, buffer: Buffer) -> &Buffer {
        let name = buffer.name.clone();
        self.buffers.insert(name.clone(), buffer);
        &self.buffers[&name]
    }

    pub fn get(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterate buffers in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.values()
    }
}

impl<'a> IntoIterator for &'a BufferRegistry {
    type Item = &'a Buffer;
    type IntoIter = std::collections::btree_map::Values<'a, String, Buffer>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_channels_rejected() {
        let err = Buffer::new("img", BufferType::F32, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidChannels { channels: 0, .. }));
    }

    #[test]
    fn test_byte_size() {
        let buf = Buffer::new("img", BufferType::F16, 4).unwrap();
        assert_eq!(buf.byte_size(8, 2), 4 * 2 * 8 * 2);
    }

    #[test]
    fn test_registry_replaces_and_orders() {
        let mut reg = BufferRegistry::new();
        reg.insert(Buffer::new("b", BufferType::U8, 1).unwrap());
        reg.insert(Buffer::new("a", BufferType::F32, 3).unwrap());
        reg.insert(Buffer::new("b", BufferType::F16, 2).unwrap());

        assert_eq!(reg.len(), 2);
        let names: Vec<_> = reg.iter().map(|b| b.name()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(reg.get("b").unwrap().buffer_type(), BufferType::F16);
        assert_eq!(reg.get("b").unwrap().channels(), 2);
    }
}
