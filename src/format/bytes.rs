//! Little-endian field access at fixed byte offsets.
//!
//! Callers guarantee the block covers the field; both codecs check block length
//! once up front and then address fields by their documented offsets.

use serde::{Serialize, Serializer};

pub(crate) fn read_u16(block: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(take::<2>(block, offset))
}

pub(crate) fn read_u32(block: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(take::<4>(block, offset))
}

pub(crate) fn read_i32(block: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(take::<4>(block, offset))
}

pub(crate) fn read_u64(block: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(take::<8>(block, offset))
}

pub(crate) fn read_f32(block: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(take::<4>(block, offset))
}

pub(crate) fn read_f64(block: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(take::<8>(block, offset))
}

pub(crate) fn write_u16(block: &mut [u8], offset: usize, value: u16) {
    block[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u32(block: &mut [u8], offset: usize, value: u32) {
    block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_i32(block: &mut [u8], offset: usize, value: i32) {
    block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u64(block: &mut [u8], offset: usize, value: u64) {
    block[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_f32(block: &mut [u8], offset: usize, value: f32) {
    block[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_f64(block: &mut [u8], offset: usize, value: f64) {
    block[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

fn take<const N: usize>(block: &[u8], offset: usize) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&block[offset..offset + N]);
    bytes
}

/// Fixed-width, NUL-padded text field.
///
/// The raw bytes are kept verbatim so that whatever follows the terminator
/// survives an encode/decode cycle; [`FixedText::as_string`] gives the readable part.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedText<const N: usize>([u8; N]);

impl<const N: usize> FixedText<N> {
    pub(crate) fn from_block(block: &[u8], offset: usize) -> Self {
        Self(take::<N>(block, offset))
    }

    pub(crate) fn write_to(&self, block: &mut [u8], offset: usize) {
        block[offset..offset + N].copy_from_slice(&self.0);
    }

    /// Build a field from text, truncating to the field width.
    pub fn new(text: &str) -> Self {
        let mut bytes = [0u8; N];
        let len = text.len().min(N);
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self(bytes)
    }

    /// Text up to the first NUL, lossily decoded.
    pub fn as_string(&self) -> String {
        let null_pos = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        String::from_utf8_lossy(&self.0[..null_pos]).to_string()
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> std::fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_string())
    }
}

impl<const N: usize> Serialize for FixedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}
