use std::fmt::Debug;

use crate::common::{PageId, RecordId, SlotId};

/// A fixed-width, totally ordered key stored in tree pages.
///
/// The tree compares decoded keys, so the byte encoding only needs to round
/// trip; it does not need to preserve order.
pub trait IndexKey: Ord + Copy + Debug + Send + Sync + 'static {
    /// Encoded width in bytes; every key of the type occupies exactly this
    /// many bytes in a page slot.
    const ENCODED_LEN: usize;

    fn encode_into(&self, buf: &mut [u8]);
    fn decode_from(buf: &[u8]) -> Self;
}

/// A fixed-width value stored in leaf slots.
pub trait IndexValue: Copy + PartialEq + Debug + Send + Sync + 'static {
    const ENCODED_LEN: usize;

    fn encode_into(&self, buf: &mut [u8]);
    fn decode_from(buf: &[u8]) -> Self;
}

impl IndexKey for u32 {
    const ENCODED_LEN: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Self {
        u32::from_le_bytes(buf[..4].try_into().unwrap())
    }
}

impl IndexKey for u64 {
    const ENCODED_LEN: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[..8].copy_from_slice(&self.to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Self {
        u64::from_le_bytes(buf[..8].try_into().unwrap())
    }
}

impl IndexValue for RecordId {
    const ENCODED_LEN: usize = 6;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.page_id.as_u32().to_le_bytes());
        buf[4..6].copy_from_slice(&self.slot_id.as_u16().to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Self {
        RecordId::new(
            PageId::new(u32::from_le_bytes(buf[..4].try_into().unwrap())),
            SlotId::new(u16::from_le_bytes(buf[4..6].try_into().unwrap())),
        )
    }
}

impl IndexValue for u32 {
    const ENCODED_LEN: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        buf[..4].copy_from_slice(&self.to_le_bytes());
    }

    fn decode_from(buf: &[u8]) -> Self {
        u32::from_le_bytes(buf[..4].try_into().unwrap())
    }
}
