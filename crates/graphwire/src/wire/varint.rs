// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Base-128 variable-length integers (LEB128) and zig-zag mapping.
//!
//! Seven payload bits per byte, least significant group first, 0x80 set on
//! every byte except the last. A `u32` takes at most 5 bytes and a `u64` at
//! most 10; longer runs or overflowing high bits are rejected.

use bytes::{Buf, BufMut};

pub const MAX_VARINT32_LEN: usize = 5;
pub const MAX_VARINT64_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

/// Low-level varint failure, mapped to `CodecError` by the reader (which
/// knows the offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    Eof,
    Malformed,
}

/// Append `value` as a varint, returning the number of bytes written.
pub fn put_varint64(out: &mut dyn BufMut, mut value: u64) -> usize {
    let mut scratch = [0u8; MAX_VARINT64_LEN];
    let mut len = 0;
    loop {
        let byte = (value as u8) & PAYLOAD_MASK;
        value >>= 7;
        if value == 0 {
            scratch[len] = byte;
            len += 1;
            break;
        }
        scratch[len] = byte | CONTINUATION;
        len += 1;
    }
    out.put_slice(&scratch[..len]);
    len
}

pub fn put_varint32(out: &mut dyn BufMut, value: u32) -> usize {
    put_varint64(out, u64::from(value))
}

/// Bytes needed to encode `value`.
pub const fn encoded_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Read a 64-bit varint, returning the value and bytes consumed.
pub fn get_varint64(input: &mut dyn Buf) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    for index in 0..MAX_VARINT64_LEN {
        if !input.has_remaining() {
            return Err(VarintError::Eof);
        }
        let byte = input.get_u8();
        let bits = u64::from(byte & PAYLOAD_MASK);
        // 9 * 7 = 63 bits so far; the tenth byte may only carry the top bit.
        if index == MAX_VARINT64_LEN - 1 && bits > 1 {
            return Err(VarintError::Malformed);
        }
        value |= bits << (7 * index);
        if byte & CONTINUATION == 0 {
            return Ok((value, index + 1));
        }
    }
    Err(VarintError::Malformed)
}

/// Read a 32-bit varint, returning the value and bytes consumed.
pub fn get_varint32(input: &mut dyn Buf) -> Result<(u32, usize), VarintError> {
    let mut value = 0u32;
    for index in 0..MAX_VARINT32_LEN {
        if !input.has_remaining() {
            return Err(VarintError::Eof);
        }
        let byte = input.get_u8();
        let bits = u32::from(byte & PAYLOAD_MASK);
        // 4 * 7 = 28 bits so far; the fifth byte may only carry four more.
        if index == MAX_VARINT32_LEN - 1 && bits > 0x0F {
            return Err(VarintError::Malformed);
        }
        value |= bits << (7 * index);
        if byte & CONTINUATION == 0 {
            return Ok((value, index + 1));
        }
    }
    Err(VarintError::Malformed)
}

#[inline]
pub const fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
pub const fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
