// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar codecs.
//!
//! | Type                     | Wire            | Well-known id |
//! |--------------------------|-----------------|---------------|
//! | `bool`                   | VarInt 0/1      | 1             |
//! | `u8 u16 u32 u64 usize`   | VarInt          | 2-5, 17       |
//! | `i8 i16 i32 i64 isize`   | zig-zag VarInt  | 6-9, 18       |
//! | `f32` / `f64`            | Fixed32/Fixed64 | 10 / 11       |
//! | `u128` / `i128`          | Fixed128        | 12 / 13       |
//! | `char`                   | VarInt          | 14            |
//! | `String`                 | LengthPrefixed  | 15            |
//! | `bytes::Bytes`           | LengthPrefixed  | 16            |
//!
//! Every scalar is a value type: it calls `mark_value_field` and never
//! touches the reference table.

use super::{expect_wire_type, DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::{CodecError, Result};
use crate::wire::varint::{zigzag_decode64, zigzag_encode64};
use crate::wire::{FieldHeader, WireType};
use bytes::Bytes;
use std::borrow::Cow;

/// Codec unit struct plus its copier and `Serializable` impl.
macro_rules! scalar_codec {
    (
        $codec:ident, $ty:ty, $id:expr, $wire:expr,
        write($w:ident, $v:ident) $write:block,
        read($r:ident) $read:block
    ) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec;

        impl FieldCodec<$ty> for $codec {
            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: TypeKey,
                value: &$ty,
            ) -> Result<()> {
                writer.session_mut().mark_value_field();
                writer.write_field_header(field_id_delta, expected, TypeKey::of::<$ty>(), $wire)?;
                let $w = writer;
                let $v = value;
                $write
                Ok(())
            }

            fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<$ty> {
                expect_wire_type(header, $wire, stringify!($codec))?;
                reader.session_mut().mark_value_field();
                let $r = reader;
                $read
            }
        }

        impl DeepCopier<$ty> for $codec {
            fn deep_copy(&self, value: &$ty, _context: &mut CopyContext) -> Result<$ty> {
                Ok(value.clone())
            }
        }

        impl Serializable for $ty {
            type Codec = $codec;
            const WELL_KNOWN_ID: Option<u32> = Some($id);

            fn type_name() -> Cow<'static, str> {
                Cow::Borrowed(stringify!($ty))
            }
        }
    };
}

/// Unsigned integers: plain varint, range-checked on read.
macro_rules! unsigned_codec {
    ($codec:ident, $ty:ty, $id:expr) => {
        scalar_codec!(
            $codec, $ty, $id, WireType::VarInt,
            write(w, v) { w.write_varint64(*v as u64); },
            read(r) { narrow::<$ty, _>(r.read_varint64()?, stringify!($ty)) }
        );
    };
}

/// Signed integers: zig-zag varint, range-checked on read.
macro_rules! signed_codec {
    ($codec:ident, $ty:ty, $id:expr) => {
        scalar_codec!(
            $codec, $ty, $id, WireType::VarInt,
            write(w, v) { w.write_varint64(zigzag_encode64(*v as i64)); },
            read(r) { narrow::<$ty, _>(zigzag_decode64(r.read_varint64()?), stringify!($ty)) }
        );
    };
}

fn narrow<T, S>(value: S, type_name: &str) -> Result<T>
where
    T: TryFrom<S>,
    S: std::fmt::Display + Copy,
{
    T::try_from(value).map_err(|_| CodecError::InvalidData {
        reason: format!("{} out of range for {}", value, type_name),
    })
}

unsigned_codec!(U8Codec, u8, 2);
unsigned_codec!(U16Codec, u16, 3);
unsigned_codec!(U32Codec, u32, 4);
unsigned_codec!(U64Codec, u64, 5);
unsigned_codec!(UsizeCodec, usize, 17);
signed_codec!(I8Codec, i8, 6);
signed_codec!(I16Codec, i16, 7);
signed_codec!(I32Codec, i32, 8);
signed_codec!(I64Codec, i64, 9);
signed_codec!(IsizeCodec, isize, 18);

scalar_codec!(
    BoolCodec, bool, 1, WireType::VarInt,
    write(w, v) { w.write_varint32(u32::from(*v)); },
    read(r) {
        match r.read_varint64()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidData {
                reason: format!("{} is not a bool", other),
            }),
        }
    }
);

scalar_codec!(
    F32Codec, f32, 10, WireType::Fixed32,
    write(w, v) { w.write_fixed32(v.to_bits()); },
    read(r) { Ok(f32::from_bits(r.read_fixed32()?)) }
);

scalar_codec!(
    F64Codec, f64, 11, WireType::Fixed64,
    write(w, v) { w.write_fixed64(v.to_bits()); },
    read(r) { Ok(f64::from_bits(r.read_fixed64()?)) }
);

scalar_codec!(
    U128Codec, u128, 12, WireType::Fixed128,
    write(w, v) { w.write_fixed128(*v); },
    read(r) { r.read_fixed128() }
);

scalar_codec!(
    I128Codec, i128, 13, WireType::Fixed128,
    write(w, v) { w.write_fixed128(*v as u128); },
    read(r) { Ok(r.read_fixed128()? as i128) }
);

scalar_codec!(
    CharCodec, char, 14, WireType::VarInt,
    write(w, v) { w.write_varint32(u32::from(*v)); },
    read(r) {
        let raw = r.read_varint32()?;
        char::from_u32(raw).ok_or_else(|| CodecError::InvalidData {
            reason: format!("0x{:x} is not a char", raw),
        })
    }
);

scalar_codec!(
    StringCodec, String, 15, WireType::LengthPrefixed,
    write(w, v) { w.write_length_prefixed(v.as_bytes()); },
    read(r) { r.read_string() }
);

scalar_codec!(
    BytesCodec, Bytes, 16, WireType::LengthPrefixed,
    write(w, v) { w.write_length_prefixed(v); },
    read(r) { r.read_length_prefixed() }
);
