// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-arity tuple codecs (arity 0 to 8).
//!
//! - Arity 0 is a single VarInt field carrying 0, so there is still a header
//!   to skip or reference.
//! - Arity N >= 1 is a tag-delimited object whose component `i` is field
//!   `i` (1-based), closed by the end marker.
//!
//! Reading dispatches on the absolute field id: ids never seen leave the
//! component at its `Default`, ids beyond the arity are skipped. Larger
//! tuples nest a tuple in the eighth slot: `(a, b, c, d, e, f, g, (h, i))`.
//!
//! On the registry path each component codec is resolved separately and
//! injected into the tuple codec, so per-component overrides apply.

use super::{expect_wire_type, DeepCopier, FieldCodec, Serializable, TypeKey};
use crate::copy::CopyContext;
use crate::cursor::{Reader, Writer};
use crate::error::Result;
use crate::registry::CodecRegistry;
use crate::wire::{FieldHeader, WireType};
use std::borrow::Cow;
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct TupleCodec0;

impl FieldCodec<()> for TupleCodec0 {
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: TypeKey,
        _value: &(),
    ) -> Result<()> {
        writer.session_mut().mark_value_field();
        writer.write_field_header(field_id_delta, expected, TypeKey::of::<()>(), WireType::VarInt)?;
        writer.write_varint32(0);
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, header: &FieldHeader) -> Result<()> {
        reader.session_mut().mark_value_field();
        // A newer writer may have grown the tuple; nothing of it is kept.
        if header.wire_type == WireType::TagDelimited {
            return reader.consume_unknown_field(header);
        }
        expect_wire_type(header, WireType::VarInt, "TupleCodec0")?;
        reader.read_varint64()?;
        Ok(())
    }
}

impl DeepCopier<()> for TupleCodec0 {
    fn deep_copy(&self, _value: &(), _context: &mut CopyContext) -> Result<()> {
        Ok(())
    }
}

impl Serializable for () {
    type Codec = TupleCodec0;
    const WELL_KNOWN_ID: Option<u32> = Some(19);

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("()")
    }
}

macro_rules! tuple_codec {
    ($codec:ident; $(($index:tt, $id:literal, $T:ident, $C:ident, $slot:ident)),+) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec<$($C),+> {
            $(pub $slot: $C,)+
        }

        impl<$($C),+> $codec<$($C),+> {
            pub fn new($($slot: $C),+) -> Self {
                Self { $($slot),+ }
            }
        }

        impl<$($T,)+ $($C),+> FieldCodec<($($T,)+)> for $codec<$($C),+>
        where
            $($T: Default + Send + Sync + 'static, $C: FieldCodec<$T>,)+
        {
            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: TypeKey,
                value: &($($T,)+),
            ) -> Result<()> {
                writer.session_mut().mark_value_field();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    TypeKey::of::<($($T,)+)>(),
                    WireType::TagDelimited,
                )?;
                // Consecutive ids, so every component is one past the last.
                $(self.$slot.write_field(writer, 1, TypeKey::of::<$T>(), &value.$index)?;)+
                writer.write_end_object();
                Ok(())
            }

            fn read_value(
                &self,
                reader: &mut Reader<'_>,
                header: &FieldHeader,
            ) -> Result<($($T,)+)> {
                expect_wire_type(header, WireType::TagDelimited, stringify!($codec))?;
                reader.session_mut().mark_value_field();
                $(let mut $slot = $T::default();)+
                reader.read_object(|reader, field_id, field| {
                    match field_id {
                        $($id => $slot = self.$slot.read_value(reader, field)?,)+
                        _ => reader.consume_unknown_field(field)?,
                    }
                    Ok(())
                })?;
                Ok(($($slot,)+))
            }
        }

        impl<$($T,)+ $($C),+> DeepCopier<($($T,)+)> for $codec<$($C),+>
        where
            $($T: Send + Sync + 'static, $C: DeepCopier<$T>,)+
        {
            fn deep_copy(
                &self,
                value: &($($T,)+),
                context: &mut CopyContext,
            ) -> Result<($($T,)+)> {
                Ok(($(self.$slot.deep_copy(&value.$index, context)?,)+))
            }
        }

        impl<$($T: Serializable + Default),+> Serializable for ($($T,)+) {
            type Codec = $codec<$($T::Codec),+>;

            fn type_name() -> Cow<'static, str> {
                let components: Vec<Cow<'static, str>> = vec![$($T::type_name()),+];
                Cow::Owned(format!("({})", components.join(",")))
            }

            fn build_codec(registry: &CodecRegistry) -> Result<Arc<dyn FieldCodec<Self>>> {
                Ok(Arc::new($codec::new($(registry.resolve_codec::<$T>()?),+)))
            }

            fn build_copier(registry: &CodecRegistry) -> Result<Arc<dyn DeepCopier<Self>>> {
                Ok(Arc::new($codec::new($(registry.resolve_copier::<$T>()?),+)))
            }
        }
    };
}

tuple_codec!(TupleCodec1; (0, 1, T1, C1, c1));
tuple_codec!(TupleCodec2; (0, 1, T1, C1, c1), (1, 2, T2, C2, c2));
tuple_codec!(TupleCodec3; (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3));
tuple_codec!(
    TupleCodec4;
    (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3), (3, 4, T4, C4, c4)
);
tuple_codec!(
    TupleCodec5;
    (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3), (3, 4, T4, C4, c4),
    (4, 5, T5, C5, c5)
);
tuple_codec!(
    TupleCodec6;
    (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3), (3, 4, T4, C4, c4),
    (4, 5, T5, C5, c5), (5, 6, T6, C6, c6)
);
tuple_codec!(
    TupleCodec7;
    (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3), (3, 4, T4, C4, c4),
    (4, 5, T5, C5, c5), (5, 6, T6, C6, c6), (6, 7, T7, C7, c7)
);
tuple_codec!(
    TupleCodec8;
    (0, 1, T1, C1, c1), (1, 2, T2, C2, c2), (2, 3, T3, C3, c3), (3, 4, T4, C4, c4),
    (4, 5, T5, C5, c5), (5, 6, T6, C6, c6), (6, 7, T7, C7, c7), (7, 8, TRest, CRest, rest)
);
