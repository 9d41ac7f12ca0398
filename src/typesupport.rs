// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-support: the opaque descriptor the engine consumes for a topic type.
//!
//! The engine never inspects a sample's field layout itself — it asks the
//! type support for a marshalled size, a marshal/unmarshal round-trip, and a
//! 16-byte instance key hash. Concrete implementations (generated bindings,
//! reflection-based descriptors) live outside this crate; [`TypeDescriptor`]
//! here is a minimal reference implementation covering fixed-layout structs,
//! grounded on the teacher's runtime field-layout metadata.

use crate::error::{Error, Result};
use crate::types::InstanceHandle;

/// Per-field runtime layout, describing a single member of a topic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    Sequence,
    Array,
    Struct,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
}

/// Layout of a single field, used to locate key fields within a marshalled
/// sample without parsing the rest of it.
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset_bytes: u32,
    pub field_type: FieldType,
    pub size_bytes: u32,
    pub is_key: bool,
}

/// Opaque type-support interface consumed by the history cache, writer, and
/// reader state machines. `data` below is always a pre-marshalled CDR
/// payload; this crate carries bytes end to end and never interprets a
/// sample's application-defined fields beyond what the key layout exposes.
pub trait TypeSupport: Send + Sync {
    /// Stable name used for SEDP type matching ([`type_equal`]).
    fn type_name(&self) -> &str;

    /// Marshalled size of `data` once encoded, before encoding it. For
    /// fixed-size types this is a constant; for variable-size types it must
    /// inspect `data`'s logical length fields.
    fn marshalled_size(&self, data: &[u8]) -> usize;

    /// Encode `data` into `buf`, returning the number of bytes written.
    /// `swap_endian` requests byte-swapped (non-native) CDR encoding, as
    /// negotiated per RTPS Sec.9.4.5.3 from the submessage's endianness flag.
    fn marshall(&self, buf: &mut [u8], data: &[u8], swap_endian: bool) -> Result<usize>;

    /// Decode a wire payload into the type's native representation.
    fn unmarshall(&self, buf: &[u8], swap_endian: bool) -> Result<Vec<u8>>;

    /// Compute the 16-byte instance key hash (RTPS Sec.9.6.3.3) used to group
    /// samples of a keyed topic into instances.
    fn key_hash(&self, data: &[u8]) -> InstanceHandle;
}

/// Two type supports describe the same wire type iff their names match —
/// SEDP publishes type names, not structural descriptors, so this is the
/// only equality the engine can check without out-of-band IDL agreement.
#[must_use]
pub fn type_equal(a: &dyn TypeSupport, b: &dyn TypeSupport) -> bool {
    a.type_name() == b.type_name()
}

/// Reference [`TypeSupport`] for a fixed-layout struct type: every field has
/// a known offset and size, and the sample is a flat byte buffer (already
/// laid out the way CDR would encode it, modulo endianness).
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub size_bytes: u32,
    pub fields: Vec<FieldLayout>,
}

impl TypeDescriptor {
    #[must_use]
    pub fn new(type_name: impl Into<String>, size_bytes: u32, fields: Vec<FieldLayout>) -> Self {
        Self { type_name: type_name.into(), size_bytes, fields }
    }

    fn key_fields(&self) -> impl Iterator<Item = &FieldLayout> {
        self.fields.iter().filter(|f| f.is_key)
    }
}

impl TypeSupport for TypeDescriptor {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn marshalled_size(&self, _data: &[u8]) -> usize {
        self.size_bytes as usize
    }

    fn marshall(&self, buf: &mut [u8], data: &[u8], swap_endian: bool) -> Result<usize> {
        let size = self.size_bytes as usize;
        if buf.len() < size || data.len() < size {
            return Err(Error::BufferTooSmall);
        }
        buf[..size].copy_from_slice(&data[..size]);
        if swap_endian {
            swap_fields(&mut buf[..size], &self.fields);
        }
        Ok(size)
    }

    fn unmarshall(&self, buf: &[u8], swap_endian: bool) -> Result<Vec<u8>> {
        let size = self.size_bytes as usize;
        if buf.len() < size {
            return Err(Error::BufferTooSmall);
        }
        let mut out = buf[..size].to_vec();
        if swap_endian {
            swap_fields(&mut out, &self.fields);
        }
        Ok(out)
    }

    fn key_hash(&self, data: &[u8]) -> InstanceHandle {
        let mut hash = [0u8; 16];
        let mut cursor = 0usize;
        for field in self.key_fields() {
            let start = field.offset_bytes as usize;
            let len = field.size_bytes as usize;
            let Some(bytes) = data.get(start..start + len) else { continue };
            for &b in bytes {
                hash[cursor % 16] ^= b;
                cursor += 1;
            }
        }
        hash
    }
}

fn swap_fields(buf: &mut [u8], fields: &[FieldLayout]) {
    for field in fields {
        let start = field.offset_bytes as usize;
        let len = field.size_bytes as usize;
        if let Some(slice) = buf.get_mut(start..start + len) {
            if matches!(field.field_type, FieldType::Primitive(_)) && len > 1 {
                slice.reverse();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_descriptor() -> TypeDescriptor {
        TypeDescriptor::new(
            "Point",
            8,
            vec![
                FieldLayout {
                    name: "x",
                    offset_bytes: 0,
                    field_type: FieldType::Primitive(PrimitiveKind::I32),
                    size_bytes: 4,
                    is_key: true,
                },
                FieldLayout {
                    name: "y",
                    offset_bytes: 4,
                    field_type: FieldType::Primitive(PrimitiveKind::I32),
                    size_bytes: 4,
                    is_key: false,
                },
            ],
        )
    }

    #[test]
    fn marshall_round_trips_without_swap() {
        let ts = point_descriptor();
        let data = 10i32.to_ne_bytes().iter().chain(20i32.to_ne_bytes().iter()).copied().collect::<Vec<u8>>();
        let mut buf = vec![0u8; 8];
        let written = ts.marshall(&mut buf, &data, false).unwrap();
        assert_eq!(written, 8);
        let back = ts.unmarshall(&buf, false).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn marshall_rejects_undersized_buffer() {
        let ts = point_descriptor();
        let data = vec![0u8; 8];
        let mut buf = vec![0u8; 4];
        assert!(ts.marshall(&mut buf, &data, false).is_err());
    }

    #[test]
    fn key_hash_depends_only_on_key_fields() {
        let ts = point_descriptor();
        let a = 1i32.to_ne_bytes().iter().chain(99i32.to_ne_bytes().iter()).copied().collect::<Vec<u8>>();
        let b = 1i32.to_ne_bytes().iter().chain(42i32.to_ne_bytes().iter()).copied().collect::<Vec<u8>>();
        assert_eq!(ts.key_hash(&a), ts.key_hash(&b));
    }

    #[test]
    fn key_hash_differs_for_different_keys() {
        let ts = point_descriptor();
        let a = 1i32.to_ne_bytes().iter().chain(0i32.to_ne_bytes().iter()).copied().collect::<Vec<u8>>();
        let b = 2i32.to_ne_bytes().iter().chain(0i32.to_ne_bytes().iter()).copied().collect::<Vec<u8>>();
        assert_ne!(ts.key_hash(&a), ts.key_hash(&b));
    }

    #[test]
    fn type_equal_compares_by_name_only() {
        let a = point_descriptor();
        let b = TypeDescriptor::new("Point", 16, vec![]);
        let c = TypeDescriptor::new("Velocity", 8, vec![]);
        assert!(type_equal(&a, &b));
        assert!(!type_equal(&a, &c));
    }
}
