//! Fixed-layout binary records.
//!
//! A [`Record`] has a constant encoded size and converts to and from exactly that many bytes.
//! Primitive numbers use native byte order; arrays and structs declared with
//! [`impl_record!`](crate::impl_record) concatenate their elements with no padding.

/// A value with a fixed binary layout.
pub trait Record: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes the value into `out`, which is exactly [`Self::SIZE`] bytes long.
    fn encode(&self, out: &mut [u8]);

    /// Reads a value from `bytes`, which is exactly [`Self::SIZE`] bytes long.
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_primitive_record!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl Record for bool {
    const SIZE: usize = 1;

    fn encode(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

impl<T: Record, const N: usize> Record for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn encode(&self, out: &mut [u8]) {
        for (item, slot) in self.iter().zip(out.chunks_exact_mut(T::SIZE.max(1))) {
            item.encode(&mut slot[..T::SIZE]);
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::decode(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }
}

/// Encodes `values` back to back into `out`, replacing its contents.
pub(crate) fn encode_all<T: Record>(values: &[T], out: &mut Vec<u8>) {
    out.clear();
    out.resize(values.len() * T::SIZE, 0);
    if T::SIZE == 0 {
        return;
    }
    for (value, slot) in values.iter().zip(out.chunks_exact_mut(T::SIZE)) {
        value.encode(slot);
    }
}

/// Implements [`Record`] for a struct with named fields, laid out in declaration order.
///
/// ```
/// use filestream::{impl_record, Record};
///
/// #[derive(Debug, PartialEq)]
/// struct Sample {
///     id: u32,
///     value: f64,
/// }
///
/// impl_record!(Sample { id: u32, value: f64 });
///
/// assert_eq!(Sample::SIZE, 12);
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::Record for $ty {
            const SIZE: usize = 0 $(+ <$fty as $crate::Record>::SIZE)*;

            #[allow(unused_assignments, unused_variables, unused_mut)]
            fn encode(&self, out: &mut [u8]) {
                let mut offset = 0usize;
                $(
                    let size = <$fty as $crate::Record>::SIZE;
                    <$fty as $crate::Record>::encode(&self.$field, &mut out[offset..offset + size]);
                    offset += size;
                )*
            }

            #[allow(unused_assignments, unused_variables, unused_mut)]
            fn decode(bytes: &[u8]) -> Self {
                let mut offset = 0usize;
                $(
                    let size = <$fty as $crate::Record>::SIZE;
                    let $field = <$fty as $crate::Record>::decode(&bytes[offset..offset + size]);
                    offset += size;
                )*
                Self { $($field),* }
            }
        }
    };
}
