//! Low-level, bounds-checked little-endian reads.
//!
//! Everything in a PE image and in ECMA-335 metadata is stored little-endian. This module
//! provides the primitive readers every other parser in the crate is built on. They never panic:
//! a read that would run past the end of the buffer yields [`crate::Error::UnexpectedEndOfData`].
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Fixed-width integer types that can be decoded from bytes
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::read_le_at_dyn`] - Read a 2- or 4-byte index, widened to `u32`
//!
//! # Examples
//!
//! ```rust
//! use cildiff::file::io::{read_le, read_le_at, read_le_at_dyn};
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! assert_eq!(read_le::<u16>(&data)?, 1);
//!
//! let mut offset = 2;
//! assert_eq!(read_le_at::<u16>(&data, &mut offset)?, 2);
//! assert_eq!(read_le_at_dyn(&data, &mut offset, true)?, 3);
//! assert_eq!(offset, 8);
//! # Ok::<(), cildiff::Error>(())
//! ```

use crate::Result;

/// Fixed-width integer types that can be decoded from a little-endian byte array.
///
/// Each implementation names the byte array it is decoded from, so [`read_le_at`] can slice the
/// exact number of bytes and convert without any unsafe code.
pub trait CilIO: Sized {
    /// Byte array representation of this type (e.g. `[u8; 4]` for `u32`).
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decode the value from its little-endian representation.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cilio {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cilio!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::UnexpectedEndOfData`] if `data` is shorter than `T`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` at `offset`, advancing `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::UnexpectedEndOfData`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };

    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Reads either a 2-byte or a 4-byte index, widening the result to `u32`.
///
/// Heap and table indices in the metadata tables are stored in 2 bytes unless the heap or table
/// they address is too large, in which case they take 4; `is_large` selects the width.
///
/// # Errors
/// Returns [`crate::Error::UnexpectedEndOfData`] if the buffer is too short.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}
