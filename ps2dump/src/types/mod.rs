/*!
Module with basic types used in ps2dump.

It exposes the byte size helpers and the `ByteSwap` trait used to keep
plain-old-data records little endian regardless of the host.
*/

pub mod size;

pub mod byte_swap;
#[doc(hidden)]
pub use byte_swap::{from_le, to_le, ByteSwap};
