//! CARv1 packing and unpacking (C2).

mod hash;
mod header;
mod pack;
mod unpack;
mod varint;

pub use header::CarHeader;
pub use pack::pack;
pub use unpack::{unpack, unpack_stream, UnpackedCar};
