//! The ROM-class format model
//!
//! Everything needed to interpret a ROM-class blob without copying it: the
//! slot-type vocabulary, modifier flags, the typed [`RomClass`] view with its
//! bounds-checked self-relative-pointer resolution, modified-UTF8 decoding,
//! the bytecode operand tables, and the depth-first format walker.

mod class;
mod constant_pool;
mod flags;
mod slot;
mod utf8;
mod walk;

pub mod builder;
pub mod bytecode;

pub use class::*;
pub use constant_pool::*;
pub use flags::*;
pub use slot::*;
pub use utf8::*;
pub use walk::*;
