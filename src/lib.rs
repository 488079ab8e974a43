//! Introspection tooling for ROM-class images
//!
//! A ROM class is a read-only, position-independent, self-describing binary
//! encoding of a class: a fixed header followed by variable-length tables
//! (methods, fields, constant pool, optional attributes) that cross-reference
//! each other and a shared block of interned UTF8 strings through
//! self-relative pointers.
//!
//! This crate provides:
//!
//!   - [`rom`]: the format model, a typed view over a ROM-class blob, the
//!     slot vocabulary, and a depth-first walker that visits every scalar
//!     field, cross-reference and variable-length sub-block in physical
//!     order, reporting each to a caller-supplied visitor.
//!
//!   - [`dump`]: consumers of the walker, a region collector that
//!     materializes the walk into a flat sorted list of byte ranges, a
//!     linear (gap-accounted) dumper, an XML dumper, and a small
//!     `/name[index]` path-query engine over the sorted regions.
//!
//! ### Example
//!
//! ```
//! use romdump::rom::builder::RomClassBuilder;
//! use romdump::rom::RomClass;
//! use romdump::dump;
//!
//! # fn dump_class() -> Result<(), dump::Error> {
//! let bytes = RomClassBuilder::new("com/example/Foo").build();
//! let class = RomClass::new(&bytes).unwrap();
//!
//! let mut out = Vec::new();
//! dump::linear(&class, 0, 1, &(), &mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod dump;
pub mod rom;
