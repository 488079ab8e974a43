//! Rendering and querying a ROM class through its sorted region list
//!
//! Everything here is a consumer of [`crate::rom::all_slots_do`]: the region
//! collector flattens a walk into sorted byte ranges, the linear dumper
//! renders them with gap accounting, the XML dumper renders them fully
//! expanded, and the query engine matches `/name[index]` paths against them.

use std::fmt;
use std::io;

mod linear;
mod query;
mod regions;
mod xml;

pub use linear::linear;
pub use query::{query, query_batch};
pub use regions::{gather, Region};
pub use xml::xml;

/// Failures a dump or query can hit; range-validation rejections are not
/// errors and never surface here.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// The walk visited nothing, i.e. the validator rejected the record's
    /// own size field
    EmptyLayout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "output error: {}", err),
            Error::EmptyLayout => write!(f, "record layout is empty or unreadable"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::EmptyLayout => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
