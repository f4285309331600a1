//! Shared low-level helpers: little-endian primitive I/O and a small XML element tree.

mod io;
mod xml;

pub(crate) use io::{read_le_at, write_le, WireIO};
pub(crate) use xml::XmlNode;
