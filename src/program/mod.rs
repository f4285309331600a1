//! Program model and its binary image.
//!
//! [`Records`] aggregates everything a compilation emits: [`TypeRecord`]s for the field
//! layouts of every discovered type, [`MethodRecord`]s holding each translated body as a
//! sequence of [`SsaToken`]s, and the table of native bindings. [`ProgramWriter`] and
//! [`ProgramReader`] convert between records and the image consumed by the code generator.

mod image;
mod records;

pub use image::{ProgramReader, ProgramWriter, IMAGE_MAGIC};
pub use records::{MethodRecord, Records, SsaToken, TypeRecord};
