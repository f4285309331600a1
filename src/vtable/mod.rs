//! Virtual dispatch table layout.
//!
//! Every type the compiler touches gets a [`VTableBuilder`] that sorts its instance methods into
//! virtual, abstract and non-virtual groups and patches the tables it inherits: overrides
//! replace the base class slot they override, interface implementations replace the interface
//! slot they implement. The [`VTableCache`] memoizes builders per type and, at the end of a
//! compilation, emits one finalized [`VTable`] per type.
//!
//! # Layout
//!
//! A finalized table is a sequence of slot regions, each one header pointer followed by one
//! pointer per slot:
//!
//! ```text
//! +-------------------+  parent_offset = 0
//! | Derived slots     |
//! +-------------------+
//! | Base slots        |
//! +-------------------+
//! | ... base chain    |
//! +-------------------+
//! | Interface slots   |  (root level only)
//! +-------------------+  type_conversion_table_offset
//! | conversion table  |
//! +-------------------+
//! ```
//!
//! The type conversion table maps each ancestor and interface name to the start of its
//! region, which is what an upcast or interface lookup adds to the object's table pointer.

mod builder;
mod cache;
mod table;

pub use builder::VTableBuilder;
pub use cache::{TypeCache, VTableCache};
pub use table::{Slot, SlotRegion, VTable};
