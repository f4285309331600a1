pub mod common;
pub mod compile;
pub mod dump;
pub mod vtables;
