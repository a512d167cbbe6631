//! Asset loading/parsers.
//! OBJ subset loader producing flat, per-corner attribute sequences.

pub mod mesh;
pub mod obj;
