//! Fixed-dimension coordinate arithmetic shared by every layer of the crate.

pub mod vector;
