//! Manifest handling and fragment assembly.

pub mod assembler;
pub mod manifest;

pub use assembler::{Assembler, AssemblyMode};
pub use manifest::{MANIFEST_FILE_NAME, Manifest};
