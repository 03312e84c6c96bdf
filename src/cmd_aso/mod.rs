//! Subcommand modules for the `aso` binary.

pub mod design;
pub mod dist;
pub mod gapmer;
pub mod maf;
pub mod wobble;
