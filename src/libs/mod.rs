pub mod coverage;
pub mod design;
pub mod error;
pub mod gapmer;
pub mod io;
pub mod locus;
pub mod maf;
pub mod maf_index;
pub mod oligo;
pub mod query;
pub mod wobble;
