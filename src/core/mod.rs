pub mod identity;
pub mod structure;
pub mod vectors;
