pub mod names;
pub mod plan;
