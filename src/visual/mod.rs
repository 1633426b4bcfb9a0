//! Image pool loading and per-unit image assignment.

pub mod assign;
pub mod pool;
