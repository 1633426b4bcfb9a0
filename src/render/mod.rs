//! Frame rasterization and video assembly.

pub mod compositor;
pub mod frame;
