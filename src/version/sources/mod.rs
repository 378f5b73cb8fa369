//! Version source implementations

pub mod mirror;

pub use mirror::MirrorSource;
