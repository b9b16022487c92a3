//! Verification utilities for image-effects-wgpu
//!
//! This crate renders filter chains on a real device and checks the properties
//! the chain guarantees: pass-through when nothing applies, stable textures for
//! a repeated image key, and working custom render and compute shaders.

pub mod checks;
pub mod compare;
pub mod wgpu_helpers;
