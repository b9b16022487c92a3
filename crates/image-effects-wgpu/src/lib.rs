//! Reflection-driven image filter chains on wgpu
//!
//! This crate applies an ordered chain of GPU filters (noise, warp, two-pass
//! blur, bevel, or caller-supplied WGSL) to a still image. Pipelines and bind
//! groups are derived from the shader source itself: bindings are reflected from
//! the WGSL, resources are looked up by variable name, and intermediate results
//! alternate between two ping-pong textures.
//!
//! ```no_run
//! use image_effects_wgpu::{FilterChain, FilterChainOptions, FilterDescriptor, GpuContext};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = GpuContext::shared_headless()?.clone();
//! let mut chain = FilterChain::new(ctx, FilterChainOptions::default());
//! let image = image::RgbaImage::new(64, 64);
//! let filters = [FilterDescriptor::noise(30.0, 1.0, 2.0), FilterDescriptor::blur(4.0)];
//! let output = chain.render(&image, None, &filters, Some("example"))?;
//! assert_eq!(output.width(), 64);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod filter;
pub mod filter_chain;
pub mod geometry;
pub mod layout;
pub mod ping_pong;
pub mod pipeline_cache;
pub mod reflect;
pub mod resource_registry;
pub mod shaders;
pub mod texture;

pub use context::GpuContext;
pub use error::{FilterChainError, ReflectionError, RegistryError, Result};
pub use filter::{BevelParams, BuiltinFilter, FilterDescriptor, Property, PropertyValue, flatten_properties};
pub use filter_chain::{FilterChain, FilterChainOptions};
pub use reflect::{ShaderReflection, reflect};
