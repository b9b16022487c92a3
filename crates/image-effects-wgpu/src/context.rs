//! GPU device context
//!
//! A [`GpuContext`] bundles the device, its queue and the format of the final
//! output. Applications that already own a device hand it in with
//! [`GpuContext::new`]; tools and tests can acquire a headless one.

use std::sync::OnceLock;

use crate::error::Result;

static SHARED_HEADLESS: OnceLock<GpuContext> = OnceLock::new();

/// Device, queue and output format used by a filter chain
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the output texture or window surface
    pub surface_format: wgpu::TextureFormat,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, surface_format: wgpu::TextureFormat) -> Self {
        Self { device, queue, surface_format }
    }

    /// Acquires a headless device on the primary backends
    ///
    /// The output format is `Rgba8Unorm`, which reads back directly into
    /// [`image::RgbaImage`].
    pub async fn request() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("image-effects"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await?;

        tracing::debug!(adapter = ?adapter.get_info(), "acquired headless device");
        Ok(Self::new(device, queue, wgpu::TextureFormat::Rgba8Unorm))
    }

    /// Returns a process-wide headless context, acquiring it on first use
    ///
    /// A failed acquisition is not memoized, so a later call tries again.
    pub fn shared_headless() -> Result<&'static GpuContext> {
        if let Some(ctx) = SHARED_HEADLESS.get() {
            return Ok(ctx);
        }
        let ctx = pollster::block_on(Self::request())?;
        Ok(SHARED_HEADLESS.get_or_init(|| ctx))
    }
}
