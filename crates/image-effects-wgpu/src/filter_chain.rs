//! Filter chain execution
//!
//! [`FilterChain`] owns everything a render needs across calls: the resource
//! registry, the pipeline cache, the ping-pong textures and the output texture.
//! A render records every enabled filter into one command encoder, finishes with
//! a copy onto the output and submits once. Any error before submission,
//! including validation errors raised while recording, drops the command buffer,
//! so a failed render never reaches the GPU.

use crate::context::GpuContext;
use crate::error::{FilterChainError, Result};
use crate::filter::{BLUR_DIRECTIONS, BuiltinFilter, DIRECTION, FilterDescriptor, flatten_properties};
use crate::geometry::FullscreenTriangle;
use crate::ping_pong::{PingPong, TextureSlots};
use crate::pipeline_cache::{CompiledPipeline, PipelineCache, PipelineEntry};
use crate::resource_registry::{GpuResource, ResourceRegistry};
use crate::texture;

/// Registry names shared between the executor and the shaders
pub mod names {
    pub const SAMPLER: &str = "mySampler";
    pub const TEXTURE: &str = "myTexture";
    pub const AUX_TEXTURE: &str = "auxTexture";
    pub const VERTEX: &str = "vertex";
    pub const OUTPUT_TEXTURE: &str = "outputTexture";
}

/// Neutral height for the bevel filter until an auxiliary image is loaded
const AUX_PLACEHOLDER: [u8; 4] = [128, 128, 128, 255];

/// Chain-wide settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChainOptions {
    /// Format of the ping-pong textures every filter renders into
    pub intermediate_format: wgpu::TextureFormat,
    /// Filter mode of `mySampler`
    pub sampler_filter: wgpu::FilterMode,
    /// Color each render pass clears its target to
    pub clear_color: wgpu::Color,
}

impl Default for FilterChainOptions {
    fn default() -> Self {
        Self {
            intermediate_format: wgpu::TextureFormat::Rgba8Unorm,
            sampler_filter: wgpu::FilterMode::Linear,
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }
}

/// A texture together with its default view
#[derive(Debug, Clone)]
pub struct TargetTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl TargetTexture {
    fn new(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Applies ordered filter chains to images
#[derive(Debug)]
pub struct FilterChain {
    ctx: GpuContext,
    options: FilterChainOptions,
    registry: ResourceRegistry,
    pipelines: PipelineCache<CompiledPipeline>,
    slots: TextureSlots<TargetTexture>,
    aux: Option<TargetTexture>,
    output: Option<TargetTexture>,
}

fn check_size(image: &image::RgbaImage) -> Result<(u32, u32)> {
    match image.dimensions() {
        (0, height) => Err(FilterChainError::EmptyImage { width: 0, height }),
        (width, 0) => Err(FilterChainError::EmptyImage { width, height: 0 }),
        size => Ok(size),
    }
}

impl FilterChain {
    /// Creates a chain and its shared resources
    ///
    /// # Arguments
    /// * `ctx` - Device, queue and output format
    /// * `options` - Chain-wide settings
    pub fn new(ctx: GpuContext, options: FilterChainOptions) -> Self {
        let mut registry = ResourceRegistry::new();
        registry.set(names::VERTEX, FullscreenTriangle::create(&ctx.device));
        registry.set(names::SAMPLER, GpuResource::Sampler(texture::create_sampler(&ctx.device, options.sampler_filter)));

        let placeholder = texture::solid_texture(&ctx.device, &ctx.queue, names::AUX_TEXTURE, AUX_PLACEHOLDER);
        registry.set(names::AUX_TEXTURE, GpuResource::TextureView(TargetTexture::new(placeholder).view));

        Self {
            ctx,
            options,
            registry,
            pipelines: PipelineCache::new(),
            slots: TextureSlots::new(),
            aux: None,
            output: None,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn options(&self) -> &FilterChainOptions {
        &self.options
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn pipelines(&self) -> &PipelineCache<CompiledPipeline> {
        &self.pipelines
    }

    /// Mutable access to the pipeline cache, e.g. to invalidate a filter after changing its code
    pub fn pipelines_mut(&mut self) -> &mut PipelineCache<CompiledPipeline> {
        &mut self.pipelines
    }

    /// Input and intermediate textures of the last loaded image
    pub fn ping_pong(&self) -> Option<&PingPong<TargetTexture>> {
        self.slots.get()
    }

    /// Output texture of the last [`FilterChain::render`]
    pub fn output(&self) -> Option<&wgpu::Texture> {
        self.output.as_ref().map(|output| &output.texture)
    }

    /// Loads the base image
    ///
    /// The image is uploaded and the intermediate textures are recreated only
    /// when `key` is `None`, differs from the loaded key, or the size changed.
    /// The ping-pong cursor is reset in every case.
    ///
    /// # Arguments
    /// * `image` - Base image
    /// * `key` - Identity of the image content
    ///
    /// # Returns
    /// `true` if textures were (re)allocated
    pub fn load(&mut self, image: &image::RgbaImage, key: Option<&str>) -> Result<bool> {
        let size = check_size(image)?;
        let Self { ctx, options, slots, .. } = self;

        Ok(slots.load(key, size, |size| {
            let input = texture::upload_image(&ctx.device, &ctx.queue, "Input Texture", image);
            let a = texture::create_render_target(&ctx.device, "Ping-Pong Texture A", size, options.intermediate_format);
            let b = texture::create_render_target(&ctx.device, "Ping-Pong Texture B", size, options.intermediate_format);
            PingPong::new(TargetTexture::new(input), TargetTexture::new(a), TargetTexture::new(b))
        }))
    }

    /// Uploads the auxiliary image bound as `auxTexture`
    ///
    /// The texture is written in place while the size stays the same and only
    /// reallocated when it changes.
    pub fn load_auxiliary(&mut self, image: &image::RgbaImage) -> Result<()> {
        let size = check_size(image)?;
        if let Some(aux) = self.aux.as_ref().filter(|aux| (aux.texture.width(), aux.texture.height()) == size) {
            texture::write_rgba8(&self.ctx.queue, &aux.texture, image.as_raw(), size);
            return Ok(());
        }

        tracing::debug!(width = size.0, height = size.1, "allocating auxiliary texture");
        let aux = TargetTexture::new(texture::upload_image(&self.ctx.device, &self.ctx.queue, names::AUX_TEXTURE, image));
        self.registry.set(names::AUX_TEXTURE, GpuResource::TextureView(aux.view.clone()));
        self.aux = Some(aux);
        Ok(())
    }

    /// Texture of the last loaded auxiliary image
    pub fn auxiliary(&self) -> Option<&wgpu::Texture> {
        self.aux.as_ref().map(|aux| &aux.texture)
    }

    /// Renders a chain into the owned output texture
    ///
    /// # Arguments
    /// * `base` - Base image
    /// * `aux` - Auxiliary image, written into the auxiliary texture on every call when present
    /// * `filters` - Chain in application order; disabled entries are ignored
    /// * `key` - Identity of `base`, see [`FilterChain::load`]
    ///
    /// # Returns
    /// The output texture in the context's surface format
    pub fn render(&mut self, base: &image::RgbaImage, aux: Option<&image::RgbaImage>, filters: &[FilterDescriptor], key: Option<&str>) -> Result<&wgpu::Texture> {
        self.prepare(base, aux, key)?;

        let size = self.slots.size();
        let stale = self.output.as_ref().is_none_or(|output| (output.texture.width(), output.texture.height()) != size);
        if stale {
            tracing::debug!(width = size.0, height = size.1, "allocating output texture");
            let output = texture::create_texture(
                &self.ctx.device,
                "Output Texture",
                size,
                self.ctx.surface_format,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC,
            );
            self.output = Some(TargetTexture::new(output));
        }

        let target = match &self.output {
            Some(output) => output.view.clone(),
            None => return Err(FilterChainError::NotLoaded),
        };
        self.record_and_submit(filters, &target, self.ctx.surface_format)?;

        self.output.as_ref().map(|output| &output.texture).ok_or(FilterChainError::NotLoaded)
    }

    /// Renders a chain onto the current texture of a configured surface
    ///
    /// The surface must be configured with a size matching `base`. The caller
    /// presents the returned frame.
    pub fn render_to_surface(
        &mut self,
        surface: &wgpu::Surface<'_>,
        base: &image::RgbaImage,
        aux: Option<&image::RgbaImage>,
        filters: &[FilterDescriptor],
        key: Option<&str>,
    ) -> Result<wgpu::SurfaceTexture> {
        self.prepare(base, aux, key)?;

        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.record_and_submit(filters, &view, frame.texture.format())?;
        Ok(frame)
    }

    fn prepare(&mut self, base: &image::RgbaImage, aux: Option<&image::RgbaImage>, key: Option<&str>) -> Result<()> {
        self.load(base, key)?;
        if let Some(aux) = aux {
            self.load_auxiliary(aux)?;
        }
        Ok(())
    }

    /// Records every enabled filter plus the final copy, then submits once
    ///
    /// Recording runs inside a validation error scope. Bindings that only fail
    /// at draw or dispatch time, such as an undersized uniform buffer, are
    /// returned as [`FilterChainError::Validation`] and the command buffer is
    /// dropped without being submitted.
    fn record_and_submit(&mut self, filters: &[FilterDescriptor], target: &wgpu::TextureView, target_format: wgpu::TextureFormat) -> Result<()> {
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let recorded = self.record(filters, target, target_format);
        let validation = pollster::block_on(self.ctx.device.pop_error_scope());

        let command_buffer = recorded?;
        if let Some(error) = validation {
            tracing::error!(%error, "filter chain failed validation");
            return Err(FilterChainError::Validation { message: error.to_string() });
        }

        self.ctx.queue.submit(std::iter::once(command_buffer));
        Ok(())
    }

    fn record(&mut self, filters: &[FilterDescriptor], target: &wgpu::TextureView, target_format: wgpu::TextureFormat) -> Result<wgpu::CommandBuffer> {
        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Filter Chain") });

        for filter in filters.iter().filter(|filter| filter.enabled) {
            if filter.is_noop() {
                tracing::debug!(filter = %filter.filter_type, "skipping filter with non-finite intensity");
                continue;
            }
            self.record_filter(&mut encoder, filter)?;
        }
        self.record_copy(&mut encoder, target, target_format)?;

        Ok(encoder.finish())
    }

    /// Uploads a filter's uniforms and records all of its passes
    fn record_filter(&mut self, encoder: &mut wgpu::CommandEncoder, filter: &FilterDescriptor) -> Result<()> {
        let source = match &filter.code {
            Some(code) => code.as_str(),
            None => BuiltinFilter::from_name(&filter.filter_type)
                .ok_or_else(|| FilterChainError::UnknownFilterType(filter.filter_type.clone()))?
                .source(),
        };

        let Self {
            ctx,
            options,
            registry,
            pipelines,
            slots,
            ..
        } = self;

        let uniforms = flatten_properties(&filter.properties);
        registry.update_buffer(&ctx.device, &ctx.queue, &filter.uniform_name(), bytemuck::cast_slice(&uniforms));

        let passes = filter.passes();
        if passes > 1 {
            let directions: Vec<&[u8]> = BLUR_DIRECTIONS.iter().map(|direction| bytemuck::cast_slice(direction.as_slice())).collect();
            registry.update_buffer_array(&ctx.device, &ctx.queue, DIRECTION, &directions);
        }

        let entry = pipelines.get_or_compile_wgpu(&ctx.device, &filter.filter_type, source, options.intermediate_format)?;
        let size = slots.size();
        let ping_pong = slots.get_mut().ok_or(FilterChainError::NotLoaded)?;

        for pass in 0..passes {
            let pair = ping_pong.next();
            let (source, target) = (pair.source.view.clone(), pair.target.view.clone());

            registry.set(names::TEXTURE, GpuResource::TextureView(source));
            if matches!(entry.pipeline, CompiledPipeline::Compute { .. }) {
                registry.set(names::OUTPUT_TEXTURE, GpuResource::TextureView(target.clone()));
            }

            encode_pass(ctx, options, registry, encoder, &filter.filter_type, entry, &target, size, pass)?;
        }
        Ok(())
    }

    /// Draws the current chain result onto `target` with the copy shader
    fn record_copy(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, target_format: wgpu::TextureFormat) -> Result<()> {
        let Self {
            ctx,
            options,
            registry,
            pipelines,
            slots,
            ..
        } = self;

        // The copy pipeline is compiled per output format
        let name = format!("{}@{target_format:?}", BuiltinFilter::Copy.name());
        let entry = pipelines.get_or_compile_wgpu(&ctx.device, &name, BuiltinFilter::Copy.source(), target_format)?;
        let size = slots.size();
        let ping_pong = slots.get_mut().ok_or(FilterChainError::NotLoaded)?;

        let source = ping_pong.next().source.view.clone();
        registry.set(names::TEXTURE, GpuResource::TextureView(source));

        encode_pass(ctx, options, registry, encoder, &name, entry, target, size, 0)
    }
}

/// Records one draw or dispatch of `entry` writing to `target`
#[allow(clippy::too_many_arguments)]
fn encode_pass(
    ctx: &GpuContext,
    options: &FilterChainOptions,
    registry: &ResourceRegistry,
    encoder: &mut wgpu::CommandEncoder,
    name: &str,
    entry: &PipelineEntry<CompiledPipeline>,
    target: &wgpu::TextureView,
    (width, height): (u32, u32),
    pass: usize,
) -> Result<()> {
    let bind_groups = registry.resolve_bind_groups(&ctx.device, name, &entry.group_layouts, entry.pipeline.bind_group_layouts(), pass)?;

    match &entry.pipeline {
        CompiledPipeline::Render { pipeline, .. } => {
            let (vertex_buffer, vertex_count) = registry.vertex(names::VERTEX)?;

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(name),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(options.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            render_pass.set_pipeline(pipeline);
            for (group, bind_group) in &bind_groups {
                render_pass.set_bind_group(*group, bind_group, &[]);
            }
            render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }
        CompiledPipeline::Compute { pipeline, workgroup_size, .. } => {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(name),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(pipeline);
            for (group, bind_group) in &bind_groups {
                compute_pass.set_bind_group(*group, bind_group, &[]);
            }
            compute_pass.dispatch_workgroups(width.div_ceil(workgroup_size[0].max(1)), height.div_ceil(workgroup_size[1].max(1)), 1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = FilterChainOptions::default();
        assert_eq!(options.intermediate_format, wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(options.sampler_filter, wgpu::FilterMode::Linear);
        assert_eq!(options.clear_color, wgpu::Color::TRANSPARENT);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let image = image::RgbaImage::new(0, 4);
        assert!(matches!(check_size(&image), Err(FilterChainError::EmptyImage { width: 0, height: 4 })));
        assert_eq!(check_size(&image::RgbaImage::new(3, 2)).unwrap(), (3, 2));
    }
}
