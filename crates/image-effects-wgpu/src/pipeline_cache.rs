//! Lazily compiled, name-keyed pipelines
//!
//! A pipeline is compiled the first time its name is requested and reused for
//! every later request under that name. The cached entry is returned as is even
//! if a different source is passed later; call [`PipelineCache::invalidate`] to
//! force a rebuild.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{FilterChainError, Result};
use crate::geometry::Vertex;
use crate::layout::{GroupLayout, build_group_layouts, create_bind_group_layouts};
use crate::reflect::{ShaderReflection, ShaderStageKind, reflect};

/// A compiled pipeline together with the reflection it was built from
#[derive(Debug)]
pub struct PipelineEntry<P> {
    /// Reflection of the shader source
    pub reflection: ShaderReflection,
    /// Bindings grouped by `@group`
    pub group_layouts: Vec<GroupLayout>,
    /// The compiled pipeline
    pub pipeline: P,
}

/// Memo table from pipeline name to compiled entry
#[derive(Debug)]
pub struct PipelineCache<P> {
    entries: HashMap<String, PipelineEntry<P>>,
}

impl<P> Default for PipelineCache<P> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<P> PipelineCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `name`, compiling it from `source` on a miss
    ///
    /// # Arguments
    /// * `name` - Cache key, normally the filter type
    /// * `source` - WGSL source, only read on a miss
    /// * `compile` - Builds the pipeline from the reflection and group layouts
    ///
    /// # Returns
    /// The cached entry, or the compile error (nothing is cached in that case)
    pub fn get_or_compile<E>(&mut self, name: &str, source: &str, compile: impl FnOnce(&ShaderReflection, &[GroupLayout]) -> std::result::Result<P, E>) -> std::result::Result<&PipelineEntry<P>, E> {
        match self.entries.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let reflection = reflect(source);
                let group_layouts = build_group_layouts(&reflection.bindings);
                let pipeline = compile(&reflection, &group_layouts)?;
                tracing::debug!(name, compute = reflection.is_compute(), "compiled pipeline");
                Ok(&*entry.insert(PipelineEntry {
                    reflection,
                    group_layouts,
                    pipeline,
                }))
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PipelineEntry<P>> {
        self.entries.get(name)
    }

    /// Drops the entry for `name`, returning whether one existed
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A pipeline ready to record into a pass
#[derive(Debug)]
pub enum CompiledPipeline {
    Render {
        pipeline: wgpu::RenderPipeline,
        /// Dense layouts indexed by group number
        bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    },
    Compute {
        pipeline: wgpu::ComputePipeline,
        workgroup_size: [u32; 3],
        /// Dense layouts indexed by group number
        bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    },
}

impl CompiledPipeline {
    pub fn bind_group_layouts(&self) -> &[wgpu::BindGroupLayout] {
        match self {
            CompiledPipeline::Render { bind_group_layouts, .. } | CompiledPipeline::Compute { bind_group_layouts, .. } => bind_group_layouts,
        }
    }
}

fn non_empty(entry: &str) -> Option<&str> {
    (!entry.is_empty()).then_some(entry)
}

/// Compiles a reflected shader into a render or compute pipeline
///
/// Shader module and pipeline creation run inside a validation error scope so
/// that invalid shaders are returned as errors instead of reaching the device's
/// uncaptured error handler.
///
/// # Arguments
/// * `device` - The wgpu device for pipeline creation
/// * `name` - Pipeline name, used for labels and errors
/// * `source` - WGSL shader source
/// * `reflection` - Reflection of `source`
/// * `group_layouts` - Bindings grouped by `@group`
/// * `target_format` - Color target format of render pipelines
///
/// # Returns
/// The compiled pipeline with its bind group layouts
pub fn compile_pipeline(
    device: &wgpu::Device,
    name: &str,
    source: &str,
    reflection: &ShaderReflection,
    group_layouts: &[GroupLayout],
    target_format: wgpu::TextureFormat,
) -> Result<CompiledPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(name),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let bind_group_layouts = create_bind_group_layouts(device, name, group_layouts);
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(name),
        bind_group_layouts: &bind_group_layouts.iter().collect::<Vec<_>>(),
        push_constant_ranges: &[],
    });

    let compiled = match &reflection.stage {
        ShaderStageKind::Compute { entry, workgroup_size } => CompiledPipeline::Compute {
            pipeline: device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(name),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: non_empty(entry),
                compilation_options: Default::default(),
                cache: None,
            }),
            workgroup_size: *workgroup_size,
            bind_group_layouts,
        },
        ShaderStageKind::Render { vertex_entry, fragment_entry } => CompiledPipeline::Render {
            pipeline: device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: non_empty(vertex_entry),
                    buffers: &[Vertex::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: non_empty(fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            }),
            bind_group_layouts,
        },
    };

    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(FilterChainError::PipelineCompilation {
            name: name.to_string(),
            message: error.to_string(),
        }),
        None => Ok(compiled),
    }
}

impl PipelineCache<CompiledPipeline> {
    /// Returns the wgpu pipeline for `name`, compiling `source` on a miss
    pub fn get_or_compile_wgpu(&mut self, device: &wgpu::Device, name: &str, source: &str, target_format: wgpu::TextureFormat) -> Result<&PipelineEntry<CompiledPipeline>> {
        self.get_or_compile(name, source, |reflection, group_layouts| compile_pipeline(device, name, source, reflection, group_layouts, target_format))
    }
}
