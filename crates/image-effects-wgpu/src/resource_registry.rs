//! Name-keyed store of bindable GPU resources
//!
//! Shaders refer to resources by variable name (`mySampler`, `myTexture`,
//! `<type>_uniforms`, ...). The registry maps those names to the resources that
//! get bound, either a single resource or an indexed array of them for filters
//! that run several passes with different parameters.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::layout::GroupLayout;
use crate::reflect::BindingKind;

/// Smallest buffer the registry allocates
const MIN_BUFFER_SIZE: u64 = 16;

/// Kind of a stored resource, used to check it against a binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Sampler,
    TextureView,
    Vertex,
}

impl ResourceKind {
    /// The resource kind a reflected binding must be bound to
    pub fn for_binding(kind: &BindingKind) -> Self {
        match kind {
            BindingKind::Buffer { .. } => ResourceKind::Buffer,
            BindingKind::Sampler { .. } => ResourceKind::Sampler,
            BindingKind::Texture { .. } | BindingKind::StorageTexture { .. } => ResourceKind::TextureView,
        }
    }
}

/// Anything the registry can hold
pub trait Resource {
    fn kind(&self) -> ResourceKind;
}

/// A bindable GPU resource
#[derive(Debug, Clone)]
pub enum GpuResource {
    Buffer(wgpu::Buffer),
    Sampler(wgpu::Sampler),
    TextureView(wgpu::TextureView),
    /// Vertex buffer with its vertex count
    Vertex { buffer: wgpu::Buffer, count: u32 },
}

impl Resource for GpuResource {
    fn kind(&self) -> ResourceKind {
        match self {
            GpuResource::Buffer(_) => ResourceKind::Buffer,
            GpuResource::Sampler(_) => ResourceKind::Sampler,
            GpuResource::TextureView(_) => ResourceKind::TextureView,
            GpuResource::Vertex { .. } => ResourceKind::Vertex,
        }
    }
}

/// A registry entry
#[derive(Debug, Clone)]
pub enum ResourceBinding<R> {
    Single(R),
    /// Indexed by pass selector
    Array(Vec<R>),
}

/// Name-keyed resource table; the last writer of a name wins
#[derive(Debug)]
pub struct ResourceRegistry<R = GpuResource> {
    entries: HashMap<String, ResourceBinding<R>>,
}

impl<R> Default for ResourceRegistry<R> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<R: Resource> ResourceRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a single resource under `name`
    pub fn set(&mut self, name: impl Into<String>, resource: R) {
        self.entries.insert(name.into(), ResourceBinding::Single(resource));
    }

    /// Stores a resource array under `name`
    pub fn set_array(&mut self, name: impl Into<String>, resources: Vec<R>) {
        self.entries.insert(name.into(), ResourceBinding::Array(resources));
    }

    pub fn get(&self, name: &str) -> Option<&ResourceBinding<R>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolves `name` to a resource of the expected kind
    ///
    /// Arrays are indexed by `selector`; single resources ignore it.
    ///
    /// # Arguments
    /// * `name` - Resource name as used in the shader
    /// * `selector` - Array element to pick, typically the pass index
    /// * `expected` - Kind the binding slot requires
    ///
    /// # Returns
    /// The resource, or the reason it could not be used
    pub fn lookup(&self, name: &str, selector: usize, expected: ResourceKind) -> Result<&R, RegistryError> {
        let binding = self.entries.get(name).ok_or_else(|| RegistryError::Unset { name: name.to_string() })?;

        let resource = match binding {
            ResourceBinding::Single(resource) => resource,
            ResourceBinding::Array(resources) => resources.get(selector).ok_or_else(|| RegistryError::IndexOutOfRange {
                name: name.to_string(),
                index: selector,
                len: resources.len(),
            })?,
        };

        let found = resource.kind();
        if found != expected {
            return Err(RegistryError::WrongKind {
                name: name.to_string(),
                expected,
                found,
            });
        }
        Ok(resource)
    }
}

/// Size of the buffer allocated for `len` bytes of data
pub fn buffer_size(len: usize) -> u64 {
    ((len as u64).div_ceil(4) * 4).max(MIN_BUFFER_SIZE)
}

/// Writes `data` into `buffer`, zero-filling the rest of it
fn write_padded(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &[u8]) {
    let mut padded = vec![0u8; buffer.size() as usize];
    padded[..data.len()].copy_from_slice(data);
    queue.write_buffer(buffer, 0, &padded);
}

fn create_buffer(device: &wgpu::Device, label: &str, len: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: buffer_size(len),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Reuses `existing` when it is a buffer large enough for `data`, otherwise allocates a new one
fn upload(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, existing: Option<&GpuResource>, data: &[u8]) -> wgpu::Buffer {
    let buffer = match existing {
        Some(GpuResource::Buffer(buffer)) if buffer.size() >= data.len() as u64 => buffer.clone(),
        _ => {
            tracing::debug!(name = label, bytes = data.len(), "allocating buffer");
            create_buffer(device, label, data.len())
        }
    };
    write_padded(queue, &buffer, data);
    buffer
}

impl ResourceRegistry<GpuResource> {
    /// Uploads `data` into the buffer named `name`
    ///
    /// The buffer is created on first use and written in place afterwards. It is
    /// only recreated when `data` no longer fits.
    pub fn update_buffer(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, name: &str, data: &[u8]) {
        let existing = match self.entries.get(name) {
            Some(ResourceBinding::Single(resource)) => Some(resource),
            _ => None,
        };
        let buffer = upload(device, queue, name, existing, data);
        self.set(name, GpuResource::Buffer(buffer));
    }

    /// Uploads one buffer per element into the array named `name`
    ///
    /// Every element present from an earlier call is updated in place; missing
    /// elements are created. Elements past `elements.len()` are dropped.
    pub fn update_buffer_array(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, name: &str, elements: &[&[u8]]) {
        let existing: &[GpuResource] = match self.entries.get(name) {
            Some(ResourceBinding::Array(resources)) => resources,
            Some(ResourceBinding::Single(resource)) => std::slice::from_ref(resource),
            None => &[],
        };

        let buffers = elements
            .iter()
            .enumerate()
            .map(|(index, data)| GpuResource::Buffer(upload(device, queue, &format!("{name}[{index}]"), existing.get(index), data)))
            .collect();
        self.set_array(name, buffers);
    }

    /// Returns the vertex buffer and vertex count stored under `name`
    pub fn vertex(&self, name: &str) -> Result<(&wgpu::Buffer, u32), RegistryError> {
        match self.lookup(name, 0, ResourceKind::Vertex)? {
            GpuResource::Vertex { buffer, count } => Ok((buffer, *count)),
            other => Err(RegistryError::WrongKind {
                name: name.to_string(),
                expected: ResourceKind::Vertex,
                found: other.kind(),
            }),
        }
    }

    /// Creates one bind group per group index from registry contents
    ///
    /// Group indices without reflected bindings get an empty bind group, so the
    /// result covers every layout of the pipeline.
    ///
    /// # Arguments
    /// * `device` - The wgpu device for bind group creation
    /// * `label` - Label prefix for debugging
    /// * `group_layouts` - Reflected group layouts of the pipeline
    /// * `bind_group_layouts` - Dense wgpu layouts indexed by group number
    /// * `selector` - Element picked from array resources
    ///
    /// # Returns
    /// `(group index, bind group)` pairs, or the first name that could not be resolved
    pub fn resolve_bind_groups(
        &self,
        device: &wgpu::Device,
        label: &str,
        group_layouts: &[GroupLayout],
        bind_group_layouts: &[wgpu::BindGroupLayout],
        selector: usize,
    ) -> Result<Vec<(u32, wgpu::BindGroup)>, RegistryError> {
        let mut bind_groups = Vec::with_capacity(bind_group_layouts.len());

        for (group, layout) in (0u32..).zip(bind_group_layouts) {
            let infos = group_layouts.iter().find(|group_layout| group_layout.group == group).map(|group_layout| group_layout.entries.as_slice()).unwrap_or_default();

            let mut entries = Vec::with_capacity(infos.len());
            for info in infos {
                let expected = ResourceKind::for_binding(&info.kind);
                let resource = match self.lookup(&info.name, selector, expected)? {
                    GpuResource::Buffer(buffer) => buffer.as_entire_binding(),
                    GpuResource::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
                    GpuResource::TextureView(view) => wgpu::BindingResource::TextureView(view),
                    GpuResource::Vertex { .. } => {
                        return Err(RegistryError::WrongKind {
                            name: info.name.clone(),
                            expected,
                            found: ResourceKind::Vertex,
                        });
                    }
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: info.binding,
                    resource,
                });
            }

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} group {group}")),
                layout,
                entries: &entries,
            });
            bind_groups.push((group, bind_group));
        }

        Ok(bind_groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Fake {
        Buffer(u32),
        Sampler,
    }

    impl Resource for Fake {
        fn kind(&self) -> ResourceKind {
            match self {
                Fake::Buffer(_) => ResourceKind::Buffer,
                Fake::Sampler => ResourceKind::Sampler,
            }
        }
    }

    #[test]
    fn test_unset_is_distinct_from_wrong_kind() {
        let mut registry = ResourceRegistry::new();
        registry.set("mySampler", Fake::Sampler);

        assert_eq!(
            registry.lookup("missing", 0, ResourceKind::Sampler),
            Err(RegistryError::Unset { name: "missing".to_string() })
        );
        assert_eq!(
            registry.lookup("mySampler", 0, ResourceKind::TextureView),
            Err(RegistryError::WrongKind {
                name: "mySampler".to_string(),
                expected: ResourceKind::TextureView,
                found: ResourceKind::Sampler,
            })
        );
        assert_eq!(registry.lookup("mySampler", 0, ResourceKind::Sampler), Ok(&Fake::Sampler));
    }

    #[test]
    fn test_array_selects_by_index() {
        let mut registry = ResourceRegistry::new();
        registry.set_array("direction", vec![Fake::Buffer(0), Fake::Buffer(1)]);

        assert_eq!(registry.lookup("direction", 0, ResourceKind::Buffer), Ok(&Fake::Buffer(0)));
        assert_eq!(registry.lookup("direction", 1, ResourceKind::Buffer), Ok(&Fake::Buffer(1)));
        assert_eq!(
            registry.lookup("direction", 2, ResourceKind::Buffer),
            Err(RegistryError::IndexOutOfRange {
                name: "direction".to_string(),
                index: 2,
                len: 2,
            })
        );
    }

    #[test]
    fn test_single_ignores_selector_and_last_writer_wins() {
        let mut registry = ResourceRegistry::new();
        registry.set("blur_uniforms", Fake::Buffer(1));
        registry.set("blur_uniforms", Fake::Buffer(2));

        assert_eq!(registry.lookup("blur_uniforms", 1, ResourceKind::Buffer), Ok(&Fake::Buffer(2)));
        assert!(registry.contains("blur_uniforms"));
        assert!(matches!(registry.get("blur_uniforms"), Some(ResourceBinding::Single(Fake::Buffer(2)))));
    }

    #[test]
    fn test_buffer_size_rounding() {
        assert_eq!(buffer_size(0), 16);
        assert_eq!(buffer_size(4), 16);
        assert_eq!(buffer_size(16), 16);
        assert_eq!(buffer_size(17), 20);
        assert_eq!(buffer_size(112), 112);
    }

    #[test]
    fn test_binding_kind_mapping() {
        use crate::reflect::BufferSpace;

        assert_eq!(ResourceKind::for_binding(&BindingKind::Buffer { space: BufferSpace::Uniform }), ResourceKind::Buffer);
        assert_eq!(ResourceKind::for_binding(&BindingKind::Sampler { comparison: false }), ResourceKind::Sampler);
        assert_eq!(
            ResourceKind::for_binding(&BindingKind::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly
            }),
            ResourceKind::TextureView
        );
    }

    fn buffer_at(registry: &ResourceRegistry, name: &str, index: usize) -> wgpu::Buffer {
        match registry.lookup(name, index, ResourceKind::Buffer) {
            Ok(GpuResource::Buffer(buffer)) => buffer.clone(),
            other => panic!("{name}[{index}] is not a buffer: {other:?}"),
        }
    }

    #[test]
    fn test_update_buffer_array_keeps_existing_elements() {
        let Ok(ctx) = crate::GpuContext::shared_headless() else {
            eprintln!("skipping test_update_buffer_array_keeps_existing_elements: no GPU adapter");
            return;
        };
        let (device, queue) = (&ctx.device, &ctx.queue);
        let horizontal: &[u8] = bytemuck::cast_slice(&[1.0f32, 0.0]);
        let vertical: &[u8] = bytemuck::cast_slice(&[0.0f32, 1.0]);

        let mut registry = ResourceRegistry::new();
        registry.update_buffer_array(device, queue, "direction", &[horizontal]);
        let first = buffer_at(&registry, "direction", 0);
        assert_eq!(first.size(), 16);

        registry.update_buffer_array(device, queue, "direction", &[horizontal, vertical]);
        assert_eq!(buffer_at(&registry, "direction", 0), first);
        let second = buffer_at(&registry, "direction", 1);

        registry.update_buffer_array(device, queue, "direction", &[vertical, horizontal]);
        assert_eq!(buffer_at(&registry, "direction", 0), first);
        assert_eq!(buffer_at(&registry, "direction", 1), second);
        assert_ne!(first, second);

        // Outgrowing an element replaces only that element
        let wide: &[u8] = bytemuck::cast_slice(&[0.0f32; 8]);
        registry.update_buffer_array(device, queue, "direction", &[horizontal, wide]);
        assert_eq!(buffer_at(&registry, "direction", 0), first);
        assert_ne!(buffer_at(&registry, "direction", 1), second);
    }
}
