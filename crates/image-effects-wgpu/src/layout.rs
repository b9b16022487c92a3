//! Bind group layout construction from reflected bindings
//!
//! The grouping step is pure and works on [`ShaderBindingInfo`] alone, so it can
//! be tested without a device. [`create_bind_group_layouts`] turns the result
//! into wgpu objects.

use crate::reflect::{BindingKind, BufferSpace, ShaderBindingInfo};

/// All bindings declared for one `@group` index
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayout {
    /// Group index as declared in the shader
    pub group: u32,
    /// Entries in declaration order, binding indices unique
    pub entries: Vec<ShaderBindingInfo>,
}

/// Groups bindings by their group index
///
/// Groups appear in the order they are first seen; entries keep their
/// declaration order. A binding index repeated within a group is dropped with a
/// warning, the first declaration wins.
///
/// # Arguments
/// * `bindings` - Reflected bindings of one shader
///
/// # Returns
/// One layout per distinct group index
pub fn build_group_layouts(bindings: &[ShaderBindingInfo]) -> Vec<GroupLayout> {
    let mut layouts: Vec<GroupLayout> = Vec::new();

    for info in bindings {
        let index = match layouts.iter().position(|layout| layout.group == info.group) {
            Some(index) => index,
            None => {
                layouts.push(GroupLayout {
                    group: info.group,
                    entries: Vec::new(),
                });
                layouts.len() - 1
            }
        };

        let layout = &mut layouts[index];
        if layout.entries.iter().any(|entry| entry.binding == info.binding) {
            tracing::warn!(group = info.group, binding = info.binding, name = %info.name, "duplicate binding dropped");
            continue;
        }
        layout.entries.push(info.clone());
    }

    layouts
}

/// Converts one reflected binding into a wgpu layout entry
pub fn layout_entry(info: &ShaderBindingInfo) -> wgpu::BindGroupLayoutEntry {
    let ty = match info.kind {
        BindingKind::Buffer { space } => wgpu::BindingType::Buffer {
            ty: match space {
                BufferSpace::Uniform => wgpu::BufferBindingType::Uniform,
                BufferSpace::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
            },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        BindingKind::Sampler { comparison } => wgpu::BindingType::Sampler(if comparison {
            wgpu::SamplerBindingType::Comparison
        } else {
            wgpu::SamplerBindingType::Filtering
        }),
        BindingKind::Texture { sample_type, multisampled } => wgpu::BindingType::Texture {
            sample_type,
            view_dimension: info.view_dimension,
            multisampled,
        },
        BindingKind::StorageTexture { access } => wgpu::BindingType::StorageTexture {
            access,
            // Reflection only produces storage textures with a parsed format
            format: info.format.unwrap_or(wgpu::TextureFormat::Rgba8Unorm),
            view_dimension: info.view_dimension,
        },
    };

    wgpu::BindGroupLayoutEntry {
        binding: info.binding,
        visibility: info.visibility,
        ty,
        count: None,
    }
}

/// Number of bind group slots needed to cover every declared group
pub fn dense_group_count(layouts: &[GroupLayout]) -> usize {
    layouts.iter().map(|layout| layout.group as usize + 1).max().unwrap_or(0)
}

/// Creates wgpu bind group layouts indexed by group number
///
/// Unused group indices below the highest declared one get an empty layout so
/// the result can be passed straight to a pipeline layout.
///
/// # Arguments
/// * `device` - The wgpu device for layout creation
/// * `label` - Label prefix for debugging
/// * `layouts` - Grouped bindings from [`build_group_layouts`]
///
/// # Returns
/// A dense vector where element `g` is the layout for `@group(g)`
pub fn create_bind_group_layouts(device: &wgpu::Device, label: &str, layouts: &[GroupLayout]) -> Vec<wgpu::BindGroupLayout> {
    (0..dense_group_count(layouts))
        .map(|group| {
            let entries = layouts
                .iter()
                .find(|layout| layout.group as usize == group)
                .map(|layout| layout.entries.iter().map(layout_entry).collect::<Vec<_>>())
                .unwrap_or_default();

            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label} group {group}")),
                entries: &entries,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(group: u32, binding: u32, name: &str, kind: BindingKind) -> ShaderBindingInfo {
        ShaderBindingInfo {
            group,
            binding,
            kind,
            name: name.to_string(),
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            view_dimension: wgpu::TextureViewDimension::D2,
            format: None,
        }
    }

    const SAMPLER: BindingKind = BindingKind::Sampler { comparison: false };
    const UNIFORM: BindingKind = BindingKind::Buffer { space: BufferSpace::Uniform };

    #[test]
    fn test_groups_in_first_seen_order() {
        let bindings = vec![
            binding(1, 0, "noise_uniforms", UNIFORM),
            binding(0, 0, "mySampler", SAMPLER),
            binding(1, 1, "extra", UNIFORM),
            binding(0, 1, "other", SAMPLER),
        ];
        let layouts = build_group_layouts(&bindings);

        assert_eq!(layouts.iter().map(|l| l.group).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(layouts[0].entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["noise_uniforms", "extra"]);
        assert_eq!(layouts[1].entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["mySampler", "other"]);
        assert_eq!(dense_group_count(&layouts), 2);
    }

    #[test]
    fn test_duplicate_binding_keeps_first() {
        let bindings = vec![binding(0, 0, "first", SAMPLER), binding(0, 0, "second", UNIFORM)];
        let layouts = build_group_layouts(&bindings);

        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].entries.len(), 1);
        assert_eq!(layouts[0].entries[0].name, "first");
    }

    #[test]
    fn test_dense_group_count_covers_gaps() {
        let layouts = build_group_layouts(&[binding(2, 0, "late", UNIFORM)]);
        assert_eq!(dense_group_count(&layouts), 3);
        assert_eq!(dense_group_count(&[]), 0);
    }

    #[test]
    fn test_layout_entry_mapping() {
        let entry = layout_entry(&binding(0, 3, "u", UNIFORM));
        assert_eq!(entry.binding, 3);
        assert_eq!(entry.visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None
            }
        ));

        let mut storage = binding(
            0,
            1,
            "outputTexture",
            BindingKind::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
            },
        );
        storage.format = Some(wgpu::TextureFormat::Rgba16Float);
        storage.visibility = wgpu::ShaderStages::COMPUTE;
        let entry = layout_entry(&storage);
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba16Float,
                view_dimension: wgpu::TextureViewDimension::D2
            }
        ));

        let entry = layout_entry(&binding(0, 2, "cmp", BindingKind::Sampler { comparison: true }));
        assert!(matches!(entry.ty, wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)));
    }
}
