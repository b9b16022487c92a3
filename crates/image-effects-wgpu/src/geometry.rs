//! Full-screen triangle geometry shared by every render pass

use wgpu::util::DeviceExt;

use crate::resource_registry::GpuResource;

/// Vertex with clip-space position and texture coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Clip-space position
    pub position: [f32; 2],
    /// Texture coordinates, origin top-left
    pub uv: [f32; 2],
}

impl Vertex {
    /// Vertex attribute descriptors for wgpu
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    /// Complete vertex buffer layout descriptor
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: Self::ATTRIBUTES,
        array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
    };
}

/// One oversized triangle covering the whole viewport
///
/// The visible `[-1, 1]` square maps to uv `[0, 1]`, with v growing downwards.
pub struct FullscreenTriangle;

impl FullscreenTriangle {
    pub const VERTICES: &[Vertex] = &[
        Vertex {
            position: [0.0, 3.0],
            uv: [0.5, -1.0],
        },
        Vertex {
            position: [-2.0, -1.0],
            uv: [-0.5, 1.0],
        },
        Vertex {
            position: [2.0, -1.0],
            uv: [1.5, 1.0],
        },
    ];

    /// Uploads the triangle and returns it as a registry vertex resource
    pub fn create(device: &wgpu::Device) -> GpuResource {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Triangle"),
            contents: bytemuck::cast_slice(Self::VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        GpuResource::Vertex {
            buffer,
            count: Self::VERTICES.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_interleaved_vec2_pairs() {
        assert_eq!(Vertex::LAYOUT.array_stride, 16);
        assert_eq!(Vertex::LAYOUT.attributes[0].offset, 0);
        assert_eq!(Vertex::LAYOUT.attributes[1].offset, 8);
        assert_eq!(Vertex::LAYOUT.attributes[1].shader_location, 1);
    }

    #[test]
    fn test_uv_is_affine_in_position() {
        // u = (x + 1) / 2, v = (1 - y) / 2
        for vertex in FullscreenTriangle::VERTICES {
            assert_eq!(vertex.uv[0], (vertex.position[0] + 1.0) / 2.0);
            assert_eq!(vertex.uv[1], (1.0 - vertex.position[1]) / 2.0);
        }
    }
}
