//! Texture, view and sampler creation helpers

/// Usage of the texture an image is uploaded into
pub const TEXTURE_USAGE_INPUT: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::RENDER_ATTACHMENT);

/// Usage of ping-pong and output targets, before storage support is checked
pub const TEXTURE_USAGE_TARGET: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::STORAGE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Creates a single-level 2D texture
pub fn create_texture(device: &wgpu::Device, label: &str, (width, height): (u32, u32), format: wgpu::TextureFormat, usage: wgpu::TextureUsages) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

/// Creates a render target usable as both a render attachment and a storage texture
///
/// Storage binding is dropped for formats that don't support it without extra
/// device features, so such targets only work with render filters.
pub fn create_render_target(device: &wgpu::Device, label: &str, size: (u32, u32), format: wgpu::TextureFormat) -> wgpu::Texture {
    let allowed = format.guaranteed_format_features(device.features()).allowed_usages;
    create_texture(device, label, size, format, TEXTURE_USAGE_TARGET & allowed)
}

/// Writes tightly packed RGBA8 pixels into the first mip level of `texture`
pub fn write_rgba8(queue: &wgpu::Queue, texture: &wgpu::Texture, pixels: &[u8], (width, height): (u32, u32)) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        extent(width, height),
    );
}

/// Uploads an image into a new `Rgba8Unorm` texture
pub fn upload_image(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, image: &image::RgbaImage) -> wgpu::Texture {
    let size = image.dimensions();
    let texture = create_texture(device, label, size, wgpu::TextureFormat::Rgba8Unorm, TEXTURE_USAGE_INPUT);
    write_rgba8(queue, &texture, image.as_raw(), size);
    texture
}

/// Creates a 1x1 texture filled with `color`
pub fn solid_texture(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, color: [u8; 4]) -> wgpu::Texture {
    let texture = create_texture(device, label, (1, 1), wgpu::TextureFormat::Rgba8Unorm, TEXTURE_USAGE_INPUT);
    write_rgba8(queue, &texture, &color, (1, 1));
    texture
}

/// Creates the sampler bound as `mySampler`
pub fn create_sampler(device: &wgpu::Device, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("mySampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        lod_min_clamp: 0.0,
        lod_max_clamp: 0.0,
        compare: None,
        anisotropy_clamp: 1,
        border_color: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_usage_covers_render_and_compute() {
        assert!(TEXTURE_USAGE_TARGET.contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::STORAGE_BINDING));
        assert!(TEXTURE_USAGE_INPUT.contains(wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST));
        assert!(!TEXTURE_USAGE_INPUT.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }
}
