//! wgpu utility functions for verification
//!
//! Device acquisition that tolerates machines without an adapter, texture
//! readback into [`image::RgbaImage`], and a deterministic test pattern.

use image_effects_wgpu::GpuContext;

/// Returns the shared headless context, or `None` when no adapter is available
///
/// Callers skip GPU checks on `None` instead of failing.
pub fn headless_context() -> Option<GpuContext> {
    match GpuContext::shared_headless() {
        Ok(ctx) => Some(ctx.clone()),
        Err(err) => {
            tracing::warn!(%err, "no GPU available, skipping");
            None
        }
    }
}

/// Builds an opaque test pattern
///
/// Red ramps along x, green along y and blue alternates in a checkerboard, so
/// both blurring and flipping change the image.
pub fn test_pattern(width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.saturating_sub(1).max(1)) as u8;
        let g = (y * 255 / height.saturating_sub(1).max(1)) as u8;
        let b = if (x / 4 + y / 4) % 2 == 0 { 32 } else { 224 };
        image::Rgba([r, g, b, 255])
    })
}

/// Reads an `Rgba8Unorm` texture back into an image
///
/// # Arguments
/// * `device` - The wgpu device
/// * `queue` - The wgpu command queue
/// * `texture` - The texture to read from
///
/// # Returns
/// An RGBA8 image containing the texture data
pub fn read_texture_rgba8(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture) -> Result<image::RgbaImage, Box<dyn std::error::Error>> {
    let format = texture.format();
    if format != wgpu::TextureFormat::Rgba8Unorm {
        return Err(format!("Unsupported texture format for readback: {format:?}").into());
    }
    let (width, height) = (texture.width(), texture.height());

    // Rows must be padded to the copy alignment
    let unpadded_bytes_per_row = width * 4;
    let bytes_per_row = unpadded_bytes_per_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Readback Encoder") });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
        // The receiver is only dropped after the poll below returns
        let _ = sender.send(v);
    });

    device.poll(wgpu::PollType::Wait)?;
    pollster::block_on(receiver.receive()).ok_or("Failed to map buffer for reading")??;

    let data = buffer_slice.get_mapped_range();
    let pixels = data
        .chunks(bytes_per_row as usize)
        .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
        .copied()
        .collect::<Vec<_>>();
    drop(data);
    buffer.unmap();

    image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| "Failed to create RGBA image from data".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_spans_full_range() {
        let image = test_pattern(16, 8);
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 32, 255]);
        assert_eq!(image.get_pixel(15, 7).0[..2], [255, 255]);
        assert_eq!(image.get_pixel(4, 0).0[2], 224);
    }

    #[test]
    fn test_pattern_handles_single_pixel() {
        assert_eq!(test_pattern(1, 1).dimensions(), (1, 1));
    }
}
