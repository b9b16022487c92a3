//! Image effects CLI
//!
//! Applies a filter chain to an image file on the GPU and writes the result.
//! The chain is built from flags in a fixed order (bevel, noise, warp, blur) or
//! read from a JSON file containing an array of filter descriptors.
//!
//! # Usage
//! ```bash
//! image-effects-cli input.png output.png --noise 30 --blur 4
//! image-effects-cli input.png output.png --chain chain.json --aux height.png
//! ```

use clap::Parser;
use image_effects_wgpu::{BevelParams, FilterChain, FilterChainOptions, FilterDescriptor, GpuContext};
use std::path::PathBuf;

/// Command-line arguments for the image effects tool
#[derive(Parser)]
#[command(version, about = "Apply GPU image filters to an image")]
struct Args {
    /// Input image file path
    input: PathBuf,

    /// Output image file path
    output: PathBuf,

    /// JSON file with an array of filter descriptors; overrides the filter flags
    #[arg(long)]
    chain: Option<PathBuf>,

    /// Auxiliary image (height field for the bevel filter)
    #[arg(long)]
    aux: Option<PathBuf>,

    /// Noise intensity in [0, 100]
    #[arg(long)]
    noise: Option<f32>,

    /// Noise seed
    #[arg(long, default_value = "0")]
    seed: f32,

    /// Noise grain size in pixels
    #[arg(long, default_value = "1")]
    granularity: f32,

    /// Warp intensity (5 degree steps at the center)
    #[arg(long)]
    warp: Option<f32>,

    /// Warp center in uv coordinates
    #[arg(long, num_args = 2, value_names = ["U", "V"], default_values = ["0.5", "0.5"])]
    center: Vec<f32>,

    /// Blur radius in pixels
    #[arg(long)]
    blur: Option<f32>,

    /// Bevel contour strength
    #[arg(long)]
    bevel: Option<f32>,
}

impl Args {
    /// Builds the chain from flags, in bevel, noise, warp, blur order
    fn filters(&self) -> Vec<FilterDescriptor> {
        let mut filters = Vec::new();
        if let Some(contour) = self.bevel {
            filters.push(FilterDescriptor::bevel(BevelParams { contour, ..Default::default() }));
        }
        if let Some(intensity) = self.noise {
            filters.push(FilterDescriptor::noise(intensity, self.seed, self.granularity));
        }
        if let Some(intensity) = self.warp {
            filters.push(FilterDescriptor::warp(intensity, [self.center[0], self.center[1]]));
        }
        if let Some(intensity) = self.blur {
            filters.push(FilterDescriptor::blur(intensity));
        }
        filters
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let filters = match &args.chain {
        Some(path) => serde_json::from_str::<Vec<FilterDescriptor>>(&std::fs::read_to_string(path)?)?,
        None => args.filters(),
    };
    println!("Applying {} filter(s): {}", filters.len(), filters.iter().map(|f| f.filter_type.as_str()).collect::<Vec<_>>().join(", "));

    // Load input images
    println!("Loading image from: {}", args.input.display());
    let input_image = image::open(&args.input)?.to_rgba8();
    let aux_image = match &args.aux {
        Some(path) => Some(image::open(path)?.to_rgba8()),
        None => None,
    };
    println!("Input image: {}x{}", input_image.width(), input_image.height());

    println!("Initializing GPU...");
    let ctx = pollster::block_on(GpuContext::request())?;
    let device = ctx.device.clone();
    let queue = ctx.queue.clone();

    let mut chain = FilterChain::new(ctx, FilterChainOptions::default());
    let key = args.input.to_string_lossy().into_owned();
    let output_texture = chain.render(&input_image, aux_image.as_ref(), &filters, Some(&key))?;

    println!("Saving result to: {}", args.output.display());
    let output_image = save_texture_to_image(&device, &queue, output_texture)?;
    output_image.save(&args.output)?;

    Ok(())
}

/// Reads an `Rgba8Unorm` texture back into an image
///
/// Rows are copied with the padding wgpu requires and stripped afterwards.
fn save_texture_to_image(device: &wgpu::Device, queue: &wgpu::Queue, texture: &wgpu::Texture) -> Result<image::RgbaImage, Box<dyn std::error::Error>> {
    let (width, height) = (texture.width(), texture.height());
    if texture.format() != wgpu::TextureFormat::Rgba8Unorm {
        return Err(format!("Unsupported texture format for saving: {:?}", texture.format()).into());
    }

    let unpadded_bytes_per_row = width * 4;
    let bytes_per_row = unpadded_bytes_per_row.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Copy Encoder") });
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
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    // Map buffer for CPU access and wait for completion
    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |v| sender.send(v).unwrap());

    device.poll(wgpu::PollType::Wait)?;

    pollster::block_on(receiver.receive()).ok_or("Failed to map buffer for reading")??;

    let data = buffer_slice.get_mapped_range();
    let pixels = data
        .chunks(bytes_per_row as usize)
        .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
        .copied()
        .collect::<Vec<_>>();

    image::RgbaImage::from_raw(width, height, pixels).ok_or_else(|| "Failed to create RGBA image from data".into())
}
