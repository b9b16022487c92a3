//! Rendering checks run against a real device
//!
//! Each check builds its own [`FilterChain`] so no state leaks between them.
//! The same functions back the `verify_chain` binary and the crate's tests.

use image_effects_wgpu::ping_pong::Slot;
use image_effects_wgpu::{BevelParams, FilterChain, FilterChainError, FilterChainOptions, FilterDescriptor, GpuContext};

use crate::compare::{CompareResult, compare_images};
use crate::wgpu_helpers::read_texture_rgba8;

/// Largest per-channel difference accepted for outputs that should equal their input
pub const TOLERANCE: u8 = 1;

/// Inverts colors in a compute pass, writing straight into the storage target
pub const INVERT_COMPUTE: &str = r"
@group(0) @binding(1) var myTexture: texture_2d<f32>;
@group(0) @binding(2) var outputTexture: texture_storage_2d<rgba8unorm, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let dims = textureDimensions(myTexture);
    if (id.x >= dims.x || id.y >= dims.y) {
        return;
    }
    let color = textureLoad(myTexture, vec2<i32>(id.xy), 0);
    textureStore(outputTexture, vec2<i32>(id.xy), vec4<f32>(1.0 - color.rgb, color.a));
}
";

/// Compute shader whose storage format doesn't match the `Rgba8Unorm` intermediates
pub const MISMATCHED_STORAGE_COMPUTE: &str = r"
@group(0) @binding(1) var myTexture: texture_2d<f32>;
@group(0) @binding(2) var outputTexture: texture_storage_2d<rgba16float, write>;

@compute @workgroup_size(8, 8)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    textureStore(outputTexture, vec2<i32>(id.xy), textureLoad(myTexture, vec2<i32>(id.xy), 0));
}
";

/// Inverts colors in a fragment shader
pub const INVERT_RENDER: &str = r"
@group(0) @binding(1) var myTexture: texture_2d<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vert_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    return VertexOutput(vec4<f32>(position, 0.0, 1.0), uv);
}

@fragment
fn frag_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureLoad(myTexture, vec2<i32>(input.position.xy), 0);
    return vec4<f32>(1.0 - color.rgb, color.a);
}
";

/// Error returned by a failed check
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Chain(#[from] FilterChainError),
    #[error("failed to read back output: {0}")]
    Readback(String),
    #[error("output differs from the expected image: {0:?}")]
    Mismatch(CompareResult),
    #[error("{0}")]
    Unexpected(String),
}

pub type CheckResult = Result<(), CheckError>;

/// A named check
pub struct Check {
    pub name: &'static str,
    pub run: fn(&GpuContext, &image::RgbaImage) -> CheckResult,
}

/// Every check, in the order the binary runs them
pub const ALL: &[Check] = &[
    Check { name: "empty chain is a copy", run: empty_chain_is_copy },
    Check { name: "inert filters leave the image unchanged", run: inert_filters_are_identity },
    Check { name: "blur changes the image", run: blur_changes_image },
    Check { name: "blur runs along both axes", run: blur_runs_along_both_axes },
    Check { name: "bevel needs an auxiliary slope", run: bevel_follows_auxiliary },
    Check { name: "auxiliary texture is reused", run: auxiliary_texture_is_reused },
    Check { name: "repeated key keeps textures", run: repeated_key_keeps_textures },
    Check { name: "unknown filter type fails", run: unknown_filter_type_fails },
    Check { name: "short uniforms fail validation", run: short_uniforms_fail_validation },
    Check { name: "storage format mismatch fails validation", run: storage_format_mismatch_fails_validation },
    Check { name: "custom compute shader", run: custom_compute_shader },
    Check { name: "custom render shader", run: custom_render_shader },
];

fn render(ctx: &GpuContext, image: &image::RgbaImage, aux: Option<&image::RgbaImage>, filters: &[FilterDescriptor]) -> Result<image::RgbaImage, CheckError> {
    let mut chain = FilterChain::new(ctx.clone(), FilterChainOptions::default());
    let output = chain.render(image, aux, filters, None)?;
    read_texture_rgba8(&ctx.device, &ctx.queue, output).map_err(|err| CheckError::Readback(err.to_string()))
}

fn expect_match(expected: &image::RgbaImage, actual: &image::RgbaImage) -> CheckResult {
    match compare_images(expected, actual, TOLERANCE) {
        CompareResult::Match => Ok(()),
        result => Err(CheckError::Mismatch(result)),
    }
}

fn expect_difference(expected: &image::RgbaImage, actual: &image::RgbaImage) -> CheckResult {
    match compare_images(expected, actual, TOLERANCE) {
        CompareResult::PixelMismatch { .. } => Ok(()),
        result => Err(CheckError::Unexpected(format!("expected the output to change, got {result:?}"))),
    }
}

fn inverted(image: &image::RgbaImage) -> image::RgbaImage {
    let mut image = image.clone();
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [255 - r, 255 - g, 255 - b, a];
    }
    image
}

pub fn empty_chain_is_copy(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    expect_match(image, &render(ctx, image, None, &[])?)
}

/// Disabled stages, non-finite intensities, zero noise and a flat bevel all pass the image through
pub fn inert_filters_are_identity(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let filters = [
        FilterDescriptor::blur(4.0).with_enabled(false),
        FilterDescriptor::blur(f32::NAN),
        FilterDescriptor::warp(f32::INFINITY, [0.5, 0.5]),
        FilterDescriptor::noise(0.0, 3.0, 2.0),
        FilterDescriptor::bevel(BevelParams::default()),
    ];
    expect_match(image, &render(ctx, image, None, &filters)?)
}

pub fn blur_changes_image(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    expect_difference(image, &render(ctx, image, None, &[FilterDescriptor::blur(4.0)])?)
}

/// Stripes along one axis only change if the pass blurring along that axis ran
pub fn blur_runs_along_both_axes(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let (width, height) = image.dimensions();
    let stripe = |i: u32| if (i / 4) % 2 == 0 { image::Rgba([20, 20, 20, 255]) } else { image::Rgba([235, 235, 235, 255]) };
    let blur = [FilterDescriptor::blur(4.0)];

    let vertical_stripes = image::RgbaImage::from_fn(width, height, |x, _| stripe(x));
    expect_difference(&vertical_stripes, &render(ctx, &vertical_stripes, None, &blur)?)?;

    let horizontal_stripes = image::RgbaImage::from_fn(width, height, |_, y| stripe(y));
    expect_difference(&horizontal_stripes, &render(ctx, &horizontal_stripes, None, &blur)?)
}

/// A flat height field keeps the image, a ramp shades it
pub fn bevel_follows_auxiliary(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let bevel = [FilterDescriptor::bevel(BevelParams::default())];
    let (width, height) = image.dimensions();

    let flat = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 200, 200, 255]));
    expect_match(image, &render(ctx, image, Some(&flat), &bevel)?)?;

    let ramp = image::RgbaImage::from_fn(width, height, |x, _| {
        let h = (x * 255 / width.saturating_sub(1).max(1)) as u8;
        image::Rgba([h, h, h, 255])
    });
    expect_difference(image, &render(ctx, image, Some(&ramp), &bevel)?)
}

/// Same-size auxiliary images are written into one texture
pub fn auxiliary_texture_is_reused(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let mut chain = FilterChain::new(ctx.clone(), FilterChainOptions::default());
    let bevel = [FilterDescriptor::bevel(BevelParams::default())];
    let (width, height) = image.dimensions();
    let flat = image::RgbaImage::from_pixel(width, height, image::Rgba([90, 90, 90, 255]));

    chain.render(image, Some(&flat), &bevel, Some("pattern"))?;
    let aux = chain.auxiliary().cloned();
    chain.render(image, Some(image), &bevel, Some("pattern"))?;
    if chain.auxiliary() != aux.as_ref() {
        return Err(CheckError::Unexpected("same-size auxiliary image reallocated its texture".into()));
    }

    let smaller = image::RgbaImage::from_pixel(width.div_ceil(2), height, image::Rgba([90, 90, 90, 255]));
    chain.render(image, Some(&smaller), &bevel, Some("pattern"))?;
    if chain.auxiliary() == aux.as_ref() {
        return Err(CheckError::Unexpected("resized auxiliary image kept its texture".into()));
    }
    Ok(())
}

/// Rendering the same key twice keeps the input, intermediate and output textures
pub fn repeated_key_keeps_textures(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let mut chain = FilterChain::new(ctx.clone(), FilterChainOptions::default());
    let filters = [FilterDescriptor::blur(2.0)];
    let textures = |chain: &FilterChain| {
        let slots = chain.ping_pong().map(|ping_pong| [Slot::Input, Slot::A, Slot::B].map(|slot| ping_pong.slot(slot).texture.clone()));
        (slots, chain.output().cloned())
    };

    chain.render(image, None, &filters, Some("pattern"))?;
    let first = textures(&chain);
    chain.render(image, None, &filters, Some("pattern"))?;
    let second = textures(&chain);

    if first.0.is_none() || first.0 != second.0 {
        return Err(CheckError::Unexpected("same key replaced the ping-pong textures".into()));
    }
    if first.1.is_none() || first.1 != second.1 {
        return Err(CheckError::Unexpected("same key replaced the output texture".into()));
    }

    chain.render(image, None, &filters, None)?;
    if textures(&chain).0 == first.0 {
        return Err(CheckError::Unexpected("missing key did not reallocate textures".into()));
    }
    Ok(())
}

pub fn unknown_filter_type_fails(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    match render(ctx, image, None, &[FilterDescriptor::new("sharpen")]) {
        Err(CheckError::Chain(FilterChainError::UnknownFilterType(name))) if name == "sharpen" => Ok(()),
        Err(err) => Err(err),
        Ok(_) => Err(CheckError::Unexpected("unknown filter type rendered".into())),
    }
}

fn expect_validation_error(chain: &mut FilterChain, image: &image::RgbaImage, filters: &[FilterDescriptor]) -> CheckResult {
    match chain.render(image, None, filters, None) {
        Err(FilterChainError::Validation { .. }) => Ok(()),
        Err(err) => Err(err.into()),
        Ok(_) => Err(CheckError::Unexpected("invalid chain rendered".into())),
    }
}

/// A bevel with only some of its properties binds a buffer smaller than its uniform struct
///
/// The render fails without submitting and the chain keeps working afterwards.
pub fn short_uniforms_fail_validation(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let mut chain = FilterChain::new(ctx.clone(), FilterChainOptions::default());
    let partial = FilterDescriptor::new("bevel").with_property("contour", 1.0);
    expect_validation_error(&mut chain, image, &[partial])?;

    let output = chain.render(image, None, &[], None)?;
    let output = read_texture_rgba8(&ctx.device, &ctx.queue, output).map_err(|err| CheckError::Readback(err.to_string()))?;
    expect_match(image, &output)
}

pub fn storage_format_mismatch_fails_validation(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let mut chain = FilterChain::new(ctx.clone(), FilterChainOptions::default());
    let mismatched = FilterDescriptor::new("widen").with_code(MISMATCHED_STORAGE_COMPUTE);
    expect_validation_error(&mut chain, image, &[mismatched])
}

/// Inverting twice in compute passes returns the input
pub fn custom_compute_shader(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let invert = FilterDescriptor::new("invert").with_code(INVERT_COMPUTE);
    expect_match(&inverted(image), &render(ctx, image, None, std::slice::from_ref(&invert))?)?;
    expect_match(image, &render(ctx, image, None, &[invert.clone(), invert])?)
}

pub fn custom_render_shader(ctx: &GpuContext, image: &image::RgbaImage) -> CheckResult {
    let invert = FilterDescriptor::new("invert").with_code(INVERT_RENDER);
    expect_match(&inverted(image), &render(ctx, image, None, &[invert])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wgpu_helpers::{headless_context, test_pattern};

    #[test]
    fn test_inverted_keeps_alpha() {
        let image = image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 100, 255, 7]));
        assert_eq!(inverted(&image).get_pixel(0, 0).0, [255, 155, 0, 7]);
    }

    #[test]
    fn test_all_checks_on_device() {
        let Some(ctx) = headless_context() else {
            eprintln!("skipping {} GPU checks: no adapter available", ALL.len());
            return;
        };
        let image = test_pattern(37, 21);
        for check in ALL {
            if let Err(err) = (check.run)(&ctx, &image) {
                panic!("{}: {err}", check.name);
            }
        }
    }
}
