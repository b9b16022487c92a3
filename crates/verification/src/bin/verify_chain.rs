//! Filter chain verification binary
//!
//! Runs every check from [`image_effects_wgpu_verification::checks`] against a
//! generated test pattern or an image given on the command line.

use image_effects_wgpu::GpuContext;
use image_effects_wgpu_verification::{checks, wgpu_helpers::test_pattern};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let image = match args.as_slice() {
        [_] => test_pattern(64, 48),
        [_, input_path] => image::open(input_path).map_err(|e| format!("Failed to open input image: {e}"))?.to_rgba8(),
        _ => {
            eprintln!("Usage: {} [input_image]", args[0]);
            return Ok(());
        }
    };

    let ctx = GpuContext::request().await?;

    let mut failures = 0;
    for check in checks::ALL {
        match (check.run)(&ctx, &image) {
            Ok(()) => println!("✓ {}", check.name),
            Err(e) => {
                failures += 1;
                eprintln!("✗ {}: {e}", check.name);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{failures} of {} checks failed", checks::ALL.len()).into());
    }
    Ok(())
}
