//! Cover art compositing for the outpainted landscape cover.
//!
//! The square generated cover is widened to a landscape canvas: the
//! left and right halves (each half original, half blank) are sent to
//! the image-edit service for outpainting, and the returned extensions
//! are pasted back around the untouched original before a center crop
//! to 16:9.

use std::path::{Path, PathBuf};

use image::imageops;
use image::RgbaImage;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Split the cover into the two outpainting inputs.
///
/// Each half is a canvas of the cover's own size holding the adjacent
/// half of the original and transparent space to fill in.
pub fn split_for_outpaint(
    cover: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> MediaResult<(PathBuf, PathBuf)> {
    let cover = cover.as_ref();
    let out_dir = out_dir.as_ref();

    let original = image::open(cover)?.to_rgba8();
    let (w, h) = original.dimensions();

    let mut canvas = RgbaImage::new(w * 2, h);
    imageops::overlay(&mut canvas, &original, (w / 2) as i64, 0);

    let left = imageops::crop_imm(&canvas, 0, 0, w, h).to_image();
    let right = imageops::crop_imm(&canvas, w, 0, w, h).to_image();

    let left_path = out_dir.join("outpaint_left.png");
    let right_path = out_dir.join("outpaint_right.png");
    left.save(&left_path)?;
    right.save(&right_path)?;

    debug!(cover = %cover.display(), "split cover into outpainting halves");
    Ok((left_path, right_path))
}

/// Assemble the final landscape cover from the original and the two
/// outpainted halves, then center-crop to 16:9.
pub fn compose_landscape(
    cover: impl AsRef<Path>,
    left: impl AsRef<Path>,
    right: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    let original = image::open(cover.as_ref())?.to_rgba8();
    let left = image::open(left.as_ref())?.to_rgba8();
    let right = image::open(right.as_ref())?.to_rgba8();

    let (w, h) = original.dimensions();
    if left.dimensions() != (w, h) || right.dimensions() != (w, h) {
        return Err(MediaError::invalid_media(
            "outpainted halves do not match the cover dimensions",
        ));
    }

    let mut canvas = RgbaImage::new(w * 2, h);
    imageops::overlay(&mut canvas, &left, 0, 0);
    imageops::overlay(&mut canvas, &right, w as i64, 0);
    // The untouched original goes on top so outpainting artifacts never
    // bleed into the center.
    imageops::overlay(&mut canvas, &original, (w / 2) as i64, 0);

    let (x, y, cw, ch) = crop_16_9(w * 2, h);
    let cropped = imageops::crop_imm(&canvas, x, y, cw, ch).to_image();

    image::DynamicImage::ImageRgba8(cropped)
        .to_rgb8()
        .save(output.as_ref())?;
    Ok(())
}

/// Centered 16:9 crop window for a `width`×`height` image.
fn crop_16_9(width: u32, height: u32) -> (u32, u32, u32, u32) {
    let target = 16.0 / 9.0;
    let current = width as f64 / height as f64;

    if current > target {
        let new_width = (height as f64 * target) as u32;
        (((width - new_width) / 2), 0, new_width, height)
    } else {
        let new_height = (width as f64 / target) as u32;
        (0, (height - new_height) / 2, width, new_height)
    }
}
