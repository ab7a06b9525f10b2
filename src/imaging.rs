//! Fitting downloaded images to the screen.
//!
//! The image is EXIF-oriented, scaled to fit inside the target size and
//! centered on a blurred copy of itself scaled to cover the whole target.

use crate::config::TargetSize;

/// Fit `content` to `target`, falling back to the original bytes on failure.
pub fn fit_or_passthrough(content: Vec<u8>, target: TargetSize, file_name: &str) -> Vec<u8> {
    #[cfg(feature = "resize")]
    {
        match resize::fit_to_screen(&content, target) {
            Ok(resized) => resized,
            Err(e) => {
                tracing::warn!("Error processing {}: {}, keeping original", file_name, e);
                content
            }
        }
    }

    #[cfg(not(feature = "resize"))]
    {
        tracing::warn!(
            "TARGET_SIZE {} ignored for {}: built without the resize feature",
            target,
            file_name
        );
        content
    }
}

#[cfg(feature = "resize")]
pub use resize::fit_to_screen;

#[cfg(feature = "resize")]
mod resize {
    use std::io::Cursor;

    use image::codecs::jpeg::JpegEncoder;
    use image::imageops::{self, FilterType};
    use image::{
        DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader, ImageResult,
    };

    use crate::config::TargetSize;

    const JPEG_QUALITY: u8 = 95;
    const BACKGROUND_BLUR_SIGMA: f32 = 20.0;

    /// Decode, orient, resize-and-pad, and re-encode in the source format.
    pub fn fit_to_screen(content: &[u8], target: TargetSize) -> ImageResult<Vec<u8>> {
        let reader = ImageReader::new(Cursor::new(content)).with_guessed_format()?;
        let format = reader.format().unwrap_or(ImageFormat::Jpeg);

        let mut decoder = reader.into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        let (width, height) = image.dimensions();
        tracing::debug!(
            "Resizing {}x{} ({:?}) to {}",
            width,
            height,
            orientation,
            target
        );
        image.apply_orientation(orientation);

        encode(&pad_with_blur(&image, target), format)
    }

    fn pad_with_blur(image: &DynamicImage, target: TargetSize) -> DynamicImage {
        let (tw, th) = (target.width, target.height);
        let (w, h) = image.dimensions();
        let target_ratio = f64::from(tw) / f64::from(th);
        let image_ratio = f64::from(w) / f64::from(h.max(1));

        // Foreground fits inside the target; background covers it.
        let (fit_w, fit_h, cover_w, cover_h) = if image_ratio > target_ratio {
            let fit_h = (f64::from(tw) / image_ratio) as u32;
            let cover_w = (f64::from(th) * image_ratio) as u32;
            (tw, fit_h.clamp(1, th), cover_w.max(tw), th)
        } else {
            let fit_w = (f64::from(th) * image_ratio) as u32;
            let cover_h = (f64::from(tw) / image_ratio) as u32;
            (fit_w.clamp(1, tw), th, tw, cover_h.max(th))
        };

        let foreground = image.resize_exact(fit_w, fit_h, FilterType::Lanczos3);
        let background = image
            .resize_exact(cover_w, cover_h, FilterType::CatmullRom)
            .blur(BACKGROUND_BLUR_SIGMA);

        let mut canvas = background.crop_imm((cover_w - tw) / 2, (cover_h - th) / 2, tw, th);
        imageops::overlay(
            &mut canvas,
            &foreground,
            i64::from((tw - fit_w) / 2),
            i64::from((th - fit_h) / 2),
        );
        canvas
    }

    fn encode(image: &DynamicImage, format: ImageFormat) -> ImageResult<Vec<u8>> {
        let mut out = Vec::new();
        if format == ImageFormat::Jpeg {
            let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        } else {
            image.write_to(&mut Cursor::new(&mut out), format)?;
        }
        Ok(out)
    }

}
