//! Photo analysis: uploaded image bytes → short character description.
//!
//! [`analyze_photo`] is total. Unreadable images, quota errors, exhausted
//! retries, and an unavailable backend all yield [`DEFAULT_DESCRIPTION`].
//! Photos are decoded with the `image` crate before any backend call.

use crate::backend::{GenerateRequest, Part};
use crate::context::StoryCtx;
use crate::error::{Result, StoryError};
use image::ImageReader;
use std::io::Cursor;
use tracing::{debug, error, info, instrument, warn};

/// Description used whenever analysis cannot produce one.
pub const DEFAULT_DESCRIPTION: &str = "A cheerful child with a bright smile and curious eyes.";

const ANALYSIS_PROMPT: &str = "Describe this child in detail for a storybook character description. \
Include physical attributes like hair color, eye color, clothing, and any distinctive features. \
Keep the description child-friendly and positive. \
Focus only on the child in the image. \
Provide the description in 3-4 sentences maximum.";

/// Decode `bytes` as an image and return the MIME type of its format.
///
/// Accepts PNG, JPEG, GIF, WebP, and BMP. The whole image is decoded, so a
/// recognizable header over a corrupt body is still [`StoryError::UnreadableImage`].
pub fn decode_photo(bytes: &[u8]) -> Result<&'static str> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| StoryError::UnreadableImage(e.to_string()))?;
    let format = reader.format().ok_or_else(|| {
        StoryError::UnreadableImage(format!("{} bytes in an unrecognized format", bytes.len()))
    })?;
    let image = reader
        .decode()
        .map_err(|e| StoryError::UnreadableImage(e.to_string()))?;

    debug!(
        format = ?format,
        width = image.width(),
        height = image.height(),
        "decoded photo"
    );
    Ok(format.to_mime_type())
}

/// Describe the child in `photo` for story personalization. Never fails.
#[instrument(skip_all, fields(photo_bytes = photo.len()))]
pub async fn analyze_photo(ctx: &StoryCtx, photo: &[u8]) -> String {
    match try_analyze_photo(ctx, photo).await {
        Ok(description) => description,
        Err(StoryError::QuotaExceeded(reason)) => {
            warn!(%reason, "photo analysis hit quota, using default description");
            DEFAULT_DESCRIPTION.to_string()
        }
        Err(e) => {
            error!(error = %e, "photo analysis failed, using default description");
            DEFAULT_DESCRIPTION.to_string()
        }
    }
}

async fn try_analyze_photo(ctx: &StoryCtx, photo: &[u8]) -> Result<String> {
    let backend = ctx.backend()?;
    let mime_type = decode_photo(photo)?;
    info!(mime_type, "analyzing photo");

    let request = GenerateRequest::text(ctx.vision_model.as_str(), ANALYSIS_PROMPT).with_part(
        Part::InlineData {
            mime_type: mime_type.to_string(),
            data: photo.to_vec(),
        },
    );

    let request = &request;
    let description = ctx
        .retry
        .run("photo analysis", |_| async move {
            let response = backend.generate(request).await?;
            response
                .text()
                .map(|t| t.trim().to_string())
                .ok_or_else(|| StoryError::MalformedOutput("empty vision response".into()))
        })
        .await?;

    info!("photo analyzed");
    Ok(description)
}

/// A small valid PNG for tests.
#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    sample_image(image::ImageFormat::Png)
}

#[cfg(test)]
fn sample_image(format: image::ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode sample image");
    bytes
}
