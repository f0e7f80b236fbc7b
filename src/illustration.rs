//! Illustration generation: one image per prompt, strictly sequential.
//!
//! Each prompt is retried independently under the context's
//! [`RetryPolicy`](crate::retry::RetryPolicy). A prompt that never yields an
//! image, or that hits a quota signature, becomes `None` at its own position;
//! the batch always returns exactly one entry per prompt and never fails.
//! After every prompt the context's `image_pacing` pause is applied to stay
//! under provider rate limits.

use crate::backend::{GenerateRequest, GenerationBackend, Modality};
use crate::context::StoryCtx;
use crate::StoryError;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Wrap a story prompt in the storybook art direction.
pub fn enhance_prompt(prompt: &str) -> String {
    format!(
        "A children's storybook illustration of: {}. Style: colorful, friendly, vibrant, storybook art.",
        prompt
    )
}

/// Generate one illustration per prompt, preserving positions.
///
/// `story_context` is the full story text; it is recorded for diagnostics
/// only. An unavailable backend returns all `None` without making calls.
#[instrument(skip_all, fields(prompts = prompts.len(), context_chars = story_context.len()))]
pub async fn generate_illustrations(
    ctx: &StoryCtx,
    prompts: &[String],
    story_context: &str,
) -> Vec<Option<Vec<u8>>> {
    let backend = match ctx.backend() {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "skipping illustrations");
            return vec![None; prompts.len()];
        }
    };

    info!("generating illustrations");
    let mut images = Vec::with_capacity(prompts.len());

    for (index, prompt) in prompts.iter().enumerate() {
        images.push(illustrate(ctx, backend, index, prompts.len(), prompt).await);
        tokio::time::sleep(ctx.image_pacing).await;
    }

    let produced = images.iter().filter(|i| i.is_some()).count();
    info!(produced, total = images.len(), "illustrations finished");
    images
}

async fn illustrate(
    ctx: &StoryCtx,
    backend: &Arc<dyn GenerationBackend>,
    index: usize,
    total: usize,
    prompt: &str,
) -> Option<Vec<u8>> {
    let request = GenerateRequest::text(ctx.image_model.as_str(), enhance_prompt(prompt))
        .with_modalities(&[Modality::Text, Modality::Image]);
    let request = &request;
    let label = format!("illustration {}/{}", index + 1, total);

    let result = ctx
        .retry
        .run(&label, |_| async move {
            let response = backend.generate(request).await?;
            response
                .first_inline_data()
                .map(<[u8]>::to_vec)
                .ok_or(StoryError::NoImageData)
        })
        .await;

    match result {
        Ok(bytes) => {
            info!(image = index + 1, bytes = bytes.len(), "illustration generated");
            Some(bytes)
        }
        Err(StoryError::QuotaExceeded(reason)) => {
            warn!(image = index + 1, %reason, "quota hit, leaving illustration empty");
            None
        }
        Err(e) => {
            error!(image = index + 1, error = %e, "illustration failed");
            None
        }
    }
}
