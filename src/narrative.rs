//! Narrative generation: request + character description → story document.
//!
//! One model call (under the retry policy) produces the title, moral,
//! sentences, and illustration prompts as a JSON object. The live output is
//! trusted as-is: sentence and prompt counts are requested, not enforced.
//! Only the [`fallback`](crate::fallback) provider guarantees shape.

use crate::backend::GenerateRequest;
use crate::context::StoryCtx;
use crate::error::{Result, StoryError};
use crate::fallback::create_fallback_story;
use crate::illustration::generate_illustrations;
use crate::parsing::parse_story_draft;
use crate::story::StoryDocument;
use crate::types::{image_count, StoryRequest, Theme};
use tracing::{debug, info, instrument, warn};

const DEFAULT_CUSTOM_SETTING: &str = "magical world of wonder and adventure";

/// Scene description for a theme key.
///
/// `custom` uses `special_ingredients` verbatim (or a generic setting when
/// empty); unknown keys are treated as `custom`.
pub fn theme_description(theme: &str, special_ingredients: &str) -> String {
    match Theme::parse(theme) {
        Theme::Forest => "magical forest with talking animals and ancient trees".to_string(),
        Theme::Space => "outer space adventure with planets, stars, and alien friends".to_string(),
        Theme::Ocean => "underwater kingdom with colorful fish and hidden treasures".to_string(),
        Theme::Kingdom => "magical kingdom with castles, dragons, and wizards".to_string(),
        Theme::Dinosaur => {
            "prehistoric world with friendly dinosaurs and ancient landscapes".to_string()
        }
        Theme::Custom if special_ingredients.trim().is_empty() => DEFAULT_CUSTOM_SETTING.to_string(),
        Theme::Custom => special_ingredients.to_string(),
    }
}

/// Build the single composite story prompt.
pub fn build_story_prompt(request: &StoryRequest, child_description: &str) -> String {
    let sentences = request.sentence_count();
    let prompts = image_count(sentences);
    let name = &request.kid_name;
    let age = &request.age_level;

    format!(
        r#"I want you to create a children's story with the following details:

# Character Details:
- Main character name: {name}
- Character description: {child_description}
- Age level: {age}

# Story Setting:
- Theme: {theme}
- Story type: {story_type}

# Special Elements:
{special}

# Specific Instructions:
1. The story should be appropriate for the age group {age}.
2. The story should be composed of short sentences with simple words that are easy to pronounce.
3. Make {name} the central character of the story based on the provided description.
4. The progression of the story should be consistent with a clear start, middle & end with a satisfying conclusion.
5. Consider using rhyme & repetition in the story & incorporate vivid imagery for the story environment.
6. The story MUST ALWAYS BE EXACTLY {sentences} sentences long. Provide a title as well as a moral.
7. Once you create the entire story, combining 2 story sentences at a time, create a total of {prompts} one line prompts for generating images of the story.
8. Consider the entire story when creating image prompts.
9. Always include character information in the prompt. For example, if the character is a human, animal etc.
10. The prompts should be self contained but also convey the context with respect to the complete story.
11. Respond with ONLY the following JSON structure. DO NOT add any other text and DO NOT use markdown:
{{
    "title": "Story Title",
    "moral": "The moral of the story",
    "story": ["Sentence 1", "Sentence 2", ...],
    "imagePrompts": ["Image prompt 1", "Image prompt 2", ...]
}}"#,
        theme = theme_description(&request.theme, request.special_ingredients()),
        story_type = request.story_type,
        special = request.special_ingredients(),
    )
}

/// Generate a story with illustrations.
///
/// - A quota signature on any attempt returns fallback content immediately.
/// - Malformed JSON counts against the attempt budget.
/// - Anything else that exhausts the budget is [`StoryError::GenerationFailed`].
///
/// Illustrations are generated only after a successful parse.
#[instrument(skip_all, fields(kid_name = %request.kid_name, theme = %request.theme))]
pub async fn generate_story(
    ctx: &StoryCtx,
    request: &StoryRequest,
    child_description: &str,
) -> Result<StoryDocument> {
    let backend = ctx.backend()?;
    let llm_request = GenerateRequest::text(
        ctx.text_model.as_str(),
        build_story_prompt(request, child_description),
    );
    let llm_request = &llm_request;

    info!(sentences = request.sentence_count(), "generating story");

    let result = ctx
        .retry
        .run("story generation", |attempt| async move {
            let response = backend.generate(llm_request).await?;
            let text = response
                .text()
                .ok_or_else(|| StoryError::MalformedOutput("empty response".into()))?;
            debug!(attempt = attempt + 1, chars = text.len(), "parsing story response");
            parse_story_draft(&text)
        })
        .await;

    let draft = match result {
        Ok(draft) => draft,
        Err(StoryError::QuotaExceeded(reason)) => {
            warn!(%reason, "quota hit during story generation, using fallback story");
            return Ok(create_fallback_story(request, child_description));
        }
        Err(e) => return Err(StoryError::GenerationFailed(e.to_string())),
    };

    info!(
        title = %draft.title,
        sentences = draft.story.len(),
        image_prompts = draft.image_prompts.len(),
        "story parsed"
    );

    let story_context = draft.story.join(" ");
    let images = generate_illustrations(ctx, &draft.image_prompts, &story_context).await;
    Ok(draft.into_document(images))
}
