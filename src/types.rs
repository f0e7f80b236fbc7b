use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentence count used when `story_length` is not recognized.
pub const DEFAULT_SENTENCE_COUNT: usize = 8;

/// Number of narrative sentences for a story length tier.
///
/// `short` → 6, `medium` → 8, `long` → 12; anything else → 8.
pub fn sentence_count(story_length: &str) -> usize {
    match story_length {
        "short" => 6,
        "medium" => 8,
        "long" => 12,
        other => {
            debug!(story_length = other, "unrecognized story length, using default");
            DEFAULT_SENTENCE_COUNT
        }
    }
}

/// Number of illustrations for a given sentence count (one per two sentences).
pub fn image_count(sentence_count: usize) -> usize {
    sentence_count / 2
}

/// A story request as received from the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRequest {
    /// Name of the child; the protagonist.
    pub kid_name: String,

    /// Target age group, passed to the model verbatim.
    pub age_level: String,

    /// Theme key (`forest`, `space`, `ocean`, `kingdom`, `dinosaur`, `custom`).
    pub theme: String,

    /// Story type, passed to the model verbatim.
    pub story_type: String,

    /// Length tier: `short`, `medium`, or `long`.
    pub story_length: String,

    /// Free-form extra elements; also the custom theme description.
    #[serde(default)]
    pub special_ingredients: Option<String>,
}

impl StoryRequest {
    pub fn new(kid_name: impl Into<String>, theme: impl Into<String>) -> Self {
        Self {
            kid_name: kid_name.into(),
            age_level: "3-5".to_string(),
            theme: theme.into(),
            story_type: "adventure".to_string(),
            story_length: "medium".to_string(),
            special_ingredients: None,
        }
    }

    pub fn with_age_level(mut self, age_level: impl Into<String>) -> Self {
        self.age_level = age_level.into();
        self
    }

    pub fn with_story_type(mut self, story_type: impl Into<String>) -> Self {
        self.story_type = story_type.into();
        self
    }

    pub fn with_length(mut self, story_length: impl Into<String>) -> Self {
        self.story_length = story_length.into();
        self
    }

    pub fn with_special_ingredients(mut self, ingredients: impl Into<String>) -> Self {
        self.special_ingredients = Some(ingredients.into());
        self
    }

    /// Required sentence count for this request.
    pub fn sentence_count(&self) -> usize {
        sentence_count(&self.story_length)
    }

    /// Special ingredients, or `""` when absent.
    pub fn special_ingredients(&self) -> &str {
        self.special_ingredients.as_deref().unwrap_or("")
    }
}

/// Known story themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Forest,
    Space,
    Ocean,
    Kingdom,
    Dinosaur,
    Custom,
}

impl Theme {
    /// Parse a theme key. Unknown keys map to [`Theme::Custom`].
    pub fn parse(key: &str) -> Self {
        match key {
            "forest" => Theme::Forest,
            "space" => Theme::Space,
            "ocean" => Theme::Ocean,
            "kingdom" => Theme::Kingdom,
            "dinosaur" => Theme::Dinosaur,
            "custom" => Theme::Custom,
            other => {
                debug!(theme = other, "unrecognized theme, treating as custom");
                Theme::Custom
            }
        }
    }

    /// The theme key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Forest => "forest",
            Theme::Space => "space",
            Theme::Ocean => "ocean",
            Theme::Kingdom => "kingdom",
            Theme::Dinosaur => "dinosaur",
            Theme::Custom => "custom",
        }
    }
}
