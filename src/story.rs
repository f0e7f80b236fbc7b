//! Story documents and their transport form.
//!
//! [`StoryDocument`] is built once per request and never mutated. Its JSON
//! form is the serialization boundary to the response and persistence
//! layers: field names follow the wire contract (`imagePrompts`), and each
//! image is a base64 string or `null`, kept at its prompt's position.

use serde::{Deserialize, Serialize};

/// A finished story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDocument {
    pub title: String,
    pub moral: String,
    /// Ordered narrative sentences.
    pub story: Vec<String>,
    /// Ordered illustration prompts.
    #[serde(rename = "imagePrompts")]
    pub image_prompts: Vec<String>,
    /// `images[i]` illustrates `image_prompts[i]`; `None` marks a failed illustration.
    #[serde(with = "base64_images")]
    pub images: Vec<Option<Vec<u8>>>,
}

impl StoryDocument {
    /// Serialize to the transport JSON form.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the transport JSON form.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Images in transport form.
    pub fn encoded_images(&self) -> Vec<Option<String>> {
        base64_images::encode_all(&self.images)
    }

    /// Number of illustrations that were actually produced.
    pub fn illustrated_count(&self) -> usize {
        self.images.iter().filter(|i| i.is_some()).count()
    }
}

/// The JSON object the narrative model is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoryDraft {
    pub title: String,
    pub moral: String,
    pub story: Vec<String>,
    #[serde(rename = "imagePrompts")]
    pub image_prompts: Vec<String>,
}

impl StoryDraft {
    /// Attach illustrations, producing the final document.
    pub fn into_document(self, images: Vec<Option<Vec<u8>>>) -> StoryDocument {
        StoryDocument {
            title: self.title,
            moral: self.moral,
            story: self.story,
            image_prompts: self.image_prompts,
            images,
        }
    }
}

/// Serde adapter: `Vec<Option<Vec<u8>>>` ⇄ `[base64 | null, ...]`.
pub mod base64_images {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    fn engine() -> base64::engine::GeneralPurpose {
        base64::engine::general_purpose::STANDARD
    }

    pub fn encode_all(images: &[Option<Vec<u8>>]) -> Vec<Option<String>> {
        images
            .iter()
            .map(|img| img.as_ref().map(|bytes| engine().encode(bytes)))
            .collect()
    }

    pub fn serialize<S: Serializer>(images: &[Option<Vec<u8>>], serializer: S) -> Result<S::Ok, S::Error> {
        encode_all(images).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Option<Vec<u8>>>, D::Error> {
        let encoded: Vec<Option<String>> = Vec::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|img| match img {
                Some(text) => engine()
                    .decode(text)
                    .map(Some)
                    .map_err(<D::Error as serde::de::Error>::custom),
                None => Ok(None),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StoryDocument {
        StoryDocument {
            title: "Mia's Cosmic Journey".into(),
            moral: "Be brave.".into(),
            story: vec!["One.".into(), "Two.".into(), "Three.".into(), "Four.".into()],
            image_prompts: vec!["first".into(), "second".into()],
            images: vec![None, Some(vec![0x89, b'P', b'N', b'G'])],
        }
    }

    #[test]
    fn test_transport_form_shape() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["imagePrompts"], json!(["first", "second"]));
        assert_eq!(value["images"], json!([null, "iVBORw=="]));
    }

    #[test]
    fn test_round_trip_preserves_order_and_null_positions() {
        let doc = sample();
        let back = StoryDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(back, doc);
        assert!(back.images[0].is_none());
        assert_eq!(back.illustrated_count(), 1);
    }

    #[test]
    fn test_bad_base64_rejected() {
        let text = r#"{"title":"t","moral":"m","story":[],"imagePrompts":["p"],"images":["***"]}"#;
        assert!(StoryDocument::from_json(text).is_err());
    }

    #[test]
    fn test_draft_into_document() {
        let draft: StoryDraft = serde_json::from_value(json!({
            "title": "T",
            "moral": "M",
            "story": ["a", "b"],
            "imagePrompts": ["p"]
        }))
        .unwrap();
        let doc = draft.into_document(vec![None]);
        assert_eq!(doc.image_prompts, vec!["p"]);
        assert_eq!(doc.images, vec![None]);
    }
}
