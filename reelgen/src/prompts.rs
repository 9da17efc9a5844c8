//! Prompt construction collaborator.
//!
//! The orchestrator delegates all prompt text to a [`PromptBuilder`].
//! [`DefaultPromptBuilder`] produces the structured UGC prompts the image
//! and video models respond well to: one `key: value` directive per line,
//! deliberately amateur camera language, no studio polish.

use crate::enrichment::ReferenceAnalysis;
use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// Camera directives for still images.
const IMAGE_CAMERA_KEYWORDS: &str = "unremarkable amateur iPhone photo, reddit image, \
     snapchat photo, casual iPhone selfie, slightly uneven framing, authentic share, \
     slightly blurry, amateur quality phone photo";

/// Camera directives for video.
const VIDEO_CAMERA_KEYWORDS: &str = "amateur iPhone selfie video, unremarkable amateur \
     iPhone video, snapchat video, casual iPhone selfie video, slightly uneven framing, \
     authentic share, slightly shaky camera, amateur quality phone video";

/// Attribute fields describing the person to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttributes {
    /// Age range, e.g. `"20s"`.
    pub age: String,
    /// Gender presentation.
    pub gender: String,
    /// Ethnicity.
    pub ethnicity: String,
    /// Facial expression.
    pub expression: String,
    /// Clothing style.
    pub clothing: String,
    /// Background setting.
    pub background: String,
}

impl Default for PersonAttributes {
    fn default() -> Self {
        Self {
            age: "20s".to_string(),
            gender: "female".to_string(),
            ethnicity: "caucasian".to_string(),
            expression: "smiling".to_string(),
            clothing: "casual".to_string(),
            background: "home".to_string(),
        }
    }
}

/// How the caller describes the stage-1 person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonPromptSpec {
    /// Structured attribute fields; the builder writes the prompt.
    Fields(PersonAttributes),
    /// A fully caller-written prompt.
    Custom(String),
}

/// Builds the text prompts fed to providers.
pub trait PromptBuilder: Send + Sync {
    /// Builds the stage-1 person generation prompt.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a custom prompt is empty.
    fn person_prompt(&self, spec: &PersonPromptSpec) -> Result<String, PipelineError>;

    /// Builds the stage-2 compositing prompt. `custom` wins when supplied.
    fn composite_prompt(
        &self,
        reference: Option<&ReferenceAnalysis>,
        custom: Option<&str>,
    ) -> String;

    /// Builds the stage-3 animation prompt from the caller's raw prompt.
    fn video_prompt(&self, raw_prompt: &str, reference: Option<&ReferenceAnalysis>) -> String;
}

/// Structured UGC prompt builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptBuilder;

impl DefaultPromptBuilder {
    /// Creates the default builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PromptBuilder for DefaultPromptBuilder {
    fn person_prompt(&self, spec: &PersonPromptSpec) -> Result<String, PipelineError> {
        match spec {
            PersonPromptSpec::Custom(prompt) => {
                if prompt.trim().is_empty() {
                    return Err(PipelineError::validation(
                        "person prompt required and must not be empty",
                    ));
                }
                Ok(prompt.clone())
            }
            PersonPromptSpec::Fields(fields) => Ok(build_person_prompt(fields)),
        }
    }

    fn composite_prompt(
        &self,
        reference: Option<&ReferenceAnalysis>,
        custom: Option<&str>,
    ) -> String {
        if let Some(custom) = custom {
            if !custom.trim().is_empty() {
                return custom.to_string();
            }
        }
        let unknown = ReferenceAnalysis::unknown();
        let reference = reference.unwrap_or(&unknown);
        build_composite_prompt(&reference.description, &reference.brand)
    }

    fn video_prompt(&self, raw_prompt: &str, reference: Option<&ReferenceAnalysis>) -> String {
        let direction = VideoDirection::parse(raw_prompt);
        let product_type = reference.map_or("product", |r| {
            if r.description.is_empty() {
                "product"
            } else {
                r.description.as_str()
            }
        });
        build_video_prompt(&direction, product_type)
    }
}

/// Dialogue, action and emotion extracted from a raw video prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VideoDirection {
    dialogue: String,
    action: String,
    emotion: String,
}

impl VideoDirection {
    /// Parses `dialogue:`, `action:` and `emotion:` lines; a freeform prompt
    /// becomes the dialogue with default staging.
    fn parse(raw: &str) -> Self {
        let mut direction = Self {
            dialogue: String::new(),
            action: "character sits holding the product casually while speaking".to_string(),
            emotion: "casual and happy".to_string(),
        };

        if raw.contains('\n') && raw.contains(':') {
            for line in raw.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    let value = value.trim().to_string();
                    match key.trim().to_lowercase().as_str() {
                        "dialogue" => direction.dialogue = value,
                        "action" => direction.action = value,
                        "emotion" => direction.emotion = value,
                        _ => {}
                    }
                }
            }
        } else {
            direction.dialogue = raw.trim().to_string();
        }
        direction
    }
}

fn map_or_passthrough<'a>(table: &[(&str, &'a str)], key: &'a str) -> &'a str {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map_or(key, |(_, description)| description)
}

fn build_person_prompt(fields: &PersonAttributes) -> String {
    let age = map_or_passthrough(
        &[
            ("teens", "teenager"),
            ("20s", "person in their 20s"),
            ("30s", "person in their 30s"),
            ("40s", "person in their 40s"),
        ],
        &fields.age,
    );
    let clothing = map_or_passthrough(
        &[
            ("casual", "casual everyday clothing"),
            ("business", "business casual attire"),
            ("athletic", "athletic wear"),
            ("streetwear", "trendy streetwear"),
        ],
        &fields.clothing,
    );
    let background = map_or_passthrough(
        &[
            ("home", "cozy home interior"),
            ("outdoor", "casual outdoor setting"),
            ("office", "modern office environment"),
            ("cafe", "coffee shop interior"),
        ],
        &fields.background,
    );

    [
        "action: person with hand raised naturally in front of body, palm open and visible"
            .to_string(),
        format!(
            "character: {age}, {} {}, {} expression, wearing {clothing}",
            fields.ethnicity, fields.gender, fields.expression
        ),
        format!("setting: {background}, casual real-world environment"),
        format!("camera: {IMAGE_CAMERA_KEYWORDS}"),
        "style: candid UGC look, no filters, visible imperfections, natural lighting"
            .to_string(),
        "composition: medium shot portrait, person centered with space around them".to_string(),
        "framing: good framing with person fully visible in frame".to_string(),
    ]
    .join("\n")
}

fn build_composite_prompt(product_description: &str, brand_name: &str) -> String {
    [
        "action: same person now casually presenting the product to camera, held at \
         comfortable natural distance"
            .to_string(),
        "character: keep the same person from the original image - same face, expression, \
         and overall appearance"
            .to_string(),
        format!(
            "product: {product_description}, show product with all visible text clear and \
             accurate, brand name {brand_name}"
        ),
        "hand_position: relaxed grip with fingers naturally curved around product".to_string(),
        "scale: product appears normal-sized relative to hand, not oversized".to_string(),
        "lighting: preserve the exact same lighting, exposure, and color temperature from \
         the original image"
            .to_string(),
        format!("camera: {IMAGE_CAMERA_KEYWORDS}"),
        "integration: seamless as if person always held the product, natural shadows where \
         hand touches product"
            .to_string(),
        "text_accuracy: preserve all visible product text exactly as shown".to_string(),
    ]
    .join("\n")
}

fn build_video_prompt(direction: &VideoDirection, product_type: &str) -> String {
    let dialogue = if direction.dialogue.is_empty() {
        format!("honestly, this {product_type} surprised me. really glad I tried it.")
    } else {
        direction.dialogue.clone()
    };
    [
        format!("dialogue: {dialogue}"),
        format!("action: {}", direction.action),
        format!("emotion: {}", direction.emotion),
        "character: person from the composite image, same appearance throughout".to_string(),
        format!("camera: {VIDEO_CAMERA_KEYWORDS}"),
        "style: candid selfie-style UGC video, natural speech cadence".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_person_prompt_passes_through() {
        let builder = DefaultPromptBuilder::new();
        let prompt = builder
            .person_prompt(&PersonPromptSpec::Custom("a runner on a beach".to_string()))
            .unwrap();
        assert_eq!(prompt, "a runner on a beach");
    }

    #[test]
    fn test_empty_custom_person_prompt_is_validation_error() {
        let builder = DefaultPromptBuilder::new();
        let err = builder
            .person_prompt(&PersonPromptSpec::Custom("  ".to_string()))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_field_prompt_maps_known_attributes() {
        let builder = DefaultPromptBuilder::new();
        let prompt = builder
            .person_prompt(&PersonPromptSpec::Fields(PersonAttributes::default()))
            .unwrap();
        assert!(prompt.contains("person in their 20s"));
        assert!(prompt.contains("casual everyday clothing"));
        assert!(prompt.contains("cozy home interior"));
        assert!(prompt.contains("camera:"));
    }

    #[test]
    fn test_unknown_attribute_values_pass_through() {
        let fields = PersonAttributes {
            background: "rooftop garden".to_string(),
            ..PersonAttributes::default()
        };
        let builder = DefaultPromptBuilder::new();
        let prompt = builder
            .person_prompt(&PersonPromptSpec::Fields(fields))
            .unwrap();
        assert!(prompt.contains("rooftop garden"));
    }

    #[test]
    fn test_composite_prompt_prefers_custom_text() {
        let builder = DefaultPromptBuilder::new();
        let prompt = builder.composite_prompt(None, Some("hold the bottle higher"));
        assert_eq!(prompt, "hold the bottle higher");
    }

    #[test]
    fn test_composite_prompt_uses_reference_analysis() {
        let builder = DefaultPromptBuilder::new();
        let analysis = ReferenceAnalysis {
            brand: "Glow Labs".to_string(),
            description: "amber glass serum bottle".to_string(),
            colors: vec!["amber".to_string()],
        };
        let prompt = builder.composite_prompt(Some(&analysis), None);
        assert!(prompt.contains("amber glass serum bottle"));
        assert!(prompt.contains("Glow Labs"));
    }

    #[test]
    fn test_video_prompt_parses_structured_directives() {
        let builder = DefaultPromptBuilder::new();
        let raw = "dialogue: this changed my mornings\naction: holds mug up\nemotion: excited";
        let prompt = builder.video_prompt(raw, None);
        assert!(prompt.contains("dialogue: this changed my mornings"));
        assert!(prompt.contains("action: holds mug up"));
        assert!(prompt.contains("emotion: excited"));
    }

    #[test]
    fn test_freeform_video_prompt_becomes_dialogue() {
        let builder = DefaultPromptBuilder::new();
        let prompt = builder.video_prompt("I can't stop using this", None);
        assert!(prompt.contains("dialogue: I can't stop using this"));
        assert!(prompt.contains("action: character sits holding the product"));
    }
}
