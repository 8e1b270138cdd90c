//! Gemini image editing client via the generative language developer API
//!
//! Sends the source image inline with an operation prompt and extracts the
//! edited image from the response.

use async_trait::async_trait;
use base64::Engine;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::providers::transform::{TransformOutput, TransformProvider, TransformRequest};
use crate::types::{Operation, Quality};

/// Message shown when the model responds without an image part
pub const NO_IMAGE_MESSAGE: &str = "The AI did not return an image. Please try again.";

const PROMPT_WATERMARK_LOW: &str = "Quickly perform a basic removal of the most obvious \
watermark or logo on this image. The main goal is speed. A simple content-aware fill is \
acceptable. Minor artifacts or slight blurring in the restored area are okay.";

const PROMPT_WATERMARK_MEDIUM: &str = "Your task is to identify and completely remove any \
watermarks or logos from this image. This includes text, symbols, or graphical overlays of \
any color, including white, black, or semi-transparent ones. After removing the element, \
you must seamlessly reconstruct the background behind it, ensuring the final image looks \
natural and shows no obvious signs of editing or major artifacts. Balance quality with \
reasonable processing time.";

const PROMPT_WATERMARK_HIGH: &str = "You are a world-class digital image restoration \
specialist. Your sole mission is to perform a perfect, undetectable removal of any and all \
watermarks, logos, text overlays, or graphical symbols from the provided image.

Follow these steps with extreme precision:
1. **Detection**: Meticulously scan the entire image for any foreign elements. This \
includes, but is not limited to: corner logos, repeating semi-transparent patterns, \
signatures, timestamps, and text overlays. They can be any color, including pure white, \
pure black, or have varying levels of opacity.
2. **Removal**: Completely eradicate the detected elements. Leave no trace, residue, or \
color bleed.
3. **Inpainting & Reconstruction**: This is the most critical step. You must flawlessly \
reconstruct the area where the watermark was. The inpainted area must perfectly match the \
surrounding background in terms of texture, lighting, color, grain, and perspective. The \
goal is for the final image to appear as if the watermark never existed. There should be \
zero visual artifacts, blurring, or smudging. The reconstruction must be seamless and \
photo-realistic.
4. **Final Verification**: Ensure the final image has the same dimensions as the original \
and that the subject matter is unaltered, apart from the removal of the watermark.

Your performance will be judged on the absolute invisibility of your edit. Prioritize \
maximum quality and realism above all else.";

const PROMPT_BACKGROUND: &str = "You are a professional graphic editor AI with a single, \
precise task: to flawlessly remove the background from an image.

Follow this exact procedure:
1. **Subject Identification**: Accurately identify the main subject(s) of the image. \
Distinguish it completely from the background.
2. **High-Precision Edge Detection**: Meticulously trace the outline of the subject(s). \
Pay extreme attention to fine details like hair, fur, semi-transparent edges, and complex \
shapes. The mask must be perfect.
3. **Background Removal**: Erase the background completely, leaving no artifacts, halos, \
or color bleeding around the subject.
4. **Output Format**: The final output MUST be a PNG image with a fully transparent \
background. This is a strict requirement. The subject should be the only opaque element.

Do not alter the subject in any way (colors, lighting, etc.). The goal is a clean, \
professional-grade cutout.";

/// Select the prompt for an operation; only watermark removal varies by quality
fn prompt_for(operation: Operation, quality: Quality) -> &'static str {
    match operation {
        Operation::WatermarkRemoval => match quality {
            Quality::Low => PROMPT_WATERMARK_LOW,
            Quality::Medium => PROMPT_WATERMARK_MEDIUM,
            Quality::High => PROMPT_WATERMARK_HIGH,
        },
        Operation::BackgroundRemoval => PROMPT_BACKGROUND,
    }
}

/// Gemini image editor client
pub struct GeminiImageEditor {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiImageEditor {
    /// Create a new client from configuration
    ///
    /// A missing API key is not fatal here: the service still boots and every
    /// transform fails with a `Config` error until a key is provided.
    pub fn new(config: &GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    /// Get the API endpoint URL
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(serde::Serialize)]
struct Part {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

/// Pull the first inline image out of a response
fn extract_image(response: GenerateResponse) -> Result<TransformOutput> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or_else(|| Error::Transform(NO_IMAGE_MESSAGE.to_string()))?;

    let data = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| Error::Transform(format!("Invalid image data in response: {}", e)))?;

    Ok(TransformOutput {
        data: data.into(),
        media_type: inline.mime_type,
    })
}

#[async_trait]
impl TransformProvider for GeminiImageEditor {
    async fn transform(&self, request: TransformRequest) -> Result<TransformOutput> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::Config("GEMINI_API_KEY is not set; cannot call the image model".to_string())
        })?;

        let prompt = prompt_for(request.operation, request.quality);
        let encoded = base64::engine::general_purpose::STANDARD.encode(&request.data);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: request.media_type,
                            data: encoded,
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(prompt.to_string()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transform(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transform(format!(
                "Gemini edit failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Transform(format!("Failed to parse Gemini response: {}", e)))?;

        extract_image(gen_response)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_varies_by_quality_for_watermark() {
        let low = prompt_for(Operation::WatermarkRemoval, Quality::Low);
        let medium = prompt_for(Operation::WatermarkRemoval, Quality::Medium);
        let high = prompt_for(Operation::WatermarkRemoval, Quality::High);
        assert_ne!(low, medium);
        assert_ne!(medium, high);
        assert_ne!(low, high);
    }

    #[test]
    fn test_background_prompt_ignores_quality() {
        let a = prompt_for(Operation::BackgroundRemoval, Quality::Low);
        let b = prompt_for(Operation::BackgroundRemoval, Quality::High);
        assert_eq!(a, b);
        assert!(a.contains("transparent"));
    }

    #[test]
    fn test_request_uses_camel_case_wire_names() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    inline_data: Some(InlineData {
                        mime_type: "image/png".to_string(),
                        data: "AAAA".to_string(),
                    }),
                    text: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"inlineData\""));
        assert!(json.contains("\"mimeType\""));
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"responseModalities\""));
        // the image part must not carry an empty text field
        assert!(!json.contains("\"text\""));
    }

    #[test]
    fn test_extract_image_from_response() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"pixels");
        let response: GenerateResponse = serde_json::from_str(&format!(
            r#"{{
                "candidates": [{{
                    "content": {{
                        "parts": [
                            {{"text": "here is your image"}},
                            {{"inlineData": {{"mimeType": "image/png", "data": "{}"}}}}
                        ]
                    }}
                }}]
            }}"#,
            encoded
        ))
        .unwrap();

        let output = extract_image(response).unwrap();
        assert_eq!(output.media_type, "image/png");
        assert_eq!(&output.data[..], b"pixels");
    }

    #[test]
    fn test_missing_image_part_yields_fixed_message() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "sorry"}]}}]}"#,
        )
        .unwrap();

        let err = extract_image(response).unwrap_err();
        assert!(err.to_string().contains(NO_IMAGE_MESSAGE));
    }

    #[test]
    fn test_endpoint_includes_model() {
        let editor = GeminiImageEditor::new(&GeminiConfig::default());
        assert_eq!(
            editor.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(editor.name(), "gemini");
        assert_eq!(editor.model(), "gemini-2.5-flash-image");
    }
}
