use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const TEXT_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "imagen-4.0-generate-001";
const EDIT_MODEL: &str = "imagen-3.0-capability-001";

/// Thin REST client for the generative provider. Prompt in, payload out;
/// callers decide what to do with failures.
pub struct GeminiClient<'a> {
    http: &'a Client,
    api_key: &'a str,
    base_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

impl<'a> GeminiClient<'a> {
    /// None when no API key is configured; the caller picks the fallback.
    pub fn from_state(state: &'a AppState) -> Option<Self> {
        state.config.gemini_api_key.as_deref().map(|api_key| Self {
            http: &state.http,
            api_key,
            base_url: &state.config.gemini_base_url,
        })
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, action)
    }

    /// One-shot text generation with a fixed system instruction.
    pub async fn generate_text(
        &self,
        system_instruction: &str,
        user_text: &str,
    ) -> AppResult<String> {
        let body = json!({
            "system_instruction": { "parts": [{ "text": system_instruction }] },
            "contents": [{ "parts": [{ "text": user_text }] }],
            "generationConfig": { "temperature": 0.7 },
        });

        let resp: GenerateContentResponse = self
            .http
            .post(self.model_url(TEXT_MODEL, "generateContent"))
            .header("x-goog-api-key", self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("text generation request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(format!("text generation rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("text generation response invalid: {e}")))?;

        resp.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Upstream("text generation returned no text".into()))
    }

    /// Square-aspect image generation. Returns the image as base64.
    pub async fn generate_image(&self, prompt: &str) -> AppResult<String> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "aspectRatio": "1:1" },
        });

        let resp = self.predict(IMAGE_MODEL, body).await?;
        first_image(resp).ok_or_else(|| AppError::Upstream("no images returned".into()))
    }

    /// Masked in-paint edit. Image and mask are base64 payloads.
    pub async fn edit_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mask_base64: &str,
    ) -> AppResult<String> {
        let body = json!({
            "instances": [{
                "prompt": prompt,
                "referenceImages": [
                    {
                        "referenceType": "REFERENCE_TYPE_RAW",
                        "referenceId": 1,
                        "referenceImage": { "bytesBase64Encoded": image_base64 },
                    },
                    {
                        "referenceType": "REFERENCE_TYPE_MASK",
                        "referenceId": 2,
                        "referenceImage": { "bytesBase64Encoded": mask_base64 },
                        "maskImageConfig": {
                            "maskMode": "MASK_MODE_USER_PROVIDED",
                            "dilation": 0.03,
                        },
                    },
                ],
            }],
            "parameters": {
                "editConfig": { "editMode": "EDIT_MODE_INPAINT_INSERTION" },
                "sampleCount": 1,
            },
        });

        let resp = self.predict(EDIT_MODEL, body).await?;
        first_image(resp).ok_or_else(|| AppError::Upstream("no images returned from edit".into()))
    }

    async fn predict(&self, model: &str, body: serde_json::Value) -> AppResult<PredictResponse> {
        self.http
            .post(self.model_url(model, "predict"))
            .header("x-goog-api-key", self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("image request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Upstream(format!("image request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("image response invalid: {e}")))
    }
}

fn first_image(resp: PredictResponse) -> Option<String> {
    resp.predictions
        .into_iter()
        .find_map(|p| p.bytes_base64_encoded)
        .filter(|b| !b.is_empty())
}
