use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{
    dto::generation::{
        GenerateRequest, GenerationResponse, RegionEditRequest, RegionEditResponse,
    },
    error::{AppError, AppResult},
    gemini::GeminiClient,
    response::ApiResponse,
    state::AppState,
};

const ENHANCE_SYSTEM_INSTRUCTION: &str = "\
You are an expert textile and bandana design prompt engineer.

TASK:
Transform the user's idea into a single, precise English prompt for AI image generation.

PRODUCT CONSTRAINTS:
- Product type: bandana (square fabric scarf)
- Flat 2D textile design, no 3D objects
- Seamless or repeatable pattern
- Centered and well-balanced composition
- High contrast, clear shapes
- Suitable for fabric printing

STYLE CONSTRAINTS:
- No text, no letters, no numbers
- No logos, no watermarks
- No photo-realism
- No people, no animals unless explicitly requested
- Clean vector-like illustration style

OUTPUT RULES:
- Return ONLY the final enhanced prompt
- Do NOT include explanations, notes, or formatting
- Do NOT mention any AI model names";

/// Prompt rewriting never fails the caller: any provider problem yields the
/// user's text unchanged.
async fn enhance_prompt(client: &GeminiClient<'_>, user_text: &str) -> String {
    match client
        .generate_text(ENHANCE_SYSTEM_INSTRUCTION, user_text)
        .await
    {
        Ok(enhanced) => enhanced,
        Err(err) => {
            tracing::warn!(%err, "prompt enhancement failed, using raw prompt");
            user_text.to_string()
        }
    }
}

pub async fn generate_pattern(
    state: &AppState,
    payload: GenerateRequest,
) -> AppResult<ApiResponse<GenerationResponse>> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt must not be empty".into()));
    }

    let client = GeminiClient::from_state(state)
        .ok_or_else(|| AppError::Upstream("generation provider is not configured".into()))?;

    let final_prompt = enhance_prompt(&client, prompt).await;
    let image_base64 = client.generate_image(&final_prompt).await?;

    Ok(ApiResponse::success(
        "Pattern generated",
        GenerationResponse {
            url: data_uri(&image_base64),
            prompt: final_prompt,
        },
        None,
    ))
}

pub async fn edit_region(
    state: &AppState,
    payload: RegionEditRequest,
) -> AppResult<ApiResponse<RegionEditResponse>> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("prompt must not be empty".into()));
    }
    validate_base64("image_base64", &payload.image_base64)?;
    validate_base64("mask_base64", &payload.mask_base64)?;

    let client = GeminiClient::from_state(state)
        .ok_or_else(|| AppError::Upstream("generation provider is not configured".into()))?;

    let enhanced =
        enhance_prompt(&client, &format!("Edit the selected region to: {prompt}")).await;

    match client
        .edit_image(&enhanced, &payload.image_base64, &payload.mask_base64)
        .await
    {
        Ok(image_base64) => Ok(ApiResponse::success(
            "Region edited",
            RegionEditResponse {
                url: data_uri(&image_base64),
                prompt: enhanced,
                fallback: false,
            },
            None,
        )),
        Err(err) => {
            tracing::warn!(%err, "masked edit failed, regenerating from prompt context");
            let fallback_prompt = format!(
                "A bandana pattern design. {enhanced}. Style should match: seamless, \
                 tileable pattern suitable for fabric printing."
            );
            let image_base64 = client.generate_image(&fallback_prompt).await?;
            Ok(ApiResponse::success(
                "Region edited with fallback generation",
                RegionEditResponse {
                    url: data_uri(&image_base64),
                    prompt: fallback_prompt,
                    fallback: true,
                },
                None,
            ))
        }
    }
}

fn data_uri(image_base64: &str) -> String {
    format!("data:image/png;base64,{image_base64}")
}

fn validate_base64(field: &str, payload: &str) -> AppResult<()> {
    if payload.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    STANDARD
        .decode(payload)
        .map_err(|_| AppError::Validation(format!("{field} is not valid base64")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_validation_accepts_padded_payloads() {
        assert!(validate_base64("image_base64", "aGVsbG8=").is_ok());
    }

    #[test]
    fn base64_validation_rejects_garbage() {
        assert!(validate_base64("image_base64", "not base64!!").is_err());
        assert!(validate_base64("mask_base64", "").is_err());
    }

    #[test]
    fn data_uri_has_png_prefix() {
        assert_eq!(data_uri("abc"), "data:image/png;base64,abc");
    }
}
