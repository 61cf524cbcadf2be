use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegionEditRequest {
    /// Original image as base64, without the data URI prefix.
    pub image_base64: String,
    /// Mask as base64; white marks the region to edit.
    pub mask_base64: String,
    pub prompt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationResponse {
    /// `data:image/png;base64,...` payload usable directly as an image source.
    pub url: String,
    /// The prompt that was actually sent to the image model.
    pub prompt: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegionEditResponse {
    pub url: String,
    pub prompt: String,
    /// True when the provider-side edit failed and a fresh generation was
    /// returned instead of a true masked edit.
    pub fallback: bool,
}
