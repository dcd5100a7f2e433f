use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct BatchAnnotateRequest<'a> {
    pub requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AnnotateImageRequest<'a> {
    pub image: ImageContent,
    pub features: Vec<Feature<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ImageContent {
    /// Base64-encoded image bytes.
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Feature<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    pub error: Option<Status>,
}

/// A unit of recognized text. The service lists the full text first, then
/// the individual words.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Pixel coordinates; the service omits zero values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

/// `{"error": {...}}` body of a failed HTTP call.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: Status,
}
