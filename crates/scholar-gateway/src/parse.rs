//! Gemini REST response parsing.

use base64::Engine;
use serde_json::Value;

use scholar_core::{Result, ScholarError};

use crate::traits::GeneratedImage;

/// Concatenated text of the first candidate, or `None` if it carries no text.
///
/// Errors on an embedded `error` object or a blocked prompt.
pub fn extract_text(value: &Value) -> Result<Option<String>> {
    if let Some(err) = value.get("error") {
        let message = err["message"].as_str().unwrap_or("unknown error");
        return Err(ScholarError::Remote(message.to_string()));
    }
    if let Some(reason) = value["promptFeedback"]["blockReason"].as_str() {
        return Err(ScholarError::Remote(format!("prompt blocked: {}", reason)));
    }

    let Some(parts) = value["candidates"][0]["content"]["parts"].as_array() else {
        return Ok(None);
    };

    let text: String = parts
        .iter()
        .filter(|p| !p["thought"].as_bool().unwrap_or(false))
        .filter_map(|p| p["text"].as_str())
        .collect();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Text of a complete `generateContent` response.
pub fn parse_generate_response(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScholarError::Remote(format!("malformed model response: {}", e)))?;

    match extract_text(&value)? {
        Some(text) => Ok(text),
        None => {
            let reason = value["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("no candidates");
            Err(ScholarError::Remote(format!(
                "model returned no text ({})",
                reason
            )))
        }
    }
}

/// Fragment carried by one SSE payload of `streamGenerateContent`.
pub fn parse_stream_chunk(payload: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ScholarError::Remote(format!("malformed stream chunk: {}", e)))?;
    extract_text(&value)
}

/// Human-readable message for a non-success HTTP response.
pub fn error_message(status: u16, body: &[u8]) -> String {
    let detail = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    if detail.is_empty() {
        format!("request failed with status {}", status)
    } else {
        format!("request failed with status {}: {}", status, detail)
    }
}

/// Images from an Imagen `predict` response.
pub fn parse_image_predictions(body: &[u8]) -> Result<Vec<GeneratedImage>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ScholarError::Remote(format!("malformed image response: {}", e)))?;

    let predictions = value["predictions"].as_array().cloned().unwrap_or_default();
    let mut images = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        let Some(data) = prediction["bytesBase64Encoded"].as_str() else {
            continue;
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| ScholarError::Remote(format!("invalid image data: {}", e)))?;
        let media_type = prediction["mimeType"]
            .as_str()
            .unwrap_or("image/png")
            .to_string();
        images.push(GeneratedImage { media_type, bytes });
    }

    if images.is_empty() {
        return Err(ScholarError::Remote(
            "model returned no images".to_string(),
        ));
    }
    Ok(images)
}
