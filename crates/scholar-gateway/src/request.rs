//! Gemini REST request bodies and URLs.

use base64::Engine;
use serde_json::{json, Value};

use scholar_core::{ModelTurn, PromptPart, Role};

use crate::traits::ImageRequest;

/// Wire name of a role. Gemini calls the assistant `model`.
pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

pub fn part_json(part: &PromptPart) -> Value {
    match part {
        PromptPart::Text(text) => json!({ "text": text }),
        PromptPart::InlineMedia { bytes, media_type } => json!({
            "inlineData": {
                "mimeType": media_type,
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }
        }),
    }
}

pub fn content_json(role: Role, parts: &[PromptPart]) -> Value {
    json!({
        "role": role_name(role),
        "parts": parts.iter().map(part_json).collect::<Vec<_>>(),
    })
}

/// Body for `generateContent` / `streamGenerateContent`.
///
/// `history` is folded in before the new user turn.
pub fn build_generate_body(
    history: &[ModelTurn],
    parts: &[PromptPart],
    system_instruction: Option<&str>,
    generation_config: Option<Value>,
) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|turn| content_json(turn.role, &turn.parts))
        .collect();
    contents.push(content_json(Role::User, parts));

    let mut body = json!({ "contents": contents });

    if let Some(instruction) = system_instruction.filter(|s| !s.trim().is_empty()) {
        body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
    }
    if let Some(config) = generation_config {
        body["generationConfig"] = config;
    }
    body
}

/// Generation config declaring a JSON response shape.
pub fn structured_config(schema: &Value) -> Value {
    json!({
        "responseMimeType": "application/json",
        "responseSchema": schema,
    })
}

pub fn temperature_config(temperature: f32) -> Value {
    json!({ "temperature": temperature })
}

/// Body for the Imagen `predict` endpoint.
pub fn build_image_body(request: &ImageRequest) -> Value {
    json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": { "sampleCount": request.number_of_images },
    })
}

/// `{base}/v1beta/models/{model}:{method}`.
pub fn model_url(base_url: &str, model: &str, method: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let model = model.trim_start_matches("models/");
    format!("{}/v1beta/models/{}:{}", base, model, method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_url_handles_trailing_slash_and_prefix() {
        assert_eq!(
            model_url("https://api.example.com/", "models/gemini-x", "generateContent"),
            "https://api.example.com/v1beta/models/gemini-x:generateContent"
        );
        assert_eq!(
            model_url("https://api.example.com", "gemini-x", "streamGenerateContent"),
            "https://api.example.com/v1beta/models/gemini-x:streamGenerateContent"
        );
    }

    #[test]
    fn test_inline_media_is_base64() {
        let part = PromptPart::InlineMedia {
            bytes: b"hello".to_vec(),
            media_type: "text/plain".into(),
        };
        let v = part_json(&part);
        assert_eq!(v["inlineData"]["mimeType"], "text/plain");
        assert_eq!(v["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_body_folds_history_before_new_turn() {
        let history = vec![
            ModelTurn {
                role: Role::User,
                parts: vec![PromptPart::text("What is a stack?")],
            },
            ModelTurn {
                role: Role::Assistant,
                parts: vec![PromptPart::text("A LIFO structure.")],
            },
        ];
        let body = build_generate_body(
            &history,
            &[PromptPart::text("And a queue?")],
            Some("Be brief."),
            None,
        );

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "And a queue?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_blank_system_instruction_is_omitted() {
        let body = build_generate_body(&[], &[PromptPart::text("hi")], Some("  "), None);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_structured_config_declares_schema() {
        let schema = json!({ "type": "OBJECT", "properties": { "html": { "type": "STRING" } } });
        let body = build_generate_body(
            &[],
            &[PromptPart::text("make a page")],
            None,
            Some(structured_config(&schema)),
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
    }

    #[test]
    fn test_image_body_sample_count() {
        let req = ImageRequest::new("a lighthouse", 3, 4).unwrap();
        let body = build_image_body(&req);
        assert_eq!(body["instances"][0]["prompt"], "a lighthouse");
        assert_eq!(body["parameters"]["sampleCount"], 3);
    }
}
