//! Structured shapes the panels ask the model for.
//!
//! Field names follow the JSON the model is asked to emit (camelCase).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::structured::StructuredShape;

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_array() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is empty", field))
    } else {
        Ok(())
    }
}

// =============================================================================
// Quiz
// =============================================================================

/// One multiple-choice question. Quizzes are `Vec<QuizQuestion>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    pub correct_answer: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

impl StructuredShape for QuizQuestion {
    const LABEL: &'static str = "quiz";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "question": string(),
                "options": {
                    "type": "ARRAY",
                    "items": string(),
                    "minItems": 4,
                    "maxItems": 4
                },
                "correctAnswer": string()
            },
            "required": ["question", "options", "correctAnswer"]
        })
    }

    fn check(&self) -> Result<(), String> {
        non_blank("question", &self.question)?;
        if !self.options.contains(&self.correct_answer) {
            return Err(format!(
                "correctAnswer {:?} is not one of the options",
                self.correct_answer
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Skill feedback
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillFeedback {
    pub badge_name: String,
    pub feedback: String,
    pub next_steps: Vec<String>,
}

impl StructuredShape for SkillFeedback {
    const LABEL: &'static str = "feedback";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "badgeName": string(),
                "feedback": string(),
                "nextSteps": string_array()
            },
            "required": ["badgeName", "feedback", "nextSteps"]
        })
    }

    fn check(&self) -> Result<(), String> {
        non_blank("badgeName", &self.badge_name)?;
        non_blank("feedback", &self.feedback)
    }
}

// =============================================================================
// Project ideas
// =============================================================================

/// One project suggestion. Idea lists are `Vec<ProjectIdea>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdea {
    pub title: String,
    pub description: String,
    pub key_features: Vec<String>,
    pub tech_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_tips: Option<String>,
}

impl StructuredShape for ProjectIdea {
    const LABEL: &'static str = "project ideas";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "title": string(),
                "description": string(),
                "keyFeatures": string_array(),
                "techStack": string_array(),
                "datasetSource": string(),
                "architecture": string(),
                "deploymentTips": string()
            },
            "required": ["title", "description", "keyFeatures", "techStack"]
        })
    }

    fn check(&self) -> Result<(), String> {
        non_blank("title", &self.title)
    }
}

// =============================================================================
// Debugger
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugAnalysis {
    pub language: String,
    pub error_analysis: String,
    pub suggested_fix: String,
    pub optimized_code: String,
}

impl StructuredShape for DebugAnalysis {
    const LABEL: &'static str = "debug analysis";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "language": string(),
                "errorAnalysis": string(),
                "suggestedFix": string(),
                "optimizedCode": string()
            },
            "required": ["language", "errorAnalysis", "suggestedFix", "optimizedCode"]
        })
    }
}

// =============================================================================
// Website generator
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteCode {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl WebsiteCode {
    /// A single self-contained page with the CSS and JS inlined.
    pub fn to_document(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n{}\n</style>\n</head>\n<body>\n{}\n<script>\n{}\n</script>\n</body>\n</html>\n",
            self.css, self.html, self.js
        )
    }
}

impl StructuredShape for WebsiteCode {
    const LABEL: &'static str = "website";

    fn schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "html": string(),
                "css": string(),
                "js": string()
            },
            "required": ["html", "css", "js"]
        })
    }

    fn check(&self) -> Result<(), String> {
        non_blank("html", &self.html)
    }
}

// =============================================================================
// Tests
// =============================================================================
