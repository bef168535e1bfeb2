//! Prompt builders for the structured panels.
//!
//! Each builder rejects blank input before anything reaches the gateway.

use scholar_core::{PromptPart, Result, ScholarError};

pub const MAX_QUIZ_QUESTIONS: u32 = 20;

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ScholarError::Input(format!("{} cannot be empty", field)));
    }
    Ok(value)
}

/// Multiple-choice quiz on `topic`.
pub fn quiz_prompt(topic: &str, count: u32) -> Result<Vec<PromptPart>> {
    let topic = required("topic", topic)?;
    if count == 0 || count > MAX_QUIZ_QUESTIONS {
        return Err(ScholarError::Input(format!(
            "number of questions must be between 1 and {}, got {}",
            MAX_QUIZ_QUESTIONS, count
        )));
    }
    Ok(vec![PromptPart::text(format!(
        "Create a multiple-choice quiz with {count} questions about \"{topic}\". \
         Each question has exactly 4 options and correctAnswer must be the exact text \
         of one of the options."
    ))])
}

/// Feedback and a badge for progress on a skill.
pub fn feedback_prompt(skill: &str, goal: &str, progress: &str) -> Result<Vec<PromptPart>> {
    let skill = required("skill", skill)?;
    let goal = required("goal", goal)?;
    let progress = required("progress", progress)?;
    Ok(vec![PromptPart::text(format!(
        "I am learning {skill}. My goal: {goal}. My progress so far: {progress}. \
         Give me encouraging feedback, a short creative badge name for this stage, \
         and a list of concrete next steps."
    ))])
}

/// Project ideas for a domain and experience level.
pub fn ideas_prompt(domain: &str, level: &str) -> Result<Vec<PromptPart>> {
    let domain = required("domain", domain)?;
    let level = required("level", level)?;
    Ok(vec![PromptPart::text(format!(
        "Suggest 3 project ideas in {domain} for a {level} student. For each idea give a \
         title, a description, key features and a tech stack. Where relevant add a dataset \
         source, an architecture overview and deployment tips."
    ))])
}

/// Analysis of failing code, optionally with the error it produced.
pub fn debug_prompt(code: &str, error: Option<&str>) -> Result<Vec<PromptPart>> {
    let code = required("code", code)?;
    let mut text = format!(
        "Analyze the following code. Detect its language, explain what is wrong, \
         suggest a fix and provide an optimized version.\n\n```\n{code}\n```"
    );
    if let Some(error) = error.map(str::trim).filter(|e| !e.is_empty()) {
        text.push_str(&format!("\n\nThe code fails with:\n```\n{error}\n```"));
    }
    Ok(vec![PromptPart::text(text)])
}

/// A single-page website from a description.
pub fn website_prompt(description: &str) -> Result<Vec<PromptPart>> {
    let description = required("description", description)?;
    Ok(vec![PromptPart::text(format!(
        "Generate a complete single-page website: {description}. \
         Return the HTML body markup, the CSS and the JavaScript separately."
    ))])
}
