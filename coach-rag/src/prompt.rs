//! Versioned prompt templates.
//!
//! Templates live in a directory as `<version>.txt` and use handlebars
//! syntax. Three variables are available:
//!
//! - `{{context}}`: retrieved chunk texts separated by blank lines
//! - `{{question}}`: the (standalone) user question
//! - `{{profile}}`: the user profile: `{{profile.gender}}`, `{{profile.age}}`,
//!   `{{profile.height}}`, `{{profile.weight}}`, `{{profile.injury}}`,
//!   `{{profile.injury_description}}` and a one-line `{{profile.summary}}`

use std::path::Path;

use coach_core::UserProfile;
use handlebars::Handlebars;
use serde_json::{Value, json};

use crate::error::{RagError, Result};

/// A parsed prompt template.
pub struct PromptTemplate {
    version: String,
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate").field("version", &self.version).finish()
    }
}

impl PromptTemplate {
    /// Load `<dir>/<version>.txt`.
    ///
    /// # Errors
    ///
    /// [`RagError::PromptNotFound`] if the file does not exist,
    /// [`RagError::TemplateError`] if it cannot be read or parsed.
    pub fn load(dir: &Path, version: &str) -> Result<Self> {
        let path = dir.join(format!("{version}.txt"));
        if !path.is_file() {
            return Err(RagError::PromptNotFound(path));
        }
        let source = std::fs::read_to_string(&path)
            .map_err(|e| RagError::TemplateError(format!("{}: {e}", path.display())))?;
        Self::from_source(version, &source)
    }

    /// Parse a template from a string.
    pub fn from_source(version: &str, source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(version, source)
            .map_err(|e| RagError::TemplateError(format!("template '{version}': {e}")))?;
        Ok(Self { version: version.to_string(), registry })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Render the template for one question.
    pub fn render(&self, context: &str, question: &str, profile: &UserProfile) -> Result<String> {
        let data = json!({
            "context": context,
            "question": question,
            "profile": profile_value(profile)?,
        });
        self.registry
            .render(&self.version, &data)
            .map_err(|e| RagError::TemplateError(format!("template '{}': {e}", self.version)))
    }
}

fn profile_value(profile: &UserProfile) -> Result<Value> {
    let mut value = serde_json::to_value(profile)
        .map_err(|e| RagError::TemplateError(format!("profile is not serializable: {e}")))?;
    if let Value::Object(map) = &mut value {
        map.insert("summary".to_string(), Value::String(profile.summary()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use coach_core::Gender;

    use super::*;

    #[test]
    fn renders_all_variables_without_escaping() {
        let template = PromptTemplate::from_source(
            "t",
            "Context: {{context}}\nProfile: {{profile.age}} / {{profile.gender}}\nQ: {{question}}",
        )
        .unwrap();
        let profile =
            UserProfile { gender: Some(Gender::Male), age: Some(25), ..UserProfile::default() };
        let rendered = template.render("<squats & lunges>", "How many sets?", &profile).unwrap();
        assert_eq!(rendered, "Context: <squats & lunges>\nProfile: 25 / male\nQ: How many sets?");
    }

    #[test]
    fn summary_is_available() {
        let template = PromptTemplate::from_source("t", "{{profile.summary}}").unwrap();
        let rendered = template.render("", "", &UserProfile::default()).unwrap();
        assert!(rendered.starts_with("gender: unknown"));
    }

    #[test]
    fn missing_file_is_prompt_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptTemplate::load(dir.path(), "v9").unwrap_err();
        assert!(matches!(err, RagError::PromptNotFound(p) if p.ends_with("v9.txt")));
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("v1.txt"), "Q={{question}}").unwrap();
        let template = PromptTemplate::load(dir.path(), "v1").unwrap();
        assert_eq!(template.version(), "v1");
        assert_eq!(template.render("", "hi", &UserProfile::default()).unwrap(), "Q=hi");
    }
}
