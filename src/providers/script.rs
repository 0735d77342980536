//! `ChatScriptGenerator`: scripts and image prompts from a chat model.
//!
//! Calls any OpenAI-compatible `/chat/completions` endpoint.  The default
//! configuration targets Gemini's compatibility layer; OpenAI, Groq, Ollama
//! and LM Studio work by changing `base_url` and `model`.

use async_trait::async_trait;

use super::{check_status, http_client, with_auth, ProviderError, ScriptGenerator};
use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

const SCRIPT_INSTRUCTION: &str = "\
You write conversational scripts for short explainer videos.
First work out a clear, concise answer to the question, then turn that
answer into a script that a narrator reads aloud.

Rules:
1. Write the script in {language}.
2. The script should take between 30 seconds and 1 minute to read aloud.
3. Use simple, everyday language and avoid jargon.
4. Reply with ONLY the script text: no title, no labels such as \"Script:\",
   no stage directions, no markdown.";

const IMAGE_PROMPT_INSTRUCTION: &str = "\
You are a concept artist designing the background image for an explainer
video.  Read the question and the narration script, find the central idea
that connects them, and describe a symbolic, minimalist visual for it.

Rules:
1. If the script explains through a metaphor, illustrate the underlying
   principle, not the metaphor itself.
2. Describe an illustration, infographic or conceptual art, not a photo.
3. The image must contain no text, letters or numbers.
4. Write 5 to 15 keyword-focused words in English.
5. Reply with ONLY the prompt text, no labels.";

/// `(system, user)` messages for script generation.
fn script_messages(question: &str, language: &str) -> (String, String) {
    let language = if language.trim().is_empty() { "English" } else { language.trim() };
    (
        SCRIPT_INSTRUCTION.replace("{language}", language),
        format!("Question:\n{}", question.trim()),
    )
}

/// `(system, user)` messages for image-prompt generation.
fn image_prompt_messages(question: &str, script: &str) -> (String, String) {
    (
        IMAGE_PROMPT_INSTRUCTION.to_string(),
        format!(
            "Original question:\n{}\n\nVideo script:\n{}",
            question.trim(),
            script.trim()
        ),
    )
}

// ---------------------------------------------------------------------------
// ChatScriptGenerator
// ---------------------------------------------------------------------------

/// Script and image-prompt generator backed by a chat-completions API.
///
/// All connection details (`base_url`, `api_key`, `model`) come from the
/// [`LlmConfig`] passed to [`ChatScriptGenerator::from_config`].
pub struct ChatScriptGenerator {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ChatScriptGenerator {
    /// Build a generator from application config.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: http_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream": false,
            "temperature": self.config.temperature
        });

        log::debug!("script: POST {} (model {})", self.endpoint(), self.config.model);

        let req = self.client.post(self.endpoint()).json(&body);
        let response = with_auth(req, self.config.api_key.as_deref()).send().await?;
        let response = check_status(response).await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        extract_content(&json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn extract_content(json: &serde_json::Value) -> Result<String, ProviderError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(ProviderError::EmptyResponse)?
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl ScriptGenerator for ChatScriptGenerator {
    async fn generate_script(&self, question: &str, language: &str) -> Result<String, ProviderError> {
        let (system, user) = script_messages(question, language);
        self.complete(&system, &user).await
    }

    async fn generate_image_prompt(&self, question: &str, script: &str) -> Result<String, ProviderError> {
        let (system, user) = image_prompt_messages(question, script);
        self.complete(&system, &user).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_prompt_names_language_and_question() {
        let (system, user) = script_messages("  What is RAM? ", "Japanese");
        assert!(system.contains("Write the script in Japanese."));
        assert!(!system.contains("{language}"));
        assert_eq!(user, "Question:\nWhat is RAM?");
    }

    #[test]
    fn script_prompt_defaults_blank_language_to_english() {
        let (system, _) = script_messages("q", "  ");
        assert!(system.contains("in English."));
    }

    #[test]
    fn image_prompt_includes_both_inputs() {
        let (_, user) = image_prompt_messages("What is RAM?", "RAM is short-term memory.");
        assert!(user.contains("What is RAM?"));
        assert!(user.contains("RAM is short-term memory."));
    }

    #[test]
    fn extract_content_trims() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Hello there.\n" } }]
        });
        assert_eq!(extract_content(&json).unwrap(), "Hello there.");
    }

    #[test]
    fn extract_content_rejects_missing_or_blank() {
        let missing = serde_json::json!({ "choices": [] });
        assert!(matches!(extract_content(&missing), Err(ProviderError::EmptyResponse)));

        let blank = serde_json::json!({ "choices": [{ "message": { "content": "  " } }] });
        assert!(matches!(extract_content(&blank), Err(ProviderError::EmptyResponse)));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let mut config = LlmConfig::default();
        config.base_url = "http://localhost:11434/v1/".into();
        let generator = ChatScriptGenerator::from_config(&config);
        assert_eq!(generator.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn generator_is_object_safe() {
        let generator: Box<dyn ScriptGenerator> =
            Box::new(ChatScriptGenerator::from_config(&LlmConfig::default()));
        drop(generator);
    }
}
