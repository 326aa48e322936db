use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

use crate::llm::{GenerationError, LlmProvider, LlmRequest};
use common::{Language, Settings};

/// Maximum number of completion attempts per run.
pub const MAX_ATTEMPTS: u32 = 3;

/// A generated digest. Read-only once created, discarded at process exit.
#[derive(Debug, Clone)]
pub struct DigestResult {
    pub text: String,
    pub generated_at: DateTime<Utc>,
    pub model: String,
}

impl DigestResult {
    /// Date-stamped title shared by the email subject and webhook payload.
    pub fn title(&self) -> String {
        format!("AI News Digest - {}", self.generated_at.format("%Y-%m-%d"))
    }
}

/// Render the prompt by substituting the topic list into the template.
/// Topics become a bulleted list; for non-English output an explicit
/// language instruction is appended.
pub fn render_prompt(topics: &[String], template: &str, language: Language) -> String {
    let topics_formatted = topics
        .iter()
        .map(|topic| format!("- {topic}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = template.replace("{topics}", &topics_formatted);

    if language != Language::En {
        prompt.push_str(&format!(
            "\n\nIMPORTANT: Respond entirely in {}.",
            language.english_name()
        ));
    }

    prompt
}

/// Generate the digest, retrying transient failures with exponential
/// backoff (1s, 2s between attempts). Non-transient failures abort
/// immediately without a retry.
pub async fn generate_with_retry(
    provider: &dyn LlmProvider,
    settings: &Settings,
) -> Result<DigestResult, GenerationError> {
    let prompt = render_prompt(
        &settings.news.topics,
        &settings.news.prompt_template,
        settings.language,
    );

    let mut attempt = 0;
    loop {
        attempt += 1;

        let request = LlmRequest {
            prompt: prompt.clone(),
            max_tokens: Some(settings.llm.max_tokens),
            timeout_seconds: Some(settings.llm.timeout_seconds),
        };

        match provider.generate(request).await {
            Ok(response) => {
                info!(
                    model = %response.model,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "digest generated"
                );
                return Ok(DigestResult {
                    text: response.content,
                    generated_at: Utc::now(),
                    model: response.model,
                });
            }
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let backoff = Duration::from_secs(2u64.pow(attempt - 1)); // 1s, 2s
                warn!(
                    "generation attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, MAX_ATTEMPTS, e, backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) if e.is_transient() => {
                warn!("all {} generation attempts failed", MAX_ATTEMPTS);
                return Err(e);
            }
            Err(e) => {
                warn!("generation failed with a non-transient error: {}", e);
                return Err(e);
            }
        }
    }
}
