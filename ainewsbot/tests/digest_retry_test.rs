use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ainewsbot::digest;
use ainewsbot::llm::{GenerationError, LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use common::{Language, LlmConfig, LoggingConfig, NewsConfig, NotifyMethod, Settings};

/// Provider double that replays a scripted sequence of results and counts
/// how many calls were made.
struct ScriptedProvider {
    calls: AtomicUsize,
    last_prompt: Mutex<String>,
    script: Mutex<VecDeque<Result<LlmResponse, GenerationError>>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Result<LlmResponse, GenerationError>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(String::new()),
            script: Mutex::new(script.into()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = request.prompt;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::InvalidResponse("script empty".to_string())))
    }
}

fn response(text: &str) -> LlmResponse {
    LlmResponse {
        content: text.to_string(),
        model: "claude-sonnet-4-5-20250929".to_string(),
        usage: UsageMetadata::default(),
    }
}

fn server_error() -> GenerationError {
    GenerationError::Api {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        message: "upstream unavailable".to_string(),
    }
}

fn bad_request() -> GenerationError {
    GenerationError::Api {
        status: reqwest::StatusCode::BAD_REQUEST,
        message: "malformed request".to_string(),
    }
}

fn settings(language: Language) -> Settings {
    Settings {
        news: NewsConfig {
            topics: vec!["AI research".to_string()],
            prompt_template: "Digest these topics:\n{topics}".to_string(),
        },
        llm: LlmConfig::default(),
        logging: LoggingConfig::default(),
        anthropic_api_key: "sk-ant-test".to_string(),
        language,
        methods: vec![NotifyMethod::Webhook],
        email: None,
        webhook: None,
    }
}

#[tokio::test]
async fn test_retry_recovers_from_two_transient_failures() {
    let provider = ScriptedProvider::new(vec![
        Err(server_error()),
        Err(server_error()),
        Ok(response("third time lucky")),
    ]);

    let digest = digest::generate_with_retry(&provider, &settings(Language::En))
        .await
        .expect("third attempt should succeed");

    assert_eq!(digest.text, "third time lucky");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_retries_are_exhausted_after_three_attempts() {
    let provider = ScriptedProvider::new(vec![
        Err(server_error()),
        Err(server_error()),
        Err(server_error()),
    ]);

    let err = digest::generate_with_retry(&provider, &settings(Language::En))
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_non_transient_error_fails_without_retry() {
    let provider = ScriptedProvider::new(vec![Err(bad_request()), Ok(response("unreachable"))]);

    let err = digest::generate_with_retry(&provider, &settings(Language::En))
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_prompt_carries_language_instruction() {
    let provider = ScriptedProvider::new(vec![Ok(response("digest"))]);

    digest::generate_with_retry(&provider, &settings(Language::Zh))
        .await
        .expect("generation succeeds");

    let prompt = provider.last_prompt.lock().unwrap().clone();
    assert!(prompt.contains("- AI research"));
    assert!(prompt.contains("Respond entirely in Chinese"));
}

#[tokio::test]
async fn test_english_prompt_has_no_language_instruction() {
    let provider = ScriptedProvider::new(vec![Ok(response("digest"))]);

    digest::generate_with_retry(&provider, &settings(Language::En))
        .await
        .expect("generation succeeds");

    let prompt = provider.last_prompt.lock().unwrap().clone();
    assert!(!prompt.contains("Respond entirely in"));
}
