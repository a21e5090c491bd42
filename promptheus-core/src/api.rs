//! Library API
//!
//! Non-interactive entry points for embedding prompt refinement in other
//! programs. Each call resolves and validates a [`Config`], builds the
//! provider, and records a telemetry event with interface `library`.

use crate::config::{self, Config, ConfigError};
use crate::error::{PromptheusError, Result};
use crate::llm::prompts::{
    ANALYSIS_REFINEMENT_SYSTEM_INSTRUCTION, CLARIFICATION_SYSTEM_INSTRUCTION,
    GENERATION_SYSTEM_INSTRUCTION, TWEAK_SYSTEM_INSTRUCTION,
};
use crate::llm::{create_provider, LLMProvider};
use crate::questions::{
    convert_json_to_question_definitions, Answers, QuestionDefinition, QuestionMapping, TaskType,
};
use crate::telemetry::{PromptRun, TelemetryRecorder};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error};

const INTERFACE: &str = "library";

/// Options shared by the refinement calls
#[derive(Debug, Clone)]
pub struct RefineOptions {
    /// Overrides the configured provider
    pub provider: Option<String>,
    /// Overrides the configured model
    pub model: Option<String>,
    /// Loaded from the environment and config file when absent
    pub config: Option<Config>,
    pub skip_questions: bool,
    pub answers: Option<Answers>,
    pub mapping: Option<QuestionMapping>,
}

impl Default for RefineOptions {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            config: None,
            skip_questions: true,
            answers: None,
            mapping: None,
        }
    }
}

impl RefineOptions {
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_questions(mut self) -> Self {
        self.skip_questions = false;
        self
    }

    pub fn with_answers(mut self, answers: Answers, mapping: Option<QuestionMapping>) -> Self {
        self.answers = Some(answers);
        self.mapping = mapping;
        self
    }
}

/// A refined prompt and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedPrompt {
    pub refined_prompt: String,
    pub task_type: Option<TaskType>,
    pub was_refined: bool,
    pub provider: String,
    pub model: String,
}

/// Clarifying questions for the caller to answer
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestions {
    pub task_type: TaskType,
    pub questions: Vec<QuestionDefinition>,
    pub mapping: QuestionMapping,
    pub provider: String,
    pub model: String,
}

/// What `refine_prompt` produced
#[derive(Debug, Clone, PartialEq)]
pub enum Refinement {
    Refined(RefinedPrompt),
    Questions(GeneratedQuestions),
}

struct Session {
    provider: Box<dyn LLMProvider>,
    telemetry: TelemetryRecorder,
}

impl Session {
    fn call(&self) -> Call<'_> {
        Call { provider: self.provider.as_ref(), telemetry: &self.telemetry }
    }
}

fn config_error(err: ConfigError) -> PromptheusError {
    match err {
        ConfigError::UnknownProvider(name) => PromptheusError::InvalidProvider(name),
        other => PromptheusError::Configuration(vec![other.to_string()]),
    }
}

fn resolve_config(options: &RefineOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(config) => config.clone(),
        None => Config::load(None).map_err(config_error)?,
    };

    if let Some(provider) = &options.provider {
        config.set_provider(provider).map_err(config_error)?;
    }
    if let Some(model) = &options.model {
        config.set_model(model);
    }

    if !config.validate() {
        return Err(PromptheusError::Configuration(config.consume_error_messages()));
    }
    Ok(config)
}

fn open_session(options: &RefineOptions) -> Result<Session> {
    let config = resolve_config(options)?;
    let provider = create_provider(&config.provider(), &config, None)?;
    debug!("Library call using {} ({})", provider.name(), provider.model());
    Ok(Session { provider, telemetry: TelemetryRecorder::from_config(&config, INTERFACE) })
}

/// A provider paired with the recorder its outcomes are written to
#[derive(Clone, Copy)]
struct Call<'a> {
    provider: &'a dyn LLMProvider,
    telemetry: &'a TelemetryRecorder,
}

impl Call<'_> {
    fn failure(&self, stage: &str, message: &str) -> PromptheusError {
        let sanitized = regex_utils::secrets::sanitize(message);
        error!("{stage} failed: {sanitized}");
        self.telemetry.record_provider_error(self.provider.name(), self.provider.model(), &sanitized);
        PromptheusError::ProviderApi(format!("{stage} failed: {sanitized}"))
    }

    fn record(&self, started: Instant, input: &str, output: &str, task_type: Option<TaskType>, questions: usize) {
        let elapsed = started.elapsed();
        self.telemetry.record_prompt_run(PromptRun {
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            task_type,
            processing_latency: elapsed,
            llm_latency: Some(elapsed),
            input_chars: input.chars().count(),
            output_chars: output.chars().count(),
            questions_count: questions,
            skip_questions: questions == 0,
            refine_mode: false,
            success: true,
        });
    }

    fn refined(&self, refined_prompt: String, task_type: Option<TaskType>) -> RefinedPrompt {
        RefinedPrompt {
            refined_prompt,
            task_type,
            was_refined: true,
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
        }
    }
}

/// Refine a prompt.
///
/// With answers this merges them into the prompt. Otherwise it either
/// performs a light refinement (`skip_questions`, the default) or returns
/// clarifying questions for the caller to answer.
pub async fn refine_prompt(prompt: &str, options: RefineOptions) -> Result<Refinement> {
    let session = open_session(&options)?;
    let call = session.call();

    if let Some(answers) = &options.answers {
        return refine_with_answers_using(call, prompt, answers, options.mapping.as_ref())
            .await
            .map(Refinement::Refined);
    }

    if options.skip_questions {
        return light_refine_using(call, prompt).await.map(Refinement::Refined);
    }

    generate_questions_using(call, prompt).await.map(Refinement::Questions)
}

/// Apply a targeted modification to an already refined prompt
pub async fn tweak_prompt(prompt: &str, instruction: &str, options: RefineOptions) -> Result<RefinedPrompt> {
    let session = open_session(&options)?;
    tweak_prompt_using(session.call(), prompt, instruction).await
}

pub async fn generate_questions(prompt: &str, options: RefineOptions) -> Result<GeneratedQuestions> {
    let session = open_session(&options)?;
    generate_questions_using(session.call(), prompt).await
}

/// Refine with caller-supplied answers. Without a mapping each key is shown
/// to the model as `Question <key>`.
pub async fn refine_with_answers(
    prompt: &str,
    answers: &Answers,
    mapping: Option<&QuestionMapping>,
    options: RefineOptions,
) -> Result<RefinedPrompt> {
    let session = open_session(&options)?;
    refine_with_answers_using(session.call(), prompt, answers, mapping).await
}

/// Providers whose API keys are set. Loads the default config when `None`.
pub fn list_available_providers(config: Option<&Config>) -> Result<Vec<String>> {
    match config {
        Some(config) => Ok(config.available_providers()),
        None => Ok(Config::load(None).map_err(config_error)?.available_providers()),
    }
}

/// Catalog models for one provider, or for every provider
pub fn list_available_models(provider: Option<&str>) -> Result<BTreeMap<String, Vec<String>>> {
    let catalog = config::catalog().map_err(config_error)?;

    match provider {
        Some(name) => {
            let info = catalog.get(name).ok_or_else(|| PromptheusError::InvalidProvider(name.to_string()))?;
            Ok(BTreeMap::from([(info.id.clone(), info.models.clone())]))
        }
        None => Ok(catalog.providers.iter().map(|info| (info.id.clone(), info.models.clone())).collect()),
    }
}

async fn light_refine_using(call: Call<'_>, prompt: &str) -> Result<RefinedPrompt> {
    let started = Instant::now();
    let text = call
        .provider
        .light_refine(prompt, ANALYSIS_REFINEMENT_SYSTEM_INSTRUCTION)
        .await
        .map_err(|e| call.failure("Light refinement", &e.to_string()))?;

    call.record(started, prompt, &text, Some(TaskType::Analysis), 0);
    Ok(call.refined(text, Some(TaskType::Analysis)))
}

async fn generate_questions_using(call: Call<'_>, prompt: &str) -> Result<GeneratedQuestions> {
    let started = Instant::now();
    let payload = call
        .provider
        .generate_questions(prompt, CLARIFICATION_SYSTEM_INSTRUCTION)
        .await
        .ok_or_else(|| call.failure("Question generation", "Provider returned no questions"))?;

    let (questions, mapping) = convert_json_to_question_definitions(&payload.questions);
    call.record(started, prompt, "", Some(payload.task_type), questions.len());

    Ok(GeneratedQuestions {
        task_type: payload.task_type,
        questions,
        mapping,
        provider: call.provider.name().to_string(),
        model: call.provider.model().to_string(),
    })
}

async fn refine_with_answers_using(
    call: Call<'_>,
    prompt: &str,
    answers: &Answers,
    mapping: Option<&QuestionMapping>,
) -> Result<RefinedPrompt> {
    let fallback: QuestionMapping;
    let mapping = match mapping {
        Some(mapping) => mapping,
        None => {
            fallback = answers.iter().map(|(key, _)| (key.clone(), format!("Question {key}"))).collect();
            &fallback
        }
    };

    let started = Instant::now();
    let text = call
        .provider
        .refine_from_answers(prompt, answers, mapping, GENERATION_SYSTEM_INSTRUCTION)
        .await
        .map_err(|e| call.failure("Answer-based refinement", &e.to_string()))?;

    call.record(started, prompt, &text, Some(TaskType::Generation), answers.len());
    Ok(call.refined(text, Some(TaskType::Generation)))
}

async fn tweak_prompt_using(call: Call<'_>, prompt: &str, instruction: &str) -> Result<RefinedPrompt> {
    let started = Instant::now();
    let text = call
        .provider
        .tweak_prompt(prompt, instruction, TWEAK_SYSTEM_INSTRUCTION)
        .await
        .map_err(|e| call.failure("Tweak", &e.to_string()))?;

    call.record(started, prompt, &text, None, 0);
    Ok(call.refined(text, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use crate::llm::mock::MockLLMProvider;
    use crate::llm::LLMError;
    use crate::questions::Answer;
    use crate::telemetry::{read_telemetry_events, EventType};
    use tempfile::TempDir;

    fn recorder(dir: &TempDir) -> TelemetryRecorder {
        TelemetryRecorder::new(dir.path().join("telemetry.jsonl"), true, INTERFACE)
    }

    fn call<'a>(provider: &'a MockLLMProvider, telemetry: &'a TelemetryRecorder) -> Call<'a> {
        Call { provider, telemetry }
    }

    fn config(vars: &[(&str, &str)]) -> Config {
        Config::with_env(FileConfig::default(), vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[tokio::test]
    async fn test_light_refine_records_library_run() {
        let dir = TempDir::new().unwrap();
        let telemetry = recorder(&dir);
        let mock = MockLLMProvider::new();
        mock.add_response("A sharper prompt");

        let result = light_refine_using(call(&mock, &telemetry), "Explain TCP").await.unwrap();
        assert_eq!(result.refined_prompt, "A sharper prompt");
        assert_eq!(result.task_type, Some(TaskType::Analysis));
        assert!(result.was_refined);
        assert_eq!(result.model, "mock-model");
        assert_eq!(mock.calls()[0].system_instruction, ANALYSIS_REFINEMENT_SYSTEM_INSTRUCTION);

        let events = read_telemetry_events(telemetry.path());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].interface.as_deref(), Some("library"));
        assert_eq!(events[0].input_chars, Some(11));
        assert_eq!(events[0].success, Some(true));
    }

    #[tokio::test]
    async fn test_generate_questions() {
        let dir = TempDir::new().unwrap();
        let mock = MockLLMProvider::new();
        mock.add_response(
            r#"{"task_type": "generation", "questions": [{"question": "Who reads it?", "type": "text"}]}"#,
        );

        let result = generate_questions_using(call(&mock, &recorder(&dir)), "Write a blog post").await.unwrap();
        assert_eq!(result.task_type, TaskType::Generation);
        assert_eq!(result.questions.len(), 1);
        assert_eq!(result.mapping["q0"], "Who reads it?");
    }

    #[tokio::test]
    async fn test_generate_questions_failure_is_provider_error() {
        let dir = TempDir::new().unwrap();
        let telemetry = recorder(&dir);
        let mock = MockLLMProvider::new();
        mock.add_response("not json");

        let err = generate_questions_using(call(&mock, &telemetry), "p").await.unwrap_err();
        assert!(matches!(err, PromptheusError::ProviderApi(ref m) if m.contains("Provider returned no questions")));
        assert_eq!(read_telemetry_events(telemetry.path())[0].event_type, EventType::ProviderError);
    }

    #[tokio::test]
    async fn test_refine_with_answers_default_mapping() {
        let dir = TempDir::new().unwrap();
        let mock = MockLLMProvider::new();
        mock.add_response("final");

        let answers: Answers = vec![("q0".to_string(), Answer::from("Engineers"))];
        let result = refine_with_answers_using(call(&mock, &recorder(&dir)), "Write docs", &answers, None).await.unwrap();
        assert_eq!(result.refined_prompt, "final");
        assert!(mock.calls()[0].prompt.contains("- Question q0: Engineers"));
    }

    #[tokio::test]
    async fn test_provider_errors_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let mock = MockLLMProvider::new();
        mock.add_error(LLMError::api(401, "key sk-abcdefghijklmnopqrstuvwxyz rejected"));

        let err = tweak_prompt_using(call(&mock, &recorder(&dir)), "p", "shorter").await.unwrap_err();
        let PromptheusError::ProviderApi(message) = err else {
            panic!("expected provider error");
        };
        assert!(message.starts_with("Tweak failed:"));
        assert!(!message.contains("abcdefghijklmnop"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_configuration_error() {
        let options = RefineOptions::default().with_config(config(&[])).with_provider("anthropic");
        let err = refine_prompt("p", options).await.unwrap_err();
        assert!(matches!(err, PromptheusError::Configuration(ref messages) if !messages.is_empty()));

        let options = RefineOptions::default().with_config(config(&[])).with_provider("mistral");
        assert!(matches!(
            refine_prompt("p", options).await,
            Err(PromptheusError::InvalidProvider(_))
        ));
    }

    #[test]
    fn test_list_providers_and_models() {
        let config = config(&[("OPENAI_API_KEY", "sk-x"), ("GROQ_API_KEY", "gsk_x")]);
        assert_eq!(list_available_providers(Some(&config)).unwrap(), vec!["openai", "groq"]);

        let models = list_available_models(Some("google")).unwrap();
        assert!(models["gemini"].contains(&"gemini-2.0-flash".to_string()));
        assert!(list_available_models(None).unwrap().contains_key("openrouter"));
        assert!(matches!(list_available_models(Some("mistral")), Err(PromptheusError::InvalidProvider(_))));
    }

    #[test]
    fn test_refine_options_defaults() {
        let options = RefineOptions::default();
        assert!(options.skip_questions);
        assert!(!options.with_questions().skip_questions);
    }
}
