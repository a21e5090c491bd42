//! Question/answer refinement pipeline
//!
//! Decides whether to ask clarifying questions, collects answers through an
//! [`Interaction`], and turns them into a refined prompt. Front-ends supply
//! the interaction; the pipeline never touches the terminal itself.

use crate::llm::prompts::{
    ANALYSIS_REFINEMENT_SYSTEM_INSTRUCTION, CLARIFICATION_SYSTEM_INSTRUCTION,
    GENERATION_SYSTEM_INSTRUCTION, TWEAK_SYSTEM_INSTRUCTION,
};
use crate::llm::{LLMProvider, LLMResult};
use crate::questions::{
    convert_json_to_question_definitions, static_questions, Answer, Answers, QuestionDefinition,
    QuestionKind, QuestionMapping, TaskType,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Flags that shape a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Use the fixed question set and skip the LLM
    pub static_questions: bool,
    /// Return the prompt as-is
    pub quick: bool,
    /// Always ask the generated questions
    pub refine: bool,
    pub debug: bool,
}

/// The decision reached before any question is asked
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPlan {
    pub skip_questions: bool,
    pub task_type: TaskType,
    pub questions: Vec<QuestionDefinition>,
    pub mapping: QuestionMapping,
    /// Time spent waiting on the provider while planning
    pub llm_latency: Duration,
}

impl QuestionPlan {
    fn skip(task_type: TaskType) -> Self {
        Self {
            skip_questions: true,
            task_type,
            questions: Vec::new(),
            mapping: QuestionMapping::new(),
            llm_latency: Duration::ZERO,
        }
    }

    fn ask(task_type: TaskType, (questions, mapping): (Vec<QuestionDefinition>, QuestionMapping)) -> Self {
        Self { skip_questions: false, task_type, questions, mapping, llm_latency: Duration::ZERO }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.llm_latency = latency;
        self
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct PromptOutcome {
    pub final_prompt: String,
    pub task_type: TaskType,
    pub is_refined: bool,
    pub questions_asked: usize,
    pub skip_questions: bool,
    pub llm_latency: Duration,
}

/// User-facing side of the pipeline
pub trait Interaction {
    /// Show an informational message
    fn notify(&mut self, message: &str);

    /// Ask a yes/no question; `None` means cancelled
    fn confirm(&mut self, message: &str, default: bool) -> Option<bool>;

    /// Ask one clarifying question; `None` means cancelled
    fn ask(&mut self, question: &QuestionDefinition) -> Option<Answer>;

    /// Read a tweak request; empty accepts, `None` means cancelled
    fn tweak_instruction(&mut self) -> Option<String>;

    /// Whether the user can answer follow-up prompts
    fn is_interactive(&self) -> bool;

    /// Show a prompt version
    fn display(&mut self, prompt: &str, is_refined: bool) {
        let label = if is_refined { "Refined prompt" } else { "Prompt" };
        self.notify(&format!("{label}:\n{prompt}"));
    }
}

/// Decide whether and which clarifying questions to ask
pub async fn determine_question_plan(
    provider: &dyn LLMProvider,
    initial_prompt: &str,
    options: &RunOptions,
    io: &mut dyn Interaction,
) -> QuestionPlan {
    if options.static_questions {
        io.notify("Using static questions (MVP mode)");
        return QuestionPlan::ask(TaskType::Generation, static_questions());
    }

    if options.quick {
        io.notify("Quick mode - using original prompt without modification");
        return QuestionPlan::skip(TaskType::Analysis);
    }

    let started = Instant::now();
    let result = provider.generate_questions(initial_prompt, CLARIFICATION_SYSTEM_INSTRUCTION).await;
    let latency = started.elapsed();

    let Some(payload) = result else {
        io.notify("Using static questions (fallback)");
        return QuestionPlan::ask(TaskType::Generation, static_questions()).with_latency(latency);
    };

    let task_type = payload.task_type;
    if options.debug {
        io.notify(&format!(
            "Debug: task_type={}, questions={}, refine={}",
            task_type,
            payload.questions.len(),
            options.refine
        ));
    }

    if task_type == TaskType::Analysis && !options.refine {
        io.notify("Analysis task detected - performing light refinement");
        io.notify("  (Use --quick to skip, or --refine to force questions)");
        return QuestionPlan::skip(task_type).with_latency(latency);
    }

    if payload.questions.is_empty() {
        io.notify("No clarifying questions needed");
        return QuestionPlan::skip(task_type).with_latency(latency);
    }

    if task_type == TaskType::Generation && !options.refine {
        io.notify(&format!(
            "Creative task detected with {} clarifying questions",
            payload.questions.len()
        ));
        if io.confirm("Ask clarifying questions to refine your prompt?", true) != Some(true) {
            io.notify("Skipping questions - using original prompt");
            return QuestionPlan::skip(task_type).with_latency(latency);
        }
    }

    let plan = QuestionPlan::ask(task_type, convert_json_to_question_definitions(&payload.questions));
    if options.refine {
        io.notify(&format!("Refine mode - {} questions generated", plan.questions.len()));
    }
    plan.with_latency(latency)
}

/// Ask every planned question. `None` means the user cancelled.
pub fn ask_clarifying_questions(plan: &QuestionPlan, io: &mut dyn Interaction) -> Option<Answers> {
    if plan.skip_questions || plan.questions.is_empty() {
        return Some(Answers::new());
    }

    io.notify("Please answer the following questions to refine your prompt:");

    let mut answers = Answers::with_capacity(plan.questions.len());
    for question in &plan.questions {
        let answer = loop {
            let Some(raw) = io.ask(question) else {
                io.notify("Cancelled.");
                return None;
            };
            let answer = normalize_answer(question, raw);
            if question.required && is_free_text(question) && answer.is_empty() {
                io.notify("This question is required. Please provide an answer.");
                continue;
            }
            break answer;
        };
        answers.push((question.key.clone(), answer));
    }

    Some(answers)
}

/// Radio and checkbox questions without options are asked as text
fn is_free_text(question: &QuestionDefinition) -> bool {
    match question.kind {
        QuestionKind::Text => true,
        QuestionKind::Radio | QuestionKind::Checkbox => question.options.is_empty(),
        QuestionKind::Confirm => false,
    }
}

fn normalize_answer(question: &QuestionDefinition, answer: Answer) -> Answer {
    match answer {
        Answer::Text(text) => {
            let text = text.trim();
            if text.is_empty() && question.kind == QuestionKind::Checkbox {
                Answer::Choices(Vec::new())
            } else {
                Answer::Text(text.to_string())
            }
        }
        other => other,
    }
}

/// Turn answers into the final prompt; no answers returns the original
pub async fn generate_final_prompt(
    provider: &dyn LLMProvider,
    initial_prompt: &str,
    answers: &Answers,
    mapping: &QuestionMapping,
) -> LLMResult<(String, bool)> {
    if answers.is_empty() {
        return Ok((initial_prompt.to_string(), false));
    }

    let refined = provider
        .refine_from_answers(initial_prompt, answers, mapping, GENERATION_SYSTEM_INSTRUCTION)
        .await?;
    Ok((refined, true))
}

/// Let the user tweak the prompt until they accept it
pub async fn iterative_refinement(
    provider: &dyn LLMProvider,
    current_prompt: String,
    io: &mut dyn Interaction,
) -> String {
    let mut current = current_prompt;
    let mut iteration = 1;

    loop {
        let Some(instruction) = io.tweak_instruction() else {
            io.notify("Cancelled tweaks.");
            return current;
        };

        let instruction = instruction.trim();
        if instruction.is_empty() {
            io.notify("Prompt accepted!");
            return current;
        }

        iteration += 1;
        io.notify(&format!("Tweaking prompt (v{iteration})..."));

        match provider.tweak_prompt(&current, instruction, TWEAK_SYSTEM_INSTRUCTION).await {
            Ok(tweaked) => {
                current = tweaked;
                io.display(&current, true);
            }
            Err(e) => {
                warn!("Prompt tweak failed: {}", e.sanitized());
                io.notify(&format!("Error: Failed to tweak prompt: {}", e.sanitized()));
                io.notify("Keeping previous version");
            }
        }
    }
}

/// Run one prompt through planning, questions, refinement and tweaks.
///
/// Returns `None` when the user cancels or refinement fails.
pub async fn process_single_prompt(
    provider: &dyn LLMProvider,
    initial_prompt: &str,
    options: &RunOptions,
    io: &mut dyn Interaction,
) -> Option<PromptOutcome> {
    let plan = determine_question_plan(provider, initial_prompt, options, io).await;
    let mut llm_latency = plan.llm_latency;

    let light_refinement = plan.task_type == TaskType::Analysis && plan.skip_questions && !options.quick;

    let (final_prompt, is_refined, questions_asked) = if light_refinement {
        let started = Instant::now();
        let result = provider.light_refine(initial_prompt, ANALYSIS_REFINEMENT_SYSTEM_INSTRUCTION).await;
        llm_latency += started.elapsed();
        match result {
            Ok(refined) => (refined, true, 0),
            Err(e) => {
                warn!("Light refinement failed: {}", e.sanitized());
                io.notify("Warning: Light refinement failed. Using original prompt.");
                (initial_prompt.to_string(), false, 0)
            }
        }
    } else {
        let answers = ask_clarifying_questions(&plan, io)?;
        let started = Instant::now();
        let result = generate_final_prompt(provider, initial_prompt, &answers, &plan.mapping).await;
        llm_latency += started.elapsed();
        match result {
            Ok((prompt, refined)) => (prompt, refined, answers.len()),
            Err(e) => {
                io.notify(&format!("Error: Failed to generate refined prompt: {}", e.sanitized()));
                debug!("Refinement error: {:?}", e);
                return None;
            }
        }
    };

    io.display(&final_prompt, is_refined);

    let final_prompt = if io.is_interactive() && !options.quick {
        iterative_refinement(provider, final_prompt, io).await
    } else {
        if options.quick {
            io.notify("Skipping interactive tweaking (quick mode)");
        } else {
            io.notify("Skipping interactive tweaking (input is not interactive)");
        }
        final_prompt
    };

    Some(PromptOutcome {
        final_prompt,
        task_type: plan.task_type,
        is_refined,
        questions_asked,
        skip_questions: plan.skip_questions,
        llm_latency,
    })
}
