//! Session controller: interprets commands against a session.
//!
//! One command is processed to completion, including any completion call and
//! any compaction it triggers, before the next is accepted. Every branch
//! either commits its whole mutation or leaves the session as it was, with one
//! deliberate exception: a line the user said or narrated stays in the
//! transcript when the generation that follows it fails.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, TranscriptLog};
use crate::command::Command;
use crate::compaction::{
    AutoCompaction, CompactionEngine, CompactionSummary, DEFAULT_SUMMARY_LENGTH,
    DEFAULT_TOKEN_THRESHOLD, parse_compaction_span,
};
use crate::completion::{CompletionClient, CompletionOptions};
use crate::errors::{ApiError, ChatError, ChatResult};
use crate::session::Session;
use crate::transcript::Turn;

/// Number of alternatives requested by regenerate and inspire.
pub const DEFAULT_SAMPLE_COUNT: u32 = 3;

/// Chooses one of several sampled candidates, or none of them.
pub trait CandidatePicker {
    fn pick(&mut self, prompt: &str, candidates: &[String]) -> anyhow::Result<Option<usize>>;
}

/// Tunables of the controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub token_threshold: u64,
    pub sample_count: u32,
    pub compress_model: String,
    pub summary_length: usize,
}

impl ControllerSettings {
    pub fn with_compress_model(compress_model: impl Into<String>) -> Self {
        Self {
            token_threshold: DEFAULT_TOKEN_THRESHOLD,
            sample_count: DEFAULT_SAMPLE_COUNT,
            compress_model: compress_model.into(),
            summary_length: DEFAULT_SUMMARY_LENGTH,
        }
    }
}

/// Something the user should see as a result of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A turn was appended to the transcript.
    Appended(Turn),
    /// The last turn's content was replaced.
    Rewrote(Turn),
    /// A generation finished; `token_usage` is the reported total.
    Replied { turn: Turn, token_usage: u64 },
    Compacted(CompactionSummary),
    /// A read-only listing (`log` / `memory`).
    Listing { title: String, turns: Vec<Turn> },
    Notice(String),
    Warning(String),
}

/// Result of one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub exit: bool,
    pub events: Vec<Event>,
}

impl Outcome {
    fn exit() -> Self {
        Self {
            exit: true,
            events: Vec::new(),
        }
    }

    fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn replies(&self) -> impl Iterator<Item = &Turn> {
        self.events.iter().filter_map(|event| match event {
            Event::Replied { turn, .. } => Some(turn),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            Event::Warning(message) => Some(message.as_str()),
            _ => None,
        })
    }
}

/// Owns a session and applies commands to it.
pub struct SessionController {
    session: Session,
    client: Arc<dyn CompletionClient>,
    engine: CompactionEngine,
    trigger: AutoCompaction,
    sample_count: u32,
    log: TranscriptLog,
}

impl SessionController {
    pub fn new(
        session: Session,
        client: Arc<dyn CompletionClient>,
        settings: ControllerSettings,
        log: TranscriptLog,
    ) -> Self {
        Self {
            session,
            client,
            engine: CompactionEngine::new(settings.compress_model, settings.summary_length),
            trigger: AutoCompaction::new(settings.token_threshold),
            sample_count: settings.sample_count.max(1),
            log,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn trigger(&self) -> &AutoCompaction {
        &self.trigger
    }

    /// Record a failed command in the audit log. API errors are recorded
    /// when they happen, so only the other kinds are written here.
    pub fn report_error(&self, error: &ChatError) {
        if !matches!(error, ChatError::Api(_)) {
            self.audit_warning(&format!("{}: {}", error.kind(), error));
        }
    }

    /// Apply one parsed command.
    pub async fn execute(
        &mut self,
        command: Command,
        picker: &mut dyn CandidatePicker,
    ) -> ChatResult<Outcome> {
        debug!(?command, "executing command");
        match command {
            Command::Exit => Ok(Outcome::exit()),
            Command::ShowLog => Ok(self.listing("Transcript", self.session.transcript().as_slice())),
            Command::ShowMemory => Ok(self.listing("Memory", self.session.memory().as_slice())),
            Command::Compress(arg) => self.compress(arg.as_deref()).await,
            Command::Rewrite(text) => self.rewrite_last(text),
            Command::Regenerate => self.regenerate(picker).await,
            Command::Inspire => self.inspire(picker).await,
            Command::Skip => {
                let mut outcome = Outcome::default();
                self.generate(&mut outcome).await?;
                Ok(outcome)
            }
            Command::Narrate(text) => {
                let turn = Turn::assistant(self.session.narrator_name(), text);
                self.say_then_generate(turn).await
            }
            Command::Say(text) => {
                let turn = Turn::user(self.session.counterpart_name(), text);
                self.say_then_generate(turn).await
            }
        }
    }

    fn listing(&self, title: &str, turns: &[Turn]) -> Outcome {
        Outcome {
            exit: false,
            events: vec![Event::Listing {
                title: title.to_string(),
                turns: turns.to_vec(),
            }],
        }
    }

    async fn say_then_generate(&mut self, turn: Turn) -> ChatResult<Outcome> {
        let mut outcome = Outcome::default();
        self.append(turn.clone());
        outcome.push(Event::Appended(turn));
        self.generate(&mut outcome).await?;
        Ok(outcome)
    }

    /// Replace the last reply with `text`. No model call.
    pub fn rewrite_last(&mut self, text: String) -> ChatResult<Outcome> {
        self.session.rewrite_last(text)?;
        let mut outcome = Outcome::default();
        if let Some(turn) = self.session.transcript().last() {
            self.audit_turn(AuditEvent::Rewrite, turn);
            outcome.push(Event::Rewrote(turn.clone()));
        }
        Ok(outcome)
    }

    /// Re-sample the last reply and let the user choose a replacement.
    pub async fn regenerate(&mut self, picker: &mut dyn CandidatePicker) -> ChatResult<Outcome> {
        self.session
            .transcript()
            .ensure_replaceable(self.session.character_name())?;

        let prompt = self.session.build_regenerate_prompt();
        let candidates = self.sample(&prompt, self.session.model().to_string()).await?;

        let mut outcome = Outcome::default();
        match self.pick(picker, "Replace the last reply with", &candidates)? {
            Some(choice) => {
                let content = candidates[choice].clone();
                outcome.events.extend(self.rewrite_last(content)?.events);
            }
            None => outcome.push(Event::Notice("Kept the existing reply.".to_string())),
        }
        Ok(outcome)
    }

    /// Draft candidate lines for the user; a chosen one is said, then answered.
    pub async fn inspire(&mut self, picker: &mut dyn CandidatePicker) -> ChatResult<Outcome> {
        let prompt = self.session.build_inspire_prompt();
        let candidates = self.sample(&prompt, self.session.model().to_string()).await?;

        match self.pick(picker, "Say", &candidates)? {
            Some(choice) => {
                let turn = Turn::user(self.session.counterpart_name(), candidates[choice].clone());
                self.say_then_generate(turn).await
            }
            None => {
                let mut outcome = Outcome::default();
                outcome.push(Event::Notice("No line chosen.".to_string()));
                Ok(outcome)
            }
        }
    }

    /// Manually compact part of the transcript.
    pub async fn compress(&mut self, arg: Option<&str>) -> ChatResult<Outcome> {
        let span = parse_compaction_span(arg)?;
        let mut outcome = Outcome::default();

        let len = self.session.transcript().len();
        if len <= 1 {
            let message = "Nothing to compress: the transcript has at most one line.".to_string();
            self.audit_warning(&message);
            outcome.push(Event::Warning(message));
            return Ok(outcome);
        }

        let count = span.resolve(len)?;
        info!(%span, count, len, "manual compaction");
        let summary = self.compact(count).await?;
        outcome.push(Event::Compacted(summary));
        Ok(outcome)
    }

    /// Generate the character's next reply from the current state.
    async fn generate(&mut self, outcome: &mut Outcome) -> ChatResult<()> {
        let prompt = self.session.build_prompt();
        let options = CompletionOptions::new(self.session.model());

        let completion = self
            .client
            .complete(&prompt, &options)
            .await
            .map_err(|e| self.api_failure(e))?;

        if completion.choices.len() != 1 {
            return Err(self.api_failure(ApiError::malformed(format!(
                "expected exactly one choice, got {}",
                completion.choices.len()
            ))));
        }

        let content = completion.choices.into_iter().next().unwrap_or_default();
        let turn = Turn::assistant(self.session.character_name(), content);
        self.append(turn.clone());
        outcome.push(Event::Replied {
            turn,
            token_usage: completion.token_usage,
        });

        if self.trigger.should_compact(completion.token_usage) {
            let count = self.trigger.span_for(self.session.transcript().len());
            if count == 0 {
                return Ok(());
            }
            info!(
                tokens = completion.token_usage,
                threshold = self.trigger.threshold(),
                count,
                "token usage reached threshold, compacting"
            );
            match self.compact(count).await {
                Ok(summary) => outcome.push(Event::Compacted(summary)),
                Err(e) => {
                    let message = format!("Automatic memory compression failed: {}", e);
                    warn!("{}", message);
                    outcome.push(Event::Warning(message));
                }
            }
        }
        Ok(())
    }

    async fn compact(&mut self, count: usize) -> ChatResult<CompactionSummary> {
        let result = self
            .engine
            .compact(self.client.as_ref(), &mut self.session, count)
            .await;
        let summary = match result {
            Ok(summary) => summary,
            Err(ChatError::Api(e)) => return Err(self.api_failure(e)),
            Err(e) => return Err(e),
        };

        let archived = self.session.archive().as_slice();
        let start = archived.len() - summary.turns_compacted;
        if let Err(e) = self.log.record_turns(AuditEvent::Archive, &archived[start..]) {
            warn!("failed to write audit log: {:#}", e);
        }
        self.audit_turn(AuditEvent::Compact, &summary.digest);
        Ok(summary)
    }

    /// Request `sample_count` alternatives for `prompt`.
    async fn sample(&self, prompt: &[Turn], model: String) -> ChatResult<Vec<String>> {
        let options = CompletionOptions::new(model).with_samples(self.sample_count);
        let completion = self
            .client
            .complete(prompt, &options)
            .await
            .map_err(|e| self.api_failure(e))?;

        if completion.choices.is_empty() {
            return Err(self.api_failure(ApiError::malformed("no candidates returned")));
        }
        Ok(completion.choices)
    }

    fn pick(
        &self,
        picker: &mut dyn CandidatePicker,
        prompt: &str,
        candidates: &[String],
    ) -> ChatResult<Option<usize>> {
        match picker.pick(prompt, candidates)? {
            Some(choice) if choice >= candidates.len() => Err(ChatError::InvalidArgument(format!(
                "candidate {} does not exist ({} offered)",
                choice,
                candidates.len()
            ))),
            choice => Ok(choice),
        }
    }

    fn append(&mut self, turn: Turn) {
        self.audit_turn(AuditEvent::Append, &turn);
        self.session.append(turn);
    }

    fn api_failure(&self, error: ApiError) -> ChatError {
        warn!(code = error.code, "completion failed: {}", error.message);
        if let Err(e) = self.log.record_api_error(&error) {
            warn!("failed to write audit log: {:#}", e);
        }
        ChatError::Api(error)
    }

    fn audit_turn(&self, event: AuditEvent, turn: &Turn) {
        if let Err(e) = self.log.record_turn(event, turn) {
            warn!("failed to write audit log: {:#}", e);
        }
    }

    fn audit_warning(&self, message: &str) {
        if let Err(e) = self.log.record_warning(message) {
            warn!("failed to write audit log: {:#}", e);
        }
    }
}
