//! Interactive roleplay session (`rpchat chat`).

use anyhow::{Context, Result, bail};
use chrono::Utc;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rpchat::audit::TranscriptLog;
use rpchat::command::{self, Command};
use rpchat::completion::MiniMaxClient;
use rpchat::config::Config;
use rpchat::controller::{CandidatePicker, SessionController};
use rpchat::persona::PersonaStore;
use rpchat::session::{Session, SessionState};
use rpchat::ui::{ChatUI, SelectPicker, read_command};

pub struct ChatArgs {
    pub character: Option<String>,
    pub self_id: Option<String>,
    pub load: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

pub async fn cmd_chat(config: &Config, args: ChatArgs) -> Result<()> {
    config.ensure_directories()?;
    let api_key = config.api_key()?;
    let store = PersonaStore::new(&config.characters_dir);
    let stamp = Utc::now().timestamp_millis();

    let (session, save_path) = open_session(config, &store, &args, stamp)?;
    session
        .to_state()
        .save(&save_path)
        .with_context(|| format!("Failed to save session to {}", save_path.display()))?;

    let client = Arc::new(MiniMaxClient::new(&config.toml.api.endpoint, api_key));
    let log = TranscriptLog::new(config.audit_log_path(stamp));
    let mut controller =
        SessionController::new(session, client, config.controller_settings(), log);

    let ui = ChatUI::new(controller.session()).with_trigger(*controller.trigger());
    ui.show_banner(controller.session(), &save_path);
    for turn in controller.session().transcript().iter() {
        ui.print_turn(turn);
    }

    let result = run_loop(&mut controller, &ui, &save_path).await;
    if let Err(e) = &result {
        tracing::error!("chat loop failed: {:#}", e);
        if let Err(save_err) = controller.session().to_state().save(&save_path) {
            tracing::warn!("failed to save session after error: {:#}", save_err);
        }
    }
    result
}

/// Resume from `--load` or start fresh, returning the session and where it is saved.
fn open_session(
    config: &Config,
    store: &PersonaStore,
    args: &ChatArgs,
    stamp: i64,
) -> Result<(Session, PathBuf)> {
    if let Some(path) = &args.load {
        let state = SessionState::load(path)?;
        if let Some(character) = &args.character
            && character != &state.character_id
        {
            bail!(
                "Session {} belongs to character '{}', not '{}'",
                path.display(),
                state.character_id,
                character
            );
        }

        let self_id = args.self_id.clone().or_else(|| state.self_id.clone());
        let cast = store.cast(&state.character_id, self_id.as_deref(), config.narrator())?;
        tracing::info!(
            path = %path.display(),
            transcript = state.transcript.len(),
            memory = state.memory_digest.len(),
            "resuming session"
        );
        return Ok((Session::restore(cast, config.model(), state), path.clone()));
    }

    let Some(character) = &args.character else {
        bail!("--character is required when starting a new session");
    };
    let cast = store.cast(character, args.self_id.as_deref(), config.narrator())?;
    let save_path = args
        .save
        .clone()
        .unwrap_or_else(|| config.default_session_path(stamp));
    Ok((Session::fresh(cast, config.model()), save_path))
}

async fn run_loop(
    controller: &mut SessionController,
    ui: &ChatUI,
    save_path: &Path,
) -> Result<()> {
    loop {
        let line = read_command(controller.session().counterpart_name())?;
        let command = match command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                controller.report_error(&e);
                ui.show_error(&e);
                continue;
            }
        };

        let mutating = !command.is_read_only();
        let mut picker = SpinnerPicker {
            ui,
            spinner: calls_model(&command).then(|| ui.spinner(THINKING)),
            inner: SelectPicker::new(),
        };

        let result = controller.execute(command, &mut picker).await;
        picker.clear();

        let exit = match result {
            Ok(outcome) => {
                ui.show_outcome(&outcome);
                outcome.exit
            }
            Err(e) => {
                controller.report_error(&e);
                ui.show_error(&e);
                false
            }
        };

        if mutating || exit {
            controller
                .session()
                .to_state()
                .save(save_path)
                .with_context(|| format!("Failed to save session to {}", save_path.display()))?;
        }

        if exit {
            ui.show_saved(save_path);
            return Ok(());
        }
    }
}

const THINKING: &str = "thinking...";

fn calls_model(command: &Command) -> bool {
    !command.is_read_only() && !matches!(command, Command::Rewrite(_))
}

/// Clears the spinner before the selection menu takes over the terminal and
/// restarts it once a candidate is chosen.
struct SpinnerPicker<'a, P> {
    ui: &'a ChatUI,
    spinner: Option<ProgressBar>,
    inner: P,
}

impl<P> SpinnerPicker<'_, P> {
    fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl<P: CandidatePicker> CandidatePicker for SpinnerPicker<'_, P> {
    fn pick(&mut self, prompt: &str, candidates: &[String]) -> Result<Option<usize>> {
        self.clear();
        let choice = self.inner.pick(prompt, candidates)?;
        if choice.is_some() {
            self.spinner = Some(self.ui.spinner(THINKING));
        }
        Ok(choice)
    }
}
