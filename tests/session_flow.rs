//! End-to-end session scenarios against the scripted completion client.

use std::fs;
use std::sync::Arc;

use rpchat::audit::TranscriptLog;
use rpchat::command::{Command, parse};
use rpchat::completion::{Completion, ScriptedClient};
use rpchat::controller::{CandidatePicker, ControllerSettings, Event, SessionController};
use rpchat::errors::ChatError;
use rpchat::persona::{Cast, Persona, PersonaStore};
use rpchat::session::{Session, SessionState};
use rpchat::transcript::{ArchivedLog, MemoryDigest, Role, Transcript, Turn};
use tempfile::TempDir;

struct FixedPicker(Option<usize>);

impl CandidatePicker for FixedPicker {
    fn pick(&mut self, _prompt: &str, _candidates: &[String]) -> anyhow::Result<Option<usize>> {
        Ok(self.0)
    }
}

fn cast() -> Cast {
    Cast {
        character_id: "alice".to_string(),
        self_id: Some("bob".to_string()),
        character: Persona::new("Alice", "An innkeeper.").with_opening("Welcome."),
        counterpart: Persona::new("Bob", "A traveller."),
        narrator: Persona::narrator("Narrator"),
    }
}

/// Session whose transcript holds `n` alternating lines, starting with Alice.
fn session_with(n: usize) -> Session {
    let turns = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Turn::assistant("Alice", format!("reply {}", i))
            } else {
                Turn::user("Bob", format!("line {}", i))
            }
        })
        .collect();
    let state = SessionState {
        character_id: "alice".to_string(),
        self_id: Some("bob".to_string()),
        memory_digest: MemoryDigest::new(),
        archived_log: ArchivedLog::new(),
        transcript: Transcript::from_turns(turns),
    };
    Session::restore(cast(), "abab6.5s-chat", state)
}

fn controller(session: Session, client: &Arc<ScriptedClient>) -> SessionController {
    SessionController::new(
        session,
        client.clone(),
        ControllerSettings::with_compress_model("abab6.5s-chat"),
        TranscriptLog::disabled(),
    )
}

async fn run(controller: &mut SessionController, raw: &str, choice: Option<usize>) -> Result<Vec<Event>, ChatError> {
    let command = parse(raw)?;
    controller
        .execute(command, &mut FixedPicker(choice))
        .await
        .map(|outcome| outcome.events)
}

#[tokio::test]
async fn test_hello_below_threshold() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("hi", 50);
    let mut controller = controller(Session::fresh(cast(), "abab6.5s-chat"), &client);

    run(&mut controller, "hello", None).await.unwrap();

    let session = controller.session();
    assert_eq!(session.transcript().len(), 3);
    assert_eq!(session.transcript().as_slice()[1], Turn::user("Bob", "hello"));
    assert_eq!(session.transcript().as_slice()[2], Turn::assistant("Alice", "hi"));
    assert!(session.memory().is_empty());
    assert!(session.archive().is_empty());
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn test_compress_all_moves_everything() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("Everything so far.", 90);
    let mut controller = controller(session_with(8), &client);

    run(&mut controller, "compress all", None).await.unwrap();

    let session = controller.session();
    assert!(session.transcript().is_empty());
    assert_eq!(session.archive().len(), 8);
    assert_eq!(session.memory().len(), 1);
    assert_eq!(
        session.memory().as_slice()[0],
        Turn::assistant("Narrator", "Everything so far.")
    );

    // The summarizer saw every line as "speaker: content".
    let requests = client.requests();
    let request = &requests[0];
    assert_eq!(request.messages.len(), 2);
    assert!(request.messages[1].content.starts_with("Alice: reply 0\nBob: line 1\n"));
}

#[tokio::test]
async fn test_compress_ratio_conserves_lines() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("First half.", 90);
    let mut controller = controller(session_with(10), &client);

    run(&mut controller, "compress 0.5", None).await.unwrap();

    let session = controller.session();
    assert_eq!(session.archive().len(), 5);
    assert_eq!(session.transcript().len(), 5);
    assert_eq!(session.transcript().as_slice()[0].content, "line 5");
    assert_eq!(session.archive().as_slice()[4].content, "reply 4");
}

#[tokio::test]
async fn test_compress_negative_offsets() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("Most of it.", 90);
    let mut controller = controller(session_with(10), &client);

    let err = run(&mut controller, "compress -10", None).await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidArgument(_)));
    assert_eq!(controller.session().transcript().len(), 10);

    run(&mut controller, "compress -1", None).await.unwrap();
    assert_eq!(controller.session().archive().len(), 9);
    assert_eq!(controller.session().transcript().len(), 1);
}

#[tokio::test]
async fn test_compress_rejects_bad_arguments_without_calls() {
    let client = Arc::new(ScriptedClient::new());
    let mut controller = controller(session_with(10), &client);

    for raw in ["compress 0", "compress 1.5", "compress nan", "compress half", "compress 0.5 0.5"] {
        let err = run(&mut controller, raw, None).await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)), "{}", raw);
    }
    assert_eq!(client.request_count(), 0);
    assert_eq!(controller.session().transcript().len(), 10);
}

#[tokio::test]
async fn test_skip_lets_character_continue_own_reply() {
    let client = Arc::new(ScriptedClient::with_responses([
        Ok(Completion::single("She pours a drink.", 120)),
        Ok(Completion::single("Then another.", 130)),
        Ok(Completion::single("Unused.", 10)),
    ]));
    let mut controller = controller(session_with(3), &client);

    run(&mut controller, "~", None).await.unwrap();
    run(&mut controller, "~", None).await.unwrap();

    let turns = controller.session().transcript().as_slice();
    assert_eq!(turns.len(), 5);
    assert_eq!(turns[2], Turn::assistant("Alice", "reply 2"));
    assert_eq!(turns[3], Turn::assistant("Alice", "She pours a drink."));
    assert_eq!(turns[4], Turn::assistant("Alice", "Then another."));
    assert_eq!(client.remaining(), 1);

    // The second call ends on the character's own line.
    let requests = client.requests();
    assert_eq!(
        requests[1].messages.last().unwrap(),
        &Turn::assistant("Alice", "She pours a drink.")
    );
}

#[tokio::test]
async fn test_failed_regenerate_leaves_queue_untouched() {
    let client = Arc::new(ScriptedClient::with_responses([Ok(Completion::new(
        vec!["A.".to_string(), "B.".to_string(), "C.".to_string()],
        300,
    ))]));
    let mut controller = controller(session_with(2), &client);

    let err = run(&mut controller, "?", Some(0)).await.unwrap_err();

    assert!(matches!(err, ChatError::InvalidState(_)));
    assert_eq!(client.remaining(), 1);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_auto_compaction_on_threshold() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("And so it goes.", 7000);
    client.push_reply("Earlier, they talked.", 200);
    let mut controller = controller(session_with(9), &client);

    let events = run(&mut controller, "~", None).await.unwrap();

    let session = controller.session();
    assert_eq!(session.transcript().len(), 5);
    assert_eq!(session.archive().len(), 5);
    assert_eq!(session.memory().len(), 1);
    assert_eq!(session.transcript().last().unwrap().content, "And so it goes.");
    assert!(events.iter().any(|e| matches!(e, Event::Compacted(s) if s.turns_compacted == 5)));
}

#[tokio::test]
async fn test_memory_is_in_every_later_prompt() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("Earlier, they talked.", 90);
    client.push_reply("Indeed.", 100);
    let mut controller = controller(session_with(6), &client);

    run(&mut controller, "compress", None).await.unwrap();
    run(&mut controller, "Remember?", None).await.unwrap();

    let requests = client.requests();

    let prompt = &requests[1].messages;
    assert_eq!(prompt[3], Turn::assistant("Narrator", "Earlier, they talked."));
    assert_eq!(prompt[4].content, "line 3");
    assert_eq!(prompt.last().unwrap(), &Turn::user("Bob", "Remember?"));
}

#[tokio::test]
async fn test_regenerate_replaces_with_chosen_candidate() {
    let client = Arc::new(ScriptedClient::new());
    client.push(Ok(Completion::new(
        vec!["A.".to_string(), "B.".to_string(), "C.".to_string()],
        400,
    )));
    let mut controller = controller(session_with(3), &client);

    run(&mut controller, "?", Some(1)).await.unwrap();

    let transcript = controller.session().transcript();
    assert_eq!(transcript.len(), 3);
    assert_eq!(transcript.last().unwrap(), &Turn::assistant("Alice", "B."));
    assert_eq!(client.requests()[0].options.sample_count, Some(3));
}

#[tokio::test]
async fn test_rewrite_of_opening_line_fails() {
    let client = Arc::new(ScriptedClient::new());
    let mut controller = controller(Session::fresh(cast(), "abab6.5s-chat"), &client);

    let err = run(&mut controller, "!Something else.", None).await.unwrap_err();

    assert!(matches!(err, ChatError::InvalidState(_)));
    assert_eq!(controller.session().transcript().as_slice()[0].content, "Welcome.");
}

#[tokio::test]
async fn test_narration_then_rewrite_of_reply() {
    let client = Arc::new(ScriptedClient::new());
    client.push_reply("Alice looks up.", 100);
    let mut controller = controller(session_with(3), &client);

    run(&mut controller, "/The door opens.", None).await.unwrap();
    let transcript = controller.session().transcript().as_slice();
    assert_eq!(transcript[3].name, "Narrator");
    assert_eq!(transcript[3].role, Role::Assistant);

    run(&mut controller, "!Alice smiles.", None).await.unwrap();
    assert_eq!(controller.session().transcript().last().unwrap().content, "Alice smiles.");
}

#[tokio::test]
async fn test_api_error_keeps_said_line() {
    let client = Arc::new(ScriptedClient::new());
    client.push_error(1002, "rate limited");
    let mut controller = controller(session_with(1), &client);

    let err = run(&mut controller, "hello", None).await.unwrap_err();

    assert!(matches!(err, ChatError::Api(ref api) if api.code == 1002));
    assert_eq!(controller.session().transcript().len(), 2);
    assert!(controller.session().memory().is_empty());
}

#[tokio::test]
async fn test_exit_and_read_only_commands() {
    let client = Arc::new(ScriptedClient::new());
    let mut controller = controller(session_with(2), &client);
    let before = controller.session().to_state();

    run(&mut controller, "log", None).await.unwrap();
    run(&mut controller, "memory", None).await.unwrap();
    let outcome = controller
        .execute(Command::Exit, &mut FixedPicker(None))
        .await
        .unwrap();

    assert!(outcome.exit);
    assert_eq!(controller.session().to_state(), before);
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_saved_session_resumes_with_audit_log() {
    let dir = TempDir::new().unwrap();
    let characters = dir.path().join("characters");
    fs::create_dir_all(&characters).unwrap();
    fs::write(
        characters.join("alice.json"),
        r#"{ "name": "Alice", "setting": "An innkeeper.", "opening": "Welcome." }"#,
    )
    .unwrap();

    let store = PersonaStore::new(&characters);
    let session = Session::fresh(store.cast("alice", None, "Narrator").unwrap(), "abab6.5s-chat");
    let log_path = dir.path().join("logs.log");

    let client = Arc::new(ScriptedClient::new());
    client.push_reply("Hello, traveller.", 80);
    client.push_reply("They greeted each other.", 40);
    let mut controller = SessionController::new(
        session,
        client.clone(),
        ControllerSettings::with_compress_model("abab6.5s-chat"),
        TranscriptLog::new(&log_path),
    );

    run(&mut controller, "Hi there", None).await.unwrap();
    run(&mut controller, "compress all", None).await.unwrap();

    let save_path = dir.path().join("sessions").join("1.json");
    controller.session().to_state().save(&save_path).unwrap();

    let state = SessionState::load(&save_path).unwrap();
    assert_eq!(state.self_id, None);
    assert!(state.transcript.is_empty());
    assert_eq!(state.archived_log.len(), 3);
    assert_eq!(state.memory_digest.len(), 1);

    let resumed = Session::restore(
        store.cast(&state.character_id, None, "Narrator").unwrap(),
        "abab6.5s-chat",
        state,
    );
    assert_eq!(resumed.counterpart_name(), "User");
    assert_eq!(resumed.build_prompt().len(), 4);

    let audit = fs::read_to_string(&log_path).unwrap();
    assert!(audit.contains("|append|user|User|Hi there"));
    assert!(audit.contains("|append|assistant|Alice|Hello, traveller."));
    assert_eq!(audit.matches("|archive|").count(), 3);
    assert!(audit.contains("|compact|assistant|Narrator|They greeted each other."));
}
