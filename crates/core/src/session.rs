//! One chat turn against an explicit session state.
//!
//! There is no global "current presentation": the caller owns a
//! [`SessionState`], passes it into [`run_turn`], and keeps the state returned
//! in the [`Turn`]. A failed oracle call returns an error and the caller's
//! state is untouched.

use crate::contract::{self, ContractViolation, EditIntent};
use crate::error::{Result, ValidationError};
use crate::extract::{extract, strip_code_fences, Extraction};
use crate::instruction::InstructionBuilder;
use crate::oracle::Oracle;
use crate::types::Document;

/// Who wrote a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message of the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything a session carries between turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Current presentation; `None` until the first successful creation.
    pub document: Option<Document>,

    /// User and assistant messages so far.
    pub transcript: Vec<ChatMessage>,
}

impl SessionState {
    /// Start a session from an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            document: Some(document),
            transcript: Vec::new(),
        }
    }
}

/// Per-turn settings.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Number of recent transcript messages included in the instruction.
    pub history_limit: usize,

    /// Reject updates that break the edit contract instead of accepting them.
    pub enforce_contract: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            history_limit: 0,
            enforce_contract: true,
        }
    }
}

/// What happened to the document during a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// A first document was created.
    Created,
    /// The document was replaced by an edited one.
    Updated,
    /// Conversational reply; the document is unchanged.
    Reply,
    /// A payload looked like a document but failed validation.
    Rejected(ValidationError),
    /// A valid document was returned but broke the edit contract.
    ContractBroken(ContractViolation),
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct Turn {
    /// State to use for the next turn.
    pub state: SessionState,

    /// Text to show the user.
    pub reply: String,

    pub outcome: TurnOutcome,
}

impl Turn {
    /// Whether the document changed in this turn.
    pub fn document_changed(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Created | TurnOutcome::Updated)
    }
}

/// Status line shown instead of the raw payload after an update.
pub fn status_message(was_edit: bool, document: &Document) -> String {
    let count = document.slides.len();
    let noun = if count == 1 { "slide" } else { "slides" };
    if was_edit {
        format!(
            "Presentation updated! Your presentation now has {} {}.",
            count, noun
        )
    } else {
        format!(
            "Presentation created successfully! I've generated {} {} for \"{}\".",
            count, noun, document.title
        )
    }
}

/// Run one chat turn: build the instruction, ask the oracle, interpret the reply.
pub async fn run_turn(
    oracle: &dyn Oracle,
    state: &SessionState,
    request: &str,
    config: &TurnConfig,
) -> Result<Turn> {
    let prior = state.document.as_ref();
    let instruction = InstructionBuilder::new(prior)
        .with_history(&state.transcript, config.history_limit)
        .build(request);

    log::debug!("Sending instruction ({} bytes)", instruction.len());
    let raw = oracle.complete(&instruction).await?;
    let text = strip_code_fences(&raw);

    let mut next = state.clone();
    let (reply, outcome) = match extract(&text) {
        Extraction::DocumentUpdate(document) => {
            let intent = EditIntent::parse(request, prior.is_some());
            match contract::check(prior, intent, &document) {
                Err(violation) if config.enforce_contract => {
                    log::warn!("Oracle broke the edit contract ({:?}): {}", intent, violation);
                    let reply = format!(
                        "The update was not applied because {}. The presentation is unchanged.",
                        violation
                    );
                    (reply, TurnOutcome::ContractBroken(violation))
                }
                checked => {
                    if let Err(violation) = checked {
                        log::warn!("Accepting update despite contract violation: {}", violation);
                    }
                    let outcome = if prior.is_some() {
                        TurnOutcome::Updated
                    } else {
                        TurnOutcome::Created
                    };
                    let reply = status_message(prior.is_some(), &document);
                    next.document = Some(document);
                    (reply, outcome)
                }
            }
        }
        Extraction::PlainReply {
            text,
            rejected: Some(reason),
        } => (text, TurnOutcome::Rejected(reason)),
        Extraction::PlainReply { text, rejected: None } => (text, TurnOutcome::Reply),
    };

    next.transcript.push(ChatMessage::user(request));
    next.transcript.push(ChatMessage::assistant(reply.clone()));

    Ok(Turn {
        state: next,
        reply,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Slide;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records the instructions it was sent.
    struct ScriptedOracle {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn replying(text: impl Into<String>) -> Self {
            Self::new(vec![Ok(text.into())])
        }

        fn last_instruction(&self) -> String {
            self.seen.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn complete(&self, instruction: &str) -> Result<String> {
            self.seen.lock().unwrap().push(instruction.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::OracleUnavailable("script exhausted".into())))
        }
    }

    fn abc() -> Document {
        Document::new("Letters")
            .with_slide(Slide::new("A").with_point("a1"))
            .with_slide(Slide::new("B").with_point("b1"))
            .with_slide(Slide::new("C").with_point("c1"))
    }

    #[tokio::test]
    async fn test_creation_turn() {
        let doc = Document::new("Bees").with_slide(Slide::new("Hives"));
        let oracle = ScriptedOracle::replying(format!("```json\n{}\n```", doc.to_pretty_json()));

        let turn = run_turn(&oracle, &SessionState::default(), "Create a deck about bees", &TurnConfig::default())
            .await
            .unwrap();

        assert_eq!(turn.outcome, TurnOutcome::Created);
        assert_eq!(turn.state.document, Some(doc));
        assert_eq!(
            turn.reply,
            "Presentation created successfully! I've generated 1 slide for \"Bees\"."
        );
        assert_eq!(turn.state.transcript.len(), 2);
        assert!(oracle.last_instruction().contains("No presentation exists yet"));
    }

    #[tokio::test]
    async fn test_edit_turn_replaces_document() {
        let prior = abc();
        let edited = prior
            .with_slide_replaced(1, Slide::new("B'").with_point("more detail"))
            .unwrap();
        let oracle = ScriptedOracle::replying(edited.to_pretty_json());
        let state = SessionState::with_document(prior.clone());

        let turn = run_turn(&oracle, &state, "edit slide 2 to add more detail", &TurnConfig::default())
            .await
            .unwrap();

        assert_eq!(turn.outcome, TurnOutcome::Updated);
        let doc = turn.state.document.as_ref().unwrap();
        assert_eq!(doc.slides[0], prior.slides[0]);
        assert_eq!(doc.slides[2], prior.slides[2]);
        assert_eq!(doc.slides[1].title, "B'");
        assert_eq!(turn.reply, "Presentation updated! Your presentation now has 3 slides.");
        assert!(oracle.last_instruction().contains("\"title\": \"Letters\""));
        // The caller's state is not modified.
        assert_eq!(state.document, Some(prior));
    }

    #[tokio::test]
    async fn test_contract_violation_keeps_prior_document() {
        let prior = abc();
        let partial = Document::new("Letters").with_slide(Slide::new("B'"));
        let oracle = ScriptedOracle::replying(partial.to_pretty_json());
        let state = SessionState::with_document(prior.clone());

        let turn = run_turn(&oracle, &state, "edit slide 2", &TurnConfig::default())
            .await
            .unwrap();

        assert_eq!(
            turn.outcome,
            TurnOutcome::ContractBroken(ContractViolation::SlideCount { expected: 3, actual: 1 })
        );
        assert_eq!(turn.state.document, Some(prior));
        assert!(turn.reply.contains("not applied"));
    }

    #[tokio::test]
    async fn test_positioned_addition_is_applied() {
        let prior = abc();
        let front = prior.with_slide_inserted(Some(0), Slide::new("Goals").with_point("Ship it"));
        let oracle = ScriptedOracle::replying(front.to_pretty_json());

        let turn = run_turn(
            &oracle,
            &SessionState::with_document(prior),
            "add a slide at the beginning about goals",
            &TurnConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(turn.outcome, TurnOutcome::Updated);
        assert_eq!(turn.state.document, Some(front));
    }

    #[tokio::test]
    async fn test_contract_violation_accepted_when_not_enforced() {
        let partial = Document::new("Letters").with_slide(Slide::new("B'"));
        let oracle = ScriptedOracle::replying(partial.to_pretty_json());
        let config = TurnConfig {
            enforce_contract: false,
            ..TurnConfig::default()
        };

        let turn = run_turn(&oracle, &SessionState::with_document(abc()), "edit slide 2", &config)
            .await
            .unwrap();

        assert_eq!(turn.outcome, TurnOutcome::Updated);
        assert_eq!(turn.state.document, Some(partial));
    }

    #[tokio::test]
    async fn test_conversational_reply() {
        let oracle = ScriptedOracle::replying("What audience is this for?");
        let state = SessionState::with_document(abc());

        let turn = run_turn(&oracle, &state, "help me", &TurnConfig::default())
            .await
            .unwrap();

        assert_eq!(turn.outcome, TurnOutcome::Reply);
        assert_eq!(turn.reply, "What audience is this for?");
        assert_eq!(turn.state.document, state.document);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected_not_applied() {
        let raw = r#"{"type": "presentation", "slides": {"title": "one"}}"#;
        let oracle = ScriptedOracle::replying(raw);

        let turn = run_turn(&oracle, &SessionState::default(), "create", &TurnConfig::default())
            .await
            .unwrap();

        assert!(matches!(turn.outcome, TurnOutcome::Rejected(_)));
        assert_eq!(turn.reply, raw);
        assert!(turn.state.document.is_none());
        assert!(!turn.document_changed());
    }

    #[tokio::test]
    async fn test_oracle_failure_is_surfaced() {
        let oracle = ScriptedOracle::new(vec![Err(Error::OracleUnavailable("timeout".into()))]);

        let err = run_turn(&oracle, &SessionState::default(), "create", &TurnConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OracleUnavailable(_)));
    }

    #[tokio::test]
    async fn test_history_reaches_instruction() {
        let oracle = ScriptedOracle::new(vec![Ok("first answer".into()), Ok("second answer".into())]);
        let config = TurnConfig {
            history_limit: 4,
            ..TurnConfig::default()
        };

        let first = run_turn(&oracle, &SessionState::default(), "hello", &config)
            .await
            .unwrap();
        run_turn(&oracle, &first.state, "again", &config).await.unwrap();

        let instruction = oracle.last_instruction();
        assert!(instruction.contains("User: hello\nAssistant: first answer\n"));
        assert!(instruction.contains("User message: again"));
    }

    #[test]
    fn test_status_message_plural() {
        let doc = abc();
        assert_eq!(
            status_message(false, &doc),
            "Presentation created successfully! I've generated 3 slides for \"Letters\"."
        );
        assert_eq!(
            status_message(true, &Document::new("x")),
            "Presentation updated! Your presentation now has 0 slides."
        );
    }
}
