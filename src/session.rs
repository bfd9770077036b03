//! Live game session: turns the `/api/play` event stream into a
//! turn-numbered conversation.
//!
//! ## Lifecycle
//! `Idle -> Running -> {Completed, Failed}`. A judgment event is the only way
//! to complete; a structured `{ "error": ... }` payload, a transport failure
//! or the stream ending early fails the session. Both terminal states ignore
//! anything the transport delivers afterwards. There is no timeout and no
//! reconnect: a stalled stream stays `Running` until [`LiveSessionController::reset`].

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::PlayEvent;
use crate::error::BattleError;
use crate::stream::{Connection, SignalReceiver, StreamHandler, Transport};

/// Shown to the view while waiting for the first question. Never stored in
/// [`SessionState::messages`].
pub const STARTING_PLACEHOLDER: &str =
    "The game is starting... The interrogator is thinking of the first question.";

/// Content of the system-error message appended on transport failure.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error occurred.";

// ---------------------------------------------------------------------------
// Conversation model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Interrogator,
    Participant,
    Judgment,
    SystemError,
    /// A conversational role the client does not know. Kept verbatim.
    Other(String),
}

impl Role {
    /// Map a wire role. The game server labels participant answers `"human"`.
    pub fn from_wire(role: &str) -> Self {
        match role {
            "interrogator" => Role::Interrogator,
            "participant" | "human" => Role::Participant,
            "judgment" => Role::Judgment,
            other => Role::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Interrogator => write!(f, "interrogator"),
            Role::Participant => write!(f, "participant"),
            Role::Judgment => write!(f, "judgment"),
            Role::SystemError => write!(f, "system-error"),
            Role::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub turn_count: usize,
    pub messages: Vec<ConversationMessage>,
}

/// Change notification for whatever is drawing the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Started { placeholder: String },
    /// `turn` is `Some(n)` on the interrogator message that opens turn `n`.
    Message {
        message: ConversationMessage,
        turn: Option<usize>,
    },
    Finished { status: SessionStatus },
    Reset,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Validated parameters for `/api/play`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub participant_model: String,
    pub interrogator_model: String,
    pub num_questions: u32,
}

impl PlayRequest {
    /// Check the selection before anything is opened.
    ///
    /// Model ids are `provider/model`; anything else can only come from a
    /// stale or hand-edited selection.
    pub fn new(
        participant_model: impl Into<String>,
        interrogator_model: impl Into<String>,
        num_questions: u32,
    ) -> Result<Self, BattleError> {
        let participant_model = participant_model.into();
        let interrogator_model = interrogator_model.into();

        if participant_model.trim().is_empty() || interrogator_model.trim().is_empty() {
            return Err(BattleError::Validation(
                "Please select both a participant model and an interrogator model \
                 before starting the game."
                    .to_string(),
            ));
        }
        if !participant_model.contains('/') || !interrogator_model.contains('/') {
            return Err(BattleError::Validation(
                "Invalid model selection. Expected provider/model identifiers.".to_string(),
            ));
        }
        if num_questions == 0 {
            return Err(BattleError::Validation(
                "The interrogator needs at least one question.".to_string(),
            ));
        }

        Ok(Self {
            participant_model,
            interrogator_model,
            num_questions,
        })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns one live session and its stream connection.
pub struct LiveSessionController {
    state: SessionState,
    connection: Option<Box<dyn Connection>>,
    /// When set, every state change is published here.
    updates: Option<mpsc::UnboundedSender<SessionUpdate>>,
}

impl Default for LiveSessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveSessionController {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            connection: None,
            updates: None,
        }
    }

    pub fn with_updates(updates: mpsc::UnboundedSender<SessionUpdate>) -> Self {
        Self {
            state: SessionState::default(),
            connection: None,
            updates: Some(updates),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn turn_count(&self) -> usize {
        self.state.turn_count
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.state.messages
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn has_open_connection(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_open())
    }

    /// Start a new session, closing any previous stream first.
    ///
    /// Returns the signal channel to [`crate::stream::pump`] into this
    /// controller. If the transport cannot open the stream the session is
    /// left `Failed` and the error is returned.
    pub fn start(
        &mut self,
        request: &PlayRequest,
        transport: &dyn Transport,
    ) -> Result<SignalReceiver, BattleError> {
        self.close_connection();
        self.state = SessionState {
            status: SessionStatus::Running,
            ..SessionState::default()
        };
        info!(
            participant = %request.participant_model,
            interrogator = %request.interrogator_model,
            questions = request.num_questions,
            "session starting"
        );
        self.emit(SessionUpdate::Started {
            placeholder: STARTING_PLACEHOLDER.to_string(),
        });

        match transport.open(request) {
            Ok((connection, signals)) => {
                self.connection = Some(connection);
                Ok(signals)
            }
            Err(e) => {
                self.fail_transport(&e.to_string());
                Err(e)
            }
        }
    }

    /// Apply one decoded play event.
    pub fn handle_event(&mut self, event: PlayEvent) {
        if self.state.status != SessionStatus::Running {
            debug!(status = ?self.state.status, "ignoring event outside a running session");
            return;
        }

        // An empty error string carries no failure.
        if let Some(error) = event.error.filter(|e| !e.is_empty()) {
            warn!(error = %error, "session failed with server error");
            self.push(ConversationMessage::new(Role::SystemError, error), None);
            self.finish(SessionStatus::Failed);
            return;
        }

        let role = Role::from_wire(event.role.as_deref().unwrap_or_default());
        let content = event.content.unwrap_or_default();

        match role {
            Role::Judgment => {
                self.push(ConversationMessage::new(Role::Judgment, content), None);
                self.finish(SessionStatus::Completed);
            }
            Role::Interrogator => {
                self.state.turn_count += 1;
                let turn = self.state.turn_count;
                self.push(
                    ConversationMessage::new(Role::Interrogator, content),
                    Some(turn),
                );
            }
            other => self.push(ConversationMessage::new(other, content), None),
        }
    }

    /// Close any open stream and return to an empty idle state.
    pub fn reset(&mut self) {
        self.close_connection();
        self.state = SessionState::default();
        debug!("session reset");
        self.emit(SessionUpdate::Reset);
    }

    fn fail_transport(&mut self, detail: &str) {
        if self.state.status != SessionStatus::Running {
            return;
        }
        warn!(detail, "session stream failed");
        let message = ConversationMessage::new(Role::SystemError, CONNECTION_ERROR_MESSAGE);
        self.push(message, None);
        self.finish(SessionStatus::Failed);
    }

    fn push(&mut self, message: ConversationMessage, turn: Option<usize>) {
        self.state.messages.push(message.clone());
        self.emit(SessionUpdate::Message { message, turn });
    }

    fn finish(&mut self, status: SessionStatus) {
        self.close_connection();
        self.state.status = status;
        info!(?status, turns = self.state.turn_count, "session finished");
        self.emit(SessionUpdate::Finished { status });
    }

    fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }

    fn emit(&self, update: SessionUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }
}

impl StreamHandler for LiveSessionController {
    fn on_message(&mut self, data: &str) {
        match serde_json::from_str::<PlayEvent>(data) {
            Ok(event) => self.handle_event(event),
            Err(e) => self.fail_transport(&format!("malformed event payload: {e}")),
        }
    }

    fn on_error(&mut self, detail: &str) {
        self.fail_transport(detail);
    }

    fn on_close(&mut self) {
        self.fail_transport("stream closed before judgment");
    }

    fn is_finished(&self) -> bool {
        self.state.status != SessionStatus::Running
    }
}

impl Drop for LiveSessionController {
    fn drop(&mut self) {
        self.close_connection();
    }
}
