//! Past-battle helpers: verdict classification, judgment previews and the
//! reconstruction of a conversation from the two stored model transcripts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::session::{ConversationMessage, Role};

pub const JUDGMENT_PREVIEW_CHARS: usize = 100;
pub const NO_JUDGMENT: &str = "No judgment available";
pub const CONVERSATION_UNAVAILABLE: &str = "Conversation data not available";
pub const CONVERSATION_PARSE_ERROR: &str = "Error parsing conversation data";
pub const CONVERSATION_EMPTY: &str = "No conversation messages found";

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Human,
    Ai,
    Unknown,
    Other(String),
}

impl Verdict {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Verdict::Unknown,
            Some(v) if v.eq_ignore_ascii_case("human") => Verdict::Human,
            Some(v) if v.eq_ignore_ascii_case("ai") => Verdict::Ai,
            Some(v) => Verdict::Other(v.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Verdict::Human => "Human",
            Verdict::Ai => "AI",
            Verdict::Unknown => "Unknown",
            Verdict::Other(v) => v,
        }
    }
}

/// Whether a judgment text ends the game with an AI verdict, i.e. the
/// interrogator saw through the participant.
pub fn is_ai_verdict(judgment: &str) -> bool {
    judgment.to_lowercase().contains("final verdict: ai")
}

/// First [`JUDGMENT_PREVIEW_CHARS`] characters of a judgment, with `...`
/// appended when truncated.
pub fn judgment_preview(judgment: Option<&str>) -> String {
    match judgment {
        None | Some("") => NO_JUDGMENT.to_string(),
        Some(text) if text.chars().count() > JUDGMENT_PREVIEW_CHARS => {
            let head: String = text.chars().take(JUDGMENT_PREVIEW_CHARS).collect();
            format!("{}...", head)
        }
        Some(text) => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Transcript merge
// ---------------------------------------------------------------------------

/// A chat-completion message as stored in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl TranscriptMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Cursor layout for [`merge_transcripts`].
///
/// The stored transcripts are assumed to alternate strictly:
///
/// * interrogator: `[system, assistant(Q1), user(A1), assistant(Q2), ...]`
/// * participant:  `[system, user(Q1), assistant(A1), user(Q2), ...]`
///
/// so questions sit at `1, 3, 5, ...` and answers at `2, 4, 6, ...`. Any
/// change to how the game records transcripts breaks this layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
    pub question_start: usize,
    pub response_start: usize,
    pub stride: usize,
}

impl Default for MergeRule {
    fn default() -> Self {
        Self {
            question_start: 1,
            response_start: 2,
            stride: 2,
        }
    }
}

/// Interleave the interrogator's questions with the participant's answers.
///
/// Walks both cursors in lockstep and stops as soon as either runs off the
/// end of its transcript. Only `assistant` entries are emitted, so a
/// misplaced entry is skipped rather than attributed to the wrong side.
pub fn merge_transcripts(
    interrogator: &[TranscriptMessage],
    participant: &[TranscriptMessage],
    rule: MergeRule,
) -> Vec<ConversationMessage> {
    let stride = rule.stride.max(1);
    let mut flow = Vec::new();
    let mut q = rule.question_start;
    let mut r = rule.response_start;

    while q < interrogator.len() && r < participant.len() {
        let question = &interrogator[q];
        if question.role == "assistant" {
            let line = ConversationMessage::new(Role::Interrogator, question.content.as_str());
            flow.push(line);
        }
        let answer = &participant[r];
        if answer.role == "assistant" {
            let line = ConversationMessage::new(Role::Participant, answer.content.as_str());
            flow.push(line);
        }
        q += stride;
        r += stride;
    }

    flow
}

/// What the battle-detail view can show for a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationView {
    Messages(Vec<ConversationMessage>),
    /// Non-fatal placeholder text.
    Placeholder(&'static str),
}

/// Decode a stored conversation (JSON text or an already-decoded object)
/// and merge its transcripts.
pub fn parse_conversation(raw: Option<&Value>) -> ConversationView {
    let decoded;
    let value = match raw {
        None | Some(Value::Null) => {
            return ConversationView::Placeholder(CONVERSATION_UNAVAILABLE);
        }
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(v) => {
                decoded = v;
                &decoded
            }
            Err(e) => {
                warn!(error = %e, "stored conversation is not valid JSON");
                return ConversationView::Placeholder(CONVERSATION_PARSE_ERROR);
            }
        },
        Some(v) => v,
    };

    let transcript = |key: &str| value.get(key).filter(|v| !v.is_null());
    let (Some(interrogator), Some(participant)) =
        (transcript("interrogator_transcript"), transcript("participant_transcript"))
    else {
        return ConversationView::Placeholder(CONVERSATION_UNAVAILABLE);
    };

    let decode = |v: &Value| Vec::<TranscriptMessage>::deserialize(v);
    let (interrogator, participant) = match (decode(interrogator), decode(participant)) {
        (Ok(i), Ok(p)) => (i, p),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "stored transcript has an unexpected shape");
            return ConversationView::Placeholder(CONVERSATION_PARSE_ERROR);
        }
    };

    let flow = merge_transcripts(&interrogator, &participant, MergeRule::default());
    if flow.is_empty() {
        ConversationView::Placeholder(CONVERSATION_EMPTY)
    } else {
        ConversationView::Messages(flow)
    }
}
