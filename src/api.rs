use serde::{Deserialize, Serialize};

// -- Leaderboard types ------------------------------------------------------

/// How often a participant model convinced the interrogator it was human.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantStat {
    pub participant_model: String,
    #[serde(default)]
    pub fooled_count: u64,
    #[serde(default)]
    pub total_games: u64,
    #[serde(default)]
    pub success_rate: f64,
}

/// How often an interrogator model correctly called out the AI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterrogatorStat {
    pub interrogator_model: String,
    #[serde(default)]
    pub correct_count: u64,
    #[serde(default)]
    pub total_games: u64,
    #[serde(default)]
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(default)]
    pub participant_stats: Vec<ParticipantStat>,
    #[serde(default)]
    pub interrogator_stats: Vec<InterrogatorStat>,
}

/// One leaderboard line, independent of which side of the battle it ranks.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow<'a> {
    pub model: &'a str,
    pub wins: u64,
    pub total: u64,
    pub success_rate: f64,
}

impl ParticipantStat {
    pub fn row(&self) -> LeaderboardRow<'_> {
        LeaderboardRow {
            model: &self.participant_model,
            wins: self.fooled_count,
            total: self.total_games,
            success_rate: self.success_rate,
        }
    }
}

impl InterrogatorStat {
    pub fn row(&self) -> LeaderboardRow<'_> {
        LeaderboardRow {
            model: &self.interrogator_model,
            wins: self.correct_count,
            total: self.total_games,
            success_rate: self.success_rate,
        }
    }
}

// -- Battle types -----------------------------------------------------------

/// A row of `GET /api/battles`. Older records may lack any of the model or
/// verdict columns, so everything except the id is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleSummary {
    pub run_id: String,
    #[serde(default)]
    pub participant_model: Option<String>,
    #[serde(default)]
    pub interrogator_model: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub judgment: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattlesResponse {
    #[serde(default)]
    pub battles: Vec<BattleSummary>,
}

/// Full battle record from `GET /api/battle/{run_id}`.
///
/// `conversation` is stored server-side as a JSON string but may also arrive
/// already decoded; [`crate::battle::parse_conversation`] accepts both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleDetail {
    pub run_id: String,
    #[serde(default)]
    pub participant_model: Option<String>,
    #[serde(default)]
    pub interrogator_model: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub judgment: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub conversation: Option<serde_json::Value>,
    #[serde(default)]
    pub interrogator_system_prompt: Option<String>,
    #[serde(default)]
    pub participant_system_prompt: Option<String>,
    #[serde(default)]
    pub run_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BattleResponse {
    pub battle: Option<BattleDetail>,
    pub error: Option<String>,
}

// -- Model catalogue --------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
    #[serde(default)]
    pub providers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct ApiKeyStatus {
    pub api_key_set: bool,
}

// -- Play stream ------------------------------------------------------------

/// Payload of one `/api/play` server-sent event.
///
/// Either `error` is set, or `role` and `content` describe a conversation
/// message. `turn` is informational only; the session numbers turns itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
