//! Terminal renderers for leaderboards, battles and live sessions.
//!
//! Every renderer returns a `String`; printing is left to the caller.

use chrono::{DateTime, NaiveDateTime};
use colored::*;

use crate::api::{BattleDetail, BattleSummary, Leaderboard, LeaderboardRow};
use crate::battle::{
    is_ai_verdict, judgment_preview, parse_conversation, ConversationView, Verdict, NO_JUDGMENT,
};
use crate::select::{SearchableSelect, NO_RESULTS_PLACEHOLDER};
use crate::session::{
    ConversationMessage, Role, SessionStatus, SessionUpdate, CONNECTION_ERROR_MESSAGE,
};

pub const NO_LEADERBOARD_DATA: &str =
    "No data available yet. Play some battles to see the leaderboard!";
pub const NO_BATTLES: &str =
    "No battles yet. Start your first battle with `turing-battle play`!";

const CELEBRATION: &str = "🎉🎊 The interrogator caught the AI! 🎊🎉";
const CONNECTION_HINT: &str = "Please check your internet connection and try again.";
const API_HINT: &str = "Try selecting different models or check your API key configuration.";

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Medal for the podium, plain number below it.
pub fn rank_badge(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => n.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `Jan 5, 2025, 03:04 PM`
    Short,
    /// `January 5, 2025, 03:04 PM`
    Long,
}

/// Format a server timestamp. SQLite stores `YYYY-MM-DD HH:MM:SS`; RFC 3339
/// is accepted too. Anything else is shown as-is.
pub fn format_date(raw: Option<&str>, style: DateStyle) -> String {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return "Unknown date".to_string();
    };
    let fmt = match style {
        DateStyle::Short => "%b %-d, %Y, %I:%M %p",
        DateStyle::Long => "%B %-d, %Y, %I:%M %p",
    };
    match parse_timestamp(raw.trim()) {
        Some(dt) => dt.format(fmt).to_string(),
        None => raw.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    let dt = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(dt.naive_local())
}

fn verdict_badge(verdict: &Verdict) -> ColoredString {
    let label = verdict.label().to_string();
    match verdict {
        Verdict::Human => label.bright_green().bold(),
        Verdict::Ai => label.bright_red().bold(),
        Verdict::Unknown | Verdict::Other(_) => label.dimmed(),
    }
}

fn or_unknown(model: Option<&str>) -> &str {
    model.filter(|m| !m.is_empty()).unwrap_or("unknown model")
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

pub fn leaderboard(board: &Leaderboard) -> String {
    let participants: Vec<LeaderboardRow<'_>> =
        board.participant_stats.iter().map(|s| s.row()).collect();
    let interrogators: Vec<LeaderboardRow<'_>> =
        board.interrogator_stats.iter().map(|s| s.row()).collect();

    let mut out = String::new();
    out.push_str(&leaderboard_section(
        "🎭 Best participants (fooled the interrogator)",
        &participants,
    ));
    out.push('\n');
    out.push_str(&leaderboard_section(
        "🕵️ Best interrogators (spotted the AI)",
        &interrogators,
    ));
    out
}

pub fn leaderboard_section(title: &str, rows: &[LeaderboardRow<'_>]) -> String {
    let mut out = format!("{}\n", title.bold());
    if rows.is_empty() {
        out.push_str(&format!("  {}\n", NO_LEADERBOARD_DATA.dimmed()));
        return out;
    }
    let width = rows
        .iter()
        .map(|r| r.model.chars().count())
        .max()
        .unwrap_or(0);
    for (index, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "  {:>3}  {:<width$}  {:>7}  {}\n",
            rank_badge(index + 1),
            row.model,
            format!("{}/{}", row.wins, row.total),
            format!("{}%", row.success_rate).bright_cyan(),
            width = width,
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Battles
// ---------------------------------------------------------------------------

pub fn battle_cards(battles: &[BattleSummary]) -> String {
    if battles.is_empty() {
        return format!("{}\n", NO_BATTLES.dimmed());
    }
    battles.iter().map(battle_card).collect::<Vec<_>>().join("\n")
}

pub fn battle_card(battle: &BattleSummary) -> String {
    let verdict = Verdict::parse(battle.verdict.as_deref());
    format!(
        "🎭 {} {} 🕵️ {}  [{}]\n   {}  {}\n   {}\n",
        or_unknown(battle.participant_model.as_deref()).bold(),
        "vs".dimmed(),
        or_unknown(battle.interrogator_model.as_deref()).bold(),
        verdict_badge(&verdict),
        format_date(battle.created_at.as_deref(), DateStyle::Short).dimmed(),
        format!("(turing-battle battle {})", battle.run_id).dimmed(),
        judgment_preview(battle.judgment.as_deref()),
    )
}

/// Full view of one battle: info grid, merged conversation, judgment.
pub fn battle_detail(battle: &BattleDetail) -> String {
    let participant = or_unknown(battle.participant_model.as_deref());
    let interrogator = or_unknown(battle.interrogator_model.as_deref());
    let verdict = Verdict::parse(battle.verdict.as_deref());
    let date = format_date(battle.created_at.as_deref(), DateStyle::Long);

    let mut out = format!(
        "{} 🎭 {} vs 🕵️ {}\n\n",
        "Battle:".bold(),
        participant,
        interrogator
    );
    out.push_str(&format!("  {:<22}{}\n", "🎭 Participant Model", participant));
    out.push_str(&format!("  {:<22}{}\n", "🕵️ Interrogator Model", interrogator));
    out.push_str(&format!("  {:<22}{}\n", "Date", date));
    out.push_str(&format!("  {:<22}{}\n\n", "Verdict", verdict_badge(&verdict)));

    out.push_str(&format!("{}\n", "Conversation".bold()));
    match parse_conversation(battle.conversation.as_ref()) {
        ConversationView::Messages(messages) => {
            for message in &messages {
                out.push_str(&labelled_message(message));
            }
        }
        ConversationView::Placeholder(text) => out.push_str(&format!("  {}\n", text.dimmed())),
    }

    let judgment = battle
        .judgment
        .as_deref()
        .filter(|j| !j.is_empty())
        .unwrap_or(NO_JUDGMENT);
    let heading = "🕵️ Interrogator's Final Judgment".bold();
    out.push_str(&format!("\n{}\n{}\n", heading, judgment));
    out
}

fn labelled_message(message: &ConversationMessage) -> String {
    let label = match message.role {
        Role::Interrogator => "🕵️ Interrogator:".bright_blue().bold(),
        _ => "🎭 Participant:".bright_magenta().bold(),
    };
    format!("  {} {}\n", label, message.content)
}

// ---------------------------------------------------------------------------
// Live session
// ---------------------------------------------------------------------------

/// Text for one session update, or `None` when there is nothing to draw.
pub fn session_update(update: &SessionUpdate) -> Option<String> {
    match update {
        SessionUpdate::Started { placeholder } => {
            Some(format!("🤖 {}\n", placeholder.italic().dimmed()))
        }
        SessionUpdate::Message { message, turn } => {
            let mut out = String::new();
            if let Some(n) = turn {
                let separator = format!("── Question {} ──", n);
                out.push_str(&format!("\n{}\n", separator.bold()));
            }
            out.push_str(&session_message(message));
            Some(out)
        }
        SessionUpdate::Finished {
            status: SessionStatus::Completed,
        } => None,
        SessionUpdate::Finished { status } => {
            let text = format!("Session {:?}", status);
            Some(format!("{}\n", text.dimmed()))
        }
        SessionUpdate::Reset => Some(format!("{}\n", "Session reset.".dimmed())),
    }
}

fn session_message(message: &ConversationMessage) -> String {
    let content = &message.content;
    match &message.role {
        Role::Interrogator => format!("{} {}\n", "🕵️".bright_blue(), content),
        Role::Participant | Role::Other(_) => format!("{} {}\n", "🎭".bright_magenta(), content),
        Role::Judgment => judgment_block(content),
        Role::SystemError if content == CONNECTION_ERROR_MESSAGE => format!(
            "🔌 {}\n   {}\n",
            content.bright_red().bold(),
            CONNECTION_HINT.dimmed()
        ),
        Role::SystemError => format!(
            "❌ {}\n   {}\n",
            content.bright_red().bold(),
            API_HINT.dimmed()
        ),
    }
}

/// The closing judgment, with a celebration when the AI was caught.
pub fn judgment_block(judgment: &str) -> String {
    let heading = "Final Judgment".bold().underline();
    let mut out = format!("\n{}\n{}\n", heading, judgment);
    if is_ai_verdict(judgment) {
        out.push_str(&format!("\n{}\n", CELEBRATION.bright_yellow().bold()));
    }
    out
}

// ---------------------------------------------------------------------------
// Model picker
// ---------------------------------------------------------------------------

/// The filtered candidate list of a select widget, marking the selection
/// with `*` and the highlight with `>`.
pub fn select_rows(select: &SearchableSelect) -> String {
    let rows = select.rows();
    if rows.is_empty() {
        return format!("  {}\n", NO_RESULTS_PLACEHOLDER.dimmed());
    }
    let mut out = String::new();
    for row in rows {
        let marker = match (row.highlighted, row.selected) {
            (true, _) => ">",
            (false, true) => "*",
            (false, false) => " ",
        };
        let value = row.option.value.dimmed();
        let line = format!("{} {:<40} {}", marker, row.option.text, value);
        if row.highlighted {
            out.push_str(&format!("{}\n", line.reversed()));
        } else {
            out.push_str(&format!("{}\n", line));
        }
    }
    out
}
