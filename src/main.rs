use clap::{CommandFactory, Parser};
use colored::*;
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use turing_battle::cli::{log_filter, Args, Command};
use turing_battle::select::{filter_options, SearchableSelect, SelectOption};
use turing_battle::session::{LiveSessionController, PlayRequest, SessionStatus};
use turing_battle::{render, stream, BattleClient, BattleError, ClientConfig};

const NO_API_KEY: &str = "the server has no OPENROUTER_API_KEY set; battles cannot start";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(args.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    if let Command::Completions { shell } = args.command {
        let mut command = Args::command();
        clap_complete::generate(shell, &mut command, "turing-battle", &mut std::io::stdout());
        return Ok(());
    }

    let config = ClientConfig::load(args.config.as_deref(), args.url.as_deref())?;
    let client = BattleClient::new(config);

    match args.command {
        Command::Play {
            participant,
            interrogator,
            questions,
        } => play(&client, &participant, &interrogator, questions).await?,
        Command::Leaderboard => {
            let board = client.leaderboard().await?;
            print!("{}", render::leaderboard(&board));
        }
        Command::Battles { limit } => {
            let mut battles = client.battles().await?;
            if let Some(limit) = limit {
                battles.truncate(limit);
            }
            print!("{}", render::battle_cards(&battles));
        }
        Command::Battle { run_id } => {
            let battle = client.battle(&run_id).await?;
            print!("{}", render::battle_detail(&battle));
        }
        Command::Models { search } => {
            let options = model_options(&client).await?;
            let shown = match search.as_deref() {
                Some(query) => filter_options(&options, query),
                None => options,
            };
            let select = SearchableSelect::with_options(shown);
            print!("{}", render::select_rows(&select));
        }
        Command::CheckKey => {
            if client.api_key_status().await?.api_key_set {
                println!("{}", "API key is configured.".bright_green());
            } else {
                println!("{}", NO_API_KEY.bright_red());
            }
        }
        Command::Completions { .. } => {}
    }

    Ok(())
}

async fn model_options(client: &BattleClient) -> Result<Vec<SelectOption>, BattleError> {
    let models = client.models().await?;
    Ok(models.into_iter().map(Into::into).collect())
}

async fn play(
    client: &BattleClient,
    participant: &str,
    interrogator: &str,
    questions: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    match client.api_key_status().await {
        Ok(status) if !status.api_key_set => {
            return Err(NO_API_KEY.into());
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not check the server API key"),
    }

    let options = model_options(client).await?;
    let participant = pick_model("participant", participant, &options)?;
    let interrogator = pick_model("interrogator", interrogator, &options)?;
    let request = PlayRequest::new(participant, interrogator, questions)?;

    println!(
        "{} 🎭 {} vs 🕵️ {} ({} questions)",
        "Battle:".bold(),
        request.participant_model,
        request.interrogator_model,
        request.num_questions
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let view = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            if let Some(text) = render::session_update(&update) {
                print!("{}", text);
            }
        }
    });

    let mut controller = LiveSessionController::with_updates(tx);
    let transport = client.play_transport();
    // Open failures are already recorded in the session as a system error.
    if let Ok(mut signals) = controller.start(&request, &transport) {
        let interrupted = tokio::select! {
            _ = stream::pump(&mut signals, &mut controller) => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            controller.reset();
        }
    }

    let status = controller.status();
    drop(controller);
    let _ = view.await;

    match status {
        SessionStatus::Completed | SessionStatus::Idle => Ok(()),
        _ => Err("battle did not complete".into()),
    }
}

fn pick_model(role: &str, query: &str, options: &[SelectOption]) -> Result<String, BattleError> {
    let mut select = SearchableSelect::with_options(options.to_vec());
    select.resolve(query).map_err(|_| {
        BattleError::Validation(format!(
            "no {} model matches '{}'; run `turing-battle models` to list them",
            role, query
        ))
    })
}
