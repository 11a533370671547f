use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use irlquests::judge::{self, JudgeConfig, Submission};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const DEMO_RIDDLE: &str = "Find something that can hold water but is not a cup";

/// Judging smoke run: reads every image in a directory, treats each as
/// one player's submission, and runs a full round against OpenRouter.
#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "irlquests=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let uploads_dir = std::env::args().nth(1).unwrap_or_else(|| "uploads".to_string());
    tracing::info!("Reading submissions from {}/", uploads_dir);

    let submissions = match read_submissions(Path::new(&uploads_dir)) {
        Ok(subs) if !subs.is_empty() => subs,
        Ok(_) => {
            tracing::error!("No images found in {}/", uploads_dir);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Failed to read {}/: {}", uploads_dir, e);
            std::process::exit(1);
        }
    };

    let config = JudgeConfig::from_env();
    let provider = match config.build_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Cannot build stage provider: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Judging {} submissions for riddle: {:?}",
        submissions.len(),
        DEMO_RIDDLE
    );

    match judge::judge_round(&provider, DEMO_RIDDLE, &submissions).await {
        Ok(outcome) => {
            for sub in &outcome.submissions {
                tracing::info!(
                    "{}: match {} creativity {} aesthetic {} [{}]",
                    sub.player_id,
                    sub.analysis.scores.match_score,
                    sub.analysis.scores.creativity,
                    sub.analysis.scores.aesthetic,
                    sub.analysis.vibe_tag,
                );
            }
            tracing::info!(
                "Grand winner {}: {}",
                outcome.judgment.grand_winner_id,
                outcome.grand_winner_announcement
            );
            tracing::info!(
                "Troll winner {}: {}",
                outcome.judgment.troll_winner_id,
                outcome.troll_winner_announcement
            );
            for entry in &outcome.judgment.scoreboard {
                tracing::info!("#{} {} ({} pts)", entry.rank, entry.player_id, entry.score);
            }
        }
        Err(e) => {
            tracing::error!("Judging failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Turn each image file in the directory into one player's submission
fn read_submissions(dir: &Path) -> std::io::Result<Vec<Submission>> {
    let mut submissions = Vec::new();

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    for (index, path) in paths.iter().enumerate() {
        let bytes = std::fs::read(path)?;
        submissions.push(Submission {
            player_id: format!("player_{}", index + 1),
            image_base64: STANDARD.encode(&bytes),
        });
    }

    Ok(submissions)
}
