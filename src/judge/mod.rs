mod openrouter;

use crate::types::PlayerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use openrouter::OpenRouterProvider;

/// Result type for judging operations
pub type JudgeResult<T> = Result<T, JudgeError>;

/// Errors that can occur while judging a round
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Response parsing failed: {0}")]
    Parse(String),

    #[error("Judgment named winner '{0}' who has no submission this round")]
    UnknownWinner(PlayerId),
}

/// A player's photo entry for one round
#[derive(Debug, Clone)]
pub struct Submission {
    pub player_id: PlayerId,
    pub image_base64: String,
}

/// Per-image scores on 0-10 scales
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisScores {
    /// How well the photo solves the riddle
    #[serde(rename = "match")]
    pub match_score: u8,
    /// Literal interpretations score low, lateral ones high
    pub creativity: u8,
    /// Framing, composition, drama
    pub aesthetic: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFlags {
    /// Screenshot, stock photo, or otherwise fake-looking
    pub is_suspicious: bool,
    /// Analysis confidence is low
    pub is_uncertain: bool,
}

/// Vision analysis of a single photo submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoAnalysis {
    pub description: String,
    pub reasoning: String,
    pub scores: AnalysisScores,
    pub flags: AnalysisFlags,
    /// Short two-word tag describing the photo vibe
    pub vibe_tag: String,
}

impl PhotoAnalysis {
    /// Check that scores are on the 0-10 scale the contract promises
    pub fn validate(&self) -> Result<(), String> {
        let AnalysisScores {
            match_score,
            creativity,
            aesthetic,
        } = self.scores;
        for (name, value) in [
            ("match", match_score),
            ("creativity", creativity),
            ("aesthetic", aesthetic),
        ] {
            if value > 10 {
                return Err(format!("{} score {} is out of range 0-10", name, value));
            }
        }
        Ok(())
    }
}

/// A submission paired with its completed analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedSubmission {
    pub player_id: PlayerId,
    pub analysis: PhotoAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardEntry {
    /// Rank 1 is the highest round-local score
    pub rank: u32,
    pub player_id: PlayerId,
    /// Points for this round only
    pub score: u32,
}

/// Winner selection and full round scoreboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    pub grand_winner_id: PlayerId,
    pub grand_winner_rationale: String,
    pub troll_winner_id: PlayerId,
    pub troll_winner_rationale: String,
    pub scoreboard: Vec<ScoreboardEntry>,
}

/// Immutable result of judging one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub riddle: String,
    pub submissions: Vec<AnalyzedSubmission>,
    pub judgment: Judgment,
    pub grand_winner_announcement: String,
    pub troll_winner_announcement: String,
}

/// The three external judging capabilities. Each call is a single
/// request/response unit; retries, if any, belong to the implementation.
#[async_trait]
pub trait StageProvider: Send + Sync {
    /// Analyze one photo against the riddle
    async fn analyze(&self, riddle: &str, image_base64: &str) -> JudgeResult<PhotoAnalysis>;

    /// Pick winners and produce the scoreboard from the full set of
    /// analyses. Never sees raw images.
    async fn judge(&self, riddle: &str, entries: &[AnalyzedSubmission]) -> JudgeResult<Judgment>;

    /// One celebratory line for a distinguished winner
    async fn narrate(&self, riddle: &str, winner_id: &str, rationale: &str)
        -> JudgeResult<String>;
}

/// Run the full judging pipeline for one round.
///
/// Analysis calls fan out concurrently and must all succeed before the
/// judgment runs; a partial evidence set would bias the judge. The two
/// narration calls race freely. The caller owns score application.
pub async fn judge_round(
    stages: &dyn StageProvider,
    riddle: &str,
    submissions: &[Submission],
) -> JudgeResult<RoundOutcome> {
    // Stage 1: analyze every submission in parallel
    let analyzed = futures::future::try_join_all(submissions.iter().map(|sub| async {
        let analysis = stages.analyze(riddle, &sub.image_base64).await?;
        Ok::<_, JudgeError>(AnalyzedSubmission {
            player_id: sub.player_id.clone(),
            analysis,
        })
    }))
    .await?;

    // Stage 2: a single judgment over all analyses
    let judgment = stages.judge(riddle, &analyzed).await?;

    // Both winner ids must resolve to an actual submission; anything
    // else is a contract violation, not a soft failure
    for winner_id in [&judgment.grand_winner_id, &judgment.troll_winner_id] {
        if !submissions.iter().any(|s| &s.player_id == winner_id) {
            return Err(JudgeError::UnknownWinner(winner_id.clone()));
        }
    }

    // Stage 3: narrate both winners in parallel
    let (grand_winner_announcement, troll_winner_announcement) = tokio::try_join!(
        stages.narrate(
            riddle,
            &judgment.grand_winner_id,
            &judgment.grand_winner_rationale,
        ),
        stages.narrate(
            riddle,
            &judgment.troll_winner_id,
            &judgment.troll_winner_rationale,
        ),
    )?;

    Ok(RoundOutcome {
        riddle: riddle.to_string(),
        submissions: analyzed,
        judgment,
        grand_winner_announcement,
        troll_winner_announcement,
    })
}

/// Configuration for the judging stages
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// OpenRouter API key
    pub api_key: Option<String>,
    /// Vision model analyzing individual photos
    pub scout_model: String,
    /// Reasoning model selecting winners
    pub council_model: String,
    /// Model writing winner announcements
    pub bard_model: String,
    /// Bound on each stage call; elapsing counts as a stage failure
    pub timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            scout_model: "google/gemini-3-flash-preview".to_string(),
            council_model: "anthropic/claude-sonnet-4.5".to_string(),
            bard_model: "google/gemini-3-pro-preview".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl JudgeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_key: env_nonempty("OPENROUTER_API_KEY"),
            scout_model: env_nonempty("OPENROUTER_SCOUT_MODEL").unwrap_or(defaults.scout_model),
            council_model: env_nonempty("OPENROUTER_COUNCIL_MODEL")
                .unwrap_or(defaults.council_model),
            bard_model: env_nonempty("OPENROUTER_BARD_MODEL").unwrap_or(defaults.bard_model),
            timeout: env_nonempty("JUDGE_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Build the OpenRouter-backed stage provider
    pub fn build_provider(&self) -> JudgeResult<OpenRouterProvider> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            JudgeError::Config("No OpenRouter API key. Set OPENROUTER_API_KEY".to_string())
        })?;
        Ok(OpenRouterProvider::new(api_key, self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn analysis(match_score: u8) -> PhotoAnalysis {
        PhotoAnalysis {
            description: "a battered film camera on a shelf".to_string(),
            reasoning: "cameras hold memories without a brain".to_string(),
            scores: AnalysisScores {
                match_score,
                creativity: 6,
                aesthetic: 5,
            },
            flags: AnalysisFlags {
                is_suspicious: false,
                is_uncertain: false,
            },
            vibe_tag: "dusty nostalgia".to_string(),
        }
    }

    fn submission(player_id: &str) -> Submission {
        Submission {
            player_id: player_id.to_string(),
            image_base64: "aGVsbG8=".to_string(),
        }
    }

    /// Scripted stage provider for pipeline tests
    struct ScriptedStages {
        fail_analysis: bool,
        fail_judgment: bool,
        grand_winner: String,
        troll_winner: String,
        judged_entries: AtomicUsize,
        narrations: AtomicUsize,
    }

    impl ScriptedStages {
        fn picking(grand: &str, troll: &str) -> Self {
            Self {
                fail_analysis: false,
                fail_judgment: false,
                grand_winner: grand.to_string(),
                troll_winner: troll.to_string(),
                judged_entries: AtomicUsize::new(0),
                narrations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StageProvider for ScriptedStages {
        async fn analyze(&self, _riddle: &str, _image: &str) -> JudgeResult<PhotoAnalysis> {
            if self.fail_analysis {
                return Err(JudgeError::Api("scout unreachable".to_string()));
            }
            Ok(analysis(8))
        }

        async fn judge(
            &self,
            _riddle: &str,
            entries: &[AnalyzedSubmission],
        ) -> JudgeResult<Judgment> {
            if self.fail_judgment {
                return Err(JudgeError::Api("council unreachable".to_string()));
            }
            self.judged_entries.store(entries.len(), Ordering::SeqCst);
            Ok(Judgment {
                grand_winner_id: self.grand_winner.clone(),
                grand_winner_rationale: "highest total".to_string(),
                troll_winner_id: self.troll_winner.clone(),
                troll_winner_rationale: "weirdest take".to_string(),
                scoreboard: entries
                    .iter()
                    .enumerate()
                    .map(|(i, e)| ScoreboardEntry {
                        rank: i as u32 + 1,
                        player_id: e.player_id.clone(),
                        score: 10 - i as u32,
                    })
                    .collect(),
            })
        }

        async fn narrate(
            &self,
            _riddle: &str,
            winner_id: &str,
            _rationale: &str,
        ) -> JudgeResult<String> {
            self.narrations.fetch_add(1, Ordering::SeqCst);
            Ok(format!("All hail {}", winner_id))
        }
    }

    #[tokio::test]
    async fn test_pipeline_produces_full_outcome() {
        let stages = ScriptedStages::picking("p1", "p2");
        let submissions = vec![submission("p1"), submission("p2"), submission("p3")];

        let outcome = judge_round(&stages, "Find a tiny sun", &submissions)
            .await
            .unwrap();

        assert_eq!(outcome.riddle, "Find a tiny sun");
        assert_eq!(outcome.submissions.len(), 3);
        assert_eq!(outcome.judgment.grand_winner_id, "p1");
        assert_eq!(outcome.grand_winner_announcement, "All hail p1");
        assert_eq!(outcome.troll_winner_announcement, "All hail p2");
        assert_eq!(stages.narrations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_judgment_sees_every_analysis() {
        let stages = ScriptedStages::picking("p1", "p2");
        let submissions = vec![submission("p1"), submission("p2"), submission("p3")];

        judge_round(&stages, "riddle", &submissions).await.unwrap();

        assert_eq!(stages.judged_entries.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_analysis_failure_fails_the_round() {
        let mut stages = ScriptedStages::picking("p1", "p2");
        stages.fail_analysis = true;
        let submissions = vec![submission("p1"), submission("p2")];

        let result = judge_round(&stages, "riddle", &submissions).await;

        assert!(matches!(result, Err(JudgeError::Api(_))));
        // Nothing downstream of the failed fan-out ran
        assert_eq!(stages.judged_entries.load(Ordering::SeqCst), 0);
        assert_eq!(stages.narrations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_judgment_failure_fails_the_round() {
        let mut stages = ScriptedStages::picking("p1", "p2");
        stages.fail_judgment = true;
        let submissions = vec![submission("p1")];

        let result = judge_round(&stages, "riddle", &submissions).await;

        assert!(matches!(result, Err(JudgeError::Api(_))));
        assert_eq!(stages.narrations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_winner_id_is_fatal() {
        let stages = ScriptedStages::picking("ghost", "p2");
        let submissions = vec![submission("p1"), submission("p2")];

        let result = judge_round(&stages, "riddle", &submissions).await;

        match result {
            Err(JudgeError::UnknownWinner(id)) => assert_eq!(id, "ghost"),
            other => panic!("Expected UnknownWinner, got {:?}", other.map(|_| ())),
        }
        // Winners are resolved before any narration is requested
        assert_eq!(stages.narrations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_analysis_score_validation() {
        let mut good = analysis(10);
        assert!(good.validate().is_ok());

        good.scores.creativity = 11;
        let err = good.validate().unwrap_err();
        assert!(err.contains("creativity"));
    }

    #[test]
    fn test_default_config() {
        let config = JudgeConfig::default();
        assert_eq!(config.council_model, "anthropic/claude-sonnet-4.5");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        std::env::set_var("OPENROUTER_API_KEY", "sk-or-test");
        std::env::set_var("OPENROUTER_SCOUT_MODEL", "test/scout");
        std::env::set_var("JUDGE_TIMEOUT", "5");

        let config = JudgeConfig::from_env();
        assert_eq!(config.api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.scout_model, "test/scout");
        assert_eq!(config.timeout, Duration::from_secs(5));

        std::env::remove_var("OPENROUTER_API_KEY");
        std::env::remove_var("OPENROUTER_SCOUT_MODEL");
        std::env::remove_var("JUDGE_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_build_provider_requires_api_key() {
        std::env::remove_var("OPENROUTER_API_KEY");
        let config = JudgeConfig::from_env();
        assert!(matches!(
            config.build_provider(),
            Err(JudgeError::Config(_))
        ));
    }
}
