use super::*;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use serde_json::json;

/// OpenRouter speaks the OpenAI chat API
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

const SCOUT_SYSTEM_PROMPT: &str = r#"You are **The Scout**, a vision-analysis AI for the game [IRL Quests]. Your job is to analyze a photo submission for a scavenger hunt riddle.

**YOUR OBJECTIVES:**
1. **Identify:** What is strictly in the image?
2. **Verify:** Is this a screen, a stock photo, or a fake? (Anti-Cheat).
3. **Score:** Rate on 0-10 scales based on the Rubric below.

**THE RUBRIC:**
- **Riddle Match (0-10):** Does this object solve the riddle? (Be generous with fuzzy logic).
- **Creativity (0-10):** Is this a literal interpretation (low score) or a lateral/weird/funny interpretation (high score)?
- **Aesthetic (0-10):** Is the framing funny, dramatic, or artistic?

**ANTI-CHEAT PROTOCOL:** If the image looks like a screenshot, a Google Images result, or has obvious UI overlays, flag is_suspicious as TRUE. If the image is blurry but clearly an attempt, do not punish—mark it valid."#;

const COUNCIL_SYSTEM_PROMPT: &str = r#"You are the **High Council Judge** of [IRL Quests]. You decide the fate of the players.

**YOUR TASK:** Analyze the entries and select winners. You value cleverness and humor just as much as correctness.

**SELECTION CRITERIA:**
1. **The Grand Winner:** The highest total score (Match + Creativity + Aesthetic). However, if a submission is "Suspicious," they are disqualified immediately.
2. **The Troll/Creative Winner:** The entry with the highest "Creativity" score that *technically* fits the riddle but in a weird way. (If the Grand Winner is also the most creative, pick the runner-up for this category).

**TIE-BREAKER LOGIC:**
1. Highest Creativity.
2. Funniest Vibe Tag.
3. Coin flip."#;

const BARD_SYSTEM_PROMPT: &str = r#"You are the **Voice of the Game** for [IRL Quests]. Your job is to announce the winner with a "One-Liner" that appears on the scoreboard.

**STYLE GUIDE:**
- **Brevity:** Maximum 15 words.
- **Tone:** Punchy, celebratory, slightly sarcastic, or genuinely impressed.
- **Format:** Do not use hashtags."#;

fn scout_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "description": {
                "type": "string",
                "description": "A literal description of visual elements in the image"
            },
            "reasoning": {
                "type": "string",
                "description": "Why this image fits or doesn't fit the riddle"
            },
            "scores": {
                "type": "object",
                "properties": {
                    "match": { "type": "integer", "description": "Riddle match score 0-10", "minimum": 0, "maximum": 10 },
                    "creativity": { "type": "integer", "description": "Creativity score 0-10 (literal=low, lateral/weird=high)", "minimum": 0, "maximum": 10 },
                    "aesthetic": { "type": "integer", "description": "Aesthetic score 0-10 (framing, composition, drama)", "minimum": 0, "maximum": 10 }
                },
                "required": ["match", "creativity", "aesthetic"],
                "additionalProperties": false
            },
            "flags": {
                "type": "object",
                "properties": {
                    "is_suspicious": { "type": "boolean", "description": "True if image appears to be a screenshot, stock photo, or fake" },
                    "is_uncertain": { "type": "boolean", "description": "True if analysis confidence is low" }
                },
                "required": ["is_suspicious", "is_uncertain"],
                "additionalProperties": false
            },
            "vibe_tag": {
                "type": "string",
                "description": "A short 2-word tag describing the photo vibe"
            }
        },
        "required": ["description", "reasoning", "scores", "flags", "vibe_tag"],
        "additionalProperties": false
    })
}

fn council_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "grand_winner_id": { "type": "string", "description": "Player ID of the grand winner" },
            "grand_winner_rationale": { "type": "string", "description": "Why they won (internal logic)" },
            "troll_winner_id": { "type": "string", "description": "Player ID of the chaos/troll winner" },
            "troll_winner_rationale": { "type": "string", "description": "Why they are the chaos lord" },
            "scoreboard": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "rank": { "type": "integer" },
                        "player_id": { "type": "string" },
                        "score": { "type": "integer" }
                    },
                    "required": ["rank", "player_id", "score"],
                    "additionalProperties": false
                }
            }
        },
        "required": [
            "grand_winner_id",
            "grand_winner_rationale",
            "troll_winner_id",
            "troll_winner_rationale",
            "scoreboard"
        ],
        "additionalProperties": false
    })
}

fn bard_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "one_liner": {
                "type": "string",
                "description": "A punchy one-liner announcement, max 15 words"
            }
        },
        "required": ["one_liner"],
        "additionalProperties": false
    })
}

/// Stage provider backed by OpenRouter, one model per stage
pub struct OpenRouterProvider {
    client: Client<OpenAIConfig>,
    config: JudgeConfig,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, config: JudgeConfig) -> Self {
        let client_config = OpenAIConfig::new()
            .with_api_base(OPENROUTER_API_BASE)
            .with_api_key(api_key);

        Self {
            client: Client::with_config(client_config),
            config,
        }
    }

    /// Run one structured-output chat completion and return the raw
    /// JSON content. Every call is bounded by the configured timeout.
    async fn complete_json(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: ChatCompletionRequestUserMessage,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> JudgeResult<String> {
        let system_message: ChatCompletionRequestMessage =
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(|e| JudgeError::Api(e.to_string()))?
                .into();

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages([system_message, user_message.into()])
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: schema_name.to_string(),
                    description: None,
                    schema: Some(schema),
                    strict: Some(true),
                },
            })
            .build()
            .map_err(|e| JudgeError::Api(e.to_string()))?;

        let response = tokio::time::timeout(self.config.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| JudgeError::Timeout(self.config.timeout))?
            .map_err(|e| JudgeError::Api(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| JudgeError::Parse("No content in response".to_string()))
    }
}

#[async_trait]
impl StageProvider for OpenRouterProvider {
    async fn analyze(&self, riddle: &str, image_base64: &str) -> JudgeResult<PhotoAnalysis> {
        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: format!(
                        "**RIDDLE:** \"{}\"\n\nAnalyze the following photo submission:",
                        riddle
                    ),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{}", image_base64),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_message = ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Array(content_parts),
            name: None,
        };

        let content = self
            .complete_json(
                &self.config.scout_model,
                SCOUT_SYSTEM_PROMPT,
                user_message,
                "scout_analysis",
                scout_schema(),
            )
            .await?;

        let analysis: PhotoAnalysis =
            serde_json::from_str(&content).map_err(|e| JudgeError::Parse(e.to_string()))?;
        analysis.validate().map_err(JudgeError::Parse)?;

        Ok(analysis)
    }

    async fn judge(&self, riddle: &str, entries: &[AnalyzedSubmission]) -> JudgeResult<Judgment> {
        // The council sees structured summaries only, never the scout's
        // free-text reasoning and never the images
        let entries_data: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "player_id": e.player_id,
                    "description": e.analysis.description,
                    "scores": e.analysis.scores,
                    "flags": e.analysis.flags,
                    "vibe_tag": e.analysis.vibe_tag,
                })
            })
            .collect();

        let user_message = ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(format!(
                "**RIDDLE:** \"{}\"\n\n**PLAYER SUBMISSIONS:**\n{}",
                riddle,
                serde_json::to_string_pretty(&entries_data)
                    .map_err(|e| JudgeError::Parse(e.to_string()))?,
            )),
            name: None,
        };

        let content = self
            .complete_json(
                &self.config.council_model,
                COUNCIL_SYSTEM_PROMPT,
                user_message,
                "council_judgment",
                council_schema(),
            )
            .await?;

        serde_json::from_str(&content).map_err(|e| JudgeError::Parse(e.to_string()))
    }

    async fn narrate(
        &self,
        riddle: &str,
        winner_id: &str,
        rationale: &str,
    ) -> JudgeResult<String> {
        #[derive(serde::Deserialize)]
        struct BardAnnouncement {
            one_liner: String,
        }

        let user_message = ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(format!(
                "**RIDDLE:** \"{}\"\n**WINNER:** Player {}\n**CONTEXT:** {}\n\nGenerate the one-liner for this winner.",
                riddle, winner_id, rationale,
            )),
            name: None,
        };

        let content = self
            .complete_json(
                &self.config.bard_model,
                BARD_SYSTEM_PROMPT,
                user_message,
                "bard_announcement",
                bard_schema(),
            )
            .await?;

        let announcement: BardAnnouncement =
            serde_json::from_str(&content).map_err(|e| JudgeError::Parse(e.to_string()))?;
        Ok(announcement.one_liner)
    }
}
