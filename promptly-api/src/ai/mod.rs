//! AI service abstraction for prompt generation, evaluation, and revision.
//!
//! Two interchangeable implementations behind one trait: a deterministic
//! mock for development and tests, and an OpenAI-backed service that builds
//! natural-language instructions and parses structured JSON back. The
//! implementation is chosen once at startup and injected into router state.

mod mock;
mod openai;

pub use mock::MockAiService;
pub use openai::{OpenAiClient, OpenAiService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use promptly_common::config::AiConfig;
use promptly_common::Result;

// ============================================================================
// Scoring model
// ============================================================================

/// Per-dimension weights for the overall score, in the fixed dimension
/// order: personality, tone_fit, brevity_clarity, originality,
/// conversation_spark.
pub const DIMENSION_WEIGHTS: [f64; 5] = [0.30, 0.20, 0.15, 0.20, 0.15];

/// Scores for the five fixed evaluation dimensions, each in [0, 10].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub personality: f64,
    pub tone_fit: f64,
    #[serde(alias = "brevity_and_clarity")]
    pub brevity_clarity: f64,
    pub originality: f64,
    pub conversation_spark: f64,
}

impl DimensionScores {
    /// Weighted overall score (30/20/15/20/15).
    pub fn weighted_overall(&self) -> f64 {
        let [wp, wt, wb, wo, wc] = DIMENSION_WEIGHTS;
        self.personality * wp
            + self.tone_fit * wt
            + self.brevity_clarity * wb
            + self.originality * wo
            + self.conversation_spark * wc
    }
}

/// One-to-two sentence explanation per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionNotes {
    pub personality: String,
    pub tone_fit: String,
    #[serde(alias = "brevity_and_clarity")]
    pub brevity_clarity: String,
    pub originality: String,
    pub conversation_spark: String,
}

/// Discrete quality band derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    TopTier,
    GreatPotential,
    RoomToGrow,
    NeedsWork,
}

impl Label {
    /// Map an overall score onto its band. Thresholds are fixed:
    /// >= 9.0 Top-Tier, >= 7.5 Great Potential, >= 6.0 Room to Grow,
    /// below 6.0 Needs Work.
    pub fn for_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::TopTier
        } else if score >= 7.5 {
            Self::GreatPotential
        } else if score >= 6.0 {
            Self::RoomToGrow
        } else {
            Self::NeedsWork
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopTier => "Top-Tier",
            Self::GreatPotential => "Great Potential",
            Self::RoomToGrow => "Room to Grow",
            Self::NeedsWork => "Needs Work",
        }
    }

    /// Parse a provider-supplied label. The provider sometimes prefixes
    /// the band name with an emoji, so match on containment.
    fn parse_lenient(s: &str) -> Option<Self> {
        if s.contains("Top-Tier") {
            Some(Self::TopTier)
        } else if s.contains("Great Potential") {
            Some(Self::GreatPotential)
        } else if s.contains("Room to Grow") {
            Some(Self::RoomToGrow)
        } else if s.contains("Needs Work") {
            Some(Self::NeedsWork)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_lenient(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized label: {s}")))
    }
}

// ============================================================================
// Request/response types
// ============================================================================

/// Profile fields used as template input for prompt generation.
/// Presence-validated only; never persisted by the AI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub gender: String,
    pub target_gender: String,
    pub tones: Vec<String>,
    pub interests: Vec<String>,
    pub specific_love: String,
}

/// One generated answer plus its self-evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// The answer text (the provider sometimes labels this `response`)
    #[serde(alias = "response")]
    pub text: String,
    pub scores: DimensionScores,
    #[serde(alias = "explanation")]
    pub explanations: DimensionNotes,
    pub overall_score: f64,
    pub label: Label,
}

/// A chosen prompt topic plus exactly three candidate answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSuggestionSet {
    #[serde(rename = "chosenPrompt")]
    pub chosen_prompt: String,
    pub responses: Vec<Candidate>,
}

/// Evaluation of a single user-written answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: DimensionScores,
    #[serde(alias = "explanation")]
    pub explanations: DimensionNotes,
    pub overall_score: f64,
    pub label: Label,
    pub suggestions: Vec<String>,
}

/// The evaluation portion of a candidate, as fed back into suggestion
/// revision. Extra fields (overall score, label) are accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub scores: DimensionScores,
    #[serde(alias = "explanation")]
    pub explanations: DimensionNotes,
}

/// A single rewritten answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    #[serde(rename = "revisedResponse")]
    pub revised_response: String,
}

// ============================================================================
// AiService trait
// ============================================================================

/// Unified interface over the AI implementations.
///
/// All operations are stateless: nothing depends on a prior call beyond
/// what the caller threads through as arguments.
#[async_trait]
pub trait AiService: Send + Sync {
    /// Pick the best prompt topic for the profile, then generate and
    /// self-evaluate three candidate answers for it.
    async fn generate_prompt_suggestions(&self, profile: &UserProfile)
        -> Result<PromptSuggestionSet>;

    /// Same as [`Self::generate_prompt_suggestions`], but the topic is
    /// supplied by the caller instead of chosen by the provider.
    async fn generate_suggestions_for_prompt(
        &self,
        profile: &UserProfile,
        selected_prompt: &str,
    ) -> Result<PromptSuggestionSet>;

    /// Rewrite an AI-generated answer using its evaluation and free-text
    /// user feedback.
    async fn revise_prompt_suggestion(
        &self,
        prompt: &str,
        response: &str,
        evaluation: &CandidateEvaluation,
        feedback: &str,
    ) -> Result<Revision>;

    /// Score a user-written answer across the five fixed dimensions.
    async fn evaluate_user_prompt(&self, prompt: &str, response: &str) -> Result<Evaluation>;

    /// Rewrite a user-written answer using its evaluation and the
    /// improvement suggestions.
    async fn revise_user_prompt(
        &self,
        prompt: &str,
        response: &str,
        evaluation: &Evaluation,
        suggestions: &[String],
    ) -> Result<Revision>;
}

/// Construct the configured AI service implementation.
///
/// Called once at router build; the returned instance is immutable for the
/// process lifetime. `"openai"` selects the provider-backed service,
/// anything else the mock.
pub fn create_service(config: &AiConfig) -> Arc<dyn AiService> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config.openai_api_key.clone().unwrap_or_default();
            Arc::new(OpenAiService::new(api_key, &config.model))
        }
        _ => Arc::new(MockAiService),
    }
}
