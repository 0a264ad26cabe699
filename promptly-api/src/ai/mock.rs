//! Deterministic mock AI service.
//!
//! Returns fixed canonical payloads with no network access and no
//! branching on input. Used for development without provider credentials
//! and for shape-level tests. Every payload satisfies the same structural
//! invariants as the provider-backed service: the five fixed dimensions
//! are always populated and labels are derived from the overall score.

use async_trait::async_trait;

use promptly_common::Result;

use super::{
    AiService, Candidate, CandidateEvaluation, DimensionNotes, DimensionScores, Evaluation, Label,
    PromptSuggestionSet, Revision, UserProfile,
};

/// Mock AI service with canonical example payloads.
pub struct MockAiService;

fn candidate(text: &str, scores: DimensionScores, explanations: DimensionNotes) -> Candidate {
    let overall_score = scores.weighted_overall();
    Candidate {
        text: text.to_string(),
        scores,
        explanations,
        overall_score,
        label: Label::for_score(overall_score),
    }
}

fn example_suggestions() -> PromptSuggestionSet {
    PromptSuggestionSet {
        chosen_prompt: "I won't shut up about".to_string(),
        responses: vec![
            candidate(
                "I won't shut up about perfecting kimchi. Yes, it's a personality trait. Wanna try my spicy batch?",
                DimensionScores {
                    personality: 9.0,
                    tone_fit: 9.0,
                    brevity_clarity: 9.0,
                    originality: 9.0,
                    conversation_spark: 9.0,
                },
                DimensionNotes {
                    personality: "Strong personal voice, quirky detail, and food passion create an authentic and memorable impression.".into(),
                    tone_fit: "Confident, flirty, and casually funny, a great fit for Hinge.".into(),
                    brevity_clarity: "Well within the word limit and easy to digest.".into(),
                    originality: "Kimchi fermentation is uncommon and gives this personality.".into(),
                    conversation_spark: "The question at the end naturally invites a reply.".into(),
                },
            ),
            candidate(
                "I won't shut up about crying at Pixar movies like it's my cardio. I blame 'Up' every time.",
                DimensionScores {
                    personality: 8.0,
                    tone_fit: 8.0,
                    brevity_clarity: 9.0,
                    originality: 8.0,
                    conversation_spark: 7.0,
                },
                DimensionNotes {
                    personality: "The Pixar crying confession is relatable and adds emotional honesty with humor.".into(),
                    tone_fit: "Funny and self-aware, great for dating but slightly less flirty.".into(),
                    brevity_clarity: "Short, well-structured, and punchy.".into(),
                    originality: "Pixar tears are familiar but the 'cardio' twist adds flavor.".into(),
                    conversation_spark: "No direct question, but definitely opens room for shared confessions.".into(),
                },
            ),
            candidate(
                "I won't shut up about learning to play tennis in Tokyo with a matcha latte in hand. Dangerous combo?",
                DimensionScores {
                    personality: 8.0,
                    tone_fit: 8.0,
                    brevity_clarity: 8.0,
                    originality: 9.0,
                    conversation_spark: 9.0,
                },
                DimensionNotes {
                    personality: "Travel, tennis, and humor combined create a vivid and interesting personality snapshot.".into(),
                    tone_fit: "Playful with a hint of absurdity, charming and bold.".into(),
                    brevity_clarity: "Slightly longer but still within range and cleanly written.".into(),
                    originality: "Tokyo tennis with matcha is delightfully weird and fresh.".into(),
                    conversation_spark: "The rhetorical question works as a fun hook.".into(),
                },
            ),
        ],
    }
}

fn example_evaluation() -> Evaluation {
    let scores = DimensionScores {
        personality: 8.0,
        tone_fit: 8.0,
        brevity_clarity: 7.0,
        originality: 6.0,
        conversation_spark: 6.0,
    };
    let overall_score = scores.weighted_overall();

    Evaluation {
        scores,
        explanations: DimensionNotes {
            personality: "The response feels warm and genuine, giving a clear glimpse into your lifestyle and priorities like early routines and your pup.".into(),
            tone_fit: "Tone is casual and dating-appropriate: friendly, easygoing, and welcoming.".into(),
            brevity_clarity: "It's slightly wordy but still easy to read and understand.".into(),
            originality: "Coffee runs and beach walks are pleasant but fairly common; it could use a more unique or specific twist.".into(),
            conversation_spark: "It paints a nice picture but doesn't explicitly invite engagement or follow-up.".into(),
        },
        overall_score,
        label: Label::for_score(overall_score),
        suggestions: vec![
            "Add a specific detail, like your favorite beach or your pup's name, to help it stand out.".into(),
            "Try ending with a light question like 'Too much morning energy for you?' to spark a reply.".into(),
        ],
    }
}

const EXAMPLE_REVISED_RESPONSE: &str =
    "I won't shut up about fermenting everything from carrots to miso. Ever made your own pickles?";

const EXAMPLE_IMPROVED_RESPONSE: &str = "I'm looking for someone who's down for sunrise matcha walks on Venice Beach with Max. Too much morning energy for you?";

#[async_trait]
impl AiService for MockAiService {
    async fn generate_prompt_suggestions(
        &self,
        profile: &UserProfile,
    ) -> Result<PromptSuggestionSet> {
        tracing::debug!(gender = %profile.gender, "Mock AI: generating prompt suggestions");
        Ok(example_suggestions())
    }

    async fn generate_suggestions_for_prompt(
        &self,
        _profile: &UserProfile,
        selected_prompt: &str,
    ) -> Result<PromptSuggestionSet> {
        tracing::debug!(prompt = %selected_prompt, "Mock AI: generating for selected prompt");
        let mut set = example_suggestions();
        set.chosen_prompt = selected_prompt.to_string();
        Ok(set)
    }

    async fn revise_prompt_suggestion(
        &self,
        _prompt: &str,
        _response: &str,
        _evaluation: &CandidateEvaluation,
        feedback: &str,
    ) -> Result<Revision> {
        tracing::debug!(feedback = %feedback, "Mock AI: revising suggestion");
        Ok(Revision {
            revised_response: EXAMPLE_REVISED_RESPONSE.to_string(),
        })
    }

    async fn evaluate_user_prompt(&self, _prompt: &str, response: &str) -> Result<Evaluation> {
        tracing::debug!(response = %response, "Mock AI: evaluating user prompt");
        Ok(example_evaluation())
    }

    async fn revise_user_prompt(
        &self,
        _prompt: &str,
        _response: &str,
        _evaluation: &Evaluation,
        suggestions: &[String],
    ) -> Result<Revision> {
        tracing::debug!(suggestions = suggestions.len(), "Mock AI: revising user prompt");
        Ok(Revision {
            revised_response: EXAMPLE_IMPROVED_RESPONSE.to_string(),
        })
    }
}
