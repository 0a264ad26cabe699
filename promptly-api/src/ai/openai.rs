//! OpenAI-backed AI service.
//!
//! A thin client around the chat-completions endpoint plus the five
//! instruction templates. No retry, no caching, no timeout override beyond
//! the client default; one outbound call per invocation.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use async_trait::async_trait;
use promptly_common::{Error, Result};

use super::{
    AiService, Candidate, CandidateEvaluation, Evaluation, PromptSuggestionSet, Revision,
    UserProfile,
};

/// The fixed prompt topics the provider chooses from.
pub const PROMPT_OPTIONS: [&str; 11] = [
    "Dating me is like",
    "My simple pleasures",
    "The way to win me over is",
    "Typical Sunday",
    "I won't shut up about",
    "If loving this is wrong, I don't want to be right",
    "Teach me something about",
    "I'll pick the topic if you start the conversation",
    "Together, we could",
    "I'll fall for you if",
    "We'll get along if",
];

// ============================================================================
// Provider client
// ============================================================================

/// Client for the chat-completions endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, "https://api.openai.com")
    }

    /// Create with a custom base URL (for compatible APIs and tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// One chat-completion call.
    ///
    /// `system` carries the full instruction; `user` may be empty when the
    /// operation relies on the system instruction alone. With `json_mode`
    /// the provider is asked for a machine-parseable JSON object.
    pub async fn call(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        debug_assert!(!system.is_empty(), "system instruction must be non-empty");

        let url = format!("{}/v1/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
            response_format: json_mode.then(|| json!({ "type": "json_object" })),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Provider request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "Provider API error ({}): {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Failed to parse provider response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(Error::upstream("No content received from provider"));
        }

        Ok(content)
    }

    /// Structured-output call: the response content must parse as `T`.
    pub async fn call_json<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T> {
        let content = self.call(system, user, true).await?;
        serde_json::from_str(&content)
            .map_err(|e| Error::upstream(format!("Malformed structured provider output: {}", e)))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Parse target for the generation call.
#[derive(Debug, Deserialize)]
struct GeneratedResponses {
    responses: Vec<Candidate>,
}

// ============================================================================
// Service
// ============================================================================

/// Provider-backed AI service.
pub struct OpenAiService {
    client: OpenAiClient,
}

impl OpenAiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAiClient::new(api_key, model),
        }
    }

    /// For tests against a stand-in endpoint.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Generate and self-evaluate three answers for a known topic.
    async fn generate_for(
        &self,
        profile: &UserProfile,
        chosen_prompt: &str,
    ) -> Result<PromptSuggestionSet> {
        let instruction = generate_responses_instruction(profile, chosen_prompt);
        let generated: GeneratedResponses = self.client.call_json(&instruction, "").await?;

        if generated.responses.len() != 3 {
            return Err(Error::upstream(format!(
                "Expected 3 generated responses, got {}",
                generated.responses.len()
            )));
        }

        Ok(PromptSuggestionSet {
            chosen_prompt: chosen_prompt.to_string(),
            responses: generated.responses,
        })
    }
}

#[async_trait]
impl AiService for OpenAiService {
    async fn generate_prompt_suggestions(
        &self,
        profile: &UserProfile,
    ) -> Result<PromptSuggestionSet> {
        // Step 1: choose the prompt topic. Step 2 depends on this output,
        // so the calls are strictly sequential.
        let instruction = choose_prompt_instruction(profile);
        let profile_json = serde_json::to_string(profile)?;
        let chosen = self.client.call(&instruction, &profile_json, false).await?;
        let chosen = chosen.trim();

        self.generate_for(profile, chosen).await
    }

    async fn generate_suggestions_for_prompt(
        &self,
        profile: &UserProfile,
        selected_prompt: &str,
    ) -> Result<PromptSuggestionSet> {
        self.generate_for(profile, selected_prompt).await
    }

    async fn revise_prompt_suggestion(
        &self,
        prompt: &str,
        response: &str,
        evaluation: &CandidateEvaluation,
        feedback: &str,
    ) -> Result<Revision> {
        let instruction = revise_suggestion_instruction(prompt, response, evaluation, feedback);
        let revised = self.client.call(&instruction, "", false).await?;

        Ok(Revision {
            revised_response: revised.trim().to_string(),
        })
    }

    async fn evaluate_user_prompt(&self, prompt: &str, response: &str) -> Result<Evaluation> {
        let instruction = evaluate_instruction(prompt, response);
        self.client.call_json(&instruction, "").await
    }

    async fn revise_user_prompt(
        &self,
        prompt: &str,
        response: &str,
        evaluation: &Evaluation,
        suggestions: &[String],
    ) -> Result<Revision> {
        let instruction = revise_user_instruction(prompt, response, evaluation, suggestions);
        let revised = self.client.call(&instruction, "", false).await?;

        Ok(Revision {
            revised_response: revised.trim().to_string(),
        })
    }
}

// ============================================================================
// Instruction templates
// ============================================================================

fn choose_prompt_instruction(profile: &UserProfile) -> String {
    let options = PROMPT_OPTIONS
        .iter()
        .map(|p| format!("- {}", p))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an AI dating assistant that helps users create standout responses for their dating profile on apps like Hinge. Your first job is to choose one prompt from the following Prompt options that best matches the user's input, including tone preferences, interests, and something specific that the user loves.

Use the following input:
- Dating app: Hinge
- User's gender: {gender}
- Target gender: {target}
- Desired tones: {tones}
- User interests: {interests}
- Something specific the user loves: {love}

Prompt options:
{options}

Pick a prompt that gives the user the best opportunity to stand out on dating apps like Hinge. Return ONLY the chosen prompt."#,
        gender = profile.gender,
        target = profile.target_gender,
        tones = profile.tones.join(", "),
        interests = profile.interests.join(", "),
        love = profile.specific_love,
        options = options,
    )
}

fn generate_responses_instruction(profile: &UserProfile, chosen_prompt: &str) -> String {
    let tones = profile.tones.join(", ");
    let interests = profile.interests.join(", ");

    format!(
        r#"You are an AI dating assistant who generates and evaluates creative, personalized answers to dating app prompts (like Hinge). Your job is to generate 3 unique responses to this prompt: "{prompt}", and then score each response using expert evaluation criteria.

### Step 1: Generate 3 responses
Use the following input:
- User's gender: {gender}
- Target gender: {target}
- Dating app: Hinge
- Desired tones: {tones}
- User interests: {interests}, {love}

Each response should:
- Be short and snappy, ideally under 20 words
- Use a different tone for each: {tones}
- Feel playful, personal, and confident—not generic or robotic
- Incorporate at least one of these personal details or interests: {interests}, or {love}
- Include a natural, casual follow-up question at the end of one response to invite conversation
- It should sound spontaneous, not scripted or awkward
- Avoid sounding like I'm trying too hard—keep it cool and relaxed
- Use humor or irony if it fits the tone, but keep it light and approachable
- Avoid clichés and typical AI phrasing (e.g., no em dashes, no overly formal, no robotic phrasing, no wordy language)
- Use American English and keep it appropriate for a modern dating app
The goal is to make users feel effortlessly interesting, like someone worth messaging back.

### Step 2: Evaluate each response
For every response you write, score it across 5 categories:
1. Personality (30%) – Human, emotionally engaging, not generic
2. Tone Fit (20%) – Matches intent, dating-appropriate
3. Brevity & Clarity (15%) – Concise and easy to read
4. Originality (20%) – Not a cliché, shows voice
5. Conversation Spark (15%) – Invites response

Return for each:
- The response itself
- 5 scores (0–10) under keys: personality, tone_fit, brevity_clarity, originality, conversation_spark
- 1–2 sentence explanation per category under the same keys
- Calculated weighted average (0–10) as overall_score
- Label:
  🔥 Top-Tier (9–10), 🟢 Great Potential (7.5–8.9), 🟡 Room to Grow (6–7.4), 🔴 Needs Work (<6)

Respond in JSON format only, with an array of responses and their evaluations. The root object must have a key named "responses" which contains the array.
For example: {{ "responses": [ {{ "response": "...", "scores": {{...}}, "explanations": {{...}}, "overall_score": 0.0, "label": "..." }}, ... ] }}"#,
        prompt = chosen_prompt,
        gender = profile.gender,
        target = profile.target_gender,
        tones = tones,
        interests = interests,
        love = profile.specific_love,
    )
}

fn revise_suggestion_instruction(
    prompt: &str,
    response: &str,
    evaluation: &CandidateEvaluation,
    feedback: &str,
) -> String {
    format!(
        r#"You are an AI dating assistant who generates and evaluates creative, personalized answers to dating app prompts (like Hinge). Your job is to generate 3 unique responses to this prompt: "{prompt}", and then score each response using expert evaluation criteria. Now, 3 responses have been generated, and the user is choosing a response to improve based on user input feedback. Your job is to revise the response using the feedback and suggestions provided.

You will receive:
- A Hinge profile prompt
- A user chosen AI-generated response to that prompt
- An evaluation summary across 5 scoring categories of the chosen response
- Suggestions for improvement for the chosen response

### Input:
- Prompt: "{prompt}"
- User chosen AI-Generated Response: "{response}"
- Evaluation Summary of this response:
  - Personality Score: {p_score} – {p_note}
  - Tone Fit Score: {t_score} – {t_note}
  - Brevity & Clarity Score: {b_score} – {b_note}
  - Originality Score: {o_score} – {o_note}
  - Conversation Spark Score: {c_score} – {c_note}
- Suggestions for improvement from user: "{feedback}"

### Instructions:
Rewrite the response based on user's feedback. Follow these guidelines:
- Be short and snappy, ideally under 20 words
- Feel playful, personal, and confident—not generic or robotic
- Option to include a natural, casual follow-up question at the end of one response to invite conversation
- It should sound spontaneous, not scripted or awkward
- Avoid sounding like I'm trying too hard—keep it cool and relaxed
- Use humor or irony if it fits the tone, but keep it light and approachable
- Avoid clichés and typical AI phrasing (e.g., no em dashes, no overly formal, no robotic phrasing, no wordy language)
- Use American English and keep it appropriate for a modern dating app
The goal is to make users feel effortlessly interesting, like someone worth messaging back.

Return only the **revised response**. No additional commentary or formatting."#,
        prompt = prompt,
        response = response,
        p_score = evaluation.scores.personality,
        p_note = evaluation.explanations.personality,
        t_score = evaluation.scores.tone_fit,
        t_note = evaluation.explanations.tone_fit,
        b_score = evaluation.scores.brevity_clarity,
        b_note = evaluation.explanations.brevity_clarity,
        o_score = evaluation.scores.originality,
        o_note = evaluation.explanations.originality,
        c_score = evaluation.scores.conversation_spark,
        c_note = evaluation.explanations.conversation_spark,
        feedback = feedback,
    )
}

fn evaluate_instruction(prompt: &str, response: &str) -> String {
    format!(
        r#"You are an expert at evaluating dating profile's prompt responses for apps like Hinge. This is the user-written answer to their dating prompt:
- Prompt: "{prompt}"
- Original Response: "{response}"
Your job is to:
1. Score the response across 5 key categories
2. Briefly explain each score
3. Calculate a weighted overall score
4. Assign a UX-friendly label based on the final score
5. Provide 1–2 concrete suggestions to help improve the response

### Scoring Criteria (each 0–10):
1. Personality (30%) – Does the response feel human, emotionally engaging, and specific—not generic?
2. Tone Fit (20%) – Is the tone appropriate for dating? (Playful, flirty, casual, confident, or sincere as context allows)
3. Brevity & Clarity (15%) – Is it concise and easy to read (ideally under 20 words)?
4. Originality (20%) – Does it avoid clichés and sound fresh or unique?
5. Conversation Spark (15%) – Does it invite replies—through curiosity, humor, or a natural follow-up?

### Label (based on overall score):
- 9.0–10.0 → 🔥 Top-Tier
- 7.5–8.9 → 🟢 Great Potential
- 6.0–7.4 → 🟡 Room to Grow
- Below 6.0 → 🔴 Needs Work

### Suggestions:
Give 1–2 short, specific tips to help the user improve their answer. Keep them casual, helpful, and practical.

### Return your response in the following JSON format:
{{
  "scores": {{ "personality": 0, "tone_fit": 0, "brevity_clarity": 0, "originality": 0, "conversation_spark": 0 }},
  "explanations": {{ "personality": "...", "tone_fit": "...", "brevity_clarity": "...", "originality": "...", "conversation_spark": "..." }},
  "overall_score": 0.0,
  "label": "...",
  "suggestions": [ "...", "..." ]
}}"#,
        prompt = prompt,
        response = response,
    )
}

fn revise_user_instruction(
    prompt: &str,
    response: &str,
    evaluation: &Evaluation,
    suggestions: &[String],
) -> String {
    format!(
        r#"You are an AI dating assistant that helps users improve their dating app profile responses (like on Hinge) based on expert evaluation feedback.
The user wrote a response to a Hinge prompt and received an evaluation with scores and suggestions. Your job is to rewrite the response to make it more engaging, personal, and conversation-worthy, using the suggestions provided.

### Input:
- Prompt: "{prompt}"
- Original Response: "{response}"
### Evaluation Summary:
- overall Score: {overall}
- Personality Score: {p_score} – {p_note}
- Tone Fit Score: {t_score} – {t_note}
- Brevity & Clarity Score: {b_score} – {b_note}
- Originality Score: {o_score} – {o_note}
- Conversation Spark Score: {c_score} – {c_note}
### Suggestions for Improvement:
- {suggestions}

### Instructions:
Rewrite the response. Follow these guidelines:
- Apply the suggestions directly
- Be short and snappy, ideally under 20 words
- Keep the tone casual, personal, confident, and dating-appropriate
- Include a **follow-up question** only if it feels natural and playful
- It should sound spontaneous, not scripted or awkward
- Avoid sounding like I'm trying too hard—keep it cool and relaxed
- Use humor or irony if it fits the tone, but keep it light and approachable
- Avoid clichés and typical AI phrasing (e.g., no em dashes, no overly formal, no robotic phrasing, no wordy language)
- Use American English and keep it appropriate for a modern dating app
The goal is to make users feel effortlessly interesting, like someone worth messaging back.

Return only the **improved response**—no extra commentary or formatting."#,
        prompt = prompt,
        response = response,
        overall = evaluation.overall_score,
        p_score = evaluation.scores.personality,
        p_note = evaluation.explanations.personality,
        t_score = evaluation.scores.tone_fit,
        t_note = evaluation.explanations.tone_fit,
        b_score = evaluation.scores.brevity_clarity,
        b_note = evaluation.explanations.brevity_clarity,
        o_score = evaluation.scores.originality,
        o_note = evaluation.explanations.originality,
        c_score = evaluation.scores.conversation_spark,
        c_note = evaluation.explanations.conversation_spark,
        suggestions = suggestions.join("\n- "),
    )
}
