/// Prompt templates for the critic
pub struct CriticPrompts;

impl CriticPrompts {
    /// System prompt fixing the critic's role and its JSON response contract
    pub const SYSTEM_PROMPT: &'static str = r#"You are a meticulous and objective critique assistant.
Your purpose is to evaluate a given text against a set of criteria.
Score every criterion on a scale from 0.0 to 1.0, where 1.0 is a perfect score.
Give meaningful feedback that suggests specific improvements.
Finally, suggest a temperature (a number between 0.0 and 1.0) for the next generation round.
A higher temperature encourages more creative and diverse output, a lower one more focused and predictable text.

Respond ONLY with a single, valid JSON object. Do not add any text before or after it.
The JSON object must have exactly this structure:
{
  "scores": {
    "criterion_1_name": 0.0,
    "criterion_2_name": 0.0
  },
  "feedback": "Detailed feedback and suggestions for improvement.",
  "suggested_temperature": 0.0
}"#;

    /// Build the critique request for one draft
    pub fn build_critique_request(criteria: &[String], draft: &str) -> String {
        format!(
            r#"Please evaluate the following text based on these criteria: {criteria}.

TEXT TO EVALUATE:
---
{draft}
---

Use the criterion names exactly as written above as the keys of "scores".
Remember to respond only with the specified JSON object."#,
            criteria = criteria.join(", "),
            draft = draft,
        )
    }
}

/// Prompt templates for the generator
pub struct GeneratorPrompts;

impl GeneratorPrompts {
    /// Generator system prompt used when the caller supplies none
    pub const DEFAULT_SYSTEM_PROMPT: &'static str = "You are a helpful writing assistant. \
Your task is to generate text based on user requests. \
You will be given a prompt and are expected to produce a high-quality, relevant response. \
In subsequent turns you may receive feedback on your previous output. \
Use this feedback to improve your next response.";

    /// Build the prompt for a round after the first.
    ///
    /// The original request is always restated in full alongside the
    /// previous draft and the critique of it.
    pub fn build_refinement_prompt(
        user_message: &str,
        previous_output: &str,
        feedback: &str,
    ) -> String {
        format!(
            r#"Your previous attempt was not sufficient. Please refine it based on the following feedback.

Original User Request: "{request}"

Previous Output:
---
{previous}
---

Critique and Suggestions for Improvement:
---
{feedback}
---

Please generate a new, improved version of the text that directly addresses the critique."#,
            request = user_message,
            previous = previous_output,
            feedback = feedback,
        )
    }
}
