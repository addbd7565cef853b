//! Prompt construction for the answer model
//!
//! The model is held to a closed context: it may only use what the transcript
//! says, and must reply with the sentinel when the transcript does not answer
//! the question. The sentinel text is part of the product contract; answers
//! equal to it render as "no answer" in the dashboard.

/// Exact reply the model must give when the transcript holds no answer.
pub const NO_ANSWER_SENTINEL: &str = "No clear answer available from the transcription.";

pub fn system_prompt() -> String {
    format!(
        "You are an assistant that answers questions about phone call transcriptions. \
         Answer using only information stated in the transcription. \
         Be concise and factual. \
         If the transcription does not contain enough information to answer the question, \
         reply with exactly: {NO_ANSWER_SENTINEL}"
    )
}

pub fn user_prompt(transcript: &str, question: &str) -> String {
    format!("Transcription:\n{transcript}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_carries_sentinel_verbatim() {
        assert!(system_prompt().contains(NO_ANSWER_SENTINEL));
    }

    #[test]
    fn test_user_prompt_embeds_both_parts() {
        let prompt = user_prompt("We agreed on $50 per month.", "What price was quoted?");
        assert!(prompt.contains("We agreed on $50 per month."));
        assert!(prompt.contains("Question: What price was quoted?"));
    }
}
