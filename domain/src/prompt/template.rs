//! Prompt templates for the council flow

use crate::core::member::MemberId;

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for every member call
    pub fn member_system() -> &'static str {
        r#"You are one member of a council of independent experts answering the same question.
Give your own best answer. Be accurate, concise and self-contained.
Do not mention the council or other experts in your answer."#
    }

    /// Prompt for round 0
    pub fn initial_query(question: &str) -> String {
        format!(
            r#"Please answer the following question:

{}

Provide a clear, well-structured response."#,
            question
        )
    }

    /// Prompt for a negotiation round.
    ///
    /// Always shows the member its own previous answer; peer answers are
    /// included only when given.
    pub fn negotiation_prompt(
        question: &str,
        round: u32,
        own_answer: Option<&str>,
        peers: &[(String, String)],
    ) -> String {
        let mut prompt = format!(
            r#"Original question: {}

The council has not converged yet. This is negotiation round {}.
"#,
            question, round
        );

        match own_answer {
            Some(answer) => {
                prompt.push_str(&format!("\nYour previous answer:\n---\n{}\n---\n", answer));
            }
            None => {
                prompt.push_str("\nYou did not provide an answer in the previous round.\n");
            }
        }

        if !peers.is_empty() {
            prompt.push_str("\nAnswers from other council members:\n");
            for (member, content) in peers {
                prompt.push_str(&format!("\n--- {} ---\n{}\n", member, content));
            }
        }

        prompt.push_str(
            r#"
Reconsider the question. Keep what you are confident is correct, fix what is not,
and give your complete revised answer."#,
        );

        prompt
    }

    /// System prompt for the moderator
    pub fn synthesis_system() -> &'static str {
        r#"You are the moderator of an expert council that has reached agreement.
Compose one final answer from the agreeing answers.
Cite the members you draw on by writing their id in square brackets, e.g. [member-id].
Do not add claims that none of the members made."#
    }

    /// Prompt asking the moderator to compose the final answer
    pub fn moderator_prompt(question: &str, answers: &[(String, String)]) -> String {
        let mut prompt = format!(
            r#"Original question: {}

Agreeing council answers:
"#,
            question
        );

        for (member, content) in answers {
            prompt.push_str(&format!("\n[{}]\n{}\n", member, content));
        }

        prompt.push_str(
            r#"
Write the final answer. Cite every contributing member as [member-id] next to the
points taken from them."#,
        );

        prompt
    }
}

/// Members from `candidates` cited as `[id]` in `text`, in candidate order
pub fn extract_citations(text: &str, candidates: &[MemberId]) -> Vec<MemberId> {
    candidates
        .iter()
        .filter(|m| text.contains(&format!("[{}]", m.as_str())))
        .cloned()
        .collect()
}
