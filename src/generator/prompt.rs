//! Instruction prompt sent to the generator.

/// Wrap a question and schema in the generation instructions.
pub fn build_prompt(question: &str, schema: &str) -> String {
    format!(
        "You are an expert SQL assistant. Generate a correct and simple SQL query strictly based on \
         the user's question and schema provided. Always handle negative conditions explicitly \
         mentioned in the question (e.g., users who have NOT placed orders). Do NOT add extra \
         columns or conditions unless explicitly requested. Question: {}\nSchema: {}\nSQL Query:",
        question, schema
    )
}
