//! Prompt templates used by the query engines.

/// Separator placed between chunks inside a context block.
pub(crate) const CONTEXT_SEPARATOR: &str = "\n\n";

/// Render the question-answering prompt over retrieved chunks.
pub(crate) fn question_answer_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}

/// Render one tree-summarize step over a packed group of texts.
pub(crate) fn tree_summarize_prompt(context: &str, query: &str) -> String {
    format!(
        "Context information from multiple sources is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the information from multiple sources and not prior knowledge, answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}
