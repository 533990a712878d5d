//! Citation-grounded prompt construction

use crate::retrieval::Chunk;
use serde::{Deserialize, Serialize};

/// A structured prompt: grounding instruction plus numbered context snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedPrompt {
    /// Grounding instruction for the generation step
    pub system: String,
    /// Question followed by the numbered snippets
    pub user: String,
}

/// Resolves a `[n]` marker in generated text back to its source.
///
/// Returned to the caller regardless of what the generation step produces,
/// so a citation index can always be resolved even if the model mis-cites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// 1-based citation index
    pub index: usize,
    pub source_path: String,
    pub doc_id: String,
    pub chunk_index: usize,
}

/// Build the structured prompt and its parallel citation map.
///
/// Citation indices are assigned 1-based in the order the contexts are
/// supplied; this is the only place citation numbering is decided, and the
/// numbering matches the order the snippets appear in the prompt exactly.
pub fn build_prompt(query: &str, contexts: &[Chunk]) -> (GroundedPrompt, Vec<Citation>) {
    let system = "You are a concise, accurate assistant. Answer ONLY from the provided \
                  context snippets. If the answer is not in the snippets, say you don't know. \
                  Add citation markers like [1], [2] immediately after each claim they support."
        .to_string();

    let mut lines = vec![
        "Question:".to_string(),
        query.to_string(),
        String::new(),
        "Context snippets:".to_string(),
    ];

    let mut citations = Vec::with_capacity(contexts.len());
    for (i, context) in contexts.iter().enumerate() {
        let n = i + 1;
        lines.push(format!(
            "[{}] {}\n(Source: {})",
            n,
            context.text.trim(),
            context.source_path
        ));
        citations.push(Citation {
            index: n,
            source_path: context.source_path.clone(),
            doc_id: context.doc_id.clone(),
            chunk_index: context.chunk_index,
        });
    }

    (
        GroundedPrompt {
            system,
            user: lines.join("\n"),
        },
        citations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contexts() -> Vec<Chunk> {
        vec![
            Chunk::new("doc-a", 2, "  Paris is the capital of France.  ", "/d/a.txt"),
            Chunk::new("doc-b", 0, "Berlin is the capital of Germany.", "/d/b.txt"),
        ]
    }

    #[test]
    fn test_numbering_follows_supplied_order() {
        let (prompt, citations) = build_prompt("capitals?", &contexts());

        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].index, 1);
        assert_eq!(citations[0].doc_id, "doc-a");
        assert_eq!(citations[0].chunk_index, 2);
        assert_eq!(citations[1].index, 2);
        assert_eq!(citations[1].doc_id, "doc-b");

        // The snippet order in the prompt matches the citation numbering
        let first = prompt.user.find("[1] Paris").unwrap();
        let second = prompt.user.find("[2] Berlin").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_snippet_text_is_trimmed_and_sourced() {
        let (prompt, _) = build_prompt("capitals?", &contexts());
        assert!(prompt.user.contains("[1] Paris is the capital of France."));
        assert!(prompt.user.contains("(Source: /d/a.txt)"));
    }

    #[test]
    fn test_system_instruction_enforces_grounding() {
        let (prompt, _) = build_prompt("q", &[]);
        assert!(prompt.system.contains("ONLY from the provided"));
        assert!(prompt.system.contains("say you don't know"));
        assert!(prompt.system.contains("citation markers"));
    }

    #[test]
    fn test_empty_contexts() {
        let (prompt, citations) = build_prompt("q", &[]);
        assert!(citations.is_empty());
        assert!(prompt.user.contains("Context snippets:"));
    }
}
