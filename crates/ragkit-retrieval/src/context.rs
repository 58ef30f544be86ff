//! Render retrieved passages into a prompt-ready context block.

use ragkit_core::types::ScoredPassage;

/// Format passages for injection into an LLM prompt, best first.
///
/// Each passage renders as a header line plus its text:
///
/// ```text
/// [Doc 1 | faq.md | score=0.87]
/// <passage text>
/// ```
///
/// `max_chars` bounds the total character count. A passage is included
/// whole or not at all; the first one that would overflow the budget stops
/// the output, even if a later, shorter passage would still fit.
pub fn format_context(passages: &[ScoredPassage], max_chars: usize) -> String {
    let mut out = String::new();
    for (i, passage) in passages.iter().enumerate() {
        let source = passage
            .metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or("unknown");
        let piece = format!(
            "[Doc {} | {} | score={:.2}]\n{}\n\n",
            i + 1,
            source,
            passage.effective_score(),
            passage.text
        );
        if out.chars().count() + piece.chars().count() > max_chars {
            break;
        }
        out.push_str(&piece);
    }
    out.trim_end().to_string()
}
