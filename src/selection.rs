// 🔎 Selection - turn user input into an entity id before the pipeline starts

use crate::error::CompareResult;
use crate::model::Suggestion;
use crate::wikidata::KnowledgeBase;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Input was already an item id
    Direct(String),

    /// Chosen from search suggestions
    Suggested(Suggestion),

    NoSelection,
}

impl Selection {
    pub fn id(&self) -> Option<&str> {
        match self {
            Selection::Direct(id) => Some(id),
            Selection::Suggested(suggestion) => Some(&suggestion.id),
            Selection::NoSelection => None,
        }
    }
}

/// `Q42`, `q42` and ` Q42 ` are ids; `Q`, `Q4a`, `Douglas` are not
pub fn parse_entity_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix('Q')
        .or_else(|| trimmed.strip_prefix('q'))?;

    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("Q{}", digits))
    } else {
        None
    }
}

/// Direct id, else the first search suggestion, else NoSelection
pub async fn resolve_selection<K: KnowledgeBase + ?Sized>(
    kb: &K,
    input: &str,
) -> CompareResult<Selection> {
    if let Some(id) = parse_entity_id(input) {
        return Ok(Selection::Direct(id));
    }

    let term = input.trim();
    if term.is_empty() {
        return Ok(Selection::NoSelection);
    }

    let suggestions = kb.search(term).await?;
    info!(term, hits = suggestions.len(), "search suggestions");

    Ok(suggestions
        .into_iter()
        .next()
        .map(Selection::Suggested)
        .unwrap_or(Selection::NoSelection))
}
