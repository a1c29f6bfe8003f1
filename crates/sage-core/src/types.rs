//! Shared domain types for the knowledge base and chat pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of retrievable knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Document,
    Faq,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Document => "document",
            EntryKind::Faq => "faq",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of retrievable reference content.
///
/// Documents and FAQs are unified into this shape at retrieval time. For an
/// FAQ the question is stored as `title` and the answer as `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Identifier in the backing store. Only unique per `kind`.
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KnowledgeEntry {
    pub fn document(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            kind: EntryKind::Document,
            category: None,
        }
    }

    pub fn faq(id: i64, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id,
            title: question.into(),
            content: answer.into(),
            kind: EntryKind::Faq,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = if category.is_empty() {
            None
        } else {
            Some(category)
        };
        self
    }

    /// Text that gets embedded for this entry: title and content joined by a space.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// A knowledge entry matched by a query, with its similarity score.
///
/// `score = 1 / (1 + distance)` where distance is the squared Euclidean
/// distance between the query and entry embeddings, so the score lies in
/// `(0, 1]` and 1 means an exact match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    pub score: f64,
}

impl RetrievalResult {
    pub fn from_distance(entry: KnowledgeEntry, distance: f32) -> Self {
        Self {
            entry,
            score: distance_to_score(distance),
        }
    }
}

/// Convert a non-negative distance into a similarity score in `(0, 1]`.
///
/// Negative inputs (float noise around zero) are clamped to zero.
pub fn distance_to_score(distance: f32) -> f64 {
    1.0 / (1.0 + f64::from(distance.max(0.0)))
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Label used when rendering the turn into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation, as supplied by the chat-history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EntryKind::Document).unwrap(), "\"document\"");
        assert_eq!(serde_json::to_string(&EntryKind::Faq).unwrap(), "\"faq\"");
    }

    #[test]
    fn test_knowledge_entry_uses_type_tag() {
        let entry = KnowledgeEntry::faq(7, "How do I enroll?", "Enroll via Dashboard");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "faq");
        assert_eq!(json["title"], "How do I enroll?");
        assert_eq!(json["content"], "Enroll via Dashboard");
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_with_category_empty_is_none() {
        let entry = KnowledgeEntry::document(1, "t", "c").with_category("");
        assert_eq!(entry.category, None);

        let entry = KnowledgeEntry::document(1, "t", "c").with_category("Courses");
        assert_eq!(entry.category.as_deref(), Some("Courses"));
    }

    #[test]
    fn test_embedding_text_joins_title_and_content() {
        let entry = KnowledgeEntry::document(1, "Certificates", "Download from profile");
        assert_eq!(entry.embedding_text(), "Certificates Download from profile");
    }

    #[test]
    fn test_distance_to_score() {
        assert_eq!(distance_to_score(0.0), 1.0);
        assert!((distance_to_score(1.0) - 0.5).abs() < 1e-12);
        assert!(distance_to_score(3.0) < distance_to_score(2.0));
        assert_eq!(distance_to_score(-1e-7), 1.0);
    }

    #[test]
    fn test_retrieval_result_flattens_entry() {
        let result = RetrievalResult::from_distance(KnowledgeEntry::document(3, "A", "B"), 1.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["type"], "document");
        assert!((json["score"].as_f64().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_chat_turn_roles() {
        let turn: ChatTurn = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(turn, ChatTurn::user("hi"));
        assert_eq!(ChatRole::Assistant.label(), "Assistant");
    }
}
