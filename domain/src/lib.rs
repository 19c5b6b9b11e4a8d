use chrono::{DateTime, Utc}; // Creation timestamps
use serde::{Deserialize, Serialize};
use uuid::Uuid; // For generated document identifiers

// --- Document ID ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier (UUID v4, hyphenated).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty or whitespace-only identifiers count as absent.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<DocumentId> for String {
    fn from(doc_id: DocumentId) -> Self {
        doc_id.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Author ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// --- Document ---

/// A stored record. `id` may be absent or blank until the store assigns one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// May hold a blank id until the document is saved; see [`Document::id`].
    #[serde(default)]
    pub id: Option<DocumentId>,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub created: DateTime<Utc>,
}

impl Document {
    /// Creates a document without an identifier.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: Author,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            author,
            created,
        }
    }

    pub fn with_id(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the identifier unless it is absent or blank.
    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref().filter(|id| !id.is_blank())
    }

    /// Assigns a generated identifier if the current one is absent or blank,
    /// and returns the identifier the document is now keyed by.
    pub fn ensure_id(&mut self) -> DocumentId {
        match self.id() {
            Some(id) => id.clone(),
            None => {
                let id = DocumentId::generate();
                self.id = Some(id.clone());
                id
            }
        }
    }
}

// --- Search Request ---

/// Filter criteria for a search. Every criterion is optional; an unset
/// criterion, or an empty list, places no constraint on the result.
/// Values inside a list are OR-ed, criteria are AND-ed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Title must start with at least one of these (case-sensitive).
    #[serde(default)]
    pub title_prefixes: Option<Vec<String>>,
    /// Content must contain at least one of these (case-sensitive).
    #[serde(default)]
    pub contains_contents: Option<Vec<String>>,
    /// Author id must be one of these.
    #[serde(default)]
    pub author_ids: Option<Vec<String>>,
    /// Inclusive lower bound on `created`.
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created`.
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

impl SearchRequest {
    /// True when no criterion constrains the result.
    pub fn is_unconstrained(&self) -> bool {
        active(&self.title_prefixes).is_none()
            && active(&self.contains_contents).is_none()
            && active(&self.author_ids).is_none()
            && self.created_from.is_none()
            && self.created_to.is_none()
    }

    /// Checks a document against every criterion that is set.
    pub fn matches(&self, document: &Document) -> bool {
        matches_title_prefixes(document, active(&self.title_prefixes))
            && matches_contents(document, active(&self.contains_contents))
            && matches_author_ids(document, active(&self.author_ids))
            && matches_creation_range(document, self.created_from, self.created_to)
    }
}

/// Treats an empty list the same as an absent one.
fn active(criterion: &Option<Vec<String>>) -> Option<&[String]> {
    criterion.as_deref().filter(|values| !values.is_empty())
}

fn matches_title_prefixes(document: &Document, prefixes: Option<&[String]>) -> bool {
    prefixes.is_none_or(|prefixes| {
        prefixes
            .iter()
            .any(|prefix| document.title.starts_with(prefix.as_str()))
    })
}

fn matches_contents(document: &Document, contents: Option<&[String]>) -> bool {
    contents.is_none_or(|contents| {
        contents
            .iter()
            .any(|needle| document.content.contains(needle.as_str()))
    })
}

fn matches_author_ids(document: &Document, author_ids: Option<&[String]>) -> bool {
    author_ids.is_none_or(|ids| ids.iter().any(|id| *id == document.author.id))
}

fn matches_creation_range(
    document: &Document,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    from.is_none_or(|from| document.created >= from) && to.is_none_or(|to| document.created <= to)
}
