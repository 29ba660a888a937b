//! Topic registry: the ledger of investigation threads an agent keeps open
//! while interviewing the user.
//!
//! Topics are identified by their zero-based insertion index. Nothing removes
//! or reorders a topic, so an index handed to the model stays valid for the
//! whole conversation. One registry belongs to one conversation; the runtime
//! constructs it and lends it to the topic tools.

/// Placeholder returned by [`TopicRegistry::summary`] when nothing was added.
pub const EMPTY_SUMMARY: &str = "No topics registered yet.";

/// Single investigation thread.
///
/// Fields are private: `asked` only flips through
/// [`TopicRegistry::mark_answered`], which keeps `answered ⇒ asked` true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicItem {
    description: String,
    asked: bool,
    conclusion: Option<String>,
}

impl TopicItem {
    fn open(description: String) -> Self {
        Self {
            description,
            asked: false,
            conclusion: None,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn asked(&self) -> bool {
        self.asked
    }

    pub fn conclusion(&self) -> Option<&str> {
        self.conclusion.as_deref()
    }

    /// True when the topic carries a non-empty conclusion.
    pub fn answered(&self) -> bool {
        self.conclusion.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn summary_line(&self, index: usize) -> String {
        let status = if self.answered() { "ANSWERED" } else { "OPEN" };
        let asked = if self.asked { "asked" } else { "not-asked" };
        let mut line = format!("[{index}] {status} ({asked}) :: {}", self.description);
        if let Some(conclusion) = self.conclusion.as_deref().filter(|c| !c.is_empty()) {
            line.push_str(" | conclusion: ");
            line.push_str(conclusion);
        }
        line
    }
}

/// Ordered ledger of topics for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicRegistry {
    items: Vec<TopicItem>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an open topic and return its index.
    ///
    /// Duplicates are allowed; every call creates a distinct entry.
    pub fn add(&mut self, description: impl Into<String>) -> usize {
        self.items.push(TopicItem::open(description.into()));
        self.items.len() - 1
    }

    /// Record a conclusion for the topic at `index`.
    ///
    /// Returns `false` without touching the ledger when `index` is negative or
    /// past the end. A topic that already has a conclusion is overwritten, so
    /// the model can correct an earlier answer.
    pub fn mark_answered(&mut self, index: i64, conclusion: impl Into<String>) -> bool {
        let Some(item) = usize::try_from(index)
            .ok()
            .and_then(|idx| self.items.get_mut(idx))
        else {
            return false;
        };
        item.conclusion = Some(conclusion.into());
        item.asked = true;
        true
    }

    /// Lowest index whose topic is not answered yet.
    pub fn next_unanswered(&self) -> Option<usize> {
        self.items.iter().position(|item| !item.answered())
    }

    /// One status line per topic in index order, or [`EMPTY_SUMMARY`].
    ///
    /// Line format: `[index] OPEN|ANSWERED (asked|not-asked) :: description`
    /// followed by ` | conclusion: ...` for answered topics.
    pub fn summary(&self) -> String {
        if self.items.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| item.summary_line(index))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn get(&self, index: usize) -> Option<&TopicItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
