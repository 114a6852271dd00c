//! Fixed small-talk replies that bypass retrieval.

use std::collections::{BTreeMap, HashMap};

const DEFAULT_REPLIES: [(&str, &str); 5] = [
    ("hi", "Hello! How can I assist you today?"),
    ("hello", "Hi there! How can I help you?"),
    (
        "thank you",
        "You're welcome! Feel free to ask if you need anything else.",
    ),
    ("thanks", "You're welcome!"),
    ("bye", "Goodbye! Have a great day!"),
];

/// Normalize a user message for table lookup: trim, then lowercase.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Trigger phrase -> reply. Exact match after normalization.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedReplyTable {
    entries: HashMap<String, String>,
}

impl Default for CannedReplyTable {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_REPLIES)
    }
}

impl CannedReplyTable {
    /// Build a table; triggers are normalized, blank ones are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = HashMap::new();
        for (trigger, reply) in pairs {
            let key = normalize(trigger.as_ref());
            if key.is_empty() {
                tracing::warn!("Ignoring canned reply with an empty trigger");
                continue;
            }
            entries.insert(key, reply.into());
        }
        Self { entries }
    }

    /// Table from the `cannedReplies` config map, or the defaults.
    pub fn from_config(replies: Option<&BTreeMap<String, String>>) -> Self {
        match replies {
            Some(map) => Self::from_pairs(map.iter().map(|(k, v)| (k, v.clone()))),
            None => Self::default(),
        }
    }

    /// Reply for `input`, if it is a known trigger.
    pub fn lookup(&self, input: &str) -> Option<&str> {
        self.entries.get(&normalize(input)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
