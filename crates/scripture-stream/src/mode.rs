use std::fmt;

use tracing::debug;

/// Server-side answer mode.
///
/// The set is closed. UI labels that do not map to a known mode fall back to
/// `Default` instead of failing, so older clients keep working when labels
/// change.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Unrestricted retrieval over every collection.
    #[default]
    Default,
    /// Retrieval restricted to the Book of Mormon.
    BookOfMormonOnly,
    /// Retrieval restricted to General Conference talks.
    GeneralConferenceOnly,
    /// Retrieval restricted to the standard works.
    ScripturesOnly,
}

impl SearchMode {
    /// Every mode, in display order.
    pub const ALL: [SearchMode; 4] = [
        SearchMode::Default,
        SearchMode::BookOfMormonOnly,
        SearchMode::GeneralConferenceOnly,
        SearchMode::ScripturesOnly,
    ];

    /// Maps a UI-facing label (or a server id) to a mode.
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "" | "default" | "all" => SearchMode::Default,
            "bookofmormononly" | "bookofmormon" | "bom" => SearchMode::BookOfMormonOnly,
            "generalconferenceonly" | "generalconference" | "conference" => {
                SearchMode::GeneralConferenceOnly
            }
            "scripturesonly" | "scriptures" | "standardworks" => SearchMode::ScripturesOnly,
            _ => {
                debug!(
                    event = "mode.unmapped_label",
                    domain = "request",
                    label = label,
                    "unrecognized mode label, using default"
                );
                SearchMode::Default
            }
        }
    }

    /// Identifier understood by the backend.
    pub fn as_server_id(&self) -> &'static str {
        match self {
            SearchMode::Default => "default",
            SearchMode::BookOfMormonOnly => "book_of_mormon_only",
            SearchMode::GeneralConferenceOnly => "general_conference_only",
            SearchMode::ScripturesOnly => "scriptures_only",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Default => "Default",
            SearchMode::BookOfMormonOnly => "Book of Mormon Only",
            SearchMode::GeneralConferenceOnly => "General Conference Only",
            SearchMode::ScripturesOnly => "Scriptures Only",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_server_id())
    }
}

impl From<&str> for SearchMode {
    fn from(value: &str) -> Self {
        Self::from_label(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_server_ids_round_trip() {
        for mode in SearchMode::ALL {
            assert_eq!(SearchMode::from_label(mode.label()), mode);
            assert_eq!(SearchMode::from_label(mode.as_server_id()), mode);
        }
    }

    #[test]
    fn unknown_label_falls_back_to_default() {
        assert_eq!(SearchMode::from_label("Poetry Only"), SearchMode::Default);
        assert_eq!(SearchMode::from_label(""), SearchMode::Default);
    }

    #[test]
    fn serializes_as_server_id() {
        let value = serde_json::to_value(SearchMode::GeneralConferenceOnly).expect("serialize");
        assert_eq!(value, serde_json::json!("general_conference_only"));
    }
}
