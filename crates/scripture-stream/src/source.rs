use serde::{Deserialize, Deserializer};

/// One retrieved passage, flattened from the backend's wire shape.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceRecord {
    /// Passage text.
    pub content: String,
    /// Named collection (the backend's `standard_work`), empty when unknown.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Relevance in `0..=1`.
    pub score: f64,
    /// Ordinal position in the result list.
    pub rank: u32,
}

impl SourceRecord {
    /// Best available human-readable reference for this passage.
    pub fn display_citation(&self) -> String {
        if let Some(citation) = self.citation.as_deref().filter(|c| !c.trim().is_empty()) {
            return citation.to_string();
        }
        if let Some(book) = self.book.as_deref().filter(|b| !b.trim().is_empty()) {
            return match (self.chapter, self.verse.as_deref()) {
                (Some(chapter), Some(verse)) => format!("{book} {chapter}:{verse}"),
                (Some(chapter), None) => format!("{book} {chapter}"),
                _ => book.to_string(),
            };
        }
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return match self.speaker.as_deref() {
                Some(speaker) => format!("{title} ({speaker})"),
                None => title.to_string(),
            };
        }
        self.source.clone()
    }
}

/// Source item as sent by the backend, with nested metadata.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct WireSource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rank: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: WireSourceMetadata,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct WireSourceMetadata {
    #[serde(default)]
    pub standard_work: Option<String>,
    #[serde(default)]
    pub book: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub chapter: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub verse: Option<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub year: Option<u32>,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub paragraph: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl From<WireSource> for SourceRecord {
    fn from(wire: WireSource) -> Self {
        let meta = wire.metadata;
        SourceRecord {
            content: wire.content,
            source: meta.standard_work.unwrap_or_default(),
            book: meta.book,
            chapter: meta.chapter,
            verse: meta.verse,
            speaker: meta.speaker,
            year: meta.year,
            session: meta.session,
            title: meta.title,
            paragraph: meta.paragraph,
            citation: meta.citation,
            url: meta.url,
            score: wire.score,
            rank: wire.rank,
        }
    }
}

pub(crate) fn flatten_sources(items: Vec<WireSource>) -> Vec<SourceRecord> {
    items.into_iter().map(SourceRecord::from).collect()
}

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
