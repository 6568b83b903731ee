//! Translation of UI source selections into the backend's filter shape.
//!
//! Everything here is pure: no I/O, no dependence on the stream protocol.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

/// One source selection token as produced by a source picker.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SourceSelection {
    /// Search everything.
    All,
    /// Any of the standard works.
    Scriptures,
    /// Any General Conference talk.
    Conference,
    /// A single standard work, e.g. `Book of Mormon`.
    StandardWork(String),
    /// Conference talks from one year.
    Year(u16),
    /// Conference talks by one speaker.
    Speaker(String),
}

/// Error for tokens that are not valid selections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized source selection: {0:?}")]
pub struct UnknownSelection(pub String);

impl FromStr for SourceSelection {
    type Err = UnknownSelection;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        let unknown = || UnknownSelection(raw.to_string());
        if let Some((kind, value)) = token.split_once(':') {
            let value = value.trim();
            if value.is_empty() {
                return Err(unknown());
            }
            return match kind.trim().to_ascii_lowercase().as_str() {
                "standard_work" | "work" => Ok(Self::StandardWork(value.to_string())),
                "year" => value.parse().map(Self::Year).map_err(|_| unknown()),
                "speaker" => Ok(Self::Speaker(value.to_string())),
                _ => Err(unknown()),
            };
        }
        match token.to_ascii_lowercase().as_str() {
            "all" | "everything" => Ok(Self::All),
            "scriptures" | "standard_works" => Ok(Self::Scriptures),
            "conference" | "general_conference" => Ok(Self::Conference),
            _ => Err(unknown()),
        }
    }
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Scriptures => f.write_str("scriptures"),
            Self::Conference => f.write_str("conference"),
            Self::StandardWork(work) => write!(f, "standard_work:{work}"),
            Self::Year(year) => write!(f, "year:{year}"),
            Self::Speaker(speaker) => write!(f, "speaker:{speaker}"),
        }
    }
}

/// Collection family a filter restricts to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Scripture,
    Conference,
}

/// Filter object sent as `source_filter`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceFilter {
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_work: Option<String>,
}

/// Parses raw tokens, dropping the ones that are not recognized.
pub fn parse_selections<I, S>(tokens: I) -> Vec<SourceSelection>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .filter_map(|token| match token.as_ref().parse() {
            Ok(selection) => Some(selection),
            Err(err) => {
                debug!(event = "filter.token_ignored", domain = "request", error = %err);
                None
            }
        })
        .collect()
}

/// Translates selections into a backend filter.
///
/// Returns `None` (unrestricted search) when nothing is selected, when `All` is
/// selected, or when scripture and conference selections are mixed. A field is
/// only set when exactly one distinct value was chosen for it.
pub fn translate_selections(selections: &[SourceSelection]) -> Option<SourceFilter> {
    if selections.is_empty() || selections.contains(&SourceSelection::All) {
        return None;
    }

    let mut wants_scripture = false;
    let mut wants_conference = false;
    let mut works = BTreeSet::new();
    let mut years = BTreeSet::new();
    let mut speakers = BTreeSet::new();
    for selection in selections {
        match selection {
            SourceSelection::All => {}
            SourceSelection::Scriptures => wants_scripture = true,
            SourceSelection::Conference => wants_conference = true,
            SourceSelection::StandardWork(work) => {
                wants_scripture = true;
                works.insert(work.as_str());
            }
            SourceSelection::Year(year) => {
                wants_conference = true;
                years.insert(*year);
            }
            SourceSelection::Speaker(speaker) => {
                wants_conference = true;
                speakers.insert(speaker.as_str());
            }
        }
    }

    match (wants_scripture, wants_conference) {
        (true, false) => Some(SourceFilter {
            source_type: SourceType::Scripture,
            year: None,
            speaker: None,
            standard_work: single(&works).map(str::to_string),
        }),
        (false, true) => Some(SourceFilter {
            source_type: SourceType::Conference,
            year: single(&years),
            speaker: single(&speakers).map(str::to_string),
            standard_work: None,
        }),
        _ => {
            debug!(
                event = "filter.mixed_types",
                domain = "request",
                selections = selections.len() as u64,
                "scripture and conference selections mixed, searching unrestricted"
            );
            None
        }
    }
}

fn single<T: Copy>(set: &BTreeSet<T>) -> Option<T> {
    if set.len() == 1 {
        set.iter().next().copied()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(tokens: &[&str]) -> Vec<SourceSelection> {
        parse_selections(tokens)
    }

    #[test]
    fn nothing_or_everything_means_no_filter() {
        assert_eq!(translate_selections(&[]), None);
        assert_eq!(translate_selections(&sel(&["all"])), None);
        assert_eq!(translate_selections(&sel(&["year:2023", "all"])), None);
    }

    #[test]
    fn single_standard_work_sets_scripture_filter() {
        let filter = translate_selections(&sel(&["standard_work:Book of Mormon"])).expect("filter");
        assert_eq!(filter.source_type, SourceType::Scripture);
        assert_eq!(filter.standard_work.as_deref(), Some("Book of Mormon"));
        let json = serde_json::to_value(&filter).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"source_type":"scripture","standard_work":"Book of Mormon"})
        );
    }

    #[test]
    fn conference_year_and_speaker_combine() {
        let filter = translate_selections(&sel(&["year:2023", "speaker:Russell M. Nelson"]))
            .expect("filter");
        assert_eq!(filter.source_type, SourceType::Conference);
        assert_eq!(filter.year, Some(2023));
        assert_eq!(filter.speaker.as_deref(), Some("Russell M. Nelson"));
        assert_eq!(filter.standard_work, None);
    }

    #[test]
    fn several_years_broaden_to_all_conference() {
        let filter = translate_selections(&sel(&["year:2022", "year:2023"])).expect("filter");
        assert_eq!(filter.source_type, SourceType::Conference);
        assert_eq!(filter.year, None);
        let repeated = translate_selections(&sel(&["year:2022", "year:2022"])).expect("filter");
        assert_eq!(repeated.year, Some(2022));
    }

    #[test]
    fn mixed_types_mean_no_filter() {
        assert_eq!(translate_selections(&sel(&["scriptures", "conference"])), None);
        assert_eq!(
            translate_selections(&sel(&["standard_work:Old Testament", "year:2020"])),
            None
        );
    }

    #[test]
    fn unknown_tokens_are_dropped() {
        let parsed = sel(&["bogus", "year:twenty", "speaker:", "conference"]);
        assert_eq!(parsed, vec![SourceSelection::Conference]);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for token in [
            "all",
            "scriptures",
            "conference",
            "standard_work:Pearl of Great Price",
            "year:1999",
            "speaker:Dallin H. Oaks",
        ] {
            let parsed: SourceSelection = token.parse().expect("parse");
            assert_eq!(parsed.to_string(), token);
        }
    }
}
