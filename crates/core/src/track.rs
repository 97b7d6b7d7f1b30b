//! Track metadata types consumed by the mix engine.
//!
//! Tracks are owned by the surrounding application (the track store); the
//! engine only reads them. Every analysis-derived field is optional: a
//! track with nothing but an id and a title is still usable, it just
//! contributes less to scoring and planning.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for a track in the external track store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub i64);

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<TrackId> for i64 {
    fn from(id: TrackId) -> Self {
        id.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Vocal content classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Instrumental,
    Vocal,
    Mixed,
}

/// A named structural section of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Intro,
    Verse,
    Chorus,
    Breakdown,
    Drop,
    Outro,
}

impl SectionKind {
    /// Section name as it appears in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Verse => "verse",
            Self::Chorus => "chorus",
            Self::Breakdown => "breakdown",
            Self::Drop => "drop",
            Self::Outro => "outro",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamped span within a track, in seconds from time zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub start: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl SectionSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn at(start: f64) -> Self {
        Self { start, end: None }
    }
}

/// Structural section map: section name to its ordered spans.
///
/// Metadata sources encode a section either as a single `{start, end}`
/// object or as an ordered sequence of them (a track can have several
/// drops); both forms deserialize into a span list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Structure {
    sections: BTreeMap<String, Vec<SectionSpan>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpanOrList {
    One(SectionSpan),
    Many(Vec<SectionSpan>),
}

impl<'de> Deserialize<'de> for Structure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, SpanOrList> = BTreeMap::deserialize(deserializer)?;
        let sections = raw
            .into_iter()
            .map(|(name, spans)| {
                let spans = match spans {
                    SpanOrList::One(span) => vec![span],
                    SpanOrList::Many(spans) => spans,
                };
                (name.to_ascii_lowercase(), spans)
            })
            .collect();
        Ok(Self { sections })
    }
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a span to a section, keeping insertion order.
    pub fn push(&mut self, kind: SectionKind, span: SectionSpan) {
        self.push_named(kind.as_str(), span);
    }

    /// Append a span to a section by raw name (for sources with
    /// non-standard section labels).
    pub fn push_named(&mut self, name: &str, span: SectionSpan) {
        self.sections
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(span);
    }

    /// All spans for a section, in order. Empty slice when absent.
    pub fn spans(&self, kind: SectionKind) -> &[SectionSpan] {
        self.sections
            .get(kind.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First span of a section.
    pub fn first(&self, kind: SectionKind) -> Option<SectionSpan> {
        self.spans(kind).first().copied()
    }

    /// Last span of a section.
    pub fn last(&self, kind: SectionKind) -> Option<SectionSpan> {
        self.spans(kind).last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }
}

/// Audio track metadata.
///
/// All tempo/structure data is pre-computed by an external analysis stage
/// and supplied here as plain metadata; the engine never touches audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Identifier in the external track store.
    pub id: TrackId,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: Option<String>,
    /// Track duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Tempo in beats per minute.
    pub bpm: Option<f64>,
    /// Musical key (e.g. "A Minor", "C#").
    pub key: Option<String>,
    /// Camelot wheel code (e.g. "8A") for harmonic mixing.
    pub camelot: Option<String>,
    /// Broad genre label.
    pub genre: Option<String>,
    /// Narrower sub-genre label.
    pub sub_genre: Option<String>,
    /// Perceived energy, 1-10.
    pub energy: Option<u8>,
    /// Danceability, 1-10.
    pub danceability: Option<u8>,
    /// Rhythmic complexity, 1-10.
    pub rhythmic_complexity: Option<u8>,
    /// Melodic complexity, 1-10.
    pub melodic_complexity: Option<u8>,
    /// Free-form mood descriptors.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub mood_tags: BTreeSet<String>,
    /// Vocal content classification.
    pub track_type: Option<TrackType>,
    /// Overall atmosphere descriptor (e.g. "dark", "uplifting").
    pub atmosphere: Option<String>,
    /// Structural section map.
    #[serde(default, skip_serializing_if = "Structure::is_empty")]
    pub structure: Structure,
}

impl Track {
    /// Create a track with only an id and title; every analysis field empty.
    pub fn new(id: TrackId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            artist: None,
            duration_seconds: None,
            bpm: None,
            key: None,
            camelot: None,
            genre: None,
            sub_genre: None,
            energy: None,
            danceability: None,
            rhythmic_complexity: None,
            melodic_complexity: None,
            mood_tags: BTreeSet::new(),
            track_type: None,
            atmosphere: None,
            structure: Structure::new(),
        }
    }

    /// Get a display string for the track (Artist - Title).
    pub fn display_name(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }

    /// Beat interval in seconds, when a usable bpm is known.
    pub fn beat_interval(&self) -> Option<f64> {
        self.bpm.filter(|bpm| *bpm > 0.0).map(|bpm| 60.0 / bpm)
    }
}
