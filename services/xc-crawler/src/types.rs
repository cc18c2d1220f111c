//!
//! src/types.rs  xc-crawler  Oct 19th, 2026
//!
//! Shapes of the xeno-canto search response. Every recording field is
//! optional: a missing key and an explicit null both become None.
//!

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Sonogram/oscillogram image urls, osci carries no `full` entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    pub small: Option<String>,
    pub med: Option<String>,
    pub large: Option<String>,
    pub full: Option<String>,
}

impl ImageSet {
    fn from_value(v: &Value) -> Option<Self> {
        let map = v.as_object()?;
        Some(Self {
            small: map.get("small").and_then(text),
            med: map.get("med").and_then(text),
            large: map.get("large").and_then(text),
            full: map.get("full").and_then(text),
        })
    }
}

/// One recording as returned by /api/2/recordings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct Recording {
    pub id: Option<String>,
    pub genus: Option<String>,          // "gen"
    pub species: Option<String>,        // "sp"
    pub subspecies: Option<String>,     // "ssp"
    pub group: Option<String>,
    pub english_name: Option<String>,   // "en"
    pub recordist: Option<String>,      // "rec"
    pub country: Option<String>,        // "cnt"
    pub location: Option<String>,       // "loc"
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub alt: Option<String>,
    pub sound_type: Option<String>,     // "type"
    pub sex: Option<String>,
    pub stage: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub file: Option<String>,
    pub file_name: Option<String>,      // "file-name"
    pub sono: Option<ImageSet>,
    pub osci: Option<ImageSet>,
    pub license: Option<String>,        // "lic"
    pub quality: Option<String>,        // "q"
    pub length: Option<String>,
    pub time: Option<String>,
    pub date: Option<String>,
    pub uploaded: Option<String>,
    pub also: Vec<String>,
    pub remarks: Option<String>,        // "rmk"
    pub bird_seen: Option<String>,
    pub animal_seen: Option<String>,
    pub playback_used: Option<String>,
    pub temp: Option<String>,
    pub regnr: Option<String>,
    pub auto: Option<String>,
    pub device: Option<String>,         // "dvc"
    pub mic: Option<String>,
    pub sample_rate: Option<String>,    // "smp"
}

/// Scalars are kept as their textual form, numbers and bools included
fn text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

impl From<Value> for Recording {
    fn from(v: Value) -> Self {
        let field = |key: &str| v.get(key).and_then(text);

        let also = match v.get("also") {
            Some(Value::Array(items)) => items.iter().filter_map(text).collect(),
            _ => Vec::new(),
        };

        Self {
            id: field("id"),
            genus: field("gen"),
            species: field("sp"),
            subspecies: field("ssp"),
            group: field("group"),
            english_name: field("en"),
            recordist: field("rec"),
            country: field("cnt"),
            location: field("loc"),
            lat: field("lat"),
            lng: field("lng"),
            alt: field("alt"),
            sound_type: field("type"),
            sex: field("sex"),
            stage: field("stage"),
            method: field("method"),
            url: field("url"),
            file: field("file"),
            file_name: field("file-name"),
            sono: v.get("sono").and_then(ImageSet::from_value),
            osci: v.get("osci").and_then(ImageSet::from_value),
            license: field("lic"),
            quality: field("q"),
            length: field("length"),
            time: field("time"),
            date: field("date"),
            uploaded: field("uploaded"),
            also,
            remarks: field("rmk"),
            bird_seen: field("bird-seen"),
            animal_seen: field("animal-seen"),
            playback_used: field("playback-used"),
            temp: field("temp"),
            regnr: field("regnr"),
            auto: field("auto"),
            device: field("dvc"),
            mic: field("mic"),
            sample_rate: field("smp"),
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "numPages", deserialize_with = "page_count")]
    pub num_pages: u32,
    #[serde(default)]
    recordings: Option<Vec<Recording>>,
}

impl SearchPage {
    pub fn into_recordings(self) -> Vec<Recording> {
        self.recordings.unwrap_or_default()
    }
}

/// numPages is a number in practice, older responses quote it
fn page_count<'de, D>(d: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let v = Value::deserialize(d)?;
    let parsed = match &v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("invalid numPages: {v}")))
}
