//! Check kinds and the values computed for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality metric a job may request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    /// Frame width and height
    Resolution,
    /// Average frame rate
    Fps,
    /// Container (or video stream) bitrate
    Bitrate,
    /// EBU R128 integrated loudness via `loudnorm`
    AvgLoudness,
}

impl CheckKind {
    /// All check kinds.
    pub const ALL: &'static [CheckKind] = &[
        CheckKind::Resolution,
        CheckKind::Fps,
        CheckKind::Bitrate,
        CheckKind::AvgLoudness,
    ];

    /// Wire name, as used in the requested list and result keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Resolution => "RESOLUTION",
            CheckKind::Fps => "FPS",
            CheckKind::Bitrate => "BITRATE",
            CheckKind::AvgLoudness => "AVG_LOUDNESS",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = CheckKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CheckKindParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown check kind: {0}")]
pub struct CheckKindParseError(String);

/// Unordered set of requested check kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSet(BTreeSet<CheckKind>);

impl CheckSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw names, returning the names that were not recognized.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> (Self, Vec<String>) {
        let mut set = BTreeSet::new();
        let mut unknown = Vec::new();

        for name in names {
            match name.as_ref().parse::<CheckKind>() {
                Ok(kind) => {
                    set.insert(kind);
                }
                Err(_) => unknown.push(name.as_ref().to_string()),
            }
        }

        (Self(set), unknown)
    }

    pub fn contains(&self, kind: CheckKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn insert(&mut self, kind: CheckKind) -> bool {
        self.0.insert(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CheckKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<CheckKind> for CheckSet {
    fn from_iter<I: IntoIterator<Item = CheckKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Frame dimensions. Both are absent when the file has no video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Frame rate in frames per second, absent when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRate {
    pub value: Option<f64>,
}

/// Bitrate in bits/second plus the derived kilobit value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bitrate {
    pub bps: Option<u64>,
    pub kbps: Option<f64>,
}

impl Bitrate {
    pub fn from_bps(bps: Option<u64>) -> Self {
        Self {
            bps,
            kbps: bps.map(|b| b as f64 / 1000.0),
        }
    }
}

/// JSON object emitted by the loudness filter, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoudnessMeasurement(pub Map<String, Value>);

impl LoudnessMeasurement {
    /// Look up a raw field, e.g. `input_i`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// Value computed for one check kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckValue {
    Resolution(Resolution),
    Fps(FrameRate),
    Bitrate(Bitrate),
    AvgLoudness(LoudnessMeasurement),
}

impl CheckValue {
    /// The check kind this value answers.
    pub fn kind(&self) -> CheckKind {
        match self {
            CheckValue::Resolution(_) => CheckKind::Resolution,
            CheckValue::Fps(_) => CheckKind::Fps,
            CheckValue::Bitrate(_) => CheckKind::Bitrate,
            CheckValue::AvgLoudness(_) => CheckKind::AvgLoudness,
        }
    }
}
