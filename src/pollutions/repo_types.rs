use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{types::Decimal, FromRow};
use thiserror::Error;
use time::OffsetDateTime;

use crate::photos::DecodedPhoto;

/// Kind of reported pollution. The French labels used by the original web
/// client are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollutionType {
    #[serde(alias = "Plastique")]
    Plastic,
    #[serde(alias = "Chimique")]
    Chemical,
    #[serde(rename = "Illegal dumping", alias = "Dépôt sauvage")]
    IllegalDumping,
    #[serde(alias = "Eau")]
    Water,
    Air,
    #[serde(alias = "Autre")]
    Other,
}

impl PollutionType {
    pub const ALL: [PollutionType; 6] = [
        PollutionType::Plastic,
        PollutionType::Chemical,
        PollutionType::IllegalDumping,
        PollutionType::Water,
        PollutionType::Air,
        PollutionType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollutionType::Plastic => "Plastic",
            PollutionType::Chemical => "Chemical",
            PollutionType::IllegalDumping => "Illegal dumping",
            PollutionType::Water => "Water",
            PollutionType::Air => "Air",
            PollutionType::Other => "Other",
        }
    }

    fn french_label(&self) -> &'static str {
        match self {
            PollutionType::Plastic => "Plastique",
            PollutionType::Chemical => "Chimique",
            PollutionType::IllegalDumping => "Dépôt sauvage",
            PollutionType::Water => "Eau",
            PollutionType::Air => "Air",
            PollutionType::Other => "Autre",
        }
    }
}

impl fmt::Display for PollutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown pollution type: {0}")]
pub struct UnknownPollutionType(pub String);

impl FromStr for PollutionType {
    type Err = UnknownPollutionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PollutionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.french_label() == s)
            .ok_or_else(|| UnknownPollutionType(s.to_string()))
    }
}

/// Pollution record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Pollution {
    pub id: i64,
    pub title: String,
    pub place: Option<String>,
    pub observed_at: Option<OffsetDateTime>,
    pub pollution_type: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub photo_data: Option<Vec<u8>>, // raw bytes, never sent to clients
    pub photo_mime: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Reporter summary joined into single-record reads.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reporter {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct PollutionFilter {
    /// Substring matched against title or description.
    pub search: Option<String>,
    pub pollution_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPollution {
    pub title: String,
    pub place: Option<String>,
    pub observed_at: Option<OffsetDateTime>,
    pub pollution_type: Option<PollutionType>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub photo: Option<DecodedPhoto>,
    pub user_id: Option<i64>,
}

/// Partial update; `None` keeps the stored value. The title is always set.
#[derive(Debug, Clone)]
pub struct PollutionChanges {
    pub title: String,
    pub place: Option<String>,
    pub observed_at: Option<OffsetDateTime>,
    pub pollution_type: Option<PollutionType>,
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub photo: Option<DecodedPhoto>,
}
