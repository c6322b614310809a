use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// The `LOCAL_TYPE` classification of a gazetteer entry.
///
/// The common Open Names classes get their own variant, everything else is kept
/// verbatim in [`LocalType::Other`] so no information is lost on ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocalType {
    Postcode,
    City,
    Town,
    Village,
    Hamlet,
    SuburbanArea,
    NamedRoad,
    OtherSettlement,
    Other(String),
}

impl LocalType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Postcode => "Postcode",
            Self::City => "City",
            Self::Town => "Town",
            Self::Village => "Village",
            Self::Hamlet => "Hamlet",
            Self::SuburbanArea => "Suburban Area",
            Self::NamedRoad => "Named Road",
            Self::OtherSettlement => "Other Settlement",
            Self::Other(other) => other.as_str(),
        }
    }

    /// Place classes preferred by a name search when the caller gives none.
    pub fn default_preference() -> Vec<Self> {
        vec![
            Self::City,
            Self::Town,
            Self::Village,
            Self::SuburbanArea,
            Self::NamedRoad,
            Self::Postcode,
        ]
    }
}

impl From<&str> for LocalType {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Postcode" => Self::Postcode,
            "City" => Self::City,
            "Town" => Self::Town,
            "Village" => Self::Village,
            "Hamlet" => Self::Hamlet,
            "Suburban Area" => Self::SuburbanArea,
            "Named Road" => Self::NamedRoad,
            "Other Settlement" => Self::OtherSettlement,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for LocalType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<LocalType> for String {
    fn from(value: LocalType) -> Self {
        match value {
            LocalType::Other(other) => other,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for LocalType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for LocalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named place as held by the gazetteer.
///
/// Geometry is a single point whose CRS is defined by whoever owns the record set
/// (Open Names ships EPSG:27700, a search gazetteer usually holds EPSG:4326).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerRecord {
    pub id: u64,
    /// Identifier from the source product, e.g. `osgb4000000074559125`.
    pub source_id: Option<String>,
    pub name1: String,
    pub name2: Option<String>,
    pub local_type: LocalType,
    pub postcode_district: Option<String>,
    pub populated_place: Option<String>,
    pub district_borough: Option<String>,
    pub county_unitary: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub x: f64,
    pub y: f64,
}

impl GazetteerRecord {
    pub fn new(id: u64, name1: impl Into<String>, local_type: LocalType, x: f64, y: f64) -> Self {
        Self {
            id,
            source_id: None,
            name1: name1.into(),
            name2: None,
            local_type,
            postcode_district: None,
            populated_place: None,
            district_borough: None,
            county_unitary: None,
            region: None,
            country: None,
            x,
            y,
        }
    }

    pub fn with_name2(mut self, name2: impl Into<String>) -> Self {
        self.name2 = Some(name2.into());
        self
    }

    pub fn with_postcode_district(mut self, district: impl Into<String>) -> Self {
        self.postcode_district = Some(district.into());
        self
    }

    pub fn with_populated_place(mut self, place: impl Into<String>) -> Self {
        self.populated_place = Some(place.into());
        self
    }

    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county_unitary = Some(county.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub const fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl fmt::Display for GazetteerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name1, self.local_type)
    }
}
