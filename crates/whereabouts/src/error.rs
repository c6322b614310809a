use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhereaboutsError {
    #[error("CRS error: {0}")]
    CrsError(#[from] crate::crs::CrsError),
    #[error("Grid reference error: {0}")]
    GridError(#[from] crate::grid::GridError),
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Gazetteer error: {0}")]
    GazetteerError(#[from] crate::gazetteer::GazetteerError),
    #[error("Geocode error: {0}")]
    GeocodeError(#[from] crate::geocode::GeocodeError),
    #[error("Search error: {0}")]
    SearchError(#[from] crate::search::SearchError),
    #[error("Data error: {0}")]
    DataError(#[from] whereabouts_data::DataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WhereaboutsError {
    /// The client-facing payload, for errors that have one.
    pub fn error_payload(&self) -> Option<serde_json::Value> {
        match self {
            Self::SearchError(e) => e.error_payload(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WhereaboutsError>;
