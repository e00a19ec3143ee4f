//! Error taxonomy for the fuel market pipeline.
//!
//! Row-level problems are not errors: the normalizer drops those rows and
//! reports them as counts. The types here cover failures that abort a
//! whole dataset or analysis branch.

/// Failure to obtain the raw bytes or text of a remote or local resource.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to '{url}' failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{url}' returned HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from '{url}': {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from '{source_name}' is not valid {encoding}")]
    Decode {
        source_name: String,
        encoding: &'static str,
    },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure affecting an entire dataset rather than a single row.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{dataset} dataset has no header row")]
    NoHeader { dataset: String },

    #[error("{dataset} dataset is missing column '{column}'")]
    MissingColumn { dataset: String, column: String },

    #[error("{dataset} dataset has no usable rows: all {dropped} rows failed type coercion")]
    NoUsableRows { dataset: String, dropped: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("total metric for year {year} is zero; market share is undefined")]
    ZeroTotal { year: i32 },

    #[error("data covers {distinct} distinct year(s), insufficient for temporal analysis")]
    InsufficientYears { distinct: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("failed to register chart font")]
    Font,

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Present(#[from] PresentError),
}

pub type Result<T> = std::result::Result<T, Error>;
