use thiserror::Error;

/// Errors raised while reading, converting or writing label files.
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("label file `{uri}` does not exist or is not accessible")]
    NotFound { uri: String },
    #[error("cannot write labels to `{uri}`: {reason}")]
    NotWritable { uri: String, reason: String },
    #[error("class name `{0}` is not present in the class map")]
    UnknownClass(String),
    #[error("class id `{0}` is not present in the class map")]
    UnknownClassId(i64),
    #[error("class map entry `{name}({id})` collides with an existing entry")]
    DuplicateClass { id: i64, name: String },
    #[error("feature #{index} has neither a `class_name` nor a `class_id` property")]
    MissingClass { index: usize },
    #[error("feature #{index} has a malformed geometry: {message}")]
    MalformedGeometry { index: usize, message: String },
    #[error("box ({ymin}, {xmin}, {ymax}, {xmax}) is not ordered or not finite")]
    InvalidBox {
        ymin: f64,
        xmin: f64,
        ymax: f64,
        xmax: f64,
    },
    #[error("expected a GeoJSON FeatureCollection, found `{found}`")]
    NotFeatureCollection { found: String },
    #[error("score {0} is not a finite number")]
    InvalidScore(f64),
    #[error("cell inference needs an extent to lay the grid over")]
    MissingExtent,
    #[error("invalid classification options: {0}")]
    InvalidOptions(String),
    #[error("uri `{0}` uses a scheme that local storage cannot write to")]
    UnsupportedUri(String),
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LabelError>;
