use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubgroupError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("Attribute {name} is {found}, expected {expected}")]
    AttributeKind { name: String, expected: &'static str, found: &'static str },
    #[error("Record set is empty")]
    EmptyRecordSet,
    #[error("Correlation between {x} and {y} is undefined over the whole record set")]
    DegenerateBaseline { x: String, y: String },
    #[error("Load error at line {line}: {message}")]
    Load { line: usize, message: String },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Settings error: {0}")]
    Settings(String),
    #[error("Execution error: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, SubgroupError>;

// Helper conversions
impl From<std::io::Error> for SubgroupError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
impl From<config::ConfigError> for SubgroupError {
    fn from(e: config::ConfigError) -> Self { Self::Settings(e.to_string()) }
}

impl SubgroupError {
    /// True for errors caused by the caller's configuration rather than the run itself.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownAttribute(_)
                | Self::AttributeKind { .. }
                | Self::EmptyRecordSet
                | Self::DegenerateBaseline { .. }
        )
    }
}
