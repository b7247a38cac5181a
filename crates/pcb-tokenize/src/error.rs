use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("element <{tag}> missing required attribute '{attribute}'")]
    MissingRequiredAttribute { tag: String, attribute: String },

    #[error("unexpected token '{token}' in context '{context}'")]
    UnknownToken { token: String, context: String },

    #[error("badly formatted token string, unclosed element <{0}>")]
    UnclosedElement(String),

    #[error("tag <{tag}> is not legal for phase {phase}")]
    IllegalTagForPhase { tag: String, phase: String },

    #[error("{kind} '{name}' is not defined")]
    UnresolvedReference { kind: String, name: String },

    #[error("package '{0}' already defined in its library")]
    DuplicatePackageDefinition(String),

    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    #[error("unhandled element <{0}>")]
    UnhandledElementKind(String),

    #[error("element <{tag}> has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
    },

    #[error("required element '{0}' not found")]
    MissingElement(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}
