use thiserror::Error;

/// Why a server label descriptor could not become a [`crate::label::Label`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelError {
    #[error("descriptor is not a label object (@Object = {0:?})")]
    NotALabel(Option<String>),

    #[error("descriptor is missing required field {0}")]
    MissingField(&'static str),

    #[error("malformed descriptor: {0}")]
    Malformed(String),
}

/// Errors from tree mutations requested by a collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("no label at path {0:?}")]
    UnknownPath(String),

    #[error("a label already exists at path {0:?}")]
    DuplicatePath(String),

    #[error("label {0:?} cannot be deleted")]
    NotDeletable(String),

    #[error("label {0:?} still holds messages")]
    NotEmpty(String),

    #[error("invalid label name {0:?}")]
    InvalidName(String),
}
