use thiserror::Error;

use crate::reference::ObjectId;

/// Errors from registration, encoding, decoding, load and save.
#[derive(Debug, Error)]
pub enum ParcelError {
    /// No factory is registered for the requested type.
    #[error("unknown type {type_name}: register it before creating or loading it")]
    UnknownType { type_name: String },

    /// The type cannot be registered as a reference target.
    #[error("cannot register {type_name}: {reason}")]
    InvalidRegistration { type_name: String, reason: String },

    /// The object was never bound to a save path.
    #[error("object {id} has no save path; call set_save_path first")]
    NoSavePath { id: ObjectId },

    /// The path already names a different live object.
    #[error("path {path:?} is already bound to a live {bound_type}")]
    PathAlreadyBound { path: String, bound_type: String },

    /// The object is already bound to a different path.
    #[error("object {id} is already bound to {path:?}")]
    ObjectAlreadyBound { id: ObjectId, path: String },

    /// `save` was called before a writable destination was registered.
    #[error("no writable destination has been registered")]
    NoWritableDestination,

    /// No read layer holds the path.
    #[error("{path:?} was not found in any registered source")]
    NotFound { path: String },

    /// The bytes do not parse as the expected document shape.
    #[error("malformed document {path:?}: {reason}")]
    MalformedDocument { path: String, reason: String },

    /// A map key could not be rendered as text.
    #[error("unsupported map key type {type_name}: {reason}")]
    UnsupportedKeyType { type_name: String, reason: String },

    /// An unbound reference leads back to an object already being inlined.
    #[error("reference cycle through unbound object {id}; give one object a save path")]
    InlineCycle { id: ObjectId },

    /// The object is mutably borrowed and cannot be read or written.
    #[error("object {id} is already borrowed")]
    Borrowed { id: ObjectId },

    /// The JSON writer failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Read layer or writable destination failure.
    #[error("storage error: {0}")]
    Fs(#[from] parcel_fs::FsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for parcel operations.
pub type Result<T> = std::result::Result<T, ParcelError>;
