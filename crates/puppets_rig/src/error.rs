// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the rig crate.

use thiserror::Error;

/// Errors raised while building or querying a rig
#[derive(Debug, Error)]
pub enum RigError {
    /// A joint or marker needed for the operation could not be resolved
    #[error("Joint not found: {0}")]
    MissingJoint(String),

    /// A part needed for the operation could not be resolved
    #[error("Part not found: {0}")]
    MissingPart(String),

    /// Rig document error
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Layered archive error
    #[error("Layered archive error: {0}")]
    Ora(#[from] OraError),

    /// Pose construction error
    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),
}

/// Errors raised when constructing a pose
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    /// A pose key required by the topology is absent
    #[error("Pose is missing key: {0}")]
    MissingKey(String),

    /// A key that is not a pose key was supplied
    #[error("Not a pose key: {0}")]
    UnknownKey(String),

    /// A point value could not be parsed
    #[error("Invalid point for {key}: {value:?}")]
    InvalidPoint {
        /// Pose key
        key: String,
        /// Raw text that failed to parse
        value: String,
    },
}

/// Errors raised when reading or writing documents
#[derive(Debug, Error)]
pub enum DocumentError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension not recognised
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Part image could not be written
    #[error("Failed to write image {path}: {source}")]
    Image {
        /// Target file
        path: String,
        /// Encoder error
        #[source]
        source: image::ImageError,
    },
}

/// Errors raised while reading a layered (ORA) archive
#[derive(Debug, Error)]
pub enum OraError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Layer stack XML error
    #[error("Stack XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Layer stack attribute error
    #[error("Stack attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Raster decode error
    #[error("Failed to decode raster {src}: {source}")]
    Raster {
        /// Archive member
        src: String,
        /// Decoder error
        #[source]
        source: image::ImageError,
    },

    /// The archive has no usable layer stack
    #[error("Malformed layer stack: {0}")]
    Malformed(String),
}
