//! Error types for each layer of the document pipeline.
//!
//! Only `PipelineError::NotFound` is meant to reach a caller for an event that
//! exists; every other failure is absorbed by the stage that produced it.

use common::model::event::EventId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] genpdf::error::Error),

    #[error("no usable font family: {0}")]
    Fonts(String),
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("malformed document structure: {0}")]
    Structure(String),

    #[error("no pages to merge")]
    NoPages,

    #[error("could not serialize merged document: {0}")]
    Write(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid stored value: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Event with ID {0} not found")]
    NotFound(EventId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("nothing could be rendered for event {0}")]
    Empty(EventId),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown time zone {0:?}")]
    TimeZone(String),
}
