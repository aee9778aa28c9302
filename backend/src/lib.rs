//! Assembles the printable document of a choir event: a generated cover, the
//! musical program and one content page per piece, merged into a single PDF.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod regeneration;
pub mod services;
pub mod store;
