pub mod advisor;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod dbscan;
pub mod error;
pub mod features;
pub mod filter;
pub mod kmeans;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod score;
pub mod types;
pub mod utils;
pub mod vectorizer;
pub mod ward;
pub mod writer;

pub use config::Opts;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineState, Stage};
pub use types::{ClusterRecord, ImageRecord, Label, NOISE};
