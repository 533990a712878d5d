//! Sibyl - Grounded Question Answering
//!
//! Sibyl answers natural-language questions from a local document corpus. It
//! splits documents into overlapping token windows, retrieves candidates with
//! two independent strategies (dense vector similarity and BM25 lexical
//! search), fuses their rankings with Reciprocal Rank Fusion, diversifies the
//! fused pool with Maximal Marginal Relevance, and hands the ordered context
//! set to a citation-grounded generation step.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod retrieval;

pub use error::{Result, SibylError};
