//! # Unichrome Core
//!
//! Embeddable vector database engine written in Rust.
//!
//! Unichrome stores text documents together with their dense embedding
//! vectors and optional string metadata, and answers approximate
//! k-nearest-neighbour queries by cosine similarity through a native HNSW
//! index. It links into a host application rather than running as a
//! server, and operates fully in memory or backed by per-collection files
//! on local disk.
//!
//! ## Features
//!
//! - **Native HNSW**: layered proximity graph with pluggable neighbour
//!   selection heuristics and a construction-time distance cache
//! - **SIMD distance kernels**: 8-wide cosine distance with a scalar
//!   reference path and unit-norm fast paths
//! - **Snapshot persistence**: per-collection binary files, graph topology
//!   stored independently of the document payload
//! - **Post-filters**: metadata predicates and timestamp ranges applied on
//!   top of vector search
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unichrome_core::{Database, SearchFilters};
//!
//! let db = Database::open("./data")?;
//! let notes = db.create_collection("notes")?;
//!
//! let id = notes.add_document("hello world", embedding, None)?;
//! let results = notes.search(&query_embedding, 10, &SearchFilters::default())?;
//! db.persist()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod config;
pub mod database;
pub mod distance;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod storage;

pub use collection::Collection;
pub use config::{ConfigError, DatabaseConfig};
pub use database::Database;
pub use distance::DistanceKernel;
pub use document::{Document, SearchResult};
pub use embedding::TextEmbedder;
pub use error::{Error, Result};
pub use filter::{DateRange, FilterOp, MetadataFilter, SearchFilters};
pub use index::{Graph, GraphStats, HnswParams, Neighbor, NeighborHeuristic};
pub use storage::DocumentStore;


#[cfg(test)]
pub(crate) mod test_support;
