//! gitlet-core: a small content-addressed version-control engine.
//!
//! Files are stored as immutable **blobs** keyed by their SHA-256, snapshots
//! as **commits** forming a DAG, and **branches** are named pointers into
//! that DAG. Changes pass through a staging area, and branches are combined
//! with a three-way **merge** against their split point.

pub mod commit;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod graph;
pub mod hash;
pub mod ignore;
pub mod index;
pub mod lock;
pub mod merge;
pub mod object;
pub mod refs;
pub mod repo;
pub mod state;

pub use commit::Commit;
pub use config::Config;
pub use error::{GitletError, GitletResult};
pub use merge::MergeOutcome;
pub use repo::{Repository, StatusReport};
