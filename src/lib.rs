//! genrepo - locate built package repositories by git ref
//!
//! Resolves a branch, tag or commit prefix against a remote, finds the newest
//! build directory holding output for a (distro, releasever, arch) platform
//! and returns the repository URL. Successful answers are remembered so a
//! caller can opt into the last known result when a fresh lookup fails.

pub mod audit;
pub mod builds;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod refs;
pub mod repo;
pub mod service;
pub mod ui;

pub use error::{GenrepoError, GenrepoResult, ResolveError};
pub use service::{Genrepo, ResolveRequest, Response};
