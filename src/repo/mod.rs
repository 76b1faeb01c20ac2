//! Turning a located build into a reachable repository URL
//!
//! - rpm: the build output already is a yum repository; find the newest
//!   build that has the requested platform and point at it.
//! - deb: assemble an apt repository from the build's packages with the
//!   external repo tools, then point at that.

mod deb;
mod rpm;
mod tools;

pub use deb::{DebOutcome, DebRepoBuilder};
pub use rpm::RepoPathResolver;
pub use tools::{CommandRepoTools, RepoTools};

/// Join a relative path onto an HTTP base URL with exactly one slash
pub fn join_url(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
