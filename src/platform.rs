//! Platform triple validation and normalization
//!
//! A platform triple is the (distro, releasever, arch) coordinate of one
//! build's output subtree, e.g. `rhel/6/x86_64`.

use crate::error::ResolveError;
use std::fmt;

/// Architectures with build output
pub const ACCEPTED_ARCHES: &[&str] = &["i386", "x86_64"];

/// Release lines published under their major version only
const MAJOR_ONLY_RELEASES: &[(&str, &str)] = &[("rhel", "5"), ("rhel", "6")];

/// Packaging family a distro belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistroFamily {
    /// rhel, centos
    Rpm,
    /// debian, ubuntu
    Deb,
}

impl DistroFamily {
    /// Classify a distro name (case-insensitive)
    pub fn of(distro: &str) -> Option<Self> {
        match distro.to_ascii_lowercase().as_str() {
            "rhel" | "centos" => Some(Self::Rpm),
            "debian" | "ubuntu" => Some(Self::Deb),
            _ => None,
        }
    }
}

/// Reject the common `amd64` alias with a pointer to the accepted spelling
pub fn check_arch_alias(arch: &str) -> Result<(), ResolveError> {
    if arch == "amd64" {
        return Err(ResolveError::bad_request(
            "bad arch \"amd64\"; try \"x86_64\" instead",
        ));
    }
    Ok(())
}

/// Validate a value that becomes a single path segment
fn validate_segment(name: &str, value: &str) -> Result<(), ResolveError> {
    if value.is_empty()
        || value == "."
        || value.contains("..")
        || value.contains('/')
        || value.contains('\\')
        || value.contains('\0')
    {
        return Err(ResolveError::bad_request(format!(
            "bad {} \"{}\"",
            name, value
        )));
    }
    Ok(())
}

/// Normalized (distro, releasever, arch)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformTriple {
    pub distro: String,
    pub releasever: String,
    pub arch: String,
}

impl PlatformTriple {
    /// Validate and normalize request parameters.
    ///
    /// The distro is lower-cased and historical rhel releases are truncated
    /// to their major version (`6.5` becomes `6`).
    pub fn normalize(distro: &str, releasever: &str, arch: &str) -> Result<Self, ResolveError> {
        check_arch_alias(arch)?;
        if !ACCEPTED_ARCHES.contains(&arch) {
            return Err(ResolveError::bad_request(format!("bad arch \"{}\"", arch)));
        }
        validate_segment("distro", distro)?;
        validate_segment("releasever", releasever)?;

        let distro = distro.to_ascii_lowercase();
        let releasever = canonical_release(&distro, releasever);

        Ok(Self {
            distro,
            releasever,
            arch: arch.to_string(),
        })
    }

    /// Relative path of this platform's output below a build directory
    pub fn subpath(&self) -> String {
        format!("{}/{}/{}", self.distro, self.releasever, self.arch)
    }

    /// Packaging family, if the distro is known
    pub fn family(&self) -> Option<DistroFamily> {
        DistroFamily::of(&self.distro)
    }
}

impl fmt::Display for PlatformTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subpath())
    }
}

fn canonical_release(distro: &str, releasever: &str) -> String {
    for (name, major) in MAJOR_ONLY_RELEASES {
        // 6.5, 6Server and 6Workstation are all the 6 line, 60 is not
        let in_line = releasever
            .strip_prefix(*major)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()));
        if distro == *name && in_line {
            return (*major).to_string();
        }
    }
    releasever.to_string()
}
