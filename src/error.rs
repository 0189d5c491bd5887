//! Provides the error types used throughout the program. Each type groups the kinds relevant to
//! one subsystem; `Error` at the bottom aggregates all of them for the CLI boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing a [`ModVersion`](crate::mods::ModVersion) or
/// [`VersionRequirement`](crate::mods::VersionRequirement) string.
#[derive(Debug, Error)]
pub enum VersionParseError {
    /// A version string didn't split into exactly three dot-separated components.
    #[error("version string '{0}' doesn't have exactly three components")]
    WrongComponentCount(String),
    /// A version component, or the build suffix, wasn't a valid `u16`.
    #[error("version component out of range or not an integer")]
    Component(#[from] std::num::ParseIntError),
    /// A version requirement string had no comparator/version regex match at all.
    #[error("'{0}' doesn't look like a version requirement")]
    NoRegexCaptures(String),
    /// A version requirement string was missing its comparator.
    #[error("'{0}' is missing a comparator")]
    MissingComparator(String),
    /// A version requirement string was missing its version.
    #[error("'{0}' is missing a version")]
    MissingVersion(String),
}

/// Errors from parsing a [`ModDependency`](crate::mods::ModDependency) string.
#[derive(Debug, Error)]
pub enum DependencyParsingError {
    /// The dependency string didn't match the dependency grammar at all.
    #[error("'{0}' doesn't look like a dependency string")]
    NoRegexCaptures(String),
    /// The dependency string's prefix token wasn't one of `! ? (?) ~`.
    #[error("'{0}' is not a valid dependency prefix")]
    InvalidPrefix(String),
    /// The dependency's name component wasn't captured by the grammar.
    #[error("couldn't extract a mod name from '{0}'")]
    NameNotCaptured(String),
    /// The dependency's name component was empty.
    #[error("dependency '{0}' has an empty mod name")]
    EmptyName(String),
    /// The dependency's version requirement failed to parse.
    #[error("invalid version requirement in dependency string")]
    Version(#[from] VersionParseError),
}

/// Errors related to filesystem paths and Unicode handling thereof.
#[derive(Debug, Error)]
pub enum PathError {
    /// A path had no file name component.
    #[error("path has no file name")]
    NoFilename,
    /// A path contained non-UTF-8 bytes.
    #[error("path contains invalid Unicode")]
    InvalidUnicode,
}

/// Errors from the HTTP transport (§4.B), retry layer (§4.C), and cache decorator (§4.D).
#[derive(Debug, Error)]
pub enum TransportError {
    /// A non-HTTPS URL was given to the transport.
    #[error("only HTTPS URLs are supported, got '{0}'")]
    Url(String),
    /// Too many redirects were followed (more than 10 hops).
    #[error("exceeded maximum redirect count following '{0}'")]
    TooManyRedirects(String),
    /// The response carried a `Location` header that wasn't a valid URL.
    #[error("invalid redirect location '{location}' from '{from}'")]
    InvalidRedirect {
        /// The URL that produced the bad redirect.
        from: String,
        /// The offending `Location` header value.
        location: String,
    },
    /// The connection timed out.
    #[error("connection to {host} timed out")]
    NetworkTimeout {
        /// The host the request was addressed to.
        host: String,
    },
    /// The connection could not be established or was reset.
    #[error("connection to {host} failed")]
    NetworkConnection {
        /// The host the request was addressed to.
        host: String,
    },
    /// A TLS handshake or certificate validation failure.
    #[error("TLS error talking to {host}")]
    Tls {
        /// The host the request was addressed to.
        host: String,
    },
    /// Any other network-level failure not covered by a more specific kind.
    #[error("network error talking to {host}")]
    Network {
        /// The host the request was addressed to.
        host: String,
    },
    /// `404 Not Found`, carrying the portal's structured error body if present.
    #[error("not found: {}", api_message_or(.api_message.as_deref(), "404"))]
    HttpNotFound {
        /// The portal's machine-readable error code, if the body was JSON with an `error` field.
        api_error: Option<String>,
        /// The portal's human-readable error message, if present.
        api_message: Option<String>,
    },
    /// Any other `4xx` status.
    #[error("client error {status}: {}", api_message_or(.api_message.as_deref(), "request rejected"))]
    HttpClient {
        /// The HTTP status code.
        status: u16,
        /// The portal's machine-readable error code, if present.
        api_error: Option<String>,
        /// The portal's human-readable error message, if present.
        api_message: Option<String>,
    },
    /// Any `5xx` status.
    #[error("server error {status}")]
    HttpServer {
        /// The HTTP status code.
        status: u16,
    },
    /// Any other unexpected status code.
    #[error("unexpected HTTP status {status}")]
    Http {
        /// The HTTP status code.
        status: u16,
    },
    /// A request was aborted by a cancellation signal before completing.
    #[error("request cancelled")]
    Cancelled,
    /// The underlying `reqwest` client reported an error with no more specific classification.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// Returns `message` if present, otherwise `default`. Used to keep the `#[error(...)]` format
/// strings above readable.
fn api_message_or<'a>(message: Option<&'a str>, default: &'a str) -> &'a str {
    message.unwrap_or(default)
}

impl From<StoreError> for TransportError {
    /// The HTTP cache decorator treats a cache store failure (e.g. a lock file I/O error) as a
    /// generic network-layer failure against the cache itself, so `?` composes across the two
    /// error families without callers having to match on both.
    fn from(error: StoreError) -> Self {
        TransportError::Network {
            host: format!("cache store ({})", error),
        }
    }
}

/// Errors from the content-addressed cache store (§4.A).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    /// The requested directory does not exist.
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    /// The cache root exists but is not writable.
    #[error("directory not writable: {0}")]
    DirectoryNotWritable(PathBuf),
    /// A file unexpectedly already existed where a fresh one was expected.
    #[error("file already exists: {0}")]
    FileExists(PathBuf),
    /// A downloaded artifact's SHA1 checksum didn't match the expected value.
    #[error("SHA1 mismatch: expected {expected}, got {actual}")]
    Sha1Mismatch {
        /// The checksum the caller expected.
        expected: String,
        /// The checksum actually computed.
        actual: String,
    },
    /// An I/O error while reading/writing a cache entry or lock file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Machine-readable dependency validation issue kinds (§4.E.4). Carried in a
/// [`ValidationResult`](crate::dependency::ValidationResult) rather than thrown, so callers can
/// display every problem at once.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required edge points at an identifier absent from the graph.
    #[error("'{dependent}' requires '{target}', which is not installed")]
    MissingDependency {
        /// The mod declaring the requirement.
        dependent: String,
        /// The missing target.
        target: String,
    },
    /// A required edge points at a disabled, installed mod.
    #[error("'{dependent}' requires '{target}', which is installed but disabled")]
    DisabledDependency {
        /// The mod declaring the requirement.
        dependent: String,
        /// The disabled target.
        target: String,
    },
    /// A required edge's version requirement isn't satisfied by the target's active version.
    #[error("'{dependent}' requires '{target} {requirement}', but installed version is {actual}")]
    VersionMismatch {
        /// The mod declaring the requirement.
        dependent: String,
        /// The target mod.
        target: String,
        /// The unmet requirement, formatted.
        requirement: String,
        /// The target's actual active version, formatted.
        actual: String,
    },
    /// Two enabled mods declare mutual or one-way incompatibility.
    #[error("'{first}' is incompatible with '{second}'")]
    Conflict {
        /// The mod declaring the incompatibility.
        first: String,
        /// The mod it's incompatible with.
        second: String,
    },
    /// A cycle exists among required edges.
    #[error("circular dependency involving: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// The mods participating in the cycle, in cycle order.
        cycle: Vec<String>,
    },
}

/// Machine-readable dependency validation warning kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationWarningKind {
    /// `mod-list.json` names a mod that isn't installed on disk.
    #[error("'{0}' is in the mod list but not installed")]
    ModInListNotInstalled(String),
    /// A mod is installed on disk but absent from `mod-list.json`.
    #[error("'{0}' is installed but not in the mod list")]
    ModInstalledNotInList(String),
}

/// Errors surfaced by the dependency engine's planner (§4.E.5) outside of the validator's own
/// `ValidationResult` channel — e.g. operations refused outright rather than merely flagged.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// `base` was targeted by an operation that must never touch it.
    #[error("cannot disable or uninstall the base mod")]
    BaseIsProtected,
    /// `uninstall` was refused because an enabled mod still requires the target.
    #[error("cannot uninstall '{target}': '{dependent}' still requires it")]
    StillRequired {
        /// The mod that would be left with a missing dependency.
        dependent: String,
        /// The mod that was asked to be uninstalled.
        target: String,
    },
    /// No release on the portal satisfies the accumulated version requirements for a mod.
    #[error("no release of '{0}' satisfies the required version constraints")]
    ReleaseNotFound(String),
    /// Two accumulated requirements on the same target can never both be satisfied.
    #[error("conflicting version requirements on '{0}'")]
    RequirementConflict(String),
    /// The requested mod isn't known to the graph or the portal.
    #[error("no such mod: {0}")]
    NoSuchMod(String),
}

/// Top-level error type returned by the CLI entry points, aggregating every subsystem's errors
/// via `#[from]` so `main` can format a single chain with `anyhow`.
#[derive(Debug, Error)]
pub enum Error {
    /// An error from the HTTP stack.
    #[error(transparent)]
    Transport(TransportError),
    /// An error from the cache store.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An error from the dependency engine's planner.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    /// A dependency string or version string failed to parse.
    #[error(transparent)]
    Parsing(#[from] DependencyParsingError),
    /// A bad or missing CLI argument / config value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A malformed configuration value or file.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A destructive command was refused because the game server is currently running.
    #[error("refusing to proceed while the Factorio server is running")]
    GameRunning,
    /// A mod zip or JSON document didn't have the expected shape.
    #[error("malformed file: {0}")]
    FileFormat(String),
    /// The operation was cancelled by the user.
    #[error("operation cancelled")]
    Cancelled,
    /// Any I/O error not already wrapped by a more specific kind.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for Error {
    /// A cancelled transport-layer operation surfaces as top-level [`Error::Cancelled`] rather
    /// than [`Error::Transport`], since the caller should treat it the same way regardless of
    /// which layer (HTTP request, cache lookup) was interrupted.
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Cancelled => Error::Cancelled,
            other => Error::Transport(other),
        }
    }
}
