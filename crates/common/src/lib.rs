//! Settings, logging and cloud provider plumbing shared by the deployer binaries.

#![deny(missing_docs)]

/// Tool settings loaded from a TOML file and the environment.
pub mod config;

/// Global tracing subscriber setup.
#[cfg(feature = "logging")]
pub mod logging;

/// Function code provider boundary and its AWS Lambda implementation.
#[cfg(feature = "lambda")]
pub mod lambda;
