//! phpbridge - build-time bridge between a PHP project and its toolchain
//!
//! This crate provides functionality to:
//! - Resolve declared dependencies into an ordered PHP include path
//! - Synthesize a PHPUnit suite by probing test files for their classes
//! - Drive legacy and modern PHPUnit CLIs with a timeout and classify the outcome
//! - Package dependencies and sources into reproducible tar or phar archives
//! - Syntax-check PHP sources with the interpreter's lint mode
pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod lint;
pub mod pipeline;
pub mod resolver;
pub mod runner;
pub mod synth;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{Error, Result, RunnerErrorKind};
pub use types::*;

// Re-export main API components
pub use archive::{ArchiveFormat, ArchiveLayout, Packager, pack};
pub use config::Config;
pub use lint::{LintReport, Linter};
pub use pipeline::{BuildPipeline, BuildReport, PackageOutput};
pub use resolver::{DependencyResolver, ManagementMode, resolve};
pub use runner::{InvocationTarget, RunnerAdapter, RunnerOptions, RunnerProfile, invoke};
pub use synth::{ProbeKind, SuiteSynthesizer, synthesize};
