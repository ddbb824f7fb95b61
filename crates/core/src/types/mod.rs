pub mod coordinate;
pub mod include_path;
pub mod invocation;
pub mod result;
pub mod suite;

// Re-export commonly used types
pub use coordinate::{Coordinate, Dependency, DependencyKind};
pub use include_path::{
    EntryOrigin, IncludeEntry, IncludePath, IncludePathBuilder, PATH_SEPARATOR, Shadowing,
};
pub use invocation::RunnerInvocation;
pub use result::{BuildResult, BuildStatus};
pub use suite::{AggregationMode, SUITE_CLASS, SuiteDescriptor, TestSource};
