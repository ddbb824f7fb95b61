pub mod command_breakdown;
pub mod formatter;

pub use command_breakdown::print_invocation;
pub use formatter::{print_build_result, print_include_path, print_lint_report, status_label};
