mod links;
mod progress;
mod render;
mod styling;
mod tables;

pub use progress::PhaseProgress;
pub use render::{print_chain, print_pipelines, print_project};
use styling::{dim, magenta_bold};

/// Prints the `Pipelens` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🧭 Pipelens"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Build Pipeline Viewer")
    );
}
