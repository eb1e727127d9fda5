mod lineage;
mod project;
mod resolver;
mod status;

pub use lineage::{LineageAssembler, PipelineNode};
pub use project::{build_project_tree, ProjectNode};
pub use resolver::BuildCausalityResolver;
pub use status::PipelineStatus;
