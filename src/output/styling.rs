use console::{style, StyledObject};

use crate::pipeline::PipelineStatus;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Status name coloured the same way as status cells in tables.
///
/// Finished builds are bold, so they stand out from nodes still waiting on a build.
pub fn styled_status(status: PipelineStatus) -> StyledObject<String> {
    let text = style(status.to_string());
    match status {
        PipelineStatus::Success => text.green().bold(),
        PipelineStatus::Unstable => text.yellow().bold(),
        PipelineStatus::Failure => text.red().bold(),
        PipelineStatus::Aborted => text.white().bold(),
        PipelineStatus::NotBuilt => text.dim().bold(),
        PipelineStatus::Building => text.blue(),
        PipelineStatus::Manual => text.magenta(),
        PipelineStatus::Pending => text.dim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styled_status_keeps_status_name() {
        for status in [
            PipelineStatus::Success,
            PipelineStatus::Failure,
            PipelineStatus::Manual,
            PipelineStatus::Pending,
        ] {
            let rendered = styled_status(status).force_styling(false).to_string();
            assert_eq!(rendered, status.as_str());
        }
    }

    #[test]
    fn test_styled_status_colours_failures_red() {
        let rendered = styled_status(PipelineStatus::Failure)
            .force_styling(true)
            .to_string();
        assert!(rendered.contains("\u{1b}[31m"));
        assert!(rendered.contains("FAILURE"));
    }
}
