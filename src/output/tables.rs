use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::pipeline::PipelineStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header<S: AsRef<str>>(labels: &[S]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(label.as_ref()).fg(TableColor::Cyan))
        .collect()
}

pub fn status_color(status: PipelineStatus) -> TableColor {
    match status {
        PipelineStatus::Success => TableColor::Green,
        PipelineStatus::Unstable => TableColor::Yellow,
        PipelineStatus::Failure => TableColor::Red,
        PipelineStatus::Building => TableColor::Blue,
        PipelineStatus::Manual => TableColor::Magenta,
        PipelineStatus::Aborted => TableColor::Grey,
        PipelineStatus::NotBuilt | PipelineStatus::Pending => TableColor::DarkGrey,
    }
}

pub fn status_cell(text: impl ToString, status: PipelineStatus) -> Cell {
    Cell::new(text.to_string()).fg(status_color(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(PipelineStatus::Success), TableColor::Green);
        assert_eq!(status_color(PipelineStatus::Failure), TableColor::Red);
        assert_eq!(status_color(PipelineStatus::Manual), TableColor::Magenta);
        assert_eq!(status_color(PipelineStatus::Pending), TableColor::DarkGrey);
    }
}
