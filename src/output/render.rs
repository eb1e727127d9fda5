use std::fmt::Write;

use comfy_table::Cell;
use log::debug;
use url::Url;

use super::links::{build_url, job_url, node_url};
use super::styling::{bright, bright_yellow, cyan, dim, styled_status};
use super::tables::{create_cyan_header, create_table, status_cell};
use crate::grid::Grid;
use crate::pipeline::{PipelineNode, PipelineStatus, ProjectNode};
use crate::store::Build;

/// Prints the pipeline history of a job, laid out as one stacked grid.
pub fn print_pipelines(root_job: &str, grid: &Grid<&PipelineNode>, base_url: Option<&Url>) {
    println!("{}", render_pipelines(root_job, grid, base_url));
}

/// Prints the static job grid.
pub fn print_project(grid: &Grid<&ProjectNode>, base_url: Option<&Url>) {
    println!("{}", render_project(grid, base_url));
}

/// Prints a flattened downstream chain.
pub fn print_chain(chain: &[Build], base_url: Option<&Url>) {
    println!("{}", render_chain(chain, base_url));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

/// Formats milliseconds the way build durations are usually shown, e.g. `1 min 5 sec`.
fn format_duration(ms: i64) -> String {
    let ms = ms.max(0);
    if ms < 1000 {
        return format!("{ms} ms");
    }

    let total_secs = ms / 1000;
    let (hours, mins, secs) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);

    if hours > 0 {
        format!("{hours} hr {mins} min")
    } else if mins > 0 {
        format!("{mins} min {secs} sec")
    } else {
        format!("{secs} sec")
    }
}

fn status_line(status: PipelineStatus, progress: Option<u8>) -> String {
    match progress {
        Some(percent) => format!("{status} {percent}%"),
        None => status.to_string(),
    }
}

fn pipeline_cell(node: &PipelineNode, base_url: Option<&Url>) -> Cell {
    let mut lines = vec![
        match node.build_number() {
            Some(number) => format!("{} #{number}", node.job_name()),
            None => node.job_name().to_string(),
        },
        status_line(node.status, node.progress),
    ];

    if let Some(duration) = node
        .build
        .as_ref()
        .filter(|b| !b.is_running())
        .and_then(|b| b.duration_ms)
    {
        lines.push(format_duration(duration));
    }

    if let Some(base_url) = base_url {
        lines.push(node_url(base_url, node));
    }

    status_cell(lines.join("\n"), node.status)
}

fn pipeline_header_cell(root: &PipelineNode) -> Cell {
    let Some(build) = &root.build else {
        return Cell::new(root.description());
    };

    let mut lines = vec![format!("#{}", build.number)];
    if let Some(started) = build.started_at {
        lines.push(started.format("%Y-%m-%d %H:%M UTC").to_string());
    }
    lines.extend(
        build
            .unsensitive_parameters()
            .iter()
            .map(|(name, value)| format!("{name}={value}")),
    );

    Cell::new(lines.join("\n"))
}

fn stage_headers(first: &str, columns: usize) -> Vec<String> {
    std::iter::once(first.to_string())
        .chain((1..=columns).map(|col| format!("Stage {col}")))
        .collect()
}

fn render_grid<N>(
    grid: &Grid<&N>,
    first_header: &str,
    row_header: impl Fn(&N) -> Cell,
    cell: impl Fn(&N) -> Cell,
) -> String {
    debug!(
        "Rendering {} cells on a {}x{} grid",
        grid.occupied(),
        grid.rows(),
        grid.columns()
    );

    let mut rows: Vec<Vec<Cell>> = (0..grid.rows())
        .map(|row| {
            let header = grid
                .get(row, 0)
                .map_or_else(|| Cell::new(""), |root| row_header(*root));
            std::iter::once(header)
                .chain((0..grid.columns()).map(|_| Cell::new("")))
                .collect()
        })
        .collect();

    for (row, col, node) in grid.iter() {
        rows[row][col + 1] = cell(*node);
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&stage_headers(first_header, grid.columns())));
    for row in rows {
        table.add_row(row);
    }

    table.to_string()
}

fn render_pipelines(root_job: &str, grid: &Grid<&PipelineNode>, base_url: Option<&Url>) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🧭", "Build Pipeline");

    let pipelines = (0..grid.rows()).filter(|&row| grid.get(row, 0).is_some()).count();
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}",
        dim("First job:"),
        cyan(root_job),
        dim("Pipelines shown:"),
        bright_yellow(pipelines),
    );

    if grid.is_empty() {
        let _ = writeln!(output, "\n{}", bright_yellow("No builds found."));
        return output;
    }
    if let Some(latest) = grid.get(0, 0) {
        let _ = writeln!(
            output,
            "  {} {}",
            dim("Latest run:"),
            styled_status(latest.status)
        );
    }
    output.push('\n');

    let table = render_grid(grid, "Pipeline", pipeline_header_cell, |node| {
        pipeline_cell(node, base_url)
    });
    let _ = writeln!(output, "{table}");

    output
}

fn render_project(grid: &Grid<&ProjectNode>, base_url: Option<&Url>) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🗺️", "Pipeline Definition");

    let table = render_grid(
        grid,
        "First Job",
        |root| Cell::new(&root.name),
        |node| {
            let mut lines = vec![node.name.clone(), node.status.to_string()];
            if let Some(number) = node.last_build {
                lines.push(format!("last: #{number}"));
            }
            if let Some(number) = node.last_successful_build {
                lines.push(format!("last success: #{number}"));
            }
            if let Some(base_url) = base_url {
                lines.push(job_url(base_url, &node.name));
            }
            status_cell(lines.join("\n"), node.status)
        },
    );
    let _ = writeln!(output, "{table}");

    output
}

fn render_chain(chain: &[Build], base_url: Option<&Url>) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "🔗", "Downstream Chain");

    if chain.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No downstream builds found."));
        return output;
    }

    let mut headers = vec!["#", "Build", "Status", "Triggered By"];
    if base_url.is_some() {
        headers.push("Link");
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&headers));

    for (idx, build) in chain.iter().enumerate() {
        let status = PipelineStatus::of_build(build);
        let cause = build.causation().map_or_else(
            || "-".to_string(),
            |cause| format!("{} #{}", cause.upstream_job, cause.upstream_build),
        );

        let mut row = vec![
            Cell::new(idx + 1),
            Cell::new(build.to_string()),
            status_cell(status, status),
            Cell::new(cause),
        ];
        if let Some(base_url) = base_url {
            row.push(Cell::new(build_url(base_url, build.job(), build.number())));
        }
        table.add_row(row);
    }

    let _ = writeln!(output, "{table}");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{place_forest, place_tree};
    use crate::pipeline::{build_project_tree, LineageAssembler};
    use crate::store::testing::TestStore;
    use crate::store::{BuildResult, BuildStore};

    fn sample_trees() -> Vec<PipelineNode> {
        let store = TestStore::new()
            .job("compile", &["test", "deploy"])
            .job("test", &[])
            .job("deploy", &[])
            .manual("compile", "deploy")
            .build("compile", 1, BuildResult::Success, None)
            .build("compile", 2, BuildResult::Failure, None)
            .build("test", 1, BuildResult::Success, Some(("compile", 1)))
            .finish();
        let compile = store.job("compile").unwrap();
        LineageAssembler::new(&store)
            .build_pipeline_history(&compile, 5)
            .unwrap()
            .collect::<crate::error::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(350), "350 ms");
        assert_eq!(format_duration(42_000), "42 sec");
        assert_eq!(format_duration(65_000), "1 min 5 sec");
        assert_eq!(format_duration(7_380_000), "2 hr 3 min");
        assert_eq!(format_duration(-5), "0 ms");
    }

    #[test]
    fn test_render_pipelines_shows_every_node() {
        let trees = sample_trees();
        let output = render_pipelines("compile", &place_forest(&trees), None);

        assert!(output.contains("Build Pipeline"));
        assert!(output.contains("compile #2"));
        assert!(output.contains("compile #1"));
        assert!(output.contains("test #1"));
        assert!(output.contains("MANUAL"));
        assert!(output.contains("PENDING"));
        assert!(output.contains("Stage 2"));
    }

    #[test]
    fn test_render_pipelines_with_links() {
        let trees = sample_trees();
        let base = Url::parse("https://ci.example.com").unwrap();
        let output = render_pipelines("compile", &place_forest(&trees), Some(&base));

        assert!(output.contains("https://ci.example.com/job/test/1/"));
        assert!(output.contains("https://ci.example.com/job/deploy/"));
    }

    #[test]
    fn test_render_pipelines_without_history() {
        let trees: Vec<PipelineNode> = Vec::new();
        let output = render_pipelines("compile", &place_forest(&trees), None);
        assert!(output.contains("No builds found."));
    }

    #[test]
    fn test_render_pipelines_reports_latest_run_from_laid_out_grid() {
        let trees = sample_trees();
        let grid = place_forest(&trees);
        let output = console::strip_ansi_codes(&render_pipelines("compile", &grid, None)).into_owned();

        assert!(output.contains("Pipelines shown: 2"));
        assert!(output.contains("Latest run: FAILURE"));
    }

    #[test]
    fn test_pipeline_header_masks_sensitive_parameters() {
        let mut trees = sample_trees();
        let build = trees[0].build.as_mut().unwrap();
        build.parameters.insert("TOKEN".to_string(), "s3cret".to_string());
        build.parameters.insert("BRANCH".to_string(), "main".to_string());
        build.sensitive.push("TOKEN".to_string());

        let output = render_pipelines("compile", &place_forest(&trees), None);
        assert!(output.contains("TOKEN=********"));
        assert!(output.contains("BRANCH=main"));
        assert!(!output.contains("s3cret"));
    }

    #[test]
    fn test_render_project() {
        let store = TestStore::new()
            .job("compile", &["test"])
            .job("test", &[])
            .build("compile", 4, BuildResult::Success, None)
            .finish();
        let compile = store.job("compile").unwrap();
        let tree = build_project_tree(&store, &compile);

        let output = render_project(&place_tree(&tree), None);
        assert!(output.contains("Pipeline Definition"));
        assert!(output.contains("last success: #4"));
        assert!(output.contains("PENDING"));
    }

    #[test]
    fn test_render_chain() {
        let mut compile = Build::new("compile", 1);
        compile.result = Some(BuildResult::Success);
        let mut test = Build::new("test", 3);
        test.result = Some(BuildResult::Unstable);
        test.cause = Some(crate::store::Causation {
            upstream_job: "compile".to_string(),
            upstream_build: 1,
        });

        let output = render_chain(&[compile, test], None);
        assert!(output.contains("test #3"));
        assert!(output.contains("UNSTABLE"));
        assert!(output.contains("compile #1"));
        assert!(!output.contains("Link"));
    }

    #[test]
    fn test_render_chain_with_links() {
        let base = Url::parse("https://ci.example.com").unwrap();
        let output = render_chain(&[Build::new("compile", 7)], Some(&base));
        assert!(output.contains("Link"));
        assert!(output.contains("https://ci.example.com/job/compile/7/"));
        assert!(output.contains("BUILDING"));
    }

    #[test]
    fn test_render_empty_chain() {
        let output = render_chain(&[], None);
        assert!(output.contains("No downstream builds found."));
    }
}
