//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of one
//! exploration run: run metadata, graph size, depth breakdown, failures.

use crate::output::traits::RunSummary;

/// Formats a run summary as markdown
///
/// # Arguments
///
/// * `summary` - The run summary data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Sumi-Atlas Exploration Summary ({})\n\n", summary.engine));

    // Run metadata
    md.push_str("## Run Information\n\n");
    if let Some(run_id) = summary.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    md.push_str(&format!("- **Root URL**: {}\n", summary.root_url));
    md.push_str(&format!("- **Engine**: {}\n", summary.engine));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Stopped**: {}\n", summary.stop_reason));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Overall statistics
    md.push_str("## State Graph\n\n");
    md.push_str(&format!("- **States**: {}\n", summary.states));
    md.push_str(&format!("- **Transitions**: {}\n", summary.transitions));
    md.push_str(&format!("- **Failed Attempts**: {}\n", summary.failures));
    md.push_str(&format!(
        "- **Failure Rate**: {:.2}%\n\n",
        summary.failure_rate()
    ));

    if !summary.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | States |\n");
        md.push_str("|-------|--------|\n");
        for (depth, count) in &summary.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !summary.failure_summary.is_empty() {
        md.push_str("## Failure Summary\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for (kind, count) in &summary.failure_summary {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push_str("\nDetails in `failures.json`.\n\n");
    }

    md.push_str("## Artifacts\n\n");
    md.push_str("- `graph.json`: nodes and links of the reachability graph\n");
    md.push_str("- `snapshots/<identity>.html`: one DOM snapshot per state\n");
    md.push_str("- `failures.json`: failed render and action attempts\n");

    md
}
