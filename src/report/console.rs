use crate::graph::script_graph::ScriptGraph;
use crate::navigation::error::format_ids;
use crate::report::report_model::{RunReport, RunStatus};
use crate::screen::screen_model::ScreenId;

// ============================================================================
// Console reporter
// ============================================================================

/// Format a run report for terminal output.
///
/// Produces output like:
/// ```text
/// === conf_orbot (org.torproject.android 16.6.3 RC 1) ===
///
///   1. s0 (0) --start_tor--> [1]
///
/// ✓ REACHED  s1 (1) after 1 transitions, 3 probes in 4.2s
/// ```
pub fn format_run_report(report: &RunReport, graph: &ScriptGraph) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== {} ({} {}) ===\n\n",
        report.app_title, report.package_name, report.version
    ));

    for (i, record) in report.history.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} --{}--> {}\n",
            i + 1,
            screen_label(graph, record.screen),
            record.action_list,
            format_ids(&record.expected_next)
        ));
    }
    if !report.history.is_empty() {
        out.push('\n');
    }

    match report.status {
        RunStatus::Reached => {
            let reached = report
                .reached
                .map(|id| screen_label(graph, id))
                .unwrap_or_default();
            out.push_str(&format!("\u{2713} REACHED  {}", reached));
        }
        RunStatus::Cancelled => {
            out.push_str("- CANCELLED");
            if let Some(last) = report.last_screen {
                out.push_str(&format!("  last screen {}", screen_label(graph, last)));
            }
        }
        RunStatus::Failed => {
            out.push_str("\u{2717} FAILED");
            if let Some(last) = report.last_screen {
                out.push_str(&format!("  last screen {}", screen_label(graph, last)));
            }
        }
    }

    out.push_str(&format!(
        " after {} transitions, {} probes",
        report.history.len(),
        report.probes
    ));
    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }
    out.push('\n');

    if let Some(ref error) = report.error {
        out.push_str(&format!("    [ERROR] {}\n", error));
    }
    if let Some(ref path) = report.export {
        out.push_str(&format!("    [EXPORT] {}\n", path.display()));
    }

    out
}

/// Format the nodes and transitions of a graph, one per line.
pub fn format_graph(graph: &ScriptGraph) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} screens, {} transitions\n\n",
        graph.screen_count(),
        graph.transition_count()
    ));

    for node in graph.screens() {
        let d = &node.descriptor;
        let mut flags = Vec::new();
        if node.is_start {
            flags.push("start");
        }
        if node.is_end {
            flags.push("end");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };

        out.push_str(&format!(
            "{}{}: {} required, {} optional, {} retries every {}s\n",
            d,
            flags,
            d.required_elements.len(),
            d.optional_elements.len(),
            d.max_retries,
            d.wait.as_secs()
        ));
        for fp in &d.required_elements {
            out.push_str(&format!("    + {}\n", fp));
        }
        for fp in &d.optional_elements {
            out.push_str(&format!("    ? {}\n", fp));
        }
        for t in graph.transitions_from(d.id) {
            for list in &t.action_lists {
                let steps: Vec<String> = list.actions.iter().map(|a| a.describe()).collect();
                out.push_str(&format!(
                    "    -> {} via {} [{}]\n",
                    screen_label(graph, t.to),
                    list.name,
                    steps.join("; ")
                ));
            }
        }
    }

    out
}

fn screen_label(graph: &ScriptGraph, id: ScreenId) -> String {
    match graph.screen(id) {
        Some(d) => d.to_string(),
        None => id.to_string(),
    }
}
