//! Plain-text layout of comparison results.
//!
//! Mirrors the form page: a single model shows its answer above two
//! side-by-side evaluation tables; `all` shows the two evaluation columns
//! (one table per strategy) above every strategy's answer.

use rageval_rag::protocol::{ModelSelection, StrategyView};

use crate::client::Outcome;

pub const NO_LLM_METRICS: &str = "No LLM evaluation metrics available.";
pub const NO_RETRIEVER_METRICS: &str = "No Retriever evaluation metrics available.";

const COLUMN_GAP: usize = 4;

fn width(line: &str) -> usize {
    line.chars().count()
}

/// A one-column table of metrics, or `empty` when there are none.
pub fn metric_table(metrics: &[String], empty: &str) -> Vec<String> {
    if metrics.is_empty() {
        return vec![empty.to_string()];
    }
    let inner = metrics.iter().map(|m| width(m)).chain([width("Metric")]).max().unwrap_or(0);
    let rule = format!("+{}+", "-".repeat(inner + 2));
    let row = |text: &str| format!("| {}{} |", text, " ".repeat(inner - width(text)));

    let mut lines = vec![rule.clone(), row("Metric"), rule.clone()];
    lines.extend(metrics.iter().map(|m| row(m)));
    lines.push(rule);
    lines
}

/// Place two blocks of lines next to each other.
pub fn side_by_side(left: &[String], right: &[String]) -> Vec<String> {
    let left_width = left.iter().map(|l| width(l)).max().unwrap_or(0);
    (0..left.len().max(right.len()))
        .map(|i| {
            let l = left.get(i).map(String::as_str).unwrap_or("");
            let r = right.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(left_width - width(l) + COLUMN_GAP);
            format!("{l}{padding}{r}").trim_end().to_string()
        })
        .collect()
}

fn heading(title: &str) -> Vec<String> {
    vec![title.to_string(), "=".repeat(width(title))]
}

/// One evaluation column: a titled table per strategy.
fn eval_column(
    title: &str,
    views: &[StrategyView],
    metrics: fn(&StrategyView) -> &[String],
    empty: &str,
    named: bool,
) -> Vec<String> {
    let mut lines = heading(title);
    for view in views {
        if named {
            lines.push(format!("{}:", view.strategy.label()));
        }
        lines.extend(metric_table(metrics(view), empty));
        lines.push(String::new());
    }
    lines
}

fn llm_metrics(view: &StrategyView) -> &[String] {
    &view.llm_eval
}

fn retriever_metrics(view: &StrategyView) -> &[String] {
    &view.retriever_eval
}

fn evaluations(views: &[StrategyView], named: bool) -> Vec<String> {
    let llm = eval_column("LLM Evaluation", views, llm_metrics, NO_LLM_METRICS, named);
    let retriever = eval_column(
        "Retriever Evaluation",
        views,
        retriever_metrics,
        NO_RETRIEVER_METRICS,
        named,
    );
    side_by_side(&llm, &retriever)
}

/// Lay out the results of one submission.
pub fn render_results(selection: ModelSelection, views: &[StrategyView]) -> String {
    let mut lines = Vec::new();
    match selection {
        ModelSelection::All => {
            lines.extend(evaluations(views, true));
            lines.extend(heading("Responses"));
            for view in views {
                lines.push(format!("Response from {}:", view.strategy.label()));
                lines.push(view.response.clone());
                lines.push(String::new());
            }
        }
        ModelSelection::Single(_) => {
            for view in views {
                lines.extend(heading(&format!("Response from {}", view.strategy.label())));
                lines.push(view.response.clone());
                lines.push(String::new());
            }
            lines.extend(evaluations(views, false));
        }
    }
    let mut text = lines.join("\n").trim_end().to_string();
    text.push('\n');
    text
}

/// Render any outcome, warnings and errors included.
pub fn render_outcome(selection: ModelSelection, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Results(views) => render_results(selection, views),
        Outcome::Warning(message) => format!("warning: {message}\n"),
        Outcome::Failed(message) => format!("{message}\n"),
    }
}
