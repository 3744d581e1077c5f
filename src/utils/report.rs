// src/utils/report.rs

//! Human-readable progress and summary output.
//!
//! Everything goes through the `log` facade at INFO level so the binary's
//! logger decides formatting and filtering.

const RULE_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("{}", format_step(step_num, total, message));
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(RULE_WIDTH));
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for line in format_items(items) {
        log::info!("{}", line);
    }
}

fn format_step(step_num: usize, total: usize, message: &str) -> String {
    format!("[{}/{}] {}", step_num, total, message)
}

fn format_items(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {:<width$} : {}", key, value, width = width))
        .collect()
}
