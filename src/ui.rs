use colored::Colorize;
use provisioning::{Severity, Status};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Status Trees
// ============================================================================

fn severity_marker(severity: Severity) -> String {
    match severity {
        Severity::Ok => "✓".green().to_string(),
        Severity::Info => "ℹ".blue().to_string(),
        Severity::Warning => "⚠".yellow().to_string(),
        Severity::Cancel => "⊘".magenta().to_string(),
        Severity::Error => "✗".red().to_string(),
    }
}

/// Render a status tree, one line per node with a severity marker
pub fn format_status(status: &Status) -> String {
    let mut out = String::new();
    format_node(status, 0, &mut out);
    out
}

fn format_node(status: &Status, depth: usize, out: &mut String) {
    let message = status.message().unwrap_or_else(|| status.severity().label());
    out.push_str(&"  ".repeat(depth));
    out.push_str(&severity_marker(status.severity()));
    out.push(' ');
    out.push_str(message);
    out.push('\n');
    for child in status.children() {
        format_node(child, depth + 1, out);
    }
}

/// Count the leaf problems of a status tree, `None` when there are none
pub fn problem_summary(status: &Status) -> Option<String> {
    let leaves: Vec<&Status> = status
        .flatten()
        .into_iter()
        .filter(|node| node.children().is_empty())
        .collect();
    let count = |severity: Severity| leaves.iter().filter(|n| n.severity() == severity).count();

    let parts: Vec<String> = [
        (count(Severity::Error), "error"),
        (count(Severity::Cancel), "cancellation"),
        (count(Severity::Warning), "warning"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, what)| format!("{n} {what}{}", if n == 1 { "" } else { "s" }))
    .collect();

    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Print a status tree, followed by a count of its problems
pub fn status(status: &Status) {
    print!("{}", format_status(status));
    if let Some(summary) = problem_summary(status) {
        dim(&summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status_tree() {
        colored::control::set_override(false);
        let status = Status::multi("Provisioning profile 'test' failed")
            .with(Status::error("Action 'native.mkdir' failed"))
            .with(Status::multi("Rollback").with(Status::warning("Could not remove /tmp/x")));

        let rendered = format_status(&status);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "✗ Provisioning profile 'test' failed");
        assert_eq!(lines[1], "  ✗ Action 'native.mkdir' failed");
        assert_eq!(lines[2], "  ⚠ Rollback");
        assert_eq!(lines[3], "    ⚠ Could not remove /tmp/x");
    }

    #[test]
    fn test_problem_summary_counts_leaves() {
        let status = Status::multi("Provisioning profile 'test' failed")
            .with(Status::error("Action 'native.mkdir' failed"))
            .with(
                Status::multi("Rollback")
                    .with(Status::warning("Could not remove /tmp/x"))
                    .with(Status::warning("Could not remove /tmp/y")),
            );

        assert_eq!(problem_summary(&status).as_deref(), Some("1 error, 2 warnings"));
        assert_eq!(problem_summary(&Status::ok()), None);
        assert_eq!(problem_summary(&Status::info("noted")), None);
    }

    #[test]
    fn test_plain_ok_uses_label() {
        colored::control::set_override(false);
        assert_eq!(format_status(&Status::ok()).trim_end(), format!("✓ {}", Severity::Ok.label()));
    }
}
