//! Minimal line diff rendering for fix previews.

/// Render a `-`/`+` line diff between two snippets. Unchanged lines are
/// emitted with a two-space prefix; this is a preview format, not a patch
/// format.
pub fn render_diff(before: &str, after: &str) -> String {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let common_prefix = before_lines
        .iter()
        .zip(after_lines.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let common_suffix = before_lines[common_prefix..]
        .iter()
        .rev()
        .zip(after_lines[common_prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = Vec::new();
    for line in &before_lines[..common_prefix] {
        out.push(format!("  {line}"));
    }
    for line in &before_lines[common_prefix..before_lines.len() - common_suffix] {
        out.push(format!("- {line}"));
    }
    for line in &after_lines[common_prefix..after_lines.len() - common_suffix] {
        out.push(format!("+ {line}"));
    }
    for line in &before_lines[before_lines.len() - common_suffix..] {
        out.push(format!("  {line}"));
    }
    out.join("\n")
}
