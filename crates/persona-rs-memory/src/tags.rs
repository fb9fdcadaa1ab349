//! Tolerant parsing of tagged oracle answers.
//!
//! Oracle replies are free text that is expected to contain XML-like tags such
//! as `<save>true</save>`. Tags are matched case-insensitively, may span
//! several lines and may be surrounded by arbitrary prose. Anything missing or
//! malformed yields `None` so callers can fall back to their defaults.

/// Return the trimmed content of the first `<name>...</name>` block.
pub fn extract_tag(raw: &str, name: &str) -> Option<String> {
    extract_tags(raw, name).into_iter().next()
}

/// Return the trimmed content of every `<name>...</name>` block, in order.
pub fn extract_tags(raw: &str, name: &str) -> Vec<String> {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let lowered = raw.to_ascii_lowercase();
    let open = format!("<{}>", name.to_ascii_lowercase());
    let close = format!("</{}>", name.to_ascii_lowercase());
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(start) = lowered[cursor..].find(&open) {
        let body_start = cursor + start + open.len();
        let Some(end) = lowered[body_start..].find(&close) else {
            break;
        };
        let body_end = body_start + end;
        found.push(raw[body_start..body_end].trim().to_string());
        cursor = body_end + close.len();
    }
    found
}

/// Parse a boolean tag. Accepts `true/false` and `yes/no`.
pub fn extract_flag(raw: &str, name: &str) -> Option<bool> {
    let value = extract_tag(raw, name)?;
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}

/// Return the body of a markdown `### HEADING` section.
///
/// The section ends at the next markdown heading or at the end of input.
pub fn extract_section(raw: &str, heading: &str) -> Option<String> {
    let mut lines = raw.lines();
    lines.by_ref().find(|line| {
        line.trim_start()
            .strip_prefix("###")
            .is_some_and(|title| title.trim().eq_ignore_ascii_case(heading))
    })?;
    let body = lines
        .take_while(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}
