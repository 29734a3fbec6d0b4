//! Small text helpers shared by the pipeline.

/// Strip a single outer Markdown code fence from a model response.
///
/// Handles fenced blocks with an optional language tag (` ```markdown `) as
/// well as bare fences, returning the trimmed inner content. Text without an
/// enclosing fence is returned trimmed and otherwise untouched.
pub fn strip_code_fences(payload: &str) -> String {
    let trimmed = payload.trim();
    if let Some(inner) = tagged_fence_body(trimmed) {
        return inner.trim().to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

/// Body of a fenced block whose opening line carries only a language tag,
/// or `None` when the input is not shaped that way.
fn tagged_fence_body(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix("```")?;
    let newline = rest.find('\n')?;
    let tag = &rest[..newline];
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
    {
        return None;
    }
    let body = rest[newline + 1..].strip_suffix("```")?;
    Some(body.strip_suffix('\n').unwrap_or(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let input = "```markdown\n# Notes\n\n- point\n```";
        assert_eq!(strip_code_fences(input), "# Notes\n\n- point");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fences("```\nplain body\n```"), "plain body");
    }

    #[test]
    fn strips_single_line_fence() {
        assert_eq!(strip_code_fences("```inner```"), "inner");
    }

    #[test]
    fn accepts_tags_with_plus_and_dash() {
        assert_eq!(strip_code_fences("```c++\ncode\n```"), "code");
        assert_eq!(strip_code_fences("```objective-c\ncode\n```"), "code");
    }

    #[test]
    fn strips_tagged_fence_without_trailing_newline() {
        assert_eq!(strip_code_fences("```srt\n1\n00:00:00,000```"), "1\n00:00:00,000");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  hello world \n"), "hello world");
    }

    #[test]
    fn interior_fences_are_preserved_when_not_enclosing() {
        let input = "before ```x``` after";
        assert_eq!(strip_code_fences(input), "before ```x``` after");
    }

    #[test]
    fn surrounding_whitespace_inside_fence_is_trimmed() {
        assert_eq!(strip_code_fences("```\n\n  body  \n\n```"), "body");
    }

    #[test]
    fn lone_fence_is_untouched() {
        assert_eq!(strip_code_fences("```"), "```");
    }
}
