use std::sync::LazyLock;

use regex::Regex;

/// A list item with a checkbox at the start of a line. Group 1 is the bullet or
/// ordinal, group 2 the mark.
static TASK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s\t]*([-*+]|\d+\.)\s+\[(.)\]").unwrap());

/// A freshly typed bullet and opening bracket, with or without the closing bracket
static TASK_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[\s\t]*(?:[-*+]|\d+\.)\s+\[.(?:\])?)").unwrap());

/// A bullet followed by a checkbox anywhere in the text
static TASK_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:-|\*|\+|\d+\.)\s\[.\]").unwrap());

static ORDERED_EMPTY_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+\[\s\]").unwrap());

/// The first checkbox in a span
static CHECKBOX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.)\]").unwrap());

/// Task lines as the status switcher sees them: indent, bullet with its trailing space,
/// checkbox with its trailing space, mark.
static SWITCHER_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)((?:[-*+]|\d+[.)])\s)(\[(.)]\s)").unwrap());

/// Glyphs the Tasks plugin writes when it records done/cancelled/start/due dates
const THIRD_PARTY_GLYPHS: [char; 4] = ['✅', '❌', '🛫', '📅'];

/// A parsed checkbox at the start of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMatch<'a> {
    /// `-`, `*`, `+` or an ordinal like `3.`
    pub bullet: &'a str,
    pub mark: &'a str,
    /// Byte offset of the mark within the line
    pub mark_offset: usize,
}

/// Match `line` against the task-line grammar.
pub fn match_task_line(line: &str) -> Option<TaskMatch<'_>> {
    let caps = TASK_LINE_RE.captures(line)?;
    let bullet = caps.get(1)?;
    let mark = caps.get(2)?;
    Some(TaskMatch {
        bullet: bullet.as_str(),
        mark: mark.as_str(),
        mark_offset: mark.start(),
    })
}

pub fn is_task_line(line: &str) -> bool {
    TASK_LINE_RE.is_match(line)
}

/// A task line whose mark is `x` or `X`
pub fn is_completed_task_line(line: &str) -> bool {
    match_task_line(line).is_some_and(|t| t.mark.eq_ignore_ascii_case("x"))
}

/// The text after a task line's checkbox, trimmed
pub fn task_body(line: &str) -> Option<&str> {
    TASK_LINE_RE.find(line).map(|m| line[m.end()..].trim())
}

/// Whether `text` looks like a whole task being inserted at once (`- [x`, `1. [ ]`)
pub fn is_task_prefix(text: &str) -> bool {
    TASK_PREFIX_RE.is_match(text)
}

/// Whether `text` contains a bullet and checkbox anywhere
pub fn has_task_marker(text: &str) -> bool {
    TASK_MARKER_RE.is_match(text)
}

/// Whether `text` creates a new, empty task
pub fn is_fresh_task_creation(text: &str) -> bool {
    text.contains("- [ ]")
        || text.contains("* [ ]")
        || text.contains("+ [ ]")
        || ORDERED_EMPTY_TASK_RE.is_match(text)
}

pub fn has_third_party_glyph(text: &str) -> bool {
    text.contains(THIRD_PARTY_GLYPHS)
}

/// Offset just inside the first `[` of `line`, or 0 when there is none.
pub fn bracket_interior(line: &str) -> usize {
    line.find('[').map(|i| i + 1).unwrap_or(0)
}

/// Markdown link shape as inserted by link autocompletion: `[text](url)`
pub fn is_markdown_link(text: &str) -> bool {
    text.starts_with('[') && text.contains("](") && text.ends_with(')')
}

/// The first checkbox in `text`: the byte range of its mark and the mark itself.
pub fn find_checkbox(text: &str) -> Option<(std::ops::Range<usize>, &str)> {
    let mark = CHECKBOX_RE.captures(text)?.get(1)?;
    Some((mark.range(), mark.as_str()))
}

/// A task line as seen by the status switcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitcherTask<'a> {
    /// Byte range from the bullet through the closing `]`
    pub span: std::ops::Range<usize>,
    /// Bullet without its trailing space
    pub bullet: &'a str,
    pub mark: &'a str,
}

pub fn match_switcher_task(line: &str) -> Option<SwitcherTask<'_>> {
    let caps = SWITCHER_TASK_RE.captures(line)?;
    let bullet = caps.get(2)?;
    let checkbox = caps.get(3)?;
    Some(SwitcherTask {
        span: bullet.start()..checkbox.start() + checkbox.as_str().trim_end().len(),
        bullet: bullet.as_str().trim(),
        mark: caps.get(4)?.as_str(),
    })
}
