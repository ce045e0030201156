/// An immutable document snapshot with line lookup.
///
/// Offsets are byte offsets into the UTF-8 content. Lines are separated by `\n`;
/// the separator belongs to neither line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    content: String,
    /// Byte offset of the first character of each line
    line_starts: Vec<usize>,
}

/// A single line of a [`Text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Offset of the first character
    pub from: usize,
    /// Offset just past the last character (before the `\n`)
    pub to: usize,
    /// 1-based line number
    pub number: usize,
    pub text: &'a str,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Text {
            content,
            line_starts,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The line containing `pos`. Positions past the end are clamped to the last line.
    pub fn line_at(&self, pos: usize) -> Line<'_> {
        let pos = pos.min(self.content.len());
        let idx = self.line_starts.partition_point(|&start| start <= pos) - 1;
        self.line_by_index(idx)
    }

    /// Line by 1-based number, if it exists.
    pub fn line(&self, number: usize) -> Option<Line<'_>> {
        if number == 0 || number > self.line_starts.len() {
            return None;
        }
        Some(self.line_by_index(number - 1))
    }

    fn line_by_index(&self, idx: usize) -> Line<'_> {
        let from = self.line_starts[idx];
        let to = match self.line_starts.get(idx + 1) {
            Some(next) => next - 1,
            None => self.content.len(),
        };
        Line {
            from,
            to,
            number: idx + 1,
            text: &self.content[from..to],
        }
    }

    /// Slice `[from, to)`. Out-of-range or non-boundary requests yield an empty string.
    pub fn slice(&self, from: usize, to: usize) -> &str {
        let to = to.min(self.content.len());
        if from >= to {
            return "";
        }
        self.content.get(from..to).unwrap_or("")
    }

    /// The character starting at `pos`, if `pos` is on a char boundary.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.content.get(pos..)?.chars().next()
    }

    pub fn is_char_boundary(&self, pos: usize) -> bool {
        self.content.is_char_boundary(pos)
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text::new(s)
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text::new(s)
    }
}

impl std::fmt::Display for Text {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content)
    }
}
