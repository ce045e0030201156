use serde::{Deserialize, Serialize};

use super::document::Text;

/// Value carried by the annotation on edits produced by status cycling
pub const TASK_STATUS_CHANGE: &str = "taskStatusChange";

/// Error type for building and applying transactions
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("change {from}..{to} is out of range for a document of length {len}")]
    OutOfRange { from: usize, to: usize, len: usize },
    #[error("changes overlap at offset {0}")]
    Overlapping(usize),
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// One atomic change inside a transaction.
///
/// `[from_a, to_a)` is the replaced range in the old document, `[from_b, to_b)` the
/// range the inserted text occupies in the new document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    pub from_a: usize,
    pub to_a: usize,
    pub from_b: usize,
    pub to_b: usize,
    pub inserted: String,
}

impl Edit {
    pub fn new(from_a: usize, to_a: usize, from_b: usize, to_b: usize, inserted: &str) -> Self {
        Edit {
            from_a,
            to_a,
            from_b,
            to_b,
            inserted: inserted.to_string(),
        }
    }

    /// Removes text and inserts nothing
    pub fn is_deletion(&self) -> bool {
        self.inserted.is_empty() && self.to_a > self.from_a
    }

    /// Overwrites an existing range
    pub fn is_replacement(&self) -> bool {
        self.from_a != self.to_a
    }

    /// The text this edit removes from `doc` (the old document)
    pub fn deleted<'a>(&self, doc: &'a Text) -> &'a str {
        doc.slice(self.from_a, self.to_a)
    }
}

/// A change expressed against the start document, as returned to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSpec {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl ChangeSpec {
    pub fn new(from: usize, to: usize, insert: &str) -> Self {
        ChangeSpec {
            from,
            to,
            insert: insert.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection {
            anchor: pos,
            head: pos,
        }
    }
}

/// Provenance tag attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Annotation {
    /// Produced by status cycling or the status switcher
    TaskStatusChange(String),
    /// Produced by the priority picker
    PriorityChange(String),
    Other { name: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    TaskStatusChange,
    PriorityChange,
    Other,
}

impl Annotation {
    pub fn task_status_change() -> Self {
        Annotation::TaskStatusChange(TASK_STATUS_CHANGE.to_string())
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::TaskStatusChange(_) => AnnotationKind::TaskStatusChange,
            Annotation::PriorityChange(_) => AnnotationKind::PriorityChange,
            Annotation::Other { .. } => AnnotationKind::Other,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Annotation::TaskStatusChange(v) | Annotation::PriorityChange(v) => v,
            Annotation::Other { value, .. } => value,
        }
    }
}

/// A proposed batch of edits plus metadata, intercepted before the host applies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub start_doc: Text,
    pub new_doc: Text,
    /// Edits in document order
    pub changes: Vec<Edit>,
    pub selection: Option<Selection>,
    /// Dotted user-event name such as `input.type` or `input.paste`
    pub user_event: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl Transaction {
    /// Build a transaction by applying `changes` (start-document coordinates) to `start`.
    pub fn from_edits(
        start: impl Into<Text>,
        changes: Vec<ChangeSpec>,
    ) -> Result<Transaction, TransactionError> {
        let start_doc = start.into();
        let (new_doc, edits) = apply_changes(&start_doc, changes)?;
        Ok(Transaction {
            start_doc,
            new_doc,
            changes: edits,
            selection: None,
            user_event: None,
            annotations: Vec::new(),
        })
    }

    /// Build a transaction from documents and edits already computed by a host.
    pub fn with_docs(start: impl Into<Text>, new: impl Into<Text>, changes: Vec<Edit>) -> Self {
        Transaction {
            start_doc: start.into(),
            new_doc: new.into(),
            changes,
            selection: None,
            user_event: None,
            annotations: Vec::new(),
        }
    }

    /// The transaction a host dispatches when a filter hands back `spec`.
    pub fn from_spec(start: impl Into<Text>, spec: &TransactionSpec) -> Result<Self, TransactionError> {
        let mut tr = Transaction::from_edits(start, spec.changes.clone())?;
        tr.selection = spec.selection;
        tr.annotations.push(spec.annotation.clone());
        Ok(tr)
    }

    pub fn with_user_event(mut self, event: &str) -> Self {
        self.user_event = Some(event.to_string());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn doc_changed(&self) -> bool {
        self.changes
            .iter()
            .any(|e| e.from_a != e.to_a || !e.inserted.is_empty())
    }

    /// Matches `name` exactly or as a dotted prefix (`input` matches `input.paste`).
    pub fn is_user_event(&self, name: &str) -> bool {
        match &self.user_event {
            Some(event) => {
                event == name
                    || (event.len() > name.len()
                        && event.starts_with(name)
                        && event.as_bytes()[name.len()] == b'.')
            }
            None => false,
        }
    }

    pub fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }
}

/// Replacement transaction returned by a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSpec {
    pub changes: Vec<ChangeSpec>,
    pub selection: Option<Selection>,
    pub annotation: Annotation,
    /// At least one change moves a task to `x`/`X`
    pub completes_task: bool,
}

impl TransactionSpec {
    /// Apply the changes to the document they were expressed against.
    pub fn apply_to(&self, doc: &Text) -> Result<Text, TransactionError> {
        apply_changes(doc, self.changes.clone()).map(|(text, _)| text)
    }
}

/// Apply changes in start-document coordinates, returning the new document and the
/// resulting edits with their new-document positions.
pub fn apply_changes(
    doc: &Text,
    mut changes: Vec<ChangeSpec>,
) -> Result<(Text, Vec<Edit>), TransactionError> {
    changes.sort_by_key(|c| (c.from, c.to));

    let src = doc.as_str();
    let mut out = String::with_capacity(src.len());
    let mut edits = Vec::with_capacity(changes.len());
    let mut cursor = 0;

    for change in changes {
        if change.from > change.to || change.to > src.len() {
            return Err(TransactionError::OutOfRange {
                from: change.from,
                to: change.to,
                len: src.len(),
            });
        }
        if change.from < cursor {
            return Err(TransactionError::Overlapping(change.from));
        }
        for pos in [change.from, change.to] {
            if !src.is_char_boundary(pos) {
                return Err(TransactionError::NotCharBoundary(pos));
            }
        }

        out.push_str(&src[cursor..change.from]);
        let from_b = out.len();
        out.push_str(&change.insert);
        edits.push(Edit {
            from_a: change.from,
            to_a: change.to,
            from_b,
            to_b: out.len(),
            inserted: change.insert,
        });
        cursor = change.to;
    }
    out.push_str(&src[cursor..]);

    Ok((Text::new(out), edits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edits_replacement() {
        let tr = Transaction::from_edits("- [ ] Task", vec![ChangeSpec::new(3, 4, "x")]).unwrap();
        assert_eq!(tr.new_doc.as_str(), "- [x] Task");
        assert_eq!(tr.changes, vec![Edit::new(3, 4, 3, 4, "x")]);
        assert!(tr.doc_changed());
    }

    #[test]
    fn test_from_edits_tracks_shifted_positions() {
        let tr = Transaction::from_edits(
            "- [ ] a\n- [ ] b",
            vec![ChangeSpec::new(8, 8, "    "), ChangeSpec::new(0, 0, "    ")],
        )
        .unwrap();
        assert_eq!(tr.new_doc.as_str(), "    - [ ] a\n    - [ ] b");
        assert_eq!(tr.changes[0], Edit::new(0, 0, 0, 4, "    "));
        assert_eq!(tr.changes[1], Edit::new(8, 8, 12, 16, "    "));
    }

    #[test]
    fn test_from_edits_rejects_bad_input() {
        assert_eq!(
            Transaction::from_edits("abc", vec![ChangeSpec::new(2, 9, "")]).unwrap_err(),
            TransactionError::OutOfRange {
                from: 2,
                to: 9,
                len: 3
            }
        );
        assert_eq!(
            Transaction::from_edits("abcdef", vec![ChangeSpec::new(0, 3, ""), ChangeSpec::new(2, 4, "")])
                .unwrap_err(),
            TransactionError::Overlapping(2)
        );
        assert_eq!(
            Transaction::from_edits("[✅]", vec![ChangeSpec::new(2, 3, "x")]).unwrap_err(),
            TransactionError::NotCharBoundary(2)
        );
    }

    #[test]
    fn test_doc_changed_false_without_edits() {
        let tr = Transaction::from_edits("text", vec![]).unwrap();
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_is_user_event_prefix_semantics() {
        let tr = Transaction::with_docs("", "", vec![]).with_user_event("input.paste");
        assert!(tr.is_user_event("input.paste"));
        assert!(tr.is_user_event("input"));
        assert!(!tr.is_user_event("input.pas"));
        assert!(!tr.is_user_event("set"));
    }

    #[test]
    fn test_annotation_lookup() {
        let tr = Transaction::with_docs("", "", vec![])
            .with_annotation(Annotation::PriorityChange("priorityChange".into()));
        assert!(tr.annotation(AnnotationKind::PriorityChange).is_some());
        assert!(tr.annotation(AnnotationKind::TaskStatusChange).is_none());
    }

    #[test]
    fn test_from_spec_carries_annotation_and_selection() {
        let spec = TransactionSpec {
            changes: vec![ChangeSpec::new(3, 4, "/")],
            selection: Some(Selection::cursor(4)),
            annotation: Annotation::task_status_change(),
            completes_task: false,
        };
        let tr = Transaction::from_spec("- [ ] Task", &spec).unwrap();
        assert_eq!(tr.new_doc.as_str(), "- [/] Task");
        assert_eq!(tr.selection, Some(Selection::cursor(4)));
        assert_eq!(
            tr.annotation(AnnotationKind::TaskStatusChange).map(|a| a.value()),
            Some(TASK_STATUS_CHANGE)
        );
    }
}
