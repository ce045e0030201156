use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::transaction::{
    Annotation, ChangeSpec, Edit, Selection, Transaction, TransactionError,
};

/// Error type for reading transaction files
#[derive(Debug, thiserror::Error)]
pub enum TransactionFileError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse transaction: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid transaction: {0}")]
    Invalid(#[from] TransactionError),
    #[error("give either `changes`, or `newDoc` with `edits`, not both")]
    Ambiguous,
}

/// A pending transaction as JSON.
///
/// Either `changes` (start-document coordinates, the new document is computed) or
/// `newDoc` plus `edits` as reported by a host.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFile {
    pub doc: String,
    #[serde(default)]
    pub changes: Vec<ChangeSpec>,
    #[serde(default)]
    pub new_doc: Option<String>,
    #[serde(default)]
    pub edits: Vec<Edit>,
    #[serde(default)]
    pub user_event: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

impl TransactionFile {
    pub fn into_transaction(self) -> Result<Transaction, TransactionFileError> {
        let mut tr = match self.new_doc {
            Some(new_doc) => {
                if !self.changes.is_empty() {
                    return Err(TransactionFileError::Ambiguous);
                }
                Transaction::with_docs(self.doc, new_doc, self.edits)
            }
            None => {
                if !self.edits.is_empty() {
                    return Err(TransactionFileError::Ambiguous);
                }
                Transaction::from_edits(self.doc, self.changes)?
            }
        };
        tr.user_event = self.user_event;
        tr.annotations = self.annotations;
        tr.selection = self.selection;
        Ok(tr)
    }
}

pub fn parse_transaction(text: &str) -> Result<Transaction, TransactionFileError> {
    let file: TransactionFile = serde_json::from_str(text)?;
    file.into_transaction()
}

pub fn read_transaction(path: &Path) -> Result<Transaction, TransactionFileError> {
    let text = fs::read_to_string(path).map_err(|e| TransactionFileError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_transaction(&text)
}
