//! Scoped blob-store transactions.
//!
//! A transaction buffers inserts and deletes and hands them to a store's
//! `commit`, which applies the whole batch under one lock. Either every
//! operation lands or none does.

use formsafe_core::file::{FileId, NewFileRecord};

#[derive(Debug, Clone)]
pub enum BlobOp {
    Insert(NewFileRecord),
    DeleteField { form_id: String, field_name: String },
    DeleteForm { form_id: String },
}

impl BlobOp {
    /// Whether an existing record is removed by this op.
    pub fn deletes(&self, form_id: &str, field_name: &str) -> bool {
        match self {
            BlobOp::Insert(_) => false,
            BlobOp::DeleteField {
                form_id: f,
                field_name: n,
            } => f == form_id && n == field_name,
            BlobOp::DeleteForm { form_id: f } => f == form_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlobTransaction {
    ops: Vec<BlobOp>,
}

impl BlobTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, record: NewFileRecord) -> Self {
        self.ops.push(BlobOp::Insert(record));
        self
    }

    pub fn delete_field(mut self, form_id: &str, field_name: &str) -> Self {
        self.ops.push(BlobOp::DeleteField {
            form_id: form_id.to_string(),
            field_name: field_name.to_string(),
        });
        self
    }

    pub fn delete_form(mut self, form_id: &str) -> Self {
        self.ops.push(BlobOp::DeleteForm {
            form_id: form_id.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BlobOp> {
        self.ops
    }
}

/// What a committed transaction did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Ids assigned to inserts, in op order
    pub inserted: Vec<FileId>,
    pub deleted: usize,
}
