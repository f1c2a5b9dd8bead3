use std::collections::HashMap;

use anyhow::Result;

use crate::error::AppError;
use crate::remote::BaseSchema;
use crate::schema::{PlanStep, title_key};

const TABLE_PLACEHOLDER: &str = "{tableId}";
const COLUMN_PLACEHOLDER: &str = "{columnId}";

#[derive(Debug, Clone, Default)]
struct TableRef {
    id: String,
    columns: HashMap<String, String>,
}

/// Title-keyed view of the target's ids, owned by a single apply run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    ignore_case: bool,
    tables: HashMap<String, TableRef>,
}

impl Snapshot {
    pub fn from_schema(schema: &BaseSchema, ignore_case: bool) -> Self {
        let mut snapshot = Self {
            ignore_case,
            tables: HashMap::new(),
        };
        snapshot.replace(schema);
        snapshot
    }

    /// Swap in a freshly fetched schema.
    pub fn replace(&mut self, schema: &BaseSchema) {
        self.tables.clear();
        for table in &schema.tables {
            let columns = table
                .columns
                .iter()
                .map(|col| (self.key(&col.title), col.id.clone()))
                .collect();
            let key = self.key(&table.title);
            self.tables.insert(
                key,
                TableRef {
                    id: table.id.clone(),
                    columns,
                },
            );
        }
    }

    /// Record a table created mid-run; its columns are unknown until the next
    /// refresh.
    pub fn insert_table(&mut self, title: &str, id: &str) {
        let key = self.key(title);
        self.tables.insert(
            key,
            TableRef {
                id: id.to_string(),
                columns: HashMap::new(),
            },
        );
    }

    pub fn table_id(&self, title: &str) -> Option<&str> {
        self.tables.get(&self.key(title)).map(|t| t.id.as_str())
    }

    pub fn column_id(&self, table_title: &str, column_title: &str) -> Option<&str> {
        self.tables
            .get(&self.key(table_title))?
            .columns
            .get(&self.key(column_title))
            .map(String::as_str)
    }

    /// Substitute `{tableId}` / `{columnId}` in the step URL.
    pub fn resolve_url(&self, step: &PlanStep) -> Result<String> {
        let mut url = step.request.url.clone();

        if url.contains(TABLE_PLACEHOLDER) {
            let table_title = step.meta.table_title.as_deref().ok_or_else(|| {
                AppError::resolution(format!(
                    "Step {} has no table title to resolve {}",
                    step.id, TABLE_PLACEHOLDER
                ))
            })?;
            let table_id = self.table_id(table_title).ok_or_else(|| {
                AppError::resolution(format!(
                    "Table '{}' not found in target; cannot resolve {}",
                    table_title, TABLE_PLACEHOLDER
                ))
            })?;
            url = url.replace(TABLE_PLACEHOLDER, table_id);
        }

        if url.contains(COLUMN_PLACEHOLDER) {
            let (Some(table_title), Some(column_title)) = (
                step.meta.table_title.as_deref(),
                step.meta.column_title.as_deref(),
            ) else {
                return Err(AppError::resolution(format!(
                    "Step {} needs table and column titles to resolve {}",
                    step.id, COLUMN_PLACEHOLDER
                ))
                .into());
            };
            let column_id = self.column_id(table_title, column_title).ok_or_else(|| {
                AppError::resolution(format!(
                    "Column '{}.{}' not found in target; cannot resolve {}",
                    table_title, column_title, COLUMN_PLACEHOLDER
                ))
            })?;
            url = url.replace(COLUMN_PLACEHOLDER, column_id);
        }

        Ok(url)
    }

    fn key(&self, title: &str) -> String {
        title_key(title, self.ignore_case)
    }
}
