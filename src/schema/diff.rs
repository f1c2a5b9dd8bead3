use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::remote::{BaseSchema, Column, Table};
use crate::schema::title_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    pub ignore_case: bool,
    /// Surface tables and columns that only exist on the target.
    pub include_delete_ops: bool,
    /// Also compare the free-form `meta` and `validate` attributes.
    pub strict: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            include_delete_ops: false,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TableChange {
    Add { table: Table },
    Delete { table: Table },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ColumnChange {
    Add {
        table_title: String,
        column: Column,
    },
    Delete {
        table_title: String,
        column: Column,
    },
    Update {
        table_title: String,
        source: Column,
        target: Column,
        fields_changed: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDiff {
    pub table_changes: Vec<TableChange>,
    pub column_changes: Vec<ColumnChange>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.table_changes.is_empty() && self.column_changes.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.table_changes.len() + self.column_changes.len()
    }
}

/// Structural difference that turns `target` into `source`.
///
/// Tables and columns are matched by title, never by remote id. Output order
/// follows the source schema (then the target for deletions).
pub fn diff_schemas(source: &BaseSchema, target: &BaseSchema, options: DiffOptions) -> SchemaDiff {
    let source_tables = index_by_title(&source.tables, |t| &t.title, options.ignore_case);
    let target_tables = index_by_title(&target.tables, |t| &t.title, options.ignore_case);

    let mut diff = SchemaDiff::default();

    for (key, table) in &source_tables {
        if !target_tables.contains_key(key) {
            diff.table_changes.push(TableChange::Add {
                table: (*table).clone(),
            });
        }
    }
    if options.include_delete_ops {
        for (key, table) in &target_tables {
            if !source_tables.contains_key(key) {
                diff.table_changes.push(TableChange::Delete {
                    table: (*table).clone(),
                });
            }
        }
    }

    for (key, source_table) in &source_tables {
        let Some(target_table) = target_tables.get(key) else {
            continue;
        };
        diff_columns(source_table, target_table, options, &mut diff.column_changes);
    }

    diff
}

fn diff_columns(
    source_table: &Table,
    target_table: &Table,
    options: DiffOptions,
    out: &mut Vec<ColumnChange>,
) {
    let source_cols = index_by_title(&source_table.columns, |c| &c.title, options.ignore_case);
    let target_cols = index_by_title(&target_table.columns, |c| &c.title, options.ignore_case);

    for (key, source_col) in &source_cols {
        match target_cols.get(key) {
            None => out.push(ColumnChange::Add {
                table_title: source_table.title.clone(),
                column: (*source_col).clone(),
            }),
            Some(target_col) => {
                let fields_changed = changed_fields(source_col, target_col, options.strict);
                if !fields_changed.is_empty() {
                    out.push(ColumnChange::Update {
                        table_title: source_table.title.clone(),
                        source: (*source_col).clone(),
                        target: (*target_col).clone(),
                        fields_changed,
                    });
                }
            }
        }
    }

    if options.include_delete_ops {
        for (key, target_col) in &target_cols {
            if !source_cols.contains_key(key) {
                out.push(ColumnChange::Delete {
                    table_title: source_table.title.clone(),
                    column: (*target_col).clone(),
                });
            }
        }
    }
}

/// Later entries with the same key replace earlier ones but keep the first
/// entry's position.
fn index_by_title<'a, T>(
    items: &'a [T],
    title: impl Fn(&T) -> &String,
    ignore_case: bool,
) -> IndexMap<String, &'a T> {
    let mut map = IndexMap::with_capacity(items.len());
    for item in items {
        map.insert(title_key(title(item), ignore_case), item);
    }
    map
}

fn signature(column: &Column, strict: bool) -> Vec<(&'static str, Value)> {
    let mut fields = vec![
        ("title", json!(column.title)),
        ("uidt", json!(column.ui_type)),
        ("dt", json!(column.data_type)),
        ("rqd", json!(column.required.unwrap_or(false))),
        ("pk", json!(column.primary_key.unwrap_or(false))),
        ("ai", json!(column.auto_increment.unwrap_or(false))),
        ("un", json!(column.unsigned.unwrap_or(false))),
        ("unique", json!(column.unique.unwrap_or(false))),
    ];
    if strict {
        fields.push(("meta", column.meta.to_value()));
        fields.push(("validate", column.validate.to_value()));
    }
    fields
}

fn changed_fields(source: &Column, target: &Column, strict: bool) -> Vec<String> {
    signature(source, strict)
        .into_iter()
        .zip(signature(target, strict))
        .filter(|((_, left), (_, right))| left != right)
        .map(|((name, _), _)| name.to_string())
        .collect()
}
