use std::sync::OnceLock;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::AppError;
use crate::remote::{
    ApiRequest, Column, EnvironmentConfig, HttpMethod, Table, normalize_base_url, redacted_headers,
};
use crate::schema::diff::{ColumnChange, SchemaDiff, TableChange};
use crate::schema::naming::safe_db_name;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    TableAdd,
    TableDelete,
    ColAdd,
    ColUpdate,
    ColDelete,
    /// Any other `op`, kept verbatim so it survives re-export.
    Other(String),
}

impl OperationKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "table_add" => OperationKind::TableAdd,
            "table_delete" => OperationKind::TableDelete,
            "col_add" => OperationKind::ColAdd,
            "col_update" => OperationKind::ColUpdate,
            "col_delete" => OperationKind::ColDelete,
            other => OperationKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::TableAdd => "table_add",
            OperationKind::TableDelete => "table_delete",
            OperationKind::ColAdd => "col_add",
            OperationKind::ColUpdate => "col_update",
            OperationKind::ColDelete => "col_delete",
            OperationKind::Other(name) => name,
        }
    }

    /// Execution rank: creations first, table drops last.
    pub fn priority(&self) -> u8 {
        match self {
            OperationKind::TableAdd => 10,
            OperationKind::ColAdd => 20,
            OperationKind::ColUpdate => 30,
            OperationKind::ColDelete => 40,
            OperationKind::Other(_) => 50,
            OperationKind::TableDelete => 90,
        }
    }

    pub fn is_dangerous(&self) -> bool {
        matches!(self, OperationKind::TableDelete | OperationKind::ColDelete)
    }

    /// Whether a successful step invalidates the executor's id snapshot.
    pub fn refreshes_snapshot(&self) -> bool {
        matches!(
            self,
            OperationKind::TableAdd
                | OperationKind::ColAdd
                | OperationKind::ColUpdate
                | OperationKind::ColDelete
        )
    }
}

impl Serialize for OperationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(OperationKind::parse(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMeta {
    pub op: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub danger: bool,
    pub meta: StepMeta,
    pub request: ApiRequest,
}

impl PlanStep {
    pub fn op(&self) -> &OperationKind {
        &self.meta.op
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOptions {
    #[serde(default = "default_ignore_case")]
    pub ignore_case: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self { ignore_case: true }
    }
}

fn default_ignore_case() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub created_at: String,
    #[serde(default)]
    pub options: PlanOptions,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|step| step.id == id)
    }

    pub fn dangerous_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.danger).count()
    }
}

pub struct PlanContext<'a> {
    pub source: &'a EnvironmentConfig,
    pub target: &'a EnvironmentConfig,
    pub ignore_case: bool,
}

pub fn build_plan(diff: &SchemaDiff, ctx: &PlanContext<'_>) -> Result<Plan> {
    let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    build_plan_at(diff, ctx, created_at)
}

/// Like [`build_plan`] with a caller-chosen creation timestamp.
pub fn build_plan_at(diff: &SchemaDiff, ctx: &PlanContext<'_>, created_at: String) -> Result<Plan> {
    let base_id = ctx
        .target
        .base_id()
        .ok_or_else(|| AppError::config("Cannot build a plan: target baseId is missing"))?;
    let builder = StepBuilder {
        base_url: normalize_base_url(&ctx.target.base_url),
        base_id: base_id.to_string(),
        target: ctx.target,
    };

    let mut steps = Vec::with_capacity(diff.change_count());
    for change in &diff.table_changes {
        steps.push(match change {
            TableChange::Add { table } => builder.table_add(table),
            TableChange::Delete { table } => builder.table_delete(table),
        });
    }
    for change in &diff.column_changes {
        steps.push(match change {
            ColumnChange::Add {
                table_title,
                column,
            } => builder.col_add(table_title, column),
            ColumnChange::Update {
                table_title,
                source,
                fields_changed,
                ..
            } => builder.col_update(table_title, source, fields_changed),
            ColumnChange::Delete {
                table_title,
                column,
            } => builder.col_delete(table_title, column),
        });
    }

    debug!(
        "Planned {} steps from {} onto base {}",
        steps.len(),
        normalize_base_url(&ctx.source.base_url),
        builder.base_id
    );

    Ok(Plan {
        created_at,
        options: PlanOptions {
            ignore_case: ctx.ignore_case,
        },
        steps,
    })
}

struct StepBuilder<'a> {
    base_url: String,
    base_id: String,
    target: &'a EnvironmentConfig,
}

impl StepBuilder<'_> {
    fn table_add(&self, table: &Table) -> PlanStep {
        let columns: Vec<Value> = table
            .columns
            .iter()
            .filter(|col| !col.system || col.is_identity_like())
            .map(column_body)
            .collect();
        let table_name = table
            .table_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| safe_db_name(&table.title, "t"));

        let mut body = json!({
            "title": table.title,
            "table_name": table_name,
            "columns": columns,
        });
        if let Some(description) = table.description.as_deref().filter(|d| !d.is_empty()) {
            body["description"] = json!(description);
        }

        self.step(
            OperationKind::TableAdd,
            &[table.title.as_str()],
            format!("Add table: {}", table.title),
            HttpMethod::Post,
            format!("{}/api/v2/meta/bases/{}/tables", self.base_url, self.base_id),
            Some(body),
        )
    }

    fn table_delete(&self, table: &Table) -> PlanStep {
        self.step(
            OperationKind::TableDelete,
            &[table.title.as_str()],
            format!("Delete table (danger): {}", table.title),
            HttpMethod::Delete,
            format!("{}/api/v2/meta/tables/{{tableId}}", self.base_url),
            None,
        )
    }

    fn col_add(&self, table_title: &str, column: &Column) -> PlanStep {
        self.step(
            OperationKind::ColAdd,
            &[table_title, column.title.as_str()],
            format!("Add column: {}.{}", table_title, column.title),
            HttpMethod::Post,
            format!("{}/api/v2/meta/tables/{{tableId}}/columns/", self.base_url),
            Some(column_body(column)),
        )
    }

    fn col_update(&self, table_title: &str, source: &Column, fields_changed: &[String]) -> PlanStep {
        self.step(
            OperationKind::ColUpdate,
            &[table_title, source.title.as_str()],
            format!(
                "Update column: {}.{} ({})",
                table_title,
                source.title,
                fields_changed.join(", ")
            ),
            HttpMethod::Patch,
            format!("{}/api/v2/meta/columns/{{columnId}}", self.base_url),
            Some(column_body(source)),
        )
    }

    fn col_delete(&self, table_title: &str, column: &Column) -> PlanStep {
        self.step(
            OperationKind::ColDelete,
            &[table_title, column.title.as_str()],
            format!("Delete column (danger): {}.{}", table_title, column.title),
            HttpMethod::Delete,
            format!("{}/api/v2/meta/columns/{{columnId}}", self.base_url),
            None,
        )
    }

    fn step(
        &self,
        op: OperationKind,
        titles: &[&str],
        title: String,
        method: HttpMethod,
        url: String,
        body: Option<Value>,
    ) -> PlanStep {
        let (table_title, column_title) = match titles {
            [table] => (Some(table.to_string()), None),
            [table, column, ..] => (Some(table.to_string()), Some(column.to_string())),
            [] => (None, None),
        };
        PlanStep {
            id: step_id(&op, titles),
            title,
            danger: op.is_dangerous(),
            meta: StepMeta {
                op,
                table_title,
                column_title,
            },
            request: ApiRequest {
                method,
                url,
                headers: redacted_headers(self.target),
                body,
            },
        }
    }
}

/// `op:part:part`, with every whitespace run in a part replaced by `_`.
fn step_id(op: &OperationKind, parts: &[&str]) -> String {
    let mut id = op.as_str().to_string();
    for part in parts {
        id.push(':');
        id.push_str(&whitespace_re().replace_all(part, "_"));
    }
    id
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Column creation/update payload. Unset attributes are left out entirely.
fn column_body(column: &Column) -> Value {
    let mut body = Map::new();
    body.insert("title".into(), json!(column.title));
    let column_name = column
        .column_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| safe_db_name(&column.title, "c"));
    body.insert("column_name".into(), json!(column_name));

    let optional = [
        ("uidt", column.ui_type.as_ref().map(|v| json!(v))),
        ("dt", column.data_type.as_ref().map(|v| json!(v))),
        ("rqd", column.required.map(Value::Bool)),
        ("pk", column.primary_key.map(Value::Bool)),
        ("ai", column.auto_increment.map(Value::Bool)),
        ("un", column.unsigned.map(Value::Bool)),
        ("unique", column.unique.map(Value::Bool)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            body.insert(key.into(), value);
        }
    }

    let meta = column.meta.to_value();
    if !meta.is_null() {
        body.insert("meta".into(), meta);
    }
    if !column.validate.is_empty() {
        body.insert("validate".into(), column.validate.to_value());
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, classify_error};
    use crate::remote::{BaseSchema, FreeForm, HeaderValue, REDACTED};
    use crate::schema::{DiffOptions, diff_schemas};

    fn env(base_url: &str, base_id: Option<&str>) -> EnvironmentConfig {
        EnvironmentConfig {
            base_url: base_url.to_string(),
            api_token: "live-secret".to_string(),
            base_id: base_id.map(str::to_string),
            ..EnvironmentConfig::default()
        }
    }

    fn plan_for(diff: &SchemaDiff) -> Plan {
        let source = env("http://src.test", Some("bs"));
        let target = env("http://dst.test/", Some("bt"));
        let ctx = PlanContext {
            source: &source,
            target: &target,
            ignore_case: true,
        };
        build_plan_at(diff, &ctx, "2024-01-01T00:00:00.000Z".to_string()).expect("plan")
    }

    fn column(title: &str) -> Column {
        Column {
            id: format!("id-{}", title),
            title: title.to_string(),
            ..Column::default()
        }
    }

    fn orders_table() -> Table {
        let id = Column {
            ui_type: Some("ID".to_string()),
            primary_key: Some(true),
            system: true,
            ..column("Id")
        };
        let created = Column {
            ui_type: Some("CreatedTime".to_string()),
            system: true,
            ..column("CreatedAt")
        };
        let amount = Column {
            ui_type: Some("Decimal".to_string()),
            meta: FreeForm::Structured(json!({"precision": 2})),
            ..column("Amount")
        };
        Table {
            id: "t-src".to_string(),
            title: "Orders".to_string(),
            columns: vec![id, created, amount],
            ..Table::default()
        }
    }

    #[test]
    fn table_add_keeps_identity_system_columns() {
        let source = BaseSchema {
            base_id: "bs".to_string(),
            tables: vec![orders_table()],
        };
        let target = BaseSchema {
            base_id: "bt".to_string(),
            tables: vec![],
        };
        let plan = plan_for(&diff_schemas(&source, &target, DiffOptions::default()));

        assert_eq!(plan.steps.len(), 1);
        let step = &plan.steps[0];
        assert_eq!(step.id, "table_add:Orders");
        assert_eq!(step.op(), &OperationKind::TableAdd);
        assert!(!step.danger);
        assert_eq!(step.request.method, HttpMethod::Post);
        assert_eq!(step.request.url, "http://dst.test/api/v2/meta/bases/bt/tables");

        let body = step.request.body.as_ref().expect("body");
        assert_eq!(body["table_name"], "orders");
        let titles: Vec<_> = body["columns"]
            .as_array()
            .expect("columns")
            .iter()
            .map(|c| c["title"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(titles, vec!["Id", "Amount"]);
        assert_eq!(body["columns"][0]["pk"], true);
        assert_eq!(body["columns"][1]["column_name"], "amount");
        assert_eq!(body["columns"][1]["meta"], json!({"precision": 2}));
        assert!(body["columns"][1].get("rqd").is_none());
    }

    #[test]
    fn column_update_uses_placeholder() {
        let mut diff = SchemaDiff::default();
        diff.column_changes.push(ColumnChange::Update {
            table_title: "Contacts".to_string(),
            source: Column {
                required: Some(true),
                column_name: Some("email".to_string()),
                ..column("Email")
            },
            target: column("Email"),
            fields_changed: vec!["rqd".to_string()],
        });
        let plan = plan_for(&diff);
        let step = &plan.steps[0];
        assert_eq!(step.id, "col_update:Contacts:Email");
        assert_eq!(step.title, "Update column: Contacts.Email (rqd)");
        assert_eq!(step.request.method, HttpMethod::Patch);
        assert_eq!(step.request.url, "http://dst.test/api/v2/meta/columns/{columnId}");
        assert_eq!(step.meta.table_title.as_deref(), Some("Contacts"));
        assert_eq!(step.meta.column_title.as_deref(), Some("Email"));
        let body = step.request.body.as_ref().expect("body");
        assert_eq!(body["rqd"], true);
        assert_eq!(body["column_name"], "email");
    }

    #[test]
    fn danger_matches_destructive_kinds() {
        let mut diff = SchemaDiff::default();
        diff.table_changes.push(TableChange::Add {
            table: Table {
                title: "New".to_string(),
                ..Table::default()
            },
        });
        diff.table_changes.push(TableChange::Delete {
            table: Table {
                title: "Old".to_string(),
                ..Table::default()
            },
        });
        for change in [
            ColumnChange::Add {
                table_title: "T".to_string(),
                column: column("A"),
            },
            ColumnChange::Delete {
                table_title: "T".to_string(),
                column: column("B"),
            },
        ] {
            diff.column_changes.push(change);
        }
        let plan = plan_for(&diff);
        assert_eq!(plan.steps.len(), 4);
        for step in &plan.steps {
            assert_eq!(step.danger, step.op().is_dangerous(), "{}", step.id);
        }
        assert_eq!(plan.dangerous_steps(), 2);
        assert_eq!(
            plan.step("table_delete:Old").map(|s| s.request.url.as_str()),
            Some("http://dst.test/api/v2/meta/tables/{tableId}")
        );
    }

    #[test]
    fn step_ids_are_deterministic() {
        let mut diff = SchemaDiff::default();
        diff.column_changes.push(ColumnChange::Add {
            table_title: "Order  Items".to_string(),
            column: column("Unit Price"),
        });
        let first = plan_for(&diff);
        let second = plan_for(&diff);
        let ids = |plan: &Plan| plan.steps.iter().map(|s| s.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec!["col_add:Order_Items:Unit_Price"]);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn step_ids_keep_edge_whitespace_as_underscores() {
        assert_eq!(
            step_id(&OperationKind::TableAdd, &[" Foo ", "a\tb"]),
            "table_add:_Foo_:a_b"
        );
    }

    #[test]
    fn plans_never_carry_tokens() {
        let mut diff = SchemaDiff::default();
        diff.column_changes.push(ColumnChange::Add {
            table_title: "T".to_string(),
            column: column("A"),
        });
        let plan = plan_for(&diff);
        assert_eq!(plan.steps[0].request.headers["xc-auth"], HeaderValue::Redacted);
        let text = serde_json::to_string(&plan).expect("serialize");
        assert!(!text.contains("live-secret"));
        assert!(text.contains(REDACTED));
        assert!(text.contains("\"createdAt\""));
        assert!(text.contains("\"ignoreCase\":true"));
    }

    #[test]
    fn missing_target_base_is_a_config_error() {
        let source = env("http://src.test", Some("bs"));
        let target = env("http://dst.test", None);
        let ctx = PlanContext {
            source: &source,
            target: &target,
            ignore_case: true,
        };
        let err = build_plan(&SchemaDiff::default(), &ctx).expect_err("no base");
        assert_eq!(classify_error(&err), ErrorKind::Config);
    }

    #[test]
    fn unknown_operation_kinds_deserialize() {
        let meta: StepMeta = serde_json::from_value(json!({"op": "rename_table"})).expect("meta");
        assert_eq!(meta.op, OperationKind::Other("rename_table".to_string()));
        assert_eq!(meta.op.priority(), 50);
        assert!(!meta.op.is_dangerous());
        let back = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(back["op"], "rename_table");
    }
}
