use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form column attributes (`meta`, `validate`) that NocoDB sometimes
/// delivers as JSON-encoded text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreeForm {
    #[default]
    Unset,
    Raw(String),
    Structured(Value),
}

impl FreeForm {
    /// Decode opportunistically: text that parses as JSON becomes structured,
    /// anything else is kept verbatim.
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FreeForm::Unset,
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Null) => FreeForm::Unset,
                Ok(parsed) => FreeForm::Structured(parsed),
                Err(_) => FreeForm::Raw(text.clone()),
            },
            Some(other) => FreeForm::Structured(other.clone()),
        }
    }

    /// True when there is nothing worth sending to the remote API.
    pub fn is_empty(&self) -> bool {
        match self {
            FreeForm::Unset => true,
            FreeForm::Raw(text) => text.is_empty(),
            FreeForm::Structured(_) => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            FreeForm::Unset => Value::Null,
            FreeForm::Raw(text) => Value::String(text.clone()),
            FreeForm::Structured(value) => value.clone(),
        }
    }
}

/// A column normalized from the v2 metadata API.
///
/// Wire names (`uidt`, `rqd`, ...) are kept on serialization so that diff
/// output and request bodies read like the remote payloads.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(rename = "uidt", skip_serializing_if = "Option::is_none")]
    pub ui_type: Option<String>,
    #[serde(rename = "dt", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(rename = "rqd", skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "pk", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<bool>,
    #[serde(rename = "ai", skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
    #[serde(rename = "un", skip_serializing_if = "Option::is_none")]
    pub unsigned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    pub system: bool,
    #[serde(skip_serializing_if = "FreeForm::is_empty")]
    pub meta: FreeForm,
    #[serde(skip_serializing_if = "FreeForm::is_empty")]
    pub validate: FreeForm,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Column {
    pub fn from_remote(raw: &Value) -> Self {
        let meta = FreeForm::decode(raw.get("meta"));
        let validate = FreeForm::decode(raw.get("validate"));

        let mut raw = raw.clone();
        if let Some(object) = raw.as_object_mut() {
            object.insert("meta".to_string(), meta.to_value());
            object.insert("validate".to_string(), validate.to_value());
        }

        Self {
            id: text_field(&raw, "id").unwrap_or_default(),
            title: text_field(&raw, "title").unwrap_or_default(),
            column_name: text_field(&raw, "column_name"),
            ui_type: text_field(&raw, "uidt"),
            data_type: text_field(&raw, "dt"),
            required: flag_field(&raw, "rqd"),
            primary_key: flag_field(&raw, "pk"),
            auto_increment: flag_field(&raw, "ai"),
            unsigned: flag_field(&raw, "un"),
            unique: flag_field(&raw, "unique"),
            system: flag_field(&raw, "system").unwrap_or(false),
            meta,
            validate,
            raw,
        }
    }

    /// Identity, primary key, and auto-increment columns must accompany a
    /// table creation even when NocoDB marks them as system-owned.
    pub fn is_identity_like(&self) -> bool {
        self.ui_type.as_deref() == Some("ID")
            || self.primary_key.unwrap_or(false)
            || self.auto_increment.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub title: String,
    #[serde(rename = "table_name", skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub columns: Vec<Column>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Table {
    /// Build a table from its listing entry and full metadata payload.
    pub fn from_remote(listing: &Value, meta: &Value, include_system_columns: bool) -> Self {
        let columns = meta
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .map(Column::from_remote)
                    .filter(|col| include_system_columns || !col.system)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: text_field(meta, "id")
                .or_else(|| text_field(listing, "id"))
                .unwrap_or_default(),
            title: text_field(meta, "title")
                .or_else(|| text_field(listing, "title"))
                .unwrap_or_default(),
            table_name: text_field(meta, "table_name")
                .or_else(|| text_field(meta, "tableName"))
                .or_else(|| text_field(meta, "name")),
            description: text_field(meta, "description"),
            columns,
            raw: meta.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseSchema {
    pub base_id: String,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseSummary {
    pub id: String,
    pub title: String,
}

pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn flag_field(value: &Value, key: &str) -> Option<bool> {
    match value.get(key)? {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => Some(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => match text.trim() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
