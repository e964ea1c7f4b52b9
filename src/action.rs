//! Action Extractor
//!
//! Decodes the translation model's free-text reply into a typed
//! [`ActionDescriptor`]. The model is asked for a single JSON object but
//! routinely wraps it in prose or code fences, so extraction scans for the
//! first balanced `{...}` region instead of trusting the whole reply.
//!
//! Extraction never fails: anything that cannot be decoded becomes
//! [`ActionDescriptor::NoAction`] and the reply is shown to the user as-is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::MalformedActionError;

/// Rows returned when the model does not ask for a specific amount
pub const DEFAULT_LIMIT: u32 = 10;

/// Upper bound on rows any single action may request
pub const HARD_LIMIT_CAP: u32 = 100;

/// Row limits applied while decoding a query action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLimits {
    default_limit: u32,
    max_limit: u32,
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: HARD_LIMIT_CAP,
        }
    }
}

impl ActionLimits {
    /// `max_limit` never exceeds [`HARD_LIMIT_CAP`]; `default_limit` never exceeds `max_limit`
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.clamp(1, HARD_LIMIT_CAP);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }
}

/// Comparison operators the model may use in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ilike,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 6] = [
        FilterOperator::Eq,
        FilterOperator::Ilike,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ilike => "ilike",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
        }
    }

    /// Parse leniently: unknown operators become `Eq`, and the original
    /// string is returned alongside so callers can see the substitution.
    pub fn normalize(raw: &str) -> (Self, Option<String>) {
        match raw.parse::<FilterOperator>() {
            Ok(op) => (op, None),
            Err(e) => {
                warn!("{}; falling back to eq", e);
                (FilterOperator::Eq, Some(raw.to_string()))
            }
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for parsing FilterOperator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperator(pub String);

impl fmt::Display for UnknownOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown filter operator '{}'. Valid values: eq, ilike, gt, lt, gte, lte",
            self.0
        )
    }
}

impl std::error::Error for UnknownOperator {}

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eq" | "=" | "==" => Ok(FilterOperator::Eq),
            "ilike" => Ok(FilterOperator::Ilike),
            "gt" | ">" => Ok(FilterOperator::Gt),
            "lt" | "<" => Ok(FilterOperator::Lt),
            "gte" | ">=" => Ok(FilterOperator::Gte),
            "lte" | "<=" => Ok(FilterOperator::Lte),
            other => Err(UnknownOperator(other.to_string())),
        }
    }
}

/// A scalar filter operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Convert a JSON value, refusing arrays, objects and null
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(ScalarValue::Integer)
                .or_else(|| n.as_f64().map(ScalarValue::Float)),
            Value::String(s) => Some(ScalarValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Float(x) => write!(f, "{}", x),
            ScalarValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Integer(i)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

/// One abstract filter condition as emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub column: String,
    pub operator: FilterOperator,
    pub value: ScalarValue,
    /// Original operator string when it was unknown and replaced by `eq`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_from: Option<String>,
}

impl FilterDescriptor {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<ScalarValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            normalized_from: None,
        }
    }

    pub fn was_normalized(&self) -> bool {
        self.normalized_from.is_some()
    }
}

/// How the UI should render a query result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayHint {
    #[default]
    Table,
    Stat,
    Chart,
    Trend,
}

impl DisplayHint {
    /// Unknown hints render as a table
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "stat" | "stats" | "number" => DisplayHint::Stat,
            "chart" | "bar" | "pie" | "graph" => DisplayHint::Chart,
            "trend" | "line" | "forecast" => DisplayHint::Trend,
            _ => DisplayHint::Table,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayHint::Table => "table",
            DisplayHint::Stat => "stat",
            DisplayHint::Chart => "chart",
            DisplayHint::Trend => "trend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountAction {
    pub entity: String,
    pub filters: Vec<FilterDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAction {
    pub entity: String,
    pub filters: Vec<FilterDescriptor>,
    /// Projected fields; empty means all fields
    pub fields: Vec<String>,
    pub limit: u32,
    pub order: Option<String>,
    pub display: DisplayHint,
}

/// Structured intent decoded from the translation reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDescriptor {
    NoAction { text: String },
    Count(CountAction),
    Query(QueryAction),
}

impl ActionDescriptor {
    pub fn no_action(text: impl Into<String>) -> Self {
        ActionDescriptor::NoAction { text: text.into() }
    }

    pub fn entity(&self) -> Option<&str> {
        match self {
            ActionDescriptor::NoAction { .. } => None,
            ActionDescriptor::Count(c) => Some(&c.entity),
            ActionDescriptor::Query(q) => Some(&q.entity),
        }
    }

    pub fn filters(&self) -> &[FilterDescriptor] {
        match self {
            ActionDescriptor::NoAction { .. } => &[],
            ActionDescriptor::Count(c) => &c.filters,
            ActionDescriptor::Query(q) => &q.filters,
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, ActionDescriptor::NoAction { .. })
    }
}

/// Decode the model's reply into an action. Never fails.
pub fn extract_action(raw: &str) -> ActionDescriptor {
    extract_action_with(raw, ActionLimits::default())
}

/// [`extract_action`] with configured row limits
pub fn extract_action_with(raw: &str, limits: ActionLimits) -> ActionDescriptor {
    let Some(candidate) = find_balanced_object(raw) else {
        debug!("No JSON object in model reply; treating as direct answer");
        return ActionDescriptor::no_action(raw);
    };

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => {
            let err = MalformedActionError::Json(e.to_string());
            debug!("Discarding action candidate: {}", err);
            return ActionDescriptor::no_action(raw);
        }
    };

    match decode_action(&value, raw, limits) {
        Ok(action) => action,
        Err(e) => {
            debug!("Discarding action candidate: {}", e);
            ActionDescriptor::no_action(raw)
        }
    }
}

/// Locate the first top-level balanced `{...}` region.
///
/// Braces inside JSON string literals do not count towards the depth.
pub fn find_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

fn decode_action(
    value: &Value,
    raw: &str,
    limits: ActionLimits,
) -> Result<ActionDescriptor, MalformedActionError> {
    let obj = value
        .as_object()
        .ok_or_else(|| MalformedActionError::InvalidShape {
            key: "<root>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase());

    match kind.as_deref() {
        Some("count") => Ok(ActionDescriptor::Count(CountAction {
            entity: decode_entity(obj)?,
            filters: decode_filters(obj)?,
        })),
        Some("query") => Ok(ActionDescriptor::Query(QueryAction {
            entity: decode_entity(obj)?,
            filters: decode_filters(obj)?,
            fields: decode_fields(obj)?,
            limit: decode_limit(obj, limits),
            order: decode_order(obj),
            display: obj
                .get("display")
                .and_then(Value::as_str)
                .map(DisplayHint::parse_lenient)
                .unwrap_or_default(),
        })),
        _ => {
            let reply = ["message", "content"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str));
            Ok(ActionDescriptor::no_action(reply.unwrap_or(raw)))
        }
    }
}

fn decode_entity(obj: &Map<String, Value>) -> Result<String, MalformedActionError> {
    ["table", "entity", "model"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(MalformedActionError::MissingKey("table"))
}

fn decode_filters(obj: &Map<String, Value>) -> Result<Vec<FilterDescriptor>, MalformedActionError> {
    let items = match obj.get("filters") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(MalformedActionError::InvalidShape {
                key: "filters".to_string(),
                reason: "expected an array".to_string(),
            })
        }
    };
    items.iter().enumerate().map(|(i, item)| decode_filter(i, item)).collect()
}

fn decode_filter(index: usize, item: &Value) -> Result<FilterDescriptor, MalformedActionError> {
    let shape_err = |reason: &str| MalformedActionError::InvalidShape {
        key: format!("filters[{}]", index),
        reason: reason.to_string(),
    };

    // Accept both {"column", "operator", "value"} and the native
    // ["column", "operator", value] triple.
    let (column, operator, value) = match item {
        Value::Object(f) => {
            let column = f
                .get("column")
                .or_else(|| f.get("field"))
                .and_then(Value::as_str)
                .ok_or_else(|| shape_err("missing column"))?;
            let operator = f
                .get("operator")
                .or_else(|| f.get("op"))
                .and_then(Value::as_str)
                .unwrap_or("eq");
            let value = f.get("value").ok_or_else(|| shape_err("missing value"))?;
            (column, operator, value)
        }
        Value::Array(parts) if parts.len() == 3 => {
            let column = parts[0]
                .as_str()
                .ok_or_else(|| shape_err("column must be a string"))?;
            let operator = parts[1]
                .as_str()
                .ok_or_else(|| shape_err("operator must be a string"))?;
            (column, operator, &parts[2])
        }
        _ => return Err(shape_err("expected an object or a 3-element array")),
    };

    let value = ScalarValue::from_json(value).ok_or_else(|| shape_err("value must be a scalar"))?;
    let (operator, normalized_from) = FilterOperator::normalize(operator);

    Ok(FilterDescriptor {
        column: column.trim().to_string(),
        operator,
        value,
        normalized_from,
    })
}

fn decode_fields(obj: &Map<String, Value>) -> Result<Vec<String>, MalformedActionError> {
    let raw = obj.get("fields").or_else(|| obj.get("select"));
    let fields: Vec<String> = match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| MalformedActionError::InvalidShape {
                        key: "fields".to_string(),
                        reason: "field names must be strings".to_string(),
                    })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(MalformedActionError::InvalidShape {
                key: "fields".to_string(),
                reason: "expected an array or a comma-separated string".to_string(),
            })
        }
    };

    if fields.iter().any(|f| f == "*") {
        return Ok(Vec::new());
    }
    Ok(fields)
}

fn decode_limit(obj: &Map<String, Value>, limits: ActionLimits) -> u32 {
    let requested = match obj.get("limit") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match requested {
        Some(n) if n > 0 => n.min(i64::from(limits.max_limit)) as u32,
        _ => limits.default_limit,
    }
}

fn decode_order(obj: &Map<String, Value>) -> Option<String> {
    let order = obj
        .get("order")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    // Bare columns sort descending unless `ascending: true` is given
    let has_direction = order.split_whitespace().count() > 1 || order.contains(',');
    if has_direction {
        return Some(order.to_string());
    }
    let ascending = obj.get("ascending").and_then(Value::as_bool).unwrap_or(false);
    Some(format!("{} {}", order, if ascending { "asc" } else { "desc" }))
}
