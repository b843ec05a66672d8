pub mod aggregate;
pub mod engine;

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::field::{self, Field, FieldKind, FieldValue};

/// Where a rule's actions apply: the whole record set, or each group
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    Global,
    PerGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Regex,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    fn is_ordering(self) -> bool {
        matches!(self, CompareOp::Gt | CompareOp::Lt)
    }

    fn is_string(self) -> bool {
        matches!(
            self,
            CompareOp::Regex | CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
            CompareOp::Regex => "regex",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startsWith",
            CompareOp::EndsWith => "endsWith",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOp {
    Min,
    Max,
    First,
    Last,
    Shortest,
    Longest,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::First => "first",
            AggregateOp::Last => "last",
            AggregateOp::Shortest => "shortest",
            AggregateOp::Longest => "longest",
        })
    }
}

/// One `(field, operator, value)` predicate. Conditions are conjunctive:
/// a record is a candidate only when all of them hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub operator: CompareOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Set `is_mark` on every candidate.
    Mark { value: bool },
    /// Set `is_locked` on every candidate.
    Lock { value: bool },
    /// Select one record per group by aggregation; `field` is unused for
    /// `first`/`last`.
    AggregateSelect {
        #[serde(default)]
        field: Option<Field>,
        operator: AggregateOp,
        mark: bool,
    },
    /// Within scope, select every candidate whose path field matches the
    /// regex, walked folder by folder.
    SelectBySameFolder {
        #[serde(rename = "pathField")]
        path_field: Field,
        regex: String,
        mark: bool,
    },
}

/// Declarative rule as persisted: scope, conjunctive conditions, ordered
/// actions. Immutable once built; `compile` validates the whole rule before
/// any record is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: Option<String>,
    pub scope: Scope,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

impl Rule {
    pub fn from_json(text: &str) -> Result<Rule> {
        serde_json::from_str(text).map_err(|e| Error::InvalidRule(e.to_string()))
    }

    /// Validate schema and type compatibility, compiling regexes once.
    /// Any failure here aborts the whole run with no partial effects.
    pub fn compile(&self) -> Result<CompiledRule> {
        if self.actions.is_empty() {
            return Err(Error::InvalidRule(
                "rule must declare at least one action".to_string(),
            ));
        }
        let conditions = self
            .conditions
            .iter()
            .map(CompiledCondition::build)
            .collect::<Result<Vec<_>>>()?;
        let actions = self
            .actions
            .iter()
            .map(CompiledAction::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledRule {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| "unnamed rule".to_string()),
            scope: self.scope,
            conditions,
            actions,
        })
    }
}

/// A validated rule: every operator type-checked against its field, every
/// regex compiled exactly once and reused across all records.
#[derive(Debug)]
pub struct CompiledRule {
    pub name: String,
    pub scope: Scope,
    pub conditions: Vec<CompiledCondition>,
    pub actions: Vec<CompiledAction>,
}

#[derive(Debug)]
pub struct CompiledCondition {
    pub field: Field,
    test: Test,
}

#[derive(Debug)]
enum Test {
    Eq(FieldValue),
    Neq(FieldValue),
    Gt(FieldValue),
    Lt(FieldValue),
    Regex(Regex),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl CompiledCondition {
    fn build(condition: &Condition) -> Result<Self> {
        let field = condition.field;
        let kind = field.kind();
        let op = condition.operator;

        if op.is_ordering() && !matches!(kind, FieldKind::Int | FieldKind::Float | FieldKind::Date)
        {
            return Err(Error::TypeMismatch {
                field,
                operator: op.to_string(),
                kind,
            });
        }
        if op.is_string() && kind != FieldKind::Str {
            return Err(Error::TypeMismatch {
                field,
                operator: op.to_string(),
                kind,
            });
        }

        let test = match op {
            CompareOp::Eq => Test::Eq(coerce_value(field, &condition.value)?),
            CompareOp::Neq => Test::Neq(coerce_value(field, &condition.value)?),
            CompareOp::Gt => Test::Gt(coerce_value(field, &condition.value)?),
            CompareOp::Lt => Test::Lt(coerce_value(field, &condition.value)?),
            CompareOp::Regex => Test::Regex(compile_regex(string_value(field, op, &condition.value)?)?),
            CompareOp::Contains => Test::Contains(string_value(field, op, &condition.value)?.to_string()),
            CompareOp::StartsWith => {
                Test::StartsWith(string_value(field, op, &condition.value)?.to_string())
            }
            CompareOp::EndsWith => {
                Test::EndsWith(string_value(field, op, &condition.value)?.to_string())
            }
        };
        Ok(Self { field, test })
    }

    /// Evaluate against one record value. `Missing` never matches; a record
    /// lacking an optional field simply fails the condition.
    pub fn eval(&self, value: &FieldValue) -> bool {
        if value.is_missing() {
            return false;
        }
        match &self.test {
            Test::Eq(expected) => value == expected,
            Test::Neq(expected) => value != expected,
            Test::Gt(bound) => {
                field::compare(value, bound) == Some(std::cmp::Ordering::Greater)
            }
            Test::Lt(bound) => field::compare(value, bound) == Some(std::cmp::Ordering::Less),
            Test::Regex(re) => match value {
                FieldValue::Str(s) => re.is_match(s),
                _ => false,
            },
            Test::Contains(needle) => match value {
                FieldValue::Str(s) => s.contains(needle),
                _ => false,
            },
            Test::StartsWith(prefix) => match value {
                FieldValue::Str(s) => s.starts_with(prefix),
                _ => false,
            },
            Test::EndsWith(suffix) => match value {
                FieldValue::Str(s) => s.ends_with(suffix),
                _ => false,
            },
        }
    }
}

#[derive(Debug)]
pub enum CompiledAction {
    Mark(bool),
    Lock(bool),
    AggregateSelect {
        field: Option<Field>,
        operator: AggregateOp,
        mark: bool,
    },
    SelectBySameFolder {
        path_field: Field,
        regex: Regex,
        mark: bool,
    },
}

impl CompiledAction {
    fn build(action: &Action) -> Result<Self> {
        match action {
            Action::Mark { value } => Ok(CompiledAction::Mark(*value)),
            Action::Lock { value } => Ok(CompiledAction::Lock(*value)),
            Action::AggregateSelect {
                field,
                operator,
                mark,
            } => {
                match operator {
                    AggregateOp::Min | AggregateOp::Max => {
                        let f = field.ok_or_else(|| {
                            Error::InvalidRule(format!(
                                "aggregate operator {operator} requires a field"
                            ))
                        })?;
                        if !matches!(f.kind(), FieldKind::Int | FieldKind::Float | FieldKind::Date)
                        {
                            return Err(Error::TypeMismatch {
                                field: f,
                                operator: operator.to_string(),
                                kind: f.kind(),
                            });
                        }
                    }
                    AggregateOp::Shortest | AggregateOp::Longest => {
                        let f = field.ok_or_else(|| {
                            Error::InvalidRule(format!(
                                "aggregate operator {operator} requires a field"
                            ))
                        })?;
                        if f.kind() != FieldKind::Str {
                            return Err(Error::TypeMismatch {
                                field: f,
                                operator: operator.to_string(),
                                kind: f.kind(),
                            });
                        }
                    }
                    // Positional operators never read a field
                    AggregateOp::First | AggregateOp::Last => {}
                }
                Ok(CompiledAction::AggregateSelect {
                    field: *field,
                    operator: *operator,
                    mark: *mark,
                })
            }
            Action::SelectBySameFolder {
                path_field,
                regex,
                mark,
            } => {
                if path_field.kind() != FieldKind::Str {
                    return Err(Error::TypeMismatch {
                        field: *path_field,
                        operator: "selectBySameFolder".to_string(),
                        kind: path_field.kind(),
                    });
                }
                Ok(CompiledAction::SelectBySameFolder {
                    path_field: *path_field,
                    regex: compile_regex(regex)?,
                    mark: *mark,
                })
            }
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn string_value<'a>(
    field: Field,
    op: CompareOp,
    value: &'a serde_json::Value,
) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        Error::InvalidRule(format!("operator {op} on {field} requires a string value"))
    })
}

/// Coerce a JSON condition value into the field's kind.
fn coerce_value(field: Field, value: &serde_json::Value) -> Result<FieldValue> {
    let invalid = || {
        Error::InvalidRule(format!(
            "value {value} is not valid for {field} ({:?})",
            field.kind()
        ))
    };
    match field.kind() {
        FieldKind::Int => value.as_i64().map(FieldValue::Int).ok_or_else(invalid),
        FieldKind::Float => value.as_f64().map(FieldValue::Float).ok_or_else(invalid),
        FieldKind::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(invalid),
        FieldKind::Str => value
            .as_str()
            .map(|s| FieldValue::Str(s.to_string()))
            .ok_or_else(invalid),
        FieldKind::Date => value
            .as_str()
            .and_then(field::parse_datetime)
            .map(FieldValue::Date)
            .ok_or_else(invalid),
    }
}
