use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use super::Document;
use crate::error::StoreError;

pub const ID_FIELD: &str = "_id";

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::InvalidQuery(message.into())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Field { path: String, ops: Vec<FieldOp> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl Filter {
    pub fn parse(value: &Value) -> Result<Self, StoreError> {
        let Value::Object(map) = value else {
            return Err(invalid("filter must be a JSON object"));
        };

        let mut clauses = Vec::with_capacity(map.len());
        for (key, condition) in map {
            match key.as_str() {
                "$and" => clauses.push(Filter::And(parse_filter_list(key, condition)?)),
                "$or" => clauses.push(Filter::Or(parse_filter_list(key, condition)?)),
                other if other.starts_with('$') => {
                    return Err(invalid(format!("unsupported filter operator {other}")));
                }
                _ => clauses.push(Filter::Field {
                    path: key.clone(),
                    ops: parse_field_ops(key, condition)?,
                }),
            }
        }

        Ok(Filter::And(clauses))
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(document)),
            Filter::Or(clauses) => clauses.iter().any(|clause| clause.matches(document)),
            Filter::Field { path, ops } => {
                let value = lookup(document, path);
                ops.iter().all(|op| op.matches(value))
            }
        }
    }

    pub fn equality_seed(&self) -> Result<Document, StoreError> {
        let mut seed = Map::new();
        if let Filter::And(clauses) = self {
            for clause in clauses {
                if let Filter::Field { path, ops } = clause {
                    if let [FieldOp::Eq(value)] = ops.as_slice() {
                        set_path(&mut seed, path, value.clone())?;
                    }
                }
            }
        }
        Ok(seed)
    }
}

fn parse_filter_list(operator: &str, value: &Value) -> Result<Vec<Filter>, StoreError> {
    let Value::Array(items) = value else {
        return Err(invalid(format!("{operator} expects an array of filters")));
    };
    if items.is_empty() {
        return Err(invalid(format!("{operator} expects at least one filter")));
    }
    items.iter().map(Filter::parse).collect()
}

fn parse_field_ops(path: &str, condition: &Value) -> Result<Vec<FieldOp>, StoreError> {
    let operators = match condition {
        Value::Object(map) if !map.is_empty() && map.keys().all(|key| key.starts_with('$')) => map,
        Value::Object(map) if map.keys().any(|key| key.starts_with('$')) => {
            return Err(invalid(format!(
                "condition on {path} mixes operators and plain fields"
            )));
        }
        other => return Ok(vec![FieldOp::Eq(other.clone())]),
    };

    operators
        .iter()
        .map(|(operator, operand)| {
            let op = match operator.as_str() {
                "$eq" => FieldOp::Eq(operand.clone()),
                "$ne" => FieldOp::Ne(operand.clone()),
                "$gt" => FieldOp::Gt(operand.clone()),
                "$gte" => FieldOp::Gte(operand.clone()),
                "$lt" => FieldOp::Lt(operand.clone()),
                "$lte" => FieldOp::Lte(operand.clone()),
                "$in" => FieldOp::In(operand_list(path, operator, operand)?),
                "$nin" => FieldOp::Nin(operand_list(path, operator, operand)?),
                "$exists" => FieldOp::Exists(operand.as_bool().ok_or_else(|| {
                    invalid(format!("$exists on {path} expects a boolean"))
                })?),
                other => return Err(invalid(format!("unsupported operator {other} on {path}"))),
            };
            Ok(op)
        })
        .collect()
}

fn operand_list(path: &str, operator: &str, operand: &Value) -> Result<Vec<Value>, StoreError> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| invalid(format!("{operator} on {path} expects an array")))
}

impl FieldOp {
    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            FieldOp::Eq(target) => equals_or_contains(value, target),
            FieldOp::Ne(target) => !equals_or_contains(value, target),
            FieldOp::Gt(target) => compares(value, target, |ord| ord == Ordering::Greater),
            FieldOp::Gte(target) => compares(value, target, |ord| ord != Ordering::Less),
            FieldOp::Lt(target) => compares(value, target, |ord| ord == Ordering::Less),
            FieldOp::Lte(target) => compares(value, target, |ord| ord != Ordering::Greater),
            FieldOp::In(targets) => targets
                .iter()
                .any(|target| equals_or_contains(value, target)),
            FieldOp::Nin(targets) => !targets
                .iter()
                .any(|target| equals_or_contains(value, target)),
            FieldOp::Exists(expected) => value.is_some() == *expected,
        }
    }
}

fn equals_or_contains(value: Option<&Value>, target: &Value) -> bool {
    match value {
        None => target.is_null(),
        Some(value) if values_equal(value, target) => true,
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, target)),
        Some(_) => false,
    }
}

fn compares(value: Option<&Value>, target: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = value else {
        return false;
    };

    let single = |candidate: &Value| {
        type_rank(candidate) == type_rank(target) && accept(compare_values(candidate, target))
    };

    match value {
        Value::Array(items) if !target.is_array() => items.iter().any(single),
        other => single(other),
    }
}

pub fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| compare_values(x, y))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .zip(b)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    keys: Vec<(String, SortOrder)>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Ascending));
        self
    }

    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.keys.push((field.into(), SortOrder::Descending));
        self
    }

    pub fn parse_terms(terms: &[String]) -> Result<Self, StoreError> {
        let mut spec = Self::new();
        for term in terms {
            let (field, order) = match term.rsplit_once(':') {
                Some((field, "asc")) => (field, SortOrder::Ascending),
                Some((field, "desc")) => (field, SortOrder::Descending),
                Some(_) => return Err(invalid(format!("invalid sort term {term:?}"))),
                None => (term.as_str(), SortOrder::Ascending),
            };
            if field.trim().is_empty() {
                return Err(invalid(format!("invalid sort term {term:?}")));
            }
            spec.keys.push((field.trim().to_string(), order));
        }
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn compare(&self, left: &Document, right: &Document) -> Ordering {
        for (field, order) in &self.keys {
            let a = lookup(left, field).unwrap_or(&Value::Null);
            let b = lookup(right, field).unwrap_or(&Value::Null);
            let ordering = match order {
                SortOrder::Ascending => compare_values(a, b),
                SortOrder::Descending => compare_values(b, a),
            };
            if ordering.is_ne() {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include { fields: Vec<String>, keep_id: bool },
    Exclude { fields: Vec<String> },
}

impl Projection {
    pub fn parse(value: &Value) -> Result<Self, StoreError> {
        let Value::Object(map) = value else {
            return Err(invalid("projection must be a JSON object"));
        };

        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut keep_id = true;

        for (field, flag) in map {
            let selected = match flag {
                Value::Bool(flag) => *flag,
                Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
                _ => return Err(invalid(format!("projection of {field} must be 0/1 or a boolean"))),
            };

            if field == ID_FIELD {
                keep_id = selected;
            } else if selected {
                include.push(field.clone());
            } else {
                exclude.push(field.clone());
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(invalid("projection cannot mix inclusion and exclusion")),
            (false, true) => Ok(Projection::Include {
                fields: include,
                keep_id,
            }),
            _ => {
                if !keep_id {
                    exclude.push(ID_FIELD.to_string());
                }
                Ok(Projection::Exclude { fields: exclude })
            }
        }
    }

    pub fn apply(&self, document: Document) -> Document {
        match self {
            Projection::Include { fields, keep_id } => document
                .into_iter()
                .filter(|(key, _)| {
                    (key == ID_FIELD && *keep_id) || fields.iter().any(|field| field == key)
                })
                .collect(),
            Projection::Exclude { fields } => document
                .into_iter()
                .filter(|(key, _)| !fields.iter().any(|field| field == key))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

#[derive(Debug, Clone, PartialEq)]
enum UpdateOp {
    Set(String, Value),
    Unset(String),
    Inc(String, Number),
    Push(String, Value),
}

impl Update {
    pub fn parse(value: &Value) -> Result<Self, StoreError> {
        let Value::Object(map) = value else {
            return Err(invalid("update must be a JSON object"));
        };
        if map.is_empty() {
            return Err(invalid("update must contain at least one operator"));
        }

        let mut ops = Vec::new();
        for (operator, fields) in map {
            let Value::Object(fields) = fields else {
                return Err(invalid(format!("{operator} expects an object of fields")));
            };

            for (path, operand) in fields {
                if path == ID_FIELD || path.starts_with("_id.") {
                    return Err(invalid("the _id field cannot be updated"));
                }

                let op = match operator.as_str() {
                    "$set" => UpdateOp::Set(path.clone(), operand.clone()),
                    "$unset" => UpdateOp::Unset(path.clone()),
                    "$inc" => match operand {
                        Value::Number(amount) => UpdateOp::Inc(path.clone(), amount.clone()),
                        _ => return Err(invalid(format!("$inc on {path} expects a number"))),
                    },
                    "$push" => UpdateOp::Push(path.clone(), operand.clone()),
                    other if other.starts_with('$') => {
                        return Err(invalid(format!("unsupported update operator {other}")));
                    }
                    other => {
                        return Err(invalid(format!(
                            "update field {other} is not an operator; use replace for whole documents"
                        )));
                    }
                };
                ops.push(op);
            }
        }

        Ok(Self { ops })
    }

    pub fn apply(&self, document: &mut Document) -> Result<(), StoreError> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => set_path(document, path, value.clone())?,
                UpdateOp::Unset(path) => unset_path(document, path),
                UpdateOp::Inc(path, amount) => {
                    let next = match lookup(document, path) {
                        None => Value::Number(amount.clone()),
                        Some(Value::Number(current)) => add_numbers(current, amount)?,
                        Some(_) => {
                            return Err(invalid(format!("$inc target {path} is not a number")));
                        }
                    };
                    set_path(document, path, next)?;
                }
                UpdateOp::Push(path, value) => {
                    let next = match lookup(document, path) {
                        None => Value::Array(vec![value.clone()]),
                        Some(Value::Array(items)) => {
                            let mut items = items.clone();
                            items.push(value.clone());
                            Value::Array(items)
                        }
                        Some(_) => {
                            return Err(invalid(format!("$push target {path} is not an array")));
                        }
                    };
                    set_path(document, path, next)?;
                }
            }
        }
        Ok(())
    }
}

fn add_numbers(current: &Number, amount: &Number) -> Result<Value, StoreError> {
    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }

    let sum = current.as_f64().unwrap_or(0.0) + amount.as_f64().unwrap_or(0.0);
    Number::from_f64(sum)
        .map(Value::Number)
        .ok_or_else(|| invalid("$inc produced a non-finite number"))
}

pub fn validate_replacement(document: &Document) -> Result<(), StoreError> {
    match document.keys().find(|key| key.starts_with('$')) {
        Some(key) => Err(invalid(format!(
            "replacement documents cannot contain operator {key}"
        ))),
        None => Ok(()),
    }
}

pub fn set_path(document: &mut Document, path: &str, value: Value) -> Result<(), StoreError> {
    let segments = path.split('.').collect::<Vec<&str>>();
    let Some((last, parents)) = segments.split_last() else {
        return Err(invalid("empty field path"));
    };

    let mut current = document;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| invalid(format!("cannot descend into non-object field {segment} of {path}")))?;
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn unset_path(document: &mut Document, path: &str) {
    let segments = path.split('.').collect::<Vec<&str>>();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = document;
    for segment in parents {
        match current.get_mut(*segment).and_then(Value::as_object_mut) {
            Some(next) => current = next,
            None => return,
        }
    }
    current.remove(*last);
}
