// used to serialize conditions and subgroups for callers
use serde::Serialize;

// custom made ordering for conditions in canonical keys
use std::cmp::Ordering;

// used to print out readable forms of a condition
use std::fmt;
use std::sync::Arc;

use crate::catalog::{CategoricalTarget, NumericTarget};
use crate::error::{Result, SubgroupError};
use crate::quality;
use crate::record::{Accessor, Kind, Record, Schema};

// ------------- Operator -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "<=")]
    LessThanEqual,
    #[serde(rename = ">=")]
    GreaterThanEqual,
}
impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operator::Equal => write!(f, "="),
            Operator::LessThanEqual => write!(f, "<="),
            Operator::GreaterThanEqual => write!(f, ">="),
        }
    }
}

// ------------- ConditionValue -------------
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Text(Arc<str>),
    Number(i64),
}
impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConditionValue::Text(s) => write!(f, "{}", s),
            ConditionValue::Number(n) => write!(f, "{}", n),
        }
    }
}

// ------------- Condition -------------
// Text attributes are only ever tested with `=`, integer attributes only
// with `<=` or `>=`. The constructors are the only way to obtain a condition.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    attribute: Arc<str>,
    #[serde(skip)]
    accessor: Accessor,
    operator: Operator,
    value: ConditionValue,
}
impl Condition {
    pub fn equal(target: &CategoricalTarget, value: Arc<str>) -> Self {
        Self {
            attribute: Arc::clone(target.name()),
            accessor: target.accessor(),
            operator: Operator::Equal,
            value: ConditionValue::Text(value),
        }
    }
    pub fn at_most(target: &NumericTarget, threshold: i64) -> Self {
        Self {
            attribute: Arc::clone(target.name()),
            accessor: target.accessor(),
            operator: Operator::LessThanEqual,
            value: ConditionValue::Number(threshold),
        }
    }
    pub fn at_least(target: &NumericTarget, threshold: i64) -> Self {
        Self {
            attribute: Arc::clone(target.name()),
            accessor: target.accessor(),
            operator: Operator::GreaterThanEqual,
            value: ConditionValue::Number(threshold),
        }
    }
    /// Builds a condition by attribute name, rejecting operator and value
    /// combinations the search itself would never generate.
    pub fn new(schema: &Schema, attribute: &str, operator: Operator, value: ConditionValue) -> Result<Self> {
        let accessor = schema.accessor(attribute)?;
        let valid = matches!(
            (accessor.kind(), operator, &value),
            (Kind::Text, Operator::Equal, ConditionValue::Text(_))
                | (Kind::Integer, Operator::LessThanEqual, ConditionValue::Number(_))
                | (Kind::Integer, Operator::GreaterThanEqual, ConditionValue::Number(_))
        );
        if !valid {
            return Err(SubgroupError::Config(format!(
                "condition ({} {} {}) does not fit a {} attribute",
                attribute,
                operator,
                value,
                accessor.kind().name()
            )));
        }
        Ok(Self {
            attribute: Arc::from(attribute),
            accessor,
            operator,
            value,
        })
    }
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
    pub fn operator(&self) -> Operator {
        self.operator
    }
    pub fn value(&self) -> &ConditionValue {
        &self.value
    }
    pub fn matches(&self, record: &Record) -> bool {
        match (self.operator, &self.value) {
            (Operator::Equal, ConditionValue::Text(expected)) => {
                self.accessor.text(record) == Some(&**expected)
            }
            (Operator::LessThanEqual, ConditionValue::Number(threshold)) => {
                self.accessor.integer(record).is_some_and(|v| v <= *threshold)
            }
            (Operator::GreaterThanEqual, ConditionValue::Number(threshold)) => {
                self.accessor.integer(record).is_some_and(|v| v >= *threshold)
            }
            _ => false,
        }
    }
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        (&self.attribute, self.operator, &self.value).cmp(&(&other.attribute, other.operator, &other.value))
    }
}
impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_cmp(other) == Ordering::Equal
    }
}
impl Eq for Condition {}
impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({} {} {})", self.attribute, self.operator, self.value)
    }
}

/// Order-independent key for a set of conditions: sorted by attribute name
/// and concatenated as `(attr op value)` tuples.
pub fn canonical_key(conditions: &[Condition]) -> String {
    let mut sorted: Vec<&Condition> = conditions.iter().collect();
    sorted.sort_by(|a, b| a.canonical_cmp(b));
    let mut key = String::new();
    for condition in sorted {
        key += &condition.to_string();
    }
    key
}

// ------------- Within -------------
/// Largest deviation from one of the shallow reference subgroups that
/// contain this candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Within {
    pub score: f64,
    pub reference: String,
    pub reference_correlation: f64,
}

// ------------- Candidate -------------
#[derive(Debug, Clone)]
pub struct Candidate {
    conditions: Vec<Condition>,
    next_categorical: usize,
    next_numeric: usize,
    correlation: f64,
    count: usize,
    baseline: f64,
    score: f64,
    within: Option<Within>,
}
impl Candidate {
    /// The empty description, matching the whole record set.
    pub fn root(correlation: f64, count: usize) -> Self {
        Self {
            conditions: Vec::new(),
            next_categorical: 0,
            next_numeric: 0,
            correlation,
            count,
            baseline: correlation,
            score: 0.0,
            within: None,
        }
    }
    /// An unscored child with one more condition and the given cursors.
    pub fn child(&self, condition: Condition, next_categorical: usize, next_numeric: usize) -> Self {
        let mut conditions = Vec::with_capacity(self.conditions.len() + 1);
        conditions.extend(self.conditions.iter().cloned());
        conditions.push(condition);
        Self {
            conditions,
            next_categorical,
            next_numeric,
            correlation: f64::NAN,
            count: 0,
            baseline: f64::NAN,
            score: 0.0,
            within: None,
        }
    }
    pub fn scored(mut self, correlation: f64, count: usize, baseline: f64) -> Self {
        self.correlation = correlation;
        self.count = count;
        self.baseline = baseline;
        self.score = quality::score(correlation, baseline);
        self
    }
    pub fn set_within(&mut self, within: Within) {
        self.within = Some(within);
    }
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
    pub fn depth(&self) -> usize {
        self.conditions.len()
    }
    pub fn next_categorical(&self) -> usize {
        self.next_categorical
    }
    pub fn next_numeric(&self) -> usize {
        self.next_numeric
    }
    pub fn correlation(&self) -> f64 {
        self.correlation
    }
    pub fn count(&self) -> usize {
        self.count
    }
    pub fn baseline(&self) -> f64 {
        self.baseline
    }
    pub fn score(&self) -> f64 {
        self.score
    }
    pub fn within(&self) -> Option<&Within> {
        self.within.as_ref()
    }
    pub fn within_score(&self) -> f64 {
        self.within.as_ref().map_or(0.0, |w| w.score)
    }
    pub fn key(&self) -> String {
        canonical_key(&self.conditions)
    }
    /// Key of the candidate this one was generated from.
    pub fn parent_key(&self) -> String {
        let generated = self.conditions.len().saturating_sub(1);
        canonical_key(&self.conditions[..generated])
    }
}
impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
