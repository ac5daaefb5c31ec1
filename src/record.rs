use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubgroupError};

// ------------- Kind -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Text,
    Integer,
    Float,
}
impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Text => "text",
            Kind::Integer => "integer",
            Kind::Float => "float",
        }
    }
}

// ------------- Value -------------
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(Arc<str>),
    Integer(i64),
    Float(f64),
}
impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Text(_) => Kind::Text,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
        }
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(Arc::from(s))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Arc::from(s))
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}

// ------------- Schema -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: Kind,
}
impl Field {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> Kind {
        self.kind
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}
impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
    /// Resolves a field name into a typed accessor. This is the only place
    /// where names are looked up; evaluation only ever uses column offsets.
    pub fn accessor(&self, name: &str) -> Result<Accessor> {
        let column = self
            .position(name)
            .ok_or_else(|| SubgroupError::UnknownAttribute(name.to_string()))?;
        Ok(match self.fields[column].kind {
            Kind::Text => Accessor::Text(column),
            Kind::Integer => Accessor::Integer(column),
            Kind::Float => Accessor::Float(column),
        })
    }
}

// ------------- Accessor -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Text(usize),
    Integer(usize),
    Float(usize),
}
impl Accessor {
    pub fn column(&self) -> usize {
        match *self {
            Accessor::Text(c) | Accessor::Integer(c) | Accessor::Float(c) => c,
        }
    }
    pub fn kind(&self) -> Kind {
        match self {
            Accessor::Text(_) => Kind::Text,
            Accessor::Integer(_) => Kind::Integer,
            Accessor::Float(_) => Kind::Float,
        }
    }
    pub fn text<'r>(&self, record: &'r Record) -> Option<&'r str> {
        match record.values.get(self.column()) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }
    pub fn integer(&self, record: &Record) -> Option<i64> {
        match record.values.get(self.column()) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }
    /// Any numeric field widened to `f64`, as needed by the measured pair.
    pub fn number(&self, record: &Record) -> Option<f64> {
        match record.values.get(self.column()) {
            Some(Value::Integer(i)) => Some(*i as f64),
            Some(Value::Float(x)) => Some(*x),
            _ => None,
        }
    }
}

// ------------- Record -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Box<[Value]>,
}
impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }
}

// ------------- RecordSet -------------
// Read-only once built. Every record is checked against the schema here so
// that accessors never see a value of the wrong kind.
#[derive(Debug, Clone)]
pub struct RecordSet {
    schema: Schema,
    records: Vec<Record>,
}
impl RecordSet {
    pub fn new(schema: Schema, records: Vec<Record>) -> Result<Self> {
        for (idx, record) in records.iter().enumerate() {
            if record.values.len() != schema.len() {
                return Err(SubgroupError::Load {
                    line: idx + 1,
                    message: format!(
                        "record has {} values but the schema has {} fields",
                        record.values.len(),
                        schema.len()
                    ),
                });
            }
            for (value, field) in record.values.iter().zip(schema.fields.iter()) {
                if value.kind() != field.kind {
                    return Err(SubgroupError::Load {
                        line: idx + 1,
                        message: format!(
                            "field {} expects {} but got {}",
                            field.name,
                            field.kind.name(),
                            value.kind().name()
                        ),
                    });
                }
            }
        }
        Ok(Self { schema, records })
    }
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
    pub fn records(&self) -> &[Record] {
        &self.records
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}
