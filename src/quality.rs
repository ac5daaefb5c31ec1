//! Quality evaluation: a single pass over the record set yielding the
//! Pearson correlation of the measured pair inside a subgroup (and, in the
//! same pass, inside its complement).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::{Result, SubgroupError};
use crate::record::{Accessor, Kind, Record, RecordSet};

// ------------- Support -------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Support {
    total: usize,
    min_support: f64,
}
impl Support {
    pub fn new(total: usize, min_support: f64) -> Self {
        Self { total, min_support }
    }
    /// Strict: a ratio equal to the minimum support does not pass.
    pub fn admits(&self, count: usize) -> bool {
        self.total > 0 && (count as f64 / self.total as f64) > self.min_support
    }
    pub fn ratio(&self, count: usize) -> f64 {
        if self.total == 0 { 0.0 } else { count as f64 / self.total as f64 }
    }
}

// ------------- Baseline -------------
/// What a subgroup's correlation is compared against when scoring it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    #[default]
    Population,
    Parent,
    Complement,
}
impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Baseline::Population => "population",
            Baseline::Parent => "parent",
            Baseline::Complement => "complement",
        };
        write!(f, "{}", s)
    }
}

pub fn score(correlation: f64, baseline: f64) -> f64 {
    (correlation - baseline).abs()
}

// ------------- Statistic -------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistic {
    /// `None` when either measured field has zero variance in the subset.
    pub correlation: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub subgroup: Statistic,
    pub complement: Statistic,
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    n: usize,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}
impl Moments {
    fn push(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }
    fn correlation(&self) -> Option<f64> {
        let n = self.n as f64;
        let var_x = n * self.sum_xx - self.sum_x * self.sum_x;
        let var_y = n * self.sum_yy - self.sum_y * self.sum_y;
        if var_x <= 0.0 || var_y <= 0.0 {
            return None;
        }
        let r = (n * self.sum_xy - self.sum_x * self.sum_y) / (var_x * var_y).sqrt();
        r.is_finite().then_some(r)
    }
    fn statistic(&self) -> Statistic {
        Statistic {
            correlation: self.correlation(),
            count: self.n,
        }
    }
}

// ------------- Measure -------------
/// The measured pair, resolved to accessors once.
#[derive(Debug, Clone)]
pub struct Measure {
    x: Accessor,
    y: Accessor,
}

fn numeric_accessor(records: &RecordSet, name: &str) -> Result<Accessor> {
    let accessor = records.schema().accessor(name)?;
    if accessor.kind() == Kind::Text {
        return Err(SubgroupError::AttributeKind {
            name: name.to_string(),
            expected: "numeric",
            found: Kind::Text.name(),
        });
    }
    Ok(accessor)
}

impl Measure {
    pub fn resolve(records: &RecordSet, x: &str, y: &str) -> Result<Self> {
        Ok(Self {
            x: numeric_accessor(records, x)?,
            y: numeric_accessor(records, y)?,
        })
    }
    fn pair(&self, record: &Record) -> Option<(f64, f64)> {
        Some((self.x.number(record)?, self.y.number(record)?))
    }

    /// One pass over `records`; a record belongs to the subgroup iff it
    /// satisfies every condition. An empty condition list is the population.
    pub fn evaluate(&self, records: &RecordSet, conditions: &[Condition]) -> Evaluation {
        let mut inside = Moments::default();
        let mut outside = Moments::default();
        for record in records.iter() {
            let Some((x, y)) = self.pair(record) else {
                continue;
            };
            if conditions.iter().all(|c| c.matches(record)) {
                inside.push(x, y);
            } else {
                outside.push(x, y);
            }
        }
        Evaluation {
            subgroup: inside.statistic(),
            complement: outside.statistic(),
        }
    }
}
