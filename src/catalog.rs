//! Target catalog: per-attribute value frequencies computed once up front.
//!
//! The catalog lets candidate expansion reject conditions that cannot reach
//! the minimum support without touching the record set. Numeric thresholds
//! are produced by walking the histogram in pairs of consecutive values and
//! keeping a running count.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::Arc;

use crate::error::{Result, SubgroupError};
use crate::quality::Support;
use crate::record::{Accessor, Kind, RecordSet};

// ------------- CategoricalTarget -------------
#[derive(Debug, Clone)]
pub struct CategoricalTarget {
    name: Arc<str>,
    accessor: Accessor,
    values: BTreeMap<Arc<str>, usize>,
}
impl CategoricalTarget {
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }
    pub fn accessor(&self) -> Accessor {
        self.accessor
    }
    /// Distinct values with their counts over the full record set, in value order.
    pub fn values(&self) -> &BTreeMap<Arc<str>, usize> {
        &self.values
    }
}

// ------------- NumericTarget -------------
#[derive(Debug, Clone)]
pub struct NumericTarget {
    name: Arc<str>,
    accessor: Accessor,
    counter: BTreeMap<i64, usize>,
    min: i64,
    max: i64,
}
impl NumericTarget {
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }
    pub fn accessor(&self) -> Accessor {
        self.accessor
    }
    pub fn counter(&self) -> &BTreeMap<i64, usize> {
        &self.counter
    }
    /// Observed minimum, `None` when no record was seen.
    pub fn min(&self) -> Option<i64> {
        (!self.counter.is_empty()).then_some(self.min)
    }
    pub fn max(&self) -> Option<i64> {
        (!self.counter.is_empty()).then_some(self.max)
    }
    pub fn count_at_most(&self, threshold: i64) -> usize {
        self.counter.range(..=threshold).map(|(_, c)| c).sum()
    }
    pub fn count_at_least(&self, threshold: i64) -> usize {
        self.counter.range(threshold..).map(|(_, c)| c).sum()
    }

    /// Thresholds `v` for `attr <= v` conditions, ascending from just above
    /// the minimum in steps of two. A threshold is only produced once the
    /// running count has cleared the support bound. Positions covering no
    /// observed value are skipped, so every threshold selects a different
    /// subgroup and the walk is bounded by the number of distinct values.
    pub fn at_most_thresholds(&self, support: &Support) -> Vec<i64> {
        let mut thresholds = Vec::new();
        let (Some(first), Some(last)) = (
            self.min().and_then(|m| m.checked_add(1)),
            self.max().and_then(|m| m.checked_sub(1)),
        ) else {
            return thresholds;
        };
        let mut i = first;
        let mut frequency = self.count_at_most(i);
        while i <= last {
            if support.admits(frequency) {
                thresholds.push(i);
            }
            let Some((&next, _)) = self.counter.range((Excluded(i), Unbounded)).next() else {
                break;
            };
            // positions keep the parity of the first one
            let Some(position) = (if (next ^ first) & 1 == 0 { Some(next) } else { next.checked_add(1) }) else {
                break;
            };
            frequency += self.counter.range((Excluded(i), Included(position))).map(|(_, c)| c).sum::<usize>();
            i = position;
        }
        thresholds
    }

    /// Thresholds `v` for `attr >= v` conditions, the mirror image of
    /// [`NumericTarget::at_most_thresholds`] walking down from the maximum.
    pub fn at_least_thresholds(&self, support: &Support) -> Vec<i64> {
        let mut thresholds = Vec::new();
        let (Some(first), Some(last)) = (
            self.max().and_then(|m| m.checked_sub(1)),
            self.min().and_then(|m| m.checked_add(1)),
        ) else {
            return thresholds;
        };
        let mut i = first;
        let mut frequency = self.count_at_least(i);
        while i >= last {
            if support.admits(frequency) {
                thresholds.push(i);
            }
            let Some((&next, _)) = self.counter.range(..i).next_back() else {
                break;
            };
            let Some(position) = (if (next ^ first) & 1 == 0 { Some(next) } else { next.checked_sub(1) }) else {
                break;
            };
            frequency += self.counter.range((Included(position), Excluded(i))).map(|(_, c)| c).sum::<usize>();
            i = position;
        }
        thresholds
    }
}

// ------------- TargetCatalog -------------
#[derive(Debug, Clone)]
pub struct TargetCatalog {
    categorical: Vec<CategoricalTarget>,
    numeric: Vec<NumericTarget>,
}

fn expect_kind(name: &str, accessor: Accessor, expected: Kind) -> Result<Accessor> {
    if accessor.kind() != expected {
        return Err(SubgroupError::AttributeKind {
            name: name.to_string(),
            expected: expected.name(),
            found: accessor.kind().name(),
        });
    }
    Ok(accessor)
}

impl TargetCatalog {
    pub fn build(records: &RecordSet, categorical: &[String], numeric: &[String]) -> Result<Self> {
        let schema = records.schema();
        // resolve every name before touching a single record
        let mut categorical_targets = Vec::with_capacity(categorical.len());
        for name in categorical {
            let accessor = expect_kind(name, schema.accessor(name)?, Kind::Text)?;
            categorical_targets.push(CategoricalTarget {
                name: Arc::from(name.as_str()),
                accessor,
                values: BTreeMap::new(),
            });
        }
        let mut numeric_targets = Vec::with_capacity(numeric.len());
        for name in numeric {
            let accessor = expect_kind(name, schema.accessor(name)?, Kind::Integer)?;
            numeric_targets.push(NumericTarget {
                name: Arc::from(name.as_str()),
                accessor,
                counter: BTreeMap::new(),
                min: i64::MAX,
                max: i64::MIN,
            });
        }

        for record in records.iter() {
            for target in categorical_targets.iter_mut() {
                if let Some(value) = target.accessor.text(record) {
                    match target.values.get_mut(value) {
                        Some(count) => *count += 1,
                        None => {
                            target.values.insert(Arc::from(value), 1);
                        }
                    }
                }
            }
        }
        for record in records.iter() {
            for target in numeric_targets.iter_mut() {
                if let Some(value) = target.accessor.integer(record) {
                    *target.counter.entry(value).or_insert(0) += 1;
                    target.min = target.min.min(value);
                    target.max = target.max.max(value);
                }
            }
        }

        Ok(Self {
            categorical: categorical_targets,
            numeric: numeric_targets,
        })
    }
    pub fn categorical(&self) -> &[CategoricalTarget] {
        &self.categorical
    }
    pub fn numeric(&self) -> &[NumericTarget] {
        &self.numeric
    }
}
