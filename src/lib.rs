//! Subclad – exceptional subgroup discovery over an in-memory record set.
//!
//! A *subgroup* is the set of records satisfying a conjunction of simple
//! conditions such as `(Type = h)` or `(Rooms <= 3)`. Subclad searches the
//! space of such descriptions breadth first and ranks each subgroup by how far
//! the Pearson correlation between two measured fields inside it deviates from
//! a baseline correlation:
//! * the whole population (the default),
//! * the parent subgroup the description was grown from, or
//! * the complement, i.e. all records outside the subgroup.
//!
//! ## Modules
//! * [`record`] – Typed records, schema and name-to-accessor resolution.
//! * [`catalog`] – Value frequencies per attribute, used to prune before evaluating.
//! * [`condition`] – Conditions, candidates (search nodes) and canonical keys.
//! * [`quality`] – Single-pass correlation, support test and baseline strategy.
//! * [`topk`] – Bounded min-heap keeping the best candidates.
//! * [`search`] – The level-by-level driver with its worker pool and aggregator.
//! * [`interface`] – Background searches with cooperative cancellation.
//! * [`loader`], [`settings`], [`server`] – Collaborators used by the binary:
//!   delimited file loading, layered configuration and an HTTP endpoint.
//!
//! ## Search
//! Expansion only ever appends conditions on attributes at or after a
//! candidate's cursors, so every set of conditions is produced once per
//! attribute ordering. Categorical and numeric cursors advance independently,
//! which means the same set can still be reached along two paths; those are
//! caught by a per-level set of canonical keys. Candidates whose support ratio
//! does not strictly exceed the minimum support are discarded, first
//! optimistically from catalog counts and then for real after evaluation.
//!
//! ## Quick Start
//! ```
//! use subclad::record::{Field, Kind, Record, RecordSet, Schema, Value};
//! use subclad::search::{search, MeasuredPair, SearchConfig};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Type", Kind::Text),
//!     Field::new("Area", Kind::Float),
//!     Field::new("Price", Kind::Integer),
//! ]);
//! let records = (0..40)
//!     .map(|i| {
//!         let kind = if i % 2 == 0 { "h" } else { "u" };
//!         let price = if i % 2 == 0 { 3 * i } else { 100 - i * (i % 3) };
//!         Record::new(vec![Value::from(kind), Value::from(i as f64), Value::from(price as i64)])
//!     })
//!     .collect();
//! let records = RecordSet::new(schema, records).unwrap();
//! let config = SearchConfig {
//!     categorical_attributes: vec!["Type".into()],
//!     measured_pair: MeasuredPair::new("Area", "Price"),
//!     max_depth: 1,
//!     min_support: 0.1,
//!     ..SearchConfig::default()
//! };
//! let outcome = search(&records, config).unwrap();
//! assert_eq!(outcome.results.len(), 2);
//! ```

pub mod catalog;
pub mod condition;
pub mod error;
pub mod interface;
pub mod loader;
pub mod quality;
pub mod record;
pub mod search;
pub mod server;
pub mod settings;
pub mod topk;

pub use error::{Result, SubgroupError};
pub use search::{Search, SearchConfig, SearchOutcome, search};
