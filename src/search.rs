//! Breadth-first subgroup search.
//!
//! Each level expands every frontier candidate on a bounded pool of worker
//! threads. Workers only read the shared [`SearchContext`] and send scored,
//! support-passing children to the driver thread, which alone owns the
//! per-level seen set and the top-K stores. A level is finished when every
//! worker has been joined and the output channel is drained; only then is the
//! next level dispatched.

use core::hash::BuildHasherDefault;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use seahash::SeaHasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::catalog::TargetCatalog;
use crate::condition::{Candidate, Condition, Within, canonical_key};
use crate::error::{Result, SubgroupError};
use crate::interface::CancelToken;
use crate::quality::{self, Baseline, Measure, Statistic, Support};
use crate::record::RecordSet;
use crate::topk::TopK;

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// ------------- SearchConfig -------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasuredPair {
    pub x: String,
    pub y: String,
}
impl MeasuredPair {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self { x: x.into(), y: y.into() }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub categorical_attributes: Vec<String>,
    pub numeric_attributes: Vec<String>,
    pub measured_pair: MeasuredPair,
    pub max_depth: usize,
    pub min_support: f64,
    pub top_k: usize,
    pub worker_count: usize,
    pub baseline: Baseline,
    /// Candidates up to this depth serve as references for the within score.
    pub within_height: usize,
    /// No new level is dispatched once this much time has passed.
    pub time_budget_ms: Option<u64>,
}
impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            categorical_attributes: Vec::new(),
            numeric_attributes: Vec::new(),
            measured_pair: MeasuredPair::default(),
            max_depth: 3,
            min_support: 0.01,
            top_k: 10,
            worker_count: default_workers(),
            baseline: Baseline::Population,
            within_height: 1,
            time_budget_ms: None,
        }
    }
}
impl SearchConfig {
    pub fn validate(&self, records: &RecordSet) -> Result<()> {
        if records.is_empty() {
            return Err(SubgroupError::EmptyRecordSet);
        }
        if self.max_depth == 0 {
            return Err(SubgroupError::Config("max_depth must be positive".into()));
        }
        if self.top_k == 0 {
            return Err(SubgroupError::Config("top_k must be positive".into()));
        }
        if self.worker_count == 0 {
            return Err(SubgroupError::Config("worker_count must be positive".into()));
        }
        // written so that NaN is rejected too
        if !(self.min_support > 0.0 && self.min_support < 1.0) {
            return Err(SubgroupError::Config(format!(
                "min_support must lie in (0, 1), got {}",
                self.min_support
            )));
        }
        let mut names = HashSet::<&str, KeyHasher>::default();
        for name in self.categorical_attributes.iter().chain(self.numeric_attributes.iter()) {
            if !names.insert(name.as_str()) {
                return Err(SubgroupError::Config(format!("attribute {} is listed twice", name)));
            }
        }
        Ok(())
    }
}

// ------------- Outcome -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    MaxDepth,
    Exhausted,
    Deadline,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subgroup {
    pub description: String,
    pub conditions: Vec<Condition>,
    pub score: f64,
    pub count: usize,
    pub support: f64,
    pub correlation: f64,
    pub baseline: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub within: Option<Within>,
}
impl Subgroup {
    fn from_candidate(candidate: &Candidate, support: &Support) -> Self {
        Self {
            description: candidate.key(),
            conditions: candidate.conditions().to_vec(),
            score: candidate.score(),
            count: candidate.count(),
            support: support.ratio(candidate.count()),
            correlation: candidate.correlation(),
            baseline: candidate.baseline(),
            within: candidate.within().cloned(),
        }
    }
    pub fn depth(&self) -> usize {
        self.conditions.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub depth: usize,
    pub frontier: usize,
    pub evaluated: usize,
    pub unsupported: usize,
    pub unscoreable: usize,
    pub duplicates: usize,
    pub retained: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub population: Statistic,
    pub baseline: Baseline,
    /// Best subgroups by score, best first.
    pub results: Vec<Subgroup>,
    /// Best subgroups by within score, best first.
    pub within: Vec<Subgroup>,
    pub levels: Vec<LevelSummary>,
    pub stop: StopReason,
    pub elapsed_ms: f64,
}
impl SearchOutcome {
    pub fn evaluated(&self) -> usize {
        self.levels.iter().map(|l| l.evaluated).sum()
    }
    pub fn retained(&self) -> usize {
        self.levels.iter().map(|l| l.retained).sum()
    }
}

// ------------- SearchContext -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expansion {
    Categorical,
    AtMost,
    AtLeast,
}
impl Expansion {
    const ALL: [Expansion; 3] = [Expansion::Categorical, Expansion::AtMost, Expansion::AtLeast];
}

struct Job {
    parent: Arc<Candidate>,
    expansion: Expansion,
}

enum Verdict {
    Accepted(Candidate),
    Unsupported,
    Unscoreable(Candidate),
}

#[derive(Debug, Default)]
struct Tally {
    evaluated: usize,
    unsupported: usize,
    unscoreable: usize,
}

/// Everything workers need, all of it read-only during a run.
pub struct SearchContext<'r> {
    records: &'r RecordSet,
    catalog: TargetCatalog,
    measure: Measure,
    support: Support,
    baseline: Baseline,
    population: Statistic,
    // thresholds depend only on the catalog, so they are walked once
    at_most: Vec<Vec<i64>>,
    at_least: Vec<Vec<i64>>,
}
impl<'r> SearchContext<'r> {
    fn population_correlation(&self) -> f64 {
        self.population.correlation.unwrap_or(f64::NAN)
    }

    fn expand(&self, parent: &Candidate, expansion: Expansion, mut emit: impl FnMut(Candidate)) {
        match expansion {
            Expansion::Categorical => {
                let targets = self.catalog.categorical().iter().enumerate();
                for (idx, target) in targets.skip(parent.next_categorical()) {
                    for (value, count) in target.values() {
                        // catalog counts ignore the parent's conditions, so this is only a necessary test
                        if !self.support.admits(*count) {
                            continue;
                        }
                        let condition = Condition::equal(target, Arc::clone(value));
                        emit(parent.child(condition, idx + 1, parent.next_numeric()));
                    }
                }
            }
            Expansion::AtMost => {
                let targets = self.catalog.numeric().iter().enumerate();
                for (idx, target) in targets.skip(parent.next_numeric()) {
                    for &threshold in &self.at_most[idx] {
                        let condition = Condition::at_most(target, threshold);
                        emit(parent.child(condition, parent.next_categorical(), idx + 1));
                    }
                }
            }
            Expansion::AtLeast => {
                let targets = self.catalog.numeric().iter().enumerate();
                for (idx, target) in targets.skip(parent.next_numeric()) {
                    for &threshold in &self.at_least[idx] {
                        let condition = Condition::at_least(target, threshold);
                        emit(parent.child(condition, parent.next_categorical(), idx + 1));
                    }
                }
            }
        }
    }

    fn evaluate(&self, parent: &Candidate, child: Candidate) -> Verdict {
        let evaluation = self.measure.evaluate(self.records, child.conditions());
        let subgroup = evaluation.subgroup;
        if !self.support.admits(subgroup.count) {
            return Verdict::Unsupported;
        }
        let Some(correlation) = subgroup.correlation else {
            return Verdict::Unscoreable(child);
        };
        let baseline = match self.baseline {
            Baseline::Population => self.population_correlation(),
            Baseline::Parent => parent.correlation(),
            Baseline::Complement => match evaluation.complement.correlation {
                Some(c) => c,
                None => return Verdict::Unscoreable(child),
            },
        };
        Verdict::Accepted(child.scored(correlation, subgroup.count, baseline))
    }

    fn work(&self, jobs: Receiver<Job>, out: mpsc::Sender<Candidate>) -> Tally {
        let mut tally = Tally::default();
        for job in jobs.iter() {
            let mut open = true;
            self.expand(&job.parent, job.expansion, |child| {
                if !open {
                    return;
                }
                tally.evaluated += 1;
                match self.evaluate(&job.parent, child) {
                    Verdict::Accepted(candidate) => {
                        // the driver only hangs up when it is gone for good
                        if out.send(candidate).is_err() {
                            open = false;
                        }
                    }
                    Verdict::Unsupported => tally.unsupported += 1,
                    Verdict::Unscoreable(candidate) => {
                        tally.unscoreable += 1;
                        trace!(subgroup = %candidate, "zero variance, not scored");
                    }
                }
            });
            if !open {
                break;
            }
        }
        tally
    }
}

// ------------- Aggregator -------------
// Owned by the driver thread, so none of this needs a lock. Children are
// collected per level and released in key order once the level is complete,
// which keeps the outcome independent of thread scheduling.
struct Aggregator {
    within_height: usize,
    level: HashMap<String, Candidate, KeyHasher>,
    references: HashMap<String, f64, KeyHasher>,
    top: TopK,
    within_top: TopK,
}

fn subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn extend(start: usize, n: usize, k: usize, current: &mut Vec<usize>, all: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            all.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            extend(i + 1, n, k, current, all);
            current.pop();
        }
    }
    let mut all = Vec::new();
    extend(0, n, k, &mut Vec::with_capacity(k), &mut all);
    all
}

impl Aggregator {
    fn new(top_k: usize, within_height: usize) -> Self {
        Self {
            within_height,
            level: HashMap::default(),
            references: HashMap::default(),
            top: TopK::new(top_k),
            within_top: TopK::by(top_k, Candidate::within_score),
        }
    }

    fn within(&self, candidate: &Candidate) -> Option<Within> {
        let conditions = candidate.conditions();
        let largest = self.within_height.min(conditions.len().saturating_sub(1));
        let mut best: Option<Within> = None;
        for size in 1..=largest {
            for subset in subsets(conditions.len(), size) {
                let picked: Vec<Condition> = subset.iter().map(|&i| conditions[i].clone()).collect();
                let key = canonical_key(&picked);
                let Some(&reference) = self.references.get(&key) else {
                    continue;
                };
                let score = quality::score(candidate.correlation(), reference);
                if best.as_ref().is_none_or(|b| score > b.score) {
                    best = Some(Within {
                        score,
                        reference: key,
                        reference_correlation: reference,
                    });
                }
            }
        }
        best
    }

    /// Records a support-passing child. A key seen before at this level is a
    /// duplicate; of the two, the one reached from the smaller parent key is kept.
    fn accept(&mut self, candidate: Candidate, summary: &mut LevelSummary) {
        match self.level.entry(candidate.key()) {
            Entry::Vacant(e) => {
                e.insert(candidate);
            }
            Entry::Occupied(mut e) => {
                summary.duplicates += 1;
                if candidate.parent_key() < e.get().parent_key() {
                    e.insert(candidate);
                }
            }
        }
    }

    /// Offers the level's survivors to the top-K stores and returns them as
    /// the next frontier.
    fn finish_level(&mut self, summary: &mut LevelSummary) -> Vec<Arc<Candidate>> {
        let mut survivors: Vec<(String, Candidate)> = self.level.drain().collect();
        survivors.sort_by(|a, b| a.0.cmp(&b.0));
        let mut next = Vec::with_capacity(survivors.len());
        for (key, mut candidate) in survivors {
            if let Some(within) = self.within(&candidate) {
                candidate.set_within(within);
            }
            if candidate.depth() <= self.within_height {
                self.references.insert(key, candidate.correlation());
            }
            let candidate = Arc::new(candidate);
            self.top.offer(Arc::clone(&candidate));
            if candidate.within_score() > 0.0 {
                self.within_top.offer(Arc::clone(&candidate));
            }
            next.push(candidate);
        }
        summary.retained = next.len();
        next
    }
}

// ------------- Search -------------
/// A validated search, ready to run. Building it resolves every attribute and
/// computes the catalog and the population statistic.
pub struct Search<'r> {
    config: SearchConfig,
    context: SearchContext<'r>,
}
impl<'r> Search<'r> {
    pub fn new(records: &'r RecordSet, config: SearchConfig) -> Result<Self> {
        config.validate(records)?;
        let measure = Measure::resolve(records, &config.measured_pair.x, &config.measured_pair.y)?;
        let catalog = TargetCatalog::build(records, &config.categorical_attributes, &config.numeric_attributes)?;
        let population = measure.evaluate(records, &[]).subgroup;
        if population.correlation.is_none() {
            return Err(SubgroupError::DegenerateBaseline {
                x: config.measured_pair.x.clone(),
                y: config.measured_pair.y.clone(),
            });
        }
        let support = Support::new(records.len(), config.min_support);
        let at_most = catalog.numeric().iter().map(|t| t.at_most_thresholds(&support)).collect();
        let at_least = catalog.numeric().iter().map(|t| t.at_least_thresholds(&support)).collect();
        Ok(Self {
            context: SearchContext {
                records,
                catalog,
                measure,
                support,
                baseline: config.baseline,
                population,
                at_most,
                at_least,
            },
            config,
        })
    }
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }
    pub fn catalog(&self) -> &TargetCatalog {
        &self.context.catalog
    }
    pub fn population(&self) -> Statistic {
        self.context.population
    }

    pub fn run(&self) -> Result<SearchOutcome> {
        self.run_until(&CancelToken::new())
    }

    /// Runs level by level until the depth limit, an empty frontier, the
    /// time budget or a cancellation. Deadline and cancellation are only
    /// observed between levels.
    pub fn run_until(&self, cancel: &CancelToken) -> Result<SearchOutcome> {
        let started = Instant::now();
        let deadline = self.config.time_budget_ms.map(|ms| started + Duration::from_millis(ms));
        let context = &self.context;
        info!(
            records = context.records.len(),
            categorical = context.catalog.categorical().len(),
            numeric = context.catalog.numeric().len(),
            population = context.population_correlation(),
            baseline = %self.config.baseline,
            "search started"
        );

        let mut aggregator = Aggregator::new(self.config.top_k, self.config.within_height);
        let root = Candidate::root(context.population_correlation(), context.population.count);
        let mut frontier = vec![Arc::new(root)];
        let mut levels = Vec::new();
        let stop = loop {
            if levels.len() >= self.config.max_depth {
                break StopReason::MaxDepth;
            }
            if frontier.is_empty() {
                break StopReason::Exhausted;
            }
            if cancel.is_cancelled() {
                warn!(depth = levels.len(), "search cancelled");
                break StopReason::Cancelled;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(depth = levels.len(), "time budget spent, returning current results");
                break StopReason::Deadline;
            }
            let level_started = Instant::now();
            let (summary, next) = self.run_level(&frontier, levels.len() + 1, &mut aggregator)?;
            frontier = next;
            info!(
                depth = summary.depth,
                frontier = summary.frontier,
                evaluated = summary.evaluated,
                retained = summary.retained,
                ms = level_started.elapsed().as_secs_f64() * 1000.0,
                "level complete"
            );
            debug!(
                depth = summary.depth,
                unsupported = summary.unsupported,
                unscoreable = summary.unscoreable,
                duplicates = summary.duplicates,
                "level pruning"
            );
            levels.push(summary);
        };

        let Aggregator { top, within_top, .. } = aggregator;
        let support = &context.support;
        let drain = |store: TopK| -> Vec<Subgroup> {
            store
                .into_sorted_vec()
                .iter()
                .map(|c| Subgroup::from_candidate(c, support))
                .collect()
        };
        let results = drain(top);
        let within = drain(within_top);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(ms = elapsed_ms, results = results.len(), stop = ?stop, "search complete");
        Ok(SearchOutcome {
            population: context.population,
            baseline: self.config.baseline,
            results,
            within,
            levels,
            stop,
            elapsed_ms,
        })
    }

    fn run_level(
        &self,
        frontier: &[Arc<Candidate>],
        depth: usize,
        aggregator: &mut Aggregator,
    ) -> Result<(LevelSummary, Vec<Arc<Candidate>>)> {
        let context = &self.context;
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        for parent in frontier {
            for expansion in Expansion::ALL {
                job_tx
                    .send(Job { parent: Arc::clone(parent), expansion })
                    .map_err(|e| SubgroupError::Execution(e.to_string()))?;
            }
        }
        drop(job_tx);

        let workers = self.config.worker_count.min(frontier.len() * Expansion::ALL.len()).max(1);
        let mut summary = LevelSummary {
            depth,
            frontier: frontier.len(),
            ..LevelSummary::default()
        };
        let (out_tx, out_rx) = mpsc::channel::<Candidate>();
        let joined = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let jobs = job_rx.clone();
                    let out = out_tx.clone();
                    scope.spawn(move || context.work(jobs, out))
                })
                .collect();
            // the loop below ends once every worker has dropped its sender
            drop(out_tx);
            for candidate in out_rx.iter() {
                aggregator.accept(candidate, &mut summary);
            }
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });
        for tally in joined {
            let tally = tally.map_err(|_| SubgroupError::Execution("search worker panicked".into()))?;
            summary.evaluated += tally.evaluated;
            summary.unsupported += tally.unsupported;
            summary.unscoreable += tally.unscoreable;
        }
        let next = aggregator.finish_level(&mut summary);
        Ok((summary, next))
    }
}

/// Validates `config` against `records` and runs the search to completion.
pub fn search(records: &RecordSet, config: SearchConfig) -> Result<SearchOutcome> {
    Search::new(records, config)?.run()
}
