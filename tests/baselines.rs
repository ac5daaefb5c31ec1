use std::collections::HashMap;

use subclad::condition::canonical_key;
use subclad::quality::{Baseline, Measure};
use subclad::record::{Field, Kind, Record, RecordSet, Schema, Value};
use subclad::search::{MeasuredPair, SearchConfig, search};

// Two categorical attributes and one numeric, with the relation between
// Size and Cost flipping sign for Shape = round.
fn setup() -> RecordSet {
    let schema = Schema::new(vec![
        Field::new("Shape", Kind::Text),
        Field::new("Tone", Kind::Text),
        Field::new("Level", Kind::Integer),
        Field::new("Size", Kind::Integer),
        Field::new("Cost", Kind::Float),
    ]);
    let shapes = ["round", "square", "flat"];
    let tones = ["dark", "light"];
    let records = (0..240i64)
        .map(|i| {
            let shape = shapes[(i % 3) as usize];
            let tone = tones[((i / 3) % 2) as usize];
            let level = (i * 7) % 8;
            let size = 10 + (i * 13) % 50;
            let wobble = ((i * 29) % 17) as f64;
            let cost = if shape == "round" { 400.0 - 3.0 * size as f64 } else { 2.0 * size as f64 + level as f64 * 5.0 } + wobble;
            Record::new(vec![
                Value::from(shape),
                Value::from(tone),
                Value::from(level),
                Value::from(size),
                Value::from(cost),
            ])
        })
        .collect();
    RecordSet::new(schema, records).unwrap()
}

fn config(baseline: Baseline) -> SearchConfig {
    SearchConfig {
        categorical_attributes: vec!["Shape".into(), "Tone".into()],
        numeric_attributes: vec!["Level".into()],
        measured_pair: MeasuredPair::new("Size", "Cost"),
        max_depth: 2,
        min_support: 0.05,
        top_k: 10_000,
        worker_count: 3,
        baseline,
        ..SearchConfig::default()
    }
}

#[test]
fn parent_baseline_uses_a_generating_subgroup() {
    let records = setup();
    let outcome = search(&records, config(Baseline::Parent)).unwrap();
    let population = outcome.population.correlation.unwrap();
    let singles: HashMap<String, f64> = outcome
        .results
        .iter()
        .filter(|s| s.depth() == 1)
        .map(|s| (s.description.clone(), s.correlation))
        .collect();
    assert!(!singles.is_empty());
    let mut pairs = 0;
    for s in &outcome.results {
        if s.depth() == 1 {
            assert_eq!(s.baseline, population, "{}", s.description);
            continue;
        }
        pairs += 1;
        let parents: Vec<f64> = s
            .conditions
            .iter()
            .filter_map(|c| singles.get(&canonical_key(std::slice::from_ref(c))).copied())
            .collect();
        assert!(parents.contains(&s.baseline), "{} has baseline {}", s.description, s.baseline);
    }
    assert!(pairs > 0);
}

#[test]
fn parent_baseline_prefers_the_smaller_parent_key() {
    let records = setup();
    let outcome = search(&records, config(Baseline::Parent)).unwrap();
    let by_key: HashMap<String, f64> = outcome
        .results
        .iter()
        .map(|s| (s.description.clone(), s.correlation))
        .collect();
    // reachable from both conditions; "(Level <= v)" sorts before "(Shape = round)"
    let twice = outcome
        .results
        .iter()
        .find(|s| s.depth() == 2 && s.description.contains("(Level <=") && s.description.contains("(Shape = round)"))
        .expect("a Level and Shape intersection is supported");
    let level = twice.conditions.iter().find(|c| c.attribute() == "Level").unwrap();
    let level_key = canonical_key(std::slice::from_ref(level));
    assert_eq!(twice.baseline, by_key[&level_key]);
}

#[test]
fn complement_baseline_matches_records_outside() {
    let records = setup();
    let outcome = search(&records, config(Baseline::Complement)).unwrap();
    assert_eq!(outcome.baseline, Baseline::Complement);
    let measure = Measure::resolve(&records, "Size", "Cost").unwrap();
    for s in &outcome.results {
        let evaluation = measure.evaluate(&records, &s.conditions);
        assert_eq!(evaluation.subgroup.count, s.count);
        assert_eq!(evaluation.complement.count, records.len() - s.count);
        assert_eq!(evaluation.complement.correlation, Some(s.baseline), "{}", s.description);
    }
}

#[test]
fn baseline_choice_changes_ranking_not_membership() {
    let records = setup();
    let population = search(&records, config(Baseline::Population)).unwrap();
    let complement = search(&records, config(Baseline::Complement)).unwrap();
    let mut a: Vec<String> = population.results.iter().map(|s| s.description.clone()).collect();
    let mut b: Vec<String> = complement.results.iter().map(|s| s.description.clone()).collect();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn within_scores_reference_a_contained_subgroup() {
    let records = setup();
    let outcome = search(&records, config(Baseline::Population)).unwrap();
    assert!(!outcome.within.is_empty());
    let singles: HashMap<String, f64> = outcome
        .results
        .iter()
        .filter(|s| s.depth() == 1)
        .map(|s| (s.description.clone(), s.correlation))
        .collect();
    let mut previous = f64::INFINITY;
    for s in &outcome.within {
        let within = s.within.as_ref().expect("within entries carry a reference");
        assert_eq!(s.depth(), 2);
        assert!(within.score > 0.0);
        assert!(within.score <= previous);
        previous = within.score;
        assert!(s.description.contains(&within.reference));
        assert_eq!(singles[&within.reference], within.reference_correlation);
        assert!((within.score - (s.correlation - within.reference_correlation).abs()).abs() < 1e-12);
        // the reported reference is the one deviating most
        for c in &s.conditions {
            if let Some(r) = singles.get(&canonical_key(std::slice::from_ref(c))) {
                assert!((s.correlation - r).abs() <= within.score + 1e-12);
            }
        }
    }
}

#[test]
fn within_height_two_compares_against_condition_pairs() {
    let records = setup();
    let mut c = config(Baseline::Population);
    c.max_depth = 3;
    c.within_height = 2;
    let outcome = search(&records, c).unwrap();
    let by_key: HashMap<String, f64> = outcome
        .results
        .iter()
        .map(|s| (s.description.clone(), s.correlation))
        .collect();

    let deep: Vec<_> = outcome.within.iter().filter(|s| s.depth() == 3).collect();
    assert!(!deep.is_empty());
    for s in deep {
        let within = s.within.as_ref().unwrap();
        let reference_depth = within.reference.matches('(').count();
        assert!((1..=2).contains(&reference_depth), "{}", within.reference);
        assert_eq!(by_key[&within.reference], within.reference_correlation);
        // every one- and two-condition sub-description is a candidate reference
        let conditions = &s.conditions;
        let mut keys = Vec::new();
        for i in 0..conditions.len() {
            keys.push(canonical_key(&conditions[i..=i]));
            for j in i + 1..conditions.len() {
                keys.push(canonical_key(&[conditions[i].clone(), conditions[j].clone()]));
            }
        }
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&within.reference));
        for key in &keys {
            if let Some(r) = by_key.get(key) {
                assert!((s.correlation - r).abs() <= within.score + 1e-12, "{} vs {}", s.description, key);
            }
        }
    }
}

#[test]
fn within_height_one_ignores_condition_pairs() {
    let records = setup();
    let mut c = config(Baseline::Population);
    c.max_depth = 3;
    let outcome = search(&records, c).unwrap();
    for s in &outcome.within {
        let within = s.within.as_ref().unwrap();
        assert_eq!(within.reference.matches('(').count(), 1, "{}", s.description);
    }
}
