use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::index::{BigramIndex, RecordSet};
use crate::model::{RecordId, SourceRow};

/// Generate `count` rows with sparse, signed record ids and two description columns.
///
/// Tokens come from a vocabulary of `vocabulary` words, so a smaller
/// vocabulary yields larger clusters. The second column is null with
/// `null_probability`; roughly one row in fifty is entirely blank.
pub fn generate_rows(count: u64, vocabulary: u32, null_probability: f64, seed: u64) -> Vec<SourceRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let vocabulary = vocabulary.max(1);
    let mut rows = Vec::with_capacity(count as usize);

    for i in 0..count {
        // Sparse ids on both sides of zero
        let centered = i as i64 - (count / 2) as i64;
        let record_id = centered.wrapping_mul(7_919) ^ ((seed as i64) << 20);

        if rng.random_bool(0.02) {
            rows.push(SourceRow::new(record_id, ["   ", "NULL"]));
            continue;
        }

        let token_count = rng.random_range(1..=5);
        let description: Vec<String> = (0..token_count)
            .map(|_| format!("w{}", rng.random_range(0..vocabulary)))
            .collect();

        let brand = if rng.random_bool(null_probability) {
            "null".to_string()
        } else {
            format!("brand{}", rng.random_range(0..vocabulary * 4))
        };

        rows.push(SourceRow::new(record_id, [description.join(" "), brand]));
    }

    rows
}

/// Connected components of the record/bigram co-occurrence graph, found by
/// breadth-first search. Same canonical shape as `ClusteringResult::partition`.
pub fn reference_partition(index: &BigramIndex) -> Vec<Vec<RecordId>> {
    let mut bigrams_of: HashMap<RecordId, Vec<&str>> = HashMap::new();
    for (bigram, records) in index.iter() {
        for record_id in records {
            bigrams_of.entry(*record_id).or_default().push(bigram);
        }
    }

    let mut visited_records: HashSet<RecordId> = HashSet::new();
    let mut visited_bigrams: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();

    let mut starts: Vec<RecordId> = bigrams_of.keys().copied().collect();
    starts.sort_unstable();

    for start in starts {
        if !visited_records.insert(start) {
            continue;
        }
        let mut group = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some(record_id) = queue.pop_front() {
            for &bigram in &bigrams_of[&record_id] {
                if !visited_bigrams.insert(bigram) {
                    continue;
                }
                for neighbour in index.get(bigram).into_iter().flatten() {
                    if visited_records.insert(*neighbour) {
                        group.push(*neighbour);
                        queue.push_back(*neighbour);
                    }
                }
            }
        }

        group.sort_unstable();
        groups.push(group);
    }

    groups.sort_unstable();
    groups
}

/// Index entries in a seeded random order.
pub fn shuffled_entries(index: &BigramIndex, seed: u64) -> Vec<(&str, &RecordSet)> {
    let mut entries: Vec<(&str, &RecordSet)> = index.iter().collect();
    entries.sort_unstable_by_key(|(bigram, _)| *bigram);
    entries.shuffle(&mut StdRng::seed_from_u64(seed));
    entries
}
