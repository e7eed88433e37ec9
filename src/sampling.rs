//! Seeded class balancing and subsampling of observation rows

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Randomly undersample every class down to the size of the smallest class
///
/// Rows are returned grouped by class (in ascending class order); within a class the
/// kept rows stay in their original order. The same seed always keeps the same rows.
pub fn undersample<T, K, F>(rows: &[T], class_of: F, seed: u64) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut by_class: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        by_class.entry(class_of(row)).or_default().push(i);
    }
    let minority = match by_class.values().map(Vec::len).min() {
        Some(n) => n,
        None => return Vec::new(),
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut balanced = Vec::with_capacity(minority * by_class.len());
    for members in by_class.values() {
        let mut keep: Vec<usize> = if members.len() == minority {
            members.clone()
        } else {
            index::sample(&mut rng, members.len(), minority)
                .into_iter()
                .map(|i| members[i])
                .collect()
        };
        keep.sort_unstable();
        balanced.extend(keep.into_iter().map(|i| rows[i].clone()));
    }
    balanced
}

/// Draw `n` rows uniformly without replacement (all rows, shuffled, if fewer exist)
pub fn subsample<T: Clone>(rows: &[T], n: usize, seed: u64) -> Vec<T> {
    let amount = if n > rows.len() {
        log::warn!(
            "Requested a sample of {} rows but only {} are available",
            n,
            rows.len()
        );
        rows.len()
    } else {
        n
    };
    let mut rng = StdRng::seed_from_u64(seed);
    index::sample(&mut rng, rows.len(), amount)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect()
}
