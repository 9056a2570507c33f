//! Congruence partition of one bucket into byte-identical classes.
//!
//! # Algorithm
//!
//! 1. **Fast path**: compare neighbours in discovery order. If every
//!    neighbour pair is equal the bucket is one class and nothing is sorted.
//!    This is the common case when a whole subtree was copied.
//! 2. **General path**: merge-sort the members by content using the
//!    memoized comparator, then cut a class boundary between sorted
//!    neighbours that differ. Each distinct pair is read at most once.
//!
//! The sort is stable, so each class keeps its members in discovery order
//! and its first member is the earliest discovered.
//!
//! A member that cannot be read is dropped and the partition is retried
//! with the remaining members. Comparisons already made are reused.

use std::cmp::Ordering;

use super::compare::{ComparatorCache, FailedMember};

/// Result of partitioning one bucket.
#[derive(Debug, Default)]
pub struct PartitionOutcome {
    /// Congruence classes, singletons included
    pub classes: Vec<Vec<usize>>,
    /// Members excluded because they could not be read
    pub failed: Vec<FailedMember>,
}

/// Stable merge sort with a fallible comparator.
fn try_merge_sort<E>(
    items: Vec<usize>,
    cmp: &mut impl FnMut(usize, usize) -> Result<Ordering, E>,
) -> Result<Vec<usize>, E> {
    if items.len() <= 1 {
        return Ok(items);
    }

    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = try_merge_sort(left, cmp)?;
    let right = try_merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if cmp(left[i], right[j])? == Ordering::Greater {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    Ok(merged)
}

/// Partition `members` once, failing on the first unreadable member.
///
/// # Errors
///
/// Returns the member whose read failed.
pub fn partition(
    members: &[usize],
    cache: &mut ComparatorCache<'_>,
) -> Result<Vec<Vec<usize>>, FailedMember> {
    if members.len() <= 1 {
        return Ok(vec![members.to_vec()]);
    }

    let mut all_equal = true;
    for pair in members.windows(2) {
        if cache.compare(pair[0], pair[1])? != Ordering::Equal {
            all_equal = false;
            break;
        }
    }
    if all_equal {
        return Ok(vec![members.to_vec()]);
    }

    let sorted = try_merge_sort(members.to_vec(), &mut |a, b| cache.compare(a, b))?;

    let mut classes: Vec<Vec<usize>> = Vec::new();
    let mut current = vec![sorted[0]];
    for pair in sorted.windows(2) {
        if cache.compare(pair[0], pair[1])? == Ordering::Equal {
            current.push(pair[1]);
        } else {
            classes.push(std::mem::replace(&mut current, vec![pair[1]]));
        }
    }
    classes.push(current);
    Ok(classes)
}

/// Partition `members`, excluding unreadable members and retrying.
pub fn partition_members(members: &[usize], cache: &mut ComparatorCache<'_>) -> PartitionOutcome {
    let mut remaining = members.to_vec();
    let mut outcome = PartitionOutcome::default();

    loop {
        match partition(&remaining, cache) {
            Ok(classes) => {
                outcome.classes = classes;
                return outcome;
            }
            Err(failed) => {
                log::warn!("{}", failed.error);
                remaining.retain(|&m| m != failed.member);
                outcome.failed.push(failed);
                if remaining.len() < 2 {
                    outcome.classes = remaining.into_iter().map(|m| vec![m]).collect();
                    return outcome;
                }
            }
        }
    }
}
