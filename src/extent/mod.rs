//! Byte extents and the set algebra over ordered extent lists.
//!
//! An [`Extent`] is the half-open range `[start, start + length)`.  Every
//! list-valued function here returns a *normalized* list: sorted by start,
//! no zero-length entries, no two entries overlapping or touching.  Inputs
//! need not be normalized.  None of these functions can fail; empty or
//! degenerate input yields an empty list.

use serde::{Deserialize, Serialize};

// ── Extent ───────────────────────────────────────────────────────────────────

/// Half-open byte range.  Ordering is by `start`, then `length`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub start:  u64,
    pub length: u64,
}

impl Extent {
    #[inline]
    pub const fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Build from `[start, end)`.  An inverted pair yields an empty extent.
    #[inline]
    pub fn from_bounds(start: u64, end: u64) -> Self {
        Self { start, length: end.saturating_sub(start) }
    }

    /// Exclusive end offset, saturating at `u64::MAX`.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.start && pos < self.end()
    }

    pub fn overlaps(&self, other: &Extent) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// The overlapping part of two extents, if any byte is shared.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let start = self.start.max(other.start);
        let end   = self.end().min(other.end());
        (start < end).then(|| Extent::from_bounds(start, end))
    }

    /// Move the extent up by `delta` bytes.
    #[inline]
    pub fn offset_by(&self, delta: u64) -> Extent {
        Extent::new(self.start.saturating_add(delta), self.length)
    }

    /// Move the extent down by `base` bytes, dropping whatever falls below 0.
    pub fn rebase(&self, base: u64) -> Extent {
        Extent::from_bounds(self.start.saturating_sub(base), self.end().saturating_sub(base))
    }
}

// ── Set algebra ──────────────────────────────────────────────────────────────

/// Sort, drop empty entries, and coalesce overlapping or adjacent ones.
pub fn normalize(list: &[Extent]) -> Vec<Extent> {
    let mut sorted: Vec<Extent> = list.iter().copied().filter(|e| !e.is_empty()).collect();
    sorted.sort_unstable();

    let mut out: Vec<Extent> = Vec::with_capacity(sorted.len());
    for e in sorted {
        match out.last_mut() {
            Some(prev) if e.start <= prev.end() => {
                let end = prev.end().max(e.end());
                prev.length = end - prev.start;
            }
            _ => out.push(e),
        }
    }
    out
}

pub fn union(a: &[Extent], b: &[Extent]) -> Vec<Extent> {
    let mut all = Vec::with_capacity(a.len() + b.len());
    all.extend_from_slice(a);
    all.extend_from_slice(b);
    normalize(&all)
}

/// Bytes present in both lists.
pub fn intersect(a: &[Extent], b: &[Extent]) -> Vec<Extent> {
    let a = normalize(a);
    let b = normalize(b);

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(overlap) = a[i].intersection(&b[j]) {
            out.push(overlap);
        }
        // Advance whichever extent finishes first.
        if a[i].end() <= b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Bytes of `a` not covered by `b`.
pub fn subtract(a: &[Extent], b: &[Extent]) -> Vec<Extent> {
    let a = normalize(a);
    let b = normalize(b);

    let mut out = Vec::new();
    let mut j = 0;
    for ext in a {
        let end = ext.end();
        let mut cur = ext.start;

        while j < b.len() && b[j].end() <= cur {
            j += 1;
        }

        let mut k = j;
        while k < b.len() && b[k].start < end {
            if b[k].start > cur {
                out.push(Extent::from_bounds(cur, b[k].start));
            }
            cur = cur.max(b[k].end());
            if cur >= end {
                break;
            }
            k += 1;
        }
        if cur < end {
            out.push(Extent::from_bounds(cur, end));
        }
    }
    out
}

/// Restrict a list to `[start, start + length)`.
pub fn clip(list: &[Extent], start: u64, length: u64) -> Vec<Extent> {
    intersect(list, &[Extent::new(start, length)])
}

/// The parts of `[start, start + length)` that `list` does not cover.
pub fn gaps(list: &[Extent], start: u64, length: u64) -> Vec<Extent> {
    subtract(&[Extent::new(start, length)], list)
}

pub fn total_length(list: &[Extent]) -> u64 {
    normalize(list).iter().map(|e| e.length).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(start: u64, length: u64) -> Extent {
        Extent::new(start, length)
    }

    #[test]
    fn normalize_coalesces_adjacent_and_overlapping() {
        let list = [ext(20, 5), ext(0, 10), ext(10, 5), ext(22, 10), ext(40, 0)];
        assert_eq!(normalize(&list), vec![ext(0, 15), ext(20, 12)]);
    }

    #[test]
    fn normalize_of_empty_input_is_empty() {
        assert!(normalize(&[]).is_empty());
        assert!(normalize(&[ext(5, 0)]).is_empty());
    }

    #[test]
    fn intersect_walks_both_lists() {
        let a = [ext(0, 10), ext(20, 10)];
        let b = [ext(5, 20)];
        assert_eq!(intersect(&a, &b), vec![ext(5, 5), ext(20, 5)]);
    }

    #[test]
    fn subtract_carves_middle_and_edges() {
        let a = [ext(0, 100)];
        let b = [ext(10, 10), ext(50, 10), ext(95, 20)];
        assert_eq!(subtract(&a, &b), vec![ext(0, 10), ext(20, 30), ext(60, 35)]);
    }

    #[test]
    fn subtract_equal_extents_cancel() {
        assert!(subtract(&[ext(3, 7)], &[ext(3, 7)]).is_empty());
    }

    #[test]
    fn subtract_with_disjoint_list_is_identity() {
        let a = [ext(0, 4), ext(10, 4)];
        assert_eq!(subtract(&a, &[ext(5, 3)]), a.to_vec());
    }

    #[test]
    fn gaps_inside_range() {
        let allocated = [ext(0, 10), ext(30, 10)];
        assert_eq!(gaps(&allocated, 5, 30), vec![ext(10, 20)]);
    }

    #[test]
    fn rebase_drops_part_below_zero() {
        assert_eq!(ext(10, 10).rebase(15), ext(0, 5));
        assert!(ext(0, 5).rebase(10).is_empty());
    }
}
