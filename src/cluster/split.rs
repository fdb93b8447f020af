use std::ops::Range;

/// Splits `0..len` into at most `parts` contiguous ranges.
///
/// Range sizes differ by at most one, larger ranges first; empty ranges are
/// omitted, so fewer than `parts` ranges come back when `len < parts`.
///
/// ```
/// use batchvisor::split_ranges;
///
/// assert_eq!(split_ranges(7, 3), vec![0..3, 3..5, 5..7]);
/// assert_eq!(split_ranges(2, 4), vec![0..1, 1..2]);
/// assert!(split_ranges(0, 4).is_empty());
/// ```
pub fn split_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1).min(len);
    if parts == 0 {
        return Vec::new();
    }

    let base = len / parts;
    let extra = len % parts;

    let mut start = 0;
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_input_in_order() {
        for len in 0..40 {
            for parts in 1..9 {
                let ranges = split_ranges(len, parts);
                let flat: Vec<usize> = ranges.iter().cloned().flatten().collect();
                assert_eq!(flat, (0..len).collect::<Vec<_>>(), "len={len} parts={parts}");
                assert!(ranges.iter().all(|r| !r.is_empty()));
            }
        }
    }

    #[test]
    fn test_sizes_differ_by_at_most_one() {
        let sizes: Vec<usize> = split_ranges(100, 3).iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![34, 33, 33]);
    }

    #[test]
    fn test_zero_parts_is_one_part() {
        assert_eq!(split_ranges(5, 0), vec![0..5]);
    }
}
