use serde::{Deserialize, Serialize};

/// How rows are distributed across the `ceil(n / limit)` chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSplit {
    /// Near-equal chunks; the first `n % chunks` hold one extra row.
    Balanced,
    /// Every chunk filled to the limit except the last.
    Fill,
}

/// Number of chunks needed so that none exceeds `limit`.
pub fn partition_count(count: usize, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    count.div_ceil(limit)
}

/// Sizes of the chunks `split` produces, in order.
pub fn chunk_sizes(count: usize, limit: usize, strategy: BatchSplit) -> Vec<usize> {
    let partitions = partition_count(count, limit);
    if partitions == 0 {
        return Vec::new();
    }

    match strategy {
        BatchSplit::Balanced => {
            let base = count / partitions;
            let extra = count % partitions;
            (0..partitions)
                .map(|i| if i < extra { base + 1 } else { base })
                .collect()
        }
        BatchSplit::Fill => (0..partitions)
            .map(|i| limit.min(count - i * limit))
            .collect(),
    }
}

/// Split `items` into contiguous chunks of at most `limit` items each.
pub fn split<T>(items: Vec<T>, limit: usize, strategy: BatchSplit) -> Vec<Vec<T>> {
    let sizes = chunk_sizes(items.len(), limit, strategy);
    let mut chunks = Vec::with_capacity(sizes.len());
    let mut rest = items.into_iter();
    for size in sizes {
        chunks.push(rest.by_ref().take(size).collect());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_count_is_ceiling() {
        assert_eq!(partition_count(0, 9), 0);
        assert_eq!(partition_count(1, 9), 1);
        assert_eq!(partition_count(9, 9), 1);
        assert_eq!(partition_count(10, 9), 2);
        assert_eq!(partition_count(250, 100), 3);
    }

    #[test]
    fn test_eleven_rows_fill() {
        let chunks = split((0..11).collect::<Vec<_>>(), 9, BatchSplit::Fill);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![9, 2]);
        assert_eq!(chunks[1], vec![9, 10]);
    }

    #[test]
    fn test_eleven_rows_balanced() {
        let chunks = split((0..11).collect::<Vec<_>>(), 9, BatchSplit::Balanced);
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![6, 5]);
        assert_eq!(chunks[0], vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_chunks_cover_all_rows_within_limit() {
        for strategy in [BatchSplit::Balanced, BatchSplit::Fill] {
            for limit in 1..=12 {
                for count in 0..=40 {
                    let sizes = chunk_sizes(count, limit, strategy);
                    assert_eq!(sizes.len(), partition_count(count, limit));
                    assert_eq!(sizes.iter().sum::<usize>(), count);
                    assert!(sizes.iter().all(|&s| s > 0 && s <= limit));
                }
            }
        }
    }

    #[test]
    fn test_split_keeps_order() {
        let chunks = split(vec!["a", "b", "c", "d", "e"], 2, BatchSplit::Balanced);
        let flat: Vec<&str> = chunks.into_iter().flatten().collect();
        assert_eq!(flat, vec!["a", "b", "c", "d", "e"]);
    }
}
