use crate::domain::model::{Grid, Sample};

/// Row count above which a selection is sampled before prompting.
pub const DEFAULT_SAMPLE_THRESHOLD: usize = 1000;
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;

/// Picks `sample_size` evenly spaced data rows (stride `N / S`), always
/// starting at the first row. The header row is kept as is. When the grid
/// has no more than `sample_size` rows every row is kept.
pub fn sample_rows(grid: &Grid, sample_size: usize) -> Sample {
    let total = grid.row_count();

    let row_indices: Vec<usize> = if total <= sample_size {
        (0..total).collect()
    } else {
        // i * N / S == floor(i * stride); distinct because N > S
        (0..sample_size).map(|i| i * total / sample_size).collect()
    };

    let rows = row_indices.iter().map(|&i| grid.rows[i].clone()).collect();

    Sample {
        grid: Grid::new(grid.headers.clone(), rows),
        total_rows: total,
        row_indices,
        columns: grid.column_profiles(),
    }
}

/// Samples only when the grid has more than `threshold` data rows.
pub fn apply_sampling_policy(grid: Grid, threshold: usize, sample_size: usize) -> Sample {
    let total = grid.row_count();
    if total > threshold {
        tracing::info!(
            "✂️ Selection has {} rows (threshold {}), sampling {} rows",
            total,
            threshold,
            sample_size.min(total)
        );
        return sample_rows(&grid, sample_size);
    }

    Sample {
        row_indices: (0..total).collect(),
        total_rows: total,
        columns: grid.column_profiles(),
        grid,
    }
}
