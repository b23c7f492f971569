/// Smallest integer stride that keeps `ceil(total_records / stride)` within
/// `sample_budget`. Always at least 1.
pub fn compute_stride(total_records: u64, sample_budget: usize) -> u64 {
    let budget = (sample_budget as u64).max(1);
    total_records.div_ceil(budget).max(1)
}

/// Number of samples a stride yields over `total_records`.
pub fn sample_count(total_records: u64, stride: u64) -> u64 {
    total_records.div_ceil(stride.max(1))
}
