/// Map an absolute tick to the index of the sample displayed for it.
///
/// `min(tick / stride, sample_count - 1)`: ticks inside the final, possibly
/// short, stride interval and ticks past the end land on the last sample.
/// Returns 0 for an empty series; callers check emptiness before indexing.
pub fn to_sample_index(tick: u64, stride: u64, sample_count: usize) -> usize {
    if sample_count == 0 {
        return 0;
    }
    let index = tick / stride.max(1);
    index.min(sample_count as u64 - 1) as usize
}
