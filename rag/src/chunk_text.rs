/// Splits `text` into trimmed windows of `size` characters overlapping by
/// `overlap`. An overlap not smaller than `size` is clamped to a quarter of it.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 {
        return vec![text.to_string()];
    }
    let overlap = if overlap >= size { size / 4 } else { overlap };
    let step = size - overlap;
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // A window starting at `start` is needed unless the previous one,
    // which ended at `start + overlap`, already reached the end.
    (0..len)
        .step_by(step)
        .take_while(|&start| start == 0 || start + overlap < len)
        .map(|start| chars[start..len.min(start + size)].iter().collect::<String>())
        .filter_map(|window| {
            let trimmed = window.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}
