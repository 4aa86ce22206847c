//! ASCII oscilloscope for a sample buffer.

/// Draw `samples` into a `width` × `height` character grid. Each column shows
/// the sample at its position; values are clamped to `[-1, 1]`, +1 on the top
/// row. The zero line is drawn with `-`.
pub fn render(samples: &[f32], width: usize, height: usize) -> String {
    let width = width.max(1);
    let height = height.max(1);
    let mut grid = vec![vec![' '; width]; height];
    let mid = (height - 1) / 2;
    grid[mid].fill('-');

    if !samples.is_empty() {
        for col in 0..width {
            let idx = col * samples.len() / width;
            let v = samples[idx];
            let v = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
            let row = ((1.0 - v) * 0.5 * (height - 1) as f32).round() as usize;
            grid[row.min(height - 1)][col] = '*';
        }
    }

    let mut out = String::with_capacity((width + 1) * height);
    for line in grid {
        out.extend(line);
        out.push('\n');
    }
    out
}
