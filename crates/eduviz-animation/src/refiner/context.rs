//! Context selection (spec §4.5.3 step 3): excerpt the source around
//! reported error lines, or fall back to head/tail slicing.

const DEFAULT_RADIUS: usize = 6;
const MAX_EXCERPT_LINES: usize = 140;
const HEAD_TAIL_LINES: usize = 60;

/// Builds an excerpt of `source` for the refiner prompt. When `error_lines`
/// is non-empty, merges overlapping `±radius` windows around each line and
/// caps the total at [`MAX_EXCERPT_LINES`]; otherwise falls back to a
/// head/tail slice.
pub fn select_excerpt(source: &str, error_lines: &[usize]) -> String {
    let lines: Vec<&str> = source.lines().collect();
    if lines.len() <= MAX_EXCERPT_LINES {
        return source.to_string();
    }

    if error_lines.is_empty() {
        return head_tail_slice(&lines);
    }

    let windows = merged_windows(error_lines, lines.len());
    let mut excerpt = String::new();
    let mut total = 0usize;
    for (start, end) in windows {
        if total >= MAX_EXCERPT_LINES {
            break;
        }
        excerpt.push_str(&format!("--- lines {}-{} ---\n", start + 1, end));
        for line in &lines[start..end] {
            if total >= MAX_EXCERPT_LINES {
                break;
            }
            excerpt.push_str(line);
            excerpt.push('\n');
            total += 1;
        }
    }
    excerpt
}

fn merged_windows(error_lines: &[usize], total_lines: usize) -> Vec<(usize, usize)> {
    let mut raw: Vec<(usize, usize)> = error_lines
        .iter()
        .map(|&line| {
            let zero_based = line.saturating_sub(1);
            let start = zero_based.saturating_sub(DEFAULT_RADIUS);
            let end = (zero_based + DEFAULT_RADIUS + 1).min(total_lines);
            (start, end)
        })
        .collect();
    raw.sort_unstable();

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in raw {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

fn head_tail_slice(lines: &[&str]) -> String {
    let head = &lines[..HEAD_TAIL_LINES.min(lines.len())];
    let tail_start = lines.len().saturating_sub(HEAD_TAIL_LINES);
    let tail = &lines[tail_start.max(head.len())..];

    let mut excerpt = head.join("\n");
    excerpt.push_str("\n--- (truncated) ---\n");
    excerpt.push_str(&tail.join("\n"));
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_source(lines: usize) -> String {
        (0..lines).map(|i| format!("line_{i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn short_source_returned_whole() {
        let source = big_source(10);
        assert_eq!(select_excerpt(&source, &[3]), source);
    }

    #[test]
    fn long_source_without_error_lines_uses_head_tail() {
        let source = big_source(300);
        let excerpt = select_excerpt(&source, &[]);
        assert!(excerpt.contains("line_0"));
        assert!(excerpt.contains("line_299"));
        assert!(excerpt.contains("truncated"));
    }

    #[test]
    fn long_source_with_error_lines_windows_around_them() {
        let source = big_source(300);
        let excerpt = select_excerpt(&source, &[150]);
        assert!(excerpt.contains("line_150"));
        assert!(!excerpt.contains("line_0\n"));
    }

    #[test]
    fn overlapping_windows_merge() {
        let windows = merged_windows(&[10, 12], 300);
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn excerpt_respects_line_cap() {
        let source = big_source(1000);
        let error_lines: Vec<usize> = (1..=20).map(|i| i * 40).collect();
        let excerpt = select_excerpt(&source, &error_lines);
        assert!(excerpt.lines().count() <= MAX_EXCERPT_LINES + error_lines.len());
    }
}
