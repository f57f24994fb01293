//! Text similarity ratios for the sliding-window tier.

use std::collections::HashSet;

/// `1 - levenshtein / max(len)` over characters. Two empty strings are identical.
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a, b) as f64 / longest as f64
}

/// Share of trimmed lines of `b` that also occur in `a`, over the larger line count.
pub fn line_overlap_ratio(a: &str, b: &str) -> f64 {
    let a_lines: Vec<&str> = a.lines().map(str::trim).collect();
    let b_lines: Vec<&str> = b.lines().map(str::trim).collect();
    let longest = a_lines.len().max(b_lines.len());
    if longest == 0 {
        return 1.0;
    }
    let known: HashSet<&str> = a_lines.into_iter().collect();
    let matched = b_lines.iter().filter(|line| known.contains(*line)).count();
    matched as f64 / longest as f64
}

/// Similarity used by the window search: edit distance for short inputs,
/// line overlap once either side exceeds `char_ceiling` characters.
pub fn similarity(a: &str, b: &str, char_ceiling: usize) -> f64 {
    if a.chars().count().max(b.chars().count()) > char_ceiling {
        line_overlap_ratio(a, b)
    } else {
        edit_ratio(a, b)
    }
}

/// Upper bound on [`edit_ratio`] from lengths alone.
pub fn length_ratio(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    let longest = la.max(lb);
    if longest == 0 {
        return 1.0;
    }
    la.min(lb) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_ratio_bounds() {
        assert_eq!(edit_ratio("", ""), 1.0);
        assert_eq!(edit_ratio("abc", "abc"), 1.0);
        assert_eq!(edit_ratio("abc", "xyz"), 0.0);
        assert!((edit_ratio("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[test]
    fn test_line_overlap_counts_trimmed_lines() {
        let a = "fn a() {\n    one();\n    two();\n}";
        let b = "fn a() {\n  one();\n    three();\n}";
        assert!((line_overlap_ratio(a, b) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_switches_on_ceiling() {
        let a = "x\n".repeat(10);
        let b = "x\n".repeat(5) + &"y\n".repeat(5);
        assert!((similarity(&a, &b, 5) - 0.5).abs() < 1e-9);
        assert!((similarity(&a, &b, 1_000) - edit_ratio(&a, &b)).abs() < 1e-9);
    }

    #[test]
    fn test_length_ratio_bounds_edit_ratio() {
        let (a, b) = ("short", "a much longer string");
        assert!(edit_ratio(a, b) <= length_ratio(a, b));
    }
}
