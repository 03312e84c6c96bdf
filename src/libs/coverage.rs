//! Sequence divergence between aligned species.

/// Weighted edit distance from `s1` to `s2` over the full DP table.
///
/// ```
/// assert_eq!(asopipe::libs::coverage::levenshtein_distance("ACGT", "AGT", 1, 1, 1), 1);
/// assert_eq!(asopipe::libs::coverage::levenshtein_distance("ACGT", "AGT", 1, 1, 3), 3);
/// ```
pub fn levenshtein_distance(
    s1: &str,
    s2: &str,
    cost_sub: usize,
    cost_ins: usize,
    cost_del: usize,
) -> usize {
    let (a, b) = (s1.as_bytes(), s2.as_bytes());
    let (m, n) = (a.len(), b.len());

    // dp[i][j]: a[..i] -> b[..j]
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i * cost_del;
    }
    for j in 0..=n {
        dp[0][j] = j * cost_ins;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { cost_sub };
            dp[i][j] = (dp[i - 1][j] + cost_del)
                .min(dp[i][j - 1] + cost_ins)
                .min(dp[i - 1][j - 1] + cost);
        }
    }

    dp[m][n]
}

/// Mean pairwise edit distance, truncated toward zero.
///
/// Fewer than two sequences give 0.
pub fn average_edit_distance<S: AsRef<str>>(
    seqs: &[S],
    cost_sub: usize,
    cost_ins: usize,
    cost_del: usize,
) -> usize {
    let n = seqs.len();
    if n < 2 {
        return 0;
    }

    let mut total = 0;
    let mut count = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += levenshtein_distance(
                seqs[i].as_ref(),
                seqs[j].as_ref(),
                cost_sub,
                cost_ins,
                cost_del,
            );
            count += 1;
        }
    }

    total / count
}
