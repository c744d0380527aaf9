//! String similarity used for fuzzy signature matching.
//!
//! The ratio is the indel-normalized Levenshtein similarity on a 0–100 scale:
//! `100 * (|a| + |b| - indel(a, b)) / (|a| + |b|)`, rounded half to even.
//! It is symmetric and case-sensitive. Lengths count Unicode scalar values.

/// Longest common subsequence length.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let n = b.len();
    let mut prev = vec![0usize; n + 1];
    let mut curr = vec![0usize; n + 1];

    for &ca in a {
        for j in 1..=n {
            curr[j] = if ca == b[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Edit distance allowing only insertions and deletions.
pub(crate) fn indel_distance(a: &[char], b: &[char]) -> usize {
    a.len() + b.len() - 2 * lcs_len(a, b)
}

/// Similarity ratio between two strings, 0–100. Two empty strings score 100.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let similar = total - indel_distance(&a, &b);
    let score = 100.0 * similar as f64 / total as f64;
    score.round_ties_even() as u8
}

/// Whether any candidate's ratio against `reference` reaches `threshold`.
pub fn match_fuzzy<'a, I>(candidates: I, reference: &str, threshold: u8) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .any(|candidate| ratio(candidate, reference) >= threshold)
}

/// Whether `reference` is exactly one of the candidates (case-sensitive).
pub fn match_simple<'a, I>(candidates: I, reference: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    candidates.into_iter().any(|candidate| candidate == reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn indel_basic() {
        assert_eq!(indel_distance(&chars("abc"), &chars("abc")), 0);
        assert_eq!(indel_distance(&chars(""), &chars("abc")), 3);
        // substitution counts as delete + insert
        assert_eq!(indel_distance(&chars("abc"), &chars("abd")), 2);
    }

    #[test]
    fn ratio_known_values() {
        assert_eq!(ratio("svc.exe", "svc.exe"), 100);
        assert_eq!(ratio("abcd", "abce"), 75);
        assert_eq!(ratio("kitten", "sitting"), 62);
        assert_eq!(ratio("x", "completely different"), 0);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("", "abc"), 0);
    }

    #[test]
    fn ratio_is_symmetric() {
        for (a, b) in [("kitten", "sitting"), ("svc.exe", "svchost.exe"), ("", "x")] {
            assert_eq!(ratio(a, b), ratio(b, a), "{a} vs {b}");
        }
    }

    #[test]
    fn ratio_is_case_sensitive() {
        assert!(ratio("SVC.EXE", "svc.exe") < 100);
    }

    #[test]
    fn fuzzy_threshold_is_inclusive() {
        assert!(match_fuzzy(["x"], "x", 100));
        assert!(!match_fuzzy(["completely different"], "x", 100));
        assert!(match_fuzzy(["abce"], "abcd", 75));
        assert!(!match_fuzzy(["abce"], "abcd", 76));
    }

    #[test]
    fn fuzzy_any_candidate_is_enough() {
        assert!(match_fuzzy(["nope", "svc.exe"], "svc.exe", 90));
        assert!(!match_fuzzy(Vec::<&str>::new(), "svc.exe", 0));
    }

    #[test]
    fn simple_is_exact_membership() {
        assert!(match_simple(["a", "svc.exe"], "svc.exe"));
        assert!(!match_simple(["SVC.EXE"], "svc.exe"));
        assert!(!match_simple(["svc.exe "], "svc.exe"));
    }
}
