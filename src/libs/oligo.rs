use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref G4_RE: Regex =
        Regex::new(r"(G{3,})[ATCG]{1,7}(G{3,})[ATCG]{1,7}(G{3,})[ATCG]{1,7}(G{3,})").unwrap();
}

/// Sequence properties of a candidate oligo
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub length: usize,
    pub cpg: usize,
    pub gquad: bool,
    pub gc_content: f64,
}

impl Annotation {
    pub fn of(seq: &str) -> Self {
        let seq = seq.to_ascii_uppercase();
        Self {
            length: seq.len(),
            cpg: count_cpg(&seq),
            gquad: contains_gquad(&seq),
            gc_content: gc_content(&seq),
        }
    }
}

pub fn count_cpg(seq: &str) -> usize {
    seq.matches("CG").count()
}

/// Four G-runs of at least three, separated by loops of 1 to 7 bases
pub fn contains_gquad(seq: &str) -> bool {
    G4_RE.is_match(seq)
}

/// Fraction of G and C over the whole length
pub fn gc_content(seq: &str) -> f64 {
    if seq.is_empty() {
        return 0.0;
    }
    let gc = seq.bytes().filter(|&b| b == b'G' || b == b'C').count();
    gc as f64 / seq.len() as f64
}
