//! Tolerated mismatches between the reference and a query species.
//!
//! An oligo designed against the reference can still pair with the query
//! transcript when the few differing bases form wobble pairs. Each mismatch
//! is assigned to the categories it satisfies:
//!
//! | category      | reference / query        |
//! |---------------|--------------------------|
//! | `GU_humanC`   | C/T or A/G               |
//! | `GU_otherC`   | T/C or G/A               |
//! | `I_humanC`    | C / not G                |
//! | `I_otherwise` | not G or C / not G       |
//!
//! Categories overlap, and every mismatch has to fall into at least one.

use crate::libs::locus::Strand;
use crate::libs::maf::GAP;
use std::collections::BTreeSet;
use std::fmt;

/// Mismatch positions per category, each list ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WobbleSites {
    pub gu_human_c: Vec<usize>,
    pub gu_other_c: Vec<usize>,
    pub i_human_c: Vec<usize>,
    pub i_otherwise: Vec<usize>,
}

impl WobbleSites {
    pub fn categories(&self) -> [(&'static str, &Vec<usize>); 4] {
        [
            ("GU_humanC", &self.gu_human_c),
            ("GU_otherC", &self.gu_other_c),
            ("I_humanC", &self.i_human_c),
            ("I_otherwise", &self.i_otherwise),
        ]
    }

    fn categories_mut(&mut self) -> [&mut Vec<usize>; 4] {
        [
            &mut self.gu_human_c,
            &mut self.gu_other_c,
            &mut self.i_human_c,
            &mut self.i_otherwise,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.categories().iter().all(|(_, v)| v.is_empty())
    }

    /// Positions in any category other than `GU_humanC` that are not
    /// `GU_humanC` sites themselves
    pub fn extra_sites(&self) -> BTreeSet<usize> {
        let gu: BTreeSet<usize> = self.gu_human_c.iter().copied().collect();
        self.gu_other_c
            .iter()
            .chain(&self.i_human_c)
            .chain(&self.i_otherwise)
            .copied()
            .filter(|i| !gu.contains(i))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WobbleResult {
    Pass(WobbleSites),
    Reject,
}

impl WobbleResult {
    pub fn sites(&self) -> Option<&WobbleSites> {
        match self {
            WobbleResult::Pass(sites) => Some(sites),
            WobbleResult::Reject => None,
        }
    }
}

impl fmt::Display for WobbleResult {
    /// `GU_humanC=3,7;GU_otherC=;I_humanC=;I_otherwise=` or `Reject`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WobbleResult::Reject => write!(f, "Reject"),
            WobbleResult::Pass(sites) => {
                let parts: Vec<String> = sites
                    .categories()
                    .iter()
                    .map(|(name, idx)| {
                        format!("{}={}", name, itertools::join(idx.iter(), ","))
                    })
                    .collect();
                write!(f, "{}", parts.join(";"))
            }
        }
    }
}

fn complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&b| match b {
            b'A' => b'T',
            b'C' => b'G',
            b'G' => b'C',
            b'T' => b'A',
            _ => b,
        })
        .collect()
}

fn trim_trailing_gaps(seq: &str) -> Vec<u8> {
    let upper = seq.to_ascii_uppercase().into_bytes();
    let keep = upper.iter().rposition(|&b| b != GAP).map_or(0, |p| p + 1);
    upper[..keep].to_vec()
}

/// Classifies the mismatches between aligned `reference` and `query` text.
///
/// `strand` is the strand of the oligo's target locus. On `+` both texts
/// are complemented before comparison; on `-` the positions are mirrored so
/// they count from the other end of the oligo.
///
/// Only trailing gaps are ignored. Any gap left inside, a length difference,
/// more than `max_wobble` mismatches or a mismatch fitting no category
/// rejects the pair.
pub fn check_wobble(
    reference: Option<&str>,
    query: Option<&str>,
    max_wobble: usize,
    strand: Strand,
) -> WobbleResult {
    let (reference, query) = match (reference, query) {
        (Some(r), Some(q)) => (r, q),
        _ => return WobbleResult::Reject,
    };

    let mut r = trim_trailing_gaps(reference);
    let mut q = trim_trailing_gaps(query);
    if strand == Strand::Plus {
        r = complement(&r);
        q = complement(&q);
    }

    if r.contains(&GAP) || q.contains(&GAP) || r.len() != q.len() {
        return WobbleResult::Reject;
    }

    let mismatches: Vec<usize> = (0..r.len()).filter(|&i| r[i] != q[i]).collect();
    if mismatches.len() > max_wobble {
        return WobbleResult::Reject;
    }

    let mut sites = WobbleSites::default();
    for &i in &mismatches {
        let (rb, qb) = (r[i], q[i]);
        let mut classified = false;

        if (rb == b'C' && qb == b'T') || (rb == b'A' && qb == b'G') {
            sites.gu_human_c.push(i);
            classified = true;
        }
        if (rb == b'T' && qb == b'C') || (rb == b'G' && qb == b'A') {
            sites.gu_other_c.push(i);
            classified = true;
        }
        if rb == b'C' && qb != b'G' {
            sites.i_human_c.push(i);
            classified = true;
        }
        if rb != b'G' && rb != b'C' && qb != b'G' {
            sites.i_otherwise.push(i);
            classified = true;
        }

        if !classified {
            return WobbleResult::Reject;
        }
    }

    if strand == Strand::Minus {
        let len = r.len();
        for category in sites.categories_mut() {
            for i in category.iter_mut() {
                *i = len - 1 - *i;
            }
            category.sort_unstable();
        }
    }

    WobbleResult::Pass(sites)
}
