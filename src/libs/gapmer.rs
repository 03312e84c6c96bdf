use crate::libs::error::AsoError;
use crate::libs::wobble::WobbleResult;
use std::fmt;
use std::ops::Range;

/// Wing and gap lengths of a gapmer, 5' to 3'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WingCoord {
    pub wing5: usize,
    pub gap: usize,
    pub wing3: usize,
}

impl WingCoord {
    pub fn new(wing5: usize, gap: usize, wing3: usize) -> Self {
        Self { wing5, gap, wing3 }
    }

    pub fn len(&self) -> usize {
        self.wing5 + self.gap + self.wing3
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positions of the gap in the oligo
    pub fn window(&self) -> Range<usize> {
        self.wing5..self.wing5 + self.gap
    }
}

impl std::str::FromStr for WingCoord {
    type Err = AsoError;

    /// `5_10_5`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AsoError::Config(format!("gapmer coordinates {}", s));
        let parts: Vec<usize> = s
            .split('_')
            .map(|p| p.trim().parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| bad())?;
        match parts.as_slice() {
            &[wing5, gap, wing3] => Ok(Self::new(wing5, gap, wing3)),
            _ => Err(bad()),
        }
    }
}

impl fmt::Display for WingCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.wing5, self.gap, self.wing3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapmerCoordinate {
    pub coord: WingCoord,
    pub gap_seq: String,
}

/// Partitions `sequence` into 5' wing, gap and 3' wing.
///
/// With `explicit` coordinates those are used as given. Otherwise the wings
/// share what is left around a central gap of `gap` bases; when that
/// remainder is odd both placements of the extra base are returned, 5' short
/// first.
///
/// ```
/// use asopipe::libs::gapmer::{gapmer_coords, WingCoord};
/// let coords = gapmer_coords("ACGTACGTACGTACGTACGTA", 10, None).unwrap();
/// assert_eq!(coords.len(), 2);
/// assert_eq!(coords[0].coord, WingCoord::new(5, 10, 6));
/// assert_eq!(coords[1].coord, WingCoord::new(6, 10, 5));
/// ```
pub fn gapmer_coords(
    sequence: &str,
    gap: usize,
    explicit: Option<WingCoord>,
) -> anyhow::Result<Vec<GapmerCoordinate>> {
    if !sequence.is_ascii() {
        return Err(AsoError::Config(format!("oligo {} is not plain ASCII", sequence)).into());
    }
    let length = sequence.len();
    if gap > length {
        return Err(AsoError::GapTooLong { gap, length }.into());
    }

    let coords = match explicit {
        Some(coord) => {
            if coord.len() != length {
                return Err(AsoError::BadCoords {
                    coords: coord.to_string(),
                    length,
                }
                .into());
            }
            vec![coord]
        }
        None => {
            let short = (length - gap) / 2;
            let long = length - gap - short;
            if short == long {
                vec![WingCoord::new(short, gap, short)]
            } else {
                vec![
                    WingCoord::new(short, gap, long),
                    WingCoord::new(long, gap, short),
                ]
            }
        }
    };

    Ok(coords
        .into_iter()
        .map(|coord| GapmerCoordinate {
            coord,
            gap_seq: sequence[coord.window()].to_string(),
        })
        .collect())
}

/// `5_10_6:6_10_5`
pub fn coords_label(coords: &[GapmerCoordinate]) -> String {
    itertools::join(coords.iter().map(|c| c.coord), ":")
}

pub fn has_cpg(seq: &str) -> bool {
    seq.to_ascii_uppercase().contains("CG")
}

/// Keep decision for one oligo against one assembly.
///
/// A CpG in any gap candidate rejects. A measurable divergence (`coverage`
/// above zero) keeps. Otherwise the oligo is kept only when the query pairs
/// through `GU_humanC` wobbles that all sit in the wings, with no other
/// mismatch.
pub fn gapmer_keep(
    coords: &[GapmerCoordinate],
    coverage: Option<usize>,
    wobble: &WobbleResult,
) -> bool {
    if coords.iter().any(|c| has_cpg(&c.gap_seq)) {
        return false;
    }

    match coverage {
        Some(d) if d > 0 => true,
        _ => {
            let sites = match wobble.sites() {
                Some(sites) if !sites.gu_human_c.is_empty() => sites,
                _ => return false,
            };
            let in_gap = sites
                .gu_human_c
                .iter()
                .any(|i| coords.iter().any(|c| c.coord.window().contains(i)));
            if in_gap {
                return false;
            }
            sites.extra_sites().is_empty()
        }
    }
}

/// How per-assembly decisions combine into a row decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepRule {
    /// At least one assembly keeps the oligo
    #[default]
    Any,
    /// Every assembly keeps it
    All,
}

impl KeepRule {
    pub fn keep(&self, votes: &[bool]) -> bool {
        match self {
            KeepRule::Any => votes.iter().any(|&v| v),
            KeepRule::All => !votes.is_empty() && votes.iter().all(|&v| v),
        }
    }
}

impl std::str::FromStr for KeepRule {
    type Err = AsoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(KeepRule::Any),
            "all" => Ok(KeepRule::All),
            _ => Err(AsoError::Config(format!("keep rule {}", s))),
        }
    }
}
