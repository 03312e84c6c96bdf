use crate::libs::error::AsoError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

impl std::str::FromStr for Strand {
    type Err = AsoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" | "" => Ok(Strand::Plus),
            "-" => Ok(Strand::Minus),
            _ => Err(AsoError::BadLocus(format!("strand {}", s))),
        }
    }
}

/// A genome assembly name such as `hg38` or `mm39`.
///
/// MAF sources are written as `assembly.chrom`; the assembly is everything
/// before the first dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Assembly(String);

impl Assembly {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// `hg38` for `hg38.chr1`
    pub fn species_of(src: &str) -> &str {
        src.split_once('.').map(|(sp, _)| sp).unwrap_or(src)
    }

    pub fn owns(&self, src: &str) -> bool {
        Self::species_of(src) == self.0
    }

    /// Index key of a chromosome of this assembly
    pub fn src(&self, chrom: &str) -> String {
        format!("{}.{}", self.0, chrom)
    }
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A region on the reference genome.
///
/// Coordinates are 0-based, half-open; `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicLocus {
    chrom: String,
    start: usize,
    end: usize,
    strand: Strand,
}

impl GenomicLocus {
    pub fn new(chrom: &str, start: usize, end: usize, strand: Strand) -> anyhow::Result<Self> {
        if start >= end {
            return Err(AsoError::BadLocus(format!("{}:{}-{}", chrom, start, end)).into());
        }
        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
            strand,
        })
    }

    /// From 1-based, inclusive coordinates
    pub fn from_one_based(
        chrom: &str,
        start: usize,
        end: usize,
        strand: Strand,
    ) -> anyhow::Result<Self> {
        if start == 0 {
            return Err(AsoError::BadLocus(format!("{}:{}-{}", chrom, start, end)).into());
        }
        Self::new(chrom, start - 1, end, strand)
    }

    /// Parses `chr1(-):100-116`; coordinates are 1-based and inclusive.
    ///
    /// ```
    /// use asopipe::libs::locus::{GenomicLocus, Strand};
    /// let locus = GenomicLocus::parse("chr1(-):100-116").unwrap();
    /// assert_eq!(locus.chrom(), "chr1");
    /// assert_eq!(locus.start(), 99);
    /// assert_eq!(locus.end(), 116);
    /// assert_eq!(locus.strand(), Strand::Minus);
    /// assert_eq!(locus.to_string(), "chr1(-):100-116");
    /// ```
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let range = intspan::Range::from_str(s.trim());
        // a `species.` prefix would be dropped silently
        if !range.is_valid()
            || !range.name().is_empty()
            || *range.start() < 1
            || *range.end() < *range.start()
        {
            return Err(AsoError::BadLocus(s.to_string()).into());
        }
        let strand: Strand = range.strand().parse()?;

        Self::from_one_based(
            range.chr(),
            *range.start() as usize,
            *range.end() as usize,
            strand,
        )
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for GenomicLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}):{}-{}",
            self.chrom,
            self.strand.as_char(),
            self.start + 1,
            self.end
        )
    }
}
