use crate::libs::locus::{Assembly, GenomicLocus};
use crate::libs::maf::MafAli;
use crate::libs::maf_index::{MafIndex, MafIndexed};
use indexmap::IndexMap;
use std::sync::Arc;

/// Aligned text per species, in block row order.
///
/// Keys are full source names (`hg38.chr1`) in verbose mode and bare
/// assembly names (`hg38`) otherwise.
pub type AlignmentResult = IndexMap<String, String>;

/// Resolves reference regions to aligned text of the reference and one query
/// assembly.
///
/// An engine owns a file cursor, so each worker thread needs its own; the
/// loaded index can be shared between engines.
pub struct QueryEngine {
    maf: MafIndexed,
    reference: Assembly,
    query: Assembly,
}

impl QueryEngine {
    pub fn new(maf: MafIndexed, reference: &Assembly, query: &Assembly) -> Self {
        Self {
            maf,
            reference: reference.clone(),
            query: query.clone(),
        }
    }

    /// Opens `maf`, building an index restricted to the two assemblies when
    /// none exists yet.
    pub fn open(maf: &str, reference: &Assembly, query: &Assembly) -> anyhow::Result<Self> {
        let indexed = MafIndexed::open(maf, &[reference.clone(), query.clone()])?;
        Ok(Self::new(indexed, reference, query))
    }

    /// Another engine over the same file and index
    pub fn open_shared(
        maf: &str,
        index: Arc<MafIndex>,
        reference: &Assembly,
        query: &Assembly,
    ) -> anyhow::Result<Self> {
        let indexed = MafIndexed::with_index(maf, index)?;
        Ok(Self::new(indexed, reference, query))
    }

    pub fn reference(&self) -> &Assembly {
        &self.reference
    }

    pub fn query_assembly(&self) -> &Assembly {
        &self.query
    }

    /// Aligned text of `locus` taken from the first block covering it
    /// entirely.
    ///
    /// Falls back to [`Self::query_one_by_one`] when no block covers the
    /// whole locus or the covering block holds fewer than two of the wanted
    /// species. `Ok(None)` means no coverage; errors are I/O or parse
    /// failures of the alignment file.
    pub fn query(
        &mut self,
        locus: &GenomicLocus,
        verbose: bool,
    ) -> anyhow::Result<Option<AlignmentResult>> {
        let key = self.reference.src(locus.chrom());
        let (start, end) = (locus.start(), locus.end());

        let mut found = None;
        for block in self.maf.query_blocks(&key, start, end) {
            let block = block?;
            if let Some(seqs) =
                texts_in_slice(&block, &key, start, end, &self.reference, &self.query, verbose)
            {
                found = Some(seqs);
                break;
            }
        }

        match found {
            Some(seqs) if seqs.len() >= 2 => Ok(Some(seqs)),
            _ => {
                log::debug!("{}: no single block covers both species, querying base by base", locus);
                self.query_one_by_one(locus, verbose)
            }
        }
    }

    /// Assembles the locus from single-base slices.
    ///
    /// Fails as a whole when any position has fewer than two species or the
    /// species differ between positions.
    pub fn query_one_by_one(
        &mut self,
        locus: &GenomicLocus,
        verbose: bool,
    ) -> anyhow::Result<Option<AlignmentResult>> {
        let key = self.reference.src(locus.chrom());
        let mut merged: Option<AlignmentResult> = None;

        for pos in locus.start()..locus.end() {
            let mut column = None;
            for block in self.maf.query_blocks(&key, pos, pos + 1) {
                let block = block?;
                if let Some(seqs) =
                    texts_in_slice(&block, &key, pos, pos + 1, &self.reference, &self.query, verbose)
                {
                    column = Some(seqs);
                    break;
                }
            }

            let column = match column {
                Some(seqs) if seqs.len() >= 2 => seqs,
                _ => return Ok(None),
            };

            match merged.as_mut() {
                None => merged = Some(column),
                Some(acc) => {
                    if acc.len() != column.len() {
                        return Ok(None);
                    }
                    for (name, text) in column {
                        match acc.get_mut(&name) {
                            Some(seq) => seq.push_str(&text),
                            None => return Ok(None),
                        }
                    }
                }
            }
        }

        Ok(merged.filter(same_length))
    }
}

/// Texts of the wanted species after slicing `block` to `[start, end)` of
/// `key`; `None` when the block can't be sliced to that range.
fn texts_in_slice(
    block: &MafAli,
    key: &str,
    start: usize,
    end: usize,
    reference: &Assembly,
    query: &Assembly,
    verbose: bool,
) -> Option<AlignmentResult> {
    let sliced = block.slice_by_component(key, start, end)?;

    let mut seqs = AlignmentResult::new();
    for comp in sliced.components {
        if !(reference.owns(&comp.src) || query.owns(&comp.src)) {
            continue;
        }
        let name = if verbose {
            comp.src
        } else {
            Assembly::species_of(&comp.src).to_string()
        };
        seqs.insert(name, comp.text);
    }
    Some(seqs)
}

fn same_length(seqs: &AlignmentResult) -> bool {
    let mut lens = seqs.values().map(|s| s.len());
    match lens.next() {
        Some(first) => lens.all(|l| l == first),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::locus::Strand;
    use crate::libs::maf::{MafComp, MafWriter};
    use std::fs::File;
    use tempfile::{tempdir, TempDir};

    fn comp(src: &str, start: usize, text: &str) -> MafComp {
        MafComp {
            src: src.to_string(),
            start,
            size: text.bytes().filter(|&b| b != b'-').count(),
            strand: '+',
            src_size: 10_000,
            text: text.to_string(),
        }
    }

    fn engine(blocks: &[Vec<MafComp>]) -> (TempDir, QueryEngine) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hg38.mm39.synNet.maf");
        let mut writer = MafWriter::new(File::create(&path).unwrap());
        writer.write_header("test").unwrap();
        for comps in blocks {
            writer
                .write_ali(&MafAli {
                    score: Some(0.0),
                    components: comps.clone(),
                })
                .unwrap();
        }
        drop(writer);

        let engine = QueryEngine::open(
            path.to_str().unwrap(),
            &Assembly::new("hg38"),
            &Assembly::new("mm39"),
        )
        .unwrap();
        (dir, engine)
    }

    // chr1:90-130, 1-based
    const HG: &str = "ACGTACGTACGTAC--GTACGTACGTACGTACGTACGTACGTA";
    const MM: &str = "ACGTACGAACGTACTTGTACCTACGTACG-ACGTACGTACGTA";

    #[test]
    fn test_query_single_block() {
        let (_dir, mut engine) = engine(&[vec![
            comp("hg38.chr1", 89, HG),
            comp("mm39.chr4", 1000, MM),
            comp("rn7.chr2", 500, MM),
        ]]);
        let locus = GenomicLocus::parse("chr1(-):100-116").unwrap();

        let seqs = engine.query(&locus, false).unwrap().unwrap();
        assert_eq!(seqs.keys().collect::<Vec<_>>(), vec!["hg38", "mm39"]);
        assert_eq!(seqs["hg38"].len(), seqs["mm39"].len());
        // 4 bases, the mouse insertion, 13 bases
        assert_eq!(seqs["hg38"], "GTAC--GTACGTACGTACG");
        assert_eq!(seqs["mm39"], "GTACTTGTACCTACGTACG");
        assert_eq!(seqs["hg38"].replace('-', "").len(), locus.len());

        let fallback = engine.query_one_by_one(&locus, false).unwrap().unwrap();
        assert_eq!(fallback, seqs);

        let verbose = engine.query(&locus, true).unwrap().unwrap();
        assert_eq!(
            verbose.keys().collect::<Vec<_>>(),
            vec!["hg38.chr1", "mm39.chr4"]
        );
    }

    #[test]
    fn test_query_across_blocks() {
        // chr1:90-103 and chr1:104-130
        let (_dir, mut engine) = engine(&[
            vec![
                comp("hg38.chr1", 89, &HG[..16]),
                comp("mm39.chr4", 1000, &MM[..16]),
            ],
            vec![
                comp("hg38.chr1", 103, &HG[16..]),
                comp("mm39.chr4", 1016, &MM[16..]),
            ],
        ]);
        let locus = GenomicLocus::parse("chr1(+):100-116").unwrap();

        let seqs = engine.query(&locus, false).unwrap().unwrap();
        assert_eq!(seqs["hg38"], "GTAC--GTACGTACGTACG");
        assert_eq!(seqs["mm39"], "GTACTTGTACCTACGTACG");
    }

    #[test]
    fn test_query_species_changes() {
        let (_dir, mut engine) = engine(&[
            vec![
                comp("hg38.chr1", 89, &HG[..16]),
                comp("mm39.chr4", 1000, &MM[..16]),
            ],
            vec![
                comp("hg38.chr1", 103, &HG[16..]),
                comp("mm39.chr9", 1016, &MM[16..]),
            ],
        ]);
        let locus = GenomicLocus::parse("chr1:100-116").unwrap();

        // bare assembly names still line up
        assert!(engine.query(&locus, false).unwrap().is_some());
        // source names differ between the two halves
        assert!(engine.query(&locus, true).unwrap().is_none());
    }

    #[test]
    fn test_query_missing_species() {
        let (_dir, mut engine) = engine(&[
            vec![
                comp("hg38.chr1", 89, &HG[..16]),
                comp("mm39.chr4", 1000, &MM[..16]),
            ],
            vec![comp("hg38.chr1", 103, &HG[16..]), comp("rn7.chr2", 5, &MM[16..])],
        ]);

        // fully inside the first block
        let locus = GenomicLocus::parse("chr1:91-95").unwrap();
        let seqs = engine.query(&locus, false).unwrap().unwrap();
        assert_eq!(seqs["hg38"], "CGTAC");

        // the second half has no mouse row
        let locus = GenomicLocus::parse("chr1:100-116").unwrap();
        assert!(engine.query(&locus, false).unwrap().is_none());
        let locus = GenomicLocus::parse("chr1:110-112").unwrap();
        assert!(engine.query(&locus, false).unwrap().is_none());
    }

    #[test]
    fn test_query_no_coverage() {
        let (_dir, mut engine) = engine(&[vec![
            comp("hg38.chr1", 89, HG),
            comp("mm39.chr4", 1000, MM),
        ]]);

        let locus = GenomicLocus::new("chr1", 2000, 2017, Strand::Plus).unwrap();
        assert!(engine.query(&locus, false).unwrap().is_none());
        let locus = GenomicLocus::new("chr2", 95, 100, Strand::Plus).unwrap();
        assert!(engine.query(&locus, false).unwrap().is_none());
        // partly outside the block
        let locus = GenomicLocus::new("chr1", 80, 95, Strand::Plus).unwrap();
        assert!(engine.query(&locus, false).unwrap().is_none());
    }

    #[test]
    fn test_same_length() {
        let mut seqs = AlignmentResult::new();
        assert!(!same_length(&seqs));
        seqs.insert("hg38".to_string(), "ACG".to_string());
        seqs.insert("mm39".to_string(), "ACG".to_string());
        assert!(same_length(&seqs));
        seqs.insert("rn7".to_string(), "AC".to_string());
        assert!(!same_length(&seqs));
    }
}
