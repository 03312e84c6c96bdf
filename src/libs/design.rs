//! Scores tiled oligo candidates against every target assembly and builds
//! the output table.

use crate::libs::coverage::average_edit_distance;
use crate::libs::error::AsoError;
use crate::libs::gapmer::{coords_label, gapmer_coords, gapmer_keep, KeepRule, WingCoord};
use crate::libs::locus::{Assembly, GenomicLocus};
use crate::libs::maf_index::load_or_build;
use crate::libs::oligo::Annotation;
use crate::libs::query::{AlignmentResult, QueryEngine};
use crate::libs::wobble::{check_wobble, WobbleResult};
use anyhow::{anyhow, bail, Context};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// One candidate: the target locus (1-based in files) and the oligo sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub locus: GenomicLocus,
    pub sequence: String,
}

/// Reads `locus<TAB>sequence` lines. The sequence has to be as long as the
/// locus.
pub fn read_tiles(input: &str) -> anyhow::Result<Vec<Tile>> {
    let reader = crate::reader(input)?;
    let mut tiles = vec![];

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            bail!("{}:{}: expected locus and sequence", input, i + 1);
        }
        let locus = GenomicLocus::parse(fields[0])
            .with_context(|| format!("{}:{}", input, i + 1))?;
        let sequence = fields[1].trim().to_ascii_uppercase();
        if !sequence.is_ascii() {
            return Err(AsoError::Config(format!(
                "{}:{}: sequence {} is not plain ASCII",
                input,
                i + 1,
                sequence
            ))
            .into());
        }
        if sequence.len() != locus.len() {
            return Err(AsoError::Config(format!(
                "{}:{}: sequence of {} bases for a locus of {}",
                input,
                i + 1,
                sequence.len(),
                locus.len()
            ))
            .into());
        }

        tiles.push(Tile { locus, sequence });
    }

    Ok(tiles)
}

/// Fails on the first tile the gapmer settings can't partition, so a bad
/// `gap` or `explicit` is reported before any alignment work.
pub fn check_gapmer(tiles: &[Tile], gap: usize, explicit: Option<WingCoord>) -> anyhow::Result<()> {
    for tile in tiles {
        gapmer_coords(&tile.sequence, gap, explicit)
            .with_context(|| format!("tile {}", tile.locus))?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DesignOptions {
    pub maf_dir: String,
    pub reference: Assembly,
    pub queries: Vec<Assembly>,
    pub max_wobble: usize,
    /// Tiles are dispatched in this many synchronous rounds
    pub chunks: usize,
    /// Workers per assembly
    pub parallel: usize,
}

/// `<dir>/hg38.mm39.synNet.maf`
pub fn maf_path(maf_dir: &str, reference: &Assembly, query: &Assembly) -> String {
    std::path::Path::new(maf_dir)
        .join(format!("{}.{}.synNet.maf", reference, query))
        .display()
        .to_string()
}

/// Results of one tile against one assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyCell {
    pub reference_text: Option<String>,
    pub query_text: Option<String>,
    /// Average edit distance; `None` without alignment
    pub coverage: Option<usize>,
    pub wobble: WobbleResult,
    pub gapmer_filtered: Option<bool>,
    pub gapmer_coords: Option<String>,
}

impl AssemblyCell {
    pub fn new(
        tile: &Tile,
        alignment: Option<&AlignmentResult>,
        reference: &Assembly,
        query: &Assembly,
        max_wobble: usize,
    ) -> Self {
        let reference_text = alignment.and_then(|a| a.get(reference.name()).cloned());
        let query_text = alignment.and_then(|a| a.get(query.name()).cloned());

        let coverage = match (&reference_text, &query_text) {
            (Some(r), Some(q)) => Some(average_edit_distance(
                &[r.to_ascii_uppercase(), q.to_ascii_uppercase()],
                1,
                1,
                1,
            )),
            _ => None,
        };
        let wobble = check_wobble(
            reference_text.as_deref(),
            query_text.as_deref(),
            max_wobble,
            tile.locus.strand(),
        );

        Self {
            reference_text,
            query_text,
            coverage,
            wobble,
            gapmer_filtered: None,
            gapmer_coords: None,
        }
    }

    /// `ref:query`, empty without alignment
    pub fn maf_seq(&self) -> String {
        match (&self.reference_text, &self.query_text) {
            (Some(r), Some(q)) => format!("{}:{}", r, q),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DesignRow {
    pub tile: Tile,
    pub annotation: Annotation,
    /// In the order of [`DesignTable::assemblies`]
    pub cells: Vec<AssemblyCell>,
}

#[derive(Debug, Clone)]
pub struct DesignTable {
    pub assemblies: Vec<Assembly>,
    pub rows: Vec<DesignRow>,
    gapmer: bool,
}

impl DesignTable {
    /// Adds the gapmer decision of every assembly and drops rows rejected by
    /// `rule`.
    pub fn apply_gapmer(
        &mut self,
        gap: usize,
        explicit: Option<WingCoord>,
        rule: KeepRule,
    ) -> anyhow::Result<()> {
        for row in self.rows.iter_mut() {
            let coords = gapmer_coords(&row.tile.sequence, gap, explicit)?;
            let label = coords_label(&coords);
            for cell in row.cells.iter_mut() {
                cell.gapmer_filtered = Some(gapmer_keep(&coords, cell.coverage, &cell.wobble));
                cell.gapmer_coords = Some(label.clone());
            }
        }

        let before = self.rows.len();
        self.rows.retain(|row| {
            let votes: Vec<bool> = row
                .cells
                .iter()
                .map(|c| c.gapmer_filtered == Some(true))
                .collect();
            rule.keep(&votes)
        });
        log::info!("Gapmer filter kept {} of {} tiles", self.rows.len(), before);

        self.gapmer = true;
        Ok(())
    }

    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let mut header: Vec<String> = ["ASO_Locus", "ASO_Sequence", "Length", "CpG", "Gquad", "GC_Content"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for asm in &self.assemblies {
            header.push(format!("maf_seq_{}", asm));
            header.push(format!("coverage_{}", asm));
            header.push(format!("wobble_{}", asm));
            if self.gapmer {
                header.push(format!("gapmer_filtered_{}", asm));
                header.push(format!("gapmer_coords_{}", asm));
            }
        }
        writeln!(writer, "{}", header.join("\t"))?;

        for row in &self.rows {
            let mut fields = vec![
                row.tile.locus.to_string(),
                row.tile.sequence.clone(),
                row.annotation.length.to_string(),
                row.annotation.cpg.to_string(),
                row.annotation.gquad.to_string(),
                format!("{:.4}", row.annotation.gc_content),
            ];
            for cell in &row.cells {
                fields.push(cell.maf_seq());
                fields.push(cell.coverage.map(|d| d.to_string()).unwrap_or_default());
                fields.push(cell.wobble.to_string());
                if self.gapmer {
                    fields.push(cell.gapmer_filtered.map(|b| b.to_string()).unwrap_or_default());
                    fields.push(cell.gapmer_coords.clone().unwrap_or_default());
                }
            }
            writeln!(writer, "{}", fields.join("\t"))?;
        }

        Ok(())
    }
}

/// One engine per worker over a shared index.
///
/// The index is built here, before any worker starts, when it is missing.
pub fn open_engines(
    maf: &str,
    reference: &Assembly,
    query: &Assembly,
    parallel: usize,
) -> anyhow::Result<Vec<QueryEngine>> {
    let index = Arc::new(load_or_build(maf, &[reference.clone(), query.clone()])?);
    (0..parallel.max(1))
        .map(|_| QueryEngine::open_shared(maf, index.clone(), reference, query))
        .collect()
}

pub fn chunk_size(tiles: usize, chunks: usize) -> usize {
    (tiles / chunks.max(1)).max(1)
}

/// Runs `engine.query` for every locus on a pool of workers, one engine each.
///
/// Loci go out `chunk` at a time and all results of a chunk are collected
/// before the next one is sent. A failing query is logged and gives `None`.
pub fn query_tiles(
    engines: Vec<QueryEngine>,
    loci: &[GenomicLocus],
    chunk: usize,
) -> anyhow::Result<Vec<Option<AlignmentResult>>> {
    query_tiles_with(engines, loci, chunk, |engine, locus| {
        engine
            .query(locus, false)
            .with_context(|| format!("against {}", engine.query_assembly()))
    })
}

/// The worker pool behind [`query_tiles`], with each worker owning one `W`.
///
/// A query that errors or panics is logged and gives `None` for its locus;
/// the worker goes on with the next one.
pub fn query_tiles_with<W, F>(
    workers: Vec<W>,
    loci: &[GenomicLocus],
    chunk: usize,
    query: F,
) -> anyhow::Result<Vec<Option<AlignmentResult>>>
where
    W: Send,
    F: Fn(&mut W, &GenomicLocus) -> anyhow::Result<Option<AlignmentResult>> + Sync,
{
    if workers.is_empty() {
        bail!("No query workers");
    }
    let chunk = chunk.max(1);
    let query = &query;

    crossbeam::scope(|s| -> anyhow::Result<Vec<Option<AlignmentResult>>> {
        let (snd_task, rcv_task) = crossbeam::channel::unbounded::<(usize, &GenomicLocus)>();
        let (snd_res, rcv_res) = crossbeam::channel::unbounded();

        //----------------------------
        // Worker threads
        //----------------------------
        for mut worker in workers {
            let (sendr, recvr) = (snd_res.clone(), rcv_task.clone());
            s.spawn(move |_| {
                for (i, locus) in recvr.iter() {
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        query(&mut worker, locus)
                    }));
                    let result = match outcome {
                        Ok(Ok(r)) => r,
                        Ok(Err(e)) => {
                            log::warn!("{}: query failed: {:#}", locus, e);
                            None
                        }
                        Err(_) => {
                            log::error!("{}: query panicked", locus);
                            None
                        }
                    };
                    if sendr.send((i, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(rcv_task);
        drop(snd_res);

        //----------------------------
        // Dispatch chunk by chunk
        //----------------------------
        let mut results: Vec<Option<AlignmentResult>> = vec![None; loci.len()];
        for (c, part) in loci.chunks(chunk).enumerate() {
            for (j, locus) in part.iter().enumerate() {
                snd_task
                    .send((c * chunk + j, locus))
                    .map_err(|_| anyhow!("All workers are gone"))?;
            }
            for _ in 0..part.len() {
                let (i, result) = rcv_res
                    .recv()
                    .map_err(|_| anyhow!("All workers are gone"))?;
                results[i] = result;
            }
            log::debug!("Chunk {} done, {} tiles", c + 1, part.len());
        }
        drop(snd_task);

        Ok(results)
    })
    .map_err(|_| anyhow!("A query worker panicked"))?
}

/// Queries and scores every tile against every query assembly.
///
/// An assembly whose alignment can't be opened is logged and left without
/// alignments; the other assemblies are unaffected.
pub fn run(tiles: Vec<Tile>, opts: &DesignOptions) -> anyhow::Result<DesignTable> {
    if opts.queries.is_empty() {
        return Err(AsoError::Config("no query assembly given".to_string()).into());
    }

    let loci: Vec<GenomicLocus> = tiles.iter().map(|t| t.locus.clone()).collect();
    let chunk = chunk_size(loci.len(), opts.chunks);

    let mut columns: Vec<Vec<AssemblyCell>> = vec![];
    for query in &opts.queries {
        let maf = maf_path(&opts.maf_dir, &opts.reference, query);
        log::info!(
            "Assembly [{}]: {} tiles, {} workers, {}",
            query,
            loci.len(),
            opts.parallel.max(1),
            maf
        );

        let alignments = match open_engines(&maf, &opts.reference, query, opts.parallel) {
            Ok(engines) => query_tiles(engines, &loci, chunk)?,
            Err(e) => {
                log::error!("Skipping assembly {}: {:#}", query, e);
                vec![None; loci.len()]
            }
        };

        let cells = tiles
            .iter()
            .zip(alignments.iter())
            .map(|(tile, alignment)| {
                AssemblyCell::new(
                    tile,
                    alignment.as_ref(),
                    &opts.reference,
                    query,
                    opts.max_wobble,
                )
            })
            .collect();
        columns.push(cells);
    }

    let rows = tiles
        .into_iter()
        .enumerate()
        .map(|(i, tile)| DesignRow {
            annotation: Annotation::of(&tile.sequence),
            cells: columns.iter().map(|col| col[i].clone()).collect(),
            tile,
        })
        .collect();

    Ok(DesignTable {
        assemblies: opts.queries.clone(),
        rows,
        gapmer: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::locus::Strand;
    use crate::libs::maf::{MafAli, MafComp, MafWriter};
    use std::fs::File;
    use tempfile::tempdir;

    fn tile(s: &str, seq: &str) -> Tile {
        Tile {
            locus: GenomicLocus::parse(s).unwrap(),
            sequence: seq.to_string(),
        }
    }

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

    #[test]
    fn test_read_tiles() {
        let tiles = read_tiles("tests/design/tiles.tsv").unwrap();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0].locus.to_string(), "chr1(-):101-120");
        assert_eq!(tiles[0].sequence.len(), 20);
        assert_eq!(tiles[0].locus.strand(), Strand::Minus);

        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.tsv");
        std::fs::write(&bad, "chr1(-):101-120\tACGT\n").unwrap();
        assert!(read_tiles(bad.to_str().unwrap()).is_err());

        // 20 bytes for a locus of 20, but not ASCII
        std::fs::write(&bad, "chr1(-):101-120\tAAAA\u{e9}AAAAAAAAAAAAAA\n").unwrap();
        let err = read_tiles(bad.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("not plain ASCII"));
    }

    #[test]
    fn test_check_gapmer() {
        let tiles = vec![
            tile("chr1(+):1-20", "ACGTACGTACGTACGTACGT"),
            tile("chr1(+):1-12", "ACGTACGTACGT"),
        ];
        assert!(check_gapmer(&tiles, 10, None).is_ok());
        assert!(check_gapmer(&[], 25, None).is_ok());

        let err = check_gapmer(&tiles, 13, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AsoError>(),
            Some(&AsoError::GapTooLong { gap: 13, length: 12 })
        );
        assert!(format!("{:#}", err).starts_with("tile chr1(+):1-12"));

        let coord: WingCoord = "5_10_5".parse().unwrap();
        assert!(check_gapmer(&tiles, 10, Some(coord)).is_err());
    }

    #[test]
    fn test_cell() {
        let t = tile("chr1(-):1-4", "ACGT");
        let reference = Assembly::new("hg38");
        let query = Assembly::new("mm39");

        let mut alignment = AlignmentResult::new();
        alignment.insert("hg38".to_string(), "acgt".to_string());
        alignment.insert("mm39".to_string(), "ACGC".to_string());
        let cell = AssemblyCell::new(&t, Some(&alignment), &reference, &query, 2);
        assert_eq!(cell.coverage, Some(1));
        assert_eq!(cell.maf_seq(), "acgt:ACGC");
        // T/C at 3, mirrored to 0
        let sites = cell.wobble.sites().unwrap();
        assert_eq!(sites.gu_other_c, vec![0]);

        let cell = AssemblyCell::new(&t, None, &reference, &query, 2);
        assert_eq!(cell.coverage, None);
        assert_eq!(cell.wobble, WobbleResult::Reject);
        assert_eq!(cell.maf_seq(), "");
    }

    #[test]
    fn test_query_tiles_keeps_order() {
        let dir = tempdir().unwrap();
        let maf = dir.path().join("hg38.mm39.synNet.maf");
        {
            let mut writer = MafWriter::new(File::create(&maf).unwrap());
            writer.write_header("test").unwrap();
            writer
                .write_ali(&MafAli {
                    score: None,
                    components: vec![
                        comp("hg38.chr1", 0, "AACCGGTTAACCGGTTAACCGGTT"),
                        comp("mm39.chr1", 0, "AACCGGTTAACCGGTTAACCGGTA"),
                    ],
                })
                .unwrap();
        }
        let maf = maf.to_str().unwrap();
        let (reference, query) = (Assembly::new("hg38"), Assembly::new("mm39"));

        let loci: Vec<GenomicLocus> = (0..20)
            .map(|i| GenomicLocus::new("chr1", i, i + 4, Strand::Plus).unwrap())
            .chain(std::iter::once(
                GenomicLocus::new("chr9", 0, 4, Strand::Plus).unwrap(),
            ))
            .collect();

        let engines = open_engines(maf, &reference, &query, 3).unwrap();
        assert_eq!(engines.len(), 3);
        let results = query_tiles(engines, &loci, chunk_size(loci.len(), 4)).unwrap();

        assert_eq!(results.len(), 21);
        for (i, res) in results.iter().take(20).enumerate() {
            let res = res.as_ref().unwrap();
            assert_eq!(res["hg38"], &"AACCGGTTAACCGGTTAACCGGTT"[i..i + 4]);
        }
        assert!(results[20].is_none());
    }

    #[test]
    fn test_query_tiles_survives_panic() {
        let loci: Vec<GenomicLocus> = (0..12)
            .map(|i| GenomicLocus::new("chr1", i, i + 4, Strand::Plus).unwrap())
            .collect();

        let results = query_tiles_with(vec![0usize; 3], &loci, 4, |seen, locus| {
            *seen += 1;
            match locus.start() {
                5 => panic!("bad block"),
                7 => bail!("unreadable block"),
                _ => {
                    let mut res = AlignmentResult::new();
                    res.insert("hg38".to_string(), locus.start().to_string());
                    Ok(Some(res))
                }
            }
        })
        .unwrap();

        assert_eq!(results.len(), 12);
        assert!(results[5].is_none());
        assert!(results[7].is_none());
        for i in (0..12).filter(|&i| i != 5 && i != 7) {
            assert_eq!(results[i].as_ref().unwrap()["hg38"], i.to_string());
        }

        assert!(query_tiles_with(Vec::<usize>::new(), &loci, 4, |_, _| Ok(None)).is_err());
    }

    #[test]
    fn test_run_missing_assembly() {
        let dir = tempdir().unwrap();
        let opts = DesignOptions {
            maf_dir: dir.path().to_str().unwrap().to_string(),
            reference: Assembly::new("hg38"),
            queries: vec![Assembly::new("mm39")],
            max_wobble: 2,
            chunks: 2,
            parallel: 2,
        };
        let tiles = vec![tile("chr1(-):1-12", "AAAAAAAAAAAA")];

        let mut table = run(tiles, &opts).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[0].coverage, None);

        table.apply_gapmer(10, None, KeepRule::Any).unwrap();
        assert!(table.rows.is_empty());

        let no_query = DesignOptions {
            queries: vec![],
            ..opts
        };
        assert!(run(vec![], &no_query).is_err());
    }

    #[test]
    fn test_apply_gapmer_and_tsv() {
        let (reference, mm39, rn7) = (
            Assembly::new("hg38"),
            Assembly::new("mm39"),
            Assembly::new("rn7"),
        );
        let t = tile("chr1(-):1-20", "AATTAATTAATTAATTAATT");

        let mut diverged = AlignmentResult::new();
        diverged.insert("hg38".to_string(), t.sequence.clone());
        diverged.insert("mm39".to_string(), "AATTAATTAATTAATTAAGT".to_string());

        let cells = vec![
            AssemblyCell::new(&t, Some(&diverged), &reference, &mm39, 2),
            AssemblyCell::new(&t, None, &reference, &rn7, 2),
        ];
        let mut table = DesignTable {
            assemblies: vec![mm39, rn7],
            rows: vec![DesignRow {
                annotation: Annotation::of(&t.sequence),
                tile: t,
                cells,
            }],
            gapmer: false,
        };

        let mut all = table.clone();
        all.apply_gapmer(10, None, KeepRule::All).unwrap();
        assert!(all.rows.is_empty());

        table.apply_gapmer(10, None, KeepRule::Any).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[0].gapmer_filtered, Some(true));
        assert_eq!(table.rows[0].cells[1].gapmer_filtered, Some(false));

        let mut buf = vec![];
        table.write_tsv(&mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ASO_Locus\tASO_Sequence\tLength\tCpG\tGquad\tGC_Content\tmaf_seq_mm39"));
        assert!(lines[0].ends_with("gapmer_filtered_rn7\tgapmer_coords_rn7"));
        assert!(lines[1].starts_with("chr1(-):1-20\tAATTAATTAATTAATTAATT\t20\t0\tfalse\t0.0000\t"));
        assert!(lines[1].contains("\t1\t"));
        assert!(lines[1].ends_with("\tReject\tfalse\t5_10_5"));
    }
}
