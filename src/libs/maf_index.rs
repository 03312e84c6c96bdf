//! Interval index over the blocks of a MAF file.
//!
//! Every `s` row of a block is stored as a forward-strand interval under its
//! source name (`hg38.chr1`), with the byte offset of the block as payload.
//! Each source gets its own cache-oblivious interval tree.
//!
//! The index is cached next to the alignment as `<maf>.index` and ends with
//! an `##end` line holding the number of intervals. It is only built when
//! that file is missing or unreadable; a modified MAF is not detected.

use crate::libs::locus::Assembly;
use crate::libs::maf::{MafAli, MafReader, MAX_SRC_SIZE};
use anyhow::{anyhow, bail, Context};
use coitrees::{BasicCOITree, IntervalTree};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX_HEADER: &str = "##maf-index version=1";
const INDEX_END: &str = "##end";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
    pub offset: u64,
}

/// All intervals of one source
pub struct IndexEntry {
    max: usize,
    intervals: Vec<Interval>,
    // closed coordinates, block offset as metadata
    tree: BasicCOITree<u64, u32>,
}

impl IndexEntry {
    fn new(max: usize, mut intervals: Vec<Interval>) -> Self {
        intervals.sort();
        intervals.dedup();
        let max = intervals.iter().map(|iv| iv.end).fold(max, usize::max);

        let nodes: Vec<coitrees::Interval<u64>> = intervals
            .iter()
            .map(|iv| coitrees::Interval {
                first: iv.start as i32,
                last: (iv.end - 1) as i32,
                metadata: iv.offset,
            })
            .collect();

        Self {
            max,
            intervals,
            tree: BasicCOITree::new(nodes.as_slice()),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Intervals overlapping `[start, end)`, ordered by block offset
    pub fn find(&self, start: usize, end: usize) -> Vec<Interval> {
        let mut found = vec![];
        if start >= end || start >= self.max || self.intervals.is_empty() {
            return found;
        }
        let last = end.min(self.max) - 1;

        self.tree.query(start as i32, last as i32, |node| {
            found.push(Interval {
                start: node.first as usize,
                end: node.last as usize + 1,
                offset: node.metadata.clone(),
            });
        });

        found.sort_by_key(|iv| (iv.offset, iv.start));
        found.dedup_by_key(|iv| iv.offset);
        found
    }
}

/// `source -> intervals`
#[derive(Default)]
pub struct MafIndex {
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Default)]
pub struct MafIndexBuilder {
    pending: BTreeMap<String, (usize, Vec<Interval>)>,
}

impl MafIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinates past [`MAX_SRC_SIZE`] are rejected
    pub fn add(
        &mut self,
        key: &str,
        start: usize,
        end: usize,
        offset: u64,
        max: usize,
    ) -> anyhow::Result<()> {
        if end > MAX_SRC_SIZE || max > MAX_SRC_SIZE {
            bail!("{}: coordinate {} too large to index", key, end.max(max));
        }
        let (cur_max, intervals) = self.pending.entry(key.to_string()).or_default();
        *cur_max = (*cur_max).max(max);
        // empty rows can't be hit by any query
        if end > start {
            intervals.push(Interval { start, end, offset });
        }
        Ok(())
    }

    pub fn build(self) -> MafIndex {
        MafIndex {
            entries: self
                .pending
                .into_iter()
                .map(|(key, (max, intervals))| (key, IndexEntry::new(max, intervals)))
                .collect(),
        }
    }
}

impl MafIndex {
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entry(&self, key: &str) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    /// Stabbing query; unknown keys give nothing
    pub fn find(&self, key: &str, start: usize, end: usize) -> Vec<Interval> {
        self.entries
            .get(key)
            .map(|e| e.find(start, end))
            .unwrap_or_default()
    }

    pub fn num_intervals(&self) -> usize {
        self.entries.values().map(|e| e.intervals.len()).sum()
    }

    /// Scans MAF blocks, keeping rows whose assembly is in `species`
    /// (all rows when `species` is empty).
    pub fn from_maf<R: BufRead>(reader: R, species: &[Assembly]) -> anyhow::Result<Self> {
        let mut builder = MafIndexBuilder::new();
        for result in MafReader::new(reader) {
            let (offset, ali) = result?;
            for comp in &ali.components {
                if !species.is_empty() && !species.iter().any(|sp| sp.owns(&comp.src)) {
                    continue;
                }
                builder.add(
                    &comp.src,
                    comp.forward_start(),
                    comp.forward_end(),
                    offset,
                    comp.src_size,
                )?;
            }
        }
        Ok(builder.build())
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "{}", INDEX_HEADER)?;
        for (key, entry) in &self.entries {
            writeln!(writer, ">{} {}", key, entry.max)?;
            for iv in &entry.intervals {
                writeln!(writer, "{}\t{}\t{}", iv.start, iv.end, iv.offset)?;
            }
        }
        writeln!(writer, "{} {}", INDEX_END, self.num_intervals())?;
        Ok(())
    }

    /// Fails on a missing header, a missing `##end` line or a count that
    /// doesn't match, so a truncated file is never taken as complete.
    pub fn read<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut builder = MafIndexBuilder::new();
        let mut current: Option<(String, usize)> = None;
        let mut seen_header = false;
        let mut expected: Option<usize> = None;
        let mut count = 0;

        for line in reader.lines() {
            let line = line?;
            if expected.is_some() {
                bail!("Content after the end line: {}", line);
            }
            if let Some(n) = line.strip_prefix(INDEX_END) {
                expected = Some(n.trim().parse()?);
                continue;
            }
            if line.starts_with("##") {
                if line.trim() != INDEX_HEADER {
                    bail!("Unsupported index header: {}", line);
                }
                seen_header = true;
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('>') {
                let (key, max) = rest
                    .split_once(' ')
                    .ok_or_else(|| anyhow!("Invalid index key line: {}", line))?;
                let max: usize = max.trim().parse()?;
                // keys without intervals still exist
                builder.add(key, 0, 0, 0, max)?;
                current = Some((key.to_string(), max));
                continue;
            }

            let (key, max) = current
                .as_ref()
                .ok_or_else(|| anyhow!("Interval before any key: {}", line))?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                bail!("Invalid index line: {}", line);
            }
            builder.add(
                key,
                fields[0].parse()?,
                fields[1].parse()?,
                fields[2].parse()?,
                *max,
            )?;
            count += 1;
        }

        if !seen_header {
            bail!("Missing index header");
        }
        match expected {
            None => bail!("Missing end line, the index is incomplete"),
            Some(n) if n != count => bail!("Index holds {} intervals, expected {}", count, n),
            _ => {}
        }
        Ok(builder.build())
    }
}

pub fn index_path(maf: &str) -> PathBuf {
    PathBuf::from(format!("{}.index", maf))
}

/// Scans `maf` and writes `<maf>.index`, overwriting an existing one.
///
/// The index is written to a temporary file in the same directory and
/// renamed into place, so readers never see a partial file.
pub fn build_index(maf: &str, species: &[Assembly]) -> anyhow::Result<PathBuf> {
    let file = File::open(maf).with_context(|| format!("could not open {}", maf))?;
    let index = MafIndex::from_maf(BufReader::new(file), species)
        .with_context(|| format!("could not index {}", maf))?;

    let path = index_path(maf);
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("could not create a temporary file in {}", dir.display()))?;
    {
        let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
        index.write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(&path)
        .with_context(|| format!("could not write {}", path.display()))?;

    log::info!(
        "Indexed {}: {} sources, {} intervals",
        maf,
        index.entries.len(),
        index.num_intervals()
    );
    Ok(path)
}

fn read_index(path: &Path) -> anyhow::Result<MafIndex> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    MafIndex::read(BufReader::new(file)).with_context(|| format!("bad index {}", path.display()))
}

/// Loads `<maf>.index`, building it first if it is missing or unreadable.
pub fn load_or_build(maf: &str, species: &[Assembly]) -> anyhow::Result<MafIndex> {
    let path = index_path(maf);
    if !path.is_file() {
        log::info!("No index for {}, building one", maf);
        build_index(maf, species)?;
        return read_index(&path);
    }
    match read_index(&path) {
        Ok(index) => Ok(index),
        Err(err) => {
            log::warn!("Rebuilding the index of {}: {:#}", maf, err);
            build_index(maf, species)?;
            read_index(&path)
        }
    }
}

/// A MAF file opened for random access through its index.
///
/// The index is shared; each handle owns its own file cursor.
pub struct MafIndexed {
    path: String,
    file: BufReader<File>,
    index: Arc<MafIndex>,
}

impl MafIndexed {
    pub fn open(maf: &str, species: &[Assembly]) -> anyhow::Result<Self> {
        let index = Arc::new(load_or_build(maf, species)?);
        Self::with_index(maf, index)
    }

    pub fn with_index(maf: &str, index: Arc<MafIndex>) -> anyhow::Result<Self> {
        if Path::new(maf).extension() == Some(std::ffi::OsStr::new("gz")) {
            bail!("{} is compressed; indexed access needs a plain MAF file", maf);
        }
        let file = File::open(maf).with_context(|| format!("could not open {}", maf))?;
        Ok(Self {
            path: maf.to_string(),
            file: BufReader::new(file),
            index,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn index(&self) -> &Arc<MafIndex> {
        &self.index
    }

    /// Blocks with a `key` row overlapping `[start, end)`, in file order.
    ///
    /// Each block is re-read from its stored offset when the iterator
    /// reaches it.
    pub fn query_blocks(
        &mut self,
        key: &str,
        start: usize,
        end: usize,
    ) -> impl Iterator<Item = anyhow::Result<MafAli>> + '_ {
        let intervals = self.index.find(key, start, end);
        let file = &mut self.file;
        intervals
            .into_iter()
            .map(move |iv| read_block_at(file, iv.offset))
    }
}

fn read_block_at(file: &mut BufReader<File>, offset: u64) -> anyhow::Result<MafAli> {
    file.seek(SeekFrom::Start(offset))?;
    match MafReader::with_offset(&mut *file, offset).next() {
        Some(result) => result.map(|(_, ali)| ali),
        None => bail!("No MAF block at offset {}", offset),
    }
}
