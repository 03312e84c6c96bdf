use anyhow::{anyhow, bail};
use std::io::{self, BufRead, Write};

pub const GAP: u8 = b'-';

/// Largest source length accepted; interval trees store `i32` coordinates
pub const MAX_SRC_SIZE: usize = i32::MAX as usize;

/// One `s` line of a MAF block.
///
/// `start` and `size` are on the strand given by `strand`; `text` is the
/// gapped alignment row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MafComp {
    pub src: String,
    pub start: usize,
    pub size: usize,
    pub strand: char,
    pub src_size: usize,
    pub text: String,
}

impl MafComp {
    pub fn forward_start(&self) -> usize {
        if self.strand == '-' {
            self.src_size - (self.start + self.size)
        } else {
            self.start
        }
    }

    pub fn forward_end(&self) -> usize {
        self.forward_start() + self.size
    }

    /// Maps a forward-strand coordinate to an alignment column.
    ///
    /// `pos` may equal `forward_end()`, which maps to the column just past the
    /// last base (for `-` strand rows, to the column of the first base).
    pub fn coord_to_col(&self, pos: usize) -> Option<usize> {
        let (start, end) = (self.forward_start(), self.forward_end());
        if pos < start || pos > end {
            return None;
        }
        let nth = pos - start;
        let text = self.text.as_bytes();

        if self.strand == '-' {
            if nth == self.size {
                return Some(0);
            }
            text.iter()
                .enumerate()
                .rev()
                .filter(|&(_, &b)| b != GAP)
                .nth(nth)
                .map(|(x, _)| x + 1)
        } else {
            if nth == self.size {
                return Some(text.len());
            }
            text.iter()
                .enumerate()
                .filter(|&(_, &b)| b != GAP)
                .nth(nth)
                .map(|(x, _)| x)
        }
    }

    /// Columns `[start_col, end_col)` of this row
    pub fn slice(&self, start_col: usize, end_col: usize) -> MafComp {
        let text = &self.text[start_col..end_col];
        let gaps_before = self.text.as_bytes()[..start_col]
            .iter()
            .filter(|&&b| b == GAP)
            .count();

        MafComp {
            src: self.src.clone(),
            start: self.start + start_col - gaps_before,
            size: text.bytes().filter(|&b| b != GAP).count(),
            strand: self.strand,
            src_size: self.src_size,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MafAli {
    pub score: Option<f64>,
    pub components: Vec<MafComp>,
}

impl MafAli {
    pub fn text_size(&self) -> usize {
        self.components.first().map(|c| c.text.len()).unwrap_or(0)
    }

    pub fn component_by_src(&self, src: &str) -> Option<&MafComp> {
        self.components.iter().find(|c| c.src == src)
    }

    pub fn slice(&self, start_col: usize, end_col: usize) -> MafAli {
        MafAli {
            score: self.score,
            components: self
                .components
                .iter()
                .map(|c| c.slice(start_col, end_col))
                .collect(),
        }
    }

    /// Cuts the block to the forward-strand region `[start, end)` of the row
    /// named `src`.
    ///
    /// Returns `None` when the block has no such row or the row does not
    /// cover the whole region.
    pub fn slice_by_component(&self, src: &str, start: usize, end: usize) -> Option<MafAli> {
        let comp = self.component_by_src(src)?;
        let mut start_col = comp.coord_to_col(start)?;
        let mut end_col = comp.coord_to_col(end)?;
        if comp.strand == '-' {
            std::mem::swap(&mut start_col, &mut end_col);
        }
        if start_col > end_col || end_col > self.text_size() {
            return None;
        }
        Some(self.slice(start_col, end_col))
    }
}

/// Sequential MAF reader that remembers where each block starts.
///
/// Yields `(offset, block)`, where `offset` is the byte position of the
/// block's `a` line relative to the start of the underlying reader plus the
/// initial offset.
pub struct MafReader<R> {
    reader: R,
    line_buf: String,
    offset: u64,
    // an `a` line read while finishing the previous block
    pending: Option<u64>,
}

impl<R: BufRead> MafReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, 0)
    }

    /// For a reader already positioned at `offset`
    pub fn with_offset(reader: R, offset: u64) -> Self {
        Self {
            reader,
            line_buf: String::new(),
            offset,
            pending: None,
        }
    }

    fn read_line(&mut self) -> io::Result<Option<u64>> {
        self.line_buf.clear();
        let line_start = self.offset;
        let n = self.reader.read_line(&mut self.line_buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        Ok(Some(line_start))
    }

    fn next_block(&mut self) -> anyhow::Result<Option<(u64, MafAli)>> {
        // Find the `a` line
        let block_start = match self.pending.take() {
            Some(pos) => pos,
            None => loop {
                match self.read_line()? {
                    None => return Ok(None),
                    Some(pos) => {
                        if self.line_buf.starts_with('a') {
                            break pos;
                        }
                        // header, comments and blank lines
                    }
                }
            },
        };

        let mut ali = MafAli {
            score: parse_score(self.line_buf.trim_end()),
            components: vec![],
        };

        loop {
            let pos = match self.read_line()? {
                None => break,
                Some(pos) => pos,
            };
            let line = self.line_buf.trim_end();
            if line.is_empty() {
                break;
            }
            match line.as_bytes()[0] {
                b's' => ali.components.push(parse_comp(line)?),
                b'a' => {
                    self.pending = Some(pos);
                    break;
                }
                // i, e, q lines and comments
                _ => {}
            }
        }

        let size = ali.text_size();
        if let Some(comp) = ali.components.iter().find(|c| c.text.len() != size) {
            bail!(
                "Block at offset {}: row {} has {} columns, expected {}",
                block_start,
                comp.src,
                comp.text.len(),
                size
            );
        }

        Ok(Some((block_start, ali)))
    }
}

impl<R: BufRead> Iterator for MafReader<R> {
    type Item = anyhow::Result<(u64, MafAli)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_block().transpose()
    }
}

fn parse_score(line: &str) -> Option<f64> {
    line.split_whitespace()
        .filter_map(|kv| kv.strip_prefix("score="))
        .find_map(|v| v.parse().ok())
}

fn parse_comp(line: &str) -> anyhow::Result<MafComp> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 7 {
        bail!("Invalid MAF s line: {}", line);
    }
    let number = |i: usize| -> anyhow::Result<usize> {
        fields[i]
            .parse()
            .map_err(|_| anyhow!("Invalid number {} in MAF line: {}", fields[i], line))
    };

    let strand = match fields[4] {
        "+" => '+',
        "-" => '-',
        s => bail!("Invalid strand {} in MAF line: {}", s, line),
    };
    let text = fields[6];
    if !text.is_ascii() {
        bail!("Non-ASCII alignment text in MAF line: {}", line);
    }

    let comp = MafComp {
        src: fields[1].to_string(),
        start: number(2)?,
        size: number(3)?,
        strand,
        src_size: number(5)?,
        text: text.to_string(),
    };
    if comp.src_size > MAX_SRC_SIZE {
        bail!("Source size {} is too large in MAF line: {}", comp.src_size, line);
    }
    match comp.start.checked_add(comp.size) {
        Some(end) if end <= comp.src_size => {}
        _ => bail!("Row runs past the end of its source: {}", line),
    }

    Ok(comp)
}

pub struct MafWriter<W: Write> {
    writer: W,
}

impl<W: Write> MafWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self, program: &str) -> io::Result<()> {
        writeln!(self.writer, "##maf version=1 scoring={}", program)
    }

    pub fn write_ali(&mut self, ali: &MafAli) -> io::Result<()> {
        writeln!(self.writer, "a score={:.1}", ali.score.unwrap_or(0.0))?;
        for comp in &ali.components {
            writeln!(
                self.writer,
                "s {:<20} {:10} {:10} {} {:10} {}",
                comp.src, comp.start, comp.size, comp.strand, comp.src_size, comp.text
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
