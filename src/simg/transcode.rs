use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, warn};

use crate::simg::chunk::ChunkType;
use crate::simg::engine::{Feed, RechunkEngine};
use crate::simg::error::SparseError;
use crate::simg::header::ImageHeader;
use crate::simg::options::RechunkOptions;
use crate::simg::reader::ChunkReader;
use crate::simg::writer::SparseWriter;

/// Path argument meaning stdin or stdout
pub const STDIO_PATH: &str = "-";

/// Suffix appended to the input path when no output path is given
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".aligned";

/// Result of a completed re-chunking pass
#[derive(Debug, Clone)]
pub struct RechunkSummary {
    /// Header written to the output
    pub header: ImageHeader,
    pub input_chunks: u32,
    pub output_chunks: u32,
    /// Sum of block counts over all input chunks
    pub input_blocks: u64,
    /// Output size in bytes, header included
    pub bytes_written: u64,
    pub elapsed_secs: f64,
}

/// One entry of an image's chunk table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    pub index: u32,
    pub chunk_type: ChunkType,
    /// First block covered by the chunk in the expanded image
    pub start_block: u64,
    pub block_count: u32,
    pub payload_bytes: u64,
}

/// Decoded header and chunk table of a sparse image
#[derive(Debug, Clone)]
pub struct ImageLayout {
    pub header: ImageHeader,
    pub chunks: Vec<ChunkInfo>,
}

/// Block sizes must be a non-zero multiple of 4, as the on-device sparse format requires.
fn check_block_size(header: &ImageHeader) -> Result<(), SparseError> {
    if header.block_size == 0 || header.block_size % 4 != 0 {
        return Err(SparseError::InvalidBlockSize(header.block_size));
    }
    Ok(())
}

/// Decode and validate the image header and the window size.
///
/// Runs before any output is opened, so a bad input leaves the destination untouched.
fn prepare<R: Read>(
    input: &mut R,
    options: &RechunkOptions,
) -> Result<(ImageHeader, u32), SparseError> {
    let capacity = options.alignment_bytes()?;
    let header = ImageHeader::read_from(input)?;
    check_block_size(&header)?;
    Ok((header, capacity))
}

/// Re-chunk one sparse image from `input` into `output`.
///
/// The output is written in two phases: a placeholder header followed by
/// the merged chunks, then the real header is patched in at offset 0.
/// On error the contents of `output` are unspecified, except that nothing
/// is written when the header or options are rejected.
pub fn rechunk<R, W>(
    mut input: R,
    output: &mut W,
    options: &RechunkOptions,
) -> Result<RechunkSummary, SparseError>
where
    R: Read,
    W: Write + Seek,
{
    let start = Instant::now();
    let (header, capacity) = prepare(&mut input, options)?;
    rechunk_body(header, capacity, input, output, start)
}

/// Merge the chunks following an already validated `header`.
fn rechunk_body<R, W>(
    header: ImageHeader,
    capacity: u32,
    input: R,
    output: &mut W,
    start: Instant,
) -> Result<RechunkSummary, SparseError>
where
    R: Read,
    W: Write + Seek,
{
    debug!(
        "Sparse image v{}.{}: block_size={}, total_blocks={}, total_chunks={}, window={} bytes",
        header.major_version,
        header.minor_version,
        header.block_size,
        header.total_blocks,
        header.total_chunks,
        capacity
    );

    let mut reader = ChunkReader::new(input, header.block_size);
    let mut engine = RechunkEngine::new(header.block_size, capacity);
    let mut writer = SparseWriter::new(&mut *output, header.block_size)?;

    let mut placed = 0u32;
    let mut input_blocks = 0u64;
    while placed < header.total_chunks {
        let chunk = reader.next_chunk()?;
        let block_count = chunk.block_count;
        match engine.feed(chunk, &mut writer)? {
            Feed::Placed => {
                placed += 1;
                input_blocks += block_count as u64;
            }
            Feed::Redeliver(chunk) => reader.rewind(chunk),
        }
    }
    engine.finish(&mut writer)?;

    if input_blocks != header.total_blocks as u64 {
        warn!(
            "Chunks cover {} blocks but header declares {}",
            input_blocks, header.total_blocks
        );
    }

    let out_header = header.with_total_chunks(writer.chunks_written());
    let bytes_written = writer.bytes_written();
    writer.finish(&out_header)?;

    let summary = RechunkSummary {
        header: out_header,
        input_chunks: header.total_chunks,
        output_chunks: out_header.total_chunks,
        input_blocks,
        bytes_written,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    debug!(
        "Re-chunked {} chunks into {} ({} bytes)",
        summary.input_chunks, summary.output_chunks, summary.bytes_written
    );
    Ok(summary)
}

/// Re-chunk into a sink that cannot seek.
///
/// The image is built in an anonymous temporary file so the header can be
/// patched, then copied to `output` once complete.
pub fn rechunk_spooled<R, W>(
    input: R,
    output: &mut W,
    options: &RechunkOptions,
) -> Result<RechunkSummary, SparseError>
where
    R: Read,
    W: Write,
{
    let mut spool = tempfile::tempfile()?;
    let summary = {
        let mut buffered = BufWriter::new(&mut spool);
        let summary = rechunk(input, &mut buffered, options)?;
        buffered.flush()?;
        summary
    };
    spool.seek(SeekFrom::Start(0))?;
    let copied = io::copy(&mut spool, output)?;
    output.flush()?;
    debug!("Copied {} spooled bytes", copied);
    Ok(summary)
}

/// Default output location: the input path with `.aligned` appended, or
/// stdout when the input is stdin.
pub fn default_output_path(input: &Path) -> PathBuf {
    if input.as_os_str() == STDIO_PATH {
        return PathBuf::from(STDIO_PATH);
    }
    let mut name = input.as_os_str().to_owned();
    name.push(DEFAULT_OUTPUT_SUFFIX);
    PathBuf::from(name)
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if path.as_os_str() == STDIO_PATH {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Re-chunk between paths. `-` selects stdin or stdout.
///
/// Stdout cannot seek back to patch the header, so that output goes
/// through [`rechunk_spooled`]. A file output is only created once the
/// input header has been accepted.
pub fn rechunk_path(
    input: &Path,
    output: &Path,
    options: &RechunkOptions,
) -> Result<RechunkSummary, SparseError> {
    let mut reader = open_input(input)?;

    if output.as_os_str() == STDIO_PATH {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        return rechunk_spooled(reader, &mut stdout, options);
    }

    let start = Instant::now();
    let (header, capacity) = prepare(&mut reader, options)?;
    let file = File::create(output)?;
    let mut buffered = BufWriter::new(file);
    let summary = rechunk_body(header, capacity, reader, &mut buffered, start)?;
    buffered.flush()?;
    debug!("Wrote {}", output.display());
    Ok(summary)
}

/// Decode the header and chunk table of a sparse image without writing anything.
pub fn inspect<R: Read>(mut input: R) -> Result<ImageLayout, SparseError> {
    let header = ImageHeader::read_from(&mut input)?;
    check_block_size(&header)?;

    let mut reader = ChunkReader::new(input, header.block_size);
    let mut chunks = Vec::with_capacity(header.total_chunks.min(4096) as usize);
    let mut start_block = 0u64;
    for index in 0..header.total_chunks {
        let chunk = reader.next_chunk()?;
        chunks.push(ChunkInfo {
            index,
            chunk_type: chunk.chunk_type(),
            start_block,
            block_count: chunk.block_count,
            payload_bytes: chunk.payload_bytes(header.block_size),
        });
        start_block += chunk.block_count as u64;
    }

    Ok(ImageLayout { header, chunks })
}

pub fn inspect_path(input: &Path) -> Result<ImageLayout, SparseError> {
    inspect(open_input(input)?)
}
