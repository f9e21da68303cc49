use std::io::{self, Seek, SeekFrom, Write};

use cqdb::CQDBWriter;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::model::Model;

pub(crate) const MAGIC: &[u8; 4] = b"lHMM";
pub(crate) const VERSION: u32 = 1;
pub(crate) const HEADER_SIZE: usize = 48;

/// Offsets of the model sections, relative to the start of the model
#[derive(Debug, Default)]
struct Offsets {
    size: u32,
    labels: u32,
    words: u32,
    emissions: u32,
    bigrams: u32,
    trigrams: u32,
}

/// Writes a model in the `lHMM` format
///
/// Layout: a fixed size header, the label and word dictionaries as CQDB
/// databases, then the emission, bigram and (optional) trigram count chunks.
/// Only counts are stored; probabilities are re-estimated on load.
pub(crate) struct ModelWriter;

impl ModelWriter {
    pub fn write<W: Write + Seek>(writer: &mut W, model: &Model) -> Result<()> {
        let base = writer.stream_position()?;
        let rel = |pos: u64| -> Result<u32> {
            u32::try_from(pos - base)
                .map_err(|_| Error::invalid_argument("model exceeds 4 GiB"))
        };
        let counts = model.counts();
        let mut offsets = Offsets::default();

        // Placeholder header, rewritten once the offsets are known
        Self::write_header(writer, model, &offsets)?;

        offsets.labels = rel(writer.stream_position()?)?;
        Self::write_cqdb(writer, model.labels().names())?;

        offsets.words = rel(writer.stream_position()?)?;
        Self::write_cqdb(writer, counts.emissions.words())?;

        Self::align_to_u32(writer)?;
        offsets.emissions = rel(writer.stream_position()?)?;
        Self::write_chunk(writer, b"EMIT", counts.emissions.raw().iter().copied())?;

        offsets.bigrams = rel(writer.stream_position()?)?;
        Self::write_chunk(writer, b"TRN1", counts.bigrams.as_array().iter().copied())?;

        if let Some(trigrams) = &counts.trigrams {
            offsets.trigrams = rel(writer.stream_position()?)?;
            Self::write_chunk(writer, b"TRN2", trigrams.as_array().iter().copied())?;
        }

        let end = writer.stream_position()?;
        offsets.size = rel(end)?;
        writer.seek(SeekFrom::Start(base))?;
        Self::write_header(writer, model, &offsets)?;
        writer.seek(SeekFrom::Start(end))?;

        log::debug!(
            "wrote model: {} labels, {} words, {} bytes",
            model.num_labels(),
            model.num_words(),
            offsets.size
        );
        Ok(())
    }

    fn write_header<W: Write>(writer: &mut W, model: &Model, offsets: &Offsets) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&offsets.size.to_le_bytes())?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&model.flag().bits().to_le_bytes())?;
        writer.write_all(&model.num_labels().to_le_bytes())?;
        writer.write_all(&model.num_words().to_le_bytes())?;
        writer.write_all(&offsets.labels.to_le_bytes())?;
        writer.write_all(&offsets.words.to_le_bytes())?;
        writer.write_all(&offsets.emissions.to_le_bytes())?;
        writer.write_all(&offsets.bigrams.to_le_bytes())?;
        writer.write_all(&offsets.trigrams.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?;
        Ok(())
    }

    /// Write a CQDB dictionary
    fn write_cqdb<W: Write + Seek>(writer: &mut W, dict: &Dictionary) -> io::Result<()> {
        let mut db = CQDBWriter::new(writer)?;
        for (s, id) in dict.iter() {
            db.put(s, id)?;
        }
        // The database is finalized when the writer is dropped
        Ok(())
    }

    fn write_chunk<W, I>(writer: &mut W, magic: &[u8; 4], values: I) -> Result<()>
    where
        W: Write,
        I: ExactSizeIterator<Item = u64>,
    {
        let size = u32::try_from(8 + 8 * values.len())
            .map_err(|_| Error::invalid_argument("count chunk exceeds 4 GiB"))?;
        writer.write_all(magic)?;
        writer.write_all(&size.to_le_bytes())?;
        for value in values {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Align the stream position to a 4-byte boundary with zero padding
    fn align_to_u32<W: Write + Seek>(writer: &mut W) -> io::Result<()> {
        let mut pos = writer.stream_position()?;
        while pos % 4 != 0 {
            writer.write_all(&[0])?;
            pos += 1;
        }
        Ok(())
    }
}
