use std::{
    fs::File,
    io::{self, BufWriter, Seek, Write},
    path::Path,
};

use bstr::ByteSlice;
use cqdb::CQDB;
use ndarray::{Array2, Array3};

use crate::counts::{Counts, EmissionCounts, Flag, TransitionCounts, TrigramCounts};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::label::{Label, LabelSet, START, STOP};
use crate::model_writer::{ModelWriter, HEADER_SIZE, MAGIC, VERSION};
use crate::params::{EmissionTable, TransitionTable, TrigramTable};
use crate::Tagger;

#[inline]
fn unpack_u32(buf: &[u8], offset: usize) -> Result<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::InvalidModel("not enough data for unpacking u32"))
}

#[inline]
fn unpack_u64(buf: &[u8], offset: usize) -> Result<u64> {
    buf.get(offset..offset + 8)
        .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .ok_or(Error::InvalidModel("not enough data for unpacking u64"))
}

#[derive(Debug, Clone)]
struct Header {
    flag: u32,
    num_labels: u32,
    num_words: u32,
    off_labels: u32,
    off_words: u32,
    off_emissions: u32,
    off_bigrams: u32,
    off_trigrams: u32,
}

/// The HMM: a closed label set, the training vocabulary, raw counts and the
/// probability tables estimated from them
///
/// A model never changes after construction, so it can be shared freely
/// between taggers and threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    labels: LabelSet,
    counts: Counts,
    emissions: EmissionTable,
    transitions: TransitionTable,
    trigrams: Option<TrigramTable>,
}

impl Model {
    /// Estimate a model from raw counts
    ///
    /// Fails with [`Error::InvalidArgument`] unless the counts were collected
    /// over exactly the labels of `labels`.
    pub fn from_counts(labels: LabelSet, counts: Counts) -> Result<Self> {
        counts.validate(labels.len())?;
        Ok(Self::estimate(labels, counts))
    }

    /// Estimate a model from counts already shaped for `labels`
    pub(crate) fn estimate(labels: LabelSet, counts: Counts) -> Self {
        let emissions = EmissionTable::estimate(&counts.emissions);
        let transitions = TransitionTable::estimate(&counts.bigrams);
        let trigrams = counts.trigrams.as_ref().map(TrigramTable::estimate);
        Self {
            labels,
            counts,
            emissions,
            transitions,
            trigrams,
        }
    }

    /// Load a model from its serialized form, see [`Model::write`]
    pub fn new(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::InvalidModel("model is smaller than its header"));
        }
        if &buf[0..4] != MAGIC {
            return Err(Error::InvalidModel("magic mismatch"));
        }
        let size = unpack_u32(buf, 4)? as usize;
        if size != buf.len() {
            return Err(Error::InvalidModel("size mismatch"));
        }
        if unpack_u32(buf, 8)? != VERSION {
            return Err(Error::InvalidModel("unsupported version"));
        }
        let header = Header {
            flag: unpack_u32(buf, 12)?,
            num_labels: unpack_u32(buf, 16)?,
            num_words: unpack_u32(buf, 20)?,
            off_labels: unpack_u32(buf, 24)?,
            off_words: unpack_u32(buf, 28)?,
            off_emissions: unpack_u32(buf, 32)?,
            off_bigrams: unpack_u32(buf, 36)?,
            off_trigrams: unpack_u32(buf, 40)?,
        };
        let flag = Flag::from_bits(header.flag).ok_or(Error::InvalidModel("unknown flags"))?;

        let labels = read_labels(buf, &header)?;
        let l = labels.len();
        let words = read_dictionary(buf, header.off_words, header.num_words)?;
        let w = words.len();

        let emissions = read_chunk(buf, header.off_emissions, b"EMIT", w * l)?;
        let bigrams = read_chunk(buf, header.off_bigrams, b"TRN1", l * l)?;
        let trigrams = if flag.contains(Flag::TRIGRAM) {
            let trigrams = read_chunk(buf, header.off_trigrams, b"TRN2", l * l * l)?;
            let trigrams = Array3::from_shape_vec((l, l, l), trigrams)
                .map_err(|_| Error::InvalidModel("malformed trigram counts"))?;
            Some(TrigramCounts::from_array(trigrams))
        } else {
            None
        };
        let bigrams = Array2::from_shape_vec((l, l), bigrams)
            .map_err(|_| Error::InvalidModel("malformed bigram counts"))?;

        let counts = Counts {
            emissions: EmissionCounts::from_parts(words, l, emissions),
            bigrams: TransitionCounts::from_array(bigrams),
            trigrams,
        };
        Ok(Self::estimate(labels, counts))
    }

    /// Serialize the model
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        ModelWriter::write(writer, self)
    }

    /// Serialize the model into a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path)?);
        self.write(&mut file)?;
        file.flush()?;
        log::info!("saved model to {}", path.display());
        Ok(())
    }

    /// Number of labels, sentinels included
    pub fn num_labels(&self) -> u32 {
        self.labels.len() as u32
    }

    /// Size of the training vocabulary
    pub fn num_words(&self) -> u32 {
        self.counts.emissions.num_words() as u32
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Statistics collected at training time
    pub fn flag(&self) -> Flag {
        if self.trigrams.is_some() {
            Flag::ALL
        } else {
            Flag::BIGRAM
        }
    }

    /// Whether second-order decoding is available
    pub fn has_trigrams(&self) -> bool {
        self.trigrams.is_some()
    }

    /// Convert a label ID to label string
    pub fn to_label(&self, lid: u32) -> Option<&str> {
        self.labels.label(lid).and_then(|label| self.labels.get_name(label))
    }

    /// Convert a label string to label ID
    pub fn to_label_id(&self, value: &str) -> Option<u32> {
        self.labels.get(value).ok().map(Label::id)
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn emissions(&self) -> &EmissionTable {
        &self.emissions
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    pub fn trigrams(&self) -> Option<&TrigramTable> {
        self.trigrams.as_ref()
    }

    /// Emission probability of `word` under the label named `label`
    pub fn emission_probability(&self, label: &str, word: &str) -> Result<f64> {
        let label = self.labels.get(label)?;
        Ok(self
            .emissions
            .prob(label, self.counts.emissions.word_id(word)))
    }

    /// Probability of label `v` following label `u`
    pub fn transition_probability(&self, u: &str, v: &str) -> Result<f64> {
        Ok(self
            .transitions
            .prob(self.labels.get(u)?, self.labels.get(v)?))
    }

    /// Probability of label `v` following the pair `(w, u)`
    pub fn trigram_probability(&self, w: &str, u: &str, v: &str) -> Result<f64> {
        let trigrams = self.trigrams.as_ref().ok_or_else(|| {
            Error::invalid_argument("model was trained without trigram transitions")
        })?;
        Ok(trigrams.prob(self.labels.get(w)?, self.labels.get(u)?, self.labels.get(v)?))
    }

    /// Resolve a token sequence to vocabulary ids, `None` for unseen words
    pub(crate) fn observe<S: AsRef<str>>(&self, xseq: &[S]) -> Result<Vec<Option<u32>>> {
        if xseq.is_empty() {
            return Err(Error::EmptySequence);
        }
        Ok(xseq
            .iter()
            .map(|word| self.counts.emissions.word_id(word.as_ref()))
            .collect())
    }

    /// Get a new tagger
    pub fn tagger(&self) -> Tagger<'_> {
        Tagger::new(self)
    }

    /// Print the model in human-readable format
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let labels = &self.labels;
        writeln!(w, "MODEL = {{")?;
        writeln!(w, "  flag: {:#X}", self.flag().bits())?;
        writeln!(w, "  num_labels: {}", self.num_labels())?;
        writeln!(w, "  num_words: {}", self.num_words())?;
        writeln!(w, "}}\n")?;

        writeln!(w, "LABELS = {{")?;
        for label in labels.iter() {
            writeln!(w, "  {:>5}: {}", label.id(), labels.name(label))?;
        }
        writeln!(w, "}}\n")?;

        writeln!(w, "TRANSITIONS = {{")?;
        for u in labels.iter() {
            for v in labels.iter() {
                let p = self.transitions.prob(u, v);
                if p != 0.0 {
                    writeln!(w, "  {} --> {}: {:.6}", labels.name(u), labels.name(v), p)?;
                }
            }
        }
        writeln!(w, "}}\n")?;

        if let Some(trigrams) = &self.trigrams {
            writeln!(w, "TRIGRAM_TRANSITIONS = {{")?;
            for t in labels.iter() {
                for u in labels.iter() {
                    for v in labels.iter() {
                        let p = trigrams.prob(t, u, v);
                        if p != 0.0 {
                            writeln!(
                                w,
                                "  {} {} --> {}: {:.6}",
                                labels.name(t),
                                labels.name(u),
                                labels.name(v),
                                p
                            )?;
                        }
                    }
                }
            }
            writeln!(w, "}}\n")?;
        }

        writeln!(w, "EMISSIONS = {{")?;
        for (word, wid) in self.counts.emissions.words().iter() {
            for label in labels.domain() {
                let p = self.emissions.prob(label, Some(wid));
                if p != 0.0 {
                    writeln!(w, "  {} --> {}: {:.6}", labels.name(label), word, p)?;
                }
            }
        }
        for label in labels.domain() {
            writeln!(
                w,
                "  {} --> (unseen): {:.6}",
                labels.name(label),
                self.emissions.prob(label, None)
            )?;
        }
        writeln!(w, "}}\n")?;
        Ok(())
    }
}

fn read_cqdb(buf: &[u8], offset: u32) -> Result<CQDB<'_>> {
    let offset = offset as usize;
    if offset < HEADER_SIZE || offset >= buf.len() {
        return Err(Error::InvalidModel("dictionary offset out of range"));
    }
    CQDB::new(&buf[offset..]).map_err(|_| Error::InvalidModel("malformed dictionary"))
}

fn read_dictionary(buf: &[u8], offset: u32, num: u32) -> Result<Dictionary> {
    let db = read_cqdb(buf, offset)?;
    let mut dict = Dictionary::new();
    for id in 0..num {
        let s = db
            .to_str(id)
            .and_then(|s| s.to_str().ok())
            .ok_or(Error::InvalidModel("missing dictionary entry"))?;
        if dict.get_or_insert(s) != id {
            return Err(Error::InvalidModel("duplicate dictionary entry"));
        }
    }
    Ok(dict)
}

fn read_labels(buf: &[u8], header: &Header) -> Result<LabelSet> {
    let names = read_dictionary(buf, header.off_labels, header.num_labels)?;
    if names.get_name(Label::START.id()) != Some(START)
        || names.get_name(Label::STOP.id()) != Some(STOP)
    {
        return Err(Error::InvalidModel("sentinel labels out of place"));
    }
    LabelSet::new(names.iter().skip(2).map(|(name, _)| name))
        .map_err(|_| Error::InvalidModel("malformed label set"))
}

fn read_chunk(buf: &[u8], offset: u32, magic: &[u8; 4], num: usize) -> Result<Vec<u64>> {
    let offset = offset as usize;
    if offset < HEADER_SIZE || buf.get(offset..offset + 4) != Some(&magic[..]) {
        return Err(Error::InvalidModel("chunk magic mismatch"));
    }
    let chunk_size = unpack_u32(buf, offset + 4)? as usize;
    if chunk_size != 8 + 8 * num {
        return Err(Error::InvalidModel("chunk size mismatch"));
    }
    (0..num)
        .map(|i| unpack_u64(buf, offset + 8 + 8 * i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::CorpusCounter;
    use crate::train::Trainer;

    fn tiny_model() -> Model {
        let labels = LabelSet::new(["X", "Y"]).unwrap();
        let mut trainer = Trainer::new(labels);
        trainer.append(&["a", "b"], &["X", "Y"]).unwrap();
        trainer.append(&["a"], &["X"]).unwrap();
        trainer.train()
    }

    #[test]
    fn test_model_accessors() {
        let model = tiny_model();
        assert_eq!(model.num_labels(), 4);
        assert_eq!(model.num_words(), 2);
        assert!(model.has_trigrams());
        assert_eq!(model.flag(), Flag::ALL);
        assert_eq!(model.to_label(2), Some("X"));
        assert_eq!(model.to_label(4), None);
        assert_eq!(model.to_label_id("Y"), Some(3));
        assert_eq!(model.to_label_id("Z"), None);

        assert_eq!(model.emission_probability("X", "a").unwrap(), 2.0 / 3.0);
        assert_eq!(model.emission_probability("Y", "a").unwrap(), 0.0);
        assert_eq!(model.emission_probability("Y", "zzz").unwrap(), 0.5);
        assert_eq!(model.transition_probability("START", "X").unwrap(), 1.0);
        assert_eq!(model.transition_probability("X", "Y").unwrap(), 0.5);
        assert_eq!(model.trigram_probability("START", "X", "Y").unwrap(), 0.5);
        assert!(matches!(
            model.transition_probability("X", "Z"),
            Err(Error::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_from_counts_checks_label_set() {
        let narrow = LabelSet::new(["X"]).unwrap();
        let mut counter = CorpusCounter::new(narrow.len(), Flag::ALL);
        counter.observe("a", narrow.get("X").unwrap()).unwrap();
        let counts = counter.finish();

        let err = Model::from_counts(LabelSet::default(), counts.clone()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(err.to_string(), "emission counts cover 3 labels, expected 9");

        let model = Model::from_counts(narrow, counts).unwrap();
        let path = crate::decode::viterbi(&model, &["a"]).unwrap();
        assert_eq!(path.names(model.labels()), ["START", "X", "STOP"]);
    }

    #[test]
    fn test_model_roundtrip() {
        let model = tiny_model();
        let mut buf = io::Cursor::new(Vec::new());
        model.write(&mut buf).unwrap();
        let buf = buf.into_inner();
        assert_eq!(&buf[0..4], b"lHMM");

        let loaded = Model::new(&buf).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_invalid_model() {
        assert!(matches!(Model::new(b""), Err(Error::InvalidModel(_))));

        let model = tiny_model();
        let mut buf = io::Cursor::new(Vec::new());
        model.write(&mut buf).unwrap();
        let mut buf = buf.into_inner();

        let truncated = &buf[..buf.len() - 1];
        assert!(Model::new(truncated).is_err());

        buf[0] = b'L';
        let err = Model::new(&buf).unwrap_err();
        assert_eq!(err.to_string(), "invalid model: magic mismatch");
    }

    #[test]
    fn test_model_dump() {
        let model = tiny_model();
        let mut out = Vec::new();
        model.dump(&mut out).unwrap();
        let out_str = std::str::from_utf8(&out).unwrap();
        let expected = r#"MODEL = {
  flag: 0x3
  num_labels: 4
  num_words: 2
}

LABELS = {
      0: START
      1: STOP
      2: X
      3: Y
}

TRANSITIONS = {
  START --> X: 1.000000
  X --> STOP: 0.500000
  X --> Y: 0.500000
  Y --> STOP: 1.000000
}

TRIGRAM_TRANSITIONS = {
  START X --> STOP: 0.500000
  START X --> Y: 0.500000
  X Y --> STOP: 1.000000
}

EMISSIONS = {
  X --> a: 0.666667
  Y --> b: 0.500000
  X --> (unseen): 0.333333
  Y --> (unseen): 0.500000
}

"#;
        assert_eq!(out_str, expected);
    }
}
