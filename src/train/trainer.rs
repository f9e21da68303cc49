use std::io::Read;

use crate::counts::{CorpusCounter, Flag};
use crate::dataset::{self, Line};
use crate::error::{Error, Result};
use crate::label::{Label, LabelSet};
use crate::model::Model;

/// HMM Trainer
///
/// Collects corpus statistics over a closed label set; [`Trainer::train`]
/// estimates a [`Model`] from everything appended so far.
#[derive(Debug, Clone)]
pub struct Trainer {
    labels: LabelSet,
    flag: Flag,
    counter: CorpusCounter,
}

impl Trainer {
    /// Create a new trainer collecting all statistics
    pub fn new(labels: LabelSet) -> Self {
        Self::with_flag(labels, Flag::default())
    }

    /// Create a new trainer collecting the statistics selected by `flag`
    pub fn with_flag(labels: LabelSet, flag: Flag) -> Self {
        let counter = CorpusCounter::new(labels.len(), flag);
        Self {
            labels,
            flag,
            counter,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// Number of sequences counted so far
    pub fn num_sequences(&self) -> usize {
        self.counter.num_sequences()
    }

    /// Number of tokens counted so far
    pub fn num_tokens(&self) -> usize {
        self.counter.num_tokens()
    }

    /// Append one labeled sequence
    ///
    /// Nothing is counted unless the whole sequence is valid.
    pub fn append<W, L>(&mut self, xseq: &[W], yseq: &[L]) -> Result<()>
    where
        W: AsRef<str>,
        L: AsRef<str>,
    {
        if xseq.len() != yseq.len() {
            return Err(Error::invalid_argument(
                "xseq and yseq must have the same length",
            ));
        }
        if xseq.is_empty() {
            return Err(Error::invalid_argument("empty sequences are not allowed"));
        }
        let labels = yseq
            .iter()
            .map(|name| self.domain_label(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for (word, label) in xseq.iter().zip(labels) {
            self.counter.observe(word.as_ref(), label)?;
        }
        self.counter.end_sequence();
        Ok(())
    }

    /// Count a labeled corpus of `<word> <label>` lines with blank-line sequence boundaries
    ///
    /// The last sequence is closed at the end of the input. On error the
    /// trainer is left as it was before the call.
    pub fn read<R: Read>(&mut self, mut reader: R) -> Result<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut counter = self.counter.clone();
        let (sequences, tokens) = (counter.num_sequences(), counter.num_tokens());
        for line in dataset::labeled_lines(&buf) {
            match line? {
                (lineno, Line::Token { word, label }) => {
                    let label = self
                        .domain_label(label)
                        .map_err(|err| Error::parse(lineno, err.to_string()))?;
                    counter.observe(word, label)?;
                }
                (_, Line::Boundary) => counter.end_sequence(),
            }
        }
        counter.end_sequence();

        log::debug!(
            "read {} sequences ({} tokens)",
            counter.num_sequences() - sequences,
            counter.num_tokens() - tokens
        );
        self.counter = counter;
        Ok(())
    }

    /// Clear all training data
    pub fn clear(&mut self) {
        self.counter = CorpusCounter::new(self.labels.len(), self.flag);
    }

    /// Estimate a model from the data counted so far
    pub fn train(&self) -> Model {
        if self.counter.num_sequences() == 0 {
            log::warn!("training without data, every transition probability is zero");
        }
        let counts = self.counter.clone().finish();
        log::info!("Number of sequences: {}", self.counter.num_sequences());
        log::info!("Number of tokens: {}", self.counter.num_tokens());
        log::info!("Number of labels: {}", self.labels.len());
        log::info!("Number of words: {}", counts.emissions.num_words());
        Model::estimate(self.labels.clone(), counts)
    }

    fn domain_label(&self, name: &str) -> Result<Label> {
        let label = self.labels.get(name)?;
        if label.is_sentinel() {
            return Err(Error::invalid_argument(format!(
                "{} cannot label a token",
                name
            )));
        }
        Ok(label)
    }
}
