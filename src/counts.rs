use bitflags::bitflags;
use ndarray::{Array2, Array3, ArrayView2};

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::label::Label;

bitflags! {
    /// Statistics collected while counting a corpus
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flag: u32 {
        /// Emission and bigram transition counts
        const BIGRAM = 0x01;
        /// Trigram transition counts, required for second-order decoding
        const TRIGRAM = 0x02;
        const ALL = Self::BIGRAM.bits() | Self::TRIGRAM.bits();
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::ALL
    }
}

/// Label × word occurrence counts
///
/// Words get dense ids in first-seen order; counts are stored word-major so
/// that a new word only appends a row.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionCounts {
    words: Dictionary,
    num_labels: usize,
    /// `[W][L]` matrix, flattened
    counts: Vec<u64>,
    /// Sum over words for every label
    totals: Vec<u64>,
}

impl EmissionCounts {
    pub fn new(num_labels: usize) -> Self {
        Self {
            words: Dictionary::new(),
            num_labels,
            counts: Vec::new(),
            totals: vec![0; num_labels],
        }
    }

    pub(crate) fn from_parts(words: Dictionary, num_labels: usize, counts: Vec<u64>) -> Self {
        debug_assert_eq!(counts.len(), words.len() * num_labels);
        let mut totals = vec![0; num_labels];
        for row in counts.chunks(num_labels.max(1)) {
            for (total, &c) in totals.iter_mut().zip(row) {
                *total += c;
            }
        }
        Self {
            words,
            num_labels,
            counts,
            totals,
        }
    }

    /// Count one occurrence of `word` under `label`
    pub(crate) fn add(&mut self, label: Label, word: &str) {
        let wid = self.words.get_or_insert(word) as usize;
        if self.counts.len() < (wid + 1) * self.num_labels {
            self.counts.resize((wid + 1) * self.num_labels, 0);
        }
        self.counts[wid * self.num_labels + label.index()] += 1;
        self.totals[label.index()] += 1;
    }

    /// Number of times the word `wid` was seen under `label`
    pub fn count(&self, label: Label, wid: u32) -> u64 {
        self.counts
            .get(wid as usize * self.num_labels + label.index())
            .copied()
            .unwrap_or(0)
    }

    /// Number of tokens labeled `label`
    pub fn total(&self, label: Label) -> u64 {
        self.totals[label.index()]
    }

    /// Number of times the word `wid` was seen under any label
    pub fn word_total(&self, wid: u32) -> u64 {
        let start = wid as usize * self.num_labels;
        self.counts
            .get(start..start + self.num_labels)
            .map_or(0, |row| row.iter().sum())
    }

    pub fn word_id(&self, word: &str) -> Option<u32> {
        self.words.get(word)
    }

    /// The training vocabulary
    pub fn words(&self) -> &Dictionary {
        &self.words
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Counts as a `[W][L]` matrix view
    pub fn as_array(&self) -> ArrayView2<'_, u64> {
        ArrayView2::from_shape((self.words.len(), self.num_labels), &self.counts)
            .unwrap_or_else(|_| unreachable!("emission counts are always W x L"))
    }

    pub(crate) fn raw(&self) -> &[u64] {
        &self.counts
    }
}

/// Bigram label transition counts
///
/// This is a `[L][L]` matrix whose element `[u][v]` counts how often label
/// `v` directly followed label `u`, including `START -> first` and
/// `last -> STOP` edges.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCounts {
    counts: Array2<u64>,
}

impl TransitionCounts {
    pub fn new(num_labels: usize) -> Self {
        Self {
            counts: Array2::zeros((num_labels, num_labels)),
        }
    }

    pub(crate) fn from_array(counts: Array2<u64>) -> Self {
        Self { counts }
    }

    pub(crate) fn add(&mut self, u: Label, v: Label) {
        self.counts[[u.index(), v.index()]] += 1;
    }

    pub fn count(&self, u: Label, v: Label) -> u64 {
        self.counts[[u.index(), v.index()]]
    }

    /// Sum of the outgoing counts of `u`
    pub fn total(&self, u: Label) -> u64 {
        self.counts.row(u.index()).sum()
    }

    pub fn as_array(&self) -> &Array2<u64> {
        &self.counts
    }
}

/// Trigram label transition counts
///
/// This is a `[L][L][L]` tensor whose element `[w][u][v]` counts how often
/// label `v` followed the pair `(w, u)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrigramCounts {
    counts: Array3<u64>,
}

impl TrigramCounts {
    pub fn new(num_labels: usize) -> Self {
        Self {
            counts: Array3::zeros((num_labels, num_labels, num_labels)),
        }
    }

    pub(crate) fn from_array(counts: Array3<u64>) -> Self {
        Self { counts }
    }

    pub(crate) fn add(&mut self, w: Label, u: Label, v: Label) {
        self.counts[[w.index(), u.index(), v.index()]] += 1;
    }

    pub fn count(&self, w: Label, u: Label, v: Label) -> u64 {
        self.counts[[w.index(), u.index(), v.index()]]
    }

    /// Sum of the counts following the pair `(w, u)`
    pub fn total(&self, w: Label, u: Label) -> u64 {
        self.counts
            .slice(ndarray::s![w.index(), u.index(), ..])
            .sum()
    }

    pub fn as_array(&self) -> &Array3<u64> {
        &self.counts
    }
}

/// Raw statistics of a labeled corpus
#[derive(Debug, Clone, PartialEq)]
pub struct Counts {
    pub emissions: EmissionCounts,
    pub bigrams: TransitionCounts,
    /// Present when counted with [`Flag::TRIGRAM`]
    pub trigrams: Option<TrigramCounts>,
}

impl Counts {
    /// Number of labels the counts were collected over
    pub fn num_labels(&self) -> usize {
        self.emissions.num_labels()
    }

    /// Check that every table is shaped for `num_labels` labels
    pub(crate) fn validate(&self, num_labels: usize) -> Result<()> {
        let l = num_labels;
        if self.emissions.num_labels() != l {
            return Err(Error::invalid_argument(format!(
                "emission counts cover {} labels, expected {}",
                self.emissions.num_labels(),
                l
            )));
        }
        if self.bigrams.as_array().dim() != (l, l) {
            return Err(Error::invalid_argument(
                "bigram counts do not match the label set",
            ));
        }
        if let Some(trigrams) = &self.trigrams {
            if trigrams.as_array().dim() != (l, l, l) {
                return Err(Error::invalid_argument(
                    "trigram counts do not match the label set",
                ));
            }
        }
        Ok(())
    }
}

/// Single pass counter over labeled sequences
///
/// Tracks the two most recent labels of the current sequence, both `START`
/// at a sequence start.
#[derive(Debug, Clone)]
pub struct CorpusCounter {
    counts: Counts,
    prev2: Label,
    prev1: Label,
    /// Whether at least one token of the current sequence was seen
    open: bool,
    num_sequences: usize,
    num_tokens: usize,
}

impl CorpusCounter {
    pub fn new(num_labels: usize, flag: Flag) -> Self {
        let trigrams = if flag.contains(Flag::TRIGRAM) {
            Some(TrigramCounts::new(num_labels))
        } else {
            None
        };
        Self {
            counts: Counts {
                emissions: EmissionCounts::new(num_labels),
                bigrams: TransitionCounts::new(num_labels),
                trigrams,
            },
            prev2: Label::START,
            prev1: Label::START,
            open: false,
            num_sequences: 0,
            num_tokens: 0,
        }
    }

    /// Count one token of the current sequence
    ///
    /// `label` must be a domain label of the counted label set; sentinels
    /// never emit.
    pub fn observe(&mut self, word: &str, label: Label) -> Result<()> {
        if label.index() >= self.counts.num_labels() {
            return Err(Error::invalid_argument(format!(
                "label {} is outside of the counted label set",
                label
            )));
        }
        if label.is_sentinel() {
            return Err(Error::invalid_argument("sentinel labels never emit"));
        }
        self.counts.emissions.add(label, word);
        self.counts.bigrams.add(self.prev1, label);
        // The first label of a sequence has no (prev2, prev1) history yet
        if self.open {
            if let Some(trigrams) = self.counts.trigrams.as_mut() {
                trigrams.add(self.prev2, self.prev1, label);
            }
        }
        self.prev2 = self.prev1;
        self.prev1 = label;
        self.open = true;
        self.num_tokens += 1;
        Ok(())
    }

    /// Close the current sequence; a no-op when no token was observed since the last boundary
    pub fn end_sequence(&mut self) {
        if !self.open {
            return;
        }
        self.counts.bigrams.add(self.prev1, Label::STOP);
        if let Some(trigrams) = self.counts.trigrams.as_mut() {
            trigrams.add(self.prev2, self.prev1, Label::STOP);
        }
        self.prev2 = Label::START;
        self.prev1 = Label::START;
        self.open = false;
        self.num_sequences += 1;
    }

    /// Number of completed sequences
    pub fn num_sequences(&self) -> usize {
        self.num_sequences
    }

    /// Number of counted tokens
    pub fn num_tokens(&self) -> usize {
        self.num_tokens
    }

    /// Counts of all completed sequences
    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    /// Close any open sequence and return the counts
    pub fn finish(mut self) -> Counts {
        self.end_sequence();
        self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelSet;

    fn count(labels: &LabelSet, seqs: &[&[(&str, &str)]], flag: Flag) -> Counts {
        let mut counter = CorpusCounter::new(labels.len(), flag);
        for seq in seqs {
            for (word, label) in seq.iter() {
                counter.observe(word, labels.get(label).unwrap()).unwrap();
            }
            counter.end_sequence();
        }
        counter.finish()
    }

    #[test]
    fn test_counts_sentinel_edges() {
        let labels = LabelSet::new(["X", "Y"]).unwrap();
        let x = labels.get("X").unwrap();
        let y = labels.get("Y").unwrap();
        let counts = count(
            &labels,
            &[&[("a", "X"), ("b", "Y")], &[("a", "X")]],
            Flag::ALL,
        );

        assert_eq!(counts.bigrams.count(Label::START, x), 2);
        assert_eq!(counts.bigrams.count(x, y), 1);
        assert_eq!(counts.bigrams.count(y, Label::STOP), 1);
        assert_eq!(counts.bigrams.count(x, Label::STOP), 1);
        assert_eq!(counts.bigrams.total(Label::START), 2);
        assert_eq!(counts.bigrams.total(Label::STOP), 0);

        let trigrams = counts.trigrams.unwrap();
        assert_eq!(trigrams.count(Label::START, x, y), 1);
        assert_eq!(trigrams.count(x, y, Label::STOP), 1);
        // A single-token sequence contributes only its STOP trigram
        assert_eq!(trigrams.count(Label::START, x, Label::STOP), 1);
        assert_eq!(trigrams.count(Label::START, Label::START, x), 0);
        assert_eq!(trigrams.total(Label::START, x), 2);
        assert_eq!(trigrams.as_array().sum(), 3);
    }

    #[test]
    fn test_emission_counts() {
        let labels = LabelSet::new(["X", "Y"]).unwrap();
        let x = labels.get("X").unwrap();
        let y = labels.get("Y").unwrap();
        let counts = count(
            &labels,
            &[&[("a", "X"), ("b", "Y"), ("a", "Y")], &[("A", "X")]],
            Flag::BIGRAM,
        );
        assert!(counts.trigrams.is_none());

        let emissions = &counts.emissions;
        assert_eq!(emissions.num_words(), 3);
        let a = emissions.word_id("a").unwrap();
        assert_eq!(emissions.count(x, a), 1);
        assert_eq!(emissions.count(y, a), 1);
        assert_eq!(emissions.word_total(a), 2);
        assert_eq!(emissions.total(x), 2);
        assert_eq!(emissions.total(y), 2);
        assert_eq!(emissions.total(Label::START), 0);
        assert_ne!(emissions.word_id("A"), Some(a));
        assert_eq!(emissions.as_array().shape(), &[3, 4]);
        assert_eq!(emissions.as_array().sum(), 4);

        let rebuilt =
            EmissionCounts::from_parts(emissions.words().clone(), 4, emissions.raw().to_vec());
        assert_eq!(&rebuilt, emissions);
    }

    #[test]
    fn test_end_sequence_without_tokens() {
        let labels = LabelSet::new(["X"]).unwrap();
        let mut counter = CorpusCounter::new(labels.len(), Flag::ALL);
        counter.end_sequence();
        counter.end_sequence();
        assert_eq!(counter.num_sequences(), 0);

        counter.observe("a", labels.get("X").unwrap()).unwrap();
        let counts = counter.finish();
        assert_eq!(counts.bigrams.total(Label::START), 1);
        assert_eq!(counts.bigrams.as_array().sum(), 2);
    }

    #[test]
    fn test_observe_rejects_foreign_labels() {
        let labels = LabelSet::new(["X"]).unwrap();
        let mut counter = CorpusCounter::new(labels.len(), Flag::ALL);

        let err = counter.observe("a", Label::START).unwrap_err();
        assert_eq!(err.to_string(), "sentinel labels never emit");
        assert!(counter.observe("a", Label::STOP).is_err());

        let wider = LabelSet::new(["X", "Y"]).unwrap();
        let err = counter.observe("a", wider.get("Y").unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        // Nothing was counted
        assert_eq!(counter.num_tokens(), 0);
        let counts = counter.finish();
        assert_eq!(counts.emissions.total(Label::START), 0);
        assert_eq!(counts.bigrams.as_array().sum(), 0);
        assert_eq!(counts.emissions.num_words(), 0);
    }

    #[test]
    fn test_validate_shapes() {
        let counts = CorpusCounter::new(3, Flag::ALL).finish();
        assert_eq!(counts.num_labels(), 3);
        assert!(counts.validate(3).is_ok());
        assert!(counts.validate(4).is_err());

        let mut mixed = CorpusCounter::new(3, Flag::ALL).finish();
        mixed.trigrams = Some(TrigramCounts::new(4));
        let err = mixed.validate(3).unwrap_err();
        assert_eq!(err.to_string(), "trigram counts do not match the label set");
    }
}
