//! Parameter estimation from corpus counts
//!
//! Emissions use add-one smoothing on the denominator with the numerator
//! reserved for unseen words; transitions are maximum likelihood estimates
//! without smoothing.
use ndarray::{Array1, Array2, Array3, Zip};

use crate::counts::{EmissionCounts, TransitionCounts, TrigramCounts};
use crate::error::{Error, Result};
use crate::label::Label;

/// Natural logarithm with `log(0)` mapped to `ln(f64::MIN_POSITIVE)`
///
/// Keeping impossible events finite makes every path comparable.
#[inline]
pub fn log_prob(p: f64) -> f64 {
    if p == 0.0 {
        f64::MIN_POSITIVE.ln()
    } else {
        p.ln()
    }
}

/// Smoothed probability of observing `word` under `label`
///
/// * sentinel labels never emit: `0`
/// * `word` unseen under every label: `1 / (total[label] + 1)`
/// * `word` seen, but not under `label`: `0`
/// * otherwise: `count[label][word] / (total[label] + 1)`
///
/// A label outside of the counted label set is an [`Error::InvalidArgument`].
pub fn emission_probability(counts: &EmissionCounts, label: Label, word: &str) -> Result<f64> {
    if label.index() >= counts.num_labels() {
        return Err(Error::invalid_argument(format!(
            "label {} is outside of the counted label set",
            label
        )));
    }
    Ok(smoothed_emission(counts, label, counts.word_id(word)))
}

fn smoothed_emission(counts: &EmissionCounts, label: Label, wid: Option<u32>) -> f64 {
    if label.is_sentinel() {
        return 0.0;
    }
    let denominator = counts.total(label) as f64 + 1.0;
    match wid.filter(|&wid| counts.word_total(wid) > 0) {
        Some(wid) => counts.count(label, wid) as f64 / denominator,
        None => 1.0 / denominator,
    }
}

/// Maximum likelihood estimate `count / total`, `0` for an empty row
#[inline]
fn ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Emission probabilities
///
/// This is a `[W][L]` matrix for the training vocabulary plus a `[L]` vector
/// for words outside of it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionTable {
    probs: Array2<f64>,
    unseen: Array1<f64>,
    log_probs: Array2<f64>,
    log_unseen: Array1<f64>,
}

impl EmissionTable {
    pub fn estimate(counts: &EmissionCounts) -> Self {
        let (num_words, num_labels) = (counts.num_words(), counts.num_labels());
        let probs = Array2::from_shape_fn((num_words, num_labels), |(wid, lid)| {
            smoothed_emission(counts, Label::new(lid as u32), Some(wid as u32))
        });
        let unseen = Array1::from_shape_fn(num_labels, |lid| {
            smoothed_emission(counts, Label::new(lid as u32), None)
        });
        Self {
            log_probs: probs.mapv(log_prob),
            log_unseen: unseen.mapv(log_prob),
            probs,
            unseen,
        }
    }

    /// Probability of the word `wid` under `label`; `None` stands for an out-of-vocabulary word
    #[inline]
    pub fn prob(&self, label: Label, wid: Option<u32>) -> f64 {
        match wid {
            Some(wid) => self.probs[[wid as usize, label.index()]],
            None => self.unseen[label.index()],
        }
    }

    #[inline]
    pub fn log_prob(&self, label: Label, wid: Option<u32>) -> f64 {
        match wid {
            Some(wid) => self.log_probs[[wid as usize, label.index()]],
            None => self.log_unseen[label.index()],
        }
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.probs
    }
}

/// Bigram transition probabilities, a `[L][L]` matrix
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    probs: Array2<f64>,
    log_probs: Array2<f64>,
}

impl TransitionTable {
    pub fn estimate(counts: &TransitionCounts) -> Self {
        let counts = counts.as_array();
        let totals = counts.sum_axis(ndarray::Axis(1));
        let mut probs = Array2::zeros(counts.raw_dim());
        Zip::indexed(&mut probs)
            .and(counts)
            .for_each(|(u, _), p, &c| *p = ratio(c, totals[u]));
        Self {
            log_probs: probs.mapv(log_prob),
            probs,
        }
    }

    #[inline]
    pub fn prob(&self, u: Label, v: Label) -> f64 {
        self.probs[[u.index(), v.index()]]
    }

    #[inline]
    pub fn log_prob(&self, u: Label, v: Label) -> f64 {
        self.log_probs[[u.index(), v.index()]]
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.probs
    }
}

/// Trigram transition probabilities, a `[L][L][L]` tensor
#[derive(Debug, Clone, PartialEq)]
pub struct TrigramTable {
    probs: Array3<f64>,
    log_probs: Array3<f64>,
}

impl TrigramTable {
    pub fn estimate(counts: &TrigramCounts) -> Self {
        let counts = counts.as_array();
        let totals = counts.sum_axis(ndarray::Axis(2));
        let mut probs = Array3::zeros(counts.raw_dim());
        Zip::indexed(&mut probs)
            .and(counts)
            .for_each(|(w, u, _), p, &c| *p = ratio(c, totals[[w, u]]));
        Self {
            log_probs: probs.mapv(log_prob),
            probs,
        }
    }

    #[inline]
    pub fn prob(&self, w: Label, u: Label, v: Label) -> f64 {
        self.probs[[w.index(), u.index(), v.index()]]
    }

    #[inline]
    pub fn log_prob(&self, w: Label, u: Label, v: Label) -> f64 {
        self.log_probs[[w.index(), u.index(), v.index()]]
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.probs
    }
}
