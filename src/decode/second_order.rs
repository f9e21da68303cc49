use ndarray::{Array1, Array3};

use super::Path;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::params::log_prob;
use crate::Model;

/// Work space of the second-order Viterbi algorithm
///
/// States are pairs `(u, v)` of the two most recent labels.
#[derive(Debug, Clone)]
struct Context {
    /// `[L]` scores of the first position, `START` being its predecessor
    base: Array1<f64>,
    /// `[T][L][L]` tensor whose element `[t][u][v]` holds the best log-score
    /// of a path with label `u` at `t - 1` and `v` at `t`
    score: Array3<f64>,
    /// `[T][L][L]` tensor whose element `[t][u][v]` holds the label at `t - 2`
    /// on the best path arriving at `[t][u][v]`
    backward_edge: Array3<u32>,
}

impl Context {
    fn new(num_labels: usize, num_items: usize) -> Self {
        Self {
            base: Array1::from_elem(num_labels, log_prob(0.0)),
            score: Array3::from_elem((num_items, num_labels, num_labels), log_prob(0.0)),
            backward_edge: Array3::zeros((num_items, num_labels, num_labels)),
        }
    }

    fn viterbi(&mut self, model: &Model, obs: &[Option<u32>]) -> Result<Path> {
        let labels = model.labels();
        let bigrams = model.transitions();
        let trigrams = model.trigrams().ok_or_else(|| {
            Error::invalid_argument("second-order decoding requires trigram transitions")
        })?;
        let emit = model.emissions();
        let t = obs.len();

        for v in labels.domain() {
            self.base[v.index()] = bigrams.log_prob(Label::START, v) + emit.log_prob(v, obs[0]);
        }

        if t == 1 {
            // No pair state exists; close the single label with a bigram
            let mut max_score = f64::NEG_INFINITY;
            let mut last = Label::START;
            for v in labels.domain() {
                let score = self.base[v.index()] + bigrams.log_prob(v, Label::STOP);
                if max_score < score {
                    max_score = score;
                    last = v;
                }
            }
            return Ok(Path::new(max_score, vec![last]));
        }

        // Pairs at (1, *, *) extend START -> u
        for u in labels.domain() {
            for v in labels.domain() {
                self.score[[1, u.index(), v.index()]] = self.base[u.index()]
                    + trigrams.log_prob(Label::START, u, v)
                    + emit.log_prob(v, obs[1]);
            }
        }

        for time in 2..t {
            for u in labels.domain() {
                for v in labels.domain() {
                    let emission = emit.log_prob(v, obs[time]);
                    let mut max_score = f64::NEG_INFINITY;
                    let mut argmax = Label::START;
                    for w in labels.domain() {
                        // Transit from (t-1, w, u) to (t, u, v)
                        let score = self.score[[time - 1, w.index(), u.index()]]
                            + trigrams.log_prob(w, u, v)
                            + emission;
                        if max_score < score {
                            max_score = score;
                            argmax = w;
                        }
                    }
                    self.score[[time, u.index(), v.index()]] = max_score;
                    self.backward_edge[[time, u.index(), v.index()]] = argmax.id();
                }
            }
        }

        let mut max_score = f64::NEG_INFINITY;
        let mut last = (Label::START, Label::START);
        for u in labels.domain() {
            for v in labels.domain() {
                let score =
                    self.score[[t - 1, u.index(), v.index()]] + trigrams.log_prob(u, v, Label::STOP);
                if max_score < score {
                    max_score = score;
                    last = (u, v);
                }
            }
        }

        let mut tokens = vec![Label::START; t];
        tokens[t - 2] = last.0;
        tokens[t - 1] = last.1;
        for time in (2..t).rev() {
            let (u, v) = (tokens[time - 1], tokens[time]);
            tokens[time - 2] = Label::new(self.backward_edge[[time, u.index(), v.index()]]);
        }
        Ok(Path::new(max_score, tokens))
    }
}

/// Most probable label path under the trigram model
///
/// The model must have been trained with [`Flag::TRIGRAM`](crate::Flag::TRIGRAM),
/// otherwise this fails with [`Error::InvalidArgument`].
pub fn second_order_viterbi<S: AsRef<str>>(model: &Model, xseq: &[S]) -> Result<Path> {
    let obs = model.observe(xseq)?;
    let mut context = Context::new(model.labels().len(), obs.len());
    context.viterbi(model, &obs)
}
