use std::collections::HashSet;

use ndarray::Array2;

use super::Path;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::Model;

/// One of the M best partial paths arriving at a lattice node
#[derive(Debug, Clone, Copy)]
struct Hypothesis {
    score: f64,
    /// Label at the previous position
    prev: Label,
    /// Rank of the extended hypothesis among those of `prev`
    rank: usize,
}

/// Work space of the M-best Viterbi algorithm
#[derive(Debug, Clone)]
struct Context {
    m: usize,
    /// `[T][L]` lattice, each node holding up to `m` hypotheses sorted by
    /// descending score
    beams: Array2<Vec<Hypothesis>>,
}

impl Context {
    fn new(m: usize, num_labels: usize, num_items: usize) -> Self {
        Self {
            m,
            beams: Array2::from_elem((num_items, num_labels), Vec::new()),
        }
    }

    /// Keep the `m` best candidates; equal scores keep their generation order
    fn prune(&self, candidates: &mut Vec<Hypothesis>) {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(self.m);
    }

    fn decode(&mut self, model: &Model, obs: &[Option<u32>]) -> Vec<Path> {
        let labels = model.labels();
        let trans = model.transitions();
        let emit = model.emissions();
        let t = obs.len();

        for v in labels.domain() {
            self.beams[[0, v.index()]] = vec![Hypothesis {
                score: trans.log_prob(Label::START, v) + emit.log_prob(v, obs[0]),
                prev: Label::START,
                rank: 0,
            }];
        }

        let mut candidates = Vec::new();
        for time in 1..t {
            for v in labels.domain() {
                let emission = emit.log_prob(v, obs[time]);
                candidates.clear();
                for u in labels.domain() {
                    let edge = trans.log_prob(u, v);
                    for (rank, hyp) in self.beams[[time - 1, u.index()]].iter().enumerate() {
                        candidates.push(Hypothesis {
                            score: hyp.score + edge + emission,
                            prev: u,
                            rank,
                        });
                    }
                }
                self.prune(&mut candidates);
                self.beams[[time, v.index()]] = candidates.clone();
            }
        }

        candidates.clear();
        for u in labels.domain() {
            let edge = trans.log_prob(u, Label::STOP);
            for (rank, hyp) in self.beams[[t - 1, u.index()]].iter().enumerate() {
                candidates.push(Hypothesis {
                    score: hyp.score + edge,
                    prev: u,
                    rank,
                });
            }
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut seen = HashSet::new();
        let mut paths = Vec::with_capacity(self.m);
        for candidate in &candidates {
            let tokens = self.backtrack(t, candidate);
            if seen.insert(tokens.clone()) {
                paths.push(Path::new(candidate.score, tokens));
                if paths.len() == self.m {
                    break;
                }
            }
        }
        paths
    }

    /// Follow the rank backpointers from a final hypothesis
    fn backtrack(&self, t: usize, last: &Hypothesis) -> Vec<Label> {
        let mut tokens = vec![last.prev; t];
        let mut hyp = self.beams[[t - 1, last.prev.index()]][last.rank];
        for time in (1..t).rev() {
            tokens[time - 1] = hyp.prev;
            hyp = self.beams[[time - 1, hyp.prev.index()]][hyp.rank];
        }
        tokens
    }
}

/// The `m` most probable distinct label paths under the bigram model, best first
///
/// Fewer than `m` paths are returned when the lattice holds fewer distinct
/// paths. `m == 0` is an [`Error::InvalidArgument`].
pub fn top_m_viterbi<S: AsRef<str>>(model: &Model, m: usize, xseq: &[S]) -> Result<Vec<Path>> {
    if m == 0 {
        return Err(Error::invalid_argument("top_m must be positive"));
    }
    let obs = model.observe(xseq)?;
    let mut context = Context::new(m, model.labels().len(), obs.len());
    Ok(context.decode(model, &obs))
}
