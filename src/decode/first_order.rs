use ndarray::Array2;

use super::Path;
use crate::error::Result;
use crate::label::Label;
use crate::params::log_prob;
use crate::Model;

/// Work space of the first-order Viterbi algorithm
#[derive(Debug, Clone)]
struct Context {
    /// Score matrix
    ///
    /// This is a `[T][L]` matrix whose element `[t][l]` holds the best
    /// log-score of a path starting at `START` and arriving at (t, l).
    score: Array2<f64>,
    /// Backward edges
    ///
    /// This is a `[T][L]` matrix whose element `[t][j]` holds the label #i
    /// that yields the maximum score to arrive at (t, j).
    backward_edge: Array2<u32>,
}

impl Context {
    fn new(num_labels: usize, num_items: usize) -> Self {
        Self {
            score: Array2::from_elem((num_items, num_labels), log_prob(0.0)),
            backward_edge: Array2::zeros((num_items, num_labels)),
        }
    }

    fn viterbi(&mut self, model: &Model, obs: &[Option<u32>]) -> Path {
        let labels = model.labels();
        let trans = model.transitions();
        let emit = model.emissions();
        let t = obs.len();

        // Compute the scores at (0, *)
        for v in labels.domain() {
            self.score[[0, v.index()]] =
                trans.log_prob(Label::START, v) + emit.log_prob(v, obs[0]);
            self.backward_edge[[0, v.index()]] = Label::START.id();
        }

        // Compute the scores at (t, *)
        for time in 1..t {
            for v in labels.domain() {
                let emission = emit.log_prob(v, obs[time]);
                let mut max_score = f64::NEG_INFINITY;
                let mut argmax = Label::START;
                for u in labels.domain() {
                    // Transit from (t-1, u) to (t, v)
                    let score =
                        self.score[[time - 1, u.index()]] + trans.log_prob(u, v) + emission;
                    if max_score < score {
                        max_score = score;
                        argmax = u;
                    }
                }
                self.backward_edge[[time, v.index()]] = argmax.id();
                self.score[[time, v.index()]] = max_score;
            }
        }

        // Find the label at #T that reaches STOP with the maximum score
        let mut max_score = f64::NEG_INFINITY;
        let mut last = Label::START;
        for u in labels.domain() {
            let score = self.score[[t - 1, u.index()]] + trans.log_prob(u, Label::STOP);
            if max_score < score {
                max_score = score;
                last = u;
            }
        }

        // Tag labels by tracing the backward links
        let mut tokens = vec![last; t];
        for time in (0..t - 1).rev() {
            let next = tokens[time + 1];
            tokens[time] = Label::new(self.backward_edge[[time + 1, next.index()]]);
        }
        Path::new(max_score, tokens)
    }
}

/// Most probable label path under the bigram model
///
/// Fails with [`Error::EmptySequence`](crate::Error::EmptySequence) for an
/// empty input.
pub fn viterbi<S: AsRef<str>>(model: &Model, xseq: &[S]) -> Result<Path> {
    let obs = model.observe(xseq)?;
    let mut context = Context::new(model.labels().len(), obs.len());
    Ok(context.viterbi(model, &obs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelSet;
    use crate::train::Trainer;
    use crate::Error;

    fn weather_model() -> Model {
        let labels = LabelSet::new(["sunny", "rainy"]).unwrap();
        let mut trainer = Trainer::new(labels);
        trainer
            .append(&["walk", "walk", "shop"], &["sunny", "sunny", "rainy"])
            .unwrap();
        trainer
            .append(&["clean", "clean"], &["rainy", "rainy"])
            .unwrap();
        trainer.append(&["walk"], &["sunny"]).unwrap();
        trainer.train()
    }

    #[test]
    fn test_viterbi_follows_emissions() {
        let model = weather_model();
        let path = viterbi(&model, &["walk", "walk", "shop"]).unwrap();
        assert_eq!(
            path.names(model.labels()),
            ["START", "sunny", "sunny", "rainy", "STOP"]
        );
        assert!(path.score < 0.0);
        assert!(path.score > log_prob(0.0));
    }

    #[test]
    fn test_viterbi_single_token() {
        let model = weather_model();
        let path = viterbi(&model, &["clean"]).unwrap();
        assert_eq!(path.names(model.labels()), ["START", "rainy", "STOP"]);
    }

    #[test]
    fn test_viterbi_empty_sequence() {
        let model = weather_model();
        let err = viterbi::<&str>(&model, &[]).unwrap_err();
        assert!(matches!(err, Error::EmptySequence));
    }

    #[test]
    fn test_viterbi_is_deterministic() {
        let model = weather_model();
        let xseq = ["walk", "unknown", "clean", "walk"];
        let first = viterbi(&model, &xseq).unwrap();
        let second = viterbi(&model, &xseq).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.labels.len(), xseq.len() + 2);
    }

    /// Both orders of `X` and `Y` over the same word, so whole paths tie
    fn symmetric_model() -> Model {
        let labels = LabelSet::new(["X", "Y"]).unwrap();
        let mut trainer = Trainer::new(labels);
        trainer.append(&["a", "a"], &["X", "Y"]).unwrap();
        trainer.append(&["a", "a"], &["Y", "X"]).unwrap();
        trainer.train()
    }

    #[test]
    fn test_viterbi_tie_break() {
        let model = symmetric_model();
        // X wins the tie into STOP, then Y is the first predecessor reaching X
        let path = viterbi(&model, &["a", "a"]).unwrap();
        assert_eq!(path.names(model.labels()), ["START", "Y", "X", "STOP"]);
        let expected = 3.0 * 0.5f64.ln() + 2.0 * (2.0f64 / 3.0).ln();
        assert!((path.score - expected).abs() < 1e-12);
    }
}
