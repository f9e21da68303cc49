//! Decoders over a trained [`Model`](crate::Model)
//!
//! All decoders work in log-space and return sentinel-inclusive [`Path`]s:
//! a sequence of `n` tokens yields `n + 2` labels starting with `START` and
//! ending with `STOP`. Only domain labels are emitting states.
//!
//! Whenever several candidates share the maximum score, the first one in
//! label enumeration order wins. The rule applies to every backpointer on
//! its own, starting from the transition into `STOP`, so among equally
//! scored paths the winner is not necessarily the lexicographically first
//! one. The M-best decoder keeps equal scores in generation order.

mod emission;
mod first_order;
mod second_order;
mod top_m;

pub use self::emission::emission_only;
pub use self::first_order::viterbi;
pub use self::second_order::second_order_viterbi;
pub use self::top_m::top_m_viterbi;

use crate::label::{Label, LabelSet};

/// A decoded label sequence with its total log-score
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Log-probability of the path, including the final transition to `STOP`
    pub score: f64,
    /// Labels from `START` to `STOP`
    pub labels: Vec<Label>,
}

impl Path {
    fn new(score: f64, tokens: Vec<Label>) -> Self {
        let mut labels = Vec::with_capacity(tokens.len() + 2);
        labels.push(Label::START);
        labels.extend(tokens);
        labels.push(Label::STOP);
        Self { score, labels }
    }

    /// Labels of the tokens, sentinels excluded
    pub fn tokens(&self) -> &[Label] {
        &self.labels[1..self.labels.len() - 1]
    }

    /// Label names from `START` to `STOP`
    pub fn names<'a>(&self, labels: &'a LabelSet) -> Vec<&'a str> {
        self.labels.iter().map(|&label| labels.name(label)).collect()
    }
}
