use std::fmt;
use std::str::FromStr;

use crate::decode::{self, Path};
use crate::error::{Error, Result};
use crate::model::Model;

/// Markov order used by [`Tagger::tag`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Emission probabilities only
    Zero,
    /// Bigram transitions
    #[default]
    First,
    /// Trigram transitions
    Second,
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0" => Ok(Self::Zero),
            "1" => Ok(Self::First),
            "2" => Ok(Self::Second),
            _ => Err(Error::invalid_argument("order must be 0, 1 or 2")),
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self {
            Self::Zero => 0,
            Self::First => 1,
            Self::Second => 2,
        };
        write!(f, "{}", order)
    }
}

/// Tagger parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerParams {
    order: Order,
    top_m: usize,
}

impl Default for TaggerParams {
    fn default() -> Self {
        Self {
            order: Order::default(),
            top_m: 1,
        }
    }
}

impl TaggerParams {
    pub fn order(&self) -> Order {
        self.order
    }

    pub fn set_order(&mut self, order: Order) {
        self.order = order;
    }

    pub fn top_m(&self) -> usize {
        self.top_m
    }

    pub fn set_top_m(&mut self, top_m: usize) -> Result<()> {
        if top_m == 0 {
            return Err(Error::invalid_argument("top_m must be positive"));
        }
        self.top_m = top_m;
        Ok(())
    }
}

/// The tagger predicts label sequences for input sequences using a model
#[derive(Debug, Clone)]
pub struct Tagger<'a> {
    model: &'a Model,
    params: TaggerParams,
}

impl<'a> Tagger<'a> {
    pub(crate) fn new(model: &'a Model) -> Self {
        Self {
            model,
            params: TaggerParams::default(),
        }
    }

    /// Set a parameter by name: `order` (0, 1 or 2) or `top_m` (positive)
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "order" => self.params.set_order(value.parse()?),
            "top_m" => {
                let top_m = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::invalid_argument("top_m must be positive"))?;
                self.params.set_top_m(top_m)?;
            }
            _ => {
                return Err(Error::invalid_argument(format!(
                    "unknown parameter: {}",
                    name
                )))
            }
        }
        Ok(())
    }

    /// Get a parameter value by name
    pub fn get(&self, name: &str) -> Result<String> {
        match name {
            "order" => Ok(self.params.order.to_string()),
            "top_m" => Ok(self.params.top_m.to_string()),
            _ => Err(Error::invalid_argument(format!(
                "unknown parameter: {}",
                name
            ))),
        }
    }

    /// Set the Markov order (builder pattern)
    pub fn with_order(mut self, order: Order) -> Self {
        self.params.set_order(order);
        self
    }

    /// Set the number of paths returned by [`Tagger::tag_top_m`] (builder pattern)
    pub fn with_top_m(mut self, top_m: usize) -> Result<Self> {
        self.params.set_top_m(top_m)?;
        Ok(self)
    }

    pub fn params(&self) -> &TaggerParams {
        &self.params
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    /// Decode the best sentinel-inclusive path with the configured order
    pub fn decode<S: AsRef<str>>(&self, xseq: &[S]) -> Result<Path> {
        match self.params.order {
            Order::Zero => decode::emission_only(self.model, xseq),
            Order::First => decode::viterbi(self.model, xseq),
            Order::Second => decode::second_order_viterbi(self.model, xseq),
        }
    }

    /// Predict the label sequence for the item sequence.
    pub fn tag<S: AsRef<str>>(&self, xseq: &[S]) -> Result<Vec<&'a str>> {
        let path = self.decode(xseq)?;
        Ok(self.names(&path))
    }

    /// Predict up to `top_m` label sequences, best first, with their log-scores
    ///
    /// Always uses bigram transitions regardless of the configured order.
    pub fn tag_top_m<S: AsRef<str>>(&self, xseq: &[S]) -> Result<Vec<(f64, Vec<&'a str>)>> {
        let paths = decode::top_m_viterbi(self.model, self.params.top_m, xseq)?;
        Ok(paths
            .iter()
            .map(|path| (path.score, self.names(path)))
            .collect())
    }

    fn names(&self, path: &Path) -> Vec<&'a str> {
        let labels = self.model.labels();
        path.tokens().iter().map(|&label| labels.name(label)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::LabelSet;
    use crate::train::Trainer;

    fn model() -> Model {
        let labels = LabelSet::new(["sunny", "rainy"]).unwrap();
        let mut trainer = Trainer::new(labels);
        trainer
            .append(&["walk", "shop", "clean"], &["sunny", "sunny", "rainy"])
            .unwrap();
        trainer.append(&["clean", "walk"], &["rainy", "sunny"]).unwrap();
        trainer.train()
    }

    #[test]
    fn test_tagger_defaults() {
        let model = model();
        let tagger = model.tagger();
        assert_eq!(tagger.params(), &TaggerParams::default());
        assert_eq!(tagger.get("order").unwrap(), "1");
        assert_eq!(tagger.get("top_m").unwrap(), "1");
        assert!(tagger.get("c1").is_err());
    }

    #[test]
    fn test_tag_trims_sentinels() {
        let model = model();
        let mut tagger = model.tagger();
        for order in ["0", "1", "2"] {
            tagger.set("order", order).unwrap();
            let labels = tagger.tag(&["walk", "shop", "clean"]).unwrap();
            assert_eq!(labels, ["sunny", "sunny", "rainy"]);
        }
    }

    #[test]
    fn test_tag_top_m() {
        let model = model();
        let tagger = model.tagger().with_top_m(3).unwrap();
        let results = tagger.tag_top_m(&["walk", "clean"]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, ["sunny", "rainy"]);
        assert!(results[0].0 >= results[1].0);
        assert!(results[1].0 >= results[2].0);
    }

    #[test]
    fn test_order_parse() {
        assert_eq!("0".parse::<Order>().unwrap(), Order::Zero);
        assert_eq!(" 2 ".parse::<Order>().unwrap(), Order::Second);
        let err = "3".parse::<Order>().unwrap_err();
        assert_eq!(err.to_string(), "order must be 0, 1 or 2");
        assert_eq!(Order::First.to_string(), "1");
    }
}
