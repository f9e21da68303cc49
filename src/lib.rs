//! Hidden Markov Model sequence labeling
//!
//! This library estimates emission and transition probabilities from a
//! labeled token corpus and decodes label sequences for new token sequences
//! with first-order, second-order and M-best Viterbi decoders.
//!
//! # Examples
//!
//! ## Training
//!
//! ```
//! use hmms::{LabelSet, Trainer};
//!
//! let labels = LabelSet::bio(["positive", "neutral", "negative"])?;
//! let mut trainer = Trainer::new(labels);
//! trainer.read(&b"The O\nfood B-positive\nrocks I-positive\n\nmeh B-neutral\n"[..])?;
//! trainer.append(&["nice", "place"], &["B-positive", "O"])?;
//!
//! let model = trainer.train();
//! assert_eq!(model.emission_probability("O", "The")?, 1.0 / 3.0);
//! # Ok::<(), hmms::Error>(())
//! ```
//!
//! ## Prediction
//!
//! ```no_run
//! use hmms::Model;
//!
//! let model_data = std::fs::read("model.hmm")?;
//! let model = Model::new(&model_data)?;
//! let mut tagger = model.tagger();
//! tagger.set("order", "2")?;
//!
//! let labels = tagger.tag(&["great", "pizza"])?;
//! # Ok::<(), hmms::Error>(())
//! ```

mod counts;
mod dictionary;
mod error;
mod label;
mod model;
mod model_writer;
mod params;
mod tagger;

/// Corpus and observation readers
pub mod dataset;
/// Viterbi decoders
pub mod decode;
/// Training module turning labeled sequences into models
pub mod train;

// Re-export main types
pub use self::counts::{
    CorpusCounter, Counts, EmissionCounts, Flag, TransitionCounts, TrigramCounts,
};
pub use self::decode::Path;
pub use self::dictionary::Dictionary;
pub use self::error::{Error, Result};
pub use self::label::{Label, LabelSet, START, STOP};
pub use self::model::Model;
pub use self::params::{
    emission_probability, log_prob, EmissionTable, TransitionTable, TrigramTable,
};
pub use self::tagger::{Order, Tagger, TaggerParams};

// Re-export training types for convenience
pub use self::train::Trainer;
