use super::Path;
use crate::error::Result;
use crate::label::Label;
use crate::Model;

/// Label every token with its most probable emitting label, ignoring transitions
///
/// The score is the sum of the chosen log emission probabilities.
pub fn emission_only<S: AsRef<str>>(model: &Model, xseq: &[S]) -> Result<Path> {
    let obs = model.observe(xseq)?;
    let emit = model.emissions();
    let mut score = 0.0;
    let mut tokens = Vec::with_capacity(obs.len());
    for &wid in &obs {
        let mut max_score = f64::NEG_INFINITY;
        let mut argmax = Label::START;
        for v in model.labels().domain() {
            let s = emit.log_prob(v, wid);
            if max_score < s {
                max_score = s;
                argmax = v;
            }
        }
        score += max_score;
        tokens.push(argmax);
    }
    Ok(Path::new(score, tokens))
}
