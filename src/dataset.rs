//! Line-oriented corpus formats
//!
//! Labeled corpora hold one `<word> <label>` pair per line, unlabeled input
//! holds one word per line. In both, a line containing only whitespace ends
//! the current sequence.
use std::io::Read;

use bstr::ByteSlice;

use crate::error::{Error, Result};

/// A parsed line of a labeled corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A token with its label name
    Token { word: &'a str, label: &'a str },
    /// A sequence delimiter
    Boundary,
}

/// Iterate over the lines of a labeled corpus together with their 1-based line numbers
pub fn labeled_lines(buf: &[u8]) -> impl Iterator<Item = Result<(usize, Line<'_>)>> {
    buf.lines().enumerate().map(|(i, line)| {
        let lineno = i + 1;
        parse_labeled_line(lineno, line).map(|line| (lineno, line))
    })
}

fn parse_labeled_line(lineno: usize, line: &[u8]) -> Result<Line<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Boundary);
    }
    let line = line
        .to_str()
        .map_err(|_| Error::parse(lineno, "invalid UTF-8"))?;
    match line.split_once(' ') {
        Some((word, label)) if !word.is_empty() && !label.is_empty() && !label.contains(' ') => {
            Ok(Line::Token { word, label })
        }
        _ => Err(Error::parse(
            lineno,
            format!("expected `<word> <label>`, got {:?}", line),
        )),
    }
}

/// Split unlabeled input into observation sequences
///
/// Every non-blank line is one word (surrounding whitespace removed). Runs of
/// blank lines, as well as leading and trailing ones, never produce empty
/// sequences, and the last sequence is kept even without a trailing blank line.
pub fn split_sequences(buf: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut sequences = Vec::new();
    let mut seq = Vec::new();
    for (i, line) in buf.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            if !seq.is_empty() {
                sequences.push(std::mem::take(&mut seq));
            }
            continue;
        }
        let word = line
            .to_str()
            .map_err(|_| Error::parse(i + 1, "invalid UTF-8"))?;
        seq.push(word.to_string());
    }
    if !seq.is_empty() {
        sequences.push(seq);
    }
    Ok(sequences)
}

/// Read all observation sequences from a reader, see [`split_sequences`]
pub fn read_sequences<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    split_sequences(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_lines() {
        let corpus = b"A B-neutral\r\nB I-neutral\n   \nC O\n";
        let lines: Vec<_> = labeled_lines(corpus).collect::<Result<_>>().unwrap();
        assert_eq!(
            lines,
            vec![
                (
                    1,
                    Line::Token {
                        word: "A",
                        label: "B-neutral"
                    }
                ),
                (
                    2,
                    Line::Token {
                        word: "B",
                        label: "I-neutral"
                    }
                ),
                (3, Line::Boundary),
                (4, Line::Token { word: "C", label: "O" }),
            ]
        );
    }

    #[test]
    fn test_malformed_labeled_lines() {
        for (corpus, line) in [
            (&b"A O\nB\n"[..], 2),
            (&b"A O extra\n"[..], 1),
            (&b"\n\nA  O\n"[..], 3),
            (&b"A\tO\n"[..], 1),
            (&b"A O\n\xff O\n"[..], 2),
        ] {
            let err = labeled_lines(corpus)
                .collect::<Result<Vec<_>>>()
                .unwrap_err();
            match err {
                Error::Parse { line: l, .. } => assert_eq!(l, line),
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_split_sequences() {
        let input = b"\n\nA\nB\n\n\n\nC \n D\n\n";
        let seqs = split_sequences(input).unwrap();
        assert_eq!(seqs, vec![vec!["A", "B"], vec!["C", "D"]]);
    }

    #[test]
    fn test_split_sequences_flushes_last_sequence() {
        let seqs = split_sequences(b"A\nB\n\nC").unwrap();
        assert_eq!(seqs, vec![vec!["A", "B"], vec!["C"]]);

        assert!(split_sequences(b"").unwrap().is_empty());
        assert!(split_sequences(b"\n \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn test_read_sequences() {
        let input: &[u8] = b"A\nB\nC\nC\n";
        let seqs = read_sequences(input).unwrap();
        assert_eq!(seqs, vec![vec!["A", "B", "C", "C"]]);
    }
}
