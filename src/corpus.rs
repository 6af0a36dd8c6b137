//! Numeric-token corpus model and its plain-text reader/writer.
//!
//! The on-disk format is a header line `<n_sentences> <vocabulary_size>`
//! followed by one length-prefixed row of 0-based token ids per sentence.
//! Internally every id is shifted up by one so that id 0 can serve as the
//! NULL word; an empty row (`0`) becomes `None` and marks its sentence pair
//! as skipped.  Parsing is whitespace-insensitive but tracks line numbers so
//! format errors point at the offending input line.

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};

use crate::{Token, MAX_SENT_LEN};

/// One sentence: internal token ids, each in `[1, vocabulary_size)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence {
    tokens: Vec<Token>,
}

impl Sentence {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One side of a parallel corpus.
#[derive(Clone, Debug)]
pub struct Corpus {
    name: String,
    /// Internal vocabulary size: user vocabulary + 1 for the NULL word.
    vocabulary_size: Token,
    sentences: Vec<Option<Sentence>>,
}

impl Corpus {
    /// Builds a corpus from user-id sentences (`None` = empty sentence).
    /// Used programmatically; file input goes through [`Corpus::read`].
    pub fn from_sentences(
        name: &str,
        user_vocabulary_size: Token,
        sentences: Vec<Option<Vec<Token>>>,
    ) -> Result<Corpus> {
        let mut shifted = Vec::with_capacity(sentences.len());
        for (i, sentence) in sentences.into_iter().enumerate() {
            match sentence {
                None => shifted.push(None),
                // a zero-length sentence is the same as an absent one
                Some(tokens) if tokens.is_empty() => shifted.push(None),
                Some(tokens) => {
                    if tokens.len() > MAX_SENT_LEN {
                        bail!("{}: sentence {} is too long ({} tokens)", name, i + 1, tokens.len());
                    }
                    if let Some(&t) = tokens.iter().find(|&&t| t >= user_vocabulary_size) {
                        bail!(
                            "{}: vocabulary size is {} but sentence {} holds token {}",
                            name,
                            user_vocabulary_size,
                            i + 1,
                            t
                        );
                    }
                    shifted.push(Some(Sentence {
                        tokens: tokens.iter().map(|&t| t + 1).collect(),
                    }));
                }
            }
        }
        Ok(Corpus {
            name: name.to_owned(),
            vocabulary_size: user_vocabulary_size + 1,
            sentences: shifted,
        })
    }

    /// Reads one corpus from `input`.  `name` is used in error messages.
    pub fn read(name: &str, input: impl Read) -> Result<Corpus> {
        let mut text = String::new();
        let mut input = input;
        input
            .read_to_string(&mut text)
            .with_context(|| format!("{name}: failed to read input"))?;
        let mut scanner = Scanner::new(&text);
        Self::read_from(name, &mut scanner)
    }

    /// Reads two corpora back to back from the same stream (the layout used
    /// when both sides arrive concatenated on stdin).
    pub fn read_pair(
        source_name: &str,
        target_name: &str,
        input: impl Read,
    ) -> Result<(Corpus, Corpus)> {
        let mut text = String::new();
        let mut input = input;
        input
            .read_to_string(&mut text)
            .with_context(|| format!("{source_name}: failed to read input"))?;
        let mut scanner = Scanner::new(&text);
        let source = Self::read_from(source_name, &mut scanner)?;
        let target = Self::read_from(target_name, &mut scanner)?;
        Ok((source, target))
    }

    fn read_from(name: &str, scanner: &mut Scanner<'_>) -> Result<Corpus> {
        let n_sentences: usize = scanner
            .parse(name, "sentence count")
            .context("failed to read header")?;
        let user_vocab: Token = scanner
            .parse(name, "vocabulary size")
            .context("failed to read header")?;

        let mut sentences = Vec::with_capacity(n_sentences);
        for _ in 0..n_sentences {
            let length: usize = scanner.parse(name, "sentence length")?;
            if length == 0 {
                sentences.push(None);
                continue;
            }
            if length > MAX_SENT_LEN {
                bail!(
                    "{}: line {}: sentence length {} exceeds the maximum of {}",
                    name,
                    scanner.line(),
                    length,
                    MAX_SENT_LEN
                );
            }
            let mut tokens = Vec::with_capacity(length);
            for _ in 0..length {
                let t: Token = scanner.parse(name, "token id")?;
                if t >= user_vocab {
                    bail!(
                        "{}: line {}: vocabulary size is {} but found token {}",
                        name,
                        scanner.line(),
                        user_vocab,
                        t
                    );
                }
                tokens.push(t + 1);
            }
            sentences.push(Some(Sentence { tokens }));
        }
        Ok(Corpus {
            name: name.to_owned(),
            vocabulary_size: user_vocab + 1,
            sentences,
        })
    }

    /// Writes the corpus back in the input format (0-based user ids).
    pub fn write(&self, mut w: impl Write) -> std::io::Result<()> {
        writeln!(w, "{} {}", self.sentences.len(), self.vocabulary_size - 1)?;
        for sentence in &self.sentences {
            match sentence {
                None => writeln!(w, "0")?,
                Some(s) => {
                    write!(w, "{}", s.len())?;
                    for &t in s.tokens() {
                        write!(w, " {}", t - 1)?;
                    }
                    writeln!(w)?;
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal vocabulary size (user size + 1 for the NULL word).
    pub fn vocabulary_size(&self) -> Token {
        self.vocabulary_size
    }

    pub fn n_sentences(&self) -> usize {
        self.sentences.len()
    }

    /// The `i`-th sentence, or `None` when it is empty.
    pub fn sentence(&self, i: usize) -> Option<&Sentence> {
        self.sentences[i].as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Whitespace tokenizer with line tracking
// ─────────────────────────────────────────────────────────────────────────────

struct Scanner<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner { rest: text, line: 1 }
    }

    /// Line number of the most recently returned token.
    fn line(&self) -> usize {
        self.line
    }

    fn next_token(&mut self) -> Option<&'a str> {
        let mut chars = self.rest.char_indices();
        let start = loop {
            match chars.next() {
                Some((_, '\n')) => self.line += 1,
                Some((i, c)) if !c.is_whitespace() => break i,
                Some(_) => {}
                None => {
                    self.rest = "";
                    return None;
                }
            }
        };
        let end = self.rest[start..]
            .find(char::is_whitespace)
            .map(|off| start + off)
            .unwrap_or(self.rest.len());
        let token = &self.rest[start..end];
        self.rest = &self.rest[end..];
        Some(token)
    }

    fn parse<T: std::str::FromStr>(&mut self, file: &str, what: &str) -> Result<T> {
        let line = self.line;
        match self.next_token() {
            None => bail!("{}: line {}: missing {}", file, line, what),
            Some(tok) => tok
                .parse()
                .map_err(|_| anyhow::anyhow!("{}: line {}: bad {} {:?}", file, self.line, what, tok)),
        }
    }
}
