//! Alignment state: per-sentence link vectors plus the sufficient statistics
//! the Gibbs kernel maintains over them.
//!
//! One [`Alignment`] covers one direction of one corpus pair.  It owns a
//! contiguous arena of link values indexed per sentence, one lexical
//! [`CountMap`] per source word type, the cached inverse of each type's
//! smoothed count total, the jump histogram, the fertility table, and any
//! loaded prior tables.  The statistics are updated in place by the kernel
//! in `sample.rs` and can be rebuilt from scratch with
//! [`Alignment::make_counts`].

mod counts;
mod output;
mod priors;
mod sample;

pub use output::write_scores;
pub use sample::sample_consensus;

use anyhow::{bail, Result};

use crate::corpus::{Corpus, Sentence};
use crate::countmap::CountMap;
use crate::random::Rng;
use crate::{Count, Link, Token, FERT_ARRAY_LEN, JUMP_ARRAY_LEN, NULL_LINK};

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

/// The three nested alignment models, in training order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Model {
    /// Lexical translation probabilities only.
    Lexical = 1,
    /// Lexical + position-jump (HMM-style reordering) statistics.
    Hmm = 2,
    /// Lexical + jumps + per-word fertility distributions.
    Fertility = 3,
}

impl Model {
    /// Maps the CLI numbering (1, 2, 3) onto a model.
    pub fn from_index(n: u32) -> Option<Model> {
        match n {
            1 => Some(Model::Lexical),
            2 => Some(Model::Hmm),
            3 => Some(Model::Fertility),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    #[inline]
    pub(crate) fn uses_jumps(self) -> bool {
        self >= Model::Hmm
    }

    #[inline]
    pub(crate) fn uses_fertility(self) -> bool {
        self >= Model::Fertility
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Index helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Histogram slot for a jump from source position `from` to `to`, clipped
/// into the table.
#[inline]
pub(crate) fn jump_index(from: i32, to: i32) -> usize {
    (to - from + JUMP_ARRAY_LEN as i32 / 2).clamp(0, JUMP_ARRAY_LEN as i32 - 1) as usize
}

/// Fertility-table slot for word `e` with fertility `fert` (clipped at the
/// last slot).
#[inline]
pub(crate) fn fert_index(e: Token, fert: i32) -> usize {
    debug_assert!(fert >= 0);
    e as usize * FERT_ARRAY_LEN + (fert as usize).min(FERT_ARRAY_LEN - 1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Alignment state
// ─────────────────────────────────────────────────────────────────────────────

/// Link assignments and sufficient statistics for one corpus pair in one
/// direction.
#[derive(Clone, Debug)]
pub struct Alignment<'a> {
    model: Model,
    source: &'a Corpus,
    target: &'a Corpus,
    /// Arena of link values, one contiguous run per aligned sentence pair.
    links: Vec<Link>,
    /// Start of each sentence's run in `links`; `None` for skipped pairs.
    offsets: Vec<Option<usize>>,
    /// Lexical prior mass per (source, target) type pair, stored as f32 bits.
    source_prior: Option<Vec<CountMap>>,
    /// Per-source-type prior total, pre-seeded with the symmetric smoothing.
    source_prior_sum: Option<Vec<Count>>,
    jump_prior: Option<Vec<Count>>,
    fert_prior: Option<Vec<Count>>,
    /// n(e, f): active co-occurrence counts, one map per source type.
    source_count: Vec<CountMap>,
    /// 1 / (Σ_f n(e, f) + smoothing), kept in lockstep with `source_count`.
    inv_source_count_sum: Vec<Count>,
    /// Jump histogram; the final slot caches the smoothed normaliser.
    jump_counts: Vec<Count>,
    /// Fertility statistics, FERT_ARRAY_LEN slots per source type.  Between
    /// sweeps this holds the sampled ratio table (see `sample.rs`).
    fert_counts: Vec<Count>,
    /// Sentences at index ≥ this bound are aligned but do not contribute to
    /// the statistics; 0 means every sentence is trusted.
    n_clean: usize,
    null_prior: Count,
}

impl<'a> Alignment<'a> {
    /// Creates the state for one direction of a corpus pair.  Links start
    /// out all-NULL; call [`Alignment::randomize`] before sampling.
    pub fn new(source: &'a Corpus, target: &'a Corpus, null_prior: Count) -> Result<Alignment<'a>> {
        if source.n_sentences() != target.n_sentences() {
            bail!(
                "number of sentences differ: {} has {} but {} has {}",
                source.name(),
                source.n_sentences(),
                target.name(),
                target.n_sentences()
            );
        }
        let mut offsets = Vec::with_capacity(target.n_sentences());
        let mut arena_len = 0usize;
        for i in 0..target.n_sentences() {
            match (source.sentence(i), target.sentence(i)) {
                (Some(_), Some(t)) => {
                    offsets.push(Some(arena_len));
                    arena_len += t.len();
                }
                _ => offsets.push(None),
            }
        }
        let vocab = source.vocabulary_size() as usize;
        Ok(Alignment {
            model: Model::Lexical,
            source,
            target,
            links: vec![NULL_LINK; arena_len],
            offsets,
            source_prior: None,
            source_prior_sum: None,
            jump_prior: None,
            fert_prior: None,
            source_count: vec![CountMap::new(); vocab],
            inv_source_count_sum: vec![0.0; vocab],
            jump_counts: vec![0.0; JUMP_ARRAY_LEN],
            fert_counts: vec![0.0; vocab * FERT_ARRAY_LEN],
            n_clean: 0,
            null_prior,
        })
    }

    /// Draws an initial assignment: each target position is NULL with
    /// probability `null_prior`, otherwise uniform over the source sentence.
    pub fn randomize(&mut self, rng: &mut Rng) {
        for sent in 0..self.offsets.len() {
            let Some(offset) = self.offsets[sent] else { continue };
            let source_length = self.source.sentence(sent).map_or(0, Sentence::len) as u32;
            let target_length = self.target.sentence(sent).map_or(0, Sentence::len);
            for link in &mut self.links[offset..offset + target_length] {
                *link = if rng.uniform32() < self.null_prior {
                    NULL_LINK
                } else {
                    rng.uint32_biased(source_length) as Link
                };
            }
        }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// Restricts statistics updates to the first `n` sentences (0 = all).
    /// Later sentences are still aligned each sweep.
    pub fn set_clean_limit(&mut self, n: usize) {
        self.n_clean = n;
    }

    pub fn source(&self) -> &'a Corpus {
        self.source
    }

    pub fn target(&self) -> &'a Corpus {
        self.target
    }

    pub fn n_sentences(&self) -> usize {
        self.offsets.len()
    }

    /// The link run for sentence `sent`, or `None` for a skipped pair.
    pub fn links(&self, sent: usize) -> Option<&[Link]> {
        let offset = self.offsets[sent]?;
        let target_length = self.target.sentence(sent).map_or(0, Sentence::len);
        Some(&self.links[offset..offset + target_length])
    }

    /// Current co-occurrence count n(e, f).
    pub fn lexical_count(&self, e: Token, f: Token) -> u32 {
        self.source_count[e as usize].get(f).unwrap_or(0)
    }

    /// All non-zero (f, n(e, f)) entries for source type `e`.
    pub fn lexical_entries(&self, e: Token) -> impl Iterator<Item = (Token, u32)> + '_ {
        self.source_count[e as usize].iter()
    }

    pub fn inv_count_sums(&self) -> &[Count] {
        &self.inv_source_count_sum
    }

    pub fn jump_counts(&self) -> &[Count] {
        &self.jump_counts
    }

    pub fn fertility_table(&self) -> &[Count] {
        &self.fert_counts
    }

    /// Index bound below which sentences contribute to the statistics.
    pub(crate) fn clean_bound(&self) -> usize {
        if self.n_clean != 0 {
            self.n_clean
        } else {
            self.target.n_sentences()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_ordering_matches_nesting() {
        assert!(Model::Lexical < Model::Hmm);
        assert!(Model::Hmm < Model::Fertility);
        assert!(!Model::Lexical.uses_jumps());
        assert!(Model::Hmm.uses_jumps());
        assert!(!Model::Hmm.uses_fertility());
        assert!(Model::Fertility.uses_fertility());
    }

    #[test]
    fn jump_index_clips_at_both_ends() {
        let mid = JUMP_ARRAY_LEN as i32 / 2;
        assert_eq!(jump_index(0, 0), mid as usize);
        assert_eq!(jump_index(0, 3), (mid + 3) as usize);
        assert_eq!(jump_index(3, 0), (mid - 3) as usize);
        assert_eq!(jump_index(5000, 0), 0);
        assert_eq!(jump_index(0, 5000), JUMP_ARRAY_LEN - 1);
    }

    #[test]
    fn fert_index_clips_at_table_end() {
        assert_eq!(fert_index(2, 0), 2 * FERT_ARRAY_LEN);
        assert_eq!(fert_index(2, 3), 2 * FERT_ARRAY_LEN + 3);
        assert_eq!(fert_index(2, 100), 2 * FERT_ARRAY_LEN + FERT_ARRAY_LEN - 1);
    }
}
