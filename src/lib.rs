//! Bayesian word alignment for parallel bilingual corpora.
//!
//! Given two corpora of numeric-token sentences with matching sentence
//! counts, the engine assigns every target token either a source position in
//! its paired sentence or a NULL link.  Training is a collapsed Gibbs
//! sampler over a hierarchical Dirichlet formulation; three nested models
//! are available (lexical translation, + position jumps, + per-word
//! fertility).  Several independent samplers may run in parallel, and a
//! final consensus pass argmaxes their accumulated posteriors.

pub mod align;
pub mod cli;
pub mod corpus;
pub mod countmap;
pub mod driver;
pub mod hash;
pub mod io;
pub mod random;

// ─────────────────────────────────────────────────────────────────────────────
// Core scalar types
// ─────────────────────────────────────────────────────────────────────────────

/// Internal token id.  Id 0 is reserved for the NULL word, so a corpus with
/// user vocabulary size V has internal ids in `[1, V + 1)`.
pub type Token = u32;

/// A link value: a source position, or [`NULL_LINK`].
pub type Link = u16;

/// Floating type used for all sufficient statistics.
pub type Count = f32;

/// Sentinel link value for target tokens aligned to no source token.
pub const NULL_LINK: Link = 0xffff;

// ─────────────────────────────────────────────────────────────────────────────
// Model hyperparameters
// ─────────────────────────────────────────────────────────────────────────────

/// Dirichlet concentration for the jump distribution.
pub const JUMP_ALPHA: Count = 0.5;
/// Dirichlet concentration for the per-word fertility distributions.
pub const FERT_ALPHA: Count = 0.5;
/// Dirichlet concentration for the lexical translation distributions.
pub const LEX_ALPHA: Count = 0.001;
/// Dirichlet concentration for the NULL word's translation distribution.
pub const NULL_ALPHA: Count = 0.001;

/// Length of the jump histogram.  Index `i < JUMP_SUM` counts jumps of
/// magnitude `i - JUMP_ARRAY_LEN/2`, clipped into range; the last slot
/// caches the normaliser.
pub const JUMP_ARRAY_LEN: usize = 0x800;
/// Index of the cached jump normaliser.
pub const JUMP_SUM: usize = JUMP_ARRAY_LEN - 1;
/// Estimated maximum jump magnitude; seeds the normaliser's smoothing mass.
pub const JUMP_MAX_EST: Count = 100.0;

/// Slots per word in the fertility table; fertilities clip at the last slot.
pub const FERT_ARRAY_LEN: usize = 0x08;

/// Maximum sentence length, bounding the kernel's fixed buffers.
pub const MAX_SENT_LEN: usize = 0x400;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports of the primary API entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Per-direction alignment state: links plus sufficient statistics.
pub use align::Alignment;
/// The three nested alignment models.
pub use align::Model;
/// Consensus pass combining several samplers into one alignment.
pub use align::sample_consensus;
/// In-memory corpus of numeric-token sentences.
pub use corpus::{Corpus, Sentence};
/// Compact token→count container.
pub use countmap::CountMap;
/// xorshift* generator with distribution sampling.
pub use random::Rng;
