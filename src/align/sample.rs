//! The collapsed-Gibbs kernel: one pass over every target position, plus the
//! consensus and scoring variants built on the same per-sentence routine.
//!
//! For each position the kernel withdraws the current link's contribution
//! from the statistics, builds an unnormalised cumulative distribution over
//! the `source_length + 1` candidates (every source position plus NULL),
//! draws a replacement, and re-incorporates it.  The inner loops are
//! specialised per model, and the two jump-histogram indices are maintained
//! by bounded increment/decrement instead of being recomputed per candidate.

use crate::corpus::Sentence;
use crate::countmap::CountMap;
use crate::random::Rng;
use crate::{
    Count, Link, Token, FERT_ALPHA, FERT_ARRAY_LEN, JUMP_ARRAY_LEN, JUMP_SUM, LEX_ALPHA,
    MAX_SENT_LEN, NULL_ALPHA, NULL_LINK,
};

use super::{fert_index, jump_index, Alignment, Model};

/// Reusable sweep buffers, sized once for the maximum sentence length.
struct Scratch {
    /// Running cumulative distribution over source positions + NULL.
    ps: Vec<Count>,
    /// Fertility of each source position in the current sentence.
    fert: Vec<i32>,
    /// Nearest non-NULL link to the right of each target position.
    aa_jp1: Vec<i32>,
}

impl Scratch {
    fn new() -> Scratch {
        Scratch {
            ps: vec![0.0; MAX_SENT_LEN + 1],
            fert: vec![0; MAX_SENT_LEN],
            aa_jp1: vec![0; MAX_SENT_LEN],
        }
    }
}

/// Smoothed lexical concentration for the pair (e, f).
#[inline]
fn lex_alpha(prior: Option<&[CountMap]>, e: usize, f: Token) -> Count {
    match prior {
        Some(maps) => f32::from_bits(maps[e].get(f).unwrap_or(0)) + LEX_ALPHA,
        None => LEX_ALPHA,
    }
}

/// Largest single-candidate mass in a cumulative vector of length `len`.
#[inline]
fn max_step(ps: &[Count], len: usize) -> Count {
    let mut max_p: Count = 0.0;
    let mut prev: Count = 0.0;
    for &p in &ps[..len] {
        if p - prev > max_p {
            max_p = p - prev;
        }
        prev = p;
    }
    max_p
}

impl Alignment<'_> {
    /// Runs one Gibbs sweep over every target position of every sentence.
    ///
    /// `lambda` is an annealing temperature: 1 samples the posterior
    /// directly, larger values sharpen it, and values ≥ 100 degenerate to an
    /// argmax of the candidate distribution.
    pub fn sample(&mut self, rng: &mut Rng, lambda: Count) {
        self.refresh_fertility(rng);
        let mut scratch = Scratch::new();
        for sent in 0..self.offsets.len() {
            self.sample_sentence(sent, rng, &mut scratch, None, None, lambda);
        }
    }

    /// Sweeps once without re-linking, filling one score per sentence: the
    /// negative mean log of the best candidate's (normalised) mass, left in
    /// log space — the writer negates.  Skipped pairs keep a score of zero.
    pub fn sample_scores(&mut self, rng: &mut Rng, scores: &mut [Count]) {
        debug_assert_eq!(scores.len(), self.offsets.len());
        self.refresh_fertility(rng);
        let mut scratch = Scratch::new();
        for sent in 0..self.offsets.len() {
            if self.offsets[sent].is_none() {
                continue;
            }
            let target_length = self.target.sentence(sent).map_or(0, Sentence::len);
            let mut total: Count = 0.0;
            self.sample_sentence(sent, rng, &mut scratch, None, Some(&mut total), 1.0);
            scores[sent] = total / target_length as Count;
        }
    }

    /// Redraws the per-word fertility categoricals from their posterior.
    ///
    /// Unlike the jump and lexical statistics, the fertility distributions
    /// are sampled explicitly once per sweep and then held fixed.  Because
    /// the kernel only ever consumes P(φ)/P(φ−1), slot φ stores that ratio
    /// directly; slot 0 is undefined and the last slot is pinned very low so
    /// the fertility cap stays unattractive.
    fn refresh_fertility(&mut self, rng: &mut Rng) {
        if !self.model.uses_fertility() {
            return;
        }
        let vocab = self.source.vocabulary_size() as usize;
        let mut e_count = vec![0usize; vocab];

        match &self.fert_prior {
            Some(prior) => {
                for (slot, p) in self.fert_counts.iter_mut().zip(prior) {
                    *slot = p + FERT_ALPHA;
                }
            }
            None => self.fert_counts.fill(FERT_ALPHA),
        }

        let n_clean = self.clean_bound();
        let mut fert = vec![0i32; MAX_SENT_LEN];
        for sent in 0..n_clean {
            let Some(offset) = self.offsets[sent] else { continue };
            let Some(source_sentence) = self.source.sentence(sent) else { continue };
            let Some(target_sentence) = self.target.sentence(sent) else { continue };
            let source_tokens = source_sentence.tokens();
            let source_length = source_tokens.len();
            let target_length = target_sentence.len();
            let links = &self.links[offset..offset + target_length];

            fert[..source_length].fill(0);
            for &link in links {
                if link != NULL_LINK {
                    fert[link as usize] += 1;
                }
            }
            for (i, &e) in source_tokens.iter().enumerate() {
                e_count[e as usize] += 1;
                self.fert_counts[fert_index(e, fert[i])] += 1.0;
            }
        }

        let mut alpha = [0.0 as Count; FERT_ARRAY_LEN];
        for e in 1..vocab {
            // word types absent from the text keep their raw table
            if e_count[e] == 0 {
                continue;
            }
            let base = fert_index(e as Token, 0);
            let buf = &mut self.fert_counts[base..base + FERT_ARRAY_LEN];
            alpha.copy_from_slice(buf);
            rng.dirichlet32_unnormalized(&alpha, buf);
            buf[FERT_ARRAY_LEN - 1] = 1e-10;
            for i in (1..FERT_ARRAY_LEN - 1).rev() {
                buf[i] /= buf[i - 1];
            }
        }
    }

    /// Processes one sentence: every target position is withdrawn, given a
    /// fresh candidate distribution, re-linked and re-incorporated.
    ///
    /// `acc` switches the routine into consensus mode: the normalised
    /// distribution is folded into the shared accumulator and the new link
    /// is the argmax of everything accumulated so far.  `score` switches it
    /// into scoring mode: links are kept and the log of the best candidate
    /// mass is accumulated instead.
    fn sample_sentence(
        &mut self,
        sent: usize,
        rng: &mut Rng,
        scratch: &mut Scratch,
        mut acc: Option<&mut [Count]>,
        mut score: Option<&mut Count>,
        lambda: Count,
    ) {
        let Some(offset) = self.offsets[sent] else { return };
        let model = self.model;
        let null_prior = self.null_prior;
        let clean = sent < self.clean_bound();
        let Some(source_sentence) = self.source.sentence(sent) else { return };
        let Some(target_sentence) = self.target.sentence(sent) else { return };
        let source_tokens = source_sentence.tokens();
        let target_tokens = target_sentence.tokens();
        let source_length = source_tokens.len();
        let target_length = target_tokens.len();

        let links = &mut self.links[offset..offset + target_length];
        let source_count = &mut self.source_count;
        let inv_sum = &mut self.inv_source_count_sum;
        let jump_counts = &mut self.jump_counts;
        let fert_counts = &self.fert_counts;
        let source_prior = self.source_prior.as_deref();

        // Nearest non-NULL link to the right of each position (S if none).
        if model.uses_jumps() {
            let mut aa = source_length as i32;
            for j in (0..target_length).rev() {
                scratch.aa_jp1[j] = aa;
                if links[j] != NULL_LINK {
                    aa = i32::from(links[j]);
                }
            }
        }
        // Fertilities of the source positions under the current links.
        if model.uses_fertility() {
            scratch.fert[..source_length].fill(0);
            for j in 0..target_length {
                if links[j] != NULL_LINK {
                    scratch.fert[links[j] as usize] += 1;
                }
            }
        }

        // Nearest non-NULL link to the left (-1 if none).
        let mut aa_jm1: i32 = -1;
        let mut acc_base = 0usize;

        for j in 0..target_length {
            let f = target_tokens[j];
            let old_i = links[j];
            let aa_jp1 = if model.uses_jumps() { scratch.aa_jp1[j] } else { 0 };
            let old_e = if old_i == NULL_LINK {
                0
            } else {
                if model.uses_fertility() {
                    scratch.fert[old_i as usize] -= 1;
                }
                source_tokens[old_i as usize]
            };

            // ── withdraw ────────────────────────────────────────────────────
            let mut reduced_count = 0;
            if clean {
                // 1/(x − 1) derived from 1/x without re-summing the row
                inv_sum[old_e as usize] = 1.0 / (1.0 / inv_sum[old_e as usize] - 1.0);
                reduced_count = source_count[old_e as usize].add(f, 1u32.wrapping_neg());
                debug_assert_eq!(
                    reduced_count & 0x8000_0000,
                    0,
                    "lexical count underflow for source type {old_e}"
                );
            }

            let skip_jump = if model.uses_jumps() {
                jump_index(aa_jm1, aa_jp1)
            } else {
                0
            };

            if model.uses_jumps() && clean {
                if old_i == NULL_LINK {
                    // a NULL-aligned token only contributes the skip jump
                    jump_counts[JUMP_SUM] -= 1.0;
                    jump_counts[skip_jump] -= 1.0;
                } else {
                    let old_jump1 = jump_index(aa_jm1, i32::from(old_i));
                    let old_jump2 = jump_index(i32::from(old_i), aa_jp1);
                    jump_counts[JUMP_SUM] -= 2.0;
                    jump_counts[old_jump1] -= 1.0;
                    jump_counts[old_jump2] -= 1.0;
                }
            }

            // ── candidate distribution ──────────────────────────────────────
            let null_n = source_count[0].get(f).unwrap_or(0);
            let ps = &mut scratch.ps;
            let mut ps_sum: Count = 0.0;

            // Specialised inner loops per model keep the hot path free of
            // branches that cannot change within a sweep.
            match model {
                Model::Fertility => {
                    let mut jump1 = jump_index(aa_jm1, 0);
                    let mut jump2 = jump_index(0, aa_jp1);
                    for i in 0..source_length {
                        let e = source_tokens[i] as usize;
                        let n = source_count[e].get(f).unwrap_or(0);
                        ps_sum += inv_sum[e]
                            * (lex_alpha(source_prior, e, f) + n as Count)
                            * jump_counts[jump1]
                            * jump_counts[jump2]
                            * fert_counts[fert_index(e as Token, scratch.fert[i] + 1)];
                        ps[i] = ps_sum;
                        // bounded updates replace a jump_index call per
                        // candidate
                        jump1 = (jump1 + 1).min(JUMP_ARRAY_LEN - 1);
                        jump2 = jump2.saturating_sub(1);
                    }
                    if let Some(total) = score.as_deref_mut() {
                        let z = jump_counts[JUMP_SUM];
                        *total += (max_step(ps, source_length) / (z * z)).ln();
                    }
                    // The jump normaliser Z would divide every non-NULL term
                    // twice; scaling the single NULL term by Z instead is
                    // equivalent once the distribution is normalised.
                    ps_sum += null_prior
                        * inv_sum[0]
                        * (NULL_ALPHA + null_n as Count)
                        * jump_counts[JUMP_SUM]
                        * jump_counts[skip_jump];
                }
                Model::Hmm => {
                    let mut jump1 = jump_index(aa_jm1, 0);
                    let mut jump2 = jump_index(0, aa_jp1);
                    for i in 0..source_length {
                        let e = source_tokens[i] as usize;
                        let n = source_count[e].get(f).unwrap_or(0);
                        ps_sum += inv_sum[e]
                            * (lex_alpha(source_prior, e, f) + n as Count)
                            * jump_counts[jump1]
                            * jump_counts[jump2];
                        ps[i] = ps_sum;
                        jump1 = (jump1 + 1).min(JUMP_ARRAY_LEN - 1);
                        jump2 = jump2.saturating_sub(1);
                    }
                    if let Some(total) = score.as_deref_mut() {
                        let z = jump_counts[JUMP_SUM];
                        *total += (max_step(ps, source_length) / (z * z)).ln();
                    }
                    ps_sum += null_prior
                        * inv_sum[0]
                        * (NULL_ALPHA + null_n as Count)
                        * jump_counts[JUMP_SUM]
                        * jump_counts[skip_jump];
                }
                Model::Lexical => {
                    for i in 0..source_length {
                        let e = source_tokens[i] as usize;
                        let n = source_count[e].get(f).unwrap_or(0);
                        ps_sum += inv_sum[e] * (lex_alpha(source_prior, e, f) + n as Count);
                        ps[i] = ps_sum;
                    }
                    if let Some(total) = score.as_deref_mut() {
                        *total += max_step(ps, source_length).ln();
                    }
                    ps_sum += null_prior * inv_sum[0] * (NULL_ALPHA + null_n as Count);
                }
            }
            ps[source_length] = ps_sum;

            if let Some(acc) = acc.as_deref_mut() {
                let scale = 1.0 / ps_sum;
                let cell = &mut acc[acc_base..acc_base + source_length + 1];
                cell[0] += ps[0] * scale;
                for i in 1..=source_length {
                    cell[i] += (ps[i] - ps[i - 1]) * scale;
                }
            }

            // ── choose ──────────────────────────────────────────────────────
            let new_i = if score.is_some() {
                // scoring only: keep the current link
                if old_i == NULL_LINK {
                    source_length
                } else {
                    old_i as usize
                }
            } else if let Some(acc) = acc.as_deref() {
                // consensus: argmax over everything accumulated so far
                let cell = &acc[acc_base..acc_base + source_length + 1];
                let mut best = 0;
                let mut best_p = cell[0];
                for (i, &p) in cell.iter().enumerate().skip(1) {
                    if p > best_p {
                        best = i;
                        best_p = p;
                    }
                }
                best
            } else if lambda != 1.0 && lambda >= 100.0 {
                // a temperature this extreme is an argmax of the increments
                let mut best = 0;
                let mut best_p = ps[0];
                let mut prev = ps[0];
                for (i, &p) in ps.iter().enumerate().take(source_length + 1).skip(1) {
                    let step = p - prev;
                    prev = p;
                    if step > best_p {
                        best = i;
                        best_p = step;
                    }
                }
                best
            } else if lambda != 1.0 {
                // anneal: raise each candidate mass to the λ-th power
                let mut sum: Count = 0.0;
                let mut prev: Count = 0.0;
                for i in 0..=source_length {
                    let step = ps[i] - prev;
                    prev = ps[i];
                    sum += step.powf(lambda);
                    ps[i] = sum;
                }
                rng.categorical32(&ps[..=source_length])
            } else {
                rng.categorical32(&ps[..=source_length])
            };
            if acc.is_some() {
                acc_base += source_length + 1;
            }

            // ── re-incorporate ──────────────────────────────────────────────
            let new_e: Token;
            if new_i == source_length {
                new_e = 0;
                links[j] = NULL_LINK;
            } else {
                new_e = source_tokens[new_i];
                links[j] = new_i as Link;
                if model.uses_fertility() {
                    scratch.fert[new_i] += 1;
                }
            }

            if clean {
                if old_e != new_e && reduced_count == 0 {
                    // the withdrawal left a dead zero entry behind
                    let _removed = source_count[old_e as usize].remove(f);
                    debug_assert!(_removed, "zero-count entry vanished for source type {old_e}");
                }
                inv_sum[new_e as usize] = 1.0 / (1.0 / inv_sum[new_e as usize] + 1.0);
                source_count[new_e as usize].add(f, 1);
            }
            if clean && model.uses_jumps() {
                if new_e == 0 {
                    jump_counts[JUMP_SUM] += 1.0;
                    jump_counts[skip_jump] += 1.0;
                } else {
                    let new_jump1 = jump_index(aa_jm1, new_i as i32);
                    let new_jump2 = jump_index(new_i as i32, aa_jp1);
                    jump_counts[JUMP_SUM] += 2.0;
                    jump_counts[new_jump1] += 1.0;
                    jump_counts[new_jump2] += 1.0;
                }
            }
            if model.uses_jumps() && new_e != 0 {
                aa_jm1 = new_i as i32;
            }
        }
    }
}

/// Final pass combining several independent samplers into one alignment.
///
/// Sentence by sentence, each sampler (taken in descending index order) runs
/// its kernel and folds its normalised per-position distributions into a
/// shared `T × (S + 1)` accumulator, immediately re-linking from the argmax
/// of the mass accumulated so far.  Sampler 0 takes the last turn, so its
/// link vectors end up holding the consensus alignment.  Determinism across
/// runs follows from the fixed turn order; the generator is only consulted
/// for sampler 0's fertility redraw.
pub fn sample_consensus(samplers: &mut [Alignment<'_>], rng: &mut Rng) {
    if samplers.is_empty() {
        return;
    }
    samplers[0].refresh_fertility(rng);
    let n_sentences = samplers[0].offsets.len();
    let mut scratch = Scratch::new();
    let mut acc: Vec<Count> = Vec::new();
    for sent in 0..n_sentences {
        if samplers[0].offsets[sent].is_none() {
            continue;
        }
        let source_length = samplers[0].source.sentence(sent).map_or(0, Sentence::len);
        let target_length = samplers[0].target.sentence(sent).map_or(0, Sentence::len);
        acc.clear();
        acc.resize(target_length * (source_length + 1), 0.0);
        for k in (0..samplers.len()).rev() {
            samplers[k].sample_sentence(sent, rng, &mut scratch, Some(&mut acc), None, 1.0);
        }
    }
}
