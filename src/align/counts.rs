//! Rebuilding the sufficient statistics from the current link vectors.

use crate::{Count, JUMP_ALPHA, JUMP_MAX_EST, JUMP_SUM, LEX_ALPHA, NULL_LINK};

use super::{jump_index, Alignment};

impl Alignment<'_> {
    /// Re-derives every statistic from the link vectors: lexical counts,
    /// their cached inverse totals, and (for the jump-aware models) the jump
    /// histogram.  Called once before each model's iteration block so that a
    /// model upgrade starts from statistics consistent with its own view of
    /// the data.
    pub fn make_counts(&mut self) {
        let model = self.model;
        let target_vocab = self.target.vocabulary_size() as Count;

        for (e, map) in self.source_count.iter_mut().enumerate() {
            map.reset();
            self.inv_source_count_sum[e] = match &self.source_prior_sum {
                Some(sums) => sums[e],
                None => LEX_ALPHA * target_vocab,
            };
        }

        if model.uses_jumps() {
            match &self.jump_prior {
                Some(prior) => {
                    self.jump_counts[JUMP_SUM] = JUMP_MAX_EST * JUMP_ALPHA;
                    for i in 0..JUMP_SUM {
                        self.jump_counts[i] = prior[i] + JUMP_ALPHA;
                        self.jump_counts[JUMP_SUM] += prior[i];
                    }
                }
                None => {
                    for slot in &mut self.jump_counts[..JUMP_SUM] {
                        *slot = JUMP_ALPHA;
                    }
                    self.jump_counts[JUMP_SUM] = JUMP_MAX_EST * JUMP_ALPHA;
                }
            }
        }

        let n_clean = self.clean_bound();
        for sent in 0..n_clean {
            let Some(offset) = self.offsets[sent] else { continue };
            let Some(source_sentence) = self.source.sentence(sent) else { continue };
            let Some(target_sentence) = self.target.sentence(sent) else { continue };
            let source_tokens = source_sentence.tokens();
            let source_length = source_tokens.len();
            let target_tokens = target_sentence.tokens();
            let target_length = target_tokens.len();
            let links = &self.links[offset..offset + target_length];

            let mut aa_jm1: i32 = -1;
            for j in 0..target_length {
                let i = links[j];
                let e = if i == NULL_LINK {
                    0
                } else {
                    source_tokens[i as usize]
                };
                let f = target_tokens[j];
                self.inv_source_count_sum[e as usize] += 1.0;
                self.source_count[e as usize].add(f, 1);
                if model.uses_jumps() && e != 0 {
                    let jump = jump_index(aa_jm1, i32::from(i));
                    aa_jm1 = i32::from(i);
                    self.jump_counts[jump] += 1.0;
                    self.jump_counts[JUMP_SUM] += 1.0;
                }
            }
            // the run of non-NULL links also jumps off the sentence end
            if model.uses_jumps() && aa_jm1 >= 0 {
                self.jump_counts[jump_index(aa_jm1, source_length as i32)] += 1.0;
                self.jump_counts[JUMP_SUM] += 1.0;
            }
        }

        for v in &mut self.inv_source_count_sum {
            *v = 1.0 / *v;
        }
    }
}
