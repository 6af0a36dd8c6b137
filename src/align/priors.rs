//! Loading Dirichlet prior tables from the seven-block prior file format.
//!
//! The header names both vocabulary sizes and the entry counts of five
//! blocks: lexical pairs, forward jumps, reverse jumps, forward fertilities
//! and reverse fertilities.  A forward run consumes the forward blocks and
//! skips the reverse ones; a reverse run does the opposite and additionally
//! transposes the lexical pairs.  All indices address the internal id space,
//! so the NULL word (id 0) may carry prior mass like any other type.

use std::io::{BufRead, BufReader};

use anyhow::{anyhow, bail, Context, Result};

use crate::countmap::CountMap;
use crate::io::open_input;
use crate::{Count, Token, FERT_ARRAY_LEN, JUMP_ARRAY_LEN, LEX_ALPHA};

use super::{fert_index, jump_index, Alignment};

/// Splits a prior line into exactly `n` whitespace fields.
fn fields<'l>(line: &'l str, n: usize, path: &str, lineno: usize) -> Result<Vec<&'l str>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != n {
        bail!(
            "{}: line {}: expected {} fields, found {}",
            path,
            lineno,
            n,
            fields.len()
        );
    }
    Ok(fields)
}

fn parse<T: std::str::FromStr>(field: &str, path: &str, lineno: usize) -> Result<T> {
    field
        .parse()
        .map_err(|_| anyhow!("{}: line {}: bad value {:?}", path, lineno, field))
}

impl Alignment<'_> {
    /// Loads prior tables from `path` (`-` for stdin).  `reverse` selects
    /// the swapped reading used by the reverse alignment direction.
    pub fn load_priors(&mut self, path: &str, reverse: bool) -> Result<()> {
        let reader = BufReader::new(open_input(path)?);
        let mut lines = reader.lines();
        let mut lineno = 0usize;
        let mut read_line = move || -> Result<(String, usize)> {
            lineno += 1;
            match lines.next() {
                Some(line) => {
                    let line = line.with_context(|| format!("{path}: read error"))?;
                    Ok((line, lineno))
                }
                None => bail!("{}: line {}: unexpected end of file", path, lineno),
            }
        };

        let (header, header_line) = read_line().context("failed to read priors header")?;
        let h = fields(&header, 7, path, header_line)?;
        let mut file_source_vocab: usize = parse(h[0], path, header_line)?;
        let mut file_target_vocab: usize = parse(h[1], path, header_line)?;
        let n_lex: usize = parse(h[2], path, header_line)?;
        let n_fwd_jump: usize = parse(h[3], path, header_line)?;
        let n_rev_jump: usize = parse(h[4], path, header_line)?;
        let n_fwd_fert: usize = parse(h[5], path, header_line)?;
        let n_rev_fert: usize = parse(h[6], path, header_line)?;

        if reverse {
            std::mem::swap(&mut file_source_vocab, &mut file_target_vocab);
        }
        let vocab = self.source.vocabulary_size() as usize;
        let target_vocab = self.target.vocabulary_size();
        if file_source_vocab != vocab || file_target_vocab != target_vocab as usize {
            bail!(
                "{}: vocabulary size mismatch, source is {} (expected {}) \
                 and target is {} (expected {})",
                path,
                file_source_vocab,
                vocab,
                file_target_vocab,
                target_vocab
            );
        }

        let (n_jump, n_fert) = if reverse {
            (n_rev_jump, n_rev_fert)
        } else {
            (n_fwd_jump, n_fwd_fert)
        };

        let mut lex = if n_lex > 0 {
            Some((vec![CountMap::new(); vocab], vec![0.0 as Count; vocab]))
        } else {
            None
        };
        let mut jump_prior = (n_jump > 0).then(|| vec![0.0 as Count; JUMP_ARRAY_LEN]);
        let mut fert_prior = (n_fert > 0).then(|| vec![0.0 as Count; vocab * FERT_ARRAY_LEN]);

        // ── lexical block: `e f alpha` ─────────────────────────────────────
        for _ in 0..n_lex {
            let (line, lineno) = read_line()?;
            let v = fields(&line, 3, path, lineno)?;
            let mut e: Token = parse(v[0], path, lineno)?;
            let mut f: Token = parse(v[1], path, lineno)?;
            let alpha: Count = parse(v[2], path, lineno)?;
            if reverse {
                std::mem::swap(&mut e, &mut f);
            }
            if e as usize >= vocab || f >= target_vocab {
                bail!("{}: line {}: type pair ({}, {}) out of range", path, lineno, e, f);
            }
            if let Some((maps, sums)) = &mut lex {
                // repeated pairs accumulate; the map stores the float's bits
                let prev = maps[e as usize].get(f).map(f32::from_bits).unwrap_or(0.0);
                maps[e as usize].insert(f, (prev + alpha).to_bits());
                sums[e as usize] += alpha;
            }
        }
        if let Some((maps, mut sums)) = lex {
            // the cached totals include the symmetric smoothing term
            for s in &mut sums {
                *s += LEX_ALPHA * target_vocab as Count;
            }
            self.source_prior = Some(maps);
            self.source_prior_sum = Some(sums);
        }

        // ── jump blocks: `delta alpha`, forward then reverse ───────────────
        for _ in 0..n_fwd_jump {
            let (line, lineno) = read_line()?;
            let v = fields(&line, 2, path, lineno)?;
            let delta: i32 = parse(v[0], path, lineno)?;
            let alpha: Count = parse(v[1], path, lineno)?;
            if !reverse {
                if let Some(prior) = jump_prior.as_deref_mut() {
                    prior[jump_index(0, delta)] += alpha;
                }
            }
        }
        for _ in 0..n_rev_jump {
            let (line, lineno) = read_line()?;
            let v = fields(&line, 2, path, lineno)?;
            let delta: i32 = parse(v[0], path, lineno)?;
            let alpha: Count = parse(v[1], path, lineno)?;
            if reverse {
                if let Some(prior) = jump_prior.as_deref_mut() {
                    prior[jump_index(0, delta)] += alpha;
                }
            }
        }
        self.jump_prior = jump_prior;

        // ── fertility blocks: `e k alpha`, forward then reverse ────────────
        for _ in 0..n_fwd_fert {
            let (line, lineno) = read_line()?;
            let v = fields(&line, 3, path, lineno)?;
            let e: Token = parse(v[0], path, lineno)?;
            let k: i32 = parse(v[1], path, lineno)?;
            let alpha: Count = parse(v[2], path, lineno)?;
            if !reverse {
                if e as usize >= vocab || k < 0 {
                    bail!("{}: line {}: fertility entry ({}, {}) out of range", path, lineno, e, k);
                }
                if let Some(prior) = fert_prior.as_deref_mut() {
                    prior[fert_index(e, k)] += alpha;
                }
            }
        }
        for _ in 0..n_rev_fert {
            let (line, lineno) = read_line()?;
            let v = fields(&line, 3, path, lineno)?;
            let e: Token = parse(v[0], path, lineno)?;
            let k: i32 = parse(v[1], path, lineno)?;
            let alpha: Count = parse(v[2], path, lineno)?;
            if reverse {
                if e as usize >= vocab || k < 0 {
                    bail!("{}: line {}: fertility entry ({}, {}) out of range", path, lineno, e, k);
                }
                if let Some(prior) = fert_prior.as_deref_mut() {
                    prior[fert_index(e, k)] += alpha;
                }
            }
        }
        self.fert_prior = fert_prior;

        Ok(())
    }

    /// True when a lexical prior table has been loaded.
    pub fn has_lexical_prior(&self) -> bool {
        self.source_prior.is_some()
    }

    /// True when a jump prior table has been loaded.
    pub fn has_jump_prior(&self) -> bool {
        self.jump_prior.is_some()
    }

    /// True when a fertility prior table has been loaded.
    pub fn has_fertility_prior(&self) -> bool {
        self.fert_prior.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::corpus::Corpus;
    use crate::{Model, JUMP_ALPHA, JUMP_ARRAY_LEN, LEX_ALPHA};

    use super::super::{jump_index, Alignment};

    fn corpus(vocab: u32) -> Corpus {
        Corpus::from_sentences("p", vocab, vec![Some(vec![0, 1]), Some(vec![1, 0])]).unwrap()
    }

    fn priors_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn forward_blocks_feed_the_forward_direction() {
        let source = corpus(2);
        let target = corpus(2);
        // internal vocabularies are 3; one lex entry, one jump each way
        let file = priors_file("3 3 1 1 1 0 0\n1 2 4.0\n2 0.5\n-2 9.0\n");
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        ta.load_priors(file.path().to_str().unwrap(), false).unwrap();
        assert!(ta.has_lexical_prior());
        assert!(ta.has_jump_prior());
        assert!(!ta.has_fertility_prior());

        ta.set_model(Model::Hmm);
        ta.make_counts();
        // all links start NULL, so the histogram holds smoothing + prior only
        let jumps = ta.jump_counts();
        assert!((jumps[jump_index(0, 2)] - (JUMP_ALPHA + 0.5)).abs() < 1e-6);
        assert!((jumps[jump_index(0, -2)] - JUMP_ALPHA).abs() < 1e-6);
        // the lexical row total is seeded from prior mass plus smoothing
        let row1 = 1.0 / ta.inv_count_sums()[1];
        assert!((row1 - (4.0 + LEX_ALPHA * 3.0)).abs() < 1e-4, "row total {row1}");
    }

    #[test]
    fn reverse_run_transposes_and_swaps_blocks() {
        let source = corpus(2);
        let target = corpus(2);
        let file = priors_file("3 3 1 1 1 0 0\n1 2 4.0\n2 0.5\n-2 9.0\n");
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        ta.load_priors(file.path().to_str().unwrap(), true).unwrap();

        ta.set_model(Model::Hmm);
        ta.make_counts();
        let jumps = ta.jump_counts();
        // the reverse jump block applies, the forward one is skipped
        assert!((jumps[jump_index(0, -2)] - (JUMP_ALPHA + 9.0)).abs() < 1e-6);
        assert!((jumps[jump_index(0, 2)] - JUMP_ALPHA).abs() < 1e-6);
        // the lexical pair arrives transposed: mass on (e=2, f=1)
        let row2 = 1.0 / ta.inv_count_sums()[2];
        assert!((row2 - (4.0 + LEX_ALPHA * 3.0)).abs() < 1e-4, "row total {row2}");
    }

    #[test]
    fn vocabulary_mismatch_is_rejected() {
        let source = corpus(2);
        let target = corpus(2);
        let file = priors_file("5 3 0 0 0 0 0\n");
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        let err = ta
            .load_priors(file.path().to_str().unwrap(), false)
            .unwrap_err();
        assert!(err.to_string().contains("vocabulary size mismatch"));
    }

    #[test]
    fn truncated_file_reports_the_line() {
        let source = corpus(2);
        let target = corpus(2);
        let file = priors_file("3 3 2 0 0 0 0\n1 1 1.0\n");
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        let err = ta
            .load_priors(file.path().to_str().unwrap(), false)
            .unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"), "{err}");
    }

    #[test]
    fn out_of_range_jump_deltas_clip_into_the_table() {
        let source = corpus(2);
        let target = corpus(2);
        // deltas beyond the histogram land in the clipped edge slots
        let file = priors_file("3 3 0 2 0 0 0\n-5000 1.0\n5000 2.0\n");
        let mut ta = Alignment::new(&source, &target, 0.2).unwrap();
        ta.load_priors(file.path().to_str().unwrap(), false).unwrap();
        ta.set_model(Model::Hmm);
        ta.make_counts();
        let jumps = ta.jump_counts();
        assert!((jumps[0] - (JUMP_ALPHA + 1.0)).abs() < 1e-6);
        // mass clipped onto the normaliser slot is not a data slot, so the
        // rebuilt normaliser only carries the sub-maximum prior mass
        let expected = crate::JUMP_MAX_EST * JUMP_ALPHA + 1.0;
        assert!((jumps[JUMP_ARRAY_LEN - 1] - expected).abs() < 1e-4);
    }
}
