//! Training schedule: independent parallel samplers per direction, the
//! per-model iteration blocks, the consensus pass, and the orchestration of
//! the forward/reverse direction pair.

use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::align::{sample_consensus, write_scores, Alignment, Model};
use crate::corpus::Corpus;
use crate::displaylevel;
use crate::io::open_output;
use crate::random::Rng;
use crate::Count;

/// Options shared by both alignment directions.
#[derive(Clone, Debug)]
pub struct Options {
    /// Most complex model to train.
    pub model: Model,
    /// Model used by the scoring pass.
    pub score_model: Model,
    /// Sweeps per model stage (lexical, jump, fertility).
    pub n_iters: [u32; 3],
    pub n_samplers: usize,
    pub null_prior: Count,
    /// Optional prior file, shared by both directions.
    pub priors: Option<String>,
}

/// Output paths for one direction.
#[derive(Clone, Debug, Default)]
pub struct DirectionOutputs {
    pub links: Option<String>,
    pub scores: Option<String>,
    pub stats: Option<String>,
}

/// Output paths for a whole run.
#[derive(Clone, Debug, Default)]
pub struct Outputs {
    pub forward_links: Option<String>,
    pub reverse_links: Option<String>,
    pub forward_scores: Option<String>,
    pub reverse_scores: Option<String>,
    pub stats: Option<String>,
}

/// Trains one direction (the transpose of the corpus pair when `reverse`)
/// and writes its outputs.
///
/// Child generators are split from `rng` in sampler-index order before any
/// worker starts, so the whole schedule is a pure function of the master
/// generator's state; the split order must not change.
pub fn align_direction(
    source: &Corpus,
    target: &Corpus,
    reverse: bool,
    opts: &Options,
    out: &DirectionOutputs,
    rng: &mut Rng,
) -> Result<()> {
    let (src, tgt) = if reverse {
        (target, source)
    } else {
        (source, target)
    };

    let t0 = Instant::now();
    let mut samplers = Vec::with_capacity(opts.n_samplers);
    for _ in 0..opts.n_samplers {
        let mut sampler = Alignment::new(src, tgt, opts.null_prior)?;
        if let Some(path) = &opts.priors {
            sampler
                .load_priors(path, reverse)
                .with_context(|| format!("unable to load {path}"))?;
        }
        samplers.push(sampler);
    }
    displaylevel!(
        2,
        "Created alignment structures: {:.3} s\n",
        t0.elapsed().as_secs_f64()
    );

    let t0 = Instant::now();
    let mut worker_rngs: Vec<Rng> = (0..opts.n_samplers).map(|_| rng.split()).collect();
    samplers
        .par_iter_mut()
        .zip(worker_rngs.par_iter_mut())
        .for_each(|(sampler, rng)| sampler.randomize(rng));
    displaylevel!(
        2,
        "Randomized alignment: {:.3} s\n",
        t0.elapsed().as_secs_f64()
    );

    for m in [Model::Lexical, Model::Hmm, Model::Fertility] {
        if m > opts.model {
            break;
        }
        let iters = opts.n_iters[m.index() as usize - 1];
        if iters == 0 {
            continue;
        }
        displaylevel!(2, "Aligning with model {} ({} iterations)\n", m.index(), iters);
        let t0 = Instant::now();
        let mut worker_rngs: Vec<Rng> = (0..opts.n_samplers).map(|_| rng.split()).collect();
        // one iteration block per model; par_iter_mut is the barrier
        samplers
            .par_iter_mut()
            .zip(worker_rngs.par_iter_mut())
            .for_each(|(sampler, rng)| {
                sampler.set_model(m);
                sampler.make_counts();
                for _ in 0..iters {
                    sampler.sample(rng, 1.0);
                }
            });
        displaylevel!(2, "Done: {:.3} s\n", t0.elapsed().as_secs_f64());
    }

    let t0 = Instant::now();
    sample_consensus(&mut samplers, rng);
    displaylevel!(
        2,
        "Final argmax iteration: {:.3} s\n",
        t0.elapsed().as_secs_f64()
    );

    if let Some(path) = &out.stats {
        displaylevel!(2, "Writing alignment statistics to {}\n", path);
        let mut file = open_output(path)?;
        samplers[0].write_jump_stats(&mut file)?;
    }

    if let Some(path) = &out.links {
        displaylevel!(
            2,
            "Writing alignments to {} for {} sentences\n",
            path,
            tgt.n_sentences()
        );
        let mut file = open_output(path)?;
        samplers[0].write_moses(&mut file, reverse)?;
    }

    if let Some(path) = &out.scores {
        displaylevel!(
            2,
            "Computing scores using model {} for {} sentences\n",
            opts.score_model.index(),
            tgt.n_sentences()
        );
        let mut scores = vec![0.0 as Count; tgt.n_sentences()];
        samplers[0].set_model(opts.score_model);
        samplers[0].sample_scores(rng, &mut scores);
        let mut file = open_output(path)?;
        write_scores(&mut file, &scores)?;
    }

    Ok(())
}

/// Runs the requested directions concurrently, each with its own OS-seeded
/// master generator.
///
/// The forward direction also runs when no link output was requested at all,
/// so a bare invocation still trains; the statistics dump is attached to
/// exactly one direction (forward when it runs).
pub fn run(source: &Corpus, target: &Corpus, opts: &Options, outputs: &Outputs) -> Result<()> {
    let run_forward = outputs.forward_links.is_some()
        || outputs.forward_scores.is_some()
        || (outputs.forward_links.is_none() && outputs.reverse_links.is_none());
    let run_reverse = outputs.reverse_links.is_some() || outputs.reverse_scores.is_some();

    displaylevel!(
        3,
        "Running {} sampler(s) per direction across {} cores\n",
        opts.n_samplers,
        num_cpus::get()
    );

    let forward = DirectionOutputs {
        links: outputs.forward_links.clone(),
        scores: outputs.forward_scores.clone(),
        stats: if run_forward {
            outputs.stats.clone()
        } else {
            None
        },
    };
    let reverse = DirectionOutputs {
        links: outputs.reverse_links.clone(),
        scores: outputs.reverse_scores.clone(),
        stats: if run_forward {
            None
        } else {
            outputs.stats.clone()
        },
    };

    let (fwd_result, rev_result) = rayon::join(
        || {
            if run_forward {
                let mut rng = Rng::from_os();
                align_direction(source, target, false, opts, &forward, &mut rng)
            } else {
                Ok(())
            }
        },
        || {
            if run_reverse {
                let mut rng = Rng::from_os();
                align_direction(source, target, true, opts, &reverse, &mut rng)
            } else {
                Ok(())
            }
        },
    );
    fwd_result?;
    rev_result
}
