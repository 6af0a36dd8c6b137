//! Binary entry point for the `bitalign` command-line tool.
//!
//! Parses arguments, loads the two corpus sides, then hands control to the
//! driver which trains the requested direction(s) and writes the outputs.
//! Exit status is 0 on success and 1 on any configuration, I/O or input
//! validation failure.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;

use bitalign::cli::args::Args;
use bitalign::cli::constants::{set_display_level, PROGRAM_NAME};
use bitalign::corpus::Corpus;
use bitalign::displaylevel;
use bitalign::driver::{self, Options, Outputs};
use bitalign::io::STDIO_MARK;
use bitalign::Model;

fn run(args: Args) -> Result<()> {
    let t0 = Instant::now();
    // With both sides defaulted to stdin the two corpora arrive concatenated
    // on one stream.
    let (source, target) = if args.source == STDIO_MARK && args.target == STDIO_MARK {
        Corpus::read_pair("<stdin>", "<stdin>", std::io::stdin())?
    } else {
        (
            Corpus::read(&args.source, bitalign::io::open_input(&args.source)?)?,
            Corpus::read(&args.target, bitalign::io::open_input(&args.target)?)?,
        )
    };
    if source.n_sentences() != target.n_sentences() {
        bail!(
            "source text has {} sentences but target has {}",
            source.n_sentences(),
            target.n_sentences()
        );
    }
    displaylevel!(
        2,
        "Read texts ({} sentences): {:.3} s\n",
        source.n_sentences(),
        t0.elapsed().as_secs_f64()
    );
    displaylevel!(
        2,
        "Vocabulary sizes are {} (source), {} (target)\n",
        source.vocabulary_size(),
        target.vocabulary_size()
    );

    let model = Model::from_index(args.model).context("model must be 1, 2 or 3")?;
    let score_model = match args.score_model {
        Some(n) => Model::from_index(n).context("scoring model must be 1, 2 or 3")?,
        None => model,
    };

    let opts = Options {
        model,
        score_model,
        n_iters: [args.model1_iters, args.model2_iters, args.model3_iters],
        n_samplers: args.n_samplers as usize,
        null_prior: args.null_prior,
        priors: args.priors,
    };
    let outputs = Outputs {
        forward_links: args.forward_links,
        reverse_links: args.reverse_links,
        forward_scores: args.forward_scores,
        reverse_scores: args.reverse_scores,
        stats: args.stats,
    };
    driver::run(&source, &target, &opts, &outputs)
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help/--version land here too and must keep exit status 0;
            // genuine usage errors exit 1 rather than clap's default 2
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            std::process::exit(if is_usage_error { 1 } else { 0 });
        }
    };
    if args.quiet {
        set_display_level(1);
    }
    if let Err(err) = run(args) {
        eprintln!("{PROGRAM_NAME}: {err:#}");
        std::process::exit(1);
    }
}
