//! Command-line argument definitions for the `bitalign` binary.
//!
//! The surface is short single-letter flags; every file argument accepts `-`
//! for the standard stream.  Iteration counts select how many Gibbs sweeps
//! each model stage runs; `-m` picks the final (most complex) model and is
//! the only required flag.

use clap::Parser;

/// Bayesian word alignment for parallel corpora via collapsed Gibbs sampling.
#[derive(Parser, Debug)]
#[command(name = "bitalign", version, about)]
pub struct Args {
    /// Source-side corpus file (`-` for stdin).
    #[arg(short = 's', value_name = "FILE", default_value = "-")]
    pub source: String,

    /// Target-side corpus file (`-` for stdin).
    #[arg(short = 't', value_name = "FILE", default_value = "-")]
    pub target: String,

    /// Dirichlet prior file.
    #[arg(short = 'p', value_name = "FILE")]
    pub priors: Option<String>,

    /// Forward (source-target) link output (`-` for stdout).
    #[arg(short = 'f', value_name = "FILE")]
    pub forward_links: Option<String>,

    /// Reverse (target-source) link output (`-` for stdout).
    #[arg(short = 'r', value_name = "FILE")]
    pub reverse_links: Option<String>,

    /// Jump statistics output.
    #[arg(short = 'S', value_name = "FILE")]
    pub stats: Option<String>,

    /// Forward sentence-score output.
    #[arg(short = 'F', value_name = "FILE")]
    pub forward_scores: Option<String>,

    /// Reverse sentence-score output.
    #[arg(short = 'R', value_name = "FILE")]
    pub reverse_scores: Option<String>,

    /// Sweeps with the lexical model.
    #[arg(short = '1', value_name = "N", default_value_t = 1)]
    pub model1_iters: u32,

    /// Sweeps with the jump model.
    #[arg(short = '2', value_name = "N", default_value_t = 1)]
    pub model2_iters: u32,

    /// Sweeps with the fertility model.
    #[arg(short = '3', value_name = "N", default_value_t = 1)]
    pub model3_iters: u32,

    /// Number of independent samplers.
    #[arg(short = 'n', value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub n_samplers: u32,

    /// Prior probability of a NULL alignment.
    #[arg(short = 'N', value_name = "P", default_value_t = 0.2)]
    pub null_prior: f32,

    /// Model used for scoring (defaults to the value of -m).
    #[arg(short = 'M', value_name = "MODEL",
          value_parser = clap::value_parser!(u32).range(1..=3))]
    pub score_model: Option<u32>,

    /// Alignment model: 1 = lexical, 2 = + jumps, 3 = + fertility.
    #[arg(short = 'm', value_name = "MODEL",
          value_parser = clap::value_parser!(u32).range(1..=3))]
    pub model: u32,

    /// Suppress progress output.
    #[arg(short = 'q')]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_parses() {
        let args = Args::try_parse_from(["bitalign", "-m", "2"]).unwrap();
        assert_eq!(args.model, 2);
        assert_eq!(args.source, "-");
        assert_eq!(args.n_samplers, 1);
        assert_eq!(args.model1_iters, 1);
        assert!((args.null_prior - 0.2).abs() < 1e-6);
        assert!(!args.quiet);
    }

    #[test]
    fn model_flag_is_required() {
        assert!(Args::try_parse_from(["bitalign"]).is_err());
    }

    #[test]
    fn model_range_is_enforced() {
        assert!(Args::try_parse_from(["bitalign", "-m", "4"]).is_err());
        assert!(Args::try_parse_from(["bitalign", "-m", "0"]).is_err());
    }

    #[test]
    fn digit_flags_take_values() {
        let args =
            Args::try_parse_from(["bitalign", "-m", "3", "-1", "4", "-2", "5", "-3", "6"]).unwrap();
        assert_eq!(
            (args.model1_iters, args.model2_iters, args.model3_iters),
            (4, 5, 6)
        );
    }

    #[test]
    fn zero_samplers_is_rejected() {
        assert!(Args::try_parse_from(["bitalign", "-m", "1", "-n", "0"]).is_err());
    }
}
