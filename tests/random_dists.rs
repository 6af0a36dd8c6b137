// Statistical checks for the distribution samplers.
//
// All tests run on fixed seeds with tolerances several standard errors wide,
// so they are deterministic in practice while still catching transcription
// errors in the rejection samplers (a broken accept condition shifts the
// moments far outside these bands).

use bitalign::Rng;

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn variance(xs: &[f64], m: f64) -> f64 {
    xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64
}

// ─────────────────────────────────────────────────────────────────────────────
// Gamma, α ≥ 1
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn gamma32_moments() {
    let mut rng = Rng::from_seed(1001);
    for alpha in [1.0f32, 2.5, 8.0] {
        let xs: Vec<f64> = (0..30_000).map(|_| rng.gamma32(alpha) as f64).collect();
        let m = mean(&xs);
        let v = variance(&xs, m);
        // Gamma(α, 1) has mean α and variance α
        assert!((m - alpha as f64).abs() < 0.1 * alpha as f64 + 0.05, "mean {m} for α={alpha}");
        assert!((v - alpha as f64).abs() < 0.2 * alpha as f64 + 0.1, "var {v} for α={alpha}");
    }
}

#[test]
fn gamma64_moments() {
    let mut rng = Rng::from_seed(2002);
    for alpha in [1.0f64, 4.0] {
        let xs: Vec<f64> = (0..30_000).map(|_| rng.gamma64(alpha)).collect();
        let m = mean(&xs);
        assert!((m - alpha).abs() < 0.1 * alpha, "mean {m} for α={alpha}");
    }
}

#[test]
fn gamma_samples_are_positive_and_finite() {
    let mut rng = Rng::from_seed(3003);
    for _ in 0..10_000 {
        let x = rng.gamma32(1.5);
        assert!(x.is_finite() && x >= 0.0);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gamma, α ≪ 1 (log scale)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn log_gamma_small32_moments() {
    let mut rng = Rng::from_seed(4004);
    for alpha in [0.5f32, 0.2, 0.05] {
        let xs: Vec<f64> = (0..40_000)
            .map(|_| rng.log_gamma_small32(alpha).exp() as f64)
            .collect();
        let m = mean(&xs);
        // standard error of the mean is sqrt(α / n) ≈ 0.004 at worst
        assert!((m - alpha as f64).abs() < 0.03, "mean {m} for α={alpha}");
    }
}

#[test]
fn log_gamma_small64_matches_shape() {
    let mut rng = Rng::from_seed(5005);
    let alpha = 0.3f64;
    let xs: Vec<f64> = (0..40_000)
        .map(|_| rng.log_gamma_small64(alpha).exp())
        .collect();
    let m = mean(&xs);
    assert!((m - alpha).abs() < 0.03, "mean {m}");
}

// ─────────────────────────────────────────────────────────────────────────────
// Dirichlet dispatch
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn dirichlet_components_track_their_shapes() {
    // Shapes straddling the small-α dispatch threshold.
    let alpha = [0.2f32, 0.7, 2.0, 5.0];
    let total: f32 = alpha.iter().sum();
    let mut rng = Rng::from_seed(6006);
    let mut sums = [0.0f64; 4];
    let reps = 20_000;
    let mut x = [0.0f32; 4];
    for _ in 0..reps {
        rng.dirichlet32_unnormalized(&alpha, &mut x);
        let norm: f32 = x.iter().sum();
        for (s, &xi) in sums.iter_mut().zip(&x) {
            *s += (xi / norm) as f64;
        }
    }
    for (i, &s) in sums.iter().enumerate() {
        let got = s / reps as f64;
        let expect = (alpha[i] / total) as f64;
        assert!((got - expect).abs() < 0.02, "component {i}: {got} vs {expect}");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bounded integers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unbiased_draws_are_roughly_uniform() {
    let mut rng = Rng::from_seed(7007);
    let n = 7u32;
    let mut hits = vec![0usize; n as usize];
    let reps = 70_000;
    for _ in 0..reps {
        hits[rng.uint32_unbiased(n) as usize] += 1;
    }
    let expect = reps as f64 / n as f64;
    for (v, &h) in hits.iter().enumerate() {
        assert!(
            (h as f64 - expect).abs() < 0.1 * expect,
            "value {v} drawn {h} times (expected ≈ {expect})"
        );
    }
}

#[test]
fn split_is_deterministic() {
    let mut a = Rng::from_seed(31337);
    let mut b = Rng::from_seed(31337);
    let mut ca = a.split();
    let mut cb = b.split();
    for _ in 0..32 {
        assert_eq!(ca.uniform64().to_bits(), cb.uniform64().to_bits());
    }
    // parents stay in lockstep too
    assert_eq!(a.uniform64().to_bits(), b.uniform64().to_bits());
}
