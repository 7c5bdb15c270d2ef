//! Integration tests for the Monte Carlo engine

use driftflow::error::SimulationError;
use driftflow::models::brownian::{analytic_expectation, terminal_price};
use driftflow::models::{
    simulate, DriftCorrection, ReplayDraws, RngNormals, Simulation, SimulationParameters,
};

const DT: f64 = 1.0 / 252.0;

fn params(iterations: usize) -> SimulationParameters {
    SimulationParameters {
        current_price: 100.0,
        mean: 0.0,
        volatility: 0.2,
        time_step: DT,
        iterations,
    }
}

#[test]
fn test_same_draws_same_result() {
    let draws: Vec<f64> = (0..64).map(|i| ((i * 37) % 17) as f64 / 4.0 - 2.0).collect();
    let a = simulate(&params(64), &mut ReplayDraws::new(draws.clone())).unwrap();
    let b = simulate(&params(64), &mut ReplayDraws::new(draws)).unwrap();
    assert_eq!(a.expected_price.to_bits(), b.expected_price.to_bits());
}

#[test]
fn test_same_seed_same_result() {
    let a = simulate(&params(1000), &mut RngNormals::seeded(2024)).unwrap();
    let b = simulate(&params(1000), &mut RngNormals::seeded(2024)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_zero_volatility_is_exact() {
    let p = SimulationParameters {
        current_price: 250.0,
        mean: 0.0008,
        volatility: 0.0,
        time_step: DT,
        iterations: 1000,
    };
    let expected = 250.0 * (0.0008 * DT).exp();
    for correction in [DriftCorrection::Literal, DriftCorrection::Ito] {
        let result = Simulation::new(correction)
            .run(&p, &mut RngNormals::seeded(1))
            .unwrap();
        assert_eq!(result.expected_price, expected);
        assert_eq!(result.standard_error, Some(0.0));
    }
}

#[test]
fn test_single_trial_equals_terminal_price() {
    for draw in [-2.5, -0.3, 0.0, 0.9, 3.1] {
        let result = simulate(&params(1), &mut ReplayDraws::new(vec![draw])).unwrap();
        let trial = terminal_price(100.0, 0.0, 0.2, DT, draw, DriftCorrection::Literal);
        assert_eq!(result.expected_price, trial);
    }
}

#[test]
fn test_expected_price_increases_with_mean() {
    let draws = vec![0.4, -1.1, 2.0, -0.2];
    let mut low = params(4);
    low.mean = -0.001;
    let mut high = params(4);
    high.mean = 0.001;
    let a = simulate(&low, &mut ReplayDraws::new(draws.clone())).unwrap();
    let b = simulate(&high, &mut ReplayDraws::new(draws)).unwrap();
    assert!(b.expected_price > a.expected_price);
}

#[test]
fn test_negative_draws_decrease_with_volatility() {
    let draws = vec![-0.5, -1.5, -2.5];
    let mut calm = params(3);
    calm.volatility = 0.1;
    let mut wild = params(3);
    wild.volatility = 0.4;
    let a = simulate(&calm, &mut ReplayDraws::new(draws.clone())).unwrap();
    let b = simulate(&wild, &mut ReplayDraws::new(draws)).unwrap();
    assert!(b.expected_price < a.expected_price);
}

#[test]
fn test_literal_formula_converges() {
    let runs = 20;
    let total: f64 = (0..runs)
        .map(|seed| {
            simulate(&params(10_000), &mut RngNormals::seeded(seed))
                .unwrap()
                .expected_price
        })
        .sum();
    let average = total / runs as f64;

    let target = 100.0 * (-0.2f64.powi(2) * DT).exp();
    assert!(
        (average - target).abs() / target < 0.005,
        "average {average} vs {target}"
    );

    let exact = analytic_expectation(100.0, 0.0, 0.2, DT, DriftCorrection::Literal);
    assert!((average - exact).abs() / exact < 0.001);
}

#[test]
fn test_ito_variant_converges_to_drift() {
    let engine = Simulation::new(DriftCorrection::Ito);
    let result = engine.run_parallel(&params(200_000), 99, 8).unwrap();
    assert!((result.expected_price - 100.0).abs() < 0.05);

    let literal = Simulation::default()
        .run_parallel(&params(200_000), 99, 8)
        .unwrap();
    assert!(literal.expected_price < result.expected_price);
}

#[test]
fn test_standard_error_shrinks() {
    let small = simulate(&params(1_000), &mut RngNormals::seeded(8)).unwrap();
    let large = simulate(&params(100_000), &mut RngNormals::seeded(8)).unwrap();
    let ratio = small.standard_error.unwrap() / large.standard_error.unwrap();
    assert!(ratio > 8.0 && ratio < 12.0, "ratio {ratio}");
}

#[test]
fn test_expected_price_positive() {
    for seed in 0..10 {
        for volatility in [0.0, 0.01, 0.5, 2.0] {
            let p = SimulationParameters {
                current_price: 0.5,
                mean: -0.01,
                volatility,
                time_step: 1.0,
                iterations: 200,
            };
            let result = simulate(&p, &mut RngNormals::seeded(seed)).unwrap();
            assert!(result.expected_price > 0.0);
        }
    }
}

#[test]
fn test_invalid_inputs() {
    let mut source = ReplayDraws::new(vec![0.0]);

    let err = simulate(&params(0), &mut source).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidParameter { .. }));

    let mut p = params(10);
    p.current_price = -5.0;
    let err = simulate(&p, &mut source).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidParameter { .. }));

    let mut p = params(10);
    p.time_step = 0.0;
    let err = simulate(&p, &mut source).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidParameter { .. }));
}

#[test]
fn test_parallel_independent_of_thread_count() {
    let engine = Simulation::default();
    let p = params(5_000);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let single_thread = pool.install(|| engine.run_parallel(&p, 3, 6)).unwrap();
    let default_pool = engine.run_parallel(&p, 3, 6).unwrap();
    assert_eq!(
        single_thread.expected_price.to_bits(),
        default_pool.expected_price.to_bits()
    );
}
