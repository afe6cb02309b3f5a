use pullwise::{
    Bandit, BanditConfig, BanditError, BernoulliArm, Estimator, NormalArm, Policy,
    ProbabilityMatching, UcbP, UcbPConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BanditError> {
    // `RUST_LOG=pullwise=debug` shows adds, deactivations and p_max refreshes.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Empirical estimates + UCB_p over a handful of Gaussian arms.
    let mut bandit = Bandit::with_seed(42);
    for (mean, variance) in [(0.5, 0.2), (1.0, 0.3), (0.8, 0.05), (0.2, 0.5)] {
        bandit.add_arm(NormalArm::new(mean, variance)?)?;
    }
    bandit.min_pull_arms(4);

    let mut ucb = UcbP::new(UcbPConfig { p: 1.0, seed: 42 });
    for _ in 0..20 {
        let d = ucb.decide(&mut bandit)?;
        println!("{:?} -> arm {} ({:?})", d.policy, d.id, d.reason);
        bandit.pull_by_index(d.position);
    }
    ucb.play_n_rounds(&mut bandit, 500)?;

    bandit.update_p_max(false, 0.01, 64);
    println!("\nafter {} pulls:", bandit.number_of_pulls());
    for row in bandit.summaries() {
        println!(
            "  {:>4} {:<32} pulls={:<4} mean={:.3} p_max={:.3}",
            row.id.to_string(),
            row.identity,
            row.num_pulls,
            row.estimated_mean,
            row.p_max
        );
    }

    let pruned = bandit.deactivate_by_confidence_gap(0.01, false);
    println!("confidence-gap elimination removed {pruned} arm(s)");

    // Posterior-derived estimates + probability matching over Bernoulli arms.
    let mut coins = Bandit::new(BanditConfig {
        seed: 7,
        estimator: Estimator::Posterior,
    });
    for p in [0.1, 0.35, 0.4, 0.6] {
        coins.add_arm(BernoulliArm::new(p)?)?;
    }
    let mut pm = ProbabilityMatching::default();
    pm.play_n_rounds(&mut coins, 2000)?;
    println!(
        "\nprobability matching: {} pulls, cumulative reward {:.0}",
        coins.number_of_pulls(),
        coins.cumulative_reward()
    );
    for i in 0..coins.number_of_arms() {
        if let Some(r) = coins.record(i) {
            println!("  {:<16} pulls={}", r.identity(), r.num_pulls());
        }
    }
    Ok(())
}
