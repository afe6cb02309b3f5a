use pullwise::{Bandit, BanditError, NormalArm, Policy, SuccessiveHalving, SuccessiveHalvingConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BanditError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut bandit = Bandit::with_seed(1);
    for i in 0..64 {
        bandit.add_arm(NormalArm::new(i as f64 / 64.0, 0.25)?)?;
    }

    let mut sh = SuccessiveHalving::new(SuccessiveHalvingConfig {
        min_pulls_per_round: 8,
        eta_arms: 2.0,
        eta_pulls: 2.0,
    })?;
    sh.play_n_rounds(&mut bandit, 6)?;

    let pulls = bandit.number_of_pulls();
    let best = bandit.record(0).ok_or(BanditError::NoActiveArms)?;
    println!(
        "winner {} ({}) after {pulls} pulls, estimated mean {:.3}, true mean {:.3}",
        best.id(),
        best.identity(),
        best.estimated_mean(),
        best.arm().real_mean()
    );
    Ok(())
}
