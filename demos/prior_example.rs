use ndarray::array;
use priorsgd::dataset::make_blobs;
use priorsgd::{LearningRate, Prior, SGDClassifier};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Prior-Informed Regularization Example ===\n");

    // A large related task and a small target task
    let source_centers = array![[2.0, 2.0], [-2.0, -2.0]];
    let (x_source, y_source) = make_blobs(&source_centers, 200, 1.0, 1)?;

    let target_centers = array![[2.0, 1.5], [-2.0, -1.5]];
    let (x_target, y_target) = make_blobs(&target_centers, 5, 1.5, 2)?;

    let mut source_model = SGDClassifier::new().random_state(0);
    source_model.fit(&x_source, &y_source)?;
    let source_coef = source_model.coef().expect("fitted").row(0).to_owned();
    println!("Source task weights: {:.3}", source_coef);

    println!("\nRegularization strength comparison on the target task:");
    println!("{:<10} {:>20} {:>20}", "alpha", "L2 weights", "prior weights");
    println!("{}", "-".repeat(52));

    for &alpha in &[0.001, 0.1, 10.0] {
        let mut l2 = SGDClassifier::new()
            .alpha(alpha)
            .learning_rate(LearningRate::InvScaling)
            .eta0(0.1)
            .random_state(0);
        l2.fit(&x_target, &y_target)?;

        let prior = Prior::isotropic(source_coef.clone(), 1.0)?;
        let mut informed = SGDClassifier::new()
            .prior(prior)
            .alpha(alpha)
            .learning_rate(LearningRate::InvScaling)
            .eta0(0.1)
            .random_state(0);
        informed.fit(&x_target, &y_target)?;

        println!(
            "{:<10} {:>20} {:>20}",
            alpha,
            format!("{:.3}", l2.coef().expect("fitted").row(0)),
            format!("{:.3}", informed.coef().expect("fitted").row(0)),
        );
    }

    println!("\nWith strong regularization the L2 weights shrink toward zero,");
    println!("while the prior-regularized weights stay near the source task.");

    Ok(())
}
