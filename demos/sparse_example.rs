use ndarray::array;
use priorsgd::{CsrMatrix, Penalty, SGDClassifier};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Sparse Input Example ===\n");

    // Bag-of-words style features: most entries are zero
    let dense = array![
        [1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
        [2.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        [1.0, 0.0, 1.0, 3.0, 0.0, 0.0],
        [0.0, 2.0, 0.0, 0.0, 1.0, 0.0],
        [0.0, 1.0, 0.0, 0.0, 2.0, 1.0],
        [0.0, 3.0, 0.0, 0.0, 1.0, 0.0]
    ];
    let y = array![1.0, 1.0, 1.0, -1.0, -1.0, -1.0];
    let x = CsrMatrix::from_dense(&dense);

    println!("Matrix: {} x {}, {} non-zeros", x.nrows(), x.ncols(), x.nnz());

    let mut model = SGDClassifier::new()
        .penalty(Penalty::ElasticNet)
        .l1_ratio(0.5)
        .alpha(0.01)
        .random_state(3);
    model.fit(&x, &y)?;

    println!("Weights: {:.3}", model.coef().expect("fitted").row(0));
    println!("Training accuracy: {:.2}%", model.score(&x, &y)? * 100.0);
    println!("Decision function:\n{:.3}", model.decision_function(&x)?);

    Ok(())
}
