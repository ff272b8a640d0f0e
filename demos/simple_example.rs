use ndarray::array;
use priorsgd::dataset::{make_blobs, train_test_split};
use priorsgd::{Loss, SGDClassifier, StandardScaler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== SGD Classification Example ===\n");

    // Three well separated groups of points
    let centers = array![[0.0, 5.0], [5.0, 0.0], [-5.0, -5.0]];
    let (x, y) = make_blobs(&centers, 50, 1.0, 7)?;
    let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, 0.25, 7)?;

    println!("Training samples: {}", x_train.nrows());
    println!("Test samples: {}", x_test.nrows());

    let mut scaler = StandardScaler::new();
    let x_train = scaler.fit_transform(&x_train)?;
    let x_test = scaler.transform(&x_test)?;

    let mut model = SGDClassifier::new()
        .loss(Loss::Log)
        .alpha(1e-3)
        .random_state(0);
    model.fit(&x_train, &y_train)?;

    println!("\nModel trained in {} epochs", model.n_iter());
    println!("Classes: {:?}", model.classes().unwrap_or_default());
    println!("Coefficients:\n{:.3}", model.coef().expect("fitted"));
    println!("Intercepts: {:.3}", model.intercept().expect("fitted"));

    let accuracy = model.score(&x_test, &y_test)?;
    println!("\nTest accuracy: {:.2}%", accuracy * 100.0);

    let proba = model.predict_proba(&x_test)?;
    println!("\nFirst test sample probabilities: {:.3}", proba.row(0));

    Ok(())
}
