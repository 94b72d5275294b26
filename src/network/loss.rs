use ndarray::Array2;

pub fn mse(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Option<f64> {
    (y_true - y_pred).map(|v| v.powf(2.0)).mean()
}

pub fn mse_prime(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> Array2<f64> {
    2.0 * (y_pred - y_true) / (y_true.len() as f64)
}
