use ndarray::{Array1, Array2, Axis};

use crate::error::{EvalError, Result};

/// L2-penalised least squares with an unpenalised intercept.
///
/// Minimises `||y - Xβ - b||² + α||β||²` via the closed form on centred data.
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    alpha: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if self.alpha < 0.0 {
            return Err(EvalError::Model(format!("invalid ridge alpha {}", self.alpha)));
        }
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(EvalError::Model(format!(
                "ridge needs matching non-empty inputs, got {} rows and {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| EvalError::Model("empty design matrix".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..gram.nrows() {
            gram[[i, i]] += self.alpha;
        }
        let rhs = xc.t().dot(&yc);

        let coefficients = cholesky_solve(&gram, &rhs)?;
        self.intercept = y_mean - x_mean.dot(&coefficients);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| EvalError::Model("ridge model has not been fitted".to_string()))?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

/// Solves `A x = b` for symmetric positive definite `A`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return Err(EvalError::Model(
                        "normal equations are not positive definite".to_string(),
                    ));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tiny_alpha_recovers_linear_relation() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 3.0], [4.0, 2.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) - x.column(1).mapv(|v| 0.5 * v) + 1.0;

        let mut model = RidgeRegression::new(1e-9);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-6);
        assert!((coef[1] + 0.5).abs() < 1e-6);
        assert!((model.intercept - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_penalty_shrinks_coefficients() {
        let x = array![[-1.0], [0.0], [1.0], [2.0]];
        let y = array![-2.0, 0.0, 2.0, 4.0];

        let mut loose = RidgeRegression::new(0.1);
        let mut tight = RidgeRegression::new(10.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        // Centred x has sum of squares 5, so beta = 10 / (5 + alpha).
        assert!((tight.coefficients.as_ref().unwrap()[0] - 10.0 / 15.0).abs() < 1e-12);
        assert!(tight.coefficients.as_ref().unwrap()[0] < loose.coefficients.as_ref().unwrap()[0]);

        let pred = tight.predict(&array![[0.5]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 1e-12, "prediction at the mean of x is the mean of y");
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = RidgeRegression::new(1.0);
        assert!(model.predict(&array![[1.0]]).is_err());
    }
}
