use ndarray::{Array1, Array2, Axis};

/// Z-score scaler with population statistics. Columns with no spread are
/// centred but not rescaled.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Self {
        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < 1e-10 { 1.0 } else { s });
        Self { means, scales }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.scales
    }
}
