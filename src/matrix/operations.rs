//! Host-side matrix operations

use super::types::{Matrix, MatrixType};
use rand::Rng;
use tracing::{debug, warn};

/// Creates the A and B inputs for the given fill pattern
pub fn initialize_matrices(matrix_type: MatrixType, width: usize) -> (Matrix, Matrix) {
    match matrix_type.constants() {
        Some((a, b)) => (Matrix::filled(width, a), Matrix::filled(width, b)),
        None => {
            let mut rng = rand::thread_rng();
            let mut random = || {
                let data = (0..width * width).map(|_| rng.gen_range(0.0..1.0)).collect();
                Matrix { width, data }
            };
            let a = random();
            let b = random();
            (a, b)
        }
    }
}

/// Naive host multiply, used to verify device output
pub fn cpu_matrix_multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let width = a.width();
    assert_eq!(width, b.width(), "matrix widths differ");
    let start = std::time::Instant::now();

    let (a, b) = (a.as_slice(), b.as_slice());
    let mut c = vec![0.0f32; width * width];
    for i in 0..width {
        for j in 0..width {
            let mut sum = 0.0f32;
            for k in 0..width {
                sum += a[i * width + k] * b[k * width + j];
            }
            c[i * width + j] = sum;
        }
    }

    debug!("host reference multiply of {width}x{width} took {:?}", start.elapsed());
    Matrix { width, data: c }
}

/// Outcome of an element-wise comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub mismatches: usize,
    pub max_diff: f32,
}

impl Comparison {
    pub fn matches(&self) -> bool {
        self.mismatches == 0
    }
}

/// Compares device output with a reference within `epsilon`
pub fn compare_results(device: &Matrix, reference: &Matrix, epsilon: f32) -> Comparison {
    let mut result = Comparison {
        mismatches: 0,
        max_diff: 0.0,
    };
    for (&d, &r) in device.as_slice().iter().zip(reference.as_slice()) {
        let diff = (d - r).abs();
        // NaN never compares greater, so test the negation
        if !(diff <= epsilon) {
            result.mismatches += 1;
            result.max_diff = result.max_diff.max(diff);
        }
    }
    if !result.matches() {
        warn!(
            "{} elements differ, max difference {}",
            result.mismatches, result.max_diff
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ones_and_twos_reference() {
        let (a, b) = initialize_matrices(MatrixType::OnesAndTwos, 4);
        let c = cpu_matrix_multiply(&a, &b);
        assert!(c.as_slice().iter().all(|&v| v == 8.0));
    }

    #[test]
    fn random_inputs_in_unit_range() {
        let (a, b) = initialize_matrices(MatrixType::Random, 8);
        assert_eq!(a.width(), 8);
        assert!(a.as_slice().iter().chain(b.as_slice()).all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn reference_non_square_values() {
        let a = Matrix::from_vec(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_vec(2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = cpu_matrix_multiply(&a, &b);
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn compare_counts_mismatches() {
        let a = Matrix::filled(2, 1.0);
        let mut b = Matrix::filled(2, 1.0);
        assert!(compare_results(&a, &b, 1e-6).matches());
        b.as_mut_slice()[3] = 1.5;
        let cmp = compare_results(&a, &b, 1e-6);
        assert_eq!(cmp.mismatches, 1);
        assert_eq!(cmp.max_diff, 0.5);
    }
}
