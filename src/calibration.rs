//! Polynomial calibration of raw A/D voltages.
//!
//! Each channel carries a coefficient list `[c0, c1, c2, ...]` that maps a raw voltage `x`
//! onto a physical value:
//!
//! ```text
//! y = c0 + x*(c1 + x*(c2 + ...))
//! ```
//!
//! A single coefficient is a pure offset, `[0, 1]` is the identity. An empty list has no
//! meaning and is rejected when the polynomial is built, so evaluation itself never fails.
//!
//! # Example
//!
//! ```
//! use adread::calibration::Polynomial;
//!
//! let poly = Polynomial::new(vec![1.0, 2.0, 3.0])?;
//! assert_eq!(poly.evaluate(2.0), 17.0);
//! # Ok::<(), adread::error::AdreadError>(())
//! ```

use crate::error::{AdreadError, AppResult};
use serde::{Deserialize, Serialize};

/// Calibration polynomial with at least one coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    /// Build a polynomial, rejecting an empty coefficient list.
    pub fn new(coefficients: Vec<f64>) -> AppResult<Self> {
        if coefficients.is_empty() {
            return Err(AdreadError::Configuration(
                "calibration polynomial needs at least one coefficient".to_string(),
            ));
        }
        Ok(Self { coefficients })
    }

    /// Identity calibration `[0, 1]`.
    pub fn identity() -> Self {
        Self {
            coefficients: vec![0.0, 1.0],
        }
    }

    /// Coefficients in ascending power order.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Polynomial degree (0 for a constant).
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Evaluate at `x` using Horner's method.
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        horner(x, &self.coefficients)
    }
}

impl TryFrom<Vec<f64>> for Polynomial {
    type Error = AdreadError;

    fn try_from(coefficients: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(coefficients)
    }
}

impl From<Polynomial> for Vec<f64> {
    fn from(poly: Polynomial) -> Self {
        poly.coefficients
    }
}

/// Evaluate a coefficient list at `x`, failing if the list is empty.
pub fn evaluate(x: f64, coefficients: &[f64]) -> AppResult<f64> {
    if coefficients.is_empty() {
        return Err(AdreadError::Configuration(
            "cannot evaluate an empty calibration polynomial".to_string(),
        ));
    }
    Ok(horner(x, coefficients))
}

fn horner(x: f64, c: &[f64]) -> f64 {
    let mut acc = 0.0;
    for coeff in c[1..].iter().rev() {
        acc = x * (coeff + acc);
    }
    acc + c[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_raw_value_through() {
        let poly = Polynomial::new(vec![0.0, 1.0]).unwrap();
        for x in [-12.5, -0.001, 0.0, 0.5, 3.3, 1.0e6] {
            assert_eq!(poly.evaluate(x), x);
        }
    }

    #[test]
    fn single_coefficient_is_constant() {
        let poly = Polynomial::new(vec![2.0]).unwrap();
        assert_eq!(poly.degree(), 0);
        assert_eq!(poly.evaluate(0.0), 2.0);
        assert_eq!(poly.evaluate(-7.0), 2.0);
        assert_eq!(poly.evaluate(1234.5), 2.0);
    }

    #[test]
    fn quadratic_matches_hand_expansion() {
        let poly = Polynomial::new(vec![1.0, 2.0, 3.0]).unwrap();
        // 1 + 2*(2 + 3*2)
        assert_eq!(poly.evaluate(2.0), 17.0);

        let poly = Polynomial::new(vec![1.0, 0.0, 1.0]).unwrap();
        assert_eq!(poly.evaluate(2.0), 5.0);
    }

    #[test]
    fn empty_coefficients_rejected() {
        assert!(matches!(
            Polynomial::new(vec![]),
            Err(AdreadError::Configuration(_))
        ));
        assert!(evaluate(1.0, &[]).is_err());
    }

    #[test]
    fn free_function_agrees_with_polynomial() {
        let c = [0.25, -1.5, 0.75, 0.125];
        let poly = Polynomial::new(c.to_vec()).unwrap();
        for x in [-2.0, -0.5, 0.0, 1.0, 4.0] {
            assert_eq!(evaluate(x, &c).unwrap(), poly.evaluate(x));
        }
    }

    #[test]
    fn deserializes_from_flow_list() {
        let poly: Polynomial = serde_yaml::from_str("[0., 1.]").unwrap();
        assert_eq!(poly, Polynomial::identity());

        let empty: Result<Polynomial, _> = serde_yaml::from_str("[]");
        assert!(empty.is_err());
    }
}
