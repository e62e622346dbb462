use ndarray::{Array1, ArrayView1};
use std::ops::Deref;

/// Sorted contiguous copy of a sample, NaN values go to the end
#[derive(Clone, Debug, PartialEq)]
pub struct SortedArray(Array1<f64>);

impl SortedArray {
    pub fn median(&self) -> f64 {
        assert_ne!(self.len(), 0);
        let i = (self.len() - 1) / 2;
        if self.len() % 2 == 0 {
            0.5 * (self[i] + self[i + 1])
        } else {
            self[i]
        }
    }
}

impl From<Vec<f64>> for SortedArray {
    fn from(mut v: Vec<f64>) -> Self {
        v.sort_unstable_by(f64::total_cmp);
        Self(Array1::from_vec(v))
    }
}

impl From<&[f64]> for SortedArray {
    fn from(s: &[f64]) -> Self {
        s.to_vec().into()
    }
}

impl From<ArrayView1<'_, f64>> for SortedArray {
    fn from(v: ArrayView1<'_, f64>) -> Self {
        v.to_vec().into()
    }
}

impl Deref for SortedArray {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        self.0
            .as_slice()
            .expect("SortedArray is always contiguous")
    }
}

#[allow(clippy::float_cmp)]
#[cfg(test)]
mod tests {
    use super::*;

    use rand::prelude::*;

    #[test]
    fn median_odd_and_even() {
        let odd: SortedArray = vec![3.0, 1.0, 2.0].into();
        assert_eq!(odd.median(), 2.0);
        let even: SortedArray = vec![4.0, 1.0, 3.0, 2.0].into();
        assert_eq!(even.median(), 2.5);
    }

    #[test]
    fn median_does_not_depend_on_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut v: Vec<f64> = (0..101).map(|_| rng.random::<f64>()).collect();
        let a: SortedArray = v.clone().into();
        v.shuffle(&mut rng);
        let b: SortedArray = v.into();
        assert_eq!(a.median(), b.median());
        assert!(a.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn nan_goes_last() {
        let a: SortedArray = vec![f64::NAN, 1.0, 0.0].into();
        assert_eq!(&a[..2], &[0.0, 1.0]);
        assert!(a[2].is_nan());
    }
}
