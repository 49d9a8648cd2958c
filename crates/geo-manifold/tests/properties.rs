//! Algebraic properties of the Euclidean inner product.

use std::sync::Arc;

use geo_manifold::{Backend, BackendKind, EuclideanSpace, RiemannianMetric};
use proptest::prelude::*;

const DIMS: &[usize] = &[1, 2, 3, 5, 8];

fn bounded() -> impl Strategy<Value = f64> {
    -100.0_f64..100.0_f64
}

/// A dimension plus two same-length batches of `n` points and a scalar.
fn case() -> impl Strategy<Value = (usize, usize, Vec<f64>, Vec<f64>, f64)> {
    (prop::sample::select(DIMS), 1usize..5).prop_flat_map(|(dim, n)| {
        (
            Just(dim),
            Just(n),
            prop::collection::vec(bounded(), dim * n),
            prop::collection::vec(bounded(), dim * n),
            -10.0_f64..10.0_f64,
        )
    })
}

fn backends() -> Vec<Arc<dyn Backend>> {
    BackendKind::ALL
        .into_iter()
        .filter(|kind| kind.is_available())
        .map(|kind| kind.create().unwrap())
        .collect()
}

fn eval(backend: &Arc<dyn Backend>, a: &geo_manifold::Array) -> Vec<f64> {
    backend.eval(a).unwrap().data_f64().unwrap().to_vec()
}

fn close(x: f64, y: f64) -> bool {
    (x - y).abs() <= 1e-9 * x.abs().max(y.abs()).max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inner_product_is_symmetric((dim, n, a, b, _s) in case()) {
        for backend in backends() {
            let space = EuclideanSpace::with_backend(dim, Arc::clone(&backend)).unwrap();
            let x = backend.from_vec(a.clone(), &[n, dim]).unwrap();
            let y = backend.from_vec(b.clone(), &[n, dim]).unwrap();
            let xy = eval(&backend, &space.metric().inner_product(&x, &y).unwrap());
            let yx = eval(&backend, &space.metric().inner_product(&y, &x).unwrap());
            prop_assert_eq!(xy, yx);
        }
    }

    #[test]
    fn inner_product_matches_dot((dim, n, a, b, _s) in case()) {
        for backend in backends() {
            let space = EuclideanSpace::with_backend(dim, Arc::clone(&backend)).unwrap();
            let x = backend.from_vec(a.clone(), &[n, dim]).unwrap();
            let y = backend.from_vec(b.clone(), &[n, dim]).unwrap();
            let result = eval(&backend, &space.metric().inner_product(&x, &y).unwrap());
            prop_assert_eq!(result.len(), n);

            for (i, value) in result.iter().enumerate() {
                let row_a = backend.from_vec(a[i * dim..(i + 1) * dim].to_vec(), &[dim]).unwrap();
                let row_b = backend.from_vec(b[i * dim..(i + 1) * dim].to_vec(), &[dim]).unwrap();
                let dot = eval(&backend, &backend.dot(&row_a, &row_b).unwrap())[0];
                prop_assert!(close(*value, dot), "inner product {} != dot {}", value, dot);
            }
        }
    }

    #[test]
    fn inner_product_is_bilinear((dim, n, a, b, s) in case()) {
        for backend in backends() {
            let space = EuclideanSpace::with_backend(dim, Arc::clone(&backend)).unwrap();
            let metric = space.metric();
            let x = backend.from_vec(a.clone(), &[n, dim]).unwrap();
            let y = backend.from_vec(b.clone(), &[n, dim]).unwrap();

            // <s*x + y, y> == s*<x, y> + <y, y>
            let sx_plus_y = backend.add(&backend.scale(&x, s).unwrap(), &y).unwrap();
            let lhs = eval(&backend, &metric.inner_product(&sx_plus_y, &y).unwrap());
            let xy = eval(&backend, &metric.inner_product(&x, &y).unwrap());
            let yy = eval(&backend, &metric.inner_product(&y, &y).unwrap());

            for i in 0..n {
                let rhs = s * xy[i] + yy[i];
                prop_assert!(
                    (lhs[i] - rhs).abs() <= 1e-7 * lhs[i].abs().max(rhs.abs()).max(1.0),
                    "bilinearity failed: {} != {}", lhs[i], rhs
                );
            }
        }
    }

    #[test]
    fn single_point_broadcasts_against_batch((dim, n, a, b, _s) in case()) {
        for backend in backends() {
            let space = EuclideanSpace::with_backend(dim, Arc::clone(&backend)).unwrap();
            let single = backend.from_vec(a[..dim].to_vec(), &[dim]).unwrap();
            let batch = backend.from_vec(b.clone(), &[n, dim]).unwrap();
            let result = space.metric().inner_product(&single, &batch).unwrap();
            prop_assert_eq!(result.shape().dims(), &[n, 1]);
            let mirrored = space.metric().inner_product(&batch, &single).unwrap();
            prop_assert_eq!(eval(&backend, &result), eval(&backend, &mirrored));
        }
    }
}
