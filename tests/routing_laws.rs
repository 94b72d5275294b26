use action_regression::regressor::{LinearRegressor, TabularRegressor};
use action_regression::{ActionRegressor, ActionTable, FitParams};
use ndarray::{arr1, arr2, Array1, Array2, Axis};
use proptest::prelude::*;

const N_ACTIONS: usize = 3;

// rows of (state_0, state_1, action, sort key); action N_ACTIONS is not in the table
fn labeled_rows() -> impl Strategy<Value = Vec<(u8, u8, u8, u32)>> {
    prop::collection::vec((0u8..3, 0u8..3, 0u8..=N_ACTIONS as u8, any::<u32>()), 0..40)
}

fn to_batch(rows: &[(u8, u8, u8, u32)]) -> Array2<f64> {
    let mut batch = Array2::<f64>::zeros((rows.len(), 3));
    for (i, &(s0, s1, a, _)) in rows.iter().enumerate() {
        batch[[i, 0]] = s0 as f64;
        batch[[i, 1]] = s1 as f64;
        batch[[i, 2]] = a as f64;
    }
    batch
}

fn trained() -> ActionRegressor<TabularRegressor> {
    let mut regressor = ActionRegressor::new(
        TabularRegressor::new(-1.0, 1.0).unwrap(),
        ActionTable::enumerate(N_ACTIONS).unwrap(),
    );
    let mut x = Array2::<f64>::zeros((27, 3));
    let mut y = Array1::<f64>::zeros(27);
    for i in 0..27 {
        x[[i, 0]] = (i % 3) as f64;
        x[[i, 1]] = ((i / 3) % 3) as f64;
        x[[i, 2]] = (i / 9) as f64;
        y[i] = i as f64 + 0.5;
    }
    regressor.fit(x.view(), y.view(), &FitParams::new()).unwrap();
    regressor
}

proptest! {
    #[test]
    fn predict_commutes_with_row_permutation(rows in labeled_rows()) {
        let regressor = trained();
        let batch = to_batch(&rows);
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by_key(|&i| rows[i].3);
        let permuted = batch.select(Axis(0), &order);

        let direct = regressor.predict(batch.view()).unwrap();
        let from_permuted = regressor.predict(permuted.view()).unwrap();
        prop_assert_eq!(from_permuted, direct.select(Axis(0), &order));
    }

    #[test]
    fn every_row_lands_in_at_most_one_partition(rows in labeled_rows()) {
        let regressor = trained();
        let partitions = regressor.partition(to_batch(&rows).view()).unwrap();
        let mut seen = vec![0usize; rows.len()];
        for (action, idxs) in partitions.iter().enumerate() {
            for &i in idxs {
                prop_assert_eq!(rows[i].2 as usize, action);
                seen[i] += 1;
            }
        }
        for (i, &count) in seen.iter().enumerate() {
            let known = (rows[i].2 as usize) < N_ACTIONS;
            prop_assert_eq!(count, usize::from(known));
        }
    }

    #[test]
    fn unknown_actions_always_predict_zero(rows in labeled_rows()) {
        let regressor = trained();
        let batch = to_batch(&rows);
        let predictions = regressor.predict(batch.view()).unwrap();
        for (i, row) in rows.iter().enumerate() {
            if row.2 as usize == N_ACTIONS {
                prop_assert_eq!(predictions[i], 0.0);
            } else {
                prop_assert!(predictions[i] > 0.0);
            }
        }
    }
}

#[test]
fn fitting_one_action_leaves_the_others_alone() {
    let mut regressor = trained();
    let probe = arr2(&[[0.0, 0.0], [1.0, 2.0], [2.0, 1.0]]);
    let before = regressor.predict_all_actions(probe.view()).unwrap();

    let x = arr2(&[[0.0, 0.0, 1.0], [1.0, 2.0, 1.0]]);
    regressor
        .fit(x.view(), arr1(&[100.0, 200.0]).view(), &FitParams::new())
        .unwrap();
    let after = regressor.predict_all_actions(probe.view()).unwrap();

    assert_eq!(after.column(0), before.column(0));
    assert_eq!(after.column(2), before.column(2));
    assert_eq!(after[[0, 1]], 100.0);
    assert_eq!(after[[1, 1]], 200.0);
    assert_eq!(after[[2, 1]], before[[2, 1]]);
}

#[test]
fn clones_share_nothing_with_the_prototype() {
    let prototype = LinearRegressor::new(0.0).unwrap();
    let mut regressor =
        ActionRegressor::new(prototype.clone(), ActionTable::enumerate(2).unwrap());
    let x = arr2(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
    regressor
        .fit(x.view(), arr1(&[1.0, 3.0, 5.0]).view(), &FitParams::new())
        .unwrap();
    assert_eq!(prototype, LinearRegressor::new(0.0).unwrap());
    assert!(regressor.models()[0].weights().is_some());
    assert!(regressor.models()[1].weights().is_none());
}

#[test]
fn three_row_batch_routes_rows_to_their_models() {
    let mut regressor = ActionRegressor::new(
        TabularRegressor::new(0.0, 1.0).unwrap(),
        ActionTable::from_rows(&[vec![0.0], vec![1.0]]).unwrap(),
    );
    let batch = arr2(&[[1.0, 2.0, 0.0], [3.0, 4.0, 1.0], [5.0, 6.0, 0.0]]);
    regressor
        .fit(batch.view(), arr1(&[10.0, 20.0, 30.0]).view(), &FitParams::new())
        .unwrap();

    assert_eq!(regressor.models()[0].len(), 2);
    assert_eq!(regressor.models()[1].len(), 1);
    assert_eq!(
        regressor.predict(batch.view()).unwrap(),
        arr1(&[10.0, 20.0, 30.0])
    );

    let unknown = arr2(&[[1.0, 2.0, 2.0]]);
    assert_eq!(regressor.predict(unknown.view()).unwrap(), arr1(&[0.0]));
}
