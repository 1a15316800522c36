//! Planner invariants over random cone fields.

use nalgebra::Point2;
use proptest::prelude::*;
use trackline_core::{MarkerRole, ObservedMarker, PathPlanner, PlannerConfig, ZoneState};

fn cone_field() -> impl Strategy<Value = Vec<ObservedMarker>> {
    prop::collection::vec((0usize..3, -15.0f64..15.0, -5.0f64..60.0), 0..48).prop_map(|raw| {
        raw.into_iter()
            .map(|(role, x, y)| ObservedMarker::new(x, y, MarkerRole::ALL[role]))
            .collect()
    })
}

fn assert_adjacent_within(chain: &[Point2<f64>], gate: f64) {
    for pair in chain.windows(2) {
        assert!(nalgebra::distance(&pair[0], &pair[1]) <= gate);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_planner_invariants(
        cones in cone_field(),
        steps in prop::collection::vec(0.0f64..6.0, 1..12),
        constant_velocity in any::<bool>(),
    ) {
        let config = PlannerConfig { constant_velocity, ..Default::default() };
        let v_max = config.v_max;
        let v_const = config.v_const;

        // Reveal the field as a growing prefix, as perception would
        let reveal = |cycle: usize| &cones[..(cones.len() * cycle / steps.len()).min(cones.len())];

        let mut vehicle = Point2::new(0.0, 0.0);
        let mut planner = PathPlanner::new(vehicle, reveal(0), config);
        let mut previous = planner.path();

        for (i, step) in steps.iter().enumerate() {
            vehicle.y += step;
            let path = planner.update(reveal(i + 1), vehicle);

            // Append-only path
            prop_assert!(path.len() >= previous.len());
            prop_assert_eq!(&path.xs[..previous.len()], &previous.xs[..]);
            prop_assert_eq!(&path.ys[..previous.len()], &previous.ys[..]);
            prop_assert_eq!(path.velocities.len(), path.len());

            for &v in &path.velocities {
                prop_assert!((0.0..=v_max).contains(&v));
                if constant_velocity {
                    prop_assert!(v == v_const || v == 0.0);
                }
            }
            if planner.zone_state() == ZoneState::Finished {
                prop_assert_eq!(path.velocities.last(), Some(&0.0));
            }

            assert_adjacent_within(&planner.left_chain(), planner.config().cycle_gate);
            assert_adjacent_within(&planner.right_chain(), planner.config().cycle_gate);

            previous = path;
        }
    }

    #[test]
    fn prop_replaying_a_snapshot_keeps_prefix(cones in cone_field()) {
        let mut planner = PathPlanner::new(Point2::origin(), &cones, PlannerConfig::default());
        let first = planner.path();
        let chains = (planner.left_chain(), planner.right_chain());

        let second = planner.update(&cones, Point2::origin());
        prop_assert!(planner.left_chain().starts_with(&chains.0));
        prop_assert!(planner.right_chain().starts_with(&chains.1));
        prop_assert_eq!(&second.xs[..first.len()], &first.xs[..]);
        prop_assert_eq!(&second.ys[..first.len()], &first.ys[..]);
    }
}
