use proptest::prelude::*;

use strata_ir::test::property::generators::arb_graph_recipe;

use crate::test::helpers::{eliminable_pairs, fusible_sites};
use crate::{OptimizerConfig, optimize_with_config};

proptest! {
    #[test]
    fn optimized_graphs_stay_valid(recipe in arb_graph_recipe()) {
        let mut g = recipe.build();
        optimize_with_config(&mut g, &OptimizerConfig::default()).unwrap();

        prop_assert_eq!(g.validate(), Ok(()));
        prop_assert!(g.is_sorted());
    }

    #[test]
    fn optimizer_reaches_fixed_point(recipe in arb_graph_recipe()) {
        let mut g = recipe.build();
        let stats = optimize_with_config(&mut g, &OptimizerConfig::default()).unwrap();

        prop_assert_eq!(fusible_sites(&g), 0);
        prop_assert_eq!(eliminable_pairs(&g), 0);

        let again = optimize_with_config(&mut g, &OptimizerConfig::default()).unwrap();
        prop_assert!(!again.changed());
        prop_assert_eq!(again.passes, 1);
        prop_assert!(stats.passes >= 1);
    }

    #[test]
    fn optimizer_preserves_graph_outputs(recipe in arb_graph_recipe()) {
        let mut g = recipe.build();
        let outputs = |g: &strata_ir::Graph| {
            let mut outputs: Vec<_> = g
                .outputs()
                .into_iter()
                .map(|id| {
                    let tensor = g.tensor(id).unwrap();
                    (tensor.fuid(), tensor.shape().clone())
                })
                .collect();
            outputs.sort_by_key(|(fuid, _)| *fuid);
            outputs
        };
        let before = outputs(&g);

        optimize_with_config(&mut g, &OptimizerConfig::default()).unwrap();
        g.shape_infer().unwrap();

        prop_assert_eq!(outputs(&g), before);
    }
}
