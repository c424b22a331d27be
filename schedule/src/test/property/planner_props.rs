use proptest::prelude::*;

use strata_ir::test::property::generators::arb_graph_recipe;

use crate::test::helpers::assert_no_live_overlap;
use crate::{OptimizerConfig, PlannerConfig, data_malloc_on, optimize_with_config};

fn alignment() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), Just(8), Just(64)]
}

proptest! {
    #[test]
    fn live_tensors_never_overlap(recipe in arb_graph_recipe(), alignment in alignment()) {
        let mut g = recipe.build();
        let config = PlannerConfig::builder().alignment(alignment).build();
        let plan = data_malloc_on(&mut g, strata_device::cpu().unwrap(), &config).unwrap();

        prop_assert_eq!(plan.allocations.len(), g.num_tensors());
        assert_no_live_overlap(&g, &plan, alignment);
    }

    #[test]
    fn every_tensor_gets_a_blob(recipe in arb_graph_recipe()) {
        let mut g = recipe.build();
        let plan = data_malloc_on(&mut g, strata_device::cpu().unwrap(), &PlannerConfig::default()).unwrap();

        let largest = g.tensors().map(|(_, t)| t.bytes()).max().unwrap_or(0);
        prop_assert!(plan.peak >= largest);
        for (_, tensor) in g.tensors() {
            let blob = tensor.blob().unwrap();
            prop_assert!(blob.shares_allocation(&plan.buffer));
            prop_assert_eq!(blob.size(), tensor.bytes());
            prop_assert!(blob.offset() + blob.size() <= plan.peak);
        }
    }

    #[test]
    fn planning_after_optimization(recipe in arb_graph_recipe()) {
        let mut g = recipe.build();
        optimize_with_config(&mut g, &OptimizerConfig::default()).unwrap();
        let plan = data_malloc_on(&mut g, strata_device::cpu().unwrap(), &PlannerConfig::default()).unwrap();

        assert_no_live_overlap(&g, &plan, 8);
        prop_assert_eq!(g.validate(), Ok(()));
    }
}
