//! Chunking properties of the apply orchestrator

use magistrat_apply::{ApplyConfig, PatchApplier, SimHost};
use magistrat_model::ReconcileState;
use magistrat_test_utils::{bulk_deck, font_family_patches};
use proptest::prelude::*;
use std::sync::Arc;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_patch_lands_once_in_bounded_chunks(count in 1usize..200, chunk_size in 1usize..100) {
        let deck = bulk_deck(count);
        let patches = font_family_patches(&deck, "Aptos");
        let host = Arc::new(SimHost::new(deck));
        let applier = PatchApplier::new(
            host.clone(),
            ApplyConfig::default()
                .with_chunk_size(chunk_size)
                .with_yield_between_chunks(false),
        );

        let records = block_on(applier.apply(&patches)).unwrap();

        let sizes = host.call_sizes();
        prop_assert_eq!(sizes.iter().sum::<usize>(), count);
        prop_assert_eq!(sizes.len(), count.div_ceil(chunk_size));
        prop_assert!(sizes.iter().all(|&s| s >= 1 && s <= chunk_size));

        let revisions: Vec<String> = host
            .apply_calls()
            .into_iter()
            .filter_map(|c| c.required_revision_id)
            .collect();
        let expected: Vec<String> = (1..=sizes.len()).map(|n| format!("r{n}")).collect();
        prop_assert_eq!(revisions, expected);

        prop_assert_eq!(records.len(), count);
        prop_assert!(records.iter().all(|r| r.reconcile_state == ReconcileState::Applied));
    }
}
