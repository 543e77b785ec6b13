//! Orchestrator scenarios against the simulated host

use async_trait::async_trait;
use magistrat_apply::{
    ApplyConfig, ApplyError, ApplyOptions, ApplyResult, DocumentCarrier, FidelityGate, HostError,
    HostRead, Mutation, PatchApplier, PresentationHost, SimHost, StateStore,
};
use magistrat_engine::{build_style_map, plan_patches, plan_restore, reconcile, run_checks};
use magistrat_model::{
    ContentHash, DocumentState, ExemplarMode, PatchChange, PatchOp, ReconcileState, Risk,
    TargetFingerprint,
};
use magistrat_test_utils::{
    bold_run, bulk_deck, deck, exemplar_title_slide, font_family_patches, init_tracing,
    mismatched_title_slide, slide, ShapeBuilder,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn applier(host: &Arc<SimHost>) -> PatchApplier {
    PatchApplier::new(host.clone(), ApplyConfig::default())
}

fn patch_on(slide_id: &str, object_id: &str, change: PatchChange) -> PatchOp {
    PatchOp {
        id: format!("patch-{object_id}"),
        change,
        target: TargetFingerprint {
            slide_id: slide_id.to_string(),
            object_id: object_id.to_string(),
            precondition_hash: ContentHash::default(),
        },
        risk: Risk::Safe,
        validations: Vec::new(),
        finding_id: None,
    }
}

fn aptos() -> PatchChange {
    PatchChange::SetFontFamily {
        font_family: "Aptos".to_string(),
    }
}

fn two_title_deck() -> magistrat_model::DeckSnapshot {
    deck(vec![slide(
        "s1",
        0,
        vec![
            ShapeBuilder::text("o1")
                .run(bold_run("One", "Calibri", 22.0))
                .build(),
            ShapeBuilder::text("o2")
                .run(bold_run("Two", "Calibri", 22.0))
                .build(),
        ],
    )])
}

#[tokio::test]
async fn large_batches_are_chunked_with_advancing_revisions() {
    init_tracing();
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let host = Arc::new(SimHost::new(deck));

    let records = applier(&host).apply(&patches).await.unwrap();

    assert_eq!(host.call_sizes(), [75, 75, 10]);
    let required: Vec<_> = host
        .apply_calls()
        .into_iter()
        .map(|c| c.required_revision_id.unwrap_or_default())
        .collect();
    assert_eq!(required, ["r1", "r2", "r3"]);
    assert_eq!(host.revision_id(), "r4");
    // Baseline and confirming read only; every call reported its revision.
    assert_eq!(host.read_count(), 2);

    assert_eq!(records.len(), 160);
    assert!(records
        .iter()
        .all(|r| r.reconcile_state == ReconcileState::Applied));
    let ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
    let submitted: Vec<_> = patches.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, submitted);
    assert_eq!(records[0].after.font_family.as_deref(), Some("Aptos"));
    assert_eq!(records[0].before.font_family.as_deref(), Some("Calibri"));
}

#[tokio::test]
async fn failed_chunk_returns_records_for_applied_prefix() {
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let host = Arc::new(SimHost::new(deck));
    host.fail_on_call(3, HostError::Transport("connection reset".to_string()));

    let err = applier(&host).apply(&patches).await.unwrap_err();

    assert!(matches!(err, ApplyError::Host { .. }));
    assert!(!err.is_retry_after_refresh());
    let partial = err.partial_records();
    assert_eq!(partial.len(), 150);
    for (record, patch) in partial.iter().zip(&patches) {
        assert_eq!(record.id, patch.id);
        assert_eq!(record.reconcile_state, ReconcileState::Applied);
    }
    // The failed chunk left the document untouched.
    let untouched = host.deck();
    let last = untouched.find_shape("slide-15", "shape-159").unwrap();
    assert_eq!(last.text_runs[0].font_family, "Calibri");
}

#[tokio::test]
async fn injected_conflict_is_a_retry_signal() {
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let host = Arc::new(SimHost::new(deck));
    host.fail_on_call(
        2,
        HostError::Other("Revision mismatch while writing".to_string()),
    );

    let err = applier(&host).apply(&patches).await.unwrap_err();

    assert!(err.is_retry_after_refresh());
    assert_eq!(err.partial_records().len(), 75);
}

/// Delegates to a [`SimHost`] and edits the deck behind the caller's back
/// after the first successful apply call
struct ConcurrentEditor {
    inner: Arc<SimHost>,
    edited: AtomicBool,
}

#[async_trait]
impl PresentationHost for ConcurrentEditor {
    async fn read_presentation(&self) -> Result<HostRead, HostError> {
        self.inner.read_presentation().await
    }

    async fn apply_mutations(
        &self,
        batch: &[Mutation],
        options: ApplyOptions,
    ) -> Result<ApplyResult, HostError> {
        let result = self.inner.apply_mutations(batch, options).await?;
        if !self.edited.swap(true, Ordering::SeqCst) {
            self.inner.edit_externally(|deck| deck.slides.truncate(1));
        }
        Ok(result)
    }
}

#[tokio::test]
async fn concurrent_edit_stops_the_next_chunk() {
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let sim = Arc::new(SimHost::new(deck));
    let editor = Arc::new(ConcurrentEditor {
        inner: sim.clone(),
        edited: AtomicBool::new(false),
    });

    let err = PatchApplier::new(editor, ApplyConfig::default())
        .apply(&patches)
        .await
        .unwrap_err();

    assert!(err.is_retry_after_refresh());
    assert_eq!(sim.call_sizes(), [75, 75]);
    let calls = sim.apply_calls();
    assert_eq!(calls[1].required_revision_id.as_deref(), Some("r2"));
    assert_eq!(sim.revision_id(), "r3");

    // Only the first slide survived the external edit.
    let partial = err.into_partial_records();
    assert_eq!(partial.len(), 75);
    let applied = partial
        .iter()
        .filter(|r| r.reconcile_state == ReconcileState::Applied)
        .count();
    assert_eq!(applied, 10);
}

#[tokio::test]
async fn missing_revision_ids_trigger_a_refresh_read() {
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let host = Arc::new(SimHost::new(deck));
    host.omit_revision_ids(true);

    let records = applier(&host).apply(&patches).await.unwrap();

    assert_eq!(records.len(), 160);
    let required: Vec<_> = host
        .apply_calls()
        .into_iter()
        .map(|c| c.required_revision_id.unwrap_or_default())
        .collect();
    assert_eq!(required, ["r1", "r2", "r3"]);
    // Baseline, one refresh per chunk, confirming read.
    assert_eq!(host.read_count(), 5);
}

/// Delegates to a [`SimHost`] but fails one chosen read (1-based)
struct FailingRead {
    inner: Arc<SimHost>,
    reads: AtomicUsize,
    fail_at: usize,
}

#[async_trait]
impl PresentationHost for FailingRead {
    async fn read_presentation(&self) -> Result<HostRead, HostError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(HostError::Transport("read timed out".to_string()));
        }
        self.inner.read_presentation().await
    }

    async fn apply_mutations(
        &self,
        batch: &[Mutation],
        options: ApplyOptions,
    ) -> Result<ApplyResult, HostError> {
        self.inner.apply_mutations(batch, options).await
    }
}

#[tokio::test]
async fn failed_revision_refresh_stops_the_apply() {
    let deck = bulk_deck(160);
    let patches = font_family_patches(&deck, "Aptos");
    let sim = Arc::new(SimHost::new(deck));
    sim.omit_revision_ids(true);
    // Read 1 is the baseline, read 2 the refresh after the first chunk.
    let host = Arc::new(FailingRead {
        inner: sim.clone(),
        reads: AtomicUsize::new(0),
        fail_at: 2,
    });

    let err = PatchApplier::new(host, ApplyConfig::default())
        .apply(&patches)
        .await
        .unwrap_err();

    assert!(!err.is_retry_after_refresh());
    match &err {
        ApplyError::Host { source, .. } => {
            assert_eq!(source, &HostError::Transport("read timed out".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    // No chunk went out under a revision known to be stale.
    assert_eq!(sim.call_sizes(), [75]);
    let partial = err.partial_records();
    assert_eq!(partial.len(), 75);
    assert!(partial
        .iter()
        .all(|r| r.reconcile_state == ReconcileState::Applied));
}

#[tokio::test]
async fn absent_targets_become_missing_target_records() {
    let host = Arc::new(SimHost::new(two_title_deck()));
    let patches = vec![
        patch_on("s1", "gone", aptos()),
        patch_on("s1", "o2", aptos()),
        patch_on("s9", "o1", aptos()),
    ];

    let records = applier(&host).apply(&patches).await.unwrap();

    let states: Vec<_> = records.iter().map(|r| r.reconcile_state).collect();
    assert_eq!(
        states,
        [
            ReconcileState::MissingTarget,
            ReconcileState::Applied,
            ReconcileState::MissingTarget
        ]
    );
    assert_eq!(records[0].id, "patch-gone");
    assert!(records[0].before.is_empty() && records[0].after.is_empty());
    assert_eq!(host.call_sizes(), [1]);
}

#[tokio::test]
async fn all_missing_targets_skip_the_host() {
    let host = Arc::new(SimHost::new(two_title_deck()));
    let records = applier(&host)
        .apply(&[patch_on("s1", "gone", aptos())])
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert!(host.apply_calls().is_empty());
}

#[tokio::test]
async fn non_safe_ops_are_rejected_before_any_host_call() {
    let host = Arc::new(SimHost::new(two_title_deck()));
    let patches = vec![
        patch_on("s1", "o1", aptos()),
        patch_on("s1", "o2", PatchChange::SetFontSize { font_size_pt: 30.0 }),
    ];

    let err = applier(&host).apply(&patches).await.unwrap_err();

    assert!(err.is_input_contract_violation());
    match err {
        ApplyError::NotApplyEligible { patch_id, op } => {
            assert_eq!(patch_id, "patch-o2");
            assert_eq!(op, "SET_FONT_SIZE");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.read_count(), 0);
    assert!(host.apply_calls().is_empty());
}

#[tokio::test]
async fn unreadable_typography_blocks_the_whole_batch() {
    let host = Arc::new(SimHost::new(deck(vec![slide(
        "s1",
        0,
        vec![
            ShapeBuilder::text("o1")
                .run(bold_run("One", "Calibri", 22.0))
                .build(),
            ShapeBuilder::text("o2")
                .run(bold_run("Two", "Calibri", 22.0))
                .typography_hidden()
                .build(),
        ],
    )])));
    let patches = vec![patch_on("s1", "o1", aptos()), patch_on("s1", "o2", aptos())];

    let err = applier(&host).apply(&patches).await.unwrap_err();

    assert!(matches!(
        err,
        ApplyError::FidelityBlocked {
            gate: FidelityGate::TypographyUnreadable,
            ..
        }
    ));
    assert!(host.apply_calls().is_empty());
    assert_eq!(host.revision_id(), "r1");
}

#[tokio::test]
async fn strict_ghosts_are_deleted() {
    let host = Arc::new(SimHost::new(deck(vec![slide(
        "s1",
        0,
        vec![
            ShapeBuilder::text("title")
                .run(bold_run("Visible", "Calibri", 22.0))
                .build(),
            ShapeBuilder::text("ghost")
                .run(bold_run("leftover", "Calibri", 22.0))
                .ghost()
                .build(),
        ],
    )])));

    let records = applier(&host)
        .apply(&[patch_on("s1", "ghost", PatchChange::DeleteGhostObject {})])
        .await
        .unwrap();

    assert_eq!(records[0].reconcile_state, ReconcileState::Applied);
    assert!(records[0].after.is_empty());
    assert!(host.deck().find_shape("s1", "ghost").is_none());
    assert!(host.deck().find_shape("s1", "title").is_some());
}

#[tokio::test]
async fn visible_shapes_cannot_be_deleted_as_ghosts() {
    let host = Arc::new(SimHost::new(two_title_deck()));
    let err = applier(&host)
        .apply(&[patch_on("s1", "o1", PatchChange::DeleteGhostObject {})])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApplyError::FidelityBlocked {
            gate: FidelityGate::NotStrictGhost,
            ..
        }
    ));
}

#[tokio::test]
async fn small_chunks_from_config() {
    let deck = bulk_deck(7);
    let patches = font_family_patches(&deck, "Aptos");
    let host = Arc::new(SimHost::new(deck));
    let config = ApplyConfig::from_toml_str("chunk_size = 3\nyield_between_chunks = false\n").unwrap();

    let records = PatchApplier::new(host.clone(), config)
        .apply(&patches)
        .await
        .unwrap();

    assert_eq!(records.len(), 7);
    assert_eq!(host.call_sizes(), [3, 3, 1]);
}

#[tokio::test]
async fn state_survives_a_carrier_round_trip() {
    let host = Arc::new(SimHost::with_carrier(two_title_deck(), "Presenter notes"));
    let store = StateStore::new(host.clone());

    let records = applier(&host)
        .apply(&[patch_on("s1", "o1", aptos())])
        .await
        .unwrap();
    let state = DocumentState {
        patch_log: records.clone(),
        ..DocumentState::default()
    };
    let saved = store.save(state).await.unwrap();
    assert!(saved.last_updated > DocumentState::default().last_updated);

    let carrier = host.carrier();
    assert!(carrier.starts_with("Presenter notes\n"));
    assert_eq!(carrier.matches("MAGISTRAT_STATE_V1_START").count(), 1);

    // Saving again replaces the block instead of appending another.
    store.save(saved.clone()).await.unwrap();
    assert_eq!(host.carrier().matches("MAGISTRAT_STATE_V1_START").count(), 1);

    let loaded = StateStore::new(host.clone()).load().await;
    assert_eq!(loaded.patch_log, records);
}

#[tokio::test]
async fn unreadable_state_block_falls_back_to_default() {
    let host = Arc::new(SimHost::with_carrier(
        two_title_deck(),
        "<!-- MAGISTRAT_STATE_V1_START -->\nnot json\n<!-- MAGISTRAT_STATE_V1_END -->",
    ));
    let loaded = StateStore::new(host).load().await;
    assert_eq!(loaded, DocumentState::default());

    let memory = StateStore::in_memory();
    let saved = memory.save(DocumentState::default()).await.unwrap();
    assert_eq!(memory.load().await, saved);
}

#[tokio::test]
async fn corrupted_block_falls_back_to_cached_state() {
    let host = Arc::new(SimHost::new(two_title_deck()));
    let store = StateStore::new(host.clone());
    let saved = store.save(DocumentState::default()).await.unwrap();

    host.write_carrier(
        "<!-- MAGISTRAT_STATE_V1_START -->{oops<!-- MAGISTRAT_STATE_V1_END -->",
    )
    .await
    .unwrap();

    let loaded = store.load().await;
    assert_eq!(loaded, saved);
    assert!(loaded.last_updated > DocumentState::default().last_updated);
}

#[tokio::test]
async fn legacy_block_without_timestamp_loads() {
    let host = Arc::new(SimHost::with_carrier(
        two_title_deck(),
        r##"<!-- MAGISTRAT_STATE_V1_START -->
{"schemaVersion":1,"findings":[],"patchLog":[],"styleMap":{"TITLE":{"fontFamily":"Aptos Display","fontSizePt":30.0,"bold":true,"italic":false,"fontColor":"#1F1F1F"}}}
<!-- MAGISTRAT_STATE_V1_END -->"##,
    ));

    let loaded = StateStore::new(host).load().await;
    let style_map = loaded.style_map.unwrap();
    assert_eq!(style_map.len(), 1);
}

#[tokio::test]
async fn analyze_apply_reconcile_restore() {
    init_tracing();
    let style = build_style_map(&exemplar_title_slide(), ExemplarMode::Original);
    let live = deck(vec![exemplar_title_slide(), mismatched_title_slide()]);
    let host = Arc::new(SimHost::new(live.clone()));

    let checked = run_checks(&live, &style.style_map);
    let plan = plan_patches(&checked.findings, &checked.suggested_patches);
    assert_eq!(plan.safe.len(), 1);

    let records = applier(&host).apply(&plan.safe).await.unwrap();
    assert_eq!(records[0].reconcile_state, ReconcileState::Applied);
    assert_eq!(records[0].finding_id, plan.safe[0].finding_id.clone().unwrap());

    let fresh = reconcile(&records, &host.deck());
    assert_eq!(fresh[0].reconcile_state, ReconcileState::Applied);

    // A rerun after the fix no longer suggests the family patch.
    let rerun = run_checks(&host.deck(), &style.style_map);
    let replan = plan_patches(&rerun.findings, &rerun.suggested_patches);
    assert!(replan.safe.is_empty());

    let restore = plan_restore(&fresh[0]).unwrap();
    let restored = applier(&host).apply(&restore).await.unwrap();
    assert_eq!(restored[0].reconcile_state, ReconcileState::Applied);
    assert_eq!(
        reconcile(&fresh, &host.deck())[0].reconcile_state,
        ReconcileState::RevertedExternally
    );
}
