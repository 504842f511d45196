use logogram_core::db::open_db_in_memory;
use logogram_core::service::composer::{
    blend_opacities, indicator_radius, BLEND_MAX_OPACITY, BLEND_MIN_OPACITY, BLEND_ROTATION_DEG,
    COMPOSITE_ROTATION_STEP_DEG,
};
use logogram_core::{
    render_composition, BlendInput, CompositionMode, DisabledArchiveSink, GraphemeStore,
    ParameterVector, PhraseComposer, SqliteGraphemeRepository,
};

fn memory_store() -> GraphemeStore<SqliteGraphemeRepository> {
    GraphemeStore::new(
        SqliteGraphemeRepository::new(open_db_in_memory().unwrap()),
        Box::new(DisabledArchiveSink),
    )
}

fn blend_input<'a>(phrase: &'a str, parameters: &'a ParameterVector) -> BlendInput<'a> {
    BlendInput { phrase, parameters }
}

#[test]
fn single_mode_drops_stop_words_and_keeps_one_layer() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);

    let composition = composer
        .compose_single("The cat sat", &ParameterVector::default(), None)
        .unwrap();

    assert_eq!(composition.mode, CompositionMode::Single);
    assert_eq!(composition.tokens, vec!["cat", "sat"]);
    assert_eq!(composition.layers.len(), 1);
    assert_eq!(composition.layers[0].glyphs.len(), 2);
    assert_eq!(composition.graphemes.len(), 2);
    assert!(composition.center_indicator.is_none());
}

#[test]
fn repeated_words_share_one_grapheme() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);

    let composition = composer
        .compose_single("echo echo echo", &ParameterVector::default(), None)
        .unwrap();

    assert_eq!(composition.tokens.len(), 3);
    assert_eq!(composition.layers[0].glyphs.len(), 3);
    assert_eq!(composition.graphemes.len(), 1);
}

#[test]
fn stop_word_only_phrase_falls_back_to_whole_input() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);

    let composition = composer
        .compose_single("  The ", &ParameterVector::default(), None)
        .unwrap();

    assert_eq!(composition.tokens, vec!["the"]);
    assert!(store.get("the").unwrap().is_some());
}

#[test]
fn composite_emits_one_shrinking_rotated_layer_per_clause() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);

    let composition = composer
        .compose_composite("sun rises\n\nmoon sets", &ParameterVector::default(), None)
        .unwrap();

    assert_eq!(composition.layers.len(), 2);
    let (outer, inner) = (&composition.layers[0], &composition.layers[1]);
    assert_eq!(outer.placement.rotation_deg, 0.0);
    assert_eq!(inner.placement.rotation_deg, COMPOSITE_ROTATION_STEP_DEG);
    assert!(inner.placement.scale < outer.placement.scale);
    assert!(inner.placement.opacity < outer.placement.opacity);

    let svg = render_composition(&composition);
    assert_eq!(svg.matches("<g class=\"layer\"").count(), 2);
    assert!(svg.contains(
        "<g class=\"layer\" data-index=\"1\" transform=\"rotate(30.000) scale(0.820)\" opacity=\"0.850\">"
    ));
}

#[test]
fn composite_reuses_graphemes_from_earlier_requests() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);

    let single = composer
        .compose_single("river", &ParameterVector::default(), None)
        .unwrap();
    let composite = composer
        .compose_composite(
            "river bends\nriver ends",
            &ParameterVector {
                certainty: 1.0,
                ..ParameterVector::default()
            },
            None,
        )
        .unwrap();

    assert_eq!(single.graphemes["river"], composite.graphemes["river"]);
}

#[test]
fn blend_boundaries_show_one_phrase_at_full_strength() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);
    let params = ParameterVector::default();

    let primary_only = composer
        .compose_blend(
            blend_input("calm sea", &params),
            blend_input("storm", &params),
            0.0,
            None,
        )
        .unwrap();
    assert_eq!(primary_only.layers[0].placement.opacity, BLEND_MAX_OPACITY);
    assert_eq!(primary_only.layers[1].placement.opacity, BLEND_MIN_OPACITY);

    let secondary_only = composer
        .compose_blend(
            blend_input("calm sea", &params),
            blend_input("storm", &params),
            1.0,
            None,
        )
        .unwrap();
    assert_eq!(secondary_only.layers[0].placement.opacity, BLEND_MIN_OPACITY);
    assert_eq!(secondary_only.layers[1].placement.opacity, BLEND_MAX_OPACITY);
}

#[test]
fn blend_layers_counter_rotate_around_a_shared_indicator() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);
    let params = ParameterVector::default();

    let composition = composer
        .compose_blend(
            blend_input("dawn", &params),
            blend_input("dusk", &params),
            0.5,
            Some(7),
        )
        .unwrap();

    assert_eq!(composition.mode, CompositionMode::Blend);
    assert_eq!(composition.tokens, vec!["dawn", "dusk"]);
    assert_eq!(composition.layers[0].placement.rotation_deg, BLEND_ROTATION_DEG);
    assert_eq!(composition.layers[1].placement.rotation_deg, -BLEND_ROTATION_DEG);
    assert_eq!(composition.center_indicator, Some(indicator_radius(0.5)));
    assert!(render_composition(&composition).contains("<circle class=\"indicator\""));
}

#[test]
fn blend_opacity_is_monotonic_in_weight() {
    let mut previous = blend_opacities(0.0);
    for step in 1..=10 {
        let current = blend_opacities(f64::from(step) / 10.0);
        assert!(current.0 < previous.0);
        assert!(current.1 > previous.1);
        previous = current;
    }
}

#[test]
fn identical_inputs_compose_identically() {
    let store = memory_store();
    let composer = PhraseComposer::new(&store);
    let params = ParameterVector::default();

    let first = composer.compose_single("quiet forest", &params, None).unwrap();
    let second = composer.compose_single("quiet forest", &params, None).unwrap();
    assert_eq!(first, second);

    let pinned = composer.compose_single("quiet forest", &params, Some(1)).unwrap();
    let repinned = composer.compose_single("quiet forest", &params, Some(1)).unwrap();
    assert_eq!(render_composition(&pinned), render_composition(&repinned));
}
