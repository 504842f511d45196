use logogram_core::{
    render_grapheme, CompositionMode, EngineConfig, EngineError, GenerateRequest,
    GraphemeRepository, LogogramEngine, ParameterVector, RequestValidationError,
    SqliteGraphemeRepository,
};
use std::sync::Arc;
use std::thread;

fn memory_engine() -> LogogramEngine<SqliteGraphemeRepository> {
    LogogramEngine::open(&EngineConfig::default()).unwrap()
}

#[test]
fn single_phrase_renders_content_words() {
    let engine = memory_engine();

    let response = engine.generate(&GenerateRequest::single("the cat sat")).unwrap();

    assert_eq!(response.tokens, vec!["cat", "sat"]);
    assert!(response.svg_document.starts_with("<?xml"));
    assert_eq!(response.svg_document.matches("<g class=\"glyph\"").count(), 2);
    assert!(!response.archived);
    assert!(response.archive_path.is_none());
    assert!(engine.store().get("cat").unwrap().is_some());
    assert!(engine.store().get("the").unwrap().is_none());
}

#[test]
fn identical_requests_are_byte_identical() {
    let engine = memory_engine();
    let request = GenerateRequest::composite("quiet river\nold bridge");

    let first = engine.generate(&request).unwrap();
    let second = engine.generate(&request).unwrap();

    assert_eq!(first.svg_document, second.svg_document);
    assert_ne!(first.logogram_id, second.logogram_id);
}

#[test]
fn later_parameters_do_not_restyle_existing_words() {
    let engine = memory_engine();

    let before = engine.generate(&GenerateRequest::single("lighthouse")).unwrap();
    let after = engine
        .generate(&GenerateRequest::single("lighthouse").with_parameters(ParameterVector {
            certainty: 1.0,
            emphasis: 1.0,
            negation: true,
            ..ParameterVector::default()
        }))
        .unwrap();

    assert_eq!(before.svg_document, after.svg_document);
}

#[test]
fn invalid_requests_are_rejected_before_storage() {
    let engine = memory_engine();

    let out_of_range = GenerateRequest::single("kite").with_parameters(ParameterVector {
        agency: -0.5,
        ..ParameterVector::default()
    });
    assert!(matches!(
        engine.generate(&out_of_range).unwrap_err(),
        EngineError::InvalidInput(RequestValidationError::Parameters { .. })
    ));
    assert!(engine.store().get("kite").unwrap().is_none());
}

#[test]
fn blank_phrase_renders_a_fallback_glyph() {
    let engine = memory_engine();

    for phrase in ["", " \n\t "] {
        let response = engine.generate(&GenerateRequest::single(phrase)).unwrap();
        assert_eq!(response.tokens, vec![""]);
        roxmltree::Document::parse(&response.svg_document).unwrap();
    }

    let grapheme = engine.store().get("").unwrap().unwrap();
    assert!(grapheme.archive_name.starts_with("blank-"));
    roxmltree::Document::parse(&render_grapheme(&grapheme)).unwrap();
}

#[test]
fn control_characters_never_reach_the_document() {
    let engine = memory_engine();

    let response = engine
        .generate(&GenerateRequest::single("the \u{1}"))
        .unwrap();

    assert_eq!(response.tokens, vec!["the"]);
    assert!(!response.svg_document.contains('\u{1}'));
    roxmltree::Document::parse(&response.svg_document).unwrap();

    let grapheme = engine.store().get("the").unwrap().unwrap();
    roxmltree::Document::parse(&render_grapheme(&grapheme)).unwrap();
}

#[test]
fn blend_request_round_trips_through_json() {
    let engine = memory_engine();
    let request: GenerateRequest = serde_json::from_str(
        r#"{
            "phrase_text": "I may go",
            "mode": "blend",
            "secondary_phrase": "I must stay",
            "blend_weight": 0.25,
            "parameters": {"modality": "possibility"},
            "secondary_parameters": {"modality": "obligation"}
        }"#,
    )
    .unwrap();
    assert_eq!(request.mode, CompositionMode::Blend);

    let logogram = engine.render(&request).unwrap();

    assert_eq!(logogram.composition.layers.len(), 2);
    assert_eq!(logogram.tokens(), ["may", "go", "must", "stay"]);
    assert!(logogram.svg_document.contains("<circle class=\"indicator\""));
}

#[test]
fn archives_logogram_and_graphemes_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database_path: Some(dir.path().join("graphemes.db")),
        grapheme_archive_dir: Some(dir.path().join("graphemes")),
        logogram_archive_dir: Some(dir.path().join("logograms")),
        ..EngineConfig::default()
    };
    let engine = LogogramEngine::open(&config).unwrap();

    let response = engine.generate(&GenerateRequest::single("amber field")).unwrap();

    assert!(response.archived);
    let path = response.archive_path.unwrap();
    assert_eq!(path.parent(), Some(dir.path().join("logograms").as_path()));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), response.svg_document);

    for word in ["amber", "field"] {
        let grapheme = engine.store().get(word).unwrap().unwrap();
        assert!(dir
            .path()
            .join("graphemes")
            .join(&grapheme.archive_name)
            .is_file());
    }
}

#[test]
fn archival_failure_does_not_fail_generation() {
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("not-a-dir");
    std::fs::write(&blocked, b"occupied").unwrap();
    let config = EngineConfig {
        logogram_archive_dir: Some(blocked),
        ..EngineConfig::default()
    };
    let engine = LogogramEngine::open(&config).unwrap();

    let response = engine.generate(&GenerateRequest::single("willow")).unwrap();

    assert!(!response.archived);
    assert!(response.archive_path.is_none());
    assert!(response.svg_document.contains("data-key=\"willow\""));
}

#[test]
fn shared_archive_directory_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        grapheme_archive_dir: Some(dir.path().to_path_buf()),
        logogram_archive_dir: Some(dir.path().to_path_buf()),
        ..EngineConfig::default()
    };

    assert!(matches!(
        LogogramEngine::open(&config),
        Err(EngineError::Config(_))
    ));
}

#[test]
fn concurrent_requests_agree_on_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        database_path: Some(dir.path().join("graphemes.db")),
        grapheme_archive_dir: Some(dir.path().join("graphemes")),
        ..EngineConfig::default()
    };
    let engine = Arc::new(LogogramEngine::open(&config).unwrap());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine
                    .generate(&GenerateRequest::composite("north wind\nsouth tide"))
                    .unwrap()
                    .svg_document
            })
        })
        .collect();

    let documents: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(documents.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(engine.store().repository().list_all().unwrap().len(), 4);
}
