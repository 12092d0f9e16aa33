//! Integration tests: open a stored design, edit it through the editor
//! facade, and read back what reached the store.
//!
//! Everything runs on the in-memory surface and store with a paused tokio
//! clock, so autosave windows elapse instantly and deterministically.

use ab_core::*;
use ab_editor::*;
use pretty_assertions::assert_eq;

type TestEditor = Editor<MemorySurface, MemoryStore, Credential>;

// ─── Helpers ─────────────────────────────────────────────────────────────

const OWNER: &str = "user-42";

fn load_fixture(json: &str) -> DesignRecord {
    serde_json::from_str(json).expect("fixture is a valid design record")
}

fn editor_with(records: &[DesignRecord]) -> TestEditor {
    let store = MemoryStore::new();
    for record in records {
        store.insert(OWNER, record.clone());
    }
    let mut editor = Editor::new(EditorConfig::default(), store, Credential::new(OWNER));
    editor
        .attach_surface(MemorySurface::new(825.0, 465.0))
        .expect("fresh surface attaches");
    editor
}

fn blank_record(id: &str) -> DesignRecord {
    DesignRecord {
        id: Some(id.into()),
        name: Some("Blank".into()),
        width: Some(825.0),
        height: Some(465.0),
        ..Default::default()
    }
}

fn stored_document(editor: &TestEditor, id: &str) -> Document {
    let record = editor.store().peek(id).expect("design exists");
    decode_document(&record).expect("stored design decodes")
}

fn ids(doc: &Document) -> Vec<String> {
    doc.objects.iter().map(|o| o.id.to_string()).collect()
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn malformed_canvas_opens_blank() {
    let mut editor = editor_with(&[load_fixture(include_str!("fixtures/malformed.json"))]);

    let report = editor.open("broken-1").await.unwrap();
    assert_eq!(report.object_count, 0);
    assert!(matches!(
        report.recovered_from,
        Some(CodecError::InvalidJson(_))
    ));

    let surface = editor.surface().unwrap();
    assert!(surface.objects().is_empty());
    assert_eq!(surface.background(), Color::WHITE);
    assert_eq!(surface.dimensions(), (825.0, 465.0));
    assert_eq!(editor.session().document_name(), "Broken Flyer");
    // Loading is not an edit.
    assert!(!editor.session().modified);
    assert_eq!(editor.next_save_deadline(), None);
}

#[tokio::test(start_paused = true)]
async fn loaded_scene_matches_stored_document() {
    let record = load_fixture(include_str!("fixtures/layers.json"));
    let expected = decode_document(&record).unwrap();
    let mut editor = editor_with(&[record]);

    editor.open("layers-1").await.unwrap();
    let snapshot = editor
        .adapter()
        .capture_snapshot(Some("layers-1"), "Layered Card")
        .unwrap();
    assert_eq!(snapshot, expected);
}

#[tokio::test(start_paused = true)]
async fn missing_design_fails_to_load() {
    let mut editor = editor_with(&[]);
    let err = editor.open("nope").await.unwrap_err();
    assert_eq!(err, LoadError::Store(StoreError::NotFound("nope".into())));
    assert!(matches!(editor.loader().state(), LoadState::Failed(_)));
    assert!(!editor.session().loaded);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_leaves_design_unsaveable() {
    let mut editor = editor_with(&[blank_record("blank-1")]);
    editor.store().fail_next_gets(1);

    let err = editor.open("blank-1").await.unwrap_err();
    assert_eq!(err, LoadError::Store(StoreError::Request("HTTP 503".into())));
    assert!(matches!(editor.loader().state(), LoadState::Failed(_)));
    assert!(!editor.session().loaded);

    editor.add_shape(ShapePreset::Square).unwrap();
    assert!(!editor.session().modified);
    assert_eq!(editor.next_save_deadline(), None);
    assert_eq!(editor.save_now().await, None);
    assert_eq!(editor.store().save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_switch_never_overwrites_target() {
    let mut d2 = blank_record("d2");
    d2.canvas_data = Some(CanvasPayload::Encoded(
        r#"{"objects":[{"type":"circle","id":"d2-only","radius":12}]}"#.into(),
    ));
    let mut editor = editor_with(&[blank_record("d1"), d2]);
    editor.open("d1").await.unwrap();
    editor.add_shape(ShapePreset::Star).unwrap();
    assert_eq!(editor.run_until_idle().await, [SaveOutcome::Saved]);
    let d1_before = editor.store().peek("d1").unwrap();

    editor.store().fail_next_gets(1);
    assert!(editor.open("d2").await.is_err());
    assert_eq!(editor.session().document_id(), Some("d2"));
    // The previous design is no longer on screen.
    assert!(editor.surface().unwrap().objects().is_empty());

    editor.add_text("Lost", None).unwrap();
    assert!(editor.run_until_idle().await.is_empty());
    assert_eq!(editor.store().save_count(), 1);

    assert_eq!(ids(&stored_document(&editor, "d2")), ["d2-only"]);
    assert_eq!(editor.store().peek("d1").unwrap(), d1_before);
}

// ─── Editing and saving ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn new_text_is_saved_once() {
    let mut editor = editor_with(&[blank_record("blank-1")]);
    editor.open("blank-1").await.unwrap();

    let id = editor.add_text("Hello", None).unwrap();
    assert!(editor.session().modified);
    assert_eq!(editor.session().selected_object, Some(id));

    let outcomes = editor.run_until_idle().await;
    assert_eq!(outcomes, [SaveOutcome::Saved]);
    assert_eq!(editor.store().save_count(), 1);
    assert!(!editor.session().modified);
    assert_eq!(editor.session().save_status, SaveStatus::Saved);

    let doc = stored_document(&editor, "blank-1");
    assert_eq!(doc.objects.len(), 1);
    let text = &doc.objects[0];
    assert_eq!(text.transform.left, 100.0);
    assert_eq!(text.transform.top, 100.0);
    match &text.kind {
        ObjectKind::Text(attrs) => assert_eq!(attrs.content, "Hello"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn blur_filter_reads_as_percent() {
    let mut editor = editor_with(&[load_fixture(include_str!("fixtures/layers.json"))]);
    editor.open("layers-1").await.unwrap();

    editor
        .surface_mut()
        .unwrap()
        .user_select(ObjectId::intern("image-photo"))
        .unwrap();
    editor.process_events();

    let form = editor.selection().form().expect("image is selected");
    assert_eq!(
        form.details,
        VariantForm::Image(ImageForm {
            filter: FilterChoice::Blur,
            blur: 30,
        })
    );
    // Natural 800x600 at half scale.
    assert_eq!((form.width, form.height), (400.0, 300.0));
    // Selecting is not an edit.
    assert!(!editor.session().modified);
}

#[tokio::test(start_paused = true)]
async fn bring_to_front_is_persisted() {
    let mut editor = editor_with(&[load_fixture(include_str!("fixtures/layers.json"))]);
    editor.open("layers-1").await.unwrap();

    editor
        .surface_mut()
        .unwrap()
        .user_select(ObjectId::intern("rect-a"))
        .unwrap();
    editor.process_events();
    assert_eq!(editor.bring_to_front().unwrap(), EditOutcome::Applied);
    // Already on top.
    assert_eq!(editor.bring_to_front().unwrap(), EditOutcome::Unchanged);

    assert_eq!(editor.run_until_idle().await, [SaveOutcome::Saved]);
    assert_eq!(
        ids(&stored_document(&editor, "layers-1")),
        ["circle-b", "triangle-c", "image-photo", "rect-a"]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_property_value_is_one_edit() {
    let mut editor = editor_with(&[load_fixture(include_str!("fixtures/layers.json"))]);
    editor.open("layers-1").await.unwrap();
    editor
        .surface_mut()
        .unwrap()
        .user_select(ObjectId::intern("circle-b"))
        .unwrap();
    editor.process_events();

    let renders = editor.surface().unwrap().render_count();
    let generation = editor.persistence().edit_generation();
    let teal = Some(Color::rgb(0x2a, 0x9d, 0x8f));

    assert_eq!(
        editor.apply_property(ObjectProperty::Fill(teal)).unwrap(),
        EditOutcome::Applied
    );
    assert_eq!(
        editor.apply_property(ObjectProperty::Fill(teal)).unwrap(),
        EditOutcome::Unchanged
    );
    assert_eq!(editor.surface().unwrap().render_count(), renders + 1);
    assert_eq!(editor.persistence().edit_generation(), generation + 1);
    assert_eq!(
        editor.selection().form().unwrap().details,
        VariantForm::Shape { fill: teal }
    );
}

#[tokio::test(start_paused = true)]
async fn panel_edits_round_trip_through_store() {
    let mut editor = editor_with(&[blank_record("blank-1")]);
    editor.open("blank-1").await.unwrap();

    editor.add_text("Sale", Some(Color::rgb(255, 255, 0))).unwrap();
    editor.toggle_bold().unwrap();
    editor.toggle_underline().unwrap();
    editor.set_opacity(40).unwrap();
    editor.set_border_style(BorderStyle::Dashed).unwrap();
    editor.flip_horizontal().unwrap();
    editor.run_until_idle().await;

    let doc = stored_document(&editor, "blank-1");
    let text = &doc.objects[0];
    assert_eq!(text.opacity, 0.4);
    assert!(text.transform.flip_x);
    assert_eq!(BorderStyle::from_dash(&text.stroke.dash), BorderStyle::Dashed);
    match &text.kind {
        ObjectKind::Text(attrs) => {
            assert!(attrs.font.is_bold());
            assert!(attrs.underline);
            assert_eq!(attrs.background, Some(Color::rgb(255, 255, 0)));
            assert_eq!(attrs.padding, 10.0);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn clone_and_delete_follow_selection() {
    let mut editor = editor_with(&[blank_record("blank-1")]);
    editor.open("blank-1").await.unwrap();

    let original = editor.add_shape(ShapePreset::Star).unwrap();
    let copy = editor.clone_selected().unwrap().expect("something selected");
    assert_ne!(copy, original);
    assert_eq!(editor.session().selected_object, Some(copy));

    assert_eq!(editor.delete_selected().unwrap(), Some(copy));
    assert_eq!(editor.session().selected_object, None);
    assert_eq!(editor.delete_selected().unwrap(), None);

    editor.run_until_idle().await;
    assert_eq!(
        ids(&stored_document(&editor, "blank-1")),
        [original.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn freehand_stroke_is_one_edit() {
    let mut editor = editor_with(&[blank_record("blank-1")]);
    editor.open("blank-1").await.unwrap();
    editor.toggle_drawing();

    let points = (0..50).map(|i| Point::new(i as f32, i as f32 * 0.5)).collect();
    editor.surface_mut().unwrap().user_draw(points).unwrap();
    editor.process_events();
    assert_eq!(editor.persistence().edit_generation(), 1);

    editor.run_until_idle().await;
    let doc = stored_document(&editor, "blank-1");
    assert_eq!(doc.objects.len(), 1);
    assert_eq!(doc.objects[0].variant(), ObjectVariant::Freehand);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn surface_initializes_once() {
    let store = MemoryStore::new();
    store.insert(OWNER, blank_record("blank-1"));
    let mut editor: TestEditor =
        Editor::new(EditorConfig::default(), store, Credential::new(OWNER));

    let factory = MemorySurfaceFactory::new(825.0, 465.0);
    editor.initialize_surface(&factory).await.unwrap();
    assert_eq!(
        editor.initialize_surface(&factory).await,
        Err(SceneError::AlreadyInitializing)
    );
    editor.open("blank-1").await.unwrap();

    editor.unmount();
    // A fresh mount may initialize again.
    editor.mount();
    editor.initialize_surface(&factory).await.unwrap();
    assert!(editor.adapter().is_ready());
}

#[tokio::test(start_paused = true)]
async fn slow_surface_times_out() {
    let mut editor = editor_with(&[]);
    editor.unmount();
    let mut factory = MemorySurfaceFactory::new(825.0, 465.0);
    factory.delay = editor.config().surface_timeout() * 2;

    let err = editor.initialize_surface(&factory).await.unwrap_err();
    assert!(matches!(err, SceneError::SurfaceUnavailable(_)));
    assert!(!editor.adapter().is_ready());
}
