//! Change-set translation rules: additions, content changes, removals, and
//! container removal, including their effect on the scheduler and overlay.

use lumen_analysis::context::{AnalysisContext, AnalysisOptions, ChangeSet, DirectoryContainer};
use lumen_analysis::project::MemoryContentProvider;
use lumen_analysis::{DiagnosticCode, Source, SourceKind};
use rstest::rstest;

fn context() -> (AnalysisContext, MemoryContentProvider) {
    AnalysisContext::in_memory(AnalysisOptions::default())
}

fn add(
    context: &mut AnalysisContext,
    provider: &MemoryContentProvider,
    path: &str,
    text: &str,
) -> Source {
    provider.set(path, text);
    let source = context.intern_path(path);
    context.apply_change_set(ChangeSet::new().added(source));
    source
}

fn drain(context: &mut AnalysisContext) {
    let mut steps = 0;
    while context.perform_analysis_task().is_some() {
        steps += 1;
        assert!(steps < 10_000);
    }
}

#[test]
fn test_added_source_starts_all_invalid_and_queued() {
    let (mut context, provider) = context();
    provider.set("app.lm", "library app;\n");
    let app = context.intern_path("app.lm");
    context.apply_change_set(ChangeSet::new().added(app));

    assert!(context.known_sources().contains(&app));
    assert_eq!(context.pending_sources(), vec![app]);
    assert!(context.get_kind(app).is_none());
}

#[test]
fn test_batched_change_set_applies_every_event() {
    let (mut context, provider) = context();
    let keep = add(&mut context, &provider, "keep.lm", "library keep;\n");
    let gone = add(&mut context, &provider, "gone.lm", "library gone;\n");
    drain(&mut context);

    provider.set("new.lm", "library new_lib;\n");
    let new_lib = context.intern_path("new.lm");
    provider.remove("gone.lm");
    context.apply_change_set(
        ChangeSet::new()
            .added(new_lib)
            .changed_content(keep, "library keep;\nentry;\n")
            .removed(gone),
    );

    assert!(context.pending_sources().contains(&new_lib));
    assert!(context.pending_sources().contains(&keep));
    assert!(!context.known_sources().contains(&gone));

    drain(&mut context);
    assert_eq!(context.get_is_entry_point(keep), Some(true));
    assert_eq!(context.get_kind(new_lib), Some(SourceKind::Library));
}

#[test]
fn test_changed_content_updates_the_overlay() {
    let (mut context, provider) = context();
    let app = add(&mut context, &provider, "app.lm", "library app;\n");
    drain(&mut context);

    // The change set carries the new text; the provider still has the old.
    context.apply_change_set(
        ChangeSet::new().changed_content(app, "library app;\nimport \"core:web\";\n"),
    );
    drain(&mut context);
    assert_eq!(context.get_is_client(app), Some(true));
}

#[test]
fn test_changed_without_content_refetches_from_provider() {
    let (mut context, provider) = context();
    let app = add(&mut context, &provider, "app.lm", "library app;\n");
    drain(&mut context);
    assert_eq!(context.get_is_entry_point(app), Some(false));

    provider.set("app.lm", "library app;\nentry;\n");
    context.apply_change_set(ChangeSet::new().changed(app));
    drain(&mut context);
    assert_eq!(context.get_is_entry_point(app), Some(true));
}

#[test]
fn test_change_to_unknown_source_is_treated_as_addition() {
    let (mut context, _provider) = context();
    let app = context.intern_path("app.lm");
    context.apply_change_set(
        ChangeSet::new().changed_content(app, "library app;\n"),
    );
    assert!(context.known_sources().contains(&app));
    drain(&mut context);
    assert_eq!(context.get_kind(app), Some(SourceKind::Library));
}

#[test]
fn test_set_contents_none_withdraws_the_overlay() {
    let (mut context, provider) = context();
    let app = add(&mut context, &provider, "app.lm", "library app;\n");
    context.set_contents(app, Some("library app;\nentry;\n"));
    drain(&mut context);
    assert_eq!(context.get_is_entry_point(app), Some(true));

    // Withdrawing the overlay falls back to the provider's content.
    context.set_contents(app, None);
    drain(&mut context);
    assert_eq!(context.get_is_entry_point(app), Some(false));
}

#[test]
fn test_container_removal_matches_by_path_prefix() {
    let (mut context, provider) = context();
    let in_a = add(&mut context, &provider, "pkg/a.lm", "library a;\n");
    let in_b = add(&mut context, &provider, "pkg/sub/b.lm", "library b;\n");
    let outside = add(&mut context, &provider, "other/c.lm", "library c;\n");
    drain(&mut context);

    context.apply_change_set(ChangeSet::new().removed_container(DirectoryContainer::new("pkg")));

    let known = context.known_sources();
    assert!(!known.contains(&in_a));
    assert!(!known.contains(&in_b));
    assert!(known.contains(&outside));
}

#[test]
fn test_container_removal_by_closure_predicate() {
    let (mut context, provider) = context();
    let markup = add(&mut context, &provider, "index.lmx", "<page/>");
    let lib = add(&mut context, &provider, "app.lm", "library app;\n");
    drain(&mut context);

    context.apply_change_set(
        ChangeSet::new().removed_container(|path: &str| path.ends_with(".lmx")),
    );

    let known = context.known_sources();
    assert!(!known.contains(&markup));
    assert!(known.contains(&lib));
}

#[test]
fn test_removal_re_diagnoses_dangling_markup_references() {
    let (mut context, provider) = context();
    let app = add(&mut context, &provider, "app.lm", "library app;\n");
    let index = add(
        &mut context,
        &provider,
        "index.lmx",
        "<script src=\"app.lm\"/>",
    );
    drain(&mut context);
    assert_eq!(context.compute_errors(index).unwrap(), Vec::new());

    provider.remove("app.lm");
    context.apply_change_set(ChangeSet::new().removed(app));
    assert!(context.pending_sources().contains(&index));

    drain(&mut context);
    let errors = context.compute_errors(index).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, DiagnosticCode::DanglingScriptReference);
}

#[test]
fn test_stamp_advances_on_every_change() {
    let (mut context, provider) = context();
    let app = add(&mut context, &provider, "app.lm", "library app;\n");
    drain(&mut context);
    let first = context.get_parsed_unit(app).unwrap().stamp;

    context.apply_change_set(ChangeSet::new().changed_content(app, "library app;\n\n"));
    drain(&mut context);
    let second = context.get_parsed_unit(app).unwrap().stamp;
    assert!(second > first);
}

#[rstest]
#[case("app.lm", "library app;\n", SourceKind::Library)]
#[case("app.lm", "part of app;\n", SourceKind::Part)]
#[case("app.lm", "// nothing but comments\n", SourceKind::Library)]
#[case("app.lm", "%% unparseable %%", SourceKind::Library)]
#[case("index.lmx", "<page/>", SourceKind::Markup)]
fn test_added_source_classifies_by_content(
    #[case] path: &str,
    #[case] text: &str,
    #[case] expected: SourceKind,
) {
    let (mut context, provider) = context();
    let source = add(&mut context, &provider, path, text);
    drain(&mut context);
    assert_eq!(context.get_kind(source), Some(expected));
}

#[test]
fn test_priority_order_reassignment_demotes_previous_pins() {
    let (mut context, provider) = context();
    let a = add(&mut context, &provider, "a.lm", "library a;\n");
    let b = add(&mut context, &provider, "b.lm", "library b;\n");
    let c = add(&mut context, &provider, "c.lm", "library c;\n");

    context.set_analysis_priority_order(vec![a, b]);
    assert_eq!(&context.pending_sources()[..2], &[a, b]);

    context.set_analysis_priority_order(vec![c]);
    let pending = context.pending_sources();
    // c leads; a and b fell back to their kind-derived class but stayed
    // queued.
    assert_eq!(pending[0], c);
    assert!(pending.contains(&a));
    assert!(pending.contains(&b));
}
