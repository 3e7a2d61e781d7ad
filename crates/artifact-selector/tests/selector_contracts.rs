//! Contract tests for artifact selectors over realistic event sequences.

use artifact_selector::{
    ActionCompleted, AnySelector, Allowlist, Artifact, ArtifactSelector, AspectArtifactSelector,
    AspectSelectorOptions, BuildEvent, ExtraActionSelector, File, NamedSetOfFiles, OutputGroup,
    SelectorStateError, StatePayload, TargetCompleted, ASPECT_SELECTOR_STATE_TYPE,
};
use pretty_assertions::assert_eq;

fn options() -> AspectSelectorOptions {
    AspectSelectorOptions {
        file_name_allowlist: Allowlist::build([r".*\.kzip"]).unwrap(),
        output_group_allowlist: Allowlist::build(["g"]).unwrap(),
        target_aspect_allowlist: Allowlist::build(["kythe"]).unwrap(),
    }
}

fn selector() -> AspectArtifactSelector {
    AspectArtifactSelector::new(options())
}

fn fileset(id: &str, names: &[&str]) -> BuildEvent {
    nested_fileset(id, names, &[])
}

fn nested_fileset(id: &str, names: &[&str], children: &[&str]) -> BuildEvent {
    BuildEvent::NamedSetOfFiles(NamedSetOfFiles {
        id: id.to_string(),
        files: names
            .iter()
            .map(|n| File::new(*n, format!("bytestream://cas/{n}")))
            .collect(),
        file_sets: children.iter().map(|c| c.to_string()).collect(),
    })
}

fn target(label: &str, groups: &[(&str, &[&str])]) -> BuildEvent {
    BuildEvent::TargetCompleted(TargetCompleted {
        label: label.to_string(),
        aspect: "kythe".to_string(),
        success: true,
        output_groups: groups
            .iter()
            .map(|(name, ids)| OutputGroup {
                name: name.to_string(),
                file_sets: ids.iter().map(|i| i.to_string()).collect(),
            })
            .collect(),
    })
}

fn run<S: ArtifactSelector>(selector: &mut S, events: &[BuildEvent]) -> Vec<Option<Artifact>> {
    events.iter().map(|e| selector.select(e)).collect()
}

/// Scenario A: fileset arrives before the target that claims it.
#[test]
fn test_fileset_before_target() {
    let mut s = selector();

    assert_eq!(s.select(&fileset("fs1", &["out/foo.kzip"])), None);
    assert!(s.state().filesets.contains_key("fs1"));

    let artifact = s.select(&target("//x:y", &[("g", &["fs1"])])).unwrap();
    assert_eq!(artifact.id, "//x:y");
    assert_eq!(artifact.file_names(), vec!["out/foo.kzip"]);
    assert_eq!(
        s.state().disposed.iter().cloned().collect::<Vec<_>>(),
        vec!["fs1".to_string()]
    );
    assert!(s.state().filesets.is_empty());
    assert!(s.state().pending.is_empty());
}

/// Scenario B: target claims the fileset before it arrives.
#[test]
fn test_target_before_fileset() {
    let mut s = selector();

    assert_eq!(s.select(&target("//x:y", &[("g", &["fs1"])])), None);
    assert_eq!(s.state().pending.get("fs1").map(String::as_str), Some("//x:y"));

    let artifact = s.select(&fileset("fs1", &["out/foo.kzip"])).unwrap();
    assert_eq!(artifact.id, "//x:y");
    assert_eq!(artifact.file_names(), vec!["out/foo.kzip"]);
    assert!(s.state().disposed.contains("fs1"));
    assert!(s.state().pending.is_empty());
    assert!(s.state().filesets.is_empty());
}

#[test]
fn test_order_independence() {
    let fs = fileset("fs1", &["out/foo.kzip", "out/bar.kzip"]);
    let tc = target("//x:y", &[("g", &["fs1"])]);

    let mut forward = selector();
    let forward_out: Vec<Artifact> = run(&mut forward, &[fs.clone(), tc.clone()])
        .into_iter()
        .flatten()
        .collect();

    let mut reverse = selector();
    let reverse_out: Vec<Artifact> = run(&mut reverse, &[tc, fs]).into_iter().flatten().collect();

    assert_eq!(forward_out.len(), 1);
    assert_eq!(forward_out, reverse_out);
    assert_eq!(forward.state(), reverse.state());
}

#[test]
fn test_disposal_idempotence() {
    let mut s = selector();
    s.select(&fileset("fs1", &["out/foo.kzip"]));
    assert!(s.select(&target("//x:y", &[("g", &["fs1"])])).is_some());
    let settled = s.state().clone();

    let replays = [
        fileset("fs1", &["out/foo.kzip"]),
        target("//x:y", &[("g", &["fs1"])]),
        target("//x:other", &[("g", &["fs1"])]),
    ];
    for event in &replays {
        assert_eq!(s.select(event), None);
        assert_eq!(s.state(), &settled);
    }
}

#[test]
fn test_multiple_filesets_in_one_target_merge() {
    let mut s = selector();
    s.select(&fileset("fs1", &["out/a.kzip"]));
    s.select(&fileset("fs2", &["out/b.kzip"]));
    s.select(&fileset("fs3", &["out/c.kzip"]));

    let artifact = s
        .select(&target("//x:y", &[("g", &["fs2", "fs1"]), ("other", &["fs3"])]))
        .unwrap();
    assert_eq!(artifact.file_names(), vec!["out/b.kzip", "out/a.kzip"]);
    assert!(s.state().disposed.contains("fs1"));
    assert!(s.state().disposed.contains("fs2"));
    // fs3 belongs to a group outside the allowlist.
    assert!(s.state().filesets.contains_key("fs3"));
}

#[test]
fn test_partially_known_target() {
    let mut s = selector();
    s.select(&fileset("fs1", &["out/a.kzip"]));

    let first = s.select(&target("//x:y", &[("g", &["fs1", "fs2"])])).unwrap();
    assert_eq!(first.file_names(), vec!["out/a.kzip"]);
    assert_eq!(s.pending_filesets(), vec!["fs2".to_string()]);

    let second = s.select(&fileset("fs2", &["out/b.kzip"])).unwrap();
    assert_eq!(second.id, "//x:y");
    assert_eq!(second.file_names(), vec!["out/b.kzip"]);
}

#[test]
fn test_claimed_nested_fileset_pulls_known_children() {
    let mut s = selector();
    s.select(&fileset("child", &["out/child.kzip"]));
    assert_eq!(s.select(&target("//x:y", &[("g", &["root"])])), None);

    let artifact = s
        .select(&nested_fileset("root", &["out/root.kzip"], &["child"]))
        .unwrap();
    assert_eq!(artifact.file_names(), vec!["out/root.kzip", "out/child.kzip"]);
    assert!(s.state().filesets.is_empty());
}

#[test]
fn test_serialization_round_trip_matches_continuation() {
    let prefix = [
        fileset("fs1", &["out/a.kzip"]),
        target("//x:b", &[("g", &["fs2"])]),
        nested_fileset("fs3", &["out/c.kzip"], &["fs4"]),
        fileset("fs5", &["out/e.log"]),
    ];
    let suffix = [
        target("//x:a", &[("g", &["fs1"])]),
        fileset("fs2", &["out/b.kzip"]),
        target("//x:c", &[("g", &["fs3"])]),
        fileset("fs4", &["out/d.kzip"]),
        target("//x:b", &[("g", &["fs2"])]),
        fileset("fs1", &["out/a.kzip"]),
    ];

    let mut original = selector();
    run(&mut original, &prefix);

    let mut saved = StatePayload::default();
    assert!(original.serialize_into(&mut saved));
    assert_eq!(saved.type_url, ASPECT_SELECTOR_STATE_TYPE);

    let mut restored = selector();
    restored.deserialize_from(&saved).unwrap();
    assert_eq!(restored.state(), original.state());

    let expected = run(&mut original, &suffix);
    let actual = run(&mut restored, &suffix);
    assert_eq!(actual, expected);
    assert_eq!(expected.iter().flatten().count(), 4);
}

#[test]
fn test_empty_state_serializes() {
    let s = selector();
    let mut payload = StatePayload::default();
    assert!(s.serialize_into(&mut payload));
    assert!(!payload.value.is_empty());

    let mut restored = selector();
    assert_eq!(restored.deserialize(&[payload]), Ok(()));
    assert!(restored.state().is_empty());
}

#[test]
fn test_any_selector_copies_are_independent() {
    let mut first: AnySelector = selector().into();
    first.select(&fileset("fs1", &["out/a.kzip"]));

    let mut second = first.clone();
    assert!(second.select(&target("//x:y", &[("g", &["fs1"])])).is_some());
    // The copy consumed fs1; the original still holds it.
    assert!(first.select(&target("//x:y", &[("g", &["fs1"])])).is_some());
}

#[test]
fn test_any_selector_list_restores_each_variant() {
    let mut selectors: Vec<AnySelector> =
        vec![selector().into(), ExtraActionSelector::new(["compile"]).into()];
    for s in &mut selectors {
        s.select(&target("//x:y", &[("g", &["fs1"])]));
    }

    let states: Vec<StatePayload> = selectors
        .iter()
        .filter_map(|s| {
            let mut payload = StatePayload::default();
            s.serialize_into(&mut payload).then_some(payload)
        })
        .collect();
    assert_eq!(states.len(), 1);

    let mut fresh: Vec<AnySelector> =
        vec![selector().into(), ExtraActionSelector::new(["compile"]).into()];
    for s in &mut fresh {
        s.deserialize(&states).unwrap();
    }
    assert!(fresh[0].select(&fileset("fs1", &["out/a.kzip"])).is_some());

    let mut lonely: AnySelector = selector().into();
    assert!(matches!(
        lonely.deserialize(&[]),
        Err(SelectorStateError::NotFound { .. })
    ));
}

#[test]
fn test_extra_action_allowlists() {
    let events: Vec<BuildEvent> = [("compile", true), ("compile", false), ("link", true)]
        .iter()
        .map(|(action_type, success)| {
            BuildEvent::ActionCompleted(ActionCompleted {
                action_type: action_type.to_string(),
                success: *success,
                primary_output: Some(File::new(format!("out/{action_type}.xa"), "")),
                label: format!("//pkg:{action_type}"),
            })
        })
        .collect();

    let mut any = ExtraActionSelector::default();
    let selected: Vec<String> = run(&mut any, &events)
        .into_iter()
        .flatten()
        .map(|a| a.id)
        .collect();
    assert_eq!(selected, vec!["//pkg:compile", "//pkg:link"]);

    let mut only_compile = ExtraActionSelector::new(["compile"]);
    let selected: Vec<String> = run(&mut only_compile, &events)
        .into_iter()
        .flatten()
        .map(|a| a.id)
        .collect();
    assert_eq!(selected, vec!["//pkg:compile"]);
}

#[test]
fn test_events_decode_from_json_lines() {
    let lines = [
        r#"{"kind":"started","uuid":"abc"}"#,
        r#"{"kind":"named_set_of_files","id":"fs1","files":[{"name":"out/foo.kzip","uri":"file:///foo"}]}"#,
        r#"{"kind":"target_completed","label":"//x:y","aspect":"kythe","success":true,"output_groups":[{"name":"g","file_sets":["fs1"]}]}"#,
    ];
    let mut s = selector();
    let artifacts: Vec<Artifact> = lines
        .iter()
        .map(|l| serde_json::from_str::<BuildEvent>(l).unwrap())
        .filter_map(|e| s.select(&e))
        .collect();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].files[0].uri, "file:///foo");
}
