//! Integration tests: copy/paste through the editor session (flow-editor).

use flow_core::{GraphSnapshot, NodeKind, Point};
use flow_editor::*;
use pretty_assertions::assert_eq;

fn editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    Editor::default()
}

#[test]
fn repeated_paste_staggers_copies() {
    let mut ed = editor();
    let source = ed.add_node(NodeKind::Process, Point::new(100.0, 100.0), NodeOptions::default()).unwrap();
    ed.select(vec![source]);
    ed.copy().unwrap();

    let first = ed.paste().unwrap();
    let second = ed.paste().unwrap();
    assert_eq!(ed.graph().node(first[0]).unwrap().position, Point::new(130.0, 130.0));
    assert_eq!(ed.graph().node(second[0]).unwrap().position, Point::new(160.0, 160.0));
    assert!(first[0] != source && second[0] != source && first[0] != second[0]);
    assert_eq!(ed.clipboard().status().paste_count, 2);
}

#[test]
fn start_node_cannot_be_copied() {
    let mut ed = editor();
    let start = ed.add_node(NodeKind::Start, Point::default(), NodeOptions::default()).unwrap();
    ed.select(vec![start]);
    assert!(matches!(ed.copy(), Err(ClipboardError::NothingCopyable)));
    assert!(ed.clipboard().is_empty());
    assert!(matches!(ed.paste(), Err(ClipboardError::Empty)));
}

#[test]
fn pasted_container_keeps_its_copied_children() {
    let mut ed = editor();
    let group = ed.add_node(NodeKind::Container, Point::new(0.0, 0.0), NodeOptions::default()).unwrap();
    let task = ed.add_node(NodeKind::Process, Point::new(40.0, 40.0), NodeOptions::default()).unwrap();
    ed.embed(group, task).unwrap();
    ed.select(vec![task, group]);
    assert_eq!(ed.copy().unwrap(), 2);

    let before = ed.snapshot();
    let pasted = ed.paste().unwrap();
    let (new_task, new_group) = (pasted[0], pasted[1]);
    assert_eq!(ed.graph().parent_of(new_task), Some(new_group));
    assert_eq!(ed.graph().parent_of(task), Some(group));
    assert_eq!(ed.graph().node(new_group).unwrap().position, Point::new(30.0, 30.0));

    assert!(ed.undo());
    assert_eq!(ed.snapshot(), before);
}

#[test]
fn clipboard_survives_export_and_import() {
    let mut ed = editor();
    let a = ed.add_node(NodeKind::GroupSetting, Point::new(10.0, 20.0), NodeOptions::default()).unwrap();
    ed.select(vec![a]);
    ed.copy().unwrap();
    let bytes = ed.clipboard().to_bytes().unwrap();

    let mut imported = ClipboardManager::new(ClipboardConfig::default());
    assert_eq!(imported.load_bytes(&bytes).unwrap(), 1);
    let mut history = CommandHistory::new(10);
    let mut doc = Document::new();
    let pasted = imported.paste(&mut history, &mut doc).unwrap();

    let node = doc.graph.node(pasted[0]).unwrap();
    assert_eq!(node.kind, NodeKind::GroupSetting);
    assert_eq!(node.position, Point::new(40.0, 50.0));
    assert_eq!(GraphSnapshot::capture(&doc.graph).nodes.len(), 1);
}
