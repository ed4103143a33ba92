use super::*;

fn buffer(content: &str) -> OpenFile {
    let node = FileNode::new("main", "py", content);
    OpenFile::from_node(&node, content.to_string())
}

#[test]
fn test_new_buffer_is_clean() {
    let file = buffer("print(1)");
    assert!(!file.has_unsaved_changes());
    assert_eq!(file.content(), file.original_content());
    assert_eq!(file.display_name(), "main.py");
}

#[test]
fn test_edit_and_revert_tracks_dirty() {
    let mut file = buffer("a");
    assert!(file.set_content("b".into()));
    assert!(file.has_unsaved_changes());

    assert!(file.set_content("a".into()));
    assert!(!file.has_unsaved_changes());
    assert_eq!(file.edit_version(), 2);
}

#[test]
fn test_same_content_is_not_an_edit() {
    let mut file = buffer("a");
    assert!(!file.set_content("a".into()));
    assert_eq!(file.edit_version(), 0);
}

#[test]
fn test_mark_saved_with_stale_snapshot_stays_dirty() {
    let mut file = buffer("a");
    file.set_content("b".into());
    file.set_content("c".into());

    file.mark_saved("b".into());
    assert_eq!(file.original_content(), "b");
    assert!(file.has_unsaved_changes());

    file.mark_saved("c".into());
    assert!(!file.has_unsaved_changes());
}

#[test]
fn test_reset_baseline_is_not_an_edit() {
    let mut file = buffer("loading");
    file.reset_baseline("real".into());
    assert_eq!(file.content(), "real");
    assert!(!file.has_unsaved_changes());
}
