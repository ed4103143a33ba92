use super::*;
use crate::kernel::effect::RuntimeOp;
use crate::kernel::hydration::{ERROR_PLACEHOLDER, LOADING_PLACEHOLDER};
use crate::kernel::services::ports::HydrationError;
use crate::models::{placeholder_content, FileNode};

fn sample_tree() -> FolderNode {
    FolderNode::with_items(
        "root",
        vec![
            FileNode::new("main", "py", "print(1)").into(),
            FileNode::new("util", "js", "").into(),
            FolderNode::with_items("src", vec![FileNode::new("lib", "rs", "").into()]).into(),
        ],
    )
}

fn loaded_store() -> Store {
    let mut store = Store::default();
    store
        .dispatch(Action::InstallTree {
            workspace_id: "w1".into(),
            tree: Some(sample_tree()),
            persist: false,
        })
        .unwrap();
    store
}

fn node(store: &Store, path: &str) -> FileNode {
    FileNode::clone(store.state().tree().unwrap().file_at(path).unwrap())
}

fn open(store: &mut Store, path: &str) -> FileId {
    let file = node(store, path);
    let id = file.id.clone();
    store
        .dispatch(Action::OpenFile { file, cached: None })
        .unwrap();
    id
}

fn edit(store: &mut Store, id: &FileId, content: &str) -> DispatchResult {
    store
        .dispatch(Action::UpdateBufferContent {
            file_id: id.clone(),
            content: content.into(),
        })
        .unwrap()
}

#[test]
fn test_install_seeds_runtime_and_persists_templates() {
    let mut store = Store::default();
    let result = store
        .dispatch(Action::InstallTree {
            workspace_id: "w1".into(),
            tree: Some(sample_tree()),
            persist: true,
        })
        .unwrap();

    assert!(matches!(result.effects[0], Effect::Persist { ref workspace_id, .. } if workspace_id == "w1"));
    assert!(matches!(result.effects[1], Effect::SeedRuntime { .. }));
    assert!(store.is_loaded("w1"));
    assert!(!store.is_loaded("w2"));
}

#[test]
fn test_install_none_leaves_workspace_empty() {
    let mut store = Store::default();
    let result = store
        .dispatch(Action::InstallTree {
            workspace_id: "w1".into(),
            tree: None,
            persist: false,
        })
        .unwrap();
    assert!(result.effects.is_empty());
    assert!(!store.is_loaded("w1"));
    assert!(matches!(
        store.dispatch(Action::AddFolder {
            parent_path: String::new(),
            folder: FolderNode::new("x"),
        }),
        Err(StoreError::NoWorkspace)
    ));
}

#[test]
fn test_open_twice_only_activates() {
    let mut store = loaded_store();
    let main = open(&mut store, "main.py");
    let util = open(&mut store, "util.js");
    assert_eq!(store.state().active_file_id(), Some(&util));

    let result = store
        .dispatch(Action::OpenFile {
            file: node(&store, "main.py"),
            cached: None,
        })
        .unwrap();
    assert!(result.effects.is_empty());
    assert_eq!(store.state().open_files().len(), 2);
    assert_eq!(store.state().active_file_id(), Some(&main));
}

#[test]
fn test_update_buffer_tracks_dirty_and_writes_cache() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");

    let result = edit(&mut store, &id, "print(2)");
    assert!(result.state_changed);
    assert!(matches!(
        &result.effects[..],
        [Effect::CacheWrite { content, .. }] if content == "print(2)"
    ));
    assert!(store.state().open_file(&id).unwrap().has_unsaved_changes());

    // the tree keeps its stored content until a save
    assert_eq!(node(&store, "main.py").content, "print(1)");

    edit(&mut store, &id, "print(1)");
    assert!(!store.state().open_file(&id).unwrap().has_unsaved_changes());
}

#[test]
fn test_update_unknown_buffer_fails() {
    let mut store = loaded_store();
    let err = store
        .dispatch(Action::UpdateBufferContent {
            file_id: FileId::from("nope"),
            content: "x".into(),
        })
        .unwrap_err();
    assert_eq!(err, StoreError::FileNotOpen(FileId::from("nope")));
}

#[test]
fn test_close_discards_unsaved_edits() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(2)");

    store.dispatch(Action::CloseFile(id.clone())).unwrap();
    assert!(store.state().open_files().is_empty());
    assert_eq!(store.state().active_file_id(), None);

    open(&mut store, "main.py");
    assert_eq!(store.state().open_file(&id).unwrap().content(), "print(1)");
}

#[test]
fn test_open_uses_tree_copy_over_stale_node() {
    let mut store = loaded_store();
    let stale = node(&store, "main.py");
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(3)");
    store.begin_save(&id).unwrap();
    store.dispatch(Action::CloseFile(id.clone())).unwrap();

    store
        .dispatch(Action::OpenFile {
            file: stale,
            cached: None,
        })
        .unwrap();
    assert_eq!(store.state().open_file(&id).unwrap().content(), "print(3)");
}

#[test]
fn test_close_all_files() {
    let mut store = loaded_store();
    open(&mut store, "main.py");
    open(&mut store, "util.js");
    let result = store.dispatch(Action::CloseAllFiles).unwrap();
    assert!(result.state_changed);
    assert!(store.state().open_files().is_empty());
    assert!(!store.dispatch(Action::CloseAllFiles).unwrap().state_changed);
}

#[test]
fn test_set_active_file_requires_open_buffer() {
    let mut store = loaded_store();
    let main = open(&mut store, "main.py");
    open(&mut store, "util.js");

    store.dispatch(Action::SetActiveFile(main.clone())).unwrap();
    assert_eq!(store.state().active_file_id(), Some(&main));
    assert!(matches!(
        store.dispatch(Action::SetActiveFile(FileId::from("gone"))),
        Err(StoreError::FileNotOpen(_))
    ));
}

fn placeholder_store() -> (Store, FileNode) {
    let remote = FileNode::new("remote", "rs", placeholder_content("remote.rs"))
        .with_origin("https://example.invalid/remote.rs");
    let tree = FolderNode::with_items("root", vec![remote.clone().into()]);
    let mut store = Store::default();
    store
        .dispatch(Action::InstallTree {
            workspace_id: "w1".into(),
            tree: Some(tree),
            persist: false,
        })
        .unwrap();
    (store, remote)
}

#[test]
fn test_open_placeholder_uses_real_cached_content() {
    let (mut store, remote) = placeholder_store();
    let result = store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: Some("fn cached() {}".into()),
        })
        .unwrap();

    assert!(result.effects.is_empty());
    let buffer = store.state().open_file(&remote.id).unwrap();
    assert_eq!(buffer.content(), "fn cached() {}");
    assert!(!buffer.has_unsaved_changes());
}

#[test]
fn test_open_placeholder_ignores_placeholder_in_cache() {
    let (mut store, remote) = placeholder_store();
    let result = store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: Some(placeholder_content("remote.rs")),
        })
        .unwrap();

    assert!(matches!(
        &result.effects[..],
        [Effect::Hydrate { locator, .. }] if locator == "https://example.invalid/remote.rs"
    ));
    assert_eq!(
        store.state().open_file(&remote.id).unwrap().content(),
        LOADING_PLACEHOLDER
    );
}

#[test]
fn test_hydration_success_sets_baseline_and_caches() {
    let (mut store, remote) = placeholder_store();
    store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: None,
        })
        .unwrap();

    let result = store
        .dispatch(Action::HydrationFinished {
            file_id: remote.id.clone(),
            result: Ok("fn real() {}".into()),
        })
        .unwrap();
    assert!(matches!(
        &result.effects[..],
        [Effect::CacheWrite { content, .. }] if content == "fn real() {}"
    ));
    let buffer = store.state().open_file(&remote.id).unwrap();
    assert_eq!(buffer.content(), "fn real() {}");
    assert!(!buffer.has_unsaved_changes());
}

#[test]
fn test_hydration_failure_shows_error_without_dirty() {
    let (mut store, remote) = placeholder_store();
    store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: None,
        })
        .unwrap();

    let result = store
        .dispatch(Action::HydrationFinished {
            file_id: remote.id.clone(),
            result: Err(HydrationError::Decode("bad".into())),
        })
        .unwrap();
    assert!(result.effects.is_empty());
    let buffer = store.state().open_file(&remote.id).unwrap();
    assert_eq!(buffer.content(), ERROR_PLACEHOLDER);
    assert!(!buffer.has_unsaved_changes());
}

#[test]
fn test_late_hydration_does_not_clobber_edits() {
    let (mut store, remote) = placeholder_store();
    store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: None,
        })
        .unwrap();
    edit(&mut store, &remote.id, "typed while loading");

    let result = store
        .dispatch(Action::HydrationFinished {
            file_id: remote.id.clone(),
            result: Ok("fn real() {}".into()),
        })
        .unwrap();
    assert!(!result.state_changed);
    assert_eq!(
        store.state().open_file(&remote.id).unwrap().content(),
        "typed while loading"
    );
}

#[test]
fn test_save_while_loading_is_refused() {
    let (mut store, remote) = placeholder_store();
    store
        .dispatch(Action::OpenFile {
            file: remote.clone(),
            cached: None,
        })
        .unwrap();
    assert!(matches!(
        store.begin_save(&remote.id),
        Err(StoreError::BufferNotReady(_))
    ));
}

#[test]
fn test_add_file_emits_persist_then_write() {
    let mut store = loaded_store();
    let result = store
        .dispatch(Action::AddFile {
            parent_path: "root/src".into(),
            file: FileNode::new("mod", "rs", "pub mod a;"),
        })
        .unwrap();

    assert!(matches!(result.effects[0], Effect::Persist { .. }));
    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::WriteFile { path, content })
            if path == "src/mod.rs" && content == "pub mod a;"
    ));
    assert!(store.state().tree().unwrap().file_at("src/mod.rs").is_some());
}

#[test]
fn test_add_duplicate_file_touches_nothing() {
    let mut store = loaded_store();
    let before = Arc::clone(store.state().tree().unwrap());

    let err = store
        .dispatch(Action::AddFile {
            parent_path: "root".into(),
            file: FileNode::new("util", "js", ""),
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::Tree(TreeError::DuplicateName { .. })));
    assert!(Arc::ptr_eq(&before, store.state().tree().unwrap()));
}

#[test]
fn test_add_folder_and_delete_folder() {
    let mut store = loaded_store();
    let result = store
        .dispatch(Action::AddFolder {
            parent_path: "src".into(),
            folder: FolderNode::new("bin"),
        })
        .unwrap();
    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::Mkdir { path }) if path == "src/bin"
    ));

    let result = store
        .dispatch(Action::DeleteFolder {
            parent_path: "".into(),
            folder_name: "src".into(),
        })
        .unwrap();
    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::Remove { path, recursive: true }) if path == "src"
    ));
    assert!(store.state().tree().unwrap().folder_at("src").is_none());
}

#[test]
fn test_delete_file_keeps_open_buffer() {
    let mut store = loaded_store();
    let id = open(&mut store, "util.js");
    let result = store
        .dispatch(Action::DeleteFile {
            parent_path: "".into(),
            file: node(&store, "util.js"),
        })
        .unwrap();
    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::Remove { path, recursive: false }) if path == "util.js"
    ));
    assert!(store.state().is_open(&id));

    let err = store.begin_save(&id).unwrap_err();
    assert!(err.is_path_not_found());
}

#[test]
fn test_rename_file_follows_open_buffer() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    let result = store
        .dispatch(Action::RenameFile {
            parent_path: "".into(),
            file: node(&store, "main.py"),
            new_name: "app".into(),
            new_extension: "py".into(),
        })
        .unwrap();

    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::Rename { from, to }) if from == "main.py" && to == "app.py"
    ));
    assert_eq!(store.state().open_file(&id).unwrap().display_name(), "app.py");
    assert_eq!(
        store.state().tree().unwrap().find_path(&id).as_deref(),
        Some("app.py")
    );
}

#[test]
fn test_rename_to_same_name_is_a_no_op() {
    let mut store = loaded_store();
    let result = store
        .dispatch(Action::RenameFolder {
            parent_path: "".into(),
            folder_name: "src".into(),
            new_name: "src".into(),
        })
        .unwrap();
    assert!(result.effects.is_empty());
    assert!(!result.state_changed);
}

#[test]
fn test_rename_folder_moves_runtime_path() {
    let mut store = loaded_store();
    let result = store
        .dispatch(Action::RenameFolder {
            parent_path: "".into(),
            folder_name: "src".into(),
            new_name: "source".into(),
        })
        .unwrap();
    assert!(matches!(
        &result.effects[1],
        Effect::Runtime(RuntimeOp::Rename { from, to }) if from == "src" && to == "source"
    ));
}

#[test]
fn test_save_writes_tree_and_clears_flag_when_persisted() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(2)");

    let pending = store.begin_save(&id).unwrap();
    assert_eq!(pending.path, "main.py");
    assert!(matches!(
        &pending.effects[0],
        Effect::Runtime(RuntimeOp::WriteFile { path, content })
            if path == "main.py" && content == "print(2)"
    ));
    match &pending.effects[1] {
        Effect::Persist { tree, .. } => {
            assert_eq!(tree.file_at("main.py").unwrap().content, "print(2)")
        }
        other => panic!("unexpected effect {other:?}"),
    }

    assert!(store.finish_save(&pending, true).unwrap());
    let buffer = store.state().open_file(&id).unwrap();
    assert!(!buffer.has_unsaved_changes());
    assert_eq!(buffer.original_content(), buffer.content());
}

#[test]
fn test_save_keeps_flag_when_persistence_failed() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(2)");

    let pending = store.begin_save(&id).unwrap();
    assert!(!store.finish_save(&pending, false).unwrap());
    assert!(store.state().open_file(&id).unwrap().has_unsaved_changes());
}

#[test]
fn test_edit_during_save_stays_dirty() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(2)");
    let pending = store.begin_save(&id).unwrap();
    edit(&mut store, &id, "print(3)");

    store.finish_save(&pending, true).unwrap();
    let buffer = store.state().open_file(&id).unwrap();
    assert_eq!(buffer.original_content(), "print(2)");
    assert!(buffer.has_unsaved_changes());
}

#[test]
fn test_delete_during_save_reports_path_not_found() {
    let mut store = loaded_store();
    let id = open(&mut store, "main.py");
    edit(&mut store, &id, "print(2)");
    let pending = store.begin_save(&id).unwrap();

    store
        .dispatch(Action::DeleteFile {
            parent_path: "".into(),
            file: node(&store, "main.py"),
        })
        .unwrap();

    let err = store.finish_save(&pending, true).unwrap_err();
    assert!(err.is_path_not_found());
    assert!(store.state().open_file(&id).unwrap().has_unsaved_changes());
}

#[test]
fn test_begin_save_all_persists_final_tree() {
    let mut store = loaded_store();
    let main = open(&mut store, "main.py");
    let lib = open(&mut store, "src/lib.rs");
    open(&mut store, "util.js");
    edit(&mut store, &main, "print(2)");
    edit(&mut store, &lib, "fn lib() {}");

    let (pending, failed) = store.begin_save_all();
    assert!(failed.is_empty());
    assert_eq!(pending.len(), 2);
    for save in &pending {
        match &save.effects[1] {
            Effect::Persist { tree, .. } => {
                assert_eq!(tree.file_at("main.py").unwrap().content, "print(2)");
                assert_eq!(tree.file_at("src/lib.rs").unwrap().content, "fn lib() {}");
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }
}

#[test]
fn test_reset_drops_session() {
    let mut store = loaded_store();
    open(&mut store, "main.py");
    assert!(store.dispatch(Action::Reset).unwrap().state_changed);
    assert!(store.state().tree().is_none());
    assert!(store.state().open_files().is_empty());
    assert!(!store.is_loaded("w1"));
}
