use super::*;

#[test]
fn test_split_file_name() {
    assert_eq!(split_file_name("index.js"), ("index".into(), "js".into()));
    assert_eq!(
        split_file_name("archive.tar.gz"),
        ("archive.tar".into(), "gz".into())
    );
    assert_eq!(split_file_name("README"), ("README".into(), "txt".into()));
    assert_eq!(
        split_file_name(".gitignore"),
        (".gitignore".into(), "txt".into())
    );
}

#[test]
fn test_placeholder_detection() {
    let text = placeholder_content("src/main.rs");
    assert!(is_placeholder(&text));
    assert!(text.contains("src/main.rs"));
    assert!(!is_placeholder("fn main() {}"));
}

#[test]
fn test_build_nests_folders_in_listing_order() {
    let entries = vec![
        ListingEntry::new("src/main.rs", "u1"),
        ListingEntry::new("Cargo.toml", "u2"),
        ListingEntry::new("src/bin/tool.rs", "u3"),
        ListingEntry::new("src/lib.rs", "u4"),
    ];
    let tree = build_tree_from_listing("demo", &entries);

    assert_eq!(tree.folder_name, "demo");
    let names: Vec<String> = tree
        .items
        .iter()
        .map(|node| match node {
            TreeNode::Folder(f) => f.folder_name.clone(),
            TreeNode::File(f) => f.display_name(),
        })
        .collect();
    assert_eq!(names, vec!["src", "Cargo.toml"]);

    let src = tree.folder("src").unwrap();
    assert_eq!(src.items.len(), 3);
    assert!(tree.file_at("src/bin/tool.rs").is_some());
}

#[test]
fn test_build_marks_files_for_hydration() {
    let tree = build_tree_from_listing("demo", &[ListingEntry::new("a/b.py", "https://x/b")]);
    let file = tree.file_at("a/b.py").unwrap();
    assert!(is_placeholder(&file.content));
    assert_eq!(file.origin_source.as_deref(), Some("https://x/b"));
}

#[test]
fn test_build_skips_duplicate_paths() {
    let tree = build_tree_from_listing(
        "demo",
        &[
            ListingEntry::new("a.txt", "first"),
            ListingEntry::new("a.txt", "second"),
        ],
    );
    assert_eq!(tree.items.len(), 1);
    assert_eq!(
        tree.file_at("a.txt").unwrap().origin_source.as_deref(),
        Some("first")
    );
}
