use super::*;

#[test]
fn test_parse_names() {
    assert_eq!("python".parse::<StarterKind>().unwrap(), StarterKind::Python);
    assert_eq!("CPP".parse::<StarterKind>().unwrap(), StarterKind::Cpp);
    assert_eq!("c++".parse::<StarterKind>().unwrap(), StarterKind::Cpp);
    assert_eq!(" ts ".parse::<StarterKind>().unwrap(), StarterKind::TypeScript);
    assert_eq!(
        "cobol".parse::<StarterKind>(),
        Err(TemplateError::Unknown("cobol".into()))
    );
}

#[test]
fn test_every_starter_has_one_file() {
    for kind in StarterKind::ALL {
        let tree = kind.tree();
        assert!(tree.folder_name.ends_with("-playground"));
        assert_eq!(tree.items.len(), 1);
        let file = tree.items[0].as_file().unwrap();
        assert!(file.content.contains("Hello World!"), "{kind:?}");
    }
}

#[test]
fn test_trees_get_fresh_ids() {
    let a = StarterKind::Rust.tree();
    let b = StarterKind::Rust.tree();
    assert_ne!(
        a.items[0].as_file().unwrap().id,
        b.items[0].as_file().unwrap().id
    );
}

#[tokio::test]
async fn test_template_for_assigned_workspace() {
    let templates = StarterTemplates::new();
    templates.assign("w1", StarterKind::Python);
    templates.assign_named("w2", "java").unwrap();
    assert!(templates.assign_named("w3", "nope").is_err());

    let tree = templates.template_for("w1").await.unwrap().unwrap();
    assert_eq!(tree.folder_name, "python-playground");
    assert!(tree.file_at("main.py").is_some());

    let tree = templates.template_for("w2").await.unwrap().unwrap();
    assert!(tree.file_at("Main.java").is_some());

    assert_eq!(templates.template_for("w3").await.unwrap(), None);
}
