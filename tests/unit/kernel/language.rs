use crate::kernel::language::{completion_language, LanguageId};

#[test]
fn from_extension_maps_supported_extensions() {
    let cases = [
        ("rs", Some(LanguageId::Rust)),
        ("py", Some(LanguageId::Python)),
        ("PY", Some(LanguageId::Python)),
        ("mjs", Some(LanguageId::JavaScript)),
        ("tsx", Some(LanguageId::Tsx)),
        ("c", Some(LanguageId::C)),
        ("h", Some(LanguageId::Cpp)),
        ("cpp", Some(LanguageId::Cpp)),
        ("java", Some(LanguageId::Java)),
        ("rb", Some(LanguageId::Ruby)),
        ("md", Some(LanguageId::Markdown)),
        ("txt", None),
        ("", None),
    ];

    for (ext, expected) in cases {
        assert_eq!(LanguageId::from_extension(ext), expected, "{ext}");
    }
}

#[test]
fn completion_language_falls_back_to_plaintext() {
    assert_eq!(completion_language("ts"), "typescript");
    assert_eq!(completion_language("jsx"), "javascriptreact");
    assert_eq!(completion_language("sh"), "shell");
    assert_eq!(completion_language("lock"), "plaintext");
    assert_eq!(completion_language(""), "plaintext");
}
