use std::str::FromStr;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kernel::services::ports::{TemplateError, TemplateProvider};
use crate::models::{FileNode, FolderNode};

/// Built-in starter kinds, one hello-world program each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StarterKind {
    C,
    Cpp,
    Java,
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Ruby,
}

impl StarterKind {
    pub const ALL: [StarterKind; 8] = [
        StarterKind::C,
        StarterKind::Cpp,
        StarterKind::Java,
        StarterKind::Python,
        StarterKind::JavaScript,
        StarterKind::TypeScript,
        StarterKind::Rust,
        StarterKind::Ruby,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StarterKind::C => "C",
            StarterKind::Cpp => "CPP",
            StarterKind::Java => "JAVA",
            StarterKind::Python => "PYTHON",
            StarterKind::JavaScript => "JAVASCRIPT",
            StarterKind::TypeScript => "TYPESCRIPT",
            StarterKind::Rust => "RUST",
            StarterKind::Ruby => "RUBY",
        }
    }

    fn folder_name(self) -> &'static str {
        match self {
            StarterKind::C => "c-playground",
            StarterKind::Cpp => "cpp-playground",
            StarterKind::Java => "java-playground",
            StarterKind::Python => "python-playground",
            StarterKind::JavaScript => "js-playground",
            StarterKind::TypeScript => "ts-playground",
            StarterKind::Rust => "rust-playground",
            StarterKind::Ruby => "ruby-playground",
        }
    }

    /// `(filename, extension, content)` of the single starter file.
    fn entry(self) -> (&'static str, &'static str, &'static str) {
        match self {
            StarterKind::C => (
                "main",
                "c",
                "#include <stdio.h>\n\nint main() {\n    printf(\"Hello World!\\n\");\n    return 0;\n}",
            ),
            StarterKind::Cpp => (
                "main",
                "cpp",
                "#include <iostream>\nusing namespace std;\n\nint main() {\n    cout << \"Hello World!\\n\";\n    return 0;\n}",
            ),
            StarterKind::Java => (
                "Main",
                "java",
                "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"Hello World!\");\n    }\n}",
            ),
            StarterKind::Python => (
                "main",
                "py",
                "def main():\n    print('Hello World!')\n\nif __name__ == '__main__':\n    main()",
            ),
            StarterKind::JavaScript => ("index", "js", "console.log('Hello World!');"),
            StarterKind::TypeScript => (
                "index",
                "ts",
                "const greeting: string = 'Hello World!';\nconsole.log(greeting);",
            ),
            StarterKind::Rust => ("main", "rs", "fn main() {\n    println!(\"Hello World!\");\n}"),
            StarterKind::Ruby => ("main", "rb", "puts 'Hello World!'"),
        }
    }

    /// A fresh tree; every call mints new file ids.
    pub fn tree(self) -> FolderNode {
        let (filename, ext, content) = self.entry();
        FolderNode::with_items(
            self.folder_name(),
            vec![FileNode::new(filename, ext, content).into()],
        )
    }
}

impl FromStr for StarterKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let alias = match upper.as_str() {
            "C++" => "CPP",
            "JS" => "JAVASCRIPT",
            "TS" => "TYPESCRIPT",
            other => other,
        };
        StarterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == alias)
            .ok_or_else(|| TemplateError::Unknown(s.to_string()))
    }
}

/// Per-workspace starter assignment. Workspaces without an assignment have no template.
#[derive(Default)]
pub struct StarterTemplates {
    assigned: Mutex<FxHashMap<String, StarterKind>>,
}

impl StarterTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, workspace_id: impl Into<String>, kind: StarterKind) {
        self.assigned.lock().insert(workspace_id.into(), kind);
    }

    pub fn assign_named(&self, workspace_id: impl Into<String>, name: &str) -> Result<(), TemplateError> {
        let kind = name.parse()?;
        self.assign(workspace_id, kind);
        Ok(())
    }

    pub fn assigned(&self, workspace_id: &str) -> Option<StarterKind> {
        self.assigned.lock().get(workspace_id).copied()
    }
}

#[async_trait]
impl TemplateProvider for StarterTemplates {
    async fn template_for(&self, workspace_id: &str) -> Result<Option<FolderNode>, TemplateError> {
        Ok(self.assigned(workspace_id).map(StarterKind::tree))
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/templates.rs"]
mod tests;
