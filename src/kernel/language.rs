#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LanguageId {
    Rust,
    Go,
    Python,
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    C,
    Cpp,
    Java,
    Ruby,
    Json,
    Html,
    Css,
    Markdown,
    Bash,
}

pub const PLAINTEXT: &str = "plaintext";

impl LanguageId {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "rs" => Some(Self::Rust),
            "go" => Some(Self::Go),
            "py" | "pyi" => Some(Self::Python),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "c" => Some(Self::C),
            "cc" | "cpp" | "cxx" | "c++" | "hpp" | "hh" | "hxx" | "h++" | "h" => Some(Self::Cpp),
            "java" => Some(Self::Java),
            "rb" => Some(Self::Ruby),
            "json" => Some(Self::Json),
            "html" | "htm" => Some(Self::Html),
            "css" => Some(Self::Css),
            "md" | "markdown" => Some(Self::Markdown),
            "sh" | "bash" | "zsh" => Some(Self::Bash),
            _ => None,
        }
    }

    pub fn language_id(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Go => "go",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Jsx => "javascriptreact",
            Self::Tsx => "typescriptreact",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Ruby => "ruby",
            Self::Json => "json",
            Self::Html => "html",
            Self::Css => "css",
            Self::Markdown => "markdown",
            Self::Bash => "shell",
        }
    }
}

/// Language id sent to the completion service for a file extension.
pub fn completion_language(ext: &str) -> &'static str {
    LanguageId::from_extension(ext).map_or(PLAINTEXT, LanguageId::language_id)
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/language.rs"]
mod tests;
