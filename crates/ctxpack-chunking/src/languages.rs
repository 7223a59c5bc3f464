//! Language-specific configurations for chunking
//!
//! Centralizes the Tree-sitter language definitions, the node kinds treated
//! as natural chunk boundaries, and the container kinds whose bodies are
//! recursed into when a unit overflows the chunk budget.

use lazy_static::lazy_static;
use std::collections::HashMap;
use tree_sitter::Language;

/// Configuration for a specific programming language
#[derive(Clone)]
pub struct LanguageConfig {
    /// The language identifier (e.g., "rust", "python")
    pub id: &'static str,
    /// File extensions associated with this language
    pub extensions: &'static [&'static str],
    /// Tree-sitter language parser
    pub tree_sitter_language: Language,
    /// Node kinds that open a nested scope worth recursing into
    /// (impl blocks, classes, modules)
    pub container_kinds: &'static [&'static str],
    /// Node kinds that carry a name worth surfacing as an entity hint
    pub named_kinds: &'static [&'static str],
}

impl std::fmt::Debug for LanguageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageConfig").field("id", &self.id).finish()
    }
}

lazy_static! {
    /// Registry of all supported language configurations
    pub static ref LANGUAGE_REGISTRY: HashMap<&'static str, LanguageConfig> = {
        let mut registry = HashMap::new();

        registry.insert(
            "rust",
            LanguageConfig {
                id: "rust",
                extensions: &["rs"],
                tree_sitter_language: tree_sitter_rust::LANGUAGE.into(),
                container_kinds: &["impl_item", "mod_item", "trait_item"],
                named_kinds: &[
                    "function_item",
                    "struct_item",
                    "enum_item",
                    "trait_item",
                    "impl_item",
                    "mod_item",
                    "const_item",
                    "static_item",
                    "type_item",
                    "macro_definition",
                ],
            },
        );

        registry.insert(
            "python",
            LanguageConfig {
                id: "python",
                extensions: &["py", "pyi"],
                tree_sitter_language: tree_sitter_python::LANGUAGE.into(),
                container_kinds: &["class_definition"],
                named_kinds: &["function_definition", "class_definition"],
            },
        );

        registry.insert(
            "javascript",
            LanguageConfig {
                id: "javascript",
                extensions: &["js", "jsx", "mjs", "cjs"],
                tree_sitter_language: tree_sitter_javascript::LANGUAGE.into(),
                container_kinds: &["class_declaration"],
                named_kinds: &[
                    "function_declaration",
                    "class_declaration",
                    "method_definition",
                    "generator_function_declaration",
                ],
            },
        );

        registry.insert(
            "typescript",
            LanguageConfig {
                id: "typescript",
                extensions: &["ts", "mts", "cts"],
                tree_sitter_language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                container_kinds: &["class_declaration", "internal_module"],
                named_kinds: &[
                    "function_declaration",
                    "class_declaration",
                    "method_definition",
                    "interface_declaration",
                    "type_alias_declaration",
                    "enum_declaration",
                ],
            },
        );

        registry.insert(
            "tsx",
            LanguageConfig {
                id: "tsx",
                extensions: &["tsx"],
                tree_sitter_language: tree_sitter_typescript::LANGUAGE_TSX.into(),
                container_kinds: &["class_declaration", "internal_module"],
                named_kinds: &[
                    "function_declaration",
                    "class_declaration",
                    "method_definition",
                    "interface_declaration",
                    "type_alias_declaration",
                    "enum_declaration",
                ],
            },
        );

        registry.insert(
            "go",
            LanguageConfig {
                id: "go",
                extensions: &["go"],
                tree_sitter_language: tree_sitter_go::LANGUAGE.into(),
                container_kinds: &[],
                named_kinds: &[
                    "function_declaration",
                    "method_declaration",
                    "type_declaration",
                ],
            },
        );

        registry
    };

    /// Extension → language id lookup built from the registry
    static ref EXTENSION_MAP: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        for config in LANGUAGE_REGISTRY.values() {
            for ext in config.extensions {
                map.insert(*ext, config.id);
            }
        }
        map
    };
}

/// Resolve a language id from a file extension, if we have a grammar for it
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    EXTENSION_MAP.get(ext.to_lowercase().as_str()).copied()
}

/// Resolve a language id from a full file path
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?;
    language_for_extension(ext)
}

/// Look up the parsing configuration for a language id
pub fn language_config(id: &str) -> Option<&'static LanguageConfig> {
    LANGUAGE_REGISTRY.get(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(language_for_extension("rs"), Some("rust"));
        assert_eq!(language_for_extension("py"), Some("python"));
        assert_eq!(language_for_extension("tsx"), Some("tsx"));
        assert_eq!(language_for_extension("RS"), Some("rust"), "case-insensitive");
        assert_eq!(language_for_extension("zig"), None);
    }

    #[test]
    fn test_path_lookup() {
        assert_eq!(language_for_path("src/main.rs"), Some("rust"));
        assert_eq!(language_for_path("a/b/app.test.ts"), Some("typescript"));
        assert_eq!(language_for_path("Makefile"), None);
    }

    #[test]
    fn test_registry_languages_load() {
        for (id, config) in LANGUAGE_REGISTRY.iter() {
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(&config.tree_sitter_language)
                .unwrap_or_else(|e| panic!("grammar for {id} failed to load: {e}"));
        }
    }
}
