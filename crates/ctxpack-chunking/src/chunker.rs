//! AST-aware file chunking
//!
//! Splits each file on natural boundaries (function, class, top-level
//! statement) using Tree-sitter where a grammar is registered, packing
//! adjacent small units until the configured character budget. Languages
//! without a grammar fall back to line-window packing. Output is
//! deterministic for a given input and settings.

use tree_sitter::{Node, Parser};

use crate::error::{ChunkingError, ChunkingResult};
use crate::languages::{LanguageConfig, language_config, language_for_path};

/// Default character budget per chunk
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1500;

/// A file handed to the chunker
#[derive(Debug, Clone)]
pub struct FileInput {
    /// POSIX path relative to the resource root
    pub filepath: String,
    /// Full decoded file content
    pub code: String,
}

/// A produced chunk, not yet persisted or embedded
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChunkDraft {
    pub filepath: String,
    /// 1-based, inclusive
    pub line_start: i32,
    pub line_end: i32,
    /// The raw slice of the file
    pub text: String,
    /// The embedded form: scope/entity header plus the raw text
    pub contextualized_text: String,
    /// Enclosing scope chain when the chunk came out of a container
    pub scope: Option<String>,
    /// Named entities (functions, types) the chunk covers
    pub entities: Vec<String>,
    pub language: Option<String>,
}

/// Per-file chunking outcome; errors become job warnings upstream
#[derive(Debug)]
pub struct FileChunkOutcome {
    pub filepath: String,
    pub result: ChunkingResult<Vec<ChunkDraft>>,
}

/// A pre-packing unit: one natural boundary in the source
struct Unit {
    /// 0-based rows
    start: usize,
    end: usize,
    scope: Option<String>,
    entities: Vec<String>,
}

/// Splits files into bounded, contextualized chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE)
    }
}

impl Chunker {
    /// Create a chunker with the given character budget
    pub const fn new(max_chunk_size: usize) -> Self {
        Self { max_chunk_size }
    }

    /// Chunk a batch of files, one outcome per input
    pub fn chunk_files(&self, inputs: &[FileInput]) -> Vec<FileChunkOutcome> {
        inputs
            .iter()
            .map(|input| FileChunkOutcome {
                filepath: input.filepath.clone(),
                result: self.chunk_file(input),
            })
            .collect()
    }

    /// Chunk a single file
    ///
    /// # Errors
    ///
    /// Returns `ChunkingError::LanguageSetup` when a registered grammar
    /// cannot be loaded into the parser.
    pub fn chunk_file(&self, input: &FileInput) -> ChunkingResult<Vec<ChunkDraft>> {
        if input.code.trim().is_empty() {
            return Ok(Vec::new());
        }

        let lines: Vec<&str> = input.code.lines().collect();
        let language = language_for_path(&input.filepath);

        let units = match language.and_then(language_config) {
            Some(config) => match self.parse_units(input, &lines, config)? {
                Some(units) => units,
                None => {
                    tracing::debug!(filepath = %input.filepath, "parse produced no tree, using line packing");
                    self.line_units(&lines)
                }
            },
            None => self.line_units(&lines),
        };

        Ok(self.pack(input, &lines, language, units))
    }

    /// Parse with tree-sitter and collect boundary units; None when no tree
    fn parse_units(
        &self,
        input: &FileInput,
        lines: &[&str],
        config: &LanguageConfig,
    ) -> ChunkingResult<Option<Vec<Unit>>> {
        let mut parser = Parser::new();
        parser
            .set_language(&config.tree_sitter_language)
            .map_err(|e| ChunkingError::LanguageSetup {
                language: config.id.to_string(),
                message: e.to_string(),
            })?;

        let Some(tree) = parser.parse(&input.code, None) else {
            return Ok(None);
        };

        let mut units = Vec::new();
        let mut scope_stack = Vec::new();
        self.collect_units(
            tree.root_node(),
            &input.code,
            lines,
            config,
            &mut scope_stack,
            &mut units,
        );

        if units.is_empty() {
            return Ok(None);
        }
        Ok(Some(units))
    }

    /// Walk named children, recursing into oversized containers so methods
    /// land in their own units with the container as scope
    fn collect_units(
        &self,
        node: Node<'_>,
        source: &str,
        lines: &[&str],
        config: &LanguageConfig,
        scope_stack: &mut Vec<String>,
        units: &mut Vec<Unit>,
    ) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let start = child.start_position().row;
            let end = child.end_position().row;
            let size = slice_len(lines, start, end);
            let name = node_name(&child, source);

            let oversized_container = size > self.max_chunk_size
                && config.container_kinds.contains(&child.kind());
            let body = child.child_by_field_name("body");

            if oversized_container && let Some(body) = body {
                let body_start = body.start_position().row;
                if body_start > start {
                    // Signature/header lines ahead of the body
                    units.push(Unit {
                        start,
                        end: body_start.saturating_sub(1),
                        scope: current_scope(scope_stack),
                        entities: name.clone().into_iter().collect(),
                    });
                }
                scope_stack.push(name.unwrap_or_else(|| child.kind().to_string()));
                self.collect_units(body, source, lines, config, scope_stack, units);
                scope_stack.pop();
            } else {
                units.push(Unit {
                    start,
                    end,
                    scope: current_scope(scope_stack),
                    entities: name.into_iter().collect(),
                });
            }
        }
    }

    /// Fallback units: one per line, packed later by the char budget
    fn line_units(&self, lines: &[&str]) -> Vec<Unit> {
        (0..lines.len())
            .map(|row| Unit {
                start: row,
                end: row,
                scope: None,
                entities: Vec::new(),
            })
            .collect()
    }

    /// Greedily pack adjacent units with the same scope into chunks
    fn pack(
        &self,
        input: &FileInput,
        lines: &[&str],
        language: Option<&'static str>,
        units: Vec<Unit>,
    ) -> Vec<ChunkDraft> {
        let mut chunks = Vec::new();
        let mut group: Option<(usize, usize, Option<String>, Vec<String>)> = None;

        for unit in units {
            match group.take() {
                Some((start, _end, scope, mut entities))
                    if scope == unit.scope
                        && slice_len(lines, start, unit.end) <= self.max_chunk_size =>
                {
                    for entity in unit.entities {
                        if !entities.contains(&entity) {
                            entities.push(entity);
                        }
                    }
                    group = Some((start, unit.end, scope, entities));
                }
                Some(finished) => {
                    self.flush_group(input, lines, language, finished, &mut chunks);
                    group = Some((unit.start, unit.end, unit.scope, unit.entities));
                }
                None => {
                    group = Some((unit.start, unit.end, unit.scope, unit.entities));
                }
            }
        }
        if let Some(finished) = group {
            self.flush_group(input, lines, language, finished, &mut chunks);
        }

        chunks
    }

    /// Emit one group as a chunk, splitting on line boundaries when a single
    /// unit overflows the budget
    fn flush_group(
        &self,
        input: &FileInput,
        lines: &[&str],
        language: Option<&'static str>,
        (start, end, scope, entities): (usize, usize, Option<String>, Vec<String>),
        chunks: &mut Vec<ChunkDraft>,
    ) {
        if slice_len(lines, start, end) <= self.max_chunk_size {
            chunks.push(self.draft(input, lines, language, start, end, &scope, &entities));
            return;
        }

        // Oversized single unit: greedy line windows
        let mut window_start = start;
        let mut window_len = 0usize;
        for row in start..=end {
            let line_len = lines.get(row).map_or(0, |l| l.len().saturating_add(1));
            if window_len > 0 && window_len.saturating_add(line_len) > self.max_chunk_size {
                chunks.push(self.draft(
                    input,
                    lines,
                    language,
                    window_start,
                    row.saturating_sub(1),
                    &scope,
                    &entities,
                ));
                window_start = row;
                window_len = 0;
            }
            window_len = window_len.saturating_add(line_len);
        }
        if window_start <= end {
            chunks.push(self.draft(input, lines, language, window_start, end, &scope, &entities));
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn draft(
        &self,
        input: &FileInput,
        lines: &[&str],
        language: Option<&'static str>,
        start: usize,
        end: usize,
        scope: &Option<String>,
        entities: &[String],
    ) -> ChunkDraft {
        let text = slice_text(lines, start, end);
        let contextualized_text =
            contextualize(&input.filepath, scope.as_deref(), entities, &text);
        ChunkDraft {
            filepath: input.filepath.clone(),
            line_start: (start + 1) as i32,
            line_end: (end + 1) as i32,
            text,
            contextualized_text,
            scope: scope.clone(),
            entities: entities.to_vec(),
            language: language.map(ToString::to_string),
        }
    }
}

/// The contextualized form that gets embedded: a one-line header naming the
/// file, the enclosing scope chain, and the covered entities, then the text
fn contextualize(filepath: &str, scope: Option<&str>, entities: &[String], text: &str) -> String {
    let mut header = format!("// file: {filepath}");
    if let Some(scope) = scope {
        header.push_str(&format!(" | scope: {scope}"));
    }
    if !entities.is_empty() {
        header.push_str(&format!(" | entities: {}", entities.join(", ")));
    }
    format!("{header}\n{text}")
}

fn current_scope(scope_stack: &[String]) -> Option<String> {
    if scope_stack.is_empty() {
        None
    } else {
        Some(scope_stack.join("::"))
    }
}

/// Character length of a 0-based inclusive line range (newlines included)
fn slice_len(lines: &[&str], start: usize, end: usize) -> usize {
    lines
        .get(start..=end.min(lines.len().saturating_sub(1)))
        .map_or(0, |slice| {
            slice.iter().map(|l| l.len().saturating_add(1)).sum()
        })
}

/// Text of a 0-based inclusive line range
fn slice_text(lines: &[&str], start: usize, end: usize) -> String {
    lines
        .get(start..=end.min(lines.len().saturating_sub(1)))
        .map_or_else(String::new, |slice| slice.join("\n"))
}

/// Best-effort name of a node via its `name` (or `type`, for impl blocks)
/// field
fn node_name(node: &Node<'_>, source: &str) -> Option<String> {
    let named = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("type"))?;
    named
        .utf8_text(source.as_bytes())
        .ok()
        .map(|s| s.lines().next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(path: &str, code: &str) -> FileInput {
        FileInput {
            filepath: path.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn test_small_rust_file_packs_into_one_chunk() {
        let chunker = Chunker::default();
        let chunks = chunker
            .chunk_file(&input(
                "src/lib.rs",
                "fn alpha() -> u32 {\n    1\n}\n\nfn beta() -> u32 {\n    2\n}\n",
            ))
            .expect("chunks");

        assert_eq!(chunks.len(), 1, "two small functions pack together");
        let chunk = &chunks[0];
        assert_eq!(chunk.line_start, 1);
        assert_eq!(chunk.line_end, 7);
        assert_eq!(chunk.entities, vec!["alpha", "beta"]);
        assert_eq!(chunk.language.as_deref(), Some("rust"));
        assert!(chunk.contextualized_text.starts_with("// file: src/lib.rs"));
        assert!(chunk.contextualized_text.contains("alpha, beta"));
        assert!(chunk.contextualized_text.ends_with(&chunk.text));
    }

    #[test]
    fn test_line_ranges_are_one_based_and_ordered() {
        let chunker = Chunker::new(60);
        let code = "fn a() {\n    let x = 1;\n}\n\nfn b() {\n    let y = 2;\n}\n\nfn c() {\n    let z = 3;\n}\n";
        let chunks = chunker.chunk_file(&input("src/lib.rs", code)).expect("chunks");

        assert!(chunks.len() > 1, "small budget forces multiple chunks");
        for chunk in &chunks {
            assert!(chunk.line_start >= 1);
            assert!(chunk.line_start <= chunk.line_end, "{chunk:?}");
        }
        for pair in chunks.windows(2) {
            assert!(pair[0].line_end < pair[1].line_start, "chunks stay ordered");
        }
    }

    #[test]
    fn test_oversized_python_class_recurses_into_methods() {
        let chunker = Chunker::new(200);
        let mut code = String::from("class Widget:\n");
        for i in 0..6 {
            code.push_str(&format!(
                "    def method_{i}(self):\n        value = {i} * 2\n        return value\n\n"
            ));
        }

        let chunks = chunker.chunk_file(&input("widget.py", &code)).expect("chunks");
        assert!(chunks.len() > 1, "class splits across chunks");

        let scoped: Vec<&ChunkDraft> = chunks
            .iter()
            .filter(|c| c.scope.as_deref() == Some("Widget"))
            .collect();
        assert!(!scoped.is_empty(), "method chunks carry the class scope");
        assert!(
            scoped
                .iter()
                .any(|c| c.entities.iter().any(|e| e.starts_with("method_"))),
            "method names surface as entities"
        );
        assert!(
            scoped
                .iter()
                .all(|c| c.contextualized_text.contains("scope: Widget")),
            "scope lands in the embedded form"
        );
    }

    #[test]
    fn test_unknown_language_falls_back_to_line_packing() {
        let chunker = Chunker::new(40);
        let code = "line one is here\nline two is here\nline three is here\nline four is here\n";
        let chunks = chunker.chunk_file(&input("notes.txt", code)).expect("chunks");

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.language.is_none()));
        assert!(chunks.iter().all(|c| c.scope.is_none()));
        // Full coverage in the fallback: every line belongs to some chunk
        assert_eq!(chunks[0].line_start, 1);
        assert_eq!(chunks.last().expect("nonempty").line_end, 4);
    }

    #[test]
    fn test_empty_file_yields_no_chunks() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk_file(&input("empty.rs", "   \n\n")).expect("ok");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let chunker = Chunker::default();
        let file = input(
            "src/lib.rs",
            "pub struct Config {\n    pub size: usize,\n}\n\nimpl Config {\n    pub fn new() -> Self {\n        Self { size: 0 }\n    }\n}\n",
        );
        let first = chunker.chunk_file(&file).expect("first");
        let second = chunker.chunk_file(&file).expect("second");
        assert_eq!(first, second, "same input, same settings, same output");
    }

    #[test]
    fn test_oversized_single_unit_splits_on_line_boundaries() {
        let chunker = Chunker::new(120);
        let mut code = String::from("fn giant() {\n");
        for i in 0..20 {
            code.push_str(&format!("    let value_{i} = {i};\n"));
        }
        code.push_str("}\n");

        let chunks = chunker.chunk_file(&input("src/big.rs", &code)).expect("chunks");
        assert!(chunks.len() > 1, "giant function is split");
        for chunk in &chunks {
            assert!(
                chunk.text.len() <= 120 + 40,
                "parts stay near the budget: {}",
                chunk.text.len()
            );
            assert_eq!(chunk.entities, vec!["giant"], "parts keep the entity hint");
        }
    }

    #[test]
    fn test_chunk_files_reports_per_file_outcomes() {
        let chunker = Chunker::default();
        let outcomes = chunker.chunk_files(&[
            input("a.rs", "fn a() {}\n"),
            input("b.txt", "hello\n"),
        ]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(outcomes[0].filepath, "a.rs");
    }
}
