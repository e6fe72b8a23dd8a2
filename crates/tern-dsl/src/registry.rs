//! Model-file references and the extension-keyed parser registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use tern_ir::{CompositionError, Hts, SnapshotError};

use crate::errors::ParseError;
use crate::formats::{EtsParser, InitParser, SnapshotParser, StsParser};
use crate::names::NameMap;

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("no parser registered for extension '{ext}' ({path})")]
    #[diagnostic(code(tern::model::unknown_extension))]
    UnknownExtension { path: PathBuf, ext: String },

    #[error("model file not found: {0}")]
    #[diagnostic(code(tern::model::missing_file))]
    MissingFile(PathBuf),

    #[error("malformed model reference '{reference}': {message}")]
    #[diagnostic(
        code(tern::model::bad_flags),
        help("use `path/to/file.ext[flagA+flagB]`")
    )]
    BadFlags { reference: String, message: String },

    #[error("{parser} parser does not understand flag '{flag}'")]
    #[diagnostic(code(tern::model::unknown_flag))]
    UnknownFlag { parser: &'static str, flag: String },

    #[error("{}:{line}: {message}", path.display())]
    #[diagnostic(code(tern::model::init_file))]
    InitFile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Options shared by every parser invocation of one model load.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Leave the initial state unconstrained.
    pub symbolic_init: bool,
    /// Read `BV(1)` declarations as `Bool`.
    pub boolean: bool,
    /// System accumulated from the files parsed so far.
    pub system: &'a Hts,
}

/// Output of one parser invocation.
#[derive(Debug, Clone)]
pub struct ParsedModel {
    pub hts: Hts,
    pub names: NameMap,
}

/// A model format.
pub trait ModelParser {
    fn name(&self) -> &'static str;

    /// File extensions (without the dot) this parser handles.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(
        &self,
        path: &Path,
        flags: &[String],
        ctx: &ParseContext<'_>,
    ) -> Result<ParsedModel, ModelError>;
}

/// Extension to parser mapping.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn ModelParser>>,
    by_extension: HashMap<String, usize>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
            by_extension: HashMap::new(),
        }
    }

    /// Registry with the built-in `.sts`, `.ets`, `.init` and `.tsnap` parsers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(StsParser));
        registry.register(Box::new(EtsParser));
        registry.register(Box::new(InitParser));
        registry.register(Box::new(SnapshotParser));
        registry
    }

    /// Add a parser. Extensions already claimed are taken over.
    pub fn register(&mut self, parser: Box<dyn ModelParser>) {
        let idx = self.parsers.len();
        for ext in parser.extensions() {
            self.by_extension.insert(ext.to_string(), idx);
        }
        self.parsers.push(parser);
    }

    pub fn for_extension(&self, ext: &str) -> Option<&dyn ModelParser> {
        self.by_extension
            .get(ext)
            .map(|&idx| self.parsers[idx].as_ref())
    }

    pub fn for_path(&self, path: &Path) -> Result<&dyn ModelParser, ModelError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.for_extension(ext)
            .ok_or_else(|| ModelError::UnknownExtension {
                path: path.to_path_buf(),
                ext: ext.to_string(),
            })
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// One entry of a model list: a resolved path plus its flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub path: PathBuf,
    pub flags: Vec<String>,
}

/// Split `file.ext[flagA+flagB]` into the path text and its flags.
pub fn get_file_flags(reference: &str) -> Result<(String, Vec<String>), ModelError> {
    let reference = reference.trim();
    let bad = |message: &str| ModelError::BadFlags {
        reference: reference.to_string(),
        message: message.to_string(),
    };
    let Some(open) = reference.find('[') else {
        if reference.contains(']') {
            return Err(bad("']' without matching '['"));
        }
        return Ok((reference.to_string(), Vec::new()));
    };
    let Some(body) = reference[open + 1..].strip_suffix(']') else {
        return Err(bad("flag list must end with ']'"));
    };
    if body.contains('[') || body.contains(']') {
        return Err(bad("nested brackets in flag list"));
    }
    let path = reference[..open].trim();
    if path.is_empty() {
        return Err(bad("missing file name"));
    }
    let flags = body
        .split('+')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    Ok((path.to_string(), flags))
}

/// Parse a comma-separated model list, resolving relative paths against `base`.
pub fn parse_model_list(list: &str, base: &Path) -> Result<Vec<ModelRef>, ModelError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (path, flags) = get_file_flags(entry)?;
            let path = PathBuf::from(path);
            let path = if path.is_absolute() {
                path
            } else {
                base.join(path)
            };
            Ok(ModelRef { path, flags })
        })
        .collect()
}
