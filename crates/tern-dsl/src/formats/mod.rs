//! Built-in model formats.

mod ets;
mod init;
mod snapshot;
mod sts;

use std::fs;
use std::path::Path;

use tern_ir::{Sort, TransitionSystem, VarDecl};

use crate::ast::{Declaration, Spanned};
use crate::names::NameMap;
use crate::registry::{ModelError, ParseContext};

pub use ets::EtsParser;
pub use init::InitParser;
pub use snapshot::SnapshotParser;
pub use sts::StsParser;

fn read_source(path: &Path) -> Result<String, ModelError> {
    fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Name given to the system parsed from `path`.
fn system_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

fn declare_all(
    ts: &mut TransitionSystem,
    decls: &[Spanned<Declaration>],
    ctx: &ParseContext<'_>,
    names: &mut NameMap,
) -> Result<(), ModelError> {
    for decl in decls {
        let decl = &decl.node;
        let sort = match decl.sort {
            Sort::BitVec(1) if ctx.boolean => Sort::Bool,
            other => other,
        };
        ts.declare(VarDecl::new(decl.name.clone(), sort, decl.kind))?;
        names.insert(decl.name.clone(), decl.source_name.clone());
    }
    Ok(())
}
