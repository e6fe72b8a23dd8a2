use std::path::Path;

use tern_ir::snapshot;

use crate::names::NameMap;
use crate::registry::{ModelError, ModelParser, ParseContext, ParsedModel};

/// Binary snapshots (`.tsnap`) written by `tern_ir::snapshot::save`.
pub struct SnapshotParser;

impl ModelParser for SnapshotParser {
    fn name(&self) -> &'static str {
        "SNAPSHOT"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tsnap"]
    }

    fn parse(
        &self,
        path: &Path,
        flags: &[String],
        ctx: &ParseContext<'_>,
    ) -> Result<ParsedModel, ModelError> {
        if let Some(flag) = flags.first() {
            return Err(ModelError::UnknownFlag {
                parser: self.name(),
                flag: flag.clone(),
            });
        }
        let mut hts = snapshot::load(path)?;
        if ctx.symbolic_init {
            hts.drop_init();
        }
        // Snapshots keep canonical names only; undo the `.` to `$` mapping.
        let mut names = NameMap::new();
        for decl in hts.vars() {
            names.insert(decl.name.clone(), decl.name.replace('$', "."));
        }
        Ok(ParsedModel { hts, names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ir::{Expr, Hts, HtsOrigin, Sort, TransitionSystem, VarDecl};

    #[test]
    fn restores_system_and_marks_origin() {
        let mut ts = TransitionSystem::new("m");
        ts.declare(VarDecl::state("top$x", Sort::Int)).unwrap();
        ts.add_init(Expr::var("top$x").eq(Expr::int(0)));
        let mut hts = Hts::new("m");
        hts.add_ts(ts).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.tsnap");
        snapshot::save(&hts, &path).unwrap();

        let acc = Hts::new("acc");
        let ctx = ParseContext {
            symbolic_init: true,
            boolean: false,
            system: &acc,
        };
        let parsed = SnapshotParser.parse(&path, &[], &ctx).unwrap();
        assert_eq!(parsed.hts.origin(), &HtsOrigin::Snapshot(path.clone()));
        assert!(parsed.hts.init().is_true());
        assert_eq!(parsed.names.source_name("top$x"), "top.x");
    }
}
