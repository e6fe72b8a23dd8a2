use std::path::Path;

use tern_ir::{Expr, Hts, TransitionSystem, VarKind};
use tracing::{debug, warn};

use super::{read_source, system_name};
use crate::names::NameMap;
use crate::parser::parse_predicate;
use crate::registry::{ModelError, ModelParser, ParseContext, ParsedModel};

/// Initial-state files (`.init`): one `state_var = constant` per line.
///
/// Variables must already be declared as state variables by a model parsed
/// earlier in the same list.
pub struct InitParser;

impl InitParser {
    fn parse_line(
        &self,
        path: &Path,
        line_no: usize,
        line: &str,
        system: &Hts,
    ) -> Result<Expr, ModelError> {
        let fail = |message: String| ModelError::InitFile {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };
        let filename = format!("{}:{line_no}", path.display());
        let expr = parse_predicate(line, &filename)?;
        let Expr::Eq(lhs, rhs) = &expr else {
            return Err(fail(format!("expected a single equality, got `{line}`")));
        };
        let Expr::Var(name) = lhs.as_ref() else {
            return Err(fail(format!("left side of `{line}` must be a variable")));
        };
        match system.var(name) {
            Some(decl) if decl.kind == VarKind::State => {}
            Some(decl) => {
                return Err(fail(format!(
                    "`{name}` is an {} variable, not a state variable",
                    decl.kind
                )))
            }
            None => return Err(fail(format!("`{name}` is not declared"))),
        }
        if !rhs.is_constant() {
            return Err(fail(format!("right side of `{line}` must be a constant")));
        }
        Ok(expr)
    }
}

impl ModelParser for InitParser {
    fn name(&self) -> &'static str {
        "INIT"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["init"]
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
        let source = read_source(path)?;
        let mut equalities = Vec::new();
        for (idx, raw) in source.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            equalities.push(self.parse_line(path, idx + 1, line, ctx.system)?);
        }

        let name = system_name(path);
        let mut ts = TransitionSystem::new(format!("{name}.init"));
        if ctx.symbolic_init {
            warn!(file = %path.display(), "symbolic initial state requested; ignoring init file");
        } else {
            ts.add_init(Expr::conjoin(equalities));
        }
        debug!(file = %path.display(), constraints = ts.init.conjuncts().len(), "parsed init file");

        let mut hts = Hts::new(name);
        hts.add_ts(ts)?;
        Ok(ParsedModel {
            hts,
            names: NameMap::new(),
        })
    }
}
