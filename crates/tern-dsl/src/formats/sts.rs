use std::path::Path;

use tern_ir::{Hts, TransitionSystem};
use tracing::debug;

use super::{declare_all, read_source, system_name};
use crate::names::NameMap;
use crate::parser::parse_sts;
use crate::registry::{ModelError, ModelParser, ParseContext, ParsedModel};

/// Symbolic transition systems (`.sts`).
///
/// Flags: `no_init` drops the INIT section, `no_invar` drops INVAR.
pub struct StsParser;

impl ModelParser for StsParser {
    fn name(&self) -> &'static str {
        "STS"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["sts"]
    }

    fn parse(
        &self,
        path: &Path,
        flags: &[String],
        ctx: &ParseContext<'_>,
    ) -> Result<ParsedModel, ModelError> {
        let mut keep_init = !ctx.symbolic_init;
        let mut keep_invar = true;
        for flag in flags {
            match flag.as_str() {
                "no_init" => keep_init = false,
                "no_invar" => keep_invar = false,
                other => {
                    return Err(ModelError::UnknownFlag {
                        parser: self.name(),
                        flag: other.to_string(),
                    })
                }
            }
        }

        let source = read_source(path)?;
        let model = parse_sts(&source, &path.display().to_string())?;
        let name = system_name(path);
        let mut names = NameMap::new();
        let mut ts = TransitionSystem::new(name.clone());
        declare_all(&mut ts, &model.decls, ctx, &mut names)?;
        if keep_init {
            model.init.into_iter().for_each(|e| ts.add_init(e));
        }
        if keep_invar {
            model.invar.into_iter().for_each(|e| ts.add_invar(e));
        }
        model.trans.into_iter().for_each(|e| ts.add_trans(e));
        debug!(file = %path.display(), vars = ts.vars.len(), keep_init, keep_invar, "parsed STS");

        let mut hts = Hts::new(name);
        hts.add_ts(ts)?;
        Ok(ParsedModel { hts, names })
    }
}
