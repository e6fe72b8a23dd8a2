use std::path::Path;

use tern_ir::{Expr, Hts, TransitionSystem};
use tracing::debug;

use super::{declare_all, read_source, system_name};
use crate::errors::ParseError;
use crate::names::NameMap;
use crate::parser::parse_ets;
use crate::registry::{ModelError, ModelParser, ParseContext, ParsedModel};

/// Label of the initial state in `.ets` files.
pub const INITIAL_STATE: &str = "I";

/// Explicit transition systems (`.ets`): labelled states and edges.
pub struct EtsParser;

impl ModelParser for EtsParser {
    fn name(&self) -> &'static str {
        "ETS"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ets"]
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
        let model = parse_ets(&source, &path.display().to_string())?;
        let name = system_name(path);
        let mut names = NameMap::new();
        let mut ts = TransitionSystem::new(name.clone());
        declare_all(&mut ts, &model.decls, ctx, &mut names)?;

        let state = |label: &str| {
            model
                .states
                .iter()
                .find(|s| s.node.0 == label)
                .map(|s| s.node.1.clone())
        };
        let initial = state(INITIAL_STATE).ok_or_else(|| ParseError::MissingSection {
            section: format!("initial state `{INITIAL_STATE}` in STATES"),
        })?;
        if !ctx.symbolic_init {
            ts.add_init(initial);
        }

        let mut steps = Vec::with_capacity(model.edges.len());
        for edge in &model.edges {
            let (from, to) = &edge.node;
            // Labels were checked against STATES by the parser.
            let (Some(src), Some(dst)) = (state(from), state(to)) else {
                continue;
            };
            let Some(dst) = dst.to_next() else {
                continue;
            };
            steps.push(src.and(dst));
        }
        ts.add_trans(Expr::disjoin(steps));
        debug!(file = %path.display(), states = model.states.len(), edges = model.edges.len(), "parsed ETS");

        let mut hts = Hts::new(name);
        hts.add_ts(ts)?;
        Ok(ParsedModel { hts, names })
    }
}
