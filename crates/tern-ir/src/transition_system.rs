use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::composition::CompositionError;
use crate::expr::Expr;
use crate::vars::{VarDecl, VarKind};

/// One symbolic component: declared variables plus `init`, `invar` and `trans`.
///
/// All three predicates are always present; an unconstrained component has
/// `True` for each of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSystem {
    pub name: String,
    pub vars: IndexMap<String, VarDecl>,
    pub init: Expr,
    pub invar: Expr,
    pub trans: Expr,
}

impl TransitionSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: IndexMap::new(),
            init: Expr::tt(),
            invar: Expr::tt(),
            trans: Expr::tt(),
        }
    }

    /// Declare a variable owned by this component.
    pub fn declare(&mut self, decl: VarDecl) -> Result<(), CompositionError> {
        if let Some(existing) = self.vars.get(&decl.name) {
            return Err(CompositionError::NamespaceCollision {
                var: decl.name.clone(),
                existing: format!("{} ({} {})", self.name, existing.kind, existing.sort),
                incoming: format!("{} ({} {})", self.name, decl.kind, decl.sort),
            });
        }
        self.vars.insert(decl.name.clone(), decl);
        Ok(())
    }

    pub fn add_init(&mut self, e: Expr) {
        self.init = Expr::conjoin([std::mem::replace(&mut self.init, Expr::tt()), e]);
    }

    pub fn add_invar(&mut self, e: Expr) {
        self.invar = Expr::conjoin([std::mem::replace(&mut self.invar, Expr::tt()), e]);
    }

    pub fn add_trans(&mut self, e: Expr) {
        self.trans = Expr::conjoin([std::mem::replace(&mut self.trans, Expr::tt()), e]);
    }

    pub fn vars_of_kind(&self, kind: VarKind) -> impl Iterator<Item = &VarDecl> {
        self.vars.values().filter(move |v| v.kind == kind)
    }

    /// Copy of this component with every declared and referenced variable renamed.
    pub fn renamed(&self, rename: &dyn Fn(&str) -> String) -> TransitionSystem {
        TransitionSystem {
            name: self.name.clone(),
            vars: self
                .vars
                .values()
                .map(|d| {
                    let name = rename(&d.name);
                    (name.clone(), VarDecl { name, ..d.clone() })
                })
                .collect(),
            init: self.init.rename(rename),
            invar: self.invar.rename(rename),
            trans: self.trans.rename(rename),
        }
    }
}
