//! Sum-of-products expressions over primary inputs.
//!
//! Grammar, whitespace-insensitive:
//!
//! ```text
//! expr := term ('|' term)*
//! term := lit ('&' lit)*
//! lit  := ('!' | '~')* ( 'i' <index> | '0' | '1' )
//! ```

use crate::bdd::{Bdd, BddManager};

/// A possibly complemented primary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Literal {
    pub var: usize,
    pub negated: bool,
}

/// Disjunction of conjunctions of literals.
///
/// An empty `terms` list is constant false; an empty term is constant true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumOfProducts {
    pub terms: Vec<Vec<Literal>>,
}

enum Atom {
    Var(Literal),
    Const(bool),
}

impl SumOfProducts {
    /// Parses one expression. Errors carry a message without position.
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        if text.is_empty() {
            return Err("empty expression".into());
        }
        let mut terms = Vec::new();
        for term_text in text.split('|') {
            let mut term = Vec::new();
            let mut satisfiable = true;
            for lit_text in term_text.split('&') {
                match parse_atom(lit_text)? {
                    Atom::Var(lit) => term.push(lit),
                    Atom::Const(true) => {}
                    Atom::Const(false) => satisfiable = false,
                }
            }
            if satisfiable {
                terms.push(term);
            }
        }
        Ok(Self { terms })
    }

    /// Largest variable index referenced, if any.
    pub fn max_var(&self) -> Option<usize> {
        self.terms.iter().flatten().map(|l| l.var).max()
    }

    /// Builds the canonical function in `engine`.
    pub fn build(&self, engine: &mut BddManager) -> Bdd {
        let mut sum = Bdd::FALSE;
        for term in &self.terms {
            let mut product = Bdd::TRUE;
            for lit in term {
                let mut v = engine.var(lit.var);
                if lit.negated {
                    v = engine.not(v);
                }
                product = engine.and(product, v);
            }
            sum = engine.or(sum, product);
        }
        sum
    }
}

fn parse_atom(text: &str) -> Result<Atom, String> {
    let mut rest = text.trim();
    let mut negated = false;
    while let Some(stripped) = rest.strip_prefix(['!', '~']) {
        negated = !negated;
        rest = stripped.trim_start();
    }
    match rest {
        "" => Err("empty literal".into()),
        "0" => Ok(Atom::Const(negated)),
        "1" => Ok(Atom::Const(!negated)),
        _ => {
            let digits = rest
                .strip_prefix('i')
                .ok_or_else(|| format!("unrecognized literal `{rest}`"))?;
            let var = digits
                .parse::<usize>()
                .map_err(|_| format!("unrecognized literal `{rest}`"))?;
            Ok(Atom::Var(Literal { var, negated }))
        }
    }
}
