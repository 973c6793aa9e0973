//! Genotype seeding from a known circuit.
//!
//! Two formats are recognized, chosen by file extension:
//!
//! - **Expression** (anything but `.v`): sum-of-products lines as in a
//!   specification file. Columns `0..num_inputs` hold `NOT(i_k)`, each
//!   product becomes an AND chain and each output an OR chain of products.
//! - **Gate level** (`.v`): a structural Verilog subset with `assign`
//!   statements over `~ & ^ |` and the `and`/`or`/`nand`/`nor`/`xor`/`xnor`/
//!   `not`/`buf` primitives.
//!
//! Gates are placed from column 0 in the order they are created; the
//! remaining columns are filled with random, unreachable gates.

use super::target::ExpressionLines;
use super::{read_file, LoadError};
use crate::cgp::genotype::random_gate;
use crate::cgp::{CircuitLayout, Gate, GateKind, Genotype};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Seed file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFormat {
    Expression,
    GateLevel,
}

impl SeedFormat {
    /// `.v` files are gate level; everything else is expressions.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("v") => SeedFormat::GateLevel,
            _ => SeedFormat::Expression,
        }
    }
}

/// Reads a seed file and builds a genotype with the given layout.
pub fn load_seed<R: Rng>(
    path: impl AsRef<Path>,
    layout: CircuitLayout,
    rng: &mut R,
) -> Result<Genotype, LoadError> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let format = SeedFormat::from_path(path);
    let genotype = match format {
        SeedFormat::Expression => seed_from_expressions(&text, layout, rng)?,
        SeedFormat::GateLevel => seed_from_gate_level(&text, layout, rng)?,
    };
    log::info!(
        "seeded {:?} circuit from {} ({} active gates)",
        format,
        path.display(),
        genotype.active_gate_count()
    );
    Ok(genotype)
}

// ----------------------------------------------------------------------
// Placement
// ----------------------------------------------------------------------

/// Places gates column by column, checking capacity and the levels-back
/// window.
struct SeedBuilder {
    layout: CircuitLayout,
    gates: Vec<Gate>,
}

impl SeedBuilder {
    fn new(layout: CircuitLayout) -> Self {
        Self {
            layout,
            gates: Vec::with_capacity(layout.columns),
        }
    }

    /// Appends a gate and returns its unified index.
    fn push(&mut self, kind: GateKind, a: usize, b: usize) -> Result<usize, LoadError> {
        let column = self.gates.len();
        if column >= self.layout.columns {
            return Err(LoadError::GateOverflow {
                available: self.layout.columns,
            });
        }
        for index in [a, b] {
            if !self.layout.allows(column, index) {
                return Err(LoadError::LevelsBack { column, index });
            }
        }
        self.gates.push(Gate::new(kind, a, b));
        Ok(self.layout.num_inputs + column)
    }

    fn finish<R: Rng>(mut self, outputs: Vec<usize>, rng: &mut R) -> Result<Genotype, LoadError> {
        for column in self.gates.len()..self.layout.columns {
            self.gates.push(random_gate(&self.layout, column, rng));
        }
        Genotype::from_parts(self.layout, self.gates, outputs)
            .map_err(|e| LoadError::InvalidSeed(e.to_string()))
    }
}

fn check_dimension(what: &'static str, expected: usize, found: usize) -> Result<(), LoadError> {
    if expected == found {
        Ok(())
    } else {
        Err(LoadError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

// ----------------------------------------------------------------------
// Expression format
// ----------------------------------------------------------------------

/// Builds a two-level AND/OR circuit from sum-of-products lines.
///
/// Headers are optional; when present they must match `layout`.
pub fn seed_from_expressions<R: Rng>(
    text: &str,
    layout: CircuitLayout,
    rng: &mut R,
) -> Result<Genotype, LoadError> {
    let lines = ExpressionLines::parse(text)?;
    if let Some(inputs) = lines.inputs {
        check_dimension("inputs", layout.num_inputs, inputs)?;
    }
    if let Some(outputs) = lines.outputs {
        check_dimension("outputs", layout.num_outputs, outputs)?;
    }
    lines.check(layout.num_inputs, layout.num_outputs)?;

    let mut builder = SeedBuilder::new(layout);
    let complements = (0..layout.num_inputs)
        .map(|k| builder.push(GateKind::Not, k, k))
        .collect::<Result<Vec<_>, _>>()?;
    let literal = |var: usize, negated: bool| if negated { complements[var] } else { var };

    let mut outputs = Vec::with_capacity(layout.num_outputs);
    for (_, _, sop) in &lines.expressions {
        if sop.terms.is_empty() {
            outputs.push(builder.push(GateKind::And, 0, complements[0])?);
            continue;
        }
        let mut sum = None;
        for term in &sop.terms {
            let product = match term.split_first() {
                None => builder.push(GateKind::Or, 0, complements[0])?,
                Some((first, rest)) => {
                    let mut acc = literal(first.var, first.negated);
                    for lit in rest {
                        acc = builder.push(GateKind::And, acc, literal(lit.var, lit.negated))?;
                    }
                    acc
                }
            };
            sum = Some(match sum {
                None => product,
                Some(acc) => builder.push(GateKind::Or, acc, product)?,
            });
        }
        // `terms` is non-empty here.
        outputs.extend(sum);
    }
    builder.finish(outputs, rng)
}

// ----------------------------------------------------------------------
// Gate-level format
// ----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Punct(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::Punct(c) => write!(f, "`{c}`"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, LoadError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut line = 1;
    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut prev = ' ';
                loop {
                    match chars.next() {
                        Some('/') if prev == '*' => break,
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            prev = c;
                        }
                        None => return Err(LoadError::syntax(start, "unterminated comment")),
                    }
                }
            }
            '(' | ')' | ',' | ';' | '=' | '~' | '&' | '^' | '|' => {
                tokens.push((line, Token::Punct(c)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' || n == '$' {
                        ident.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((line, Token::Ident(ident)));
            }
            other => return Err(LoadError::syntax(line, format!("unexpected character `{other}`"))),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Name(String),
    Not(Box<Expr>),
    Binary(GateKind, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Primitive {
    Gate(GateKind),
    Buf,
}

impl Primitive {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "buf" => Some(Primitive::Buf),
            "and" | "or" | "not" | "nand" | "nor" | "xor" | "xnor" => {
                word.parse().ok().map(Primitive::Gate)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Statement {
    Assign { target: String, expr: Expr },
    Instance { primitive: Primitive, pins: Vec<String> },
}

#[derive(Debug, Default)]
struct Netlist {
    inputs: Vec<(usize, String)>,
    outputs: Vec<String>,
    statements: Vec<(usize, Statement)>,
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(1, |(l, _)| *l)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), LoadError> {
        let line = self.line();
        match self.next() {
            Some((_, Token::Punct(p))) if p == c => Ok(()),
            Some((_, t)) => Err(LoadError::syntax(line, format!("expected `{c}`, found {t}"))),
            None => Err(LoadError::syntax(line, format!("expected `{c}` at end of file"))),
        }
    }

    fn ident(&mut self) -> Result<String, LoadError> {
        let line = self.line();
        match self.next() {
            Some((_, Token::Ident(s))) => Ok(s),
            Some((_, t)) => Err(LoadError::syntax(line, format!("expected a name, found {t}"))),
            None => Err(LoadError::syntax(line, "expected a name at end of file")),
        }
    }

    /// `name (',' name)*` followed by `terminator`.
    fn names(&mut self, terminator: char) -> Result<Vec<String>, LoadError> {
        let mut names = vec![self.ident()?];
        while self.eat(',') {
            names.push(self.ident()?);
        }
        self.expect(terminator)?;
        Ok(names)
    }

    fn netlist(&mut self) -> Result<Netlist, LoadError> {
        let mut netlist = Netlist::default();
        while let Some((line, token)) = self.next() {
            let word = match token {
                Token::Ident(word) => word,
                other => return Err(LoadError::syntax(line, format!("unexpected {other}"))),
            };
            match word.as_str() {
                "module" => {
                    self.ident()?;
                    if self.eat('(') && !self.eat(')') {
                        self.names(')')?;
                    }
                    self.expect(';')?;
                }
                "endmodule" => {}
                "input" => {
                    let names = self.names(';')?;
                    netlist.inputs.extend(names.into_iter().map(|n| (line, n)));
                }
                "output" => netlist.outputs.extend(self.names(';')?),
                "wire" => {
                    self.names(';')?;
                }
                "assign" => {
                    let target = self.ident()?;
                    self.expect('=')?;
                    let expr = self.or_expr()?;
                    self.expect(';')?;
                    netlist
                        .statements
                        .push((line, Statement::Assign { target, expr }));
                }
                other => {
                    let primitive = Primitive::from_keyword(other).ok_or_else(|| {
                        LoadError::syntax(line, format!("unsupported statement `{other}`"))
                    })?;
                    if matches!(self.peek(), Some(Token::Ident(_))) {
                        self.ident()?;
                    }
                    self.expect('(')?;
                    let pins = self.names(')')?;
                    self.expect(';')?;
                    netlist
                        .statements
                        .push((line, Statement::Instance { primitive, pins }));
                }
            }
        }
        Ok(netlist)
    }

    fn binary_chain(
        &mut self,
        op: char,
        kind: GateKind,
        operand: fn(&mut Self) -> Result<Expr, LoadError>,
    ) -> Result<Expr, LoadError> {
        let mut left = operand(self)?;
        while self.eat(op) {
            let right = operand(self)?;
            left = Expr::Binary(kind, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn or_expr(&mut self) -> Result<Expr, LoadError> {
        self.binary_chain('|', GateKind::Or, Self::xor_expr)
    }

    fn xor_expr(&mut self) -> Result<Expr, LoadError> {
        self.binary_chain('^', GateKind::Xor, Self::and_expr)
    }

    fn and_expr(&mut self) -> Result<Expr, LoadError> {
        self.binary_chain('&', GateKind::And, Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, LoadError> {
        if self.eat('~') {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.eat('(') {
            let inner = self.or_expr()?;
            self.expect(')')?;
            return Ok(inner);
        }
        Ok(Expr::Name(self.ident()?))
    }
}

/// Non-inverting counterpart used for the inner links of an n-input chain.
fn base_kind(kind: GateKind) -> GateKind {
    match kind {
        GateKind::Nand => GateKind::And,
        GateKind::Nor => GateKind::Or,
        GateKind::Xnor => GateKind::Xor,
        other => other,
    }
}

struct Elaborator {
    builder: SeedBuilder,
    signals: HashMap<String, usize>,
}

impl Elaborator {
    fn lookup(&self, line: usize, name: &str) -> Result<usize, LoadError> {
        self.signals
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::syntax(line, format!("`{name}` is used before it is driven")))
    }

    fn drive(&mut self, line: usize, name: &str, index: usize) -> Result<(), LoadError> {
        if self.signals.insert(name.to_string(), index).is_some() {
            return Err(LoadError::syntax(line, format!("`{name}` is driven twice")));
        }
        Ok(())
    }

    fn lower(&mut self, line: usize, expr: &Expr) -> Result<usize, LoadError> {
        match expr {
            Expr::Name(name) => self.lookup(line, name),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Not(x) => self.lower(line, x),
                Expr::Binary(kind, a, b) if kind.inverted().is_some() => {
                    let (a, b) = (self.lower(line, a)?, self.lower(line, b)?);
                    let inverted = kind.inverted().unwrap_or(*kind);
                    self.builder.push(inverted, a, b)
                }
                other => {
                    let a = self.lower(line, other)?;
                    self.builder.push(GateKind::Not, a, a)
                }
            },
            Expr::Binary(kind, a, b) => {
                let (a, b) = (self.lower(line, a)?, self.lower(line, b)?);
                self.builder.push(*kind, a, b)
            }
        }
    }

    fn instance(&mut self, line: usize, primitive: Primitive, pins: &[String]) -> Result<(), LoadError> {
        let (out, ins) = pins
            .split_first()
            .ok_or_else(|| LoadError::syntax(line, "primitive needs an output"))?;
        let ins = ins
            .iter()
            .map(|n| self.lookup(line, n))
            .collect::<Result<Vec<_>, _>>()?;
        let index = match primitive {
            Primitive::Buf | Primitive::Gate(GateKind::Not) => {
                let &[a] = ins.as_slice() else {
                    return Err(LoadError::syntax(line, "buf/not take exactly one input"));
                };
                if primitive == Primitive::Buf {
                    a
                } else {
                    self.builder.push(GateKind::Not, a, a)?
                }
            }
            Primitive::Gate(kind) => {
                if ins.len() < 2 {
                    return Err(LoadError::syntax(
                        line,
                        format!("`{}` needs at least two inputs", kind.name().to_lowercase()),
                    ));
                }
                let last = ins.len() - 2;
                let mut acc = ins[0];
                for (k, &x) in ins[1..].iter().enumerate() {
                    let op = if k == last { kind } else { base_kind(kind) };
                    acc = self.builder.push(op, acc, x)?;
                }
                acc
            }
        };
        self.drive(line, out, index)
    }
}

/// Builds a genotype from a structural Verilog netlist.
pub fn seed_from_gate_level<R: Rng>(
    text: &str,
    layout: CircuitLayout,
    rng: &mut R,
) -> Result<Genotype, LoadError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let netlist = parser.netlist()?;
    check_dimension("inputs", layout.num_inputs, netlist.inputs.len())?;
    check_dimension("outputs", layout.num_outputs, netlist.outputs.len())?;

    let mut elab = Elaborator {
        builder: SeedBuilder::new(layout),
        signals: HashMap::new(),
    };
    for (k, (line, name)) in netlist.inputs.iter().enumerate() {
        elab.drive(*line, name, k)?;
    }
    for (line, statement) in &netlist.statements {
        match statement {
            Statement::Assign { target, expr } => {
                let index = elab.lower(*line, expr)?;
                elab.drive(*line, target, index)?;
            }
            Statement::Instance { primitive, pins } => elab.instance(*line, *primitive, pins)?,
        }
    }
    let outputs = netlist
        .outputs
        .iter()
        .map(|name| {
            elab.signals
                .get(name)
                .copied()
                .ok_or_else(|| LoadError::Undriven(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    elab.builder.finish(outputs, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdd::BddManager;
    use crate::random::create_rng;
    use std::io::Write;

    /// Asserts that `g` computes `expected` on every input assignment.
    fn assert_computes(g: &Genotype, expected: impl Fn(&[bool]) -> Vec<bool>) {
        let ni = g.layout().num_inputs;
        let mut engine = BddManager::new(ni, 4096);
        let functions = g.output_functions(&mut engine);
        for bits in 0..1u32 << ni {
            let a: Vec<bool> = (0..ni).map(|i| bits >> i & 1 == 1).collect();
            let got: Vec<bool> = functions.iter().map(|&f| engine.eval(f, &a)).collect();
            assert_eq!(got, expected(&a), "assignment {a:?}");
        }
    }

    fn layout(ni: usize, no: usize, cols: usize) -> CircuitLayout {
        CircuitLayout::new(ni, no, cols, cols).unwrap()
    }

    // ---- Expression format ----

    #[test]
    fn test_expression_seed_and() {
        let mut rng = create_rng(1);
        let g = seed_from_expressions(".inputs 2\n.outputs 1\ni0 & i1\n", layout(2, 1, 5), &mut rng)
            .unwrap();
        assert_eq!(g.gates()[0], Gate::new(GateKind::Not, 0, 0));
        assert_eq!(g.gates()[1], Gate::new(GateKind::Not, 1, 1));
        assert_eq!(g.gates()[2], Gate::new(GateKind::And, 0, 1));
        assert_eq!(g.outputs(), &[4]);
        assert!(g.check_invariant().is_ok());
        assert_computes(&g, |a| vec![a[0] && a[1]]);
    }

    #[test]
    fn test_expression_seed_without_headers() {
        let mut rng = create_rng(2);
        let text = "!i0 & i1 | i0 & !i1\ni0 & i1\n";
        let g = seed_from_expressions(text, layout(2, 2, 10), &mut rng).unwrap();
        assert_computes(&g, |a| vec![a[0] ^ a[1], a[0] && a[1]]);
        // Two NOTs, two ANDs, one OR, one AND.
        assert_eq!(g.active_gate_count(), 6);
    }

    #[test]
    fn test_expression_seed_constants() {
        let mut rng = create_rng(3);
        let g = seed_from_expressions("1\n0\n", layout(1, 2, 4), &mut rng).unwrap();
        assert_computes(&g, |_| vec![true, false]);
    }

    #[test]
    fn test_expression_seed_single_literal_needs_no_gate() {
        let mut rng = create_rng(4);
        let g = seed_from_expressions("!i1\n", layout(2, 1, 2), &mut rng).unwrap();
        assert_eq!(g.outputs(), &[3]);
        assert_computes(&g, |a| vec![!a[1]]);
    }

    #[test]
    fn test_expression_seed_overflow() {
        let mut rng = create_rng(5);
        let err = seed_from_expressions("i0 & i1\n", layout(2, 1, 2), &mut rng).unwrap_err();
        assert!(matches!(err, LoadError::GateOverflow { available: 2 }));
    }

    #[test]
    fn test_expression_seed_dimension_mismatch() {
        let mut rng = create_rng(6);
        let err = seed_from_expressions(".inputs 3\ni0\n", layout(2, 1, 4), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DimensionMismatch {
                what: "inputs",
                expected: 2,
                found: 3
            }
        ));
        let err = seed_from_expressions("i0\ni1\n", layout(2, 1, 4), &mut rng).unwrap_err();
        assert!(matches!(err, LoadError::OutputCount { .. }));
    }

    #[test]
    fn test_expression_seed_levels_back() {
        let mut rng = create_rng(7);
        // Column 3 may only reach back one column, but reads NOT(i0) at column 0.
        let narrow = CircuitLayout::new(2, 1, 6, 1).unwrap();
        let err = seed_from_expressions("!i0 & i1 & i0\n", narrow, &mut rng).unwrap_err();
        assert!(matches!(err, LoadError::LevelsBack { column: 2, index: 2 }));
    }

    // ---- Gate-level format ----

    const HALF_ADDER: &str = "\
// half adder
module half_adder(a, b, s, c);
  input a, b;
  output s, c;
  wire t;
  xor x0 (s, a, b);
  /* carry
     out */
  assign t = a & b;
  buf (c, t);
endmodule
";

    #[test]
    fn test_gate_level_half_adder() {
        let mut rng = create_rng(8);
        let g = seed_from_gate_level(HALF_ADDER, layout(2, 2, 6), &mut rng).unwrap();
        assert_eq!(g.gates()[0].kind, GateKind::Xor);
        assert_eq!(g.gates()[1].kind, GateKind::And);
        assert_eq!(g.outputs(), &[2, 3]);
        assert_computes(&g, |a| vec![a[0] ^ a[1], a[0] && a[1]]);
    }

    #[test]
    fn test_gate_level_negation_folds() {
        let mut rng = create_rng(9);
        let text = "input a, b; output y, z;\nassign y = ~(a & b);\nassign z = ~~a;\n";
        let g = seed_from_gate_level(text, layout(2, 2, 3), &mut rng).unwrap();
        assert_eq!(g.gates()[0], Gate::new(GateKind::Nand, 0, 1));
        assert_eq!(g.outputs(), &[2, 0]);
        assert_eq!(g.active_gate_count(), 1);
    }

    #[test]
    fn test_gate_level_precedence() {
        let mut rng = create_rng(10);
        let text = "input a, b, c; output y;\nassign y = a | b & ~c ^ a;\n";
        let g = seed_from_gate_level(text, layout(3, 1, 8), &mut rng).unwrap();
        assert_computes(&g, |v| vec![v[0] | ((v[1] & !v[2]) ^ v[0])]);
    }

    #[test]
    fn test_gate_level_n_input_chain() {
        let mut rng = create_rng(11);
        let text = "input a, b, c; output y;\nnand g1 (y, a, b, c);\n";
        let g = seed_from_gate_level(text, layout(3, 1, 4), &mut rng).unwrap();
        assert_eq!(g.gates()[0].kind, GateKind::And);
        assert_eq!(g.gates()[1].kind, GateKind::Nand);
        assert_computes(&g, |v| vec![!(v[0] && v[1] && v[2])]);
    }

    #[test]
    fn test_gate_level_not_primitive() {
        let mut rng = create_rng(12);
        let text = "input a; output y;\nnot (y, a);\n";
        let g = seed_from_gate_level(text, layout(1, 1, 2), &mut rng).unwrap();
        assert_computes(&g, |v| vec![!v[0]]);
    }

    #[test]
    fn test_gate_level_errors() {
        let mut rng = create_rng(13);
        let l = layout(2, 1, 4);
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\n", l, &mut rng),
            Err(LoadError::Undriven(name)) if name == "y"
        ));
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\nassign y = a & t;\n", l, &mut rng),
            Err(LoadError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\nassign y = a + b;\n", l, &mut rng),
            Err(LoadError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\nreg r;\n", l, &mut rng),
            Err(LoadError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\nassign a = b;\n", l, &mut rng),
            Err(LoadError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            seed_from_gate_level("input a, b; output y;\nand (y, a);\n", l, &mut rng),
            Err(LoadError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            seed_from_gate_level("input a; output y;\nassign y = a;\n", l, &mut rng),
            Err(LoadError::DimensionMismatch { what: "inputs", .. })
        ));
    }

    #[test]
    fn test_gate_level_overflow() {
        let mut rng = create_rng(14);
        let text = "input a, b; output y;\nassign y = (a & b) | (a ^ b);\n";
        assert!(matches!(
            seed_from_gate_level(text, layout(2, 1, 2), &mut rng),
            Err(LoadError::GateOverflow { available: 2 })
        ));
    }

    #[test]
    fn test_padding_is_unreachable() {
        let mut rng = create_rng(15);
        let text = "input a, b; output y;\nassign y = a ^ b;\n";
        let g = seed_from_gate_level(text, layout(2, 1, 30), &mut rng).unwrap();
        assert_eq!(g.gates().len(), 30);
        assert_eq!(g.active_gate_count(), 1);
        assert!(g.check_invariant().is_ok());
    }

    // ---- File loading ----

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SeedFormat::from_path(Path::new("adder.v")), SeedFormat::GateLevel);
        assert_eq!(SeedFormat::from_path(Path::new("adder.txt")), SeedFormat::Expression);
        assert_eq!(SeedFormat::from_path(Path::new("adder")), SeedFormat::Expression);
    }

    #[test]
    fn test_load_seed_from_file() {
        let mut rng = create_rng(16);
        let mut file = tempfile::Builder::new().suffix(".v").tempfile().unwrap();
        file.write_all(b"input a, b; output y;\nassign y = a & b;\n").unwrap();
        file.flush().unwrap();
        let g = load_seed(file.path(), layout(2, 1, 3), &mut rng).unwrap();
        assert_computes(&g, |v| vec![v[0] && v[1]]);

        let err = load_seed("/nonexistent/seed.v", layout(2, 1, 3), &mut rng).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_seed_expression_file() {
        let mut rng = create_rng(17);
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b".inputs 2\n.outputs 1\ni0 & i1\n").unwrap();
        file.flush().unwrap();
        let g = load_seed(file.path(), layout(2, 1, 5), &mut rng).unwrap();
        assert_eq!(g.gates()[0], Gate::new(GateKind::Not, 0, 0));
        assert_computes(&g, |v| vec![v[0] && v[1]]);
    }
}
