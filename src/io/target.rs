//! Target specification files.
//!
//! ```text
//! # full adder
//! .inputs 3
//! .outputs 2
//! .gates 5
//! i0 & !i1 & !i2 | !i0 & i1 & !i2 | !i0 & !i1 & i2 | i0 & i1 & i2
//! i0 & i1 | i0 & i2 | i1 & i2
//! ```

use super::expr::SumOfProducts;
use super::{read_file, LoadError};
use crate::bdd::{Bdd, BddManager, MAX_VARS};
use std::path::Path;

/// Header values and expression lines of a specification or expression
/// seed file, before any dimension checks.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExpressionLines {
    pub inputs: Option<usize>,
    pub outputs: Option<usize>,
    pub gates: Option<usize>,
    /// `(line number, source text, parsed expression)`
    pub expressions: Vec<(usize, String, SumOfProducts)>,
}

impl ExpressionLines {
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let mut parsed = Self::default();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            if let Some(directive) = content.strip_prefix('.') {
                if !parsed.expressions.is_empty() {
                    return Err(LoadError::syntax(line, "header after expressions"));
                }
                let mut parts = directive.split_whitespace();
                let key = parts.next().unwrap_or("");
                let value = parts
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or_else(|| LoadError::syntax(line, format!("`.{key}` needs a count")))?;
                if parts.next().is_some() {
                    return Err(LoadError::syntax(line, "trailing tokens after header"));
                }
                match key {
                    "inputs" => parsed.inputs = Some(value),
                    "outputs" => parsed.outputs = Some(value),
                    "gates" => parsed.gates = Some(value),
                    other => {
                        return Err(LoadError::syntax(line, format!("unknown header `.{other}`")))
                    }
                }
                continue;
            }
            let sop = SumOfProducts::parse(content).map_err(|m| LoadError::syntax(line, m))?;
            parsed.expressions.push((line, content.to_string(), sop));
        }
        Ok(parsed)
    }

    /// Checks expression count and variable range.
    pub fn check(&self, num_inputs: usize, num_outputs: usize) -> Result<(), LoadError> {
        if self.expressions.len() != num_outputs {
            return Err(LoadError::OutputCount {
                expected: num_outputs,
                found: self.expressions.len(),
            });
        }
        for (line, _, sop) in &self.expressions {
            if let Some(var) = sop.max_var().filter(|&v| v >= num_inputs) {
                return Err(LoadError::syntax(
                    *line,
                    format!("i{var} exceeds the {num_inputs} declared inputs"),
                ));
            }
        }
        Ok(())
    }
}

/// A parsed specification file, independent of any engine.
#[derive(Debug, Clone)]
pub struct SpecFile {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub gate_hint: Option<usize>,
    pub expressions: Vec<String>,
    products: Vec<SumOfProducts>,
}

impl SpecFile {
    /// Reads and parses a specification file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::parse(&read_file(path.as_ref())?)
    }

    /// Parses specification text.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let lines = ExpressionLines::parse(text)?;
        let num_inputs = lines.inputs.ok_or(LoadError::MissingHeader(".inputs"))?;
        let num_outputs = lines.outputs.ok_or(LoadError::MissingHeader(".outputs"))?;
        if num_inputs > MAX_VARS {
            return Err(LoadError::TooManyInputs {
                got: num_inputs,
                max: MAX_VARS,
            });
        }
        lines.check(num_inputs, num_outputs)?;
        let (expressions, products) = lines
            .expressions
            .into_iter()
            .map(|(_, text, sop)| (text, sop))
            .unzip();
        Ok(Self {
            num_inputs,
            num_outputs,
            gate_hint: lines.gates,
            expressions,
            products,
        })
    }

    /// Builds the canonical output functions.
    ///
    /// # Panics
    /// Panics if `engine` declares fewer variables than the file.
    pub fn build(&self, engine: &mut BddManager) -> Target {
        assert!(
            engine.num_vars() >= self.num_inputs,
            "engine has {} variables, specification needs {}",
            engine.num_vars(),
            self.num_inputs
        );
        let functions = self.products.iter().map(|p| p.build(engine)).collect();
        Target {
            num_inputs: self.num_inputs,
            gate_hint: self.gate_hint,
            expressions: self.expressions.clone(),
            functions,
        }
    }
}

/// The functions a circuit must reproduce, one per output.
#[derive(Debug, Clone)]
pub struct Target {
    num_inputs: usize,
    gate_hint: Option<usize>,
    expressions: Vec<String>,
    functions: Vec<Bdd>,
}

impl Target {
    /// A target given directly by its output functions.
    pub fn new(num_inputs: usize, functions: Vec<Bdd>) -> Self {
        Self {
            num_inputs,
            gate_hint: None,
            expressions: Vec::new(),
            functions,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.functions.len()
    }

    pub fn gate_hint(&self) -> Option<usize> {
        self.gate_hint
    }

    /// Source expressions, empty for targets built with [`Target::new`].
    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn functions(&self) -> &[Bdd] {
        &self.functions
    }

    /// Engine roots to keep alive across compaction.
    pub fn functions_mut(&mut self) -> &mut [Bdd] {
        &mut self.functions
    }

    /// Replaces the equivalence baseline with functionally identical
    /// functions decoded from a feasible circuit.
    ///
    /// # Panics
    /// Panics if the output count changes.
    pub fn replace_functions(&mut self, functions: Vec<Bdd>) {
        assert_eq!(
            functions.len(),
            self.functions.len(),
            "replacement must keep the output count"
        );
        self.functions = functions;
    }
}
