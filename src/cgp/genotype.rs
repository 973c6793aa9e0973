//! CGP genotype: encoding, phenotype decoding, and fitness evaluation.
//!
//! A genotype is a row of `columns` two-input gates plus one output gene per
//! circuit output. Connections use a unified index space where
//! `0..num_inputs` are primary inputs and `num_inputs + c` is the gate at
//! column `c`. A gate may only read primary inputs or gates inside its
//! levels-back window, so every genotype is acyclic by construction.
//!
//! # Evaluation passes
//!
//! Decoding, delay, and power all share one recursive, memoized walk
//! ([`Genotype::propagate`]). Its memo is a fresh `Vec<Option<T>>` per pass
//! and never outlives it; gates the walk never reaches are dead code and
//! cost nothing. Reachability for mutation is computed separately by
//! [`Genotype::reachable_from`].

use super::config::CircuitLayout;
use super::technology::TechnologyModel;
use super::types::{Fitness, Gate, GateKind, Gene};
use crate::bdd::{Bdd, BddManager};
use crate::error::CgpError;
use crate::io::Target;
use crate::random::redraw_excluding;
use rand::Rng;
use std::fmt;

/// Value handed to the combine step of [`Genotype::propagate`].
enum Signal<T> {
    /// Primary input `i`.
    Input(usize),
    /// A gate with its (already propagated) operands. NOT receives its
    /// single operand twice.
    Gate(GateKind, T, T),
}

/// One candidate circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    layout: CircuitLayout,
    gates: Vec<Gate>,
    outputs: Vec<usize>,
    fitness: Fitness,
}

impl Genotype {
    /// Creates a uniformly random genotype respecting the levels-back window.
    pub fn random<R: Rng>(layout: CircuitLayout, rng: &mut R) -> Self {
        let gates = (0..layout.columns)
            .map(|column| random_gate(&layout, column, rng))
            .collect();
        let outputs = (0..layout.num_outputs)
            .map(|_| rng.random_range(0..layout.unified_len()))
            .collect();
        Self {
            layout,
            gates,
            outputs,
            fitness: Fitness::unevaluated(layout.num_outputs),
        }
    }

    /// Builds a genotype from explicit genes, checking the encoding invariant.
    pub fn from_parts(
        layout: CircuitLayout,
        gates: Vec<Gate>,
        outputs: Vec<usize>,
    ) -> Result<Self, CgpError> {
        let genotype = Self {
            layout,
            gates,
            outputs,
            fitness: Fitness::unevaluated(layout.num_outputs),
        };
        genotype.check_invariant()?;
        Ok(genotype)
    }

    /// Verifies shape, index ranges, and the levels-back window.
    pub fn check_invariant(&self) -> Result<(), CgpError> {
        let layout = &self.layout;
        if self.gates.len() != layout.columns {
            return Err(CgpError::ShapeMismatch(format!(
                "{} gates for {} columns",
                self.gates.len(),
                layout.columns
            )));
        }
        if self.outputs.len() != layout.num_outputs {
            return Err(CgpError::ShapeMismatch(format!(
                "{} output genes for {} outputs",
                self.outputs.len(),
                layout.num_outputs
            )));
        }
        let limit = layout.unified_len();
        for (column, gate) in self.gates.iter().enumerate() {
            for &index in &gate.inputs {
                if index >= limit {
                    return Err(CgpError::IndexOutOfRange { index, limit });
                }
                if !layout.allows(column, index) {
                    return Err(CgpError::LevelsBackViolation { column, index });
                }
            }
        }
        if let Some(&index) = self.outputs.iter().find(|&&o| o >= limit) {
            return Err(CgpError::IndexOutOfRange { index, limit });
        }
        Ok(())
    }

    pub fn layout(&self) -> &CircuitLayout {
        &self.layout
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    pub fn fitness(&self) -> &Fitness {
        &self.fitness
    }

    pub(crate) fn fitness_mut(&mut self) -> &mut Fitness {
        &mut self.fitness
    }

    // ------------------------------------------------------------------
    // Reachability
    // ------------------------------------------------------------------

    /// Columns reachable from any output.
    pub fn active_columns(&self) -> Vec<bool> {
        self.reachable_from(&self.outputs)
    }

    /// Columns reachable from the given unified indices. The second input
    /// of a NOT gate is not followed.
    pub fn reachable_from(&self, roots: &[usize]) -> Vec<bool> {
        let ni = self.layout.num_inputs;
        let mut active = vec![false; self.gates.len()];
        let mut stack: Vec<usize> = roots.iter().copied().filter(|&i| i >= ni).collect();
        while let Some(index) = stack.pop() {
            let column = index - ni;
            if active[column] {
                continue;
            }
            active[column] = true;
            let gate = &self.gates[column];
            let arity = if gate.kind.is_unary() { 1 } else { 2 };
            for &input in &gate.inputs[..arity] {
                if input >= ni && !active[input - ni] {
                    stack.push(input);
                }
            }
        }
        active
    }

    /// Number of gates reachable from the outputs.
    pub fn active_gate_count(&self) -> usize {
        self.active_columns().iter().filter(|&&a| a).count()
    }

    /// Whether changing `gene` can change the phenotype, given the
    /// reachability mask `active`.
    pub fn is_active_gene(&self, gene: Gene, active: &[bool]) -> bool {
        match gene {
            Gene::Output { .. } => true,
            Gene::Function { column } => active[column],
            Gene::Input { column, slot } => {
                active[column] && (slot == 0 || !self.gates[column].kind.is_unary())
            }
        }
    }

    // ------------------------------------------------------------------
    // Genes
    // ------------------------------------------------------------------

    /// Total number of genes.
    pub fn gene_count(&self) -> usize {
        self.layout.gene_count()
    }

    /// The gene at flat position `k` (see [`Gene`]).
    ///
    /// # Panics
    /// Panics if `k >= gene_count()`.
    pub fn gene(&self, k: usize) -> Gene {
        assert!(k < self.gene_count(), "gene {k} out of range");
        let gate_genes = 3 * self.layout.columns;
        if k < gate_genes {
            let column = k / 3;
            match k % 3 {
                2 => Gene::Function { column },
                slot => Gene::Input { column, slot },
            }
        } else {
            Gene::Output {
                index: k - gate_genes,
            }
        }
    }

    /// Picks a gene uniformly at random.
    pub fn random_gene<R: Rng>(&self, rng: &mut R) -> Gene {
        self.gene(rng.random_range(0..self.gene_count()))
    }

    /// Redraws one gene to a different valid value.
    ///
    /// Returns `false` if the gene has no alternative value.
    pub fn mutate_gene<R: Rng>(&mut self, gene: Gene, rng: &mut R) -> bool {
        let layout = self.layout;
        match gene {
            Gene::Input { column, slot } => {
                let current = self.gates[column].inputs[slot];
                let Some(position) = layout.connection_position(column, current) else {
                    debug_assert!(false, "gate {column} holds an invalid connection");
                    return false;
                };
                match redraw_excluding(layout.connection_count(column), position, rng) {
                    Some(k) => {
                        self.gates[column].inputs[slot] = layout.connection_at(column, k);
                        true
                    }
                    None => false,
                }
            }
            Gene::Function { column } => {
                let current = self.gates[column].kind.ordinal();
                match redraw_excluding(GateKind::ALL.len(), current, rng) {
                    Some(k) => {
                        self.gates[column].kind = GateKind::ALL[k];
                        true
                    }
                    None => false,
                }
            }
            Gene::Output { index } => {
                match redraw_excluding(layout.unified_len(), self.outputs[index], rng) {
                    Some(v) => {
                        self.outputs[index] = v;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------

    /// Decodes the Boolean function computed at unified index `index`.
    pub fn decode(&self, engine: &mut BddManager, index: usize) -> Result<Bdd, CgpError> {
        let limit = self.layout.unified_len();
        if index >= limit {
            return Err(CgpError::IndexOutOfRange { index, limit });
        }
        let mut memo = vec![None; self.gates.len()];
        Ok(self.propagate(index, &mut memo, &mut |signal| bdd_signal(engine, signal)))
    }

    /// Decodes every output in one pass.
    pub fn output_functions(&self, engine: &mut BddManager) -> Vec<Bdd> {
        let mut memo = vec![None; self.gates.len()];
        let mut combine = |signal| bdd_signal(engine, signal);
        self.outputs
            .iter()
            .map(|&o| self.propagate(o, &mut memo, &mut combine))
            .collect()
    }

    /// Recursive memoized walk from `index` down to the primary inputs.
    fn propagate<T, F>(&self, index: usize, memo: &mut [Option<T>], combine: &mut F) -> T
    where
        T: Copy,
        F: FnMut(Signal<T>) -> T,
    {
        let ni = self.layout.num_inputs;
        if index < ni {
            return combine(Signal::Input(index));
        }
        let column = index - ni;
        if let Some(value) = memo[column] {
            return value;
        }
        let gate = self.gates[column];
        let left = self.propagate(gate.inputs[0], memo, combine);
        let right = if gate.kind.is_unary() {
            left
        } else {
            self.propagate(gate.inputs[1], memo, combine)
        };
        let value = combine(Signal::Gate(gate.kind, left, right));
        memo[column] = Some(value);
        value
    }

    // ------------------------------------------------------------------
    // Fitness
    // ------------------------------------------------------------------

    /// Computes per-output mismatches, aggregate error, mean relative
    /// error, and transistor count against `target`.
    pub fn evaluate_functional_error(
        &mut self,
        engine: &mut BddManager,
        target: &Target,
        tech: &TechnologyModel,
    ) {
        debug_assert_eq!(target.functions().len(), self.outputs.len());
        let functions = self.output_functions(engine);
        let space = (1u64 << self.layout.num_inputs) as f64;

        let mismatches: Vec<u64> = functions
            .iter()
            .zip(target.functions())
            .map(|(&f, &t)| {
                let diff = engine.xor(f, t);
                engine.sat_count(diff)
            })
            .collect();

        let error: u128 = mismatches.iter().map(|&m| u128::from(m)).sum();
        let mean_relative_error = mismatches.iter().map(|&m| m as f64 / space).sum::<f64>()
            / mismatches.len() as f64;
        let transistors = self.transistor_count(tech);

        self.fitness.mismatches = mismatches;
        self.fitness.error = error;
        self.fitness.mean_relative_error = mean_relative_error;
        self.fitness.transistors = transistors;
    }

    /// Transistor cost of the reachable gates.
    pub fn transistor_count(&self, tech: &TechnologyModel) -> u32 {
        self.active_columns()
            .iter()
            .zip(&self.gates)
            .filter(|(active, _)| **active)
            .map(|(_, gate)| tech.transistors(gate.kind))
            .sum()
    }

    /// Critical-path delay over all outputs; stores and returns it.
    pub fn evaluate_delay(&mut self, tech: &TechnologyModel) -> f64 {
        let mut memo = vec![None; self.gates.len()];
        let mut combine = |signal: Signal<f64>| match signal {
            Signal::Input(_) => 0.0,
            Signal::Gate(kind, l, _) if kind.is_unary() => l + tech.delay(kind),
            Signal::Gate(kind, l, r) => f64::max(l, r) + tech.delay(kind),
        };
        let delay = self
            .outputs
            .iter()
            .map(|&o| self.propagate(o, &mut memo, &mut combine))
            .fold(0.0, f64::max);
        self.fitness.delay = delay;
        delay
    }

    /// Switching power of the reachable gates; stores and returns it.
    pub fn evaluate_power(&mut self, tech: &TechnologyModel) -> f64 {
        let mut memo = vec![None; self.gates.len()];
        let mut combine = |signal: Signal<f64>| match signal {
            Signal::Input(_) => 0.5,
            Signal::Gate(kind, l, r) => signal_probability(kind, l, r),
        };
        for &o in &self.outputs {
            self.propagate(o, &mut memo, &mut combine);
        }
        let activity: f64 = memo.iter().flatten().map(|p| p * (1.0 - p)).sum();
        let power = activity * tech.power_scale();
        self.fitness.power = power;
        power
    }

    /// Evaluates delay and power; needs no engine access.
    pub fn evaluate_timing_and_power(&mut self, tech: &TechnologyModel) {
        self.evaluate_delay(tech);
        self.evaluate_power(tech);
    }
}

impl fmt::Display for Genotype {
    /// Writes the reachable netlist followed by the output mapping.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ni = self.layout.num_inputs;
        let name = |index: usize| {
            if index < ni {
                format!("i{index}")
            } else {
                format!("g{}", index - ni)
            }
        };
        for (column, (gate, active)) in self.gates.iter().zip(self.active_columns()).enumerate() {
            if !active {
                continue;
            }
            if gate.kind.is_unary() {
                writeln!(f, "g{column} = {}({})", gate.kind, name(gate.inputs[0]))?;
            } else {
                writeln!(
                    f,
                    "g{column} = {}({}, {})",
                    gate.kind,
                    name(gate.inputs[0]),
                    name(gate.inputs[1])
                )?;
            }
        }
        for (k, &o) in self.outputs.iter().enumerate() {
            writeln!(f, "o{k} = {}", name(o))?;
        }
        Ok(())
    }
}

/// A random gate for `column`, inputs drawn uniformly from its window.
pub(crate) fn random_gate<R: Rng>(layout: &CircuitLayout, column: usize, rng: &mut R) -> Gate {
    let count = layout.connection_count(column);
    let a = layout.connection_at(column, rng.random_range(0..count));
    let b = layout.connection_at(column, rng.random_range(0..count));
    let kind = GateKind::ALL[rng.random_range(0..GateKind::ALL.len())];
    Gate::new(kind, a, b)
}

fn bdd_signal(engine: &mut BddManager, signal: Signal<Bdd>) -> Bdd {
    match signal {
        Signal::Input(i) => engine.var(i),
        Signal::Gate(kind, a, b) => match kind {
            GateKind::And => engine.and(a, b),
            GateKind::Or => engine.or(a, b),
            GateKind::Xor => engine.xor(a, b),
            GateKind::Not => engine.not(a),
            GateKind::Nand => {
                let t = engine.and(a, b);
                engine.not(t)
            }
            GateKind::Nor => {
                let t = engine.or(a, b);
                engine.not(t)
            }
            GateKind::Xnor => {
                let t = engine.xor(a, b);
                engine.not(t)
            }
        },
    }
}

/// Probability that a gate output is 1 given independent input probabilities.
fn signal_probability(kind: GateKind, l: f64, r: f64) -> f64 {
    match kind {
        GateKind::Not => 1.0 - l,
        GateKind::And => l * r,
        GateKind::Nand => 1.0 - l * r,
        GateKind::Or => 1.0 - (1.0 - l) * (1.0 - r),
        GateKind::Nor => (1.0 - l) * (1.0 - r),
        GateKind::Xor => 1.0 - ((1.0 - l) * (1.0 - r) + l * r),
        GateKind::Xnor => (1.0 - l) * (1.0 - r) + l * r,
    }
}
