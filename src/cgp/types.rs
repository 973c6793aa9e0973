//! Gate, gene, and fitness records shared by the CGP modules.

use super::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Function tag of a CGP node.
///
/// Every gate stores two input references; [`GateKind::Not`] reads only the
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GateKind {
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
    Xnor,
}

impl GateKind {
    /// All function tags, in gene-value order.
    pub const ALL: [GateKind; 7] = [
        GateKind::And,
        GateKind::Or,
        GateKind::Not,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
        GateKind::Xnor,
    ];

    /// Whether the gate reads only its first input.
    pub fn is_unary(self) -> bool {
        self == GateKind::Not
    }

    /// Position of this tag in [`GateKind::ALL`].
    pub fn ordinal(self) -> usize {
        match self {
            GateKind::And => 0,
            GateKind::Or => 1,
            GateKind::Not => 2,
            GateKind::Nand => 3,
            GateKind::Nor => 4,
            GateKind::Xor => 5,
            GateKind::Xnor => 6,
        }
    }

    /// The inverting counterpart of a non-inverting binary gate
    /// (AND → NAND, OR → NOR, XOR → XNOR).
    pub fn inverted(self) -> Option<GateKind> {
        match self {
            GateKind::And => Some(GateKind::Nand),
            GateKind::Or => Some(GateKind::Nor),
            GateKind::Xor => Some(GateKind::Xnor),
            _ => None,
        }
    }

    /// Evaluates the gate on concrete bits.
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            GateKind::And => a && b,
            GateKind::Or => a || b,
            GateKind::Not => !a,
            GateKind::Nand => !(a && b),
            GateKind::Nor => !(a || b),
            GateKind::Xor => a ^ b,
            GateKind::Xnor => !(a ^ b),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Not => "NOT",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
            GateKind::Xnor => "XNOR",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GateKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(GateKind::And),
            "or" => Ok(GateKind::Or),
            "not" => Ok(GateKind::Not),
            "nand" => Ok(GateKind::Nand),
            "nor" => Ok(GateKind::Nor),
            "xor" => Ok(GateKind::Xor),
            "xnor" => Ok(GateKind::Xnor),
            _ => Err(ConfigError::UnknownGate(s.to_string())),
        }
    }
}

/// One CGP node: a function tag and two unified-index connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gate {
    pub kind: GateKind,
    pub inputs: [usize; 2],
}

impl Gate {
    pub fn new(kind: GateKind, a: usize, b: usize) -> Self {
        Self {
            kind,
            inputs: [a, b],
        }
    }
}

/// Address of one gene in a genotype.
///
/// Genes are numbered `3 * column + {0, 1, 2}` for the two inputs and the
/// function of each column, followed by one gene per output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gene {
    /// Input `slot` (0 or 1) of the gate at `column`.
    Input { column: usize, slot: usize },
    /// Function tag of the gate at `column`.
    Function { column: usize },
    /// Output mapping `index`.
    Output { index: usize },
}

/// Fitness record of a genotype. All objectives are minimized.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fitness {
    /// Mismatching input assignments per output.
    pub mismatches: Vec<u64>,
    /// Sum of `mismatches`. Wider than a single count so that several
    /// outputs over 63 inputs cannot overflow it.
    pub error: u128,
    /// Mean over outputs of `mismatch / 2^num_inputs`.
    pub mean_relative_error: f64,
    /// Transistor cost of the reachable gates.
    pub transistors: u32,
    /// Switching power of the reachable gates (multi-objective mode).
    pub power: f64,
    /// Critical-path delay (multi-objective mode).
    pub delay: f64,
    /// Pareto rank from the last non-dominated sort (0 = front).
    pub rank: usize,
}

impl Fitness {
    /// An unevaluated record for `num_outputs` outputs: worst error.
    pub fn unevaluated(num_outputs: usize) -> Self {
        Self {
            mismatches: vec![u64::MAX; num_outputs],
            error: u128::MAX,
            mean_relative_error: f64::INFINITY,
            transistors: u32::MAX,
            power: f64::INFINITY,
            delay: f64::INFINITY,
            rank: usize::MAX,
        }
    }

    /// The (error, delay, power) objective vector used for Pareto ranking.
    pub fn objectives(&self) -> [f64; 3] {
        [self.error as f64, self.delay, self.power]
    }
}
