//! Technology model: per-gate transistor cost, propagation delay, and the
//! switching-power scale factor.
//!
//! The numbers are domain constants. The defaults describe static CMOS
//! (NAND/NOR as the primitive cells, AND/OR as NAND/NOR plus an inverter,
//! XOR/XNOR as transmission-gate cells) with delays relative to one
//! inverter, and unit load, frequency and supply voltage.

use super::types::GateKind;

/// Lookup table of gate costs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TechnologyModel {
    /// Transistor count per gate, indexed by [`GateKind::ordinal`].
    pub transistors: [u32; 7],
    /// Propagation delay per gate, indexed by [`GateKind::ordinal`].
    pub delays: [f64; 7],
    /// Load capacitance per gate output.
    pub load_capacitance: f64,
    /// Clock frequency.
    pub frequency: f64,
    /// Supply voltage.
    pub supply_voltage: f64,
}

impl Default for TechnologyModel {
    fn default() -> Self {
        Self {
            //            AND OR NOT NAND NOR XOR XNOR
            transistors: [6, 6, 2, 4, 4, 8, 8],
            delays: [2.4, 2.4, 1.0, 1.4, 1.4, 3.0, 3.0],
            load_capacitance: 1.0,
            frequency: 1.0,
            supply_voltage: 1.0,
        }
    }
}

impl TechnologyModel {
    /// Transistor cost of one gate.
    pub fn transistors(&self, kind: GateKind) -> u32 {
        self.transistors[kind.ordinal()]
    }

    /// Propagation delay of one gate.
    pub fn delay(&self, kind: GateKind) -> f64 {
        self.delays[kind.ordinal()]
    }

    /// `C_load * f * Vdd^2`, the factor applied to summed activity.
    pub fn power_scale(&self) -> f64 {
        self.load_capacitance * self.frequency * self.supply_voltage * self.supply_voltage
    }
}
