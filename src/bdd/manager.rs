//! ROBDD node arena and operations.

use std::collections::HashMap;

/// Largest supported variable count; satisfying-assignment counts fit `u64`.
pub const MAX_VARS: usize = 63;

/// Handle to a Boolean function owned by a [`BddManager`].
///
/// Handles are only meaningful for the manager that created them, and only
/// until that manager's next [`compact`](BddManager::compact) unless they
/// were passed to it as roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bdd(u32);

impl Bdd {
    /// The constant-false function.
    pub const FALSE: Bdd = Bdd(0);
    /// The constant-true function.
    pub const TRUE: Bdd = Bdd(1);

    /// Whether this handle is one of the two terminals.
    pub fn is_const(self) -> bool {
        self.0 < 2
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    var: u32,
    low: Bdd,
    high: Bdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    And,
    Or,
    Xor,
    Not,
}

/// Owner of every BDD node.
///
/// Nodes are appended to an arena and never freed individually. Children
/// always precede their parents in the arena. Memory is reclaimed by
/// [`compact`](Self::compact), which keeps only the nodes reachable from a
/// caller-supplied set of roots.
///
/// # Example
///
/// ```
/// use u_cgp::bdd::{Bdd, BddManager};
///
/// let mut m = BddManager::new(2, 1024);
/// let a = m.var(0);
/// let b = m.var(1);
/// let f = m.and(a, b);
/// let g = m.not(f);
/// let (na, nb) = (m.not(a), m.not(b));
/// let nand = m.or(na, nb);
/// assert_eq!(g, nand);
/// assert_eq!(m.sat_count(f), 1);
/// assert_eq!(m.sat_count(Bdd::TRUE), 4);
/// ```
#[derive(Debug, Clone)]
pub struct BddManager {
    num_vars: usize,
    nodes: Vec<Node>,
    unique: HashMap<(u32, Bdd, Bdd), Bdd>,
    cache: HashMap<(Op, Bdd, Bdd), Bdd>,
    capacity: usize,
    compactions: usize,
}

impl BddManager {
    /// Creates a manager over `num_vars` variables with a node ceiling of
    /// `capacity`.
    ///
    /// The ceiling is not a hard limit: an evaluation pass may push the
    /// arena past it, after which [`needs_compaction`](Self::needs_compaction)
    /// reports pressure until the caller compacts. It only grows inside
    /// [`compact`](Self::compact), when the surviving nodes alone fill more
    /// than half of it.
    ///
    /// # Panics
    /// Panics if `num_vars` exceeds [`MAX_VARS`].
    pub fn new(num_vars: usize, capacity: usize) -> Self {
        assert!(
            num_vars <= MAX_VARS,
            "at most {MAX_VARS} variables are supported, got {num_vars}"
        );
        let terminal = num_vars as u32;
        let mut nodes = Vec::with_capacity(capacity.max(2));
        nodes.push(Node {
            var: terminal,
            low: Bdd::FALSE,
            high: Bdd::FALSE,
        });
        nodes.push(Node {
            var: terminal,
            low: Bdd::TRUE,
            high: Bdd::TRUE,
        });
        Self {
            num_vars,
            nodes,
            unique: HashMap::new(),
            cache: HashMap::new(),
            capacity: capacity.max(2),
            compactions: 0,
        }
    }

    /// Number of declared variables.
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Nodes currently held in the arena, garbage included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node ceiling that usage is measured against.
    pub fn allocated_capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed [`compact`](Self::compact) passes.
    pub fn compactions(&self) -> usize {
        self.compactions
    }

    /// Whether node usage exceeds `fraction` of the allocated capacity.
    pub fn needs_compaction(&self, fraction: f64) -> bool {
        self.node_count() as f64 > fraction * self.allocated_capacity() as f64
    }

    /// Returns a constant function.
    pub fn constant(&self, value: bool) -> Bdd {
        if value {
            Bdd::TRUE
        } else {
            Bdd::FALSE
        }
    }

    /// Returns the projection function of variable `i`.
    ///
    /// # Panics
    /// Panics if `i >= num_vars`.
    pub fn var(&mut self, i: usize) -> Bdd {
        assert!(i < self.num_vars, "variable {i} out of range");
        self.mk(i as u32, Bdd::FALSE, Bdd::TRUE)
    }

    /// Conjunction.
    pub fn and(&mut self, f: Bdd, g: Bdd) -> Bdd {
        self.apply(Op::And, f, g)
    }

    /// Disjunction.
    pub fn or(&mut self, f: Bdd, g: Bdd) -> Bdd {
        self.apply(Op::Or, f, g)
    }

    /// Exclusive or.
    pub fn xor(&mut self, f: Bdd, g: Bdd) -> Bdd {
        self.apply(Op::Xor, f, g)
    }

    /// Negation.
    pub fn not(&mut self, f: Bdd) -> Bdd {
        if f == Bdd::FALSE {
            return Bdd::TRUE;
        }
        if f == Bdd::TRUE {
            return Bdd::FALSE;
        }
        if let Some(&r) = self.cache.get(&(Op::Not, f, f)) {
            return r;
        }
        let node = self.nodes[f.index()];
        let low = self.not(node.low);
        let high = self.not(node.high);
        let r = self.mk(node.var, low, high);
        self.cache.insert((Op::Not, f, f), r);
        r
    }

    /// Evaluates `f` under a full variable assignment.
    ///
    /// # Panics
    /// Panics if `assignment` is shorter than `num_vars`.
    pub fn eval(&self, f: Bdd, assignment: &[bool]) -> bool {
        assert!(
            assignment.len() >= self.num_vars,
            "assignment covers {} of {} variables",
            assignment.len(),
            self.num_vars
        );
        let mut cur = f;
        while !cur.is_const() {
            let node = self.nodes[cur.index()];
            cur = if assignment[node.var as usize] {
                node.high
            } else {
                node.low
            };
        }
        cur == Bdd::TRUE
    }

    /// Number of assignments over all `num_vars` variables that satisfy `f`.
    pub fn sat_count(&self, f: Bdd) -> u64 {
        let mut memo = HashMap::new();
        self.count_from(f, &mut memo) << self.level(f)
    }

    /// Keeps only the nodes reachable from `roots` and rewrites the roots
    /// in place to their new handles. Every other outstanding handle is
    /// invalidated. Returns the number of nodes released.
    pub fn compact(&mut self, roots: &mut [Bdd]) -> usize {
        let old_len = self.nodes.len();
        let mut live = vec![false; old_len];
        live[0] = true;
        live[1] = true;
        let mut stack: Vec<Bdd> = roots.to_vec();
        while let Some(f) = stack.pop() {
            if live[f.index()] {
                continue;
            }
            live[f.index()] = true;
            let node = self.nodes[f.index()];
            stack.push(node.low);
            stack.push(node.high);
        }

        let mut remap = vec![Bdd::FALSE; old_len];
        let mut nodes = Vec::with_capacity(self.capacity);
        self.unique.clear();
        for (old, node) in self.nodes.iter().enumerate() {
            if !live[old] {
                continue;
            }
            let id = Bdd(nodes.len() as u32);
            let moved = if old < 2 {
                *node
            } else {
                let low = remap[node.low.index()];
                let high = remap[node.high.index()];
                self.unique.insert((node.var, low, high), id);
                Node {
                    var: node.var,
                    low,
                    high,
                }
            };
            nodes.push(moved);
            remap[old] = id;
        }
        for root in roots.iter_mut() {
            *root = remap[root.index()];
        }

        self.nodes = nodes;
        self.cache.clear();
        self.compactions += 1;
        if self.nodes.len() * 2 > self.capacity {
            let before = self.capacity;
            while self.nodes.len() * 2 > self.capacity {
                self.capacity *= 2;
            }
            log::info!(
                "bdd ceiling raised from {before} to {} nodes ({} live after compaction)",
                self.capacity,
                self.nodes.len()
            );
        }
        let released = old_len - self.nodes.len();
        log::debug!(
            "bdd compaction #{}: released {} of {} nodes",
            self.compactions,
            released,
            old_len
        );
        released
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn level(&self, f: Bdd) -> u32 {
        self.nodes[f.index()].var
    }

    fn mk(&mut self, var: u32, low: Bdd, high: Bdd) -> Bdd {
        if low == high {
            return low;
        }
        if let Some(&id) = self.unique.get(&(var, low, high)) {
            return id;
        }
        let id = Bdd(self.nodes.len() as u32);
        self.nodes.push(Node { var, low, high });
        self.unique.insert((var, low, high), id);
        id
    }

    fn apply(&mut self, op: Op, f: Bdd, g: Bdd) -> Bdd {
        if let Some(r) = self.terminal_case(op, f, g) {
            return r;
        }
        // All binary ops here are commutative.
        let key = if f <= g { (op, f, g) } else { (op, g, f) };
        if let Some(&r) = self.cache.get(&key) {
            return r;
        }

        let nf = self.nodes[f.index()];
        let ng = self.nodes[g.index()];
        let var = nf.var.min(ng.var);
        let (f0, f1) = if nf.var == var { (nf.low, nf.high) } else { (f, f) };
        let (g0, g1) = if ng.var == var { (ng.low, ng.high) } else { (g, g) };

        let low = self.apply(op, f0, g0);
        let high = self.apply(op, f1, g1);
        let r = self.mk(var, low, high);
        self.cache.insert(key, r);
        r
    }

    fn terminal_case(&mut self, op: Op, f: Bdd, g: Bdd) -> Option<Bdd> {
        match op {
            Op::And => {
                if f == Bdd::FALSE || g == Bdd::FALSE {
                    Some(Bdd::FALSE)
                } else if f == Bdd::TRUE || f == g {
                    Some(g)
                } else if g == Bdd::TRUE {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Or => {
                if f == Bdd::TRUE || g == Bdd::TRUE {
                    Some(Bdd::TRUE)
                } else if f == Bdd::FALSE || f == g {
                    Some(g)
                } else if g == Bdd::FALSE {
                    Some(f)
                } else {
                    None
                }
            }
            Op::Xor => {
                if f == g {
                    Some(Bdd::FALSE)
                } else if f == Bdd::FALSE {
                    Some(g)
                } else if g == Bdd::FALSE {
                    Some(f)
                } else if f == Bdd::TRUE {
                    Some(self.not(g))
                } else if g == Bdd::TRUE {
                    Some(self.not(f))
                } else {
                    None
                }
            }
            Op::Not => Some(self.not(f)),
        }
    }

    /// Satisfying assignments over the variables at or below `f`'s level.
    fn count_from(&self, f: Bdd, memo: &mut HashMap<Bdd, u64>) -> u64 {
        if f == Bdd::FALSE {
            return 0;
        }
        if f == Bdd::TRUE {
            return 1;
        }
        if let Some(&c) = memo.get(&f) {
            return c;
        }
        let node = self.nodes[f.index()];
        let low = self.count_from(node.low, memo) << (self.level(node.low) - node.var - 1);
        let high = self.count_from(node.high, memo) << (self.level(node.high) - node.var - 1);
        let c = low + high;
        memo.insert(f, c);
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_assignments(n: usize) -> impl Iterator<Item = Vec<bool>> {
        (0..1u32 << n).map(move |bits| (0..n).map(|i| bits >> i & 1 == 1).collect())
    }

    #[test]
    fn test_var_projection() {
        let mut m = BddManager::new(3, 64);
        let x1 = m.var(1);
        for a in all_assignments(3) {
            assert_eq!(m.eval(x1, &a), a[1]);
        }
        assert_eq!(m.sat_count(x1), 4);
    }

    #[test]
    fn test_canonical_equivalence() {
        let mut m = BddManager::new(3, 256);
        let (a, b, c) = (m.var(0), m.var(1), m.var(2));
        // a & (b | c) == (a & b) | (a & c)
        let bc = m.or(b, c);
        let lhs = m.and(a, bc);
        let ab = m.and(a, b);
        let ac = m.and(a, c);
        let rhs = m.or(ab, ac);
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_de_morgan() {
        let mut m = BddManager::new(2, 64);
        let (a, b) = (m.var(0), m.var(1));
        let ab = m.or(a, b);
        let nor = m.not(ab);
        let na = m.not(a);
        let nb = m.not(b);
        let both = m.and(na, nb);
        assert_eq!(nor, both);
    }

    #[test]
    fn test_xor_truth_table() {
        let mut m = BddManager::new(2, 64);
        let (a, b) = (m.var(0), m.var(1));
        let x = m.xor(a, b);
        for v in all_assignments(2) {
            assert_eq!(m.eval(x, &v), v[0] ^ v[1]);
        }
        assert_eq!(m.sat_count(x), 2);
    }

    #[test]
    fn test_xor_with_constants() {
        let mut m = BddManager::new(2, 64);
        let a = m.var(0);
        let na = m.not(a);
        assert_eq!(m.xor(a, Bdd::TRUE), na);
        assert_eq!(m.xor(Bdd::FALSE, a), a);
        assert_eq!(m.xor(a, a), Bdd::FALSE);
    }

    #[test]
    fn test_sat_count_skipped_levels() {
        // f = x0 & x3 over 5 variables: 2^3 satisfying assignments.
        let mut m = BddManager::new(5, 64);
        let (x0, x3) = (m.var(0), m.var(3));
        let f = m.and(x0, x3);
        assert_eq!(m.sat_count(f), 8);
        assert_eq!(m.sat_count(Bdd::TRUE), 32);
        assert_eq!(m.sat_count(Bdd::FALSE), 0);
    }

    #[test]
    fn test_sat_count_matches_enumeration() {
        let mut m = BddManager::new(4, 256);
        let v: Vec<Bdd> = (0..4).map(|i| m.var(i)).collect();
        let t0 = m.and(v[0], v[1]);
        let t1 = m.xor(v[2], v[3]);
        let f = m.or(t0, t1);
        let expected = all_assignments(4).filter(|a| m.eval(f, a)).count() as u64;
        assert_eq!(m.sat_count(f), expected);
    }

    #[test]
    fn test_compact_preserves_roots() {
        let mut m = BddManager::new(4, 16);
        let v: Vec<Bdd> = (0..4).map(|i| m.var(i)).collect();
        let keep = m.xor(v[0], v[3]);
        // Garbage
        for i in 0..4 {
            for j in 0..4 {
                let t = m.and(v[i], v[j]);
                let _ = m.or(t, v[(i + 1) % 4]);
            }
        }
        let before: Vec<bool> = all_assignments(4).map(|a| m.eval(keep, &a)).collect();
        let used = m.node_count();

        let mut roots = [keep];
        let released = m.compact(&mut roots);

        assert!(released > 0);
        assert_eq!(m.node_count(), used - released);
        let after: Vec<bool> = all_assignments(4).map(|a| m.eval(roots[0], &a)).collect();
        assert_eq!(before, after);
        assert_eq!(m.compactions(), 1);
    }

    #[test]
    fn test_compact_keeps_canonicity() {
        let mut m = BddManager::new(3, 64);
        let (a, b) = (m.var(0), m.var(1));
        let f = m.and(a, b);
        let mut roots = [f];
        m.compact(&mut roots);
        let (a, b) = (m.var(0), m.var(1));
        let g = m.and(a, b);
        assert_eq!(g, roots[0]);
    }

    #[test]
    fn test_needs_compaction_threshold() {
        let mut m = BddManager::new(6, 8);
        assert!(!m.needs_compaction(0.8));
        let v: Vec<Bdd> = (0..6).map(|i| m.var(i)).collect();
        let mut acc = v[0];
        for &x in &v[1..] {
            acc = m.xor(acc, x);
        }
        assert!(m.node_count() > 8);
        // The ceiling stays put while the arena grows past it.
        assert_eq!(m.allocated_capacity(), 8);
        assert!(m.needs_compaction(0.8));
        assert!(m.needs_compaction(1.0));
        let _ = acc;
    }

    #[test]
    fn test_ceiling_crossed_in_one_pass() {
        let mut m = BddManager::new(12, 64);
        let v: Vec<Bdd> = (0..12).map(|i| m.var(i)).collect();
        // XOR of the 66 pairwise products.
        let mut f = Bdd::FALSE;
        for i in 0..12 {
            for j in i + 1..12 {
                let t = m.and(v[i], v[j]);
                f = m.xor(f, t);
            }
        }
        assert!(m.node_count() > 64);
        assert_eq!(m.allocated_capacity(), 64);
        assert!(m.needs_compaction(0.8));

        let sample: Vec<Vec<bool>> = (0..64u32)
            .map(|k| (0..12).map(|i| (k * 37 + i) % 3 == 0).collect())
            .collect();
        let before: Vec<bool> = sample.iter().map(|a| m.eval(f, a)).collect();

        let mut roots = [f];
        m.compact(&mut roots);
        assert!(!m.needs_compaction(0.8), "ceiling must cover the live set");
        assert!(m.allocated_capacity() >= 2 * m.node_count());
        assert!(m.allocated_capacity() >= 64);
        let after: Vec<bool> = sample.iter().map(|a| m.eval(roots[0], a)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_compact_keeps_ceiling_when_live_set_is_small() {
        let mut m = BddManager::new(4, 16);
        let v: Vec<Bdd> = (0..4).map(|i| m.var(i)).collect();
        for i in 0..4 {
            for j in 0..4 {
                let t = m.xor(v[i], v[j]);
                let _ = m.or(t, v[(i + 2) % 4]);
            }
        }
        let mut roots = [v[0]];
        m.compact(&mut roots);
        assert_eq!(m.allocated_capacity(), 16);
        assert!(!m.needs_compaction(0.8));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_var_out_of_range() {
        let mut m = BddManager::new(2, 8);
        m.var(2);
    }
}
