//! Problem model: operations, operator types and dependences.
//!
//! A single `Problem` covers every scheduling variant. The cyclic variant is
//! signalled by dependence distances, the shared-pipelined-operators variant by
//! operator type limits; algorithms check for these extensions instead of
//! relying on separate problem types.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

use crate::error::SchedulingError;
use crate::interner::{NameInterner, Symbol};

/// Handle of an operation within its problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u32);

/// Handle of an operator type within its problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorTypeId(pub u32);

/// Handle of a dependence within its problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependenceId(pub u32);

impl OperationId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl OperatorTypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

impl fmt::Display for OperatorTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opr#{}", self.0)
    }
}

impl fmt::Display for DependenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

/// A kind of hardware operator an operation runs on.
#[derive(Clone, Debug)]
pub struct OperatorType {
    name: Symbol,
    /// Cycles between an operation's start and the availability of its result.
    pub latency: u32,
    /// Maximum number of concurrently occupied instances (None = unlimited).
    pub limit: Option<u32>,
}

/// An operation to be scheduled.
#[derive(Clone, Debug)]
pub struct Operation {
    name: Symbol,
    pub operator_type: OperatorTypeId,
    start_time: Option<u32>,
}

impl Operation {
    /// Start cycle assigned by the last successful solve.
    #[inline]
    pub fn start_time(&self) -> Option<u32> {
        self.start_time
    }
}

/// A directed precedence edge between two operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dependence {
    pub source: OperationId,
    pub destination: OperationId,
    /// Number of loop iterations the edge crosses (None = same iteration).
    pub distance: Option<u32>,
}

impl Dependence {
    /// Distance with the unset case folded to zero.
    #[inline]
    pub fn distance_or_zero(&self) -> u32 {
        self.distance.unwrap_or(0)
    }

    #[inline]
    pub fn is_loop_carried(&self) -> bool {
        self.distance_or_zero() > 0
    }
}

/// The problem variant an algorithm is about to solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProblemKind {
    /// Acyclic, resource-unconstrained.
    Basic,
    /// Loop-carried dependences allowed; an initiation interval is computed.
    Cyclic,
    /// Acyclic with operator type limits.
    SharedPipelinedOperators,
}

/// Aggregate of operator types, operations and dependences plus solve results.
#[derive(Clone, Debug, Default)]
pub struct Problem {
    names: NameInterner,
    operator_types: Vec<OperatorType>,
    operations: Vec<Operation>,
    dependences: Vec<Dependence>,
    /// First registration of each name; later duplicates are reported by `validate`.
    operator_type_lookup: FxHashMap<Symbol, OperatorTypeId>,
    operation_lookup: FxHashMap<Symbol, OperationId>,
    initiation_interval: Option<u32>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator type with its latency and optional instance limit.
    pub fn add_operator_type(
        &mut self,
        name: &str,
        latency: u32,
        limit: Option<u32>,
    ) -> OperatorTypeId {
        let id = OperatorTypeId(next_handle(self.operator_types.len()));
        let symbol = self.names.intern(name);
        self.operator_type_lookup.entry(symbol).or_insert(id);
        self.operator_types.push(OperatorType {
            name: symbol,
            latency,
            limit,
        });
        id
    }

    /// Register an operation running on `operator_type`.
    pub fn add_operation(&mut self, name: &str, operator_type: OperatorTypeId) -> OperationId {
        let id = OperationId(next_handle(self.operations.len()));
        let symbol = self.names.intern(name);
        self.operation_lookup.entry(symbol).or_insert(id);
        self.operations.push(Operation {
            name: symbol,
            operator_type,
            start_time: None,
        });
        id
    }

    /// Register a dependence from `source` to `destination`.
    ///
    /// Endpoints are not checked here; `validate` reports dangling handles.
    pub fn add_dependence(
        &mut self,
        source: OperationId,
        destination: OperationId,
        distance: Option<u32>,
    ) -> DependenceId {
        let id = DependenceId(next_handle(self.dependences.len()));
        self.dependences.push(Dependence {
            source,
            destination,
            distance,
        });
        id
    }

    pub fn operator_types(&self) -> &[OperatorType] {
        &self.operator_types
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn dependences(&self) -> &[Dependence] {
        &self.dependences
    }

    pub fn operation(&self, op: OperationId) -> Option<&Operation> {
        self.operations.get(op.index())
    }

    pub fn operator_type(&self, opr: OperatorTypeId) -> Option<&OperatorType> {
        self.operator_types.get(opr.index())
    }

    /// Iterate over all operation handles in insertion order.
    pub fn operation_ids(&self) -> impl Iterator<Item = OperationId> + '_ {
        (0..self.operations.len() as u32).map(OperationId)
    }

    pub fn operation_by_name(&self, name: &str) -> Option<OperationId> {
        let symbol = self.names.get(name)?;
        self.operation_lookup.get(&symbol).copied()
    }

    pub fn operator_type_by_name(&self, name: &str) -> Option<OperatorTypeId> {
        let symbol = self.names.get(name)?;
        self.operator_type_lookup.get(&symbol).copied()
    }

    /// Name of an operation, or its handle if it is not registered.
    pub fn operation_name(&self, op: OperationId) -> String {
        self.operation(op)
            .and_then(|o| self.names.resolve(o.name))
            .map(str::to_string)
            .unwrap_or_else(|| op.to_string())
    }

    /// Name of an operator type, or its handle if it is not registered.
    pub fn operator_type_name(&self, opr: OperatorTypeId) -> String {
        self.operator_type(opr)
            .and_then(|t| self.names.resolve(t.name))
            .map(str::to_string)
            .unwrap_or_else(|| opr.to_string())
    }

    /// Latency of the operator type `op` runs on.
    ///
    /// Only meaningful on a validated problem; dangling references yield 0.
    #[inline]
    pub fn latency(&self, op: OperationId) -> u32 {
        self.operation(op)
            .and_then(|o| self.operator_type(o.operator_type))
            .map_or(0, |t| t.latency)
    }

    pub fn start_time(&self, op: OperationId) -> Option<u32> {
        self.operation(op).and_then(Operation::start_time)
    }

    /// Cycle at which the result of `op` becomes available.
    ///
    /// None if `op` is unscheduled or its end does not fit in a `u32` cycle.
    pub fn end_time(&self, op: OperationId) -> Option<u32> {
        self.start_time(op)
            .and_then(|start| start.checked_add(self.latency(op)))
    }

    /// Latest end time over all operations, if every operation is scheduled.
    pub fn schedule_length(&self) -> Option<u32> {
        self.operation_ids()
            .map(|op| self.end_time(op))
            .try_fold(0u32, |acc, end| end.map(|e| acc.max(e)))
    }

    pub fn initiation_interval(&self) -> Option<u32> {
        self.initiation_interval
    }

    /// Whether any dependence crosses loop iterations.
    pub fn has_loop_carried_dependences(&self) -> bool {
        self.dependences.iter().any(Dependence::is_loop_carried)
    }

    /// Whether any operator type has a finite instance limit.
    pub fn has_limited_operator_types(&self) -> bool {
        self.operator_types.iter().any(|t| t.limit.is_some())
    }

    /// Forget all start times and the initiation interval.
    pub fn clear_results(&mut self) {
        for op in &mut self.operations {
            op.start_time = None;
        }
        self.initiation_interval = None;
    }

    /// Install a complete set of results.
    ///
    /// `start_times` is indexed by operation and must cover every operation.
    pub(crate) fn commit(&mut self, start_times: &[u32], initiation_interval: Option<u32>) {
        debug_assert_eq!(start_times.len(), self.operations.len());
        for (op, &start) in self.operations.iter_mut().zip(start_times) {
            op.start_time = Some(start);
        }
        self.initiation_interval = initiation_interval;
    }

    /// Check the structural invariants that every algorithm relies on.
    ///
    /// Fails with `MalformedProblem` naming the first offending entity.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        for (what, len) in [
            ("operator types", self.operator_types.len()),
            ("operations", self.operations.len()),
            ("dependences", self.dependences.len()),
        ] {
            if let Some(violation) = capacity_violation(what, len) {
                return Err(SchedulingError::MalformedProblem(violation));
            }
        }

        let mut seen: FxHashSet<Symbol> = FxHashSet::default();
        for (idx, opr) in self.operator_types.iter().enumerate() {
            if !seen.insert(opr.name) {
                return Err(SchedulingError::MalformedProblem(format!(
                    "operator type '{}' ({}) is registered more than once",
                    self.operator_type_name(OperatorTypeId(idx as u32)),
                    OperatorTypeId(idx as u32)
                )));
            }
        }

        let mut seen: FxHashSet<Symbol> = FxHashSet::default();
        for (idx, op) in self.operations.iter().enumerate() {
            let id = OperationId(idx as u32);
            if !seen.insert(op.name) {
                return Err(SchedulingError::MalformedProblem(format!(
                    "operation '{}' ({}) is registered more than once",
                    self.operation_name(id),
                    id
                )));
            }
            if self.operator_type(op.operator_type).is_none() {
                return Err(SchedulingError::MalformedProblem(format!(
                    "operation '{}' references unregistered operator type {}",
                    self.operation_name(id),
                    op.operator_type
                )));
            }
        }

        for (idx, dep) in self.dependences.iter().enumerate() {
            for endpoint in [dep.source, dep.destination] {
                if self.operation(endpoint).is_none() {
                    return Err(SchedulingError::MalformedProblem(format!(
                        "dependence {} references unregistered operation {}",
                        DependenceId(idx as u32),
                        endpoint
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate, then check the extensions required or forbidden by `kind`.
    pub fn validate_for(&self, kind: ProblemKind) -> Result<(), SchedulingError> {
        self.validate()?;

        if kind != ProblemKind::Cyclic {
            if let Some((idx, dep)) = self
                .dependences
                .iter()
                .enumerate()
                .find(|(_, d)| d.is_loop_carried())
            {
                return Err(SchedulingError::MalformedProblem(format!(
                    "dependence {} ({} -> {}) has distance {} but the {:?} variant is acyclic",
                    DependenceId(idx as u32),
                    self.operation_name(dep.source),
                    self.operation_name(dep.destination),
                    dep.distance_or_zero(),
                    kind
                )));
            }
        }

        if kind == ProblemKind::SharedPipelinedOperators {
            if let Some(idx) = self
                .operator_types
                .iter()
                .position(|t| t.limit == Some(0))
            {
                return Err(SchedulingError::MalformedProblem(format!(
                    "operator type '{}' has a limit of 0",
                    self.operator_type_name(OperatorTypeId(idx as u32))
                )));
            }
        }

        Ok(())
    }

    /// Check that the stored results satisfy every constraint of the problem.
    ///
    /// Precedence is always checked; loop-carried dependences are checked
    /// against the initiation interval, and operator type limits against
    /// overlapping occupancy windows.
    pub fn verify(&self) -> Result<(), SchedulingError> {
        self.validate()?;

        let mut starts = Vec::with_capacity(self.operations.len());
        for op in self.operation_ids() {
            match self.start_time(op) {
                Some(start) => starts.push(start),
                None => {
                    return Err(SchedulingError::MalformedProblem(format!(
                        "operation '{}' has no start time",
                        self.operation_name(op)
                    )))
                }
            }
        }

        if self.has_loop_carried_dependences() && self.initiation_interval.is_none() {
            return Err(SchedulingError::MalformedProblem(
                "loop-carried dependences present but no initiation interval is set".to_string(),
            ));
        }

        if let Some(violation) =
            precedence_violation(self, &starts, self.initiation_interval.unwrap_or(0))
        {
            return Err(SchedulingError::MalformedProblem(violation));
        }

        if let Some(violation) = utilization_violation(self, &starts) {
            return Err(SchedulingError::MalformedProblem(violation));
        }

        Ok(())
    }
}

/// Handle for the entry appended to a table of `len` entries.
///
/// Saturates at `u32::MAX`; `validate` rejects tables that grow past it.
fn next_handle(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Describe a table too large to address with `u32` handles.
fn capacity_violation(what: &str, len: usize) -> Option<String> {
    (len > u32::MAX as usize).then(|| {
        format!(
            "{} {} registered, at most {} are supported",
            len,
            what,
            u32::MAX
        )
    })
}

/// Error for an operation whose start or end cycle does not fit in `u32`.
pub(crate) fn cycle_overflow(problem: &Problem, op: OperationId) -> SchedulingError {
    SchedulingError::MalformedProblem(format!(
        "'{}' would start or finish after cycle {}",
        problem.operation_name(op),
        u32::MAX
    ))
}

/// End cycle of `op` when started at `start`, failing if it leaves the `u32` range.
pub(crate) fn checked_end(
    problem: &Problem,
    op: OperationId,
    start: u32,
) -> Result<u32, SchedulingError> {
    start
        .checked_add(problem.latency(op))
        .ok_or_else(|| cycle_overflow(problem, op))
}

/// Describe the first dependence whose constraint `starts` violates.
///
/// Each dependence requires
/// `start(dst) + ii * distance >= start(src) + latency(src)`.
pub(crate) fn precedence_violation(
    problem: &Problem,
    starts: &[u32],
    initiation_interval: u32,
) -> Option<String> {
    problem.dependences().iter().find_map(|dep| {
        let src = dep.source.index();
        let dst = dep.destination.index();
        let ready = starts[src] as u64 + problem.latency(dep.source) as u64;
        let available =
            starts[dst] as u64 + initiation_interval as u64 * dep.distance_or_zero() as u64;
        (available < ready).then(|| {
            format!(
                "'{}' starts at {} but '{}' (start {}, latency {}, distance {}) is not ready until {}",
                problem.operation_name(dep.destination),
                starts[dst],
                problem.operation_name(dep.source),
                starts[src],
                problem.latency(dep.source),
                dep.distance_or_zero(),
                ready
            )
        })
    })
}

/// Describe the first cycle at which a limited operator type is oversubscribed.
pub(crate) fn utilization_violation(problem: &Problem, starts: &[u32]) -> Option<String> {
    for (idx, opr) in problem.operator_types().iter().enumerate() {
        let Some(limit) = opr.limit else {
            continue;
        };
        if opr.latency == 0 {
            continue;
        }
        let opr_id = OperatorTypeId(idx as u32);

        // Sweep over window boundaries: +1 at start, -1 at end
        let mut events: Vec<(u64, i32)> = Vec::new();
        for op in problem.operation_ids() {
            if problem.operations()[op.index()].operator_type == opr_id {
                let start = starts[op.index()] as u64;
                events.push((start, 1));
                events.push((start + opr.latency as u64, -1));
            }
        }
        // Ends sort before starts at the same cycle: windows are half-open
        events.sort_unstable();

        let mut in_use: i32 = 0;
        for (cycle, delta) in events {
            in_use += delta;
            if in_use > limit as i32 {
                return Some(format!(
                    "operator type '{}' has {} operations in flight at cycle {} (limit {})",
                    problem.operator_type_name(opr_id),
                    in_use,
                    cycle,
                    limit
                ));
            }
        }
    }
    None
}
