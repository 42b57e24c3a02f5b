//! Graphviz rendering of a problem and its schedule, for debugging.

use std::fmt::Write;

use crate::problem::Problem;

/// Render the dependence graph in DOT format.
///
/// Nodes show the operator type, latency and start time (if scheduled).
/// Loop-carried edges are dashed and labelled with their distance.
pub fn to_dot(problem: &Problem) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_dot(problem, &mut out);
    out
}

fn write_dot(problem: &Problem, out: &mut String) -> std::fmt::Result {
    writeln!(out, "digraph schedule {{")?;
    writeln!(out, "  node [shape=box];")?;
    if let Some(ii) = problem.initiation_interval() {
        writeln!(out, "  label=\"II = {}\";", ii)?;
    }

    for op in problem.operation_ids() {
        let operator_type = problem.operations()[op.index()].operator_type;
        write!(
            out,
            "  n{} [label=\"{}\\n{} (lat {})",
            op.0,
            escape(&problem.operation_name(op)),
            escape(&problem.operator_type_name(operator_type)),
            problem.latency(op)
        )?;
        if let Some(start) = problem.start_time(op) {
            write!(out, "\\nt = {}", start)?;
        }
        writeln!(out, "\"];")?;
    }

    for dep in problem.dependences() {
        if dep.is_loop_carried() {
            writeln!(
                out,
                "  n{} -> n{} [style=dashed, label=\"{}\"];",
                dep.source.0,
                dep.destination.0,
                dep.distance_or_zero()
            )?;
        } else {
            writeln!(out, "  n{} -> n{};", dep.source.0, dep.destination.0)?;
        }
    }

    writeln!(out, "}}")
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asap::schedule_asap;

    #[test]
    fn test_dot_output() {
        let mut problem = Problem::new();
        let add = problem.add_operator_type("add", 1, None);
        let a = problem.add_operation("a", add);
        let b = problem.add_operation("b\"quoted\"", add);
        problem.add_dependence(a, b, None);

        let unscheduled = to_dot(&problem);
        assert!(unscheduled.starts_with("digraph schedule {"));
        assert!(unscheduled.contains("n0 -> n1;"));
        assert!(unscheduled.contains("b\\\"quoted\\\""));
        assert!(!unscheduled.contains("t = "));

        schedule_asap(&mut problem).unwrap();
        let scheduled = to_dot(&problem);
        assert!(scheduled.contains("\\nt = 1\"];"));
    }

    #[test]
    fn test_loop_carried_edge_is_dashed() {
        let mut problem = Problem::new();
        let add = problem.add_operator_type("add", 1, None);
        let a = problem.add_operation("a", add);
        problem.add_dependence(a, a, Some(2));

        assert!(to_dot(&problem).contains("n0 -> n0 [style=dashed, label=\"2\"];"));
    }
}
