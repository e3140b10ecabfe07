//! Model strength graph in dot format.
//!
//! An edge `"A" -> "B"` means no tested program lets A permit an outcome B
//! forbids, so A is at least as strong as B within the tested space. This
//! is an empirical result, not a proof. Pairs with a counterexample get no
//! edge; the witness program is printed as `#` comment lines instead.

use std::io::{self, Write};

use crate::table::CounterexampleTable;

/// Render `table` as a dot digraph. `programs_evaluated` is reported in the
/// header so readers know how much of the space the edges rest on.
pub fn write_model_graph<W: Write + ?Sized>(
    w: &mut W,
    table: &CounterexampleTable,
    programs_evaluated: u64,
) -> io::Result<()> {
    // TODO: collapse mutually-stronger models into one node and run a
    // transitive reduction to declutter larger model sets.
    writeln!(w, "digraph memmodel {{")?;
    writeln!(w, "label=\"A -> B means A is stronger than or equal to B\";")?;
    writeln!(
        w,
        "# Edges are empirical: no counterexample among {} tested programs.",
        programs_evaluated
    )?;

    // Every node, even models comparable to nothing.
    for model in table.models() {
        writeln!(w, "{:?};", model.name())?;
    }

    for (weaker, stronger, witness) in table.pairs() {
        match witness {
            None => writeln!(w, "{:?} -> {:?};", weaker.name(), stronger.name())?,
            Some(witness) => {
                writeln!(w, "# {:?} is weaker than {:?};", weaker.name(), stronger.name())?;
                for line in witness.program.to_string().lines() {
                    writeln!(w, "# {}", line)?;
                }
                writeln!(
                    w,
                    "# {} permits {}, {} forbids it",
                    weaker, witness.outcome, stronger
                )?;
            }
        }
    }

    writeln!(w, "}}")
}
