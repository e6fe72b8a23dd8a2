//! Human-readable and VCD renderings of witnesses.

use indexmap::IndexMap;
use serde::Serialize;
use tern_dsl::NameMap;
use tern_ir::{Hts, Sort};
use tern_smt::{Value, Witness};

use crate::config::VerificationConfig;

/// A rendered witness: the text form and, when requested, a waveform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub text: String,
    pub vcd: Option<String>,
}

/// Render `witness` of a check on `hts` with the names and options in `config`.
pub fn render_trace(title: &str, witness: &Witness, hts: &Hts, config: &VerificationConfig) -> Trace {
    let sorts: IndexMap<String, Sort> = hts.vars().map(|v| (v.name.clone(), v.sort)).collect();
    Trace {
        text: render_text(title, witness, &config.names, config.full_trace, &config.prefix),
        vcd: config
            .vcd
            .then(|| render_vcd(witness, &sorts, &config.names, &config.prefix)),
    }
}

/// Step-by-step listing. The first state lists every variable; later ones
/// list only changed values unless `full` is set.
pub fn render_text(title: &str, witness: &Witness, names: &NameMap, full: bool, label: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{title} for '{label}' ({} step{}):\n",
        witness.len(),
        if witness.len() == 1 { "" } else { "s" }
    ));
    let mut previous: Option<&IndexMap<String, Value>> = None;
    for (i, step) in witness.steps.iter().enumerate() {
        if i == 0 {
            out.push_str("---> INIT <---\n");
        } else {
            out.push_str(&format!("\n---> STATE {i} <---\n"));
        }
        let tag = if i == 0 { "I".to_string() } else { format!("S{i}") };
        let mut printed = 0usize;
        for (name, value) in step {
            let changed = previous.map_or(true, |prev| prev.get(name) != Some(value));
            if full || changed {
                out.push_str(&format!("  {tag}: {} = {value}\n", names.source_name(name)));
                printed += 1;
            }
        }
        if printed == 0 {
            out.push_str("  (no changes)\n");
        }
        previous = Some(step);
    }
    if let Some(l) = witness.loop_back {
        out.push_str(&format!("\n---> LOOP BACK TO STATE {l} <---\n"));
    }
    out
}

/// Value change dump with one variable per declared signal of the witness.
pub fn render_vcd(
    witness: &Witness,
    sorts: &IndexMap<String, Sort>,
    names: &NameMap,
    scope: &str,
) -> String {
    let signals: Vec<(&str, Sort, String)> = witness
        .variables()
        .into_iter()
        .filter_map(|name| sorts.get(name).map(|sort| (name, *sort)))
        .enumerate()
        .map(|(i, (name, sort))| (name, sort, vcd_id(i)))
        .collect();

    let mut out = String::new();
    out.push_str("$version tern $end\n");
    out.push_str("$timescale 1 ns $end\n");
    out.push_str(&format!("$scope module {} $end\n", vcd_name(scope)));
    for (name, sort, id) in &signals {
        let (kind, width) = match sort {
            Sort::Bool => ("wire", 1),
            Sort::BitVec(w) => ("wire", *w),
            Sort::Int => ("integer", 64),
        };
        out.push_str(&format!(
            "$var {kind} {width} {id} {} $end\n",
            vcd_name(names.source_name(name))
        ));
    }
    out.push_str("$upscope $end\n");
    out.push_str("$enddefinitions $end\n");

    let mut previous: Option<&IndexMap<String, Value>> = None;
    for (time, step) in witness.steps.iter().enumerate() {
        out.push_str(&format!("#{time}\n"));
        if time == 0 {
            out.push_str("$dumpvars\n");
        }
        for (name, sort, id) in &signals {
            let Some(value) = step.get(*name) else {
                continue;
            };
            if previous.is_some_and(|prev| prev.get(*name) == Some(value)) {
                continue;
            }
            out.push_str(&vcd_value(*sort, *value, id));
            out.push('\n');
        }
        if time == 0 {
            out.push_str("$end\n");
        }
        previous = Some(step);
    }
    out.push_str(&format!("#{}\n", witness.len()));
    out
}

/// Printable identifier code for the `i`-th signal.
fn vcd_id(mut i: usize) -> String {
    const FIRST: u8 = b'!';
    const RADIX: usize = (b'~' - b'!' + 1) as usize;
    let mut id = String::new();
    loop {
        id.push((FIRST + (i % RADIX) as u8) as char);
        i /= RADIX;
        if i == 0 {
            break;
        }
        i -= 1;
    }
    id
}

fn vcd_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

fn vcd_value(sort: Sort, value: Value, id: &str) -> String {
    match sort {
        Sort::Bool => format!("{}{id}", value.as_i64() & 1),
        Sort::BitVec(_) => format!("b{:b} {id}", value.as_i64()),
        Sort::Int => format!("b{:b} {id}", value.as_i64() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn witness() -> Witness {
        let step = |x: i64, b: bool| {
            let mut s = IndexMap::new();
            s.insert("top$x".to_string(), Value::Int(x));
            s.insert("top$b".to_string(), Value::Bool(b));
            s
        };
        Witness {
            steps: vec![step(0, false), step(1, false), step(1, true)],
            loop_back: None,
        }
    }

    fn names() -> NameMap {
        let mut names = NameMap::new();
        names.record("top.x");
        names.record("top.b");
        names
    }

    #[test]
    fn text_lists_changes_with_source_names() {
        let text = render_text("Counterexample", &witness(), &names(), false, "p1");
        assert!(text.starts_with("Counterexample for 'p1' (3 steps):\n"));
        assert!(text.contains("  I: top.x = 0\n  I: top.b = false\n"));
        assert!(text.contains("---> STATE 1 <---\n  S1: top.x = 1\n"));
        assert!(!text.contains("S1: top.b"));
        assert!(text.contains("---> STATE 2 <---\n  S2: top.b = true\n"));
    }

    #[test]
    fn full_trace_repeats_unchanged_values() {
        let text = render_text("Execution", &witness(), &names(), true, "p1");
        assert!(text.contains("S1: top.b = false"));
        assert!(text.contains("S2: top.x = 1"));
    }

    #[test]
    fn lassos_name_their_loop_state() {
        let mut w = witness();
        w.loop_back = Some(1);
        let text = render_text("Counterexample", &w, &names(), false, "live");
        assert!(text.ends_with("---> LOOP BACK TO STATE 1 <---\n"));
    }

    #[test]
    fn vcd_declares_signals_and_dumps_changes() {
        let mut sorts = IndexMap::new();
        sorts.insert("top$x".to_string(), Sort::BitVec(4));
        sorts.insert("top$b".to_string(), Sort::Bool);
        let vcd = render_vcd(&witness(), &sorts, &names(), "p1");
        assert!(vcd.contains("$scope module p1 $end\n"));
        assert!(vcd.contains("$var wire 4 ! top.x $end\n"));
        assert!(vcd.contains("$var wire 1 \" top.b $end\n"));
        assert!(vcd.contains("#0\n$dumpvars\nb0 !\n0\"\n$end\n"));
        assert!(vcd.contains("#1\nb1 !\n#2\n1\"\n#3\n"));
    }

    #[test]
    fn negative_integers_fill_the_declared_width() {
        let mut step = IndexMap::new();
        step.insert("top$n".to_string(), Value::Int(-2));
        let w = Witness {
            steps: vec![step],
            loop_back: None,
        };
        let mut sorts = IndexMap::new();
        sorts.insert("top$n".to_string(), Sort::Int);
        let mut names = NameMap::new();
        names.record("top.n");
        let vcd = render_vcd(&w, &sorts, &names, "p1");
        assert!(vcd.contains("$var integer 64 ! top.n $end\n"));
        let value = format!("b{}0 !\n", "1".repeat(63));
        assert!(vcd.contains(&value));
    }

    #[test]
    fn identifier_codes_are_unique() {
        let ids: std::collections::HashSet<String> = (0..10_000).map(vcd_id).collect();
        assert_eq!(ids.len(), 10_000);
        assert_eq!(vcd_id(0), "!");
        assert_eq!(vcd_id(93), "~");
        assert_eq!(vcd_id(94), "!!");
    }
}
