#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// 3-bit counter with the output mirroring the state; wraps at 7.
pub const COUNTER: &str = "\
VAR
  x: BV(3);
OUTPUT
  out: BV(3);
INIT
  x = 0;
INVAR
  out = x;
TRANS
  next(x) = ite(x = 7, 0, x + 1);
";

/// Same behavior as [`COUNTER`], written differently.
pub const COUNTER_ALT: &str = "\
VAR
  x: BV(3);
OUTPUT
  out: BV(3);
INIT
  x = 0;
INVAR
  out = x;
TRANS
  next(x) = ite(x < 7, x + 1, 0);
";

/// Agrees with [`COUNTER`] on states 0 and 1, then jumps to 5.
pub const COUNTER_SKIP: &str = "\
VAR
  x: BV(3);
OUTPUT
  out: BV(3);
INIT
  x = 0;
INVAR
  out = x;
TRANS
  next(x) = ite(x = 1, 5, ite(x = 7, 0, x + 1));
";

/// Any successor at least as large as the current state.
pub const CHOOSER: &str = "\
VAR
  x: BV(2);
INIT
  x = 0;
TRANS
  next(x) >= x;
";

pub fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents)
        .unwrap_or_else(|e| panic!("failed to write {name}: {e}"));
}

/// A directory holding the three counters and the chooser.
pub fn model_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "counter.sts", COUNTER);
    write(dir.path(), "counter_alt.sts", COUNTER_ALT);
    write(dir.path(), "counter_skip.sts", COUNTER_SKIP);
    write(dir.path(), "chooser.sts", CHOOSER);
    dir
}
