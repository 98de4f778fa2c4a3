//! Helpers shared by the unit tests of this crate.

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Writes an executable shell script and returns its path.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A "compiler" that copies the source (a shell script) to the `-o` path
/// and fails with a diagnostic if the source contains `syntax error`.
#[cfg(unix)]
pub fn fake_compiler(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "fakecc",
        r#"
while [ $# -gt 2 ]; do shift; done
out="$1"; src="$2"
if grep -q 'syntax error' "$src"; then
  echo "$src:1: error: expected ';'" >&2
  exit 1
fi
cp "$src" "$out" && chmod +x "$out"
"#,
    )
}
