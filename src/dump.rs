//! Map dump: formats the hole snapshot as human-readable text.

use std::io::Write;
use std::path::Path;

use crate::snapshot::HoleSnapshot;

/// Writes `snapshot`'s holes to `path` as ASCII `[h, s] - [h, s] - ...` text, with
/// no trailing newline. An empty snapshot produces an empty file.
///
/// The file is created if absent, truncated if present, and opened read+write
/// with permissive mode bits (`0o777`) on Unix, matching the original source;
/// the mode has no effect elsewhere.
///
/// Returns `0` on success, `-1` if the file cannot be opened or written.
pub(crate) fn dump_memory_map(path: impl AsRef<Path>, snapshot: &HoleSnapshot) -> i32 {
    let mut options = std::fs::OpenOptions::new();
    options.read(true).write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o777);
    }

    let Ok(mut file) = options.open(path) else { return -1 };

    let text = format_hole_list(snapshot);

    match file.write_all(text.as_bytes()) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

fn format_hole_list(snapshot: &HoleSnapshot) -> String {
    snapshot
        .holes()
        .map(|hole| format!("[{}, {}]", hole.head, hole.size))
        .collect::<Vec<_>>()
        .join(" - ")
}
