//! Plain-text duplicate dump.
//!
//! One line per group, paths quoted for a POSIX shell:
//!
//! ```text
//! duplicates <total-bytes> <file-size> '<path>' '<path>' ...
//! collisions 0x<checksum> <total-bytes> <file-size> '<path>' ...
//! ```

use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::duplicates::DuplicateRegistry;
use crate::scanner::{NodeId, ScanIndex, SizeClass};

/// Formatter for the text dump.
pub struct TextOutput<'a> {
    index: &'a ScanIndex,
    registry: &'a DuplicateRegistry,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(index: &'a ScanIndex, registry: &'a DuplicateRegistry) -> Self {
        Self { index, registry }
    }

    fn write_line<W: Write>(
        &self,
        writer: &mut W,
        label: &str,
        class: SizeClass,
        members: &[NodeId],
    ) -> std::io::Result<()> {
        write!(
            writer,
            "{} {} {}",
            label,
            class.size * members.len() as u64,
            class.size
        )?;
        for &member in members {
            write!(writer, " {}", escape_posix(&self.index.path(member)))?;
        }
        writeln!(writer)
    }

    /// Write every group, then every unresolved collision.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for group in self.registry.groups() {
            self.write_line(writer, "duplicates", group.class, &group.members)?;
        }
        for notice in self.registry.collisions() {
            let label = format!("collisions 0x{:016x}", notice.checksum.unwrap_or(0));
            self.write_line(writer, &label, notice.class, &notice.members)?;
        }
        Ok(())
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Quote a path for a POSIX shell.
///
/// Printable ASCII is kept, `'` becomes `'\''`, and other bytes are written
/// as C-style escapes (`\n`, `\r`, `\b`, octal).
#[must_use]
pub fn escape_posix(path: &Path) -> String {
    let mut out = String::with_capacity(path.as_os_str().len() + 2);
    out.push('\'');
    for &byte in path.as_os_str().as_bytes() {
        match byte {
            b'\'' => out.push_str("'\\''"),
            32..=126 => out.push(byte as char),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x08 => out.push_str("\\b"),
            other => out.push_str(&format!("\\{other:03o}")),
        }
    }
    out.push('\'');
    out
}
