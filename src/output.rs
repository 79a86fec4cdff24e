//! Quiet-aware console output.
//!
//! Response bodies and listings requested by the user are data and always
//! printed. Confirmations such as "service api created" are chatter and
//! disappear under `--quiet` or `--json-errors`.

use std::io::Write;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    quiet: bool,
}

impl Output {
    #[must_use]
    pub const fn new(quiet: bool, json_errors: bool) -> Self {
        Self {
            quiet: quiet || json_errors,
        }
    }

    /// Confirmation message, suppressed in quiet mode.
    pub fn success(&self, msg: impl std::fmt::Display) {
        if !self.quiet {
            // ast-grep-ignore: no-println
            println!("{msg}");
        }
    }

    /// Requested data, one line.
    pub fn data(&self, msg: impl std::fmt::Display) {
        // ast-grep-ignore: no-println
        println!("{msg}");
    }

    /// Requested data written verbatim. A newline is appended to non-empty
    /// text payloads that lack one; binary payloads are left untouched.
    pub fn raw(&self, payload: &[u8]) {
        let mut stdout = std::io::stdout().lock();
        // a closed pipe is not an error for a CLI
        let _ = stdout.write_all(payload);
        if needs_newline(payload) {
            let _ = stdout.write_all(b"\n");
        }
        let _ = stdout.flush();
    }

    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }
}

fn needs_newline(payload: &[u8]) -> bool {
    !payload.is_empty() && !payload.ends_with(b"\n") && std::str::from_utf8(payload).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newline_only_for_unterminated_text() {
        assert!(needs_newline(b"ok"));
        assert!(!needs_newline(b"ok\n"));
        assert!(!needs_newline(b""));
        assert!(!needs_newline(&[0xff, 0xd8, 0x00, 0x41]));
    }

    #[test]
    fn test_quiet_from_either_flag() {
        assert!(Output::new(true, false).is_quiet());
        assert!(Output::new(false, true).is_quiet());
        assert!(!Output::new(false, false).is_quiet());
    }
}
