// MIT License - Copyright (c) 2026 Peter Wright
// TPI wire format

//! Login handshake and framing of the EnvisaLink TPI stream.
//!
//! # Handshake
//!
//! ```text
//! device: Login:\r\n
//! client: <password>\r
//! device: OK\r\n        (or FAILED\r\n)
//! ```
//!
//! The password is terminated by a bare carriage return, no newline.
//! After `OK` the device pushes event lines asynchronously, one per line,
//! with no further framing.

/// Substring identifying the login prompt line.
pub const LOGIN_PROMPT_MARKER: &str = "Login";

pub const AUTH_OK: &str = "OK";
pub const AUTH_FAILED: &str = "FAILED";

pub const LINE_TERMINATOR: u8 = b'\n';
pub const PASSWORD_TERMINATOR: u8 = b'\r';

/// Outcome of the line the device sends after the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    Accepted,
    Rejected,
    Unexpected(String),
}

impl AuthResponse {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            AUTH_OK => Self::Accepted,
            AUTH_FAILED => Self::Rejected,
            other => Self::Unexpected(other.to_string()),
        }
    }
}

pub fn is_login_prompt(line: &str) -> bool {
    line.contains(LOGIN_PROMPT_MARKER)
}

/// Bytes sent in reply to the login prompt.
pub fn login_command(password: &str) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(password.len() + 1);
    cmd.extend_from_slice(password.as_bytes());
    cmd.push(PASSWORD_TERMINATOR);
    cmd
}

/// Strips the line terminator (`\n` or `\r\n`) from a raw line.
pub fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == LINE_TERMINATOR {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
