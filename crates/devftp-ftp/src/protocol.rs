//! FTP control-channel codec (RFC 959)
//!
//! Commands are single CRLF-terminated lines. Replies are one or more lines
//! starting with a three-digit code; a multi-line reply opens with
//! `123-text` and ends with a line starting `123 `.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::net::{Ipv4Addr, SocketAddrV4};

/// A complete server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    /// Text of the reply with the codes stripped, lines joined by spaces
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    /// 1xx: action started, expect another reply
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: more input needed, e.g. a password
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

/// Well-known reply codes used by the uploader
pub mod codes {
    pub const DATA_CONNECTION_OPEN: u16 = 125;
    pub const OPENING_DATA_CONNECTION: u16 = 150;
    pub const COMMAND_OK: u16 = 200;
    pub const SERVICE_READY: u16 = 220;
    pub const CLOSING: u16 = 221;
    pub const TRANSFER_COMPLETE: u16 = 226;
    pub const ENTERING_PASSIVE: u16 = 227;
    pub const LOGGED_IN: u16 = 230;
    pub const FILE_ACTION_OK: u16 = 250;
    pub const NEED_PASSWORD: u16 = 331;
}

/// Writes one CRLF-terminated command line
pub fn write_command<W: Write>(writer: &mut W, command: &str, arg: Option<&str>) -> io::Result<()> {
    let line = match arg {
        Some(arg) => format!("{} {}\r\n", command, arg),
        None => format!("{}\r\n", command),
    };
    writer.write_all(line.as_bytes())?;
    writer.flush()
}

/// Reads one complete (possibly multi-line) reply
pub fn read_reply<R: BufRead>(reader: &mut R) -> io::Result<Reply> {
    let first = read_line(reader)?;
    let (code, sep, text) = split_reply_line(&first)?;

    let mut lines = vec![text.to_string()];
    if sep == '-' {
        let terminator = format!("{} ", code);
        loop {
            let line = read_line(reader)?;
            if line.starts_with(&terminator) || line == code.to_string() {
                lines.push(line.get(4..).unwrap_or("").to_string());
                break;
            }
            lines.push(line);
        }
    }

    Ok(Reply { code, lines })
}

fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut buf = String::new();
    if reader.read_line(&mut buf)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "control connection closed by server",
        ));
    }
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

fn split_reply_line(line: &str) -> io::Result<(u16, char, &str)> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed FTP reply: {:?}", line),
        )
    };

    let code_text = line.get(..3).ok_or_else(invalid)?;
    if !code_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let code: u16 = code_text.parse().map_err(|_| invalid())?;

    match line[3..].chars().next() {
        None => Ok((code, ' ', "")),
        Some(sep @ (' ' | '-')) => Ok((code, sep, &line[4..])),
        Some(_) => Err(invalid()),
    }
}

/// Parses the `h1,h2,h3,h4,p1,p2` address out of a 227 reply
pub fn parse_pasv(text: &str) -> Option<SocketAddrV4> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let fields: Vec<u16> = text[start..]
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .take(6)
        .map(|s| s.parse::<u16>().ok())
        .collect::<Option<_>>()?;

    if fields.len() != 6 || fields.iter().any(|&n| n > 255) {
        return None;
    }

    let ip = Ipv4Addr::new(
        fields[0] as u8,
        fields[1] as u8,
        fields[2] as u8,
        fields[3] as u8,
    );
    let port = fields[4] * 256 + fields[5];
    Some(SocketAddrV4::new(ip, port))
}
