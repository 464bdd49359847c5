// Command-line parsing for the loader's own arguments
//
// Features:
// - Whitespace-separated arguments
// - Double-quoted groups keep embedded whitespace
// - UCS-2 load options decoded up to the first NUL
//
// The first token is the loader's own program name and is never forwarded.

use alloc::string::String;
use alloc::vec::Vec;

pub struct CmdLine {
    args: Vec<String>,
}

impl CmdLine {
    /// Parse a command line using a single-pass state machine
    pub fn parse(cmdline: &str) -> Self {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut in_arg = false;
        let mut in_quotes = false;

        for ch in cmdline.chars() {
            match ch {
                '"' => {
                    in_quotes = !in_quotes;
                    in_arg = true;
                }
                ' ' | '\t' | '\n' | '\r' if !in_quotes => {
                    if in_arg {
                        args.push(core::mem::take(&mut current));
                        in_arg = false;
                    }
                }
                _ => {
                    current.push(ch);
                    in_arg = true;
                }
            }
        }

        // Handle last argument; an unterminated quote runs to the end of the line
        if in_arg {
            args.push(current);
        }

        Self { args }
    }

    /// Decode UCS-2 little-endian load options as handed over by the firmware.
    pub fn from_load_options(options: &[u8]) -> Self {
        Self::parse(&decode_ucs2(options))
    }

    /// Get argument at index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }

    /// Program name, if the line was not empty
    pub fn program_name(&self) -> Option<&str> {
        self.get(0)
    }

    /// Arguments after the program name
    pub fn forwarded(&self) -> &[String] {
        self.args.get(1..).unwrap_or(&[])
    }

    /// Get number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

/// Decode UCS-2 little-endian text up to the first NUL. Unpaired surrogates become
/// U+FFFD and a trailing odd byte is ignored.
pub fn decode_ucs2(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0);

    char::decode_utf16(units)
        .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
