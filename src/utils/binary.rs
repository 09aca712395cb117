use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes inspected by the binary sniff.
pub const SNIFF_LEN: usize = 1024;

/// Checks if the buffer contains binary data.
/// Uses a simple heuristic: looks for null bytes in the first 1KB.
pub fn is_binary(content: &[u8]) -> bool {
    let check_len = content.len().min(SNIFF_LEN);
    content[..check_len].contains(&0)
}

/// Reads at most [`SNIFF_LEN`] bytes of the file and runs [`is_binary`] on them.
pub fn sniff_file(path: &Path) -> io::Result<bool> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    File::open(path)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(is_binary(&head))
}
