//! Output truncation for tool results.

use lumen_core::truncate_to_boundary;

/// Default output size limit, in bytes.
pub const MAX_OUTPUT_CHARS: usize = 30_000;

/// Truncate output to stay within LLM context limits.
///
/// Output longer than `max_chars` bytes is cut at a UTF-8 boundary and gets a
/// notice appended.
#[must_use]
pub fn truncate_output(output: String, max_chars: usize) -> String {
    if output.len() <= max_chars {
        return output;
    }
    let mut truncated = truncate_to_boundary(&output, max_chars).to_string();
    truncated.push_str(&format!(
        "\n\n... (output truncated: exceeded {max_chars} character limit)"
    ));
    truncated
}
