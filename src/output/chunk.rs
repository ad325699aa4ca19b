//! Transport-sized chunking of final answers.

/// Maximum characters per transport message.
///
/// A safety margin under the assumed ~2000-character transport cap; both
/// the live display window and the final chunks use this limit.
pub const TRANSPORT_LIMIT: usize = 1900;

/// Split text into chunks of at most `max` characters, in order.
///
/// Boundaries are Unicode scalar values, so multi-byte content is never
/// split mid-character. An empty input yields no chunks.
pub fn split_chunks(text: &str, max: usize) -> Vec<String> {
    if max == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (index, _) in text.char_indices() {
        if count == max {
            chunks.push(text[start..index].to_string());
            start = index;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split_chunks("", 1900).is_empty());
    }

    #[test]
    fn test_short_input_single_chunk() {
        let chunks = split_chunks("hello", 1900);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_exact_boundary() {
        let text = "a".repeat(1900);
        let chunks = split_chunks(&text, 1900);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 1900);
    }

    #[test]
    fn test_ceil_division_chunk_count() {
        let text = "b".repeat(4000);
        let chunks = split_chunks(&text, 1900);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1900);
        assert_eq!(chunks[1].len(), 1900);
        assert_eq!(chunks[2].len(), 200);
    }

    #[test]
    fn test_order_preserved() {
        let chunks = split_chunks("abcdef", 2);
        assert_eq!(chunks, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn test_multibyte_not_split() {
        let text = "\u{00e9}".repeat(5); // two bytes per char
        let chunks = split_chunks(&text, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "\u{00e9}\u{00e9}");
        assert_eq!(chunks[2], "\u{00e9}");
    }
}
