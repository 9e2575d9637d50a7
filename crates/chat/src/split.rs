//! Word-boundary message splitting for the chat rate limit (§4.G).

/// Maximum payload size, in bytes, for one chat line.
pub const MAX_CHUNK_BYTES: usize = 400;

/// Split `msg` into chunks no larger than [`MAX_CHUNK_BYTES`], breaking
/// only at word boundaries (never mid-word).
pub fn split_message(msg: &str) -> Vec<String> {
    if msg.len() <= MAX_CHUNK_BYTES {
        return vec![msg.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in msg.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.len()
        } else {
            current.len() + 1 + word.len()
        };

        if candidate_len > MAX_CHUNK_BYTES && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_a_single_chunk() {
        assert_eq!(split_message("hello"), vec!["hello".to_string()]);
    }

    #[test]
    fn long_message_splits_on_word_boundaries_under_the_limit() {
        let word = "abcdefghij"; // 10 bytes
        let msg = std::iter::repeat(word).take(150).collect::<Vec<_>>().join(" ");
        let chunks = split_message(&msg);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_BYTES);
            // never split mid-word
            assert!(chunk.split_whitespace().all(|w| w == word));
        }
        // round trip: rejoining recovers all the words in order
        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, msg);
    }

    #[test]
    fn a_roughly_1200_byte_message_splits_into_exactly_three_chunks() {
        // 36 ten-byte words per chunk fit in 400 bytes (395); 108 words is
        // exactly three full chunks.
        let word = "aaaaaaaaaa "; // 11 bytes incl. trailing space
        let msg: String = word.repeat(108);
        let msg = msg.trim_end();
        assert!(msg.len() >= 1100 && msg.len() <= 1300, "fixture len={}", msg.len());
        let chunks = split_message(msg);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.len() <= MAX_CHUNK_BYTES);
        }
    }
}
