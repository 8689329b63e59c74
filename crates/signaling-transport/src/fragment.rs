//! Reassembly of fragmented inbound messages.

/// Buffers message fragments until the final one arrives.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    buffer: Vec<u8>,
}

impl FragmentAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment.
    ///
    /// Returns the complete message once `is_final` is seen, leaving the
    /// assembler empty for the next message.
    pub fn push(&mut self, chunk: &[u8], is_final: bool) -> Option<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        if is_final {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// Number of bytes buffered for an incomplete message.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially received message.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_final_fragment() {
        let mut assembler = FragmentAssembler::new();
        assert_eq!(assembler.push(b"abc", true), Some(b"abc".to_vec()));
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn test_three_fragments_delivered_once() {
        let mut assembler = FragmentAssembler::new();

        assert_eq!(assembler.push(b"ab", false), None);
        assert_eq!(assembler.push(b"cd", false), None);
        assert_eq!(assembler.pending_len(), 4);
        assert_eq!(assembler.push(b"ef", true), Some(b"abcdef".to_vec()));

        // Buffer is reset for the next message
        assert_eq!(assembler.push(b"x", true), Some(b"x".to_vec()));
    }

    #[test]
    fn test_clear_discards_partial_message() {
        let mut assembler = FragmentAssembler::new();
        assembler.push(b"partial", false);
        assembler.clear();

        assert_eq!(assembler.push(b"next", true), Some(b"next".to_vec()));
    }
}
