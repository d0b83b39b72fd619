//! Newline-delimited frame reassembly.

/// Longest partial frame carried across polls before it is treated as noise.
pub const MAX_PARTIAL_FRAME: usize = 256;

/// Splits a byte stream into lines, carrying an unterminated tail over to
/// the next push so a frame split across two reads is still delivered whole.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    discarding: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every frame completed by them.
    ///
    /// An unterminated run longer than [`MAX_PARTIAL_FRAME`] is dropped up to
    /// and including its next newline.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                if !self.discarding {
                    let line = String::from_utf8_lossy(&self.pending);
                    let line = line.trim_end_matches('\r');
                    if !line.trim().is_empty() {
                        frames.push(line.to_string());
                    }
                }
                self.pending.clear();
                self.discarding = false;
                continue;
            }

            if self.discarding {
                continue;
            }

            self.pending.push(byte);
            if self.pending.len() > MAX_PARTIAL_FRAME {
                self.pending.clear();
                self.discarding = true;
            }
        }

        frames
    }

    /// Bytes of the current unterminated frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Parses one frame into a temperature; `None` for noise.
pub fn parse_frame(frame: &str) -> Option<f64> {
    frame
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines() {
        let mut frames = FrameBuffer::new();
        assert_eq!(
            frames.push(b"21.000000\n22.500000\n"),
            vec!["21.000000", "22.500000"]
        );
        assert_eq!(frames.pending_len(), 0);
    }

    #[test]
    fn reassembles_a_frame_split_across_pushes() {
        let mut frames = FrameBuffer::new();
        assert!(frames.push(b"23.12").is_empty());
        assert_eq!(frames.pending_len(), 5);
        assert_eq!(frames.push(b"5000\n24"), vec!["23.125000"]);
        assert_eq!(frames.push(b".0\n"), vec!["24.0"]);
    }

    #[test]
    fn strips_carriage_returns_and_skips_blank_lines() {
        let mut frames = FrameBuffer::new();
        assert_eq!(frames.push(b"\n\r\n19.5\r\n"), vec!["19.5"]);
    }

    #[test]
    fn oversized_partial_frame_is_dropped_without_poisoning_the_next() {
        let mut frames = FrameBuffer::new();
        let noise = vec![b'7'; MAX_PARTIAL_FRAME + 10];

        assert!(frames.push(&noise).is_empty());
        assert!(frames.push(b"777\n").is_empty());
        assert_eq!(frames.push(b"20.0\n"), vec!["20.0"]);
    }

    #[test]
    fn parses_numbers_and_rejects_noise() {
        assert_eq!(parse_frame("21.500000"), Some(21.5));
        assert_eq!(parse_frame("  -3.25 "), Some(-3.25));
        assert_eq!(parse_frame("abc"), None);
        assert_eq!(parse_frame("21.5 22.5"), None);
        assert_eq!(parse_frame("NaN"), None);
        assert_eq!(parse_frame("inf"), None);
    }
}
