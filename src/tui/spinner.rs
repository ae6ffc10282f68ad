const FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Spinner glyph for a tick count.
pub fn frame(tick: usize) -> char {
    FRAMES[tick % FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_braille() {
        assert!(FRAMES.iter().all(|c| ('\u{2800}'..='\u{28FF}').contains(c)));
    }

    #[test]
    fn cycles_through_every_frame() {
        let seen: std::collections::HashSet<char> = (0..FRAMES.len()).map(frame).collect();
        assert_eq!(seen.len(), FRAMES.len());
        assert_eq!(frame(0), frame(FRAMES.len()));
        let _ = frame(usize::MAX);
    }
}
