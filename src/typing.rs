//! Typing animation for the empty search box.

use std::time::{Duration, Instant};

const HOLD_TICKS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Typing,
    Holding(usize),
    Deleting,
}

#[derive(Debug)]
pub struct TypingPlaceholder {
    phrases: Vec<String>,
    phrase_idx: usize,
    shown: usize,
    phase: Phase,
    interval: Duration,
    last_tick: Instant,
    cancelled: bool,
}

impl TypingPlaceholder {
    pub fn new(phrases: Vec<String>, interval: Duration, now: Instant) -> Self {
        TypingPlaceholder {
            phrases,
            phrase_idx: 0,
            shown: 0,
            phase: Phase::Typing,
            interval,
            last_tick: now,
            cancelled: false,
        }
    }

    pub fn text(&self) -> String {
        self.phrases
            .get(self.phrase_idx)
            .map(|p| p.chars().take(self.shown).collect())
            .unwrap_or_default()
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Advances at most one step per elapsed interval. Returns true when the text changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.cancelled || self.phrases.is_empty() {
            return false;
        }
        if now.saturating_duration_since(self.last_tick) < self.interval {
            return false;
        }
        self.last_tick = now;
        let len = self.phrases[self.phrase_idx].chars().count();
        match self.phase {
            Phase::Typing => {
                if self.shown < len {
                    self.shown += 1;
                    return true;
                }
                self.phase = Phase::Holding(0);
                false
            }
            Phase::Holding(n) if n + 1 < HOLD_TICKS => {
                self.phase = Phase::Holding(n + 1);
                false
            }
            Phase::Holding(_) => {
                self.phase = Phase::Deleting;
                false
            }
            Phase::Deleting => {
                if self.shown > 0 {
                    self.shown -= 1;
                } else {
                    self.phrase_idx = (self.phrase_idx + 1) % self.phrases.len();
                    self.phase = Phase::Typing;
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    fn run(p: &mut TypingPlaceholder, start: Instant, ticks: u32) -> Instant {
        let mut now = start;
        for _ in 0..ticks {
            now += STEP;
            p.tick(now);
        }
        now
    }

    #[test]
    fn test_types_one_char_per_interval() {
        let start = Instant::now();
        let mut p = TypingPlaceholder::new(vec!["gym".into()], STEP, start);
        assert_eq!(p.text(), "");
        assert!(!p.tick(start + STEP / 2));
        assert!(p.tick(start + STEP));
        assert_eq!(p.text(), "g");
        run(&mut p, start + STEP, 2);
        assert_eq!(p.text(), "gym");
    }

    #[test]
    fn test_cycles_to_next_phrase() {
        let start = Instant::now();
        let mut p = TypingPlaceholder::new(vec!["ab".into(), "cd".into()], STEP, start);
        // 2 typing, 1 to start holding, HOLD_TICKS holding, 2 deleting, 1 to switch
        let ticks = 2 + 1 + HOLD_TICKS as u32 + 2 + 1;
        let now = run(&mut p, start, ticks);
        assert_eq!(p.text(), "");
        run(&mut p, now, 1);
        assert_eq!(p.text(), "c");
    }

    #[test]
    fn test_cancelled_ticker_never_advances() {
        let start = Instant::now();
        let mut p = TypingPlaceholder::new(vec!["read".into()], STEP, start);
        run(&mut p, start, 2);
        p.cancel();
        let now = run(&mut p, start + STEP * 2, 10);
        assert!(!p.tick(now + STEP));
        assert_eq!(p.text(), "re");
    }
}
