//! Adaptive slippage governor: a bounded
//! sliding buffer of (quoted, realised) slippage pairs that nudges the
//! safety haircut and minimum-TVL floors based on how badly realised
//! slippage has been tracking the quotes.

use std::collections::VecDeque;

const SAMPLE_THRESHOLD: usize = 20;
const HAIRCUT_MIN: f64 = 0.50;
const HAIRCUT_MAX: f64 = 0.95;
const MIN_TVL_SCOUT_FLOOR: f64 = 10_000.0;
const MIN_TVL_CORE_FLOOR: f64 = 50_000.0;

#[derive(Debug, Clone, Copy)]
pub struct SlippageSample {
    pub quoted_bps: f64,
    pub realized_bps: f64,
}

pub struct SlippageGovernor {
    window: usize,
    samples: VecDeque<SlippageSample>,
    haircut: f64,
    min_tvl_scout_adjustment: f64,
    min_tvl_core_adjustment: f64,
}

impl SlippageGovernor {
    pub fn new(window: usize, initial_haircut: f64) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::new(),
            haircut: initial_haircut.clamp(HAIRCUT_MIN, HAIRCUT_MAX),
            min_tvl_scout_adjustment: 0.0,
            min_tvl_core_adjustment: 0.0,
        }
    }

    pub fn haircut(&self) -> f64 {
        self.haircut
    }

    pub fn min_tvl_scout(&self) -> f64 {
        MIN_TVL_SCOUT_FLOOR + self.min_tvl_scout_adjustment
    }

    pub fn min_tvl_core(&self) -> f64 {
        MIN_TVL_CORE_FLOOR + self.min_tvl_core_adjustment
    }

    /// Records one slippage sample and, once the buffer reaches
    /// [`SAMPLE_THRESHOLD`], re-evaluates the haircut and TVL floors.
    pub fn record(&mut self, sample: SlippageSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
        if self.samples.len() >= SAMPLE_THRESHOLD {
            self.reevaluate();
        }
    }

    fn reevaluate(&mut self) {
        let mut quoted: Vec<f64> = self.samples.iter().map(|s| s.quoted_bps).collect();
        let mut realized: Vec<f64> = self.samples.iter().map(|s| s.realized_bps).collect();
        quoted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        realized.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let median_quoted = median(&quoted);
        let median_realized = median(&realized);
        if median_quoted <= 0.0 {
            return;
        }
        let ratio = median_realized / median_quoted;

        if ratio > 1.5 {
            let severity = ((ratio - 1.5) / 1.5).clamp(0.0, 1.0);
            let haircut_delta = 0.02 + severity * 0.08;
            let tvl_delta = 10_000.0 + severity * 40_000.0;
            self.haircut = (self.haircut - haircut_delta).clamp(HAIRCUT_MIN, HAIRCUT_MAX);
            self.min_tvl_scout_adjustment += tvl_delta;
            self.min_tvl_core_adjustment += tvl_delta;
        } else if ratio < 0.8 {
            let relax = 0.02;
            self.haircut = (self.haircut + relax).clamp(HAIRCUT_MIN, HAIRCUT_MAX);
            self.min_tvl_scout_adjustment = (self.min_tvl_scout_adjustment - 5_000.0).max(0.0);
            self.min_tvl_core_adjustment = (self.min_tvl_core_adjustment - 5_000.0).max(0.0);
        }
    }
}

fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haircut_tightens_when_realized_slippage_exceeds_quoted() {
        let mut gov = SlippageGovernor::new(50, 0.85);
        for _ in 0..25 {
            gov.record(SlippageSample {
                quoted_bps: 50.0,
                realized_bps: 100.0,
            });
        }
        assert!(gov.haircut() < 0.85);
        assert!(gov.min_tvl_core() > MIN_TVL_CORE_FLOOR);
    }

    #[test]
    fn haircut_relaxes_when_realized_slippage_is_better_than_quoted() {
        let mut gov = SlippageGovernor::new(50, 0.70);
        for _ in 0..25 {
            gov.record(SlippageSample {
                quoted_bps: 100.0,
                realized_bps: 50.0,
            });
        }
        assert!(gov.haircut() > 0.70);
    }

    #[test]
    fn haircut_clamped_to_bounds() {
        let mut gov = SlippageGovernor::new(50, 0.50);
        for _ in 0..100 {
            gov.record(SlippageSample {
                quoted_bps: 10.0,
                realized_bps: 100.0,
            });
        }
        assert!(gov.haircut() >= 0.50);
    }

    #[test]
    fn below_threshold_samples_do_not_adjust() {
        let mut gov = SlippageGovernor::new(50, 0.85);
        for _ in 0..5 {
            gov.record(SlippageSample {
                quoted_bps: 50.0,
                realized_bps: 200.0,
            });
        }
        assert_eq!(gov.haircut(), 0.85);
    }
}
