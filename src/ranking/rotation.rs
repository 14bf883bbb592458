//! Rotation evaluator: a deterministic
//! priority cascade over ranked held positions and candidates, producing
//! at most one action per tick (testable property 10).

use super::RankedItem;
use crate::config::RotationConfig;
use crate::types::{Mint, SlotType};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum RotationAction {
    BreakEvenLockExit { mint: Mint },
    ScoutStopLossExit { mint: Mint },
    CoreLossExit { mint: Mint },
    ScoutUnderperformGraceExpired { mint: Mint },
    TrailingStopExit { mint: Mint },
    StaleTimeoutExit { mint: Mint },
    OpportunityCostRotation { worst_mint: Mint, best_mint: Mint },
    StaleRotationWithReplacement { worst_mint: Mint, best_mint: Mint },
    NoAction,
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Runs the 12-step cascade. `current_total_positions` is the count of
/// currently-held positions (including the ones in `held`).
pub fn evaluate(
    held: &[RankedItem],
    candidates: &[RankedItem],
    cfg: &RotationConfig,
    current_total_positions: usize,
) -> RotationAction {
    // 1. break_even_lock_exit, worst PnL first.
    if let Some(item) = held
        .iter()
        .filter(|h| h.flags.break_even_exit_triggered)
        .min_by(|a, b| cmp_f64(a.pnl_pct, b.pnl_pct))
    {
        return RotationAction::BreakEvenLockExit { mint: item.mint.clone() };
    }

    // 2. scout_stop_loss_exit.
    if let Some(item) = held.iter().find(|h| h.flags.scout_stop_loss_triggered) {
        return RotationAction::ScoutStopLossExit { mint: item.mint.clone() };
    }

    // 3. core_loss_exit.
    if let Some(item) = held.iter().find(|h| h.flags.core_loss_exit_triggered) {
        return RotationAction::CoreLossExit { mint: item.mint.clone() };
    }

    // 4. scout_underperform_grace_expired.
    if let Some(item) = held
        .iter()
        .find(|h| h.flags.scout_grace_expired && !h.flags.break_even_locked)
    {
        return RotationAction::ScoutUnderperformGraceExpired { mint: item.mint.clone() };
    }

    // 5. worst = lowest rank among trailing-stopped-core, BE-locked, rotation-eligible, or stale-not-BE-locked.
    let worst = held
        .iter()
        .filter(|h| {
            (h.flags.trailing_stop_triggered && h.slot_type == Some(SlotType::Core))
                || h.flags.break_even_locked
                || h.flags.eligible_for_rotation
                || (h.flags.is_stale && !h.flags.break_even_locked)
        })
        .min_by(|a, b| cmp_f64(a.rank, b.rank));

    let Some(worst) = worst else {
        return RotationAction::NoAction;
    };

    // 6. trailing stop exit, no replacement required.
    if worst.flags.trailing_stop_triggered {
        return RotationAction::TrailingStopExit { mint: worst.mint.clone() };
    }

    // 7. stale timeout exit once hours-stale crosses the exit threshold.
    if worst.flags.is_stale && !worst.flags.break_even_locked && worst.hours_held >= cfg.stale_exit_hours {
        return RotationAction::StaleTimeoutExit { mint: worst.mint.clone() };
    }

    // 8. open capacity elsewhere means rotation isn't needed.
    if current_total_positions < cfg.total_slots && !candidates.is_empty() {
        return RotationAction::NoAction;
    }

    // 9. best viable candidate.
    let best = candidates.iter().filter(|c| c.rank > 0.0).max_by(|a, b| cmp_f64(a.rank, b.rank));

    let Some(best) = best else {
        if worst.flags.is_stale && !worst.flags.break_even_locked {
            return RotationAction::StaleTimeoutExit { mint: worst.mint.clone() };
        }
        return RotationAction::NoAction;
    };

    // 10. opportunity-cost rotation.
    if best.rank - worst.rank >= cfg.rotation_threshold {
        return RotationAction::OpportunityCostRotation {
            worst_mint: worst.mint.clone(),
            best_mint: best.mint.clone(),
        };
    }

    // 11. stale rotation with replacement.
    if worst.flags.is_stale && !worst.flags.break_even_locked && best.rank - worst.rank > 0.0 {
        return RotationAction::StaleRotationWithReplacement {
            worst_mint: worst.mint.clone(),
            best_mint: best.mint.clone(),
        };
    }

    // 12. no rotation.
    RotationAction::NoAction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankFlags;
    use crate::types::Mint;

    fn cfg() -> RotationConfig {
        RotationConfig {
            rotation_threshold: 0.5,
            stale_exit_hours: 48.0,
            total_slots: 4,
            core_slots: 2,
        }
    }

    fn item(mint: &str, rank: f64, pnl_pct: f64, hours_held: f64, slot_type: Option<SlotType>, flags: RankFlags) -> RankedItem {
        RankedItem {
            mint: Mint::from(mint),
            rank,
            pnl_pct,
            hours_held,
            slot_type,
            signal_c: 0.0,
            momentum_c: 0.0,
            time_c: 0.0,
            trailing_c: 0.0,
            freshness_c: 0.0,
            quality_c: 0.0,
            flags,
        }
    }

    /// S3 (rotation cascade) from the testable-properties scenarios.
    #[test]
    fn break_even_lock_exit_wins_over_other_triggers() {
        let a = item(
            "A",
            -1.0,
            -0.08,
            10.0,
            Some(SlotType::Scout),
            RankFlags {
                scout_stop_loss_triggered: true,
                ..Default::default()
            },
        );
        let b = item(
            "B",
            -1.5,
            -0.11,
            20.0,
            Some(SlotType::Core),
            RankFlags {
                core_loss_exit_triggered: true,
                ..Default::default()
            },
        );
        let c = item(
            "C",
            -0.2,
            -0.01,
            5.0,
            Some(SlotType::Core),
            RankFlags {
                break_even_locked: true,
                break_even_exit_triggered: true,
                ..Default::default()
            },
        );
        let d = item(
            "D",
            0.0,
            0.005,
            30.0,
            Some(SlotType::Core),
            RankFlags {
                is_stale: true,
                ..Default::default()
            },
        );

        let held = vec![a, b, c, d];
        let action = evaluate(&held, &[], &cfg(), 4);
        assert_eq!(action, RotationAction::BreakEvenLockExit { mint: Mint::from("C") });
    }

    #[test]
    fn opportunity_cost_rotation_needs_full_slots() {
        let worst = item(
            "worst",
            -0.2,
            -0.01,
            5.0,
            Some(SlotType::Scout),
            RankFlags {
                eligible_for_rotation: true,
                ..Default::default()
            },
        );
        let best = item("best", 1.0, 0.0, 0.0, None, RankFlags::default());

        let held = vec![worst];
        let action = evaluate(&held, &[best], &cfg(), 4);
        assert_eq!(
            action,
            RotationAction::OpportunityCostRotation {
                worst_mint: Mint::from("worst"),
                best_mint: Mint::from("best"),
            }
        );
    }

    #[test]
    fn open_slot_suppresses_rotation() {
        let worst = item(
            "worst",
            -0.2,
            -0.01,
            5.0,
            Some(SlotType::Scout),
            RankFlags {
                eligible_for_rotation: true,
                ..Default::default()
            },
        );
        let best = item("best", 1.0, 0.0, 0.0, None, RankFlags::default());

        let held = vec![worst];
        let action = evaluate(&held, &[best], &cfg(), 1);
        assert_eq!(action, RotationAction::NoAction);
    }
}
