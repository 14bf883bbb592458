//! Decisions / targets: turns scored
//! candidates into fractional portfolio-weight targets, reserving a
//! baseline for core positions before distributing the remainder by
//! score and scaling up utilisation in multiple passes.

use crate::types::Mint;

#[derive(Debug, Clone)]
pub struct CoreHolding {
    pub mint: Mint,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub mint: Mint,
    pub score: f64,
    pub per_asset_cap_pct: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TargetsMeta {
    pub sum_raw: f64,
    pub sum_scaled: f64,
    pub scale_factor: f64,
    pub clamped_count: u32,
    pub passes_used: u32,
}

#[derive(Debug, Clone)]
pub struct Target {
    pub mint: Mint,
    pub weight_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionsConfigView {
    pub core_target_pct: f64,
    pub max_pos_pct: f64,
    pub deploy_target_pct: f64,
    pub max_scaling_passes: u32,
}

/// Lever 1 (core reservation) + Lever 2 (proportional distribution and
/// multi-pass utilisation scaling). `total_cap_pct` bounds the sum of all
/// target weights (e.g. 1.0 for fully-deployed, less to hold a reserve).
pub fn compute_targets(
    cores: &[CoreHolding],
    candidates: &[ScoredCandidate],
    cfg: &DecisionsConfigView,
    total_cap_pct: f64,
) -> (Vec<Target>, TargetsMeta) {
    let core_baseline = cfg.core_target_pct.min(cfg.max_pos_pct);
    let mut core_reserved = core_baseline * cores.len() as f64;
    if core_reserved > total_cap_pct {
        let scale = if core_reserved > 0.0 { total_cap_pct / core_reserved } else { 0.0 };
        core_reserved = total_cap_pct;
        let mut targets: Vec<Target> = cores
            .iter()
            .map(|c| Target {
                mint: c.mint.clone(),
                weight_pct: core_baseline * scale,
            })
            .collect();
        let (candidate_targets, meta) = distribute_remaining(candidates, cfg, 0.0);
        targets.extend(candidate_targets);
        return (targets, meta);
    }

    let mut targets: Vec<Target> = cores
        .iter()
        .map(|c| Target {
            mint: c.mint.clone(),
            weight_pct: core_baseline,
        })
        .collect();

    let remaining_budget = (total_cap_pct - core_reserved).max(0.0);
    let (candidate_targets, meta) = distribute_remaining(candidates, cfg, remaining_budget);
    targets.extend(candidate_targets);
    (targets, meta)
}

fn distribute_remaining(
    candidates: &[ScoredCandidate],
    cfg: &DecisionsConfigView,
    remaining_budget: f64,
) -> (Vec<Target>, TargetsMeta) {
    let positive: Vec<&ScoredCandidate> = candidates.iter().filter(|c| c.score > 0.0).collect();
    let sum_scores: f64 = positive.iter().map(|c| c.score).sum();

    let mut weights: Vec<(Mint, f64, f64)> = positive
        .iter()
        .map(|c| {
            let raw = if sum_scores > 0.0 {
                remaining_budget * (c.score / sum_scores)
            } else {
                0.0
            };
            (c.mint.clone(), raw.min(c.per_asset_cap_pct), c.per_asset_cap_pct)
        })
        .collect();

    let sum_raw: f64 = weights.iter().map(|(_, w, _)| *w).sum();
    let mut clamped_count = weights
        .iter()
        .zip(positive.iter())
        .filter(|((_, w, cap), c)| *w >= *cap && remaining_budget * (c.score / sum_scores.max(1e-12)) > *cap)
        .count() as u32;

    let deploy_target = remaining_budget * cfg.deploy_target_pct;
    let mut passes_used = 0;
    let mut total: f64 = weights.iter().map(|(_, w, _)| *w).sum();

    while passes_used < cfg.max_scaling_passes && total < deploy_target * 0.99 {
        let uncapped: Vec<usize> = weights
            .iter()
            .enumerate()
            .filter(|(_, (_, w, cap))| w < cap)
            .map(|(i, _)| i)
            .collect();
        if uncapped.is_empty() {
            break;
        }
        let deficit = deploy_target - total;
        let uncapped_total: f64 = uncapped.iter().map(|&i| weights[i].1).sum();
        if uncapped_total <= 0.0 {
            break;
        }
        for &i in &uncapped {
            let (mint, w, cap) = weights[i].clone();
            let share = deficit * (w / uncapped_total);
            let new_w = (w + share).min(cap);
            if (new_w - cap).abs() < 1e-9 {
                clamped_count += 1;
            }
            weights[i] = (mint, new_w, cap);
        }
        total = weights.iter().map(|(_, w, _)| *w).sum();
        passes_used += 1;
    }

    let sum_scaled = total;
    let scale_factor = if sum_raw > 0.0 { sum_scaled / sum_raw } else { 1.0 };

    let targets = weights
        .into_iter()
        .map(|(mint, weight_pct, _)| Target { mint, weight_pct })
        .collect();

    (
        targets,
        TargetsMeta {
            sum_raw,
            sum_scaled,
            scale_factor,
            clamped_count,
            passes_used,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> DecisionsConfigView {
        DecisionsConfigView {
            core_target_pct: 0.15,
            max_pos_pct: 0.20,
            deploy_target_pct: 0.90,
            max_scaling_passes: 5,
        }
    }

    #[test]
    fn core_baseline_is_reserved_per_core_position() {
        let cores = vec![CoreHolding { mint: Mint::from("core1") }];
        let (targets, _meta) = compute_targets(&cores, &[], &cfg(), 1.0);
        let core_target = targets.iter().find(|t| t.mint.0 == "core1").unwrap();
        assert!((core_target.weight_pct - 0.15).abs() < 1e-9);
    }

    #[test]
    fn cores_are_prorated_when_aggregate_exceeds_cap() {
        let cores = vec![
            CoreHolding { mint: Mint::from("c1") },
            CoreHolding { mint: Mint::from("c2") },
            CoreHolding { mint: Mint::from("c3") },
            CoreHolding { mint: Mint::from("c4") },
            CoreHolding { mint: Mint::from("c5") },
            CoreHolding { mint: Mint::from("c6") },
            CoreHolding { mint: Mint::from("c7") },
        ];
        let (targets, _meta) = compute_targets(&cores, &[], &cfg(), 1.0);
        let total: f64 = targets.iter().map(|t| t.weight_pct).sum();
        assert!(total <= 1.0 + 1e-9);
    }

    #[test]
    fn remaining_budget_distributes_by_score_proportion() {
        let candidates = vec![
            ScoredCandidate { mint: Mint::from("a"), score: 2.0, per_asset_cap_pct: 0.5 },
            ScoredCandidate { mint: Mint::from("b"), score: 1.0, per_asset_cap_pct: 0.5 },
        ];
        let (targets, meta) = compute_targets(&[], &candidates, &cfg(), 0.3);
        let a = targets.iter().find(|t| t.mint.0 == "a").unwrap();
        let b = targets.iter().find(|t| t.mint.0 == "b").unwrap();
        assert!(a.weight_pct > b.weight_pct);
        assert!(meta.sum_scaled > 0.0);
    }

    #[test]
    fn utilisation_scaling_tops_up_uncapped_targets_toward_deploy_target() {
        let candidates = vec![
            ScoredCandidate { mint: Mint::from("a"), score: 1.0, per_asset_cap_pct: 0.05 },
            ScoredCandidate { mint: Mint::from("b"), score: 1.0, per_asset_cap_pct: 1.0 },
        ];
        let (targets, meta) = compute_targets(&[], &candidates, &cfg(), 0.5);
        let total: f64 = targets.iter().map(|t| t.weight_pct).sum();
        assert!(total >= 0.5 * cfg().deploy_target_pct * 0.99 - 1e-6);
        assert!(meta.passes_used > 0);
    }
}
