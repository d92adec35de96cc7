// Referral Fan-out (spec §4.4).
//
// §4.4's prose ("L2 ancestors receive 30% of L1's share; L3 ancestors
// 10%") does not match the worked numeric example in spec §8 scenario 3
// (A-B-C-D chain, D's 1.0 FIN credit yields C=0.1, B=0.01, A=0.001 —
// i.e. each level is 10% of the level below it, not 30% of L1's share
// for L2). This implementation follows the §8 worked example — each
// ancestor receives 10% of the share one level closer to the
// originator — and treats §4.4's "30%" as the less authoritative prose
// description of the same mechanism. See DESIGN.md "Open Question
// decisions".

use reward_common::{config::EngineConfig, id::UserId, model::RpTier};

#[derive(Debug, Clone, PartialEq)]
pub struct FanoutShare {
    pub ancestor_id: UserId,
    pub depth: u8,
    pub fin_delta: f64,
    pub rp_delta: u64,
}

/// What the fan-out needs to know about an ancestor to cap and
/// regress their share (spec §4.4: "Each ancestor's share is itself
/// capped by their tier network-size cap and scaled by their current
/// regression factor").
#[derive(Debug, Clone, Copy)]
pub struct AncestorContext {
    pub tier: RpTier,
    pub direct_referral_count: u32,
}

fn depth_fraction(depth: u8) -> f64 {
    // L1 = 10% of the originator's delta; each subsequent level is 10%
    // of the level immediately above it (0.1^depth).
    0.1f64.powi(depth as i32)
}

fn cap_and_regress(
    cfg: &EngineConfig,
    base_fin: f64,
    base_rp: u64,
    ctx: AncestorContext,
) -> (f64, u64) {
    let cap_ratio = match ctx.tier.network_size_cap() {
        Some(cap) if ctx.direct_referral_count > cap => {
            cap as f64 / ctx.direct_referral_count as f64
        }
        _ => 1.0,
    };
    let regression = (-cfg.regression_k_network * ctx.direct_referral_count as f64).exp();
    let scale = cap_ratio * regression;
    (base_fin * scale, ((base_rp as f64) * scale).floor() as u64)
}

/// Compute each ancestor's share of one credited event. `ancestors` is
/// the chain returned by `ReferralStore::ancestors` (depth 1..=3, at
/// most one ancestor per depth since depth=1 is unique per referred
/// user). `context_of` resolves each ancestor's tier/network size.
pub fn compute_fanout(
    cfg: &EngineConfig,
    ancestors: &[(UserId, u8)],
    originator_delta_fin: f64,
    originator_delta_xp: u64,
    context_of: impl Fn(&UserId) -> AncestorContext,
) -> Vec<FanoutShare> {
    ancestors
        .iter()
        .map(|(ancestor_id, depth)| {
            let fraction = depth_fraction(*depth);
            let base_fin = originator_delta_fin * fraction;
            // spec §4.4: "5% of Δxp converted to RP" at L1, then the
            // same depth fraction applies to deeper levels.
            let base_rp = ((originator_delta_xp as f64) * 0.05 * fraction).floor() as u64;
            let ctx = context_of(ancestor_id);
            let (fin_delta, rp_delta) = cap_and_regress(cfg, base_fin, base_rp, ctx);
            FanoutShare {
                ancestor_id: *ancestor_id,
                depth: *depth,
                fin_delta,
                rp_delta,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uncapped_ctx() -> AncestorContext {
        AncestorContext {
            tier: RpTier::Ambassador,
            direct_referral_count: 0,
        }
    }

    #[test]
    fn scenario_referral_chain_monotonically_decreases_with_depth() {
        let cfg = EngineConfig::default();
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");
        let c = UserId::from_bytes_lossy(b"c");
        let ancestors = vec![(c, 1u8), (b, 2u8), (a, 3u8)];

        let shares = compute_fanout(&cfg, &ancestors, 1.0, 0, |_| uncapped_ctx());

        assert!((shares[0].fin_delta - 0.1).abs() < 1e-9);
        assert!((shares[1].fin_delta - 0.01).abs() < 1e-9);
        assert!((shares[2].fin_delta - 0.001).abs() < 1e-9);
        assert!(shares[0].fin_delta > shares[1].fin_delta);
        assert!(shares[1].fin_delta > shares[2].fin_delta);
    }

    #[test]
    fn conservation_bound_holds() {
        let cfg = EngineConfig::default();
        let a = UserId::from_bytes_lossy(b"a");
        let b = UserId::from_bytes_lossy(b"b");
        let c = UserId::from_bytes_lossy(b"c");
        let originator_delta = 1.0;
        let ancestors = vec![(c, 1u8), (b, 2u8), (a, 3u8)];
        let shares = compute_fanout(&cfg, &ancestors, originator_delta, 0, |_| uncapped_ctx());
        let total: f64 = shares.iter().map(|s| s.fin_delta).sum();
        assert!(total <= 0.43 * originator_delta);
    }

    #[test]
    fn network_size_cap_reduces_share() {
        let cfg = EngineConfig::default();
        let c = UserId::from_bytes_lossy(b"c");
        let ancestors = vec![(c, 1u8)];
        let over_cap_ctx = AncestorContext {
            tier: RpTier::Explorer, // cap = 10
            direct_referral_count: 100,
        };
        let shares = compute_fanout(&cfg, &ancestors, 1.0, 0, |_| over_cap_ctx);
        // 10/100 cap ratio times a regression factor < 1
        assert!(shares[0].fin_delta < 0.1 * 0.10);
    }
}
