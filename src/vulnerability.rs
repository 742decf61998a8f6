/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Trust/vulnerability scoring.
//!
//! - [`ActionKind`]: what the player did, with a fixed signed base impact.
//! - [`ContextKind`]: the manipulation tactic the scene is applying.
//! - [`VulnerabilityWeights`]: per-actor weighting, loaded once at actor selection.
//! - [`TrustScorer`]: pure `delta = score(actor, action, context, current)`.
//!
//! # Formula
//!
//! ```text
//! delta = round(base_impact × context_modifier × character_weight × curve)
//!
//! context_modifier = tactic_multipliers[context]                 (1.0 if absent)
//! character_weight = max(0, 1 + baseline_adjustments[context])
//!                    × (penalty × sensitivity)     for negative impacts
//!                    × (bonus × recovery_rate)     for positive impacts
//! curve            = (1 − (score + 100) / 200)^1.5 + 0.5        ∈ [0.5, 1.5]
//! ```
//!
//! # Invariants
//!
//! - Baseline adjustments combine additively, tactic multipliers multiplicatively.
//! - The curve is monotonically decreasing in score and never drops below 0.5:
//!   the same mistake hurts more the less trust is left.
//! - An unknown actor degrades to neutral weighting (every factor 1.0).
//! - [`apply_delta`] always returns a score in [-100, 100].

use hashbrown::HashMap;

/// Lowest possible trust score.
pub const SCORE_MIN: f32 = -100.0;
/// Highest possible trust score.
pub const SCORE_MAX: f32 = 100.0;
/// Score a session starts at when the actor has no weights entry.
pub const DEFAULT_INITIAL_SCORE: f32 = 50.0;

/// Clamp a score into [`SCORE_MIN`, `SCORE_MAX`]. NaN maps to 0.
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        log::warn!("clamp_score: NaN score, using 0");
        return 0.0;
    }
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Apply a delta to a score, clamping the result into [-100, 100].
pub fn apply_delta(current: f32, delta: f32) -> f32 {
    if !delta.is_finite() {
        return clamp_score(current);
    }
    clamp_score(current + delta)
}

/// Map a score from [-100, 100] onto [0, 1].
pub fn normalize_score(score: f32) -> f32 {
    ((clamp_score(score) - SCORE_MIN) / (SCORE_MAX - SCORE_MIN)).clamp(0.0, 1.0)
}

/// Convex vulnerability curve: `(1 − normalize(score))^1.5 + 0.5`.
///
/// ```text
///   score =  100 → 0.50
///   score =    0 → 0.85
///   score = -100 → 1.50
/// ```
pub fn vulnerability_curve(score: f32) -> f32 {
    let exposure = 1.0 - normalize_score(score);
    exposure * exposure.sqrt() + 0.5
}

// ─── Actor identity ─────────────────────────────────────────────────────────

/// Identity of the manipulating character whose scenario is active.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(String);

impl ActorId {
    /// Wrap an actor name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The actor name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl From<&str> for ActorId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Actions and contexts ───────────────────────────────────────────────────

/// What the player did in response to the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ActionKind {
    /// Handed over a password, code or token.
    ShareCredentials,
    /// Revealed personal or organisational information.
    DiscloseSensitiveInfo,
    /// Opened a link or attachment without checking it.
    ClickUnverifiedLink,
    /// Acted on a deadline the manipulator imposed.
    ComplyWithUrgency,
    /// Dismissed a warning sign.
    IgnoreWarning,
    /// Paused without committing either way.
    Hesitate,
    /// Asked a question that tests the story.
    AskClarifyingQuestion,
    /// Checked identity through an independent channel.
    VerifyIdentity,
    /// Asked a colleague or IT for help.
    SeekHelp,
    /// Reported the attempt.
    ReportAttempt,
}

impl ActionKind {
    /// Every action kind, riskiest first.
    pub const ALL: [ActionKind; 10] = [
        ActionKind::ShareCredentials,
        ActionKind::DiscloseSensitiveInfo,
        ActionKind::ClickUnverifiedLink,
        ActionKind::ComplyWithUrgency,
        ActionKind::IgnoreWarning,
        ActionKind::Hesitate,
        ActionKind::AskClarifyingQuestion,
        ActionKind::VerifyIdentity,
        ActionKind::SeekHelp,
        ActionKind::ReportAttempt,
    ];

    /// Signed base impact on the trust score.
    pub fn base_impact(self) -> f32 {
        match self {
            ActionKind::ShareCredentials => -50.0,
            ActionKind::DiscloseSensitiveInfo => -35.0,
            ActionKind::ClickUnverifiedLink => -25.0,
            ActionKind::ComplyWithUrgency => -20.0,
            ActionKind::IgnoreWarning => -10.0,
            ActionKind::Hesitate => 0.0,
            ActionKind::AskClarifyingQuestion => 5.0,
            ActionKind::VerifyIdentity => 15.0,
            ActionKind::SeekHelp => 20.0,
            ActionKind::ReportAttempt => 25.0,
        }
    }

    /// `true` for actions that lower trust.
    pub fn is_risky(self) -> bool {
        self.base_impact() < 0.0
    }
}

/// The manipulation tactic a scene is leaning on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContextKind {
    /// Impersonated boss, officer, administrator.
    Authority,
    /// Deadline or countdown pressure.
    Urgency,
    /// Rapport, flattery, shared history.
    Familiarity,
    /// A favour that demands one back.
    Reciprocity,
    /// Limited offer, last chance.
    Scarcity,
    /// "Everyone else already did it."
    SocialProof,
    /// No tactic in play.
    Neutral,
}

// ─── Weights ────────────────────────────────────────────────────────────────

/// Context modifiers applied on top of the additive baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextModifiers {
    /// Scales negative impacts.
    pub penalty: f32,
    /// Scales positive impacts.
    pub bonus: f32,
    /// Scales negative impacts together with `penalty`.
    pub sensitivity: f32,
}

impl Default for ContextModifiers {
    fn default() -> Self {
        Self { penalty: 1.0, bonus: 1.0, sensitivity: 1.0 }
    }
}

/// Per-actor vulnerability weighting. Immutable once a session starts.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VulnerabilityWeights {
    /// Additive adjustment to the character weight, per context.
    pub baseline_adjustments: HashMap<ContextKind, f32>,
    /// Multiplicative tactic multiplier, per context.
    pub tactic_multipliers: HashMap<ContextKind, f32>,
    /// Penalty/bonus/sensitivity modifiers.
    pub modifiers: ContextModifiers,
    /// Multiplier on positive (recovering) impacts.
    pub recovery_rate: f32,
    /// Score a session with this actor starts at.
    pub initial_score: f32,
}

impl VulnerabilityWeights {
    /// Neutral weights: every factor 1.0, no adjustments.
    pub fn neutral() -> Self {
        Self {
            baseline_adjustments: HashMap::new(),
            tactic_multipliers: HashMap::new(),
            modifiers: ContextModifiers::default(),
            recovery_rate: 1.0,
            initial_score: DEFAULT_INITIAL_SCORE,
        }
    }

    /// Set the tactic multiplier for `context`.
    pub fn with_tactic(mut self, context: ContextKind, multiplier: f32) -> Self {
        self.tactic_multipliers.insert(context, multiplier);
        self
    }

    /// Set the additive baseline adjustment for `context`.
    pub fn with_baseline(mut self, context: ContextKind, adjustment: f32) -> Self {
        self.baseline_adjustments.insert(context, adjustment);
        self
    }

    /// Replace the context modifiers.
    pub fn with_modifiers(mut self, modifiers: ContextModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the recovery-rate multiplier.
    pub fn with_recovery_rate(mut self, rate: f32) -> Self {
        self.recovery_rate = rate;
        self
    }

    /// Set the session starting score (clamped into range).
    pub fn with_initial_score(mut self, score: f32) -> Self {
        self.initial_score = clamp_score(score);
        self
    }

    /// Tactic multiplier for `context`.
    pub fn tactic_multiplier(&self, context: ContextKind) -> f32 {
        self.tactic_multipliers.get(&context).copied().unwrap_or(1.0)
    }

    /// Character weight for an impact of the given sign in `context`.
    pub fn character_weight(&self, context: ContextKind, negative: bool) -> f32 {
        let adjusted =
            (1.0 + self.baseline_adjustments.get(&context).copied().unwrap_or(0.0)).max(0.0);
        if negative {
            adjusted * self.modifiers.penalty * self.modifiers.sensitivity
        } else {
            adjusted * self.modifiers.bonus * self.recovery_rate
        }
    }
}

impl Default for VulnerabilityWeights {
    fn default() -> Self {
        Self::neutral()
    }
}

// ─── Scorer ─────────────────────────────────────────────────────────────────

/// Pure trust-delta scorer over a read-only table of actor weights.
#[derive(Clone, Debug, Default)]
pub struct TrustScorer {
    weights: HashMap<ActorId, VulnerabilityWeights>,
}

impl TrustScorer {
    /// Scorer with no actor weights (everyone neutral).
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the weights for one actor.
    pub fn with_actor(mut self, actor: ActorId, weights: VulnerabilityWeights) -> Self {
        self.weights.insert(actor, weights);
        self
    }

    /// Weights registered for `actor`, if any.
    pub fn weights(&self, actor: &ActorId) -> Option<&VulnerabilityWeights> {
        self.weights.get(actor)
    }

    /// Score a session with `actor` starts at.
    pub fn initial_score(&self, actor: &ActorId) -> f32 {
        self.weights(actor).map_or(DEFAULT_INITIAL_SCORE, |w| w.initial_score)
    }

    /// Tactic multiplier for `actor` in `context` (1.0 when unknown).
    pub fn context_modifier(&self, actor: &ActorId, context: ContextKind) -> f32 {
        self.weights(actor).map_or(1.0, |w| w.tactic_multiplier(context))
    }

    /// Character weight for `actor` in `context` (1.0 when unknown).
    pub fn character_weight(&self, actor: &ActorId, context: ContextKind, negative: bool) -> f32 {
        self.weights(actor)
            .map_or(1.0, |w| w.character_weight(context, negative))
    }

    /// Compute the rounded trust delta for one action.
    ///
    /// The caller applies it with [`apply_delta`]. Never fails.
    pub fn score(
        &self,
        actor: &ActorId,
        action: ActionKind,
        context: ContextKind,
        current: f32,
    ) -> f32 {
        let base = action.base_impact();
        if base == 0.0 {
            return 0.0;
        }
        if self.weights(actor).is_none() {
            log::debug!("no weights for actor {actor}, scoring with neutral weighting");
        }
        let current = if current.is_finite() {
            current
        } else {
            log::warn!("non-finite current score {current} for actor {actor}, scoring from 0");
            0.0
        };

        let raw = base
            * self.context_modifier(actor, context)
            * self.character_weight(actor, context, base < 0.0)
            * vulnerability_curve(current);
        if raw.is_finite() {
            raw.round()
        } else {
            log::warn!(
                "non-finite delta for actor {actor} action {action:?} context {context:?}, using 0"
            );
            0.0
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ceo_fraud() -> ActorId {
        ActorId::new("ceo_fraud")
    }

    fn scorer() -> TrustScorer {
        TrustScorer::new().with_actor(
            ceo_fraud(),
            VulnerabilityWeights::neutral()
                .with_tactic(ContextKind::Authority, 1.5)
                .with_baseline(ContextKind::Urgency, 0.2)
                .with_recovery_rate(0.5)
                .with_initial_score(60.0),
        )
    }

    // ── Curve tests ───────────────────────────────────────────────────────

    #[test]
    fn test_curve_endpoints() {
        assert!((vulnerability_curve(100.0) - 0.5).abs() < 1e-6);
        assert!((vulnerability_curve(-100.0) - 1.5).abs() < 1e-6);
        // normalize(0) = 0.5 → 0.5^1.5 + 0.5
        let expected = 0.5_f32.powf(1.5) + 0.5;
        assert!((vulnerability_curve(0.0) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_curve_monotonic_decreasing_and_bounded() {
        let mut prev = f32::INFINITY;
        for s in -100..=100 {
            let c = vulnerability_curve(s as f32);
            assert!(c <= prev, "curve rose at {s}: {c} > {prev}");
            assert!(c >= 0.5, "curve below 0.5 at {s}: {c}");
            prev = c;
        }
    }

    #[test]
    fn test_curve_out_of_range_input_is_clamped() {
        assert!((vulnerability_curve(500.0) - 0.5).abs() < 1e-6);
        assert!((vulnerability_curve(-500.0) - 1.5).abs() < 1e-6);
    }

    // ── Delta application ─────────────────────────────────────────────────

    #[test]
    fn test_apply_delta_clamps() {
        assert_eq!(apply_delta(90.0, 25.0), 100.0);
        assert_eq!(apply_delta(-90.0, -25.0), -100.0);
        let mut s = -100.0;
        for _ in 0..10 {
            s = apply_delta(s, -50.0);
            assert_eq!(s, -100.0);
        }
        assert_eq!(apply_delta(10.0, f32::NAN), 10.0);
        assert_eq!(apply_delta(f32::NAN, 5.0), 0.0);
    }

    // ── Scorer tests ──────────────────────────────────────────────────────

    #[test]
    fn test_neutral_action_scores_zero() {
        let s = scorer();
        assert_eq!(s.score(&ceo_fraud(), ActionKind::Hesitate, ContextKind::Authority, 0.0), 0.0);
    }

    #[test]
    fn test_unknown_actor_uses_neutral_weighting() {
        let s = scorer();
        let stranger = ActorId::new("stranger");
        assert_eq!(s.context_modifier(&stranger, ContextKind::Authority), 1.0);
        assert_eq!(s.character_weight(&stranger, ContextKind::Authority, true), 1.0);
        // -25 × curve(0)=0.8536 → -21.3 → -21
        let d = s.score(&stranger, ActionKind::ClickUnverifiedLink, ContextKind::Neutral, 0.0);
        assert_eq!(d, -21.0);
        assert_eq!(s.initial_score(&stranger), DEFAULT_INITIAL_SCORE);
    }

    #[test]
    fn test_tactic_multiplier_amplifies() {
        let s = scorer();
        let plain = s.score(&ceo_fraud(), ActionKind::ShareCredentials, ContextKind::Neutral, 60.0);
        let amplified =
            s.score(&ceo_fraud(), ActionKind::ShareCredentials, ContextKind::Authority, 60.0);
        assert!(amplified < plain, "amplified={amplified} plain={plain}");
        // -50 × 1.5 × (0.2^1.5 + 0.5) = -44.2 → -44
        assert_eq!(amplified, -44.0);
    }

    #[test]
    fn test_baseline_adjustment_is_additive() {
        let s = scorer();
        let w = s.weights(&ceo_fraud()).unwrap();
        assert!((w.character_weight(ContextKind::Urgency, true) - 1.2).abs() < 1e-6);
        let negative = VulnerabilityWeights::neutral().with_baseline(ContextKind::Urgency, -3.0);
        assert_eq!(negative.character_weight(ContextKind::Urgency, true), 0.0);
    }

    #[test]
    fn test_recovery_rate_scales_positive_only() {
        let s = scorer();
        let w = s.weights(&ceo_fraud()).unwrap();
        assert!((w.character_weight(ContextKind::Neutral, false) - 0.5).abs() < 1e-6);
        assert!((w.character_weight(ContextKind::Neutral, true) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_same_action_hurts_more_at_lower_scores() {
        let s = TrustScorer::new();
        let actor = ActorId::default();
        let high = s.score(&actor, ActionKind::DiscloseSensitiveInfo, ContextKind::Neutral, 80.0);
        let low = s.score(&actor, ActionKind::DiscloseSensitiveInfo, ContextKind::Neutral, -80.0);
        assert!(low < high, "low={low} high={high}");
    }

    #[test]
    fn test_non_finite_current_scores_from_zero() {
        let s = TrustScorer::new();
        let actor = ActorId::default();
        let from_nan = s.score(&actor, ActionKind::IgnoreWarning, ContextKind::Neutral, f32::NAN);
        let from_zero = s.score(&actor, ActionKind::IgnoreWarning, ContextKind::Neutral, 0.0);
        assert_eq!(from_nan, from_zero);
    }

    #[test]
    fn test_risky_actions_are_negative() {
        for action in ActionKind::ALL {
            if action.is_risky() {
                assert!(action.base_impact() < 0.0);
            }
        }
        assert!(ActionKind::VerifyIdentity.base_impact() > 0.0);
        assert!(ActionKind::SeekHelp.base_impact() > 0.0);
    }
}
