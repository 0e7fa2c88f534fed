//! Restart policies.
//!
//! Three policies are supported. The static policy restarts at conflict
//! counts following the Luby sequence scaled by a configured base. The
//! dynamic policy tracks the glue of recent learnt clauses with a short-term
//! exponential moving average and restarts when it overtakes the long-run
//! average by a configured margin, on the theory that a burst of high glue
//! clauses means the current search region is unproductive. The auto policy
//! behaves statically while sampling glue statistics and then commits to one
//! of the two based on the observed glue variance.
use crate::config::RestartMode;

/// Smoothing factor of the short-term glue average.
const SHORT_TERM_ALPHA: f64 = 1.0 / 50.0;

/// Conflicts that must pass after a restart before the dynamic policy can
/// fire again.
const DYNAMIC_COOLDOWN: u64 = 50;

/// Restart policy state.
pub struct RestartPolicy {
    /// The policy in effect; `Auto` while still sampling.
    committed: RestartMode,
    /// State of the reluctant doubling recurrence driving the static spans.
    doubling_phase: u64,
    doubling_span: u64,
    /// Conflict count of the next static restart.
    next_restart: u64,
    /// Short-term exponential moving average of learnt clause glue.
    glue_short: f64,
    /// Long-run glue statistics, also used for the auto commitment.
    glue_sum: f64,
    glue_sq_sum: f64,
    glue_count: u64,
    /// Conflict count at the most recent restart.
    last_restart: u64,
}

impl Default for RestartPolicy {
    fn default() -> RestartPolicy {
        RestartPolicy {
            committed: RestartMode::Auto,
            doubling_phase: 1,
            doubling_span: 1,
            next_restart: 0,
            glue_short: 0.0,
            glue_sum: 0.0,
            glue_sq_sum: 0.0,
            glue_count: 0,
            last_restart: 0,
        }
    }
}

impl RestartPolicy {
    /// Reset the policy state for a fresh search.
    pub fn init(&mut self, mode: RestartMode, scale: u64) {
        *self = RestartPolicy::default();
        self.committed = mode;
        self.next_restart = scale * self.next_span();
    }

    /// The next span of the Luby restart sequence, in restarts.
    ///
    /// Uses the reluctant doubling recurrence: the span restarts from 1
    /// whenever it catches up with the lowest set bit of the phase counter
    /// and doubles otherwise.
    fn next_span(&mut self) -> u64 {
        let span = self.doubling_span;

        if self.doubling_phase & self.doubling_phase.wrapping_neg() == self.doubling_span {
            self.doubling_phase += 1;
            self.doubling_span = 1;
        } else {
            self.doubling_span <<= 1;
        }

        span
    }

    /// Record the glue of a freshly learnt clause.
    ///
    /// While the configured mode is `auto` this also commits to a concrete
    /// policy once enough conflicts were sampled: glue with a variance above
    /// its mean marks an erratic search that benefits from glue driven
    /// restarts, a steady glue stream works better with the Luby cadence.
    pub fn on_conflict(&mut self, glue: usize, sample_conflicts: u64) {
        let glue = glue as f64;

        self.glue_sum += glue;
        self.glue_sq_sum += glue * glue;
        self.glue_count += 1;

        if self.glue_count == 1 {
            self.glue_short = glue;
        } else {
            self.glue_short += SHORT_TERM_ALPHA * (glue - self.glue_short);
        }

        if self.committed == RestartMode::Auto && self.glue_count >= sample_conflicts {
            let mean = self.glue_sum / self.glue_count as f64;
            let variance = self.glue_sq_sum / self.glue_count as f64 - mean * mean;
            self.committed = if variance > mean {
                RestartMode::Dynamic
            } else {
                RestartMode::Static
            };
        }
    }

    /// Whether a restart is due at the given conflict count.
    pub fn should_restart(&self, conflicts: u64, margin: f64) -> bool {
        match self.committed {
            // Sampling phase of auto mode follows the static cadence.
            RestartMode::Static | RestartMode::Auto => conflicts >= self.next_restart,
            RestartMode::Dynamic => {
                self.glue_count >= DYNAMIC_COOLDOWN
                    && conflicts - self.last_restart >= DYNAMIC_COOLDOWN
                    && self.glue_short > margin * (self.glue_sum / self.glue_count as f64)
            }
        }
    }

    /// Advance the policy state after a restart was performed.
    pub fn on_restart(&mut self, conflicts: u64, scale: u64) {
        self.last_restart = conflicts;
        self.next_restart = conflicts + scale * self.next_span();
        if self.glue_count > 0 {
            // Cool the short-term average down to the long-run one.
            self.glue_short = self.glue_sum / self.glue_count as f64;
        }
    }

    /// The policy currently in effect.
    pub fn committed_mode(&self) -> RestartMode {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_spans_follow_the_luby_sequence() {
        let mut policy = RestartPolicy::default();
        policy.init(RestartMode::Static, 1);

        let mut conflicts = 0;
        let mut spans = vec![];
        for _ in 0..15 {
            spans.push(policy.next_restart - conflicts);
            conflicts = policy.next_restart;
            policy.on_restart(conflicts, 1);
        }

        assert_eq!(spans, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[test]
    fn static_policy_scales_spans() {
        let mut policy = RestartPolicy::default();
        policy.init(RestartMode::Static, 100);

        assert!(!policy.should_restart(99, 1.25));
        assert!(policy.should_restart(100, 1.25));

        policy.on_restart(100, 100);
        // The second Luby element is 1 again.
        assert!(policy.should_restart(200, 1.25));
        policy.on_restart(200, 100);
        // Then 2.
        assert!(!policy.should_restart(399, 1.25));
        assert!(policy.should_restart(400, 1.25));
    }

    #[test]
    fn dynamic_policy_fires_on_glue_spikes() {
        let mut policy = RestartPolicy::default();
        policy.init(RestartMode::Dynamic, 100);

        for _ in 0..200 {
            policy.on_conflict(3, 4096);
        }
        assert!(!policy.should_restart(200, 1.25));

        for _ in 0..100 {
            policy.on_conflict(30, 4096);
        }
        assert!(policy.should_restart(300, 1.25));
    }

    #[test]
    fn auto_commits_after_sampling() {
        let mut policy = RestartPolicy::default();
        policy.init(RestartMode::Auto, 100);

        for _ in 0..16 {
            policy.on_conflict(4, 16);
        }

        // Constant glue has zero variance.
        assert_eq!(policy.committed_mode(), RestartMode::Static);
    }
}
