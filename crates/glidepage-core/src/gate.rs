//! Visibility-gated reveal sequences
//!
//! One [`AnimationGateSequencer`] per section. Entering view arms the stage
//! queue and plays stages one at a time, each waiting for its predecessor's
//! completion signal. Leaving view resets everything to pending so the next
//! entry replays from the first stage.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::debug;

use crate::config::{GateConfig, StageCompletion, StageConfig};
use crate::scroll::easing::EasingTypeExt;
use crate::scroll::timing::delayed_progress;
use crate::sections::SectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StagePhase {
    #[default]
    Pending,
    Playing,
    Complete,
}

/// Coarse state of a whole sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    Idle,
    Stage { index: usize, phase: StagePhase },
    AllComplete,
}

/// Side effects the owner must carry out after a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateEffect {
    /// A stage began playing; timeout stages report when they finish
    StageStarted {
        stage: usize,
        epoch: u64,
        completes_at: Option<f64>,
    },
    /// Every stage went back to pending; pending completions are stale
    Reset { epoch: u64 },
    AllComplete,
}

#[derive(Debug, Clone)]
pub struct AnimationGateSequencer {
    section: SectionId,
    stages: Vec<StageConfig>,
    phases: Vec<StagePhase>,
    started_at: Vec<Option<f64>>,
    queue: VecDeque<usize>,
    in_view: bool,
    epoch: u64,
}

impl AnimationGateSequencer {
    pub fn new(config: &GateConfig) -> Self {
        let count = config.stages.len();
        Self {
            section: config.section,
            stages: config.stages.clone(),
            phases: vec![StagePhase::Pending; count],
            started_at: vec![None; count],
            queue: VecDeque::new(),
            in_view: false,
            epoch: 0,
        }
    }

    pub fn section(&self) -> SectionId {
        self.section
    }

    pub fn stages(&self) -> &[StageConfig] {
        &self.stages
    }

    pub fn stage_phase(&self, stage: usize) -> Option<StagePhase> {
        self.phases.get(stage).copied()
    }

    pub fn phases(&self) -> &[StagePhase] {
        &self.phases
    }

    #[inline]
    pub fn is_in_view(&self) -> bool {
        self.in_view
    }

    /// Bumped on every reset; completions carry the epoch they belong to
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn all_complete(&self) -> bool {
        !self.phases.is_empty() && self.phases.iter().all(|p| *p == StagePhase::Complete)
    }

    pub fn playing(&self) -> Option<usize> {
        self.phases.iter().position(|p| *p == StagePhase::Playing)
    }

    pub fn phase(&self) -> GatePhase {
        if self.all_complete() {
            return GatePhase::AllComplete;
        }
        if !self.in_view {
            return GatePhase::Idle;
        }
        match self.phases.iter().position(|p| *p != StagePhase::Complete) {
            Some(index) => GatePhase::Stage {
                index,
                phase: self.phases[index],
            },
            None => GatePhase::Idle,
        }
    }

    /// Feed the section's in-view signal
    pub fn on_visibility_change(&mut self, in_view: bool, now: f64) -> Vec<GateEffect> {
        if in_view == self.in_view {
            return Vec::new();
        }
        self.in_view = in_view;

        if !in_view {
            self.reset();
            debug!(section = %self.section, epoch = self.epoch, "Gate reset");
            return vec![GateEffect::Reset { epoch: self.epoch }];
        }

        self.queue = (0..self.stages.len())
            .filter(|i| self.phases[*i] != StagePhase::Complete)
            .collect();
        debug!(section = %self.section, queued = self.queue.len(), "Gate armed");
        self.start_next(now)
    }

    /// Completion signal for `stage`, tagged with the epoch it started in
    ///
    /// Signals from before the last reset, for a stage that is not playing,
    /// or while out of view are ignored.
    pub fn on_stage_complete(&mut self, stage: usize, epoch: u64, now: f64) -> Vec<GateEffect> {
        if epoch != self.epoch || !self.in_view {
            debug!(section = %self.section, stage, epoch, current = self.epoch, "Ignoring stale stage completion");
            return Vec::new();
        }
        if self.phases.get(stage) != Some(&StagePhase::Playing) {
            debug!(section = %self.section, stage, "Completion for a stage that is not playing");
            return Vec::new();
        }

        self.phases[stage] = StagePhase::Complete;
        debug!(section = %self.section, stage, name = %self.stages[stage].name, "Stage complete");
        self.start_next(now)
    }

    fn start_next(&mut self, now: f64) -> Vec<GateEffect> {
        let Some(stage) = self.queue.pop_front() else {
            return if self.all_complete() {
                debug!(section = %self.section, "All stages complete");
                vec![GateEffect::AllComplete]
            } else {
                Vec::new()
            };
        };

        self.phases[stage] = StagePhase::Playing;
        self.started_at[stage] = Some(now);
        let config = &self.stages[stage];
        let completes_at = match config.completion {
            StageCompletion::Timeout => Some(now + (config.delay_ms + config.duration_ms) as f64),
            StageCompletion::Notified => None,
        };
        debug!(section = %self.section, stage, name = %config.name, "Stage playing");
        vec![GateEffect::StageStarted {
            stage,
            epoch: self.epoch,
            completes_at,
        }]
    }

    /// Send every stage back to its pre-animation state
    pub fn reset(&mut self) {
        self.phases.fill(StagePhase::Pending);
        self.started_at.fill(None);
        self.queue.clear();
        self.epoch += 1;
    }

    /// Eased visual value of a stage at `now`: 0 before it plays, 1 once done
    pub fn stage_progress(&self, stage: usize, now: f64) -> f64 {
        match (self.phases.get(stage), self.started_at.get(stage)) {
            (Some(StagePhase::Complete), _) => 1.0,
            (Some(StagePhase::Playing), Some(Some(started))) => {
                let config = &self.stages[stage];
                let t = delayed_progress(
                    now - started,
                    config.delay_ms as f64,
                    config.duration_ms as f64,
                );
                config.easing.apply(t)
            }
            _ => 0.0,
        }
    }

    /// Milliseconds a playing stage has been running, if any
    pub fn stage_elapsed(&self, stage: usize, now: f64) -> Option<f64> {
        match self.phases.get(stage) {
            Some(StagePhase::Playing) => self
                .started_at
                .get(stage)
                .copied()
                .flatten()
                .map(|started| (now - started).max(0.0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EasingType;

    fn gate(completion_notified: bool) -> AnimationGateSequencer {
        let stage = |name: &str, duration| {
            let s = StageConfig::new(name, duration, 0, EasingType::Linear);
            if completion_notified {
                s.notified()
            } else {
                s
            }
        };
        AnimationGateSequencer::new(&GateConfig {
            section: SectionId::Spark,
            threshold: 0.3,
            margin_px: 0.0,
            stages: vec![stage("bottom", 600), stage("text", 800), stage("fire", 400)],
        })
    }

    fn started(effects: &[GateEffect]) -> Option<(usize, u64)> {
        effects.iter().find_map(|e| match e {
            GateEffect::StageStarted { stage, epoch, .. } => Some((*stage, *epoch)),
            _ => None,
        })
    }

    #[test]
    fn test_starts_idle() {
        let gate = gate(true);
        assert_eq!(gate.phase(), GatePhase::Idle);
        assert!(gate.phases().iter().all(|p| *p == StagePhase::Pending));
    }

    #[test]
    fn test_stages_play_in_order() {
        let mut gate = gate(true);
        let effects = gate.on_visibility_change(true, 0.0);
        let (stage, epoch) = started(&effects).unwrap();
        assert_eq!(stage, 0);
        assert_eq!(
            gate.phase(),
            GatePhase::Stage {
                index: 0,
                phase: StagePhase::Playing
            }
        );
        assert_eq!(gate.stage_phase(1), Some(StagePhase::Pending));

        let effects = gate.on_stage_complete(0, epoch, 600.0);
        assert_eq!(started(&effects), Some((1, epoch)));
        let effects = gate.on_stage_complete(1, epoch, 1400.0);
        assert_eq!(started(&effects), Some((2, epoch)));
        let effects = gate.on_stage_complete(2, epoch, 1800.0);
        assert_eq!(effects, vec![GateEffect::AllComplete]);
        assert_eq!(gate.phase(), GatePhase::AllComplete);
    }

    #[test]
    fn test_timeout_stages_report_completion_time() {
        let mut gate = AnimationGateSequencer::new(&GateConfig {
            section: SectionId::Main,
            threshold: 0.0,
            margin_px: 100.0,
            stages: vec![StageConfig::new("intro", 1400, 300, EasingType::Linear)],
        });
        let effects = gate.on_visibility_change(true, 50.0);
        match effects.as_slice() {
            [GateEffect::StageStarted { completes_at, .. }] => {
                assert_eq!(*completes_at, Some(1750.0));
            }
            other => panic!("unexpected effects: {:?}", other),
        }
    }

    #[test]
    fn test_leaving_view_resets_everything() {
        let mut gate = gate(true);
        let (_, epoch) = started(&gate.on_visibility_change(true, 0.0)).unwrap();
        gate.on_stage_complete(0, epoch, 600.0);

        let effects = gate.on_visibility_change(false, 700.0);
        assert_eq!(effects, vec![GateEffect::Reset { epoch: epoch + 1 }]);
        assert_eq!(gate.phase(), GatePhase::Idle);
        assert!(!gate.all_complete());
        assert!(gate.phases().iter().all(|p| *p == StagePhase::Pending));
    }

    #[test]
    fn test_reentry_replays_from_first_stage() {
        let mut gate = gate(true);
        gate.on_visibility_change(true, 0.0);
        gate.on_visibility_change(false, 20.0);
        let effects = gate.on_visibility_change(true, 40.0);
        assert_eq!(started(&effects), Some((0, 1)));
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let mut gate = gate(true);
        let (_, old_epoch) = started(&gate.on_visibility_change(true, 0.0)).unwrap();
        gate.on_visibility_change(false, 10.0);
        gate.on_visibility_change(true, 20.0);

        assert!(gate.on_stage_complete(0, old_epoch, 600.0).is_empty());
        assert_eq!(gate.stage_phase(0), Some(StagePhase::Playing));
        assert_eq!(gate.stage_phase(1), Some(StagePhase::Pending));
    }

    #[test]
    fn test_completion_for_wrong_stage_is_ignored() {
        let mut gate = gate(true);
        let (_, epoch) = started(&gate.on_visibility_change(true, 0.0)).unwrap();
        assert!(gate.on_stage_complete(2, epoch, 100.0).is_empty());
        assert!(gate.on_stage_complete(9, epoch, 100.0).is_empty());
        assert_eq!(gate.playing(), Some(0));
    }

    #[test]
    fn test_never_two_stages_playing() {
        let mut gate = gate(true);
        // deterministic pseudo-random interleaving of toggles and completions
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut now = 0.0;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            now += 5.0;
            match seed % 4 {
                0 => {
                    let was_visible = gate.is_in_view();
                    gate.on_visibility_change(!was_visible, now);
                    if was_visible {
                        assert!(!gate.all_complete());
                        assert!(gate.phases().iter().all(|p| *p == StagePhase::Pending));
                    }
                }
                _ => {
                    let stage = (seed >> 8) as usize % 3;
                    let epoch = gate.epoch().saturating_sub((seed >> 16) % 2);
                    gate.on_stage_complete(stage, epoch, now);
                }
            }
            let playing = gate
                .phases()
                .iter()
                .filter(|p| **p == StagePhase::Playing)
                .count();
            assert!(playing <= 1, "two stages playing: {:?}", gate.phases());
            if let Some(index) = gate.playing() {
                assert!(gate.phases()[..index]
                    .iter()
                    .all(|p| *p == StagePhase::Complete));
            }
        }
    }

    #[test]
    fn test_stage_progress() {
        let mut gate = AnimationGateSequencer::new(&GateConfig {
            section: SectionId::Footer,
            threshold: 0.0,
            margin_px: 50.0,
            stages: vec![
                StageConfig::new("hugs", 1000, 200, EasingType::Linear),
                StageConfig::new("button", 1000, 0, EasingType::Linear),
            ],
        });
        assert_eq!(gate.stage_progress(0, 0.0), 0.0);

        gate.on_visibility_change(true, 0.0);
        assert_eq!(gate.stage_progress(0, 100.0), 0.0);
        assert!((gate.stage_progress(0, 700.0) - 0.5).abs() < 1e-9);
        assert_eq!(gate.stage_progress(1, 700.0), 0.0);
        assert_eq!(gate.stage_elapsed(0, 700.0), Some(700.0));

        let epoch = gate.epoch();
        gate.on_stage_complete(0, epoch, 1200.0);
        assert_eq!(gate.stage_progress(0, 1300.0), 1.0);
        assert!((gate.stage_progress(1, 1450.0) - 0.25).abs() < 1e-9);
    }
}
