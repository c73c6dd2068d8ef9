//! One-shot timers on the frame clock
//!
//! Timers never fire on their own: the page drains due timers once per
//! frame. Everything still queued is dropped on teardown.

use crate::sections::SectionId;

/// Insertion sequence; breaks ties between timers due at the same time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Recalculate the pin/trigger subsystem once layout has settled
    RefreshTriggers,
    /// A timeout-completed stage has run its delay and duration
    StageTimeout {
        section: SectionId,
        stage: usize,
        epoch: u64,
    },
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due_at: f64,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_at: f64, kind: TimerKind) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, due_at, kind });
    }

    /// Cancel every stage timer belonging to `section`
    pub fn cancel_section(&mut self, section: SectionId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| {
            !matches!(t.kind, TimerKind::StageTimeout { section: s, .. } if s == section)
        });
        before - self.timers.len()
    }

    /// Remove and return timers due at `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<TimerKind> {
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|t| {
            if t.due_at <= now {
                due.push(t.clone());
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due_at.total_cmp(&b.due_at).then(a.id.cmp(&b.id)));
        due.into_iter().map(|t| t.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_due_order() {
        let mut timers = TimerQueue::new();
        let stage = |stage| TimerKind::StageTimeout {
            section: SectionId::Spark,
            stage,
            epoch: 1,
        };
        timers.schedule(300.0, stage(2));
        timers.schedule(100.0, TimerKind::RefreshTriggers);
        timers.schedule(200.0, stage(1));
        timers.schedule(900.0, stage(3));

        assert!(timers.drain_due(50.0).is_empty());
        let fired = timers.drain_due(300.0);
        assert_eq!(fired, vec![TimerKind::RefreshTriggers, stage(1), stage(2)]);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_same_due_time_fires_in_schedule_order() {
        let mut timers = TimerQueue::new();
        let stage = |stage| TimerKind::StageTimeout {
            section: SectionId::Main,
            stage,
            epoch: 0,
        };
        timers.schedule(100.0, stage(1));
        timers.schedule(100.0, TimerKind::RefreshTriggers);
        assert_eq!(
            timers.drain_due(100.0),
            vec![stage(1), TimerKind::RefreshTriggers]
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancel_section_leaves_others() {
        let mut timers = TimerQueue::new();
        for section in [SectionId::Spark, SectionId::Footer, SectionId::Spark] {
            timers.schedule(
                10.0,
                TimerKind::StageTimeout {
                    section,
                    stage: 0,
                    epoch: 0,
                },
            );
        }
        timers.schedule(10.0, TimerKind::RefreshTriggers);
        assert_eq!(timers.cancel_section(SectionId::Spark), 2);
        assert_eq!(timers.len(), 2);
    }
}
