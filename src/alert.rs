//! Alert presentation.
//!
//! Each alert kind runs its own two-state machine:
//!
//! `Inactive -> Active` when the tracker condition holds and the kind is inactive;
//! `Active -> Inactive` when its deactivation deadline passes, regardless of the
//! signal at that time.
//!
//! Activation speaks the kind's message (unless speech is busy), shows the
//! indicator and arms a deadline `visible_for` in the future. Deadlines are plain
//! values owned by the presenter, so teardown can account for every pending one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::anyhow;

use crate::speech::{SpeechSink, Utterance};

/// How long an alert stays active after firing.
pub const ALERT_VISIBLE_FOR: Duration = Duration::from_millis(2000);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Drowsy,
    Absence,
    Attention,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [AlertKind::Drowsy, AlertKind::Absence, AlertKind::Attention];

    pub(crate) fn slot(self) -> usize {
        match self {
            AlertKind::Drowsy => 0,
            AlertKind::Absence => 1,
            AlertKind::Attention => 2,
        }
    }

    /// Spoken message.
    pub fn message(self) -> &'static str {
        match self {
            AlertKind::Drowsy => "졸음이 감지되었습니다.",
            AlertKind::Absence => "자리를 비우셨나요?",
            AlertKind::Attention => "화면에 집중해주세요.",
        }
    }

    /// On-screen indicator text.
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Drowsy => "졸음 감지!",
            AlertKind::Absence => "자리를 비우셨나요?",
            AlertKind::Attention => "집중하세요!",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Drowsy => "drowsy",
            AlertKind::Absence => "absence",
            AlertKind::Attention => "attention",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when a condition is detected again while its alert is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerPolicy {
    /// Keep the first deadline.
    #[default]
    Ignore,
    /// Push the deadline out by a full window; nothing is spoken again.
    ExtendWindow,
}

impl FromStr for RetriggerPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(RetriggerPolicy::Ignore),
            "extend" | "extend_window" | "extend-window" => Ok(RetriggerPolicy::ExtendWindow),
            other => Err(anyhow!("unknown retrigger policy '{}'", other)),
        }
    }
}

/// On-screen indicator surface keyed by alert kind.
pub trait AlertDisplay: Send {
    fn show(&mut self, kind: AlertKind, label: &str);
    fn clear(&mut self, kind: AlertKind);
}

#[derive(Default)]
pub struct NullDisplay;

impl AlertDisplay for NullDisplay {
    fn show(&mut self, _kind: AlertKind, _label: &str) {}
    fn clear(&mut self, _kind: AlertKind) {}
}

/// Result of asking the presenter to raise an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Raise {
    /// Newly activated.
    Fired,
    /// Already active; deadline pushed out.
    Extended,
    /// Already active; nothing changed.
    Suppressed,
}

pub struct AlertPresenter {
    speech: Box<dyn SpeechSink>,
    display: Box<dyn AlertDisplay>,
    policy: RetriggerPolicy,
    visible_for: Duration,
    deadlines: [Option<Instant>; 3],
    fired: u64,
}

impl AlertPresenter {
    pub fn new(speech: Box<dyn SpeechSink>, display: Box<dyn AlertDisplay>) -> Self {
        Self {
            speech,
            display,
            policy: RetriggerPolicy::default(),
            visible_for: ALERT_VISIBLE_FOR,
            deadlines: [None; 3],
            fired: 0,
        }
    }

    pub fn with_policy(mut self, policy: RetriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_visible_for(mut self, visible_for: Duration) -> Self {
        self.visible_for = visible_for;
        self
    }

    pub fn policy(&self) -> RetriggerPolicy {
        self.policy
    }

    pub fn is_active(&self, kind: AlertKind) -> bool {
        self.deadlines[kind.slot()].is_some()
    }

    pub fn active_kinds(&self) -> Vec<AlertKind> {
        AlertKind::ALL
            .into_iter()
            .filter(|kind| self.is_active(*kind))
            .collect()
    }

    /// Deadline of an active alert.
    pub fn deadline(&self, kind: AlertKind) -> Option<Instant> {
        self.deadlines[kind.slot()]
    }

    /// Number of armed deactivation deadlines.
    pub fn pending_timers(&self) -> usize {
        self.deadlines.iter().filter(|d| d.is_some()).count()
    }

    /// Total alerts fired over the presenter's lifetime.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    pub fn raise(&mut self, kind: AlertKind, now: Instant) -> Raise {
        let deadline = &mut self.deadlines[kind.slot()];
        if deadline.is_some() {
            return match self.policy {
                RetriggerPolicy::Ignore => Raise::Suppressed,
                RetriggerPolicy::ExtendWindow => {
                    *deadline = Some(now + self.visible_for);
                    Raise::Extended
                }
            };
        }

        *deadline = Some(now + self.visible_for);
        self.fired += 1;
        log::info!("alert fired: {}", kind);
        self.speak(kind);
        self.display.show(kind, kind.label());
        Raise::Fired
    }

    fn speak(&mut self, kind: AlertKind) {
        if self.speech.is_speaking() {
            log::debug!("speech busy, skipping {} message", kind);
            return;
        }
        if let Err(e) = self.speech.speak(&Utterance::new(kind.message())) {
            log::warn!("speech failed for {} alert: {:#}", kind, e);
        }
    }

    /// Deactivate every alert whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<AlertKind> {
        let mut cleared = Vec::new();
        for kind in AlertKind::ALL {
            let slot = &mut self.deadlines[kind.slot()];
            if slot.is_some_and(|deadline| deadline <= now) {
                *slot = None;
                self.display.clear(kind);
                log::debug!("alert cleared: {}", kind);
                cleared.push(kind);
            }
        }
        cleared
    }

    /// Cancel speech, disarm every deadline and clear all indicators.
    pub fn teardown(&mut self) {
        self.speech.cancel();
        for kind in AlertKind::ALL {
            if self.deadlines[kind.slot()].take().is_some() {
                self.display.clear(kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::MemorySpeech;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingDisplay {
        events: Arc<Mutex<Vec<(AlertKind, bool)>>>,
    }

    impl AlertDisplay for RecordingDisplay {
        fn show(&mut self, kind: AlertKind, _label: &str) {
            self.events.lock().unwrap().push((kind, true));
        }

        fn clear(&mut self, kind: AlertKind) {
            self.events.lock().unwrap().push((kind, false));
        }
    }

    fn presenter(speech: &MemorySpeech) -> AlertPresenter {
        AlertPresenter::new(Box::new(speech.clone()), Box::new(NullDisplay))
    }

    #[test]
    fn fires_once_until_deadline() {
        let speech = MemorySpeech::new();
        let mut presenter = presenter(&speech);
        let t0 = Instant::now();

        assert_eq!(presenter.raise(AlertKind::Drowsy, t0), Raise::Fired);
        assert_eq!(
            presenter.raise(AlertKind::Drowsy, t0 + Duration::from_millis(500)),
            Raise::Suppressed
        );
        assert_eq!(presenter.deadline(AlertKind::Drowsy), Some(t0 + ALERT_VISIBLE_FOR));
        assert_eq!(speech.spoken().len(), 1);
        assert_eq!(speech.spoken()[0].text, "졸음이 감지되었습니다.");
        assert_eq!(speech.spoken()[0].lang, "ko-KR");

        assert!(presenter.expire(t0 + Duration::from_millis(1999)).is_empty());
        assert_eq!(presenter.expire(t0 + ALERT_VISIBLE_FOR), vec![AlertKind::Drowsy]);
        assert!(!presenter.is_active(AlertKind::Drowsy));

        assert_eq!(presenter.raise(AlertKind::Drowsy, t0 + ALERT_VISIBLE_FOR), Raise::Fired);
        assert_eq!(presenter.fired_count(), 2);
    }

    #[test]
    fn extend_policy_moves_deadline_without_speaking() {
        let speech = MemorySpeech::new();
        let mut presenter = presenter(&speech).with_policy(RetriggerPolicy::ExtendWindow);
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(1500);

        presenter.raise(AlertKind::Attention, t0);
        assert_eq!(presenter.raise(AlertKind::Attention, later), Raise::Extended);
        assert_eq!(presenter.deadline(AlertKind::Attention), Some(later + ALERT_VISIBLE_FOR));
        assert!(presenter.expire(t0 + ALERT_VISIBLE_FOR).is_empty());
        assert_eq!(speech.spoken().len(), 1);
    }

    #[test]
    fn busy_speech_skips_message_but_still_activates() {
        let speech = MemorySpeech::new();
        speech.set_speaking(true);
        let mut presenter = presenter(&speech);

        assert_eq!(presenter.raise(AlertKind::Absence, Instant::now()), Raise::Fired);
        assert!(presenter.is_active(AlertKind::Absence));
        assert!(speech.spoken().is_empty());
    }

    #[test]
    fn kinds_are_independent() {
        let speech = MemorySpeech::new();
        let mut presenter = presenter(&speech);
        let t0 = Instant::now();

        presenter.raise(AlertKind::Drowsy, t0);
        presenter.raise(AlertKind::Absence, t0 + Duration::from_millis(1000));
        assert_eq!(presenter.pending_timers(), 2);

        let cleared = presenter.expire(t0 + Duration::from_millis(2500));
        assert_eq!(cleared, vec![AlertKind::Drowsy]);
        assert_eq!(presenter.active_kinds(), vec![AlertKind::Absence]);
    }

    #[test]
    fn teardown_clears_timers_indicators_and_speech() {
        let speech = MemorySpeech::new();
        let display = RecordingDisplay::default();
        let mut presenter =
            AlertPresenter::new(Box::new(speech.clone()), Box::new(display.clone()));
        let t0 = Instant::now();

        presenter.raise(AlertKind::Drowsy, t0);
        presenter.raise(AlertKind::Attention, t0);
        presenter.teardown();

        assert_eq!(presenter.pending_timers(), 0);
        assert_eq!(speech.cancel_count(), 1);
        let events = display.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (AlertKind::Drowsy, true),
                (AlertKind::Attention, true),
                (AlertKind::Drowsy, false),
                (AlertKind::Attention, false),
            ]
        );
    }

    #[test]
    fn parses_retrigger_policy() {
        assert_eq!("ignore".parse::<RetriggerPolicy>().unwrap(), RetriggerPolicy::Ignore);
        assert_eq!(
            "Extend-Window".parse::<RetriggerPolicy>().unwrap(),
            RetriggerPolicy::ExtendWindow
        );
        assert!("renew".parse::<RetriggerPolicy>().is_err());
    }
}
