//! Per-question navigation and answer state for one test attempt.
//!
//! A [`Session`] is an indexed arena of [`SessionSlot`]s plus a current-slot
//! pointer. Every transition is a plain method call, so the state machine can
//! be driven and inspected without any UI or runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::Answer;

/// Navigation/answer status of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    NotVisited,
    NotAnswered,
    Answered,
    MarkedForReview,
    AnsweredAndMarked,
}

impl SlotStatus {
    /// Status implied by (has answer, review flag).
    pub fn from_flags(has_answer: bool, marked: bool) -> Self {
        match (has_answer, marked) {
            (false, false) => SlotStatus::NotAnswered,
            (false, true) => SlotStatus::MarkedForReview,
            (true, false) => SlotStatus::Answered,
            (true, true) => SlotStatus::AnsweredAndMarked,
        }
    }

    /// Slots in these states are evaluated at submission.
    pub fn is_answered(&self) -> bool {
        matches!(self, SlotStatus::Answered | SlotStatus::AnsweredAndMarked)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::NotVisited => write!(f, "not visited"),
            SlotStatus::NotAnswered => write!(f, "not answered"),
            SlotStatus::Answered => write!(f, "answered"),
            SlotStatus::MarkedForReview => write!(f, "marked for review"),
            SlotStatus::AnsweredAndMarked => write!(f, "answered & marked"),
        }
    }
}

/// Live state of one question during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSlot {
    pub index: usize,
    pub question_id: String,
    #[serde(default)]
    pub section_id: Option<String>,
    pub status: SlotStatus,
    pub answer: Option<Answer>,
    pub marked_for_review: bool,
}

impl SessionSlot {
    fn recompute_status(&mut self) {
        self.status = SlotStatus::from_flags(self.answer.is_some(), self.marked_for_review);
    }
}

/// How many slots are in each status. Always sums to the slot count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_visited: usize,
    pub not_answered: usize,
    pub answered: usize,
    pub marked_for_review: usize,
    pub answered_and_marked: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.not_visited
            + self.not_answered
            + self.answered
            + self.marked_for_review
            + self.answered_and_marked
    }
}

/// One entry of the navigable question palette.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub index: usize,
    pub question_id: String,
    pub section_id: Option<String>,
    pub status: SlotStatus,
    pub is_current: bool,
}

/// The slot arena and current-slot pointer of one attempt.
///
/// Always holds at least one slot and a current pointer inside it; snapshots
/// are checked on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawSession")]
pub struct Session {
    slots: Vec<SessionSlot>,
    current: usize,
}

#[derive(Deserialize)]
struct RawSession {
    slots: Vec<SessionSlot>,
    current: usize,
}

impl TryFrom<RawSession> for Session {
    type Error = String;

    fn try_from(raw: RawSession) -> Result<Self, Self::Error> {
        if raw.slots.is_empty() {
            return Err("session has no slots".into());
        }
        if raw.current >= raw.slots.len() {
            return Err(format!(
                "current slot {} out of range ({} slots)",
                raw.current,
                raw.slots.len()
            ));
        }
        Ok(Self {
            slots: raw.slots,
            current: raw.current,
        })
    }
}

impl Session {
    /// Create a session from `(question_id, section_id)` pairs in slot order.
    ///
    /// The first slot starts `NotAnswered` (it is shown immediately); the rest
    /// start `NotVisited`.
    pub fn new<I>(test_id: &str, questions: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut slots: Vec<SessionSlot> = questions
            .into_iter()
            .enumerate()
            .map(|(index, (question_id, section_id))| SessionSlot {
                index,
                question_id,
                section_id,
                status: SlotStatus::NotVisited,
                answer: None,
                marked_for_review: false,
            })
            .collect();

        let Some(first) = slots.first_mut() else {
            return Err(SessionError::NoQuestions(test_id.to_string()));
        };
        first.status = SlotStatus::NotAnswered;

        Ok(Self { slots, current: 0 })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SessionSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Result<&SessionSlot, SessionError> {
        let len = self.slots.len();
        self.slots
            .get(index)
            .ok_or(SessionError::SlotOutOfRange { index, len })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut SessionSlot, SessionError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(SessionError::SlotOutOfRange { index, len })
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &SessionSlot {
        &self.slots[self.current]
    }

    /// First landing on a slot moves it out of `NotVisited`.
    pub fn visit(&mut self, index: usize) -> Result<(), SessionError> {
        let slot = self.slot_mut(index)?;
        if slot.status == SlotStatus::NotVisited {
            slot.status = SlotStatus::NotAnswered;
        }
        Ok(())
    }

    /// Move the current-slot pointer to `index` and visit it.
    pub fn navigate(&mut self, index: usize) -> Result<(), SessionError> {
        self.visit(index)?;
        self.current = index;
        Ok(())
    }

    /// Navigate forward one slot; stays put on the last slot.
    pub fn next(&mut self) -> usize {
        let target = (self.current + 1).min(self.slots.len() - 1);
        // in range by construction
        let _ = self.navigate(target);
        self.current
    }

    /// Navigate back one slot; stays put on the first slot.
    pub fn previous(&mut self) -> usize {
        let target = self.current.saturating_sub(1);
        let _ = self.navigate(target);
        self.current
    }

    /// Store an answer. A blank answer clears the slot instead.
    pub fn capture_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        if answer.is_blank() {
            return self.clear_answer(index);
        }
        let slot = self.slot_mut(index)?;
        slot.answer = Some(answer);
        slot.recompute_status();
        Ok(())
    }

    pub fn clear_answer(&mut self, index: usize) -> Result<(), SessionError> {
        let slot = self.slot_mut(index)?;
        slot.answer = None;
        slot.recompute_status();
        Ok(())
    }

    /// Flip the review flag. Returns the new flag value.
    pub fn toggle_review(&mut self, index: usize) -> Result<bool, SessionError> {
        let slot = self.slot_mut(index)?;
        slot.marked_for_review = !slot.marked_for_review;
        slot.recompute_status();
        Ok(slot.marked_for_review)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for slot in &self.slots {
            match slot.status {
                SlotStatus::NotVisited => counts.not_visited += 1,
                SlotStatus::NotAnswered => counts.not_answered += 1,
                SlotStatus::Answered => counts.answered += 1,
                SlotStatus::MarkedForReview => counts.marked_for_review += 1,
                SlotStatus::AnsweredAndMarked => counts.answered_and_marked += 1,
            }
        }
        counts
    }

    pub fn palette(&self) -> Vec<PaletteEntry> {
        self.slots
            .iter()
            .map(|slot| PaletteEntry {
                index: slot.index,
                question_id: slot.question_id.clone(),
                section_id: slot.section_id.clone(),
                status: slot.status,
                is_current: slot.index == self.current,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(n: usize) -> Session {
        Session::new("t1", (0..n).map(|i| (format!("q{i}"), None))).unwrap()
    }

    fn assert_counts_cover_all(s: &Session) {
        assert_eq!(s.status_counts().total(), s.len());
    }

    #[test]
    fn initial_statuses() {
        let s = session(3);
        assert_eq!(s.slots()[0].status, SlotStatus::NotAnswered);
        assert_eq!(s.slots()[1].status, SlotStatus::NotVisited);
        assert_eq!(s.slots()[2].status, SlotStatus::NotVisited);
        assert_eq!(s.current_index(), 0);
        assert_counts_cover_all(&s);
    }

    #[test]
    fn empty_session_is_rejected() {
        let err = Session::new("t1", Vec::new()).unwrap_err();
        assert!(matches!(err, SessionError::NoQuestions(_)));
    }

    #[test]
    fn snapshot_must_hold_a_current_slot() {
        let mut s = session(2);
        s.navigate(1).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.current_index(), 1);
        assert_eq!(back.len(), 2);

        let empty = serde_json::from_str::<Session>(r#"{"slots":[],"current":0}"#);
        assert!(empty.unwrap_err().to_string().contains("no slots"));

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["current"] = 2.into();
        let dangling = serde_json::from_value::<Session>(value);
        assert!(dangling.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn navigate_visits_once() {
        let mut s = session(3);
        s.navigate(2).unwrap();
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.slots()[2].status, SlotStatus::NotAnswered);

        s.capture_answer(2, Answer::Choice(1)).unwrap();
        s.navigate(0).unwrap();
        s.navigate(2).unwrap();
        assert_eq!(s.slots()[2].status, SlotStatus::Answered);
        assert_counts_cover_all(&s);
    }

    #[test]
    fn navigate_out_of_range() {
        let mut s = session(2);
        let err = s.navigate(2).unwrap_err();
        assert!(matches!(err, SessionError::SlotOutOfRange { index: 2, len: 2 }));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn next_and_previous_clamp() {
        let mut s = session(2);
        assert_eq!(s.previous(), 0);
        assert_eq!(s.next(), 1);
        assert_eq!(s.next(), 1);
        assert_eq!(s.slots()[1].status, SlotStatus::NotAnswered);
    }

    #[test]
    fn review_matrix() {
        let mut s = session(1);
        assert!(s.toggle_review(0).unwrap());
        assert_eq!(s.current().status, SlotStatus::MarkedForReview);

        s.capture_answer(0, Answer::Choice(0)).unwrap();
        assert_eq!(s.current().status, SlotStatus::AnsweredAndMarked);

        assert!(!s.toggle_review(0).unwrap());
        assert_eq!(s.current().status, SlotStatus::Answered);

        s.toggle_review(0).unwrap();
        s.clear_answer(0).unwrap();
        assert_eq!(s.current().status, SlotStatus::MarkedForReview);
        assert!(s.current().answer.is_none());

        s.toggle_review(0).unwrap();
        assert_eq!(s.current().status, SlotStatus::NotAnswered);
        assert_counts_cover_all(&s);
    }

    #[test]
    fn blank_capture_clears() {
        let mut s = session(1);
        s.capture_answer(0, Answer::Numeric("42".into())).unwrap();
        assert!(s.current().status.is_answered());
        s.capture_answer(0, Answer::Numeric("  ".into())).unwrap();
        assert_eq!(s.current().status, SlotStatus::NotAnswered);
        assert!(s.current().answer.is_none());
    }

    #[test]
    fn capture_on_unvisited_slot_answers_it() {
        let mut s = session(3);
        s.capture_answer(2, Answer::Choice(0)).unwrap();
        assert_eq!(s.slots()[2].status, SlotStatus::Answered);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn palette_marks_current() {
        let mut s = session(3);
        s.navigate(1).unwrap();
        let palette = s.palette();
        assert_eq!(palette.len(), 3);
        assert!(palette[1].is_current);
        assert!(!palette[0].is_current);
        let counts = s.status_counts();
        assert_eq!(counts.not_answered, 2);
        assert_eq!(counts.not_visited, 1);
    }
}
