// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Date-scoped activity selection as an explicit state machine.
//!
//! A conversation starts from the activities stored for one day, asks the
//! user to pick one if there are several, then answers any number of
//! duration queries until the user finishes or stops replying.

use crate::models::{ActivityRecord, ActivitySummary};
use crate::services::power::{analyze_activity, WindowLength};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-state inactivity limits.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub selection: Duration,
    pub duration: Duration,
}

/// Why a conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    NoActivities,
    Cancelled,
    InvalidSelection,
    Finished,
    TimedOut,
}

/// Current conversation state.
#[derive(Debug, Clone)]
pub enum ConversationState {
    AwaitingSelection { candidates: Vec<ActivityRecord> },
    AwaitingDuration { selected: ActivityRecord },
    Done(EndReason),
}

/// Structured reply to the most recent input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    /// Several activities on the date; pick one by 1-based position
    ChooseActivity { options: Vec<ActivitySummary> },
    /// An activity is selected; send durations in seconds
    Selected { activity: ActivitySummary },
    /// Result for one duration query
    Effort {
        window_seconds: usize,
        max_average_power: f64,
    },
    /// The activity has fewer samples than the requested window
    TooShort { window_seconds: usize },
    /// Input was not a positive number of seconds
    InvalidDuration,
    Ended { reason: EndReason },
}

/// One selection conversation.
#[derive(Debug, Clone)]
pub struct Conversation {
    state: ConversationState,
    last_input: Instant,
    timeouts: Timeouts,
}

impl Conversation {
    /// Start from the activities stored for a date, ordered by start time.
    pub fn start(
        mut activities: Vec<ActivityRecord>,
        timeouts: Timeouts,
        now: Instant,
    ) -> (Self, Reply) {
        activities.sort_by_key(|r| r.start_time());

        let (state, reply) = match activities.len() {
            0 => {
                let reason = EndReason::NoActivities;
                (ConversationState::Done(reason), Reply::Ended { reason })
            }
            1 => {
                let selected = activities.remove(0);
                let reply = selected_reply(&selected);
                (ConversationState::AwaitingDuration { selected }, reply)
            }
            _ => {
                let options = activities.iter().filter_map(|r| r.summary()).collect();
                (
                    ConversationState::AwaitingSelection {
                        candidates: activities,
                    },
                    Reply::ChooseActivity { options },
                )
            }
        };

        (
            Self {
                state,
                last_input: now,
                timeouts,
            },
            reply,
        )
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, ConversationState::Done(_))
    }

    /// Move to `Done(TimedOut)` if the current state's timeout has elapsed.
    ///
    /// Returns true if the conversation timed out on this call.
    pub fn expire(&mut self, now: Instant) -> bool {
        let limit = match self.state {
            ConversationState::AwaitingSelection { .. } => self.timeouts.selection,
            ConversationState::AwaitingDuration { .. } => self.timeouts.duration,
            ConversationState::Done(_) => return false,
        };

        if now.saturating_duration_since(self.last_input) > limit {
            self.state = ConversationState::Done(EndReason::TimedOut);
            return true;
        }
        false
    }

    /// Apply one inbound message.
    pub fn handle(&mut self, text: &str, now: Instant) -> Reply {
        if self.expire(now) {
            return Reply::Ended {
                reason: EndReason::TimedOut,
            };
        }
        self.last_input = now;

        let input = text.trim().to_lowercase();
        let state = std::mem::replace(
            &mut self.state,
            ConversationState::Done(EndReason::Finished),
        );

        let (next, reply) = match state {
            ConversationState::AwaitingSelection { mut candidates } => {
                if input == "cancel" {
                    end(EndReason::Cancelled)
                } else {
                    match input.parse::<usize>() {
                        Ok(choice) if (1..=candidates.len()).contains(&choice) => {
                            let selected = candidates.swap_remove(choice - 1);
                            let reply = selected_reply(&selected);
                            (ConversationState::AwaitingDuration { selected }, reply)
                        }
                        _ => end(EndReason::InvalidSelection),
                    }
                }
            }
            ConversationState::AwaitingDuration { selected } => {
                if input == "!done" || input == "done" {
                    end(EndReason::Finished)
                } else {
                    let reply = duration_reply(&selected, &input);
                    (ConversationState::AwaitingDuration { selected }, reply)
                }
            }
            ConversationState::Done(reason) => end(reason),
        };

        self.state = next;
        reply
    }
}

fn end(reason: EndReason) -> (ConversationState, Reply) {
    (ConversationState::Done(reason), Reply::Ended { reason })
}

fn selected_reply(record: &ActivityRecord) -> Reply {
    match record.summary() {
        Some(activity) => Reply::Selected { activity },
        // Store only hands out records with parseable dates
        None => Reply::Ended {
            reason: EndReason::InvalidSelection,
        },
    }
}

fn duration_reply(record: &ActivityRecord, input: &str) -> Reply {
    let window = match input.parse::<i64>().ok().map(WindowLength::new) {
        Some(Ok(window)) => window,
        _ => return Reply::InvalidDuration,
    };

    let result = analyze_activity(record, window);
    match result.max_average_power {
        Some(max_average_power) => Reply::Effort {
            window_seconds: result.window_seconds,
            max_average_power,
        },
        None => Reply::TooShort {
            window_seconds: result.window_seconds,
        },
    }
}

/// In-memory set of open conversations.
pub struct ConversationStore {
    sessions: DashMap<u64, Conversation>,
    next_id: AtomicU64,
    timeouts: Timeouts,
}

impl ConversationStore {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            timeouts,
        }
    }

    /// Open a conversation; finished-at-start conversations are not kept.
    pub fn open(&self, activities: Vec<ActivityRecord>, now: Instant) -> (Option<u64>, Reply) {
        let (conversation, reply) = Conversation::start(activities, self.timeouts, now);
        if conversation.is_done() {
            return (None, reply);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(id, conversation);
        tracing::debug!(conversation_id = id, "Conversation opened");
        (Some(id), reply)
    }

    /// Deliver a message; `None` if no such conversation is open.
    pub fn reply(&self, id: u64, text: &str, now: Instant) -> Option<Reply> {
        let (reply, done) = {
            let mut conversation = self.sessions.get_mut(&id)?;
            let reply = conversation.handle(text, now);
            (reply, conversation.is_done())
        };

        if done {
            self.sessions.remove(&id);
            tracing::debug!(conversation_id = id, "Conversation closed");
        }
        Some(reply)
    }

    /// Drop every conversation whose timeout has elapsed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, conversation| !conversation.expire(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
