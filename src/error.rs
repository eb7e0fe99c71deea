//! Error types for saavy_shift.
//!
//! Construction fails on bad timing or graphs. Parameter changes on a running
//! shifter only fail when the engine cannot take the whole update; out-of-range
//! values are clamped and reported through
//! [`RangeCheck`](crate::shifter::RangeCheck).

use thiserror::Error;

use crate::graph::node::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShiftError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    #[error("invalid grain timing: active time {active_time}s must be positive and at least twice the fade time {fade_time}s")]
    InvalidTiming { active_time: f64, fade_time: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    #[error("graph contains a cycle")]
    GraphCycle,

    #[error("a graph has already been realized on this engine")]
    GraphAlreadyRealized,

    #[error("no graph has been realized on this engine")]
    GraphNotRealized,

    #[error("event queue full: {needed} slots needed, {available} free")]
    EventQueueFull { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, ShiftError>;
