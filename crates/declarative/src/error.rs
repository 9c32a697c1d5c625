//! Error types for planning and applying changes.

use std::fmt;
use thiserror::Error;

/// Failure reported by an adapter operation
///
/// A batch call against a service can fail for several records at once.
/// All of their messages are kept, in order, and reported as one failure
/// covering the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("\n"))]
pub struct AdapterError {
    /// Messages of every failed record, as returned by the service
    pub messages: Vec<String>,
}

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }

    /// Combine the error records of a batch call, `None` if there are none
    pub fn from_records<I>(records: I) -> Option<Self>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let messages: Vec<String> = records.into_iter().map(|r| r.to_string()).collect();
        (!messages.is_empty()).then_some(Self { messages })
    }

    /// Fail if a batch call returned any error records
    pub fn check_batch<I>(records: I) -> std::result::Result<(), Self>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        match Self::from_records(records) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Append the messages of another failure
    pub fn merge(&mut self, other: AdapterError) {
        self.messages.extend(other.messages);
    }
}

/// Errors that can occur while building or applying a plan.
#[derive(Debug, Error)]
pub enum Error {
    /// A change was made to depend on itself
    #[error("change {id} cannot depend on itself")]
    SelfLoop {
        /// Id of the offending change
        id: String,
    },

    /// The dependencies admit no valid order
    #[error("dependency cycle between changes: {}", .ids.join(", "))]
    Cycle {
        /// Ids of every change on the cycle, sorted
        ids: Vec<String>,
    },

    /// Two changes target the same element
    #[error("duplicate change id: {id}")]
    DuplicateChange {
        /// The repeated id
        id: String,
    },

    /// A dependency edge names a change that is not part of the plan
    #[error("dependency references unknown change: {id}")]
    UnknownChange {
        /// The unknown id
        id: String,
    },

    /// An adapter's dependency changer failed
    #[error("dependency changer of adapter '{adapter}' failed: {message}")]
    Changer {
        /// Adapter the changer belongs to
        adapter: String,
        /// Error reported by the changer
        message: String,
    },

    /// No adapter is registered for an element's namespace
    #[error("no adapter registered for '{name}'")]
    UnknownAdapter {
        /// Adapter namespace that was looked up
        name: String,
    },

    /// An adapter operation failed
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl Error {
    /// Whether the error means no plan can be produced for the given input
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::SelfLoop { .. }
                | Self::Cycle { .. }
                | Self::DuplicateChange { .. }
                | Self::UnknownChange { .. }
                | Self::Changer { .. }
        )
    }
}

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, Error>;
