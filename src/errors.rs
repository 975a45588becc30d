use thiserror::Error;

use crate::lexer::TokenKind;

/// Represents errors that can occur while parsing, evaluating and scheduling cron expressions.
///
/// `CronError` is used throughout the `cronex` crate and is exported for consuming programs.
/// Positions are byte offsets into the string handed to the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    /// The expression was empty or consisted only of whitespace.
    #[error("Cron expression cannot be an empty string.")]
    EmptyPattern,

    /// A character that has no meaning in the cron grammar.
    ///
    /// Also raised for single letters other than `L` and `W`.
    #[error("Unexpected character '{character}' at position {position}.")]
    UnexpectedCharacter { character: char, position: usize },

    /// An alphabetic run that is not a keyword of the field being parsed, or an unknown `@alias`.
    #[error("Unknown keyword '{keyword}' at position {position}.")]
    UnknownKeyword { keyword: String, position: usize },

    /// A digit run that does not fit in 32 bits.
    #[error("Number at position {position} is too large.")]
    NumberTooLarge { position: usize },

    /// The field grammar was violated, e.g. a range operator without its upper bound.
    #[error("Invalid expression at position {position}: {message}")]
    Grammar {
        message: &'static str,
        position: usize,
    },

    /// A token that is valid somewhere in the grammar but not where it was found.
    #[error("Unexpected {token} at position {position}.")]
    UnexpectedToken { token: TokenKind, position: usize },

    /// Input left over after the year field.
    #[error("Unexpected trailing input at position {position}.")]
    TrailingInput { position: usize },

    /// Both day fields were explicit while the parser was configured to forbid it.
    #[error("Day-of-month and day-of-week cannot both be specified, use '?' in one of them.")]
    ConflictingDayFields,

    /// The search for the next occurrence left the allowed window.
    #[error("No occurrence found within the search window.")]
    TimeSearchLimitExceeded,

    /// The expression (`@reboot`) has no notion of a next occurrence.
    #[error("Expression '{0}' has no next occurrence.")]
    NoNextOccurrence(String),

    /// An entry with the same name is already registered.
    #[error("Entry already exists: {0}")]
    DuplicateEntry(String),

    /// No entry is registered under the name.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// The scheduler timer was started twice.
    #[error("Scheduler already running.")]
    SchedulerAlreadyRunning,

    /// The scheduler was closed and can no longer run callbacks.
    #[error("Scheduler is closed.")]
    SchedulerClosed,
}
