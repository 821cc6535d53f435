/// Result alias that carries the custom [`LilyweaveError`] type.
pub type Result<T> = std::result::Result<T, LilyweaveError>;

/// Common error type for the core crate.
///
/// Every failure is reported eagerly: alignment either returns all four
/// streams or one of these variants, never a partial result.
#[derive(Debug, thiserror::Error)]
pub enum LilyweaveError {
    /// A value is neither a scalar nor a sequence where one is required, or a
    /// sequence element does not have the layout its stream expects.
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    /// A rational duration has no entry in the lookup table it was checked
    /// against, after rounding to the lookup tolerance.
    #[error("unsupported duration {value:.5} of a whole note (looked up in the {table} table)")]
    UnsupportedDuration { value: f64, table: &'static str },
    /// The weights of a compound duration sum to a total with no registered
    /// irregular-ratio table.
    #[error("no duration table is registered for a subdivision total of {0}")]
    UnsupportedGrouping(u64),
    /// Normalization was asked to produce events from an empty stream.
    #[error("cannot normalize an empty stream to {target} events")]
    EmptySourceStream { target: usize },
    /// A pitch or chord member outside the MIDI note range.
    #[error("pitch {0} is outside the MIDI range 0..=127")]
    PitchOutOfRange(i64),
    /// An articulation key with no entry in the articulation table.
    #[error("unknown articulation `{0}`")]
    UnknownArticulation(String),
    /// Free-form message used by the outer surfaces.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl LilyweaveError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn shape<T: Into<String>>(msg: T) -> Self {
        Self::InvalidShape(msg.into())
    }
}

impl From<&str> for LilyweaveError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for LilyweaveError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
