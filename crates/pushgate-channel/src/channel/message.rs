//! Channel state and close-code semantics.

/// Current state of a logical channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(Default)]
pub enum ChannelState {
    /// Not dialed yet.
    #[default]
    Idle,
    /// First connection attempt in progress.
    Connecting,
    /// Session established; messages flow to the observer.
    Open,
    /// Session lost; a replacement attempt is waiting or in progress.
    Reconnecting,
    /// The gateway ended the session deliberately, or the client was
    /// closed locally. Absorbing until a fresh `dial`.
    Closed,
}


/// Standard WebSocket close codes as defined in RFC 6455.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[derive(Default)]
pub enum CloseCode {
    /// Normal closure; the connection successfully completed.
    #[default]
    Normal,
    /// Endpoint is going away (e.g., server shutting down).
    Away,
    /// Protocol error occurred.
    Protocol,
    /// Received data type that cannot be accepted.
    Unsupported,
    /// No status code was provided.
    NoStatus,
    /// Connection was closed abnormally (no close frame received).
    Abnormal,
    /// Received data that was not consistent with the message type.
    Invalid,
    /// Policy violation.
    Policy,
    /// Message too big to process.
    TooBig,
    /// Extension negotiation failed.
    Extension,
    /// Unexpected condition prevented the request from being fulfilled.
    Error,
    /// Server is restarting.
    Restart,
    /// Server is too busy; try again later.
    Again,
    /// Custom close code (application-specific, must be in range 4000-4999).
    Custom(u16),
}

impl CloseCode {
    /// Convert to the numeric close code.
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::Away => 1001,
            Self::Protocol => 1002,
            Self::Unsupported => 1003,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::Invalid => 1007,
            Self::Policy => 1008,
            Self::TooBig => 1009,
            Self::Extension => 1010,
            Self::Error => 1011,
            Self::Restart => 1012,
            Self::Again => 1013,
            Self::Custom(code) => *code,
        }
    }

    /// Create from a numeric close code.
    pub fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::Protocol,
            1003 => Self::Unsupported,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::Invalid,
            1008 => Self::Policy,
            1009 => Self::TooBig,
            1010 => Self::Extension,
            1011 => Self::Error,
            1012 => Self::Restart,
            1013 => Self::Again,
            code => Self::Custom(code),
        }
    }

    /// Whether this code ends the logical channel for good.
    ///
    /// 1001 ("going away") is the gateway ending the session on purpose;
    /// no reconnect is scheduled for it. Every other code counts as an
    /// unexpected drop and triggers the backoff-reconnect path.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Away)
    }
}
