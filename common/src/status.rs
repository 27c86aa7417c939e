use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::BitOr};

/// Rendered state of a mapping, as shown in `status.state`
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Debug, JsonSchema, Hash)]
pub enum State {
    Ready,
    Processing,
    Failed,
}

impl State {
    pub const fn as_str(&self) -> &'static str {
        match self {
            State::Ready => "Ready",
            State::Processing => "Processing",
            State::Failed => "Failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a runtime registration.
///
/// A set over {Registered, Configured, Processing, Failed}. Only the first two
/// are persisted as booleans; the transient bits survive storage only through
/// the rendered [`State`] label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Status {
    pub registered: bool,
    pub configured: bool,
    pub processing: bool,
    pub failed: bool,
}

impl Status {
    pub const EMPTY: Status = Status {
        registered: false,
        configured: false,
        processing: false,
        failed: false,
    };
    pub const REGISTERED: Status = Status {
        registered: true,
        ..Status::EMPTY
    };
    pub const CONFIGURED: Status = Status {
        configured: true,
        ..Status::EMPTY
    };
    pub const PROCESSING: Status = Status {
        processing: true,
        ..Status::EMPTY
    };
    pub const FAILED: Status = Status {
        failed: true,
        ..Status::EMPTY
    };

    /// Render the state label.
    ///
    /// Precedence is Failed, then Processing, then Ready. Anything incomplete
    /// that is not explicitly processing renders as Failed.
    pub fn state(&self) -> State {
        match (self.failed, self.processing, self.registered && self.configured) {
            (true, _, _) => State::Failed,
            (false, true, _) => State::Processing,
            (false, false, true) => State::Ready,
            (false, false, false) => State::Failed,
        }
    }

    /// Rebuild a status from its persisted form. Unknown labels carry no transient bit.
    pub fn parse(state: &str, registered: bool, configured: bool) -> Status {
        Status {
            registered,
            configured,
            processing: state == State::Processing.as_str(),
            failed: state == State::Failed.as_str(),
        }
    }

    /// Keep only the bits that are persisted as booleans
    pub fn persisted(&self) -> Status {
        Status {
            registered: self.registered,
            configured: self.configured,
            ..Status::EMPTY
        }
    }
}

impl BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Status) -> Status {
        Status {
            registered: self.registered || rhs.registered,
            configured: self.configured || rhs.configured,
            processing: self.processing || rhs.processing,
            failed: self.failed || rhs.failed,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (registered: {}, configured: {})",
            self.state(),
            self.registered,
            self.configured
        )
    }
}
