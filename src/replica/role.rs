use std::fmt;

/// Role of a replica in the election state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Follower,
    Candidate,
    Leader,
}

impl Role {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Role::Follower => 0,
            Role::Candidate => 1,
            Role::Leader => 2,
        }
    }

    // Only ever fed values produced by `as_u8()`.
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Role::Candidate,
            2 => Role::Leader,
            _ => Role::Follower,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Follower => "Follower",
            Role::Candidate => "Candidate",
            Role::Leader => "Leader",
        };
        f.write_str(name)
    }
}
