//! Word of the day subscription state, as stored on the user record and
//! carried in callback payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Subscription {
    #[default]
    Undetermined,
    Accepted,
    Denied,
    Revoked,
}

impl Subscription {
    pub fn name(self) -> &'static str {
        match self {
            Subscription::Undetermined => "undetermined",
            Subscription::Accepted => "accepted",
            Subscription::Denied => "denied",
            Subscription::Revoked => "revoked",
        }
    }
}

impl From<Subscription> for u8 {
    fn from(subscription: Subscription) -> Self {
        match subscription {
            Subscription::Undetermined => 0,
            Subscription::Accepted => 1,
            Subscription::Denied => 2,
            Subscription::Revoked => 3,
        }
    }
}

impl TryFrom<u8> for Subscription {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Subscription::Undetermined),
            1 => Ok(Subscription::Accepted),
            2 => Ok(Subscription::Denied),
            3 => Ok(Subscription::Revoked),
            other => Err(format!("unknown subscription state {other}")),
        }
    }
}

impl std::fmt::Display for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
