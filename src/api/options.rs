use std::convert::TryFrom;
use tokio::time::Duration;

/// Timing knobs for a replica. Anything left `None` gets a default; election and heartbeat
/// defaults scale with the call timeout.
#[derive(Clone, Debug, Default)]
pub struct ReplicaOptions {
    pub connect_timeout: Option<Duration>,
    pub call_timeout: Option<Duration>,
    pub heartbeat_interval: Option<Duration>,
    pub election_min_timeout: Option<Duration>,
    pub election_max_timeout: Option<Duration>,
    pub hand_off_timeout: Option<Duration>,
}

#[derive(Debug)]
pub(super) struct ReplicaOptionsValidated {
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub election_min_timeout: Duration,
    pub election_max_timeout: Duration,
    pub hand_off_timeout: Duration,
}

impl ReplicaOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.call_timeout < self.connect_timeout {
            return Err("Call timeout must not be less than connect timeout");
        }
        if self.election_min_timeout > self.election_max_timeout {
            return Err("Election minimum timeout must not exceed maximum timeout");
        }
        if self.heartbeat_interval + self.connect_timeout + self.call_timeout >= self.election_min_timeout {
            return Err("A heartbeat round must fit within the election minimum timeout");
        }
        if self.hand_off_timeout == Duration::from_millis(0) {
            return Err("Hand-off timeout must be non-zero");
        }
        if self.hand_off_timeout >= self.heartbeat_interval {
            return Err("Hand-off timeout must be less than the heartbeat interval");
        }

        Ok(())
    }
}

impl TryFrom<ReplicaOptions> for ReplicaOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ReplicaOptions) -> Result<Self, Self::Error> {
        let call_timeout = options.call_timeout.unwrap_or(Duration::from_millis(100));
        let values = ReplicaOptionsValidated {
            connect_timeout: options.connect_timeout.unwrap_or(Duration::from_millis(50)),
            call_timeout,
            heartbeat_interval: options.heartbeat_interval.unwrap_or(call_timeout * 5),
            election_min_timeout: options.election_min_timeout.unwrap_or(call_timeout * 10),
            election_max_timeout: options.election_max_timeout.unwrap_or(call_timeout * 15),
            hand_off_timeout: options.hand_off_timeout.unwrap_or(Duration::from_millis(20)),
        };

        values.validate()?;
        Ok(values)
    }
}
