use crate::membership::address::{ReplicaAddress, ReplicaSet};
use crate::membership::membership::{Membership, MembershipError};

/// FixedMembership is a static replica list. Used for bootstrapping and tests; there is no
/// registry behind it, so there is nothing to refresh.
pub struct FixedMembership {
    my_address: ReplicaAddress,
    replicas: ReplicaSet,
}

impl FixedMembership {
    pub fn new<I>(my_address: ReplicaAddress, all_addresses: I) -> Self
    where
        I: IntoIterator<Item = ReplicaAddress>,
    {
        let mut replicas: ReplicaSet = all_addresses.into_iter().collect();
        replicas.insert(my_address.clone());

        FixedMembership { my_address, replicas }
    }
}

#[async_trait::async_trait]
impl Membership for FixedMembership {
    fn my_address(&self) -> &ReplicaAddress {
        &self.my_address
    }

    async fn replicas(&self) -> Result<ReplicaSet, MembershipError> {
        Ok(self.replicas.clone())
    }
}
