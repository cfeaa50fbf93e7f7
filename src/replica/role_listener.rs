use crate::replica::role::Role;
use tokio::sync::watch;

pub(super) fn new(initial_role: Role) -> (RoleChangeNotifier, RoleListener) {
    let (snd, rcv) = watch::channel(initial_role);

    (RoleChangeNotifier { snd }, RoleListener { rcv })
}

pub(super) struct RoleChangeNotifier {
    snd: watch::Sender<Role>,
}

impl RoleChangeNotifier {
    pub(super) fn notify_new_role(&self, new_role: Role) {
        self.snd.send_replace(new_role);
    }
}

/// RoleListener observes role transitions of the local replica. It doesn't queue intermediate
/// transitions: if several happen between two calls to `next()`, only the latest is returned.
#[derive(Clone)]
pub struct RoleListener {
    rcv: watch::Receiver<Role>,
}

impl RoleListener {
    pub fn current(&self) -> Role {
        *self.rcv.borrow()
    }

    /// Waits for the next role change. Returns `None` once the replica has been dropped.
    pub async fn next(&mut self) -> Option<Role> {
        match self.rcv.changed().await {
            Ok(_) => Some(*self.rcv.borrow()),
            Err(_) => None,
        }
    }
}
