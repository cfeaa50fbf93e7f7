use crate::replica::role::Role;
use crate::replica::role_listener::{self, RoleChangeNotifier, RoleListener};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

#[derive(Copy, Clone, Eq, Ord, PartialOrd, PartialEq)]
pub(crate) struct Term(u64);

impl Term {
    pub(crate) fn new(term: u64) -> Self {
        Term(term)
    }

    pub(crate) fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SharedState is the term and role of the local replica. The gateway reads both and bumps the
/// term; only the driver changes the role.
///
/// Term never decreases. Every mutation goes through a method that keeps it that way.
pub(crate) struct SharedState {
    term: AtomicU64,
    role: AtomicU8,
    role_notifier: RoleChangeNotifier,
}

impl SharedState {
    /// Starts as a follower at term 0.
    pub(crate) fn new() -> (Self, RoleListener) {
        let (role_notifier, listener) = role_listener::new(Role::Follower);
        let state = SharedState {
            term: AtomicU64::new(0),
            role: AtomicU8::new(Role::Follower.as_u8()),
            role_notifier,
        };

        (state, listener)
    }

    pub(crate) fn current_term(&self) -> Term {
        Term(self.term.load(Ordering::Acquire))
    }

    /// Set current term to `new_term` atomically, iff it is larger than current term.
    ///
    /// CAS: Return true if we successfully mutated state.
    pub(crate) fn store_term_if_increased(&self, new_term: Term) -> bool {
        let mut current = self.term.load(Ordering::Acquire);
        while new_term.0 > current {
            match self
                .term
                .compare_exchange_weak(current, new_term.0, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }

        false
    }

    /// Raise current term to `observed` if it is behind. Returns the resulting current term.
    pub(crate) fn observe_term(&self, observed: Term) -> Term {
        let previous = self.term.fetch_max(observed.0, Ordering::AcqRel);
        Term(previous.max(observed.0))
    }

    /// Return the new term. Used when transitioning to candidate.
    ///
    /// `None` if the term is already `u64::MAX`; the term is left there.
    pub(crate) fn increment_term(&self) -> Option<Term> {
        self.term
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| current.checked_add(1))
            .ok()
            .map(|previous| Term(previous + 1))
    }

    pub(crate) fn role(&self) -> Role {
        Role::from_u8(self.role.load(Ordering::Acquire))
    }

    pub(crate) fn set_role(&self, role: Role) {
        let previous = self.role.swap(role.as_u8(), Ordering::AcqRel);
        if previous != role.as_u8() {
            self.role_notifier.notify_new_role(role);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_as_follower_at_term_zero() {
        let (state, listener) = SharedState::new();

        assert_eq!(state.current_term(), Term::new(0));
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(listener.current(), Role::Follower);
    }

    #[test]
    fn store_term_if_increased_is_strict() {
        let (state, _listener) = SharedState::new();

        assert!(state.store_term_if_increased(Term::new(3)));
        assert!(!state.store_term_if_increased(Term::new(3)));
        assert!(!state.store_term_if_increased(Term::new(2)));
        assert_eq!(state.current_term(), Term::new(3));
    }

    #[test]
    fn observe_term_never_lowers() {
        let (state, _listener) = SharedState::new();

        assert_eq!(state.observe_term(Term::new(5)), Term::new(5));
        assert_eq!(state.observe_term(Term::new(2)), Term::new(5));
        assert_eq!(state.increment_term(), Some(Term::new(6)));
        assert_eq!(state.current_term(), Term::new(6));
    }

    #[test]
    fn increment_term_saturates_at_max() {
        let (state, _listener) = SharedState::new();
        assert!(state.store_term_if_increased(Term::new(u64::MAX)));

        assert_eq!(state.increment_term(), None);
        assert_eq!(state.current_term(), Term::new(u64::MAX));
        assert!(!state.store_term_if_increased(Term::new(u64::MAX)));
    }

    #[test]
    fn concurrent_vote_terms_only_win_once() {
        let (state, _listener) = SharedState::new();
        let state = Arc::new(state);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.store_term_if_increased(Term::new(1)))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);

        assert_eq!(state.current_term(), Term::new(1));
    }

    #[test]
    fn set_role_notifies_only_on_change() {
        let (state, listener) = SharedState::new();

        state.set_role(Role::Candidate);
        assert_eq!(listener.current(), Role::Candidate);
        state.set_role(Role::Leader);
        assert_eq!(state.role(), Role::Leader);
        assert_eq!(listener.current(), Role::Leader);
    }
}
