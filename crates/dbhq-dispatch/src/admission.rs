//! Per-(user, scope) command admission control.
//!
//! Each key owns a `CooldownState` behind its own mutex; the outer `DashMap`
//! only hands out the `Arc`, so two keys never wait on each other's lock.
//! A denied user is told at most once per cooldown window.
//!
//! State lives for the lifetime of the process: the map only grows.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use dbhq_core::IdentityScopeKey;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    RateLimited {
        /// Time left until the next action would be admitted.
        remaining: Duration,
        /// Cooldown in force for this window (quoted in the notice).
        cooldown: Duration,
        /// `false` exactly once per window: the caller must send the notice.
        already_notified: bool,
    },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownState {
    pub last_action: Instant,
    pub current_cooldown: Duration,
    /// Denials since the last admitted action. Not consulted by any policy yet.
    pub violation_count: u32,
    pub notified: bool,
}

impl CooldownState {
    fn admitted_at(now: Instant, base: Duration) -> Self {
        Self {
            last_action: now,
            current_cooldown: base,
            violation_count: 0,
            notified: false,
        }
    }
}

pub struct AdmissionController {
    base_cooldown: Duration,
    states: DashMap<IdentityScopeKey, Arc<Mutex<CooldownState>>>,
}

impl AdmissionController {
    pub fn new(base_cooldown: Duration) -> Self {
        Self {
            base_cooldown,
            states: DashMap::new(),
        }
    }

    /// Decide whether the action at `now` may proceed, and record it.
    ///
    /// Admitted iff `now - last_action >= current_cooldown`; an unseen key is
    /// always admitted. Admission resets the cooldown to the base value and
    /// clears the violation count and notified flag. A denial counts a
    /// violation and sets `notified`, reporting whether it was already set.
    pub fn check_and_record(&self, key: &IdentityScopeKey, now: Instant) -> Admission {
        let existing = self.states.get(key).map(|s| Arc::clone(s.value()));
        let state = match existing {
            Some(state) => state,
            None => match self.states.entry(key.clone()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(CooldownState::admitted_at(
                        now,
                        self.base_cooldown,
                    ))));
                    return Admission::Admitted;
                }
            },
        };

        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(state.last_action);

        if elapsed >= state.current_cooldown {
            *state = CooldownState::admitted_at(now, self.base_cooldown);
            return Admission::Admitted;
        }

        state.violation_count = state.violation_count.saturating_add(1);
        let already_notified = state.notified;
        state.notified = true;

        Admission::RateLimited {
            remaining: state.current_cooldown - elapsed,
            cooldown: state.current_cooldown,
            already_notified,
        }
    }

    /// Snapshot of one key's state, if it has ever acted.
    pub fn state(&self, key: &IdentityScopeKey) -> Option<CooldownState> {
        self.states
            .get(key)
            .map(|s| s.value().lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Number of keys tracked so far.
    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbhq_core::{ScopeId, UserId};

    const BASE: Duration = Duration::from_millis(5000);

    fn key(user: u64, scope: u64) -> IdentityScopeKey {
        IdentityScopeKey::new(UserId::from(user), ScopeId::guild(scope))
    }

    fn ms(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    #[test]
    fn first_action_is_admitted() {
        let ctl = AdmissionController::new(BASE);
        let t0 = Instant::now();
        assert_eq!(ctl.check_and_record(&key(1, 1), t0), Admission::Admitted);
        let state = ctl.state(&key(1, 1)).unwrap();
        assert_eq!(state.last_action, t0);
        assert_eq!(state.current_cooldown, BASE);
        assert!(!state.notified);
    }

    #[test]
    fn notifies_once_per_window() {
        let ctl = AdmissionController::new(BASE);
        let k = key(1, 1);
        let t0 = Instant::now();

        assert!(ctl.check_and_record(&k, t0).is_admitted());
        assert_eq!(
            ctl.check_and_record(&k, ms(t0, 2000)),
            Admission::RateLimited {
                remaining: Duration::from_millis(3000),
                cooldown: BASE,
                already_notified: false,
            }
        );
        assert_eq!(
            ctl.check_and_record(&k, ms(t0, 2100)),
            Admission::RateLimited {
                remaining: Duration::from_millis(2900),
                cooldown: BASE,
                already_notified: true,
            }
        );
        assert_eq!(ctl.state(&k).unwrap().violation_count, 2);

        assert!(ctl.check_and_record(&k, ms(t0, 5000)).is_admitted());
        let state = ctl.state(&k).unwrap();
        assert!(!state.notified);
        assert_eq!(state.violation_count, 0);
        assert_eq!(state.last_action, ms(t0, 5000));
    }

    #[test]
    fn many_denials_produce_single_notice() {
        let ctl = AdmissionController::new(BASE);
        let k = key(7, 7);
        let t0 = Instant::now();
        ctl.check_and_record(&k, t0);

        let notices = (1..50)
            .map(|i| ctl.check_and_record(&k, ms(t0, i * 90)))
            .filter(|a| {
                matches!(
                    a,
                    Admission::RateLimited {
                        already_notified: false,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn new_window_allows_a_new_notice() {
        let ctl = AdmissionController::new(BASE);
        let k = key(1, 1);
        let t0 = Instant::now();
        ctl.check_and_record(&k, t0);
        ctl.check_and_record(&k, ms(t0, 100));
        assert!(ctl.check_and_record(&k, ms(t0, 6000)).is_admitted());
        assert!(matches!(
            ctl.check_and_record(&k, ms(t0, 6100)),
            Admission::RateLimited {
                already_notified: false,
                ..
            }
        ));
    }

    #[test]
    fn admitted_actions_are_at_least_one_cooldown_apart() {
        let ctl = AdmissionController::new(BASE);
        let k = key(3, 3);
        let t0 = Instant::now();
        let mut admitted = Vec::new();
        for step in 0..400u64 {
            let now = ms(t0, step * 137);
            if ctl.check_and_record(&k, now).is_admitted() {
                admitted.push(now);
            }
        }
        assert!(admitted.len() > 1);
        for pair in admitted.windows(2) {
            assert!(pair[1] - pair[0] >= BASE);
        }
    }

    #[test]
    fn keys_are_independent() {
        let ctl = AdmissionController::new(BASE);
        let t0 = Instant::now();
        assert!(ctl.check_and_record(&key(1, 1), t0).is_admitted());
        assert!(ctl.check_and_record(&key(2, 1), t0).is_admitted());
        assert!(ctl.check_and_record(&key(1, 2), t0).is_admitted());
        let dm = IdentityScopeKey::new(UserId::from(1), ScopeId::direct());
        assert!(ctl.check_and_record(&dm, t0).is_admitted());
        assert_eq!(ctl.tracked_keys(), 4);

        assert!(!ctl.check_and_record(&key(1, 1), ms(t0, 10)).is_admitted());
        assert!(ctl.state(&key(2, 1)).unwrap().violation_count == 0);
    }

    #[test]
    fn concurrent_callers_on_one_key() {
        let ctl = Arc::new(AdmissionController::new(BASE));
        let k = key(9, 9);
        let now = Instant::now();

        let results: Vec<Admission> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let ctl = Arc::clone(&ctl);
                    let k = k.clone();
                    s.spawn(move || ctl.check_and_record(&k, now))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let admitted = results.iter().filter(|a| a.is_admitted()).count();
        let notices = results
            .iter()
            .filter(|a| {
                matches!(
                    a,
                    Admission::RateLimited {
                        already_notified: false,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(notices, 1);
    }
}
