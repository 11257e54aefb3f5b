//! This module provides ways to tweak in-memory trackers, so that they can return errors on some tests

use crate::error::{SyncError, SyncResult};

/// This stores some behaviour tweaks, that describe how an in-memory board will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub search_behaviour: (u32, u32),
    pub add_card_behaviour: (u32, u32),
    pub update_card_behaviour: (u32, u32),
    pub get_list_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All actions will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            search_behaviour: (0, n_fails),
            add_card_behaviour: (0, n_fails),
            update_card_behaviour: (0, n_fails),
            get_list_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_search(&mut self) -> SyncResult<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.search_behaviour, "search")
    }
    pub fn can_add_card(&mut self) -> SyncResult<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.add_card_behaviour, "add_card")
    }
    /// Covers every change made to an existing card (fields, attachments, due date, comments)
    pub fn can_update_card(&mut self) -> SyncResult<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.update_card_behaviour, "update_card")
    }
    pub fn can_get_list(&mut self) -> SyncResult<()> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.get_list_behaviour, "get_list")
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), descr: &str) -> SyncResult<()> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 -= 1;
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    } else if remaining_failures > 0 {
        value.1 -= 1;
        log::debug!("Mock behaviour: failing a {} ({:?})", descr, value);
        Err(SyncError::Transient(format!("Mocked behaviour requires this {} to fail this time. ({:?})", descr, value)))
    } else {
        log::debug!("Mock behaviour: allowing a {} ({:?})", descr, value);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_search().is_ok());
        assert!(ok.can_search().is_ok());
        assert!(ok.can_add_card().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_search().is_err());
        assert!(now.can_add_card().is_err());
        assert!(now.can_add_card().is_err());
        assert!(now.can_search().is_err());
        assert!(now.can_search().is_ok());
        assert!(now.can_search().is_ok());
        assert!(now.can_add_card().is_ok());

        let mut custom = MockBehaviour{
            search_behaviour: (0,1),
            update_card_behaviour: (1,3),
            ..MockBehaviour::default()
        };
        assert!(custom.can_search().is_err());
        assert!(custom.can_search().is_ok());
        assert!(custom.can_update_card().is_ok());
        assert!(custom.can_update_card().is_err());
        assert!(custom.can_update_card().is_err());
        assert!(custom.can_update_card().is_err());
        assert!(custom.can_update_card().is_ok());

        let mut suspended = MockBehaviour::fail_now(1);
        suspended.suspend();
        assert!(suspended.can_get_list().is_ok());
        suspended.resume();
        assert!(suspended.can_get_list().is_err());
    }

    #[test]
    fn injected_failures_are_transient() {
        let mut behaviour = MockBehaviour::fail_now(1);
        match behaviour.can_add_card() {
            Err(SyncError::Transient(_)) => {},
            other => panic!("unexpected result {:?}", other),
        }
    }
}
