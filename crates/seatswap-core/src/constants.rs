//! Protocol constants.

/// Default idle time after which the seat on turn may be contested.
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 60_000;

/// Default lifetime of a replacement proposal.
pub const DEFAULT_MAX_REPLACEMENT_MS: u64 = 60_000;

/// Live event carrying a full session snapshot.
pub const EVENT_SESSION_UPDATED: &str = "session.updated";

/// Direct event telling the incoming participant which seat they now play.
pub const EVENT_SEAT_ASSIGNED: &str = "replacement.seat_assigned";

/// Toast announcing a committed substitution to the session.
pub const EVENT_REPLACEMENT_DONE: &str = "toast.replacement_done";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_namespaced() {
        for name in [EVENT_SESSION_UPDATED, EVENT_SEAT_ASSIGNED, EVENT_REPLACEMENT_DONE] {
            assert!(name.contains('.'), "{name}");
        }
    }
}
