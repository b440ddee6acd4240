use chrono::{DateTime, Duration, Utc};

/// The per-alert evaluation state implied by its cursor fields.
///
/// Alerts carry no explicit state column; the classification is a pure
/// function of the clock and the `last_triggered_at` cursor so it can be
/// tested without a store or a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// The alert has never fired (`last_triggered_at` is null).
    NeverTriggered,
    /// A trigger happened less than `cooldown_seconds` ago.
    InCooldown,
    /// The cooldown has elapsed; the alert may fire again.
    Eligible,
}

/// Classify an alert's cooldown state at `now`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use logwarden_alert::cooldown::{classify, CooldownState};
///
/// let now = Utc::now();
/// assert_eq!(classify(now, None, 3600), CooldownState::NeverTriggered);
/// assert_eq!(
///     classify(now, Some(now - Duration::seconds(60)), 3600),
///     CooldownState::InCooldown
/// );
/// assert_eq!(
///     classify(now, Some(now - Duration::seconds(3600)), 3600),
///     CooldownState::Eligible
/// );
/// ```
pub fn classify(
    now: DateTime<Utc>,
    last_triggered_at: Option<DateTime<Utc>>,
    cooldown_seconds: i64,
) -> CooldownState {
    match last_triggered_at {
        None => CooldownState::NeverTriggered,
        Some(last) => {
            if now - last < Duration::seconds(cooldown_seconds) {
                CooldownState::InCooldown
            } else {
                CooldownState::Eligible
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_triggered_when_cursor_null() {
        assert_eq!(classify(Utc::now(), None, 60), CooldownState::NeverTriggered);
    }

    #[test]
    fn boundary_is_eligible() {
        // Exactly cooldown_seconds after the trigger the alert may fire.
        let now = Utc::now();
        let last = now - Duration::seconds(3600);
        assert_eq!(classify(now, Some(last), 3600), CooldownState::Eligible);
        assert_eq!(
            classify(now, Some(last + Duration::seconds(1)), 3600),
            CooldownState::InCooldown
        );
    }

    #[test]
    fn clock_skew_future_trigger_stays_in_cooldown() {
        let now = Utc::now();
        let future = now + Duration::seconds(30);
        assert_eq!(classify(now, Some(future), 3600), CooldownState::InCooldown);
    }
}
