//! Process-wide planning settings

use rust_decimal::Decimal;

use crate::constants::UNDO_GRACE_HOURS;
use crate::utils::error::*;

/// Planning settings snapshot.
/// Reads clone the whole snapshot; writes go through the state layer which
/// bumps the settings tick and drops the plan cache.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanningSettings {
    /// Anchor day-of-month for all schedules, clamped to [1, 28]
    pub payment_day: u32,
    /// Currency used for aggregation
    pub display_currency: String,
    /// Currency used for "remaining to close"
    pub execution_display_currency: String,
    /// Whether reminder workers are armed
    pub notifications_enabled: bool,
    /// Days before a payment to notify, clamped to [1, 7]
    pub notification_days: u32,
    /// Auto-start an execution record on the first day of the month
    pub auto_start_enabled: bool,
    /// Auto-close the active execution record on the month's last day
    pub auto_complete_enabled: bool,
    /// Undo window in hours, one of {0, 24, 48, 168}
    pub undo_grace_period_hours: u64,
    /// Persisted user budget
    pub monthly_budget: Option<Decimal>,
    /// Currency of `monthly_budget`
    pub budget_currency: String,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            payment_day: 1,
            display_currency: "USD".to_string(),
            execution_display_currency: "USD".to_string(),
            notifications_enabled: false,
            notification_days: 3,
            auto_start_enabled: false,
            auto_complete_enabled: false,
            undo_grace_period_hours: 24,
            monthly_budget: None,
            budget_currency: "USD".to_string(),
        }
    }
}

impl PlanningSettings {
    /// Sets the payment anchor day, clamped to [1, 28].
    pub fn payment_day(&mut self, payment_day: u32) -> &mut Self {
        self.payment_day = payment_day.clamp(1, 28);
        self
    }

    /// Sets the aggregation currency.
    pub fn display_currency(&mut self, display_currency: String) -> &mut Self {
        self.display_currency = display_currency;
        self
    }

    /// Sets the currency used for "remaining to close".
    pub fn execution_display_currency(&mut self, currency: String) -> &mut Self {
        self.execution_display_currency = currency;
        self
    }

    /// Arms or disarms reminder workers.
    pub fn notifications_enabled(&mut self, enabled: bool) -> &mut Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Sets the notification lead time, clamped to [1, 7] days.
    pub fn notification_days(&mut self, days: u32) -> &mut Self {
        self.notification_days = days.clamp(1, 7);
        self
    }

    /// Enables auto-starting an execution record each month.
    pub fn auto_start_enabled(&mut self, enabled: bool) -> &mut Self {
        self.auto_start_enabled = enabled;
        self
    }

    /// Enables auto-closing the active execution record.
    pub fn auto_complete_enabled(&mut self, enabled: bool) -> &mut Self {
        self.auto_complete_enabled = enabled;
        self
    }

    /// Sets the undo grace window. Only the recognized windows are accepted.
    pub fn undo_grace_period_hours(&mut self, hours: u64) -> PlannerResult<&mut Self> {
        if !UNDO_GRACE_HOURS.contains(&hours) {
            return Err(validation_err(
                "The undo grace period must be 0, 24, 48 or 168 hours.",
            ));
        }
        self.undo_grace_period_hours = hours;
        Ok(self)
    }

    /// Persists (or clears) the user's monthly budget.
    pub fn monthly_budget(&mut self, budget: Option<Decimal>) -> &mut Self {
        self.monthly_budget = budget;
        self
    }

    /// Sets the currency of the persisted budget.
    pub fn budget_currency(&mut self, currency: String) -> &mut Self {
        self.budget_currency = currency;
        self
    }

    /// Undo window in milliseconds
    pub fn undo_grace_period_ms(&self) -> u64 {
        self.undo_grace_period_hours * 3_600_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_the_documented_table() {
        let settings = PlanningSettings::default();
        assert_eq!(settings.payment_day, 1);
        assert_eq!(settings.display_currency, "USD");
        assert_eq!(settings.execution_display_currency, "USD");
        assert!(!settings.notifications_enabled);
        assert_eq!(settings.notification_days, 3);
        assert!(!settings.auto_start_enabled);
        assert!(!settings.auto_complete_enabled);
        assert_eq!(settings.undo_grace_period_hours, 24);
        assert_eq!(settings.monthly_budget, None);
        assert_eq!(settings.budget_currency, "USD");
    }

    #[test]
    fn setters_chain_and_clamp() {
        let mut settings = PlanningSettings::default();
        settings
            .payment_day(31)
            .notification_days(12)
            .display_currency("EUR".to_string())
            .monthly_budget(Some(dec!(450)));
        assert_eq!(settings.payment_day, 28);
        assert_eq!(settings.notification_days, 7);
        assert_eq!(settings.display_currency, "EUR");
        assert_eq!(settings.monthly_budget, Some(dec!(450)));
    }

    #[test]
    fn unknown_undo_windows_are_rejected() {
        let mut settings = PlanningSettings::default();
        assert!(settings.undo_grace_period_hours(12).is_err());
        assert!(settings.undo_grace_period_hours(48).is_ok());
        assert_eq!(settings.undo_grace_period_ms(), 48 * 3_600_000);
    }

    proptest! {
        #[test]
        fn payment_day_always_lands_in_range(day in any::<u32>()) {
            let mut settings = PlanningSettings::default();
            settings.payment_day(day);
            prop_assert!((1..=28).contains(&settings.payment_day));
        }
    }
}
