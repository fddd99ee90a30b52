//! # Cross-Rule Signals
//!
//! Rules occasionally need to tell a later rule something that is not a
//! reward or experience: "pay this job bonus", "replant the crop", "the tool
//! spent a charge". Each such signal is a named field here, so the set of
//! things rules can say to each other is closed and type-checked.
//!
//! Signals live only for one run. Anything the host needs afterwards is
//! copied into the [`crate::DeliveryReport`] by the terminal rule.

use crate::amount::Amount;

/// Typed side-channel shared by the rules of a single run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signals {
    pending_currency: Option<Amount>,
    replant_requested: bool,
    charges_spent: u32,
    converted_lines: u32,
}

impl Signals {
    /// Adds to the pending currency payout.
    pub fn add_pending_currency(&mut self, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        let current = self.pending_currency.unwrap_or(Amount::ZERO);
        self.pending_currency = Some(current + amount);
    }

    /// Pending currency payout, if any rule set one.
    #[inline]
    #[must_use]
    pub fn pending_currency(&self) -> Option<Amount> {
        self.pending_currency
    }

    /// Requests that the host replants the subject.
    pub fn request_replant(&mut self) {
        self.replant_requested = true;
    }

    /// Whether a replant was requested (default `false`).
    #[inline]
    #[must_use]
    pub fn replant_requested(&self) -> bool {
        self.replant_requested
    }

    /// Records that the tool spent `charges` consumable charges.
    pub fn spend_charges(&mut self, charges: u32) {
        self.charges_spent = self.charges_spent.saturating_add(charges);
    }

    /// Charges spent so far (default 0).
    #[inline]
    #[must_use]
    pub fn charges_spent(&self) -> u32 {
        self.charges_spent
    }

    /// Records that a conversion rule converted reward lines.
    pub fn record_conversions(&mut self, lines: u32) {
        self.converted_lines = self.converted_lines.saturating_add(lines);
    }

    /// Reward lines converted so far (default 0).
    #[inline]
    #[must_use]
    pub fn converted_lines(&self) -> u32 {
        self.converted_lines
    }
}
