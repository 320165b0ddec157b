//! In-memory balance ledger with atomic transfer primitives.
//!
//! Every principal has an `available` balance (usable for new transfers)
//! and a `held` balance (locked by an escrow hold awaiting disposition).
//!
//! The dual-leg [`BalanceLedger::swap`] is the atomic boundary the direct
//! settlement path relies on: both debits are validated before any of the
//! four mutations is applied, so either both legs take effect or neither
//! does. Two sequential `transfer` calls do not get that guarantee.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clearlock_types::{Asset, ClearlockError, PrincipalId, Result};

/// A single balance entry for a (principal, asset) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new transfers.
    pub available: Decimal,
    /// Held by an escrow awaiting settlement or dispute resolution.
    pub held: Decimal,
}

impl BalanceEntry {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            held: Decimal::ZERO,
        }
    }

    /// Total balance (available + held).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.held
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.held.is_zero()
    }
}

impl Default for BalanceEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// One leg of a dual-leg swap.
#[derive(Debug, Clone)]
pub struct TransferLeg {
    pub from: PrincipalId,
    pub to: PrincipalId,
    pub asset: Asset,
    pub amount: Decimal,
}

/// In-memory balance ledger. The reference implementation of the
/// transfer primitive the settlement core consumes.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    balances: HashMap<(PrincipalId, Asset), BalanceEntry>,
}

impl BalanceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Credit funds to a principal. Creates the entry if absent.
    pub fn deposit(&mut self, principal: PrincipalId, asset: &str, amount: Decimal) {
        let entry = self
            .balances
            .entry((principal, asset.to_string()))
            .or_default();
        entry.available += amount;
    }

    /// Current balance for a (principal, asset) pair.
    #[must_use]
    pub fn balance(&self, principal: PrincipalId, asset: &str) -> BalanceEntry {
        self.balances
            .get(&(principal, asset.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Available balance shorthand.
    #[must_use]
    pub fn available(&self, principal: PrincipalId, asset: &str) -> Decimal {
        self.balance(principal, asset).available
    }

    /// Move `amount` of `asset` from one principal's available balance
    /// to another's. Single indivisible debit/credit.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if `from` cannot cover the amount;
    /// nothing changes in that case.
    pub fn transfer(
        &mut self,
        from: PrincipalId,
        to: PrincipalId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        self.check_available(from, asset, amount)?;
        self.debit_available(from, asset, amount);
        self.credit_available(to, asset, amount);
        Ok(())
    }

    /// Realize both legs of an exchange as one indivisible operation.
    ///
    /// Both debits are validated before anything mutates. Either both the
    /// seller→buyer leg and the buyer→seller leg apply, or neither does.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` naming the first leg that cannot be
    /// covered; the ledger is untouched on failure.
    pub fn swap(&mut self, leg_a: &TransferLeg, leg_b: &TransferLeg) -> Result<()> {
        self.check_available(leg_a.from, &leg_a.asset, leg_a.amount)?;
        self.check_available(leg_b.from, &leg_b.asset, leg_b.amount)?;

        self.debit_available(leg_a.from, &leg_a.asset, leg_a.amount);
        self.credit_available(leg_a.to, &leg_a.asset, leg_a.amount);
        self.debit_available(leg_b.from, &leg_b.asset, leg_b.amount);
        self.credit_available(leg_b.to, &leg_b.asset, leg_b.amount);

        tracing::debug!(
            asset_a = %leg_a.asset,
            amount_a = %leg_a.amount,
            asset_b = %leg_b.asset,
            amount_b = %leg_b.amount,
            "dual-leg swap applied"
        );
        Ok(())
    }

    /// Lock funds for an escrow hold (available → held).
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the principal cannot cover the amount.
    pub fn lock(&mut self, principal: PrincipalId, asset: &str, amount: Decimal) -> Result<()> {
        self.check_available(principal, asset, amount)?;
        let entry = self
            .balances
            .entry((principal, asset.to_string()))
            .or_default();
        entry.available -= amount;
        entry.held += amount;
        Ok(())
    }

    /// Return locked funds to the owner (held → available).
    ///
    /// # Errors
    /// Returns `InsufficientHeld` if the held balance cannot cover the amount.
    pub fn unlock(&mut self, principal: PrincipalId, asset: &str, amount: Decimal) -> Result<()> {
        let entry = self
            .balances
            .get_mut(&(principal, asset.to_string()))
            .ok_or(ClearlockError::InsufficientHeld)?;
        if entry.held < amount {
            return Err(ClearlockError::InsufficientHeld);
        }
        entry.held -= amount;
        entry.available += amount;
        Ok(())
    }

    /// Pay out locked funds: `owner`'s held balance → `recipient`'s
    /// available balance. `recipient` may equal `owner` (a refund split).
    ///
    /// # Errors
    /// Returns `InsufficientHeld` if the owner's held balance cannot cover
    /// the amount.
    pub fn settle_held(
        &mut self,
        owner: PrincipalId,
        recipient: PrincipalId,
        asset: &str,
        amount: Decimal,
    ) -> Result<()> {
        let entry = self
            .balances
            .get_mut(&(owner, asset.to_string()))
            .ok_or(ClearlockError::InsufficientHeld)?;
        if entry.held < amount {
            return Err(ClearlockError::InsufficientHeld);
        }
        entry.held -= amount;
        self.credit_available(recipient, asset, amount);
        Ok(())
    }

    /// Total supply of an asset across all principals.
    #[must_use]
    pub fn supply(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    fn check_available(&self, principal: PrincipalId, asset: &str, amount: Decimal) -> Result<()> {
        let available = self.available(principal, asset);
        if available < amount {
            return Err(ClearlockError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    fn debit_available(&mut self, principal: PrincipalId, asset: &str, amount: Decimal) {
        let entry = self
            .balances
            .entry((principal, asset.to_string()))
            .or_default();
        entry.available -= amount;
    }

    fn credit_available(&mut self, principal: PrincipalId, asset: &str, amount: Decimal) {
        let entry = self
            .balances
            .entry((principal, asset.to_string()))
            .or_default();
        entry.available += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn deposit_and_balance() {
        let mut ledger = BalanceLedger::new();
        let alice = PrincipalId::new();
        ledger.deposit(alice, "USDC", dec(1000));
        assert_eq!(ledger.available(alice, "USDC"), dec(1000));
        assert_eq!(ledger.balance(alice, "USDC").held, Decimal::ZERO);
    }

    #[test]
    fn transfer_moves_funds() {
        let mut ledger = BalanceLedger::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();
        ledger.deposit(alice, "USDC", dec(1000));

        ledger.transfer(alice, bob, "USDC", dec(400)).unwrap();
        assert_eq!(ledger.available(alice, "USDC"), dec(600));
        assert_eq!(ledger.available(bob, "USDC"), dec(400));
    }

    #[test]
    fn transfer_insufficient_is_untouched() {
        let mut ledger = BalanceLedger::new();
        let alice = PrincipalId::new();
        let bob = PrincipalId::new();
        ledger.deposit(alice, "USDC", dec(100));

        let err = ledger.transfer(alice, bob, "USDC", dec(200)).unwrap_err();
        assert!(matches!(err, ClearlockError::InsufficientBalance { .. }));
        assert_eq!(ledger.available(alice, "USDC"), dec(100));
        assert_eq!(ledger.available(bob, "USDC"), Decimal::ZERO);
    }

    #[test]
    fn swap_applies_both_legs() {
        let mut ledger = BalanceLedger::new();
        let seller = PrincipalId::new();
        let buyer = PrincipalId::new();
        ledger.deposit(seller, "GOLD-T", dec(10));
        ledger.deposit(buyer, "USDC", dec(5000));

        ledger
            .swap(
                &TransferLeg {
                    from: seller,
                    to: buyer,
                    asset: "GOLD-T".to_string(),
                    amount: dec(10),
                },
                &TransferLeg {
                    from: buyer,
                    to: seller,
                    asset: "USDC".to_string(),
                    amount: dec(5000),
                },
            )
            .unwrap();

        assert_eq!(ledger.available(buyer, "GOLD-T"), dec(10));
        assert_eq!(ledger.available(seller, "USDC"), dec(5000));
        assert_eq!(ledger.available(seller, "GOLD-T"), Decimal::ZERO);
        assert_eq!(ledger.available(buyer, "USDC"), Decimal::ZERO);
    }

    #[test]
    fn swap_second_leg_shortfall_rolls_back_nothing() {
        let mut ledger = BalanceLedger::new();
        let seller = PrincipalId::new();
        let buyer = PrincipalId::new();
        ledger.deposit(seller, "GOLD-T", dec(10));
        ledger.deposit(buyer, "USDC", dec(100)); // not enough for leg B

        let err = ledger
            .swap(
                &TransferLeg {
                    from: seller,
                    to: buyer,
                    asset: "GOLD-T".to_string(),
                    amount: dec(10),
                },
                &TransferLeg {
                    from: buyer,
                    to: seller,
                    asset: "USDC".to_string(),
                    amount: dec(5000),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InsufficientBalance { .. }));

        // Leg A must not have applied.
        assert_eq!(ledger.available(seller, "GOLD-T"), dec(10));
        assert_eq!(ledger.available(buyer, "GOLD-T"), Decimal::ZERO);
    }

    #[test]
    fn lock_unlock_roundtrip() {
        let mut ledger = BalanceLedger::new();
        let alice = PrincipalId::new();
        ledger.deposit(alice, "USDC", dec(1000));

        ledger.lock(alice, "USDC", dec(750)).unwrap();
        let bal = ledger.balance(alice, "USDC");
        assert_eq!(bal.available, dec(250));
        assert_eq!(bal.held, dec(750));

        ledger.unlock(alice, "USDC", dec(750)).unwrap();
        let bal = ledger.balance(alice, "USDC");
        assert_eq!(bal.available, dec(1000));
        assert_eq!(bal.held, Decimal::ZERO);
    }

    #[test]
    fn settle_held_pays_recipient() {
        let mut ledger = BalanceLedger::new();
        let buyer = PrincipalId::new();
        let seller = PrincipalId::new();
        ledger.deposit(buyer, "USDC", dec(1000));
        ledger.lock(buyer, "USDC", dec(1000)).unwrap();

        ledger.settle_held(buyer, seller, "USDC", dec(1000)).unwrap();
        assert_eq!(ledger.available(seller, "USDC"), dec(1000));
        assert!(ledger.balance(buyer, "USDC").is_zero());
    }

    #[test]
    fn settle_held_split_back_to_owner() {
        let mut ledger = BalanceLedger::new();
        let buyer = PrincipalId::new();
        let seller = PrincipalId::new();
        ledger.deposit(buyer, "USDC", dec(1000));
        ledger.lock(buyer, "USDC", dec(1000)).unwrap();

        ledger.settle_held(buyer, buyer, "USDC", dec(400)).unwrap();
        ledger.settle_held(buyer, seller, "USDC", dec(600)).unwrap();
        assert_eq!(ledger.available(buyer, "USDC"), dec(400));
        assert_eq!(ledger.available(seller, "USDC"), dec(600));
        assert_eq!(ledger.balance(buyer, "USDC").held, Decimal::ZERO);
    }

    #[test]
    fn unlock_more_than_held_fails() {
        let mut ledger = BalanceLedger::new();
        let alice = PrincipalId::new();
        ledger.deposit(alice, "USDC", dec(100));
        ledger.lock(alice, "USDC", dec(50)).unwrap();

        let err = ledger.unlock(alice, "USDC", dec(60)).unwrap_err();
        assert!(matches!(err, ClearlockError::InsufficientHeld));
    }

    #[test]
    fn supply_is_conserved_across_operations() {
        let mut ledger = BalanceLedger::new();
        let a = PrincipalId::new();
        let b = PrincipalId::new();
        ledger.deposit(a, "USDC", dec(700));
        ledger.deposit(b, "USDC", dec(300));

        ledger.transfer(a, b, "USDC", dec(100)).unwrap();
        ledger.lock(b, "USDC", dec(150)).unwrap();
        ledger.settle_held(b, a, "USDC", dec(150)).unwrap();

        assert_eq!(ledger.supply("USDC"), dec(1000));
    }
}
