//! The arbitration desk: opens, disputes, resolves, claims, and cancels
//! escrow holds against the balance ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use clearlock_ledger::{BalanceLedger, Clock};
use clearlock_types::{
    AuditTrail, ClearlockError, ConfidentialEscrow, EventKind, HoldId, HoldState, NewHold,
    PrincipalId, Result,
};

/// Custodian of arbitration-capable escrow holds.
///
/// Every funds movement is delegated to the [`BalanceLedger`]'s
/// held-balance primitives; the desk only decides who may move what,
/// and when. Holds are never deleted — terminal holds stay queryable.
#[derive(Debug, Default)]
pub struct ArbitrationDesk {
    holds: HashMap<HoldId, ConfidentialEscrow>,
    by_principal: HashMap<PrincipalId, Vec<HoldId>>,
    audit: AuditTrail,
}

impl ArbitrationDesk {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a hold: lock `amount` of the buyer's available balance and
    /// start the challenge period.
    ///
    /// # Errors
    /// - `InvalidHold` for a non-positive amount, a zero challenge
    ///   period, or degenerate parties (buyer as seller or arbitrator)
    /// - `InsufficientBalance` if the buyer cannot cover the lock
    pub fn pay(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        new_hold: NewHold,
    ) -> Result<HoldId> {
        if new_hold.amount <= Decimal::ZERO {
            return Err(ClearlockError::InvalidHold {
                reason: "amount must be positive".to_string(),
            });
        }
        if new_hold.challenge_period_secs == 0 {
            return Err(ClearlockError::InvalidHold {
                reason: "challenge period must be positive".to_string(),
            });
        }
        if new_hold.buyer == new_hold.seller {
            return Err(ClearlockError::InvalidHold {
                reason: "buyer and seller must differ".to_string(),
            });
        }
        if new_hold.arbitrator == new_hold.buyer || new_hold.arbitrator == new_hold.seller {
            return Err(ClearlockError::InvalidHold {
                reason: "arbitrator must be a third party".to_string(),
            });
        }

        ledger.lock(new_hold.buyer, &new_hold.asset, new_hold.amount)?;

        let now = clock.now();
        let hold = ConfidentialEscrow {
            id: HoldId::new(),
            buyer: new_hold.buyer,
            seller: new_hold.seller,
            arbitrator: new_hold.arbitrator,
            asset: new_hold.asset,
            amount: new_hold.amount,
            challenge_period_secs: new_hold.challenge_period_secs,
            disputed: false,
            resolved: false,
            claimed: false,
            cancelled: false,
            created_at: now,
            updated_at: now,
        };
        let hold_id = hold.id;

        self.by_principal.entry(hold.buyer).or_default().push(hold_id);
        self.by_principal.entry(hold.seller).or_default().push(hold_id);

        self.record(EventKind::HoldOpened, hold.buyer, &hold, now);
        tracing::info!(%hold_id, amount = %hold.amount, asset = %hold.asset, "hold opened");

        self.holds.insert(hold_id, hold);
        Ok(hold_id)
    }

    /// Buyer voluntarily releases the held funds to the seller. Allowed
    /// at any time while the hold is active and undisputed, including
    /// before the challenge period ends.
    ///
    /// # Errors
    /// `HoldNotFound`, `Unauthorized` (caller is not the buyer),
    /// `AlreadyFinalized`, `AlreadyDisputed`.
    pub fn release(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        hold_id: HoldId,
    ) -> Result<()> {
        let now = clock.now();
        let hold = Self::live_hold(&self.holds, hold_id)?;
        if caller != hold.buyer {
            return Err(ClearlockError::Unauthorized {
                reason: "only the buyer may release a hold".to_string(),
            });
        }
        if hold.disputed {
            return Err(ClearlockError::AlreadyDisputed(hold_id));
        }

        ledger.settle_held(hold.buyer, hold.seller, &hold.asset, hold.amount)?;

        let hold = self.mutate(hold_id, now, |h| h.claimed = true)?;
        self.record(EventKind::HoldReleased, caller, &hold, now);
        tracing::info!(%hold_id, "hold released to seller");
        Ok(())
    }

    /// Buyer raises a dispute, freezing the hold until the arbitrator
    /// resolves it. Blocks both claim and cancel.
    ///
    /// # Errors
    /// `HoldNotFound`, `Unauthorized` (caller is not the buyer),
    /// `AlreadyFinalized`, `AlreadyDisputed`.
    pub fn dispute(
        &mut self,
        clock: &dyn Clock,
        caller: PrincipalId,
        hold_id: HoldId,
    ) -> Result<()> {
        let now = clock.now();
        let hold = Self::live_hold(&self.holds, hold_id)?;
        if caller != hold.buyer {
            return Err(ClearlockError::Unauthorized {
                reason: "only the buyer may dispute a hold".to_string(),
            });
        }
        if hold.disputed {
            return Err(ClearlockError::AlreadyDisputed(hold_id));
        }

        let hold = self.mutate(hold_id, now, |h| h.disputed = true)?;
        self.record(EventKind::HoldDisputed, caller, &hold, now);
        tracing::warn!(%hold_id, "hold disputed");
        Ok(())
    }

    /// Arbitrator resolves a disputed hold by splitting the locked
    /// amount between buyer (refund) and seller (payout). The split must
    /// account for the full locked amount; either share may be zero.
    ///
    /// # Errors
    /// `HoldNotFound`, `Unauthorized` (caller is not the arbitrator),
    /// `AlreadyFinalized`, `NotDisputed`, `InvalidSplit`.
    pub fn resolve(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        hold_id: HoldId,
        buyer_amount: Decimal,
        seller_amount: Decimal,
    ) -> Result<()> {
        let now = clock.now();
        let hold = Self::live_hold(&self.holds, hold_id)?;
        if caller != hold.arbitrator {
            return Err(ClearlockError::Unauthorized {
                reason: "only the arbitrator may resolve a hold".to_string(),
            });
        }
        if !hold.disputed {
            return Err(ClearlockError::NotDisputed(hold_id));
        }
        if buyer_amount < Decimal::ZERO
            || seller_amount < Decimal::ZERO
            || buyer_amount + seller_amount != hold.amount
        {
            return Err(ClearlockError::InvalidSplit {
                locked: hold.amount,
                proposed: buyer_amount + seller_amount,
            });
        }

        // The refund leg pays held funds back to their owner; the ledger
        // allows recipient == owner for exactly this case.
        let (buyer, seller, asset) = (hold.buyer, hold.seller, hold.asset.clone());
        if buyer_amount > Decimal::ZERO {
            ledger.settle_held(buyer, buyer, &asset, buyer_amount)?;
        }
        if seller_amount > Decimal::ZERO {
            ledger.settle_held(buyer, seller, &asset, seller_amount)?;
        }

        let hold = self.mutate(hold_id, now, |h| {
            h.resolved = true;
            h.claimed = true;
        })?;
        self.record(EventKind::HoldResolved, caller, &hold, now);
        tracing::info!(%hold_id, %buyer_amount, %seller_amount, "hold resolved by arbitrator");
        Ok(())
    }

    /// Seller claims the held funds once the challenge period has
    /// elapsed without a dispute.
    ///
    /// # Errors
    /// `HoldNotFound`, `Unauthorized` (caller is not the seller),
    /// `AlreadyFinalized`, `AlreadyDisputed`, `NotYetEligible` while the
    /// challenge period is still open.
    pub fn claim(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        hold_id: HoldId,
    ) -> Result<()> {
        let now = clock.now();
        let hold = Self::live_hold(&self.holds, hold_id)?;
        if caller != hold.seller {
            return Err(ClearlockError::Unauthorized {
                reason: "only the seller may claim a hold".to_string(),
            });
        }
        if hold.disputed {
            return Err(ClearlockError::AlreadyDisputed(hold_id));
        }
        if now < hold.challenge_deadline() {
            return Err(ClearlockError::NotYetEligible {
                eligible_at: hold.challenge_deadline(),
            });
        }

        ledger.settle_held(hold.buyer, hold.seller, &hold.asset, hold.amount)?;

        let hold = self.mutate(hold_id, now, |h| h.claimed = true)?;
        self.record(EventKind::HoldClaimed, caller, &hold, now);
        tracing::info!(%hold_id, "hold claimed by seller");
        Ok(())
    }

    /// Buyer cancels the hold and recovers the locked funds. Allowed
    /// only while the challenge period is still open and no dispute has
    /// been raised.
    ///
    /// # Errors
    /// `HoldNotFound`, `Unauthorized` (caller is not the buyer),
    /// `AlreadyFinalized`, `AlreadyDisputed`, `ChallengePeriodElapsed`
    /// once the window has closed.
    pub fn cancel(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        hold_id: HoldId,
    ) -> Result<()> {
        let now = clock.now();
        let hold = Self::live_hold(&self.holds, hold_id)?;
        if caller != hold.buyer {
            return Err(ClearlockError::Unauthorized {
                reason: "only the buyer may cancel a hold".to_string(),
            });
        }
        if hold.disputed {
            return Err(ClearlockError::AlreadyDisputed(hold_id));
        }
        if now >= hold.challenge_deadline() {
            return Err(ClearlockError::ChallengePeriodElapsed {
                elapsed_at: hold.challenge_deadline(),
            });
        }

        ledger.unlock(hold.buyer, &hold.asset, hold.amount)?;

        let hold = self.mutate(hold_id, now, |h| h.cancelled = true)?;
        self.record(EventKind::HoldCancelled, caller, &hold, now);
        tracing::info!(%hold_id, "hold cancelled by buyer");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    /// Look up a hold.
    #[must_use]
    pub fn hold(&self, hold_id: HoldId) -> Option<&ConfidentialEscrow> {
        self.holds.get(&hold_id)
    }

    /// The derived state of a hold.
    #[must_use]
    pub fn state(&self, hold_id: HoldId) -> Option<HoldState> {
        self.holds.get(&hold_id).map(ConfidentialEscrow::state)
    }

    /// Whether the seller could claim the hold right now.
    #[must_use]
    pub fn can_claim(&self, clock: &dyn Clock, hold_id: HoldId) -> bool {
        self.holds
            .get(&hold_id)
            .is_some_and(|h| h.can_claim(clock.now()))
    }

    /// Whether the buyer could cancel the hold right now.
    #[must_use]
    pub fn can_cancel(&self, clock: &dyn Clock, hold_id: HoldId) -> bool {
        self.holds
            .get(&hold_id)
            .is_some_and(|h| h.can_cancel(clock.now()))
    }

    /// All holds a principal participates in (as buyer or seller),
    /// creation order.
    #[must_use]
    pub fn holds_for(&self, principal: PrincipalId) -> Vec<&ConfidentialEscrow> {
        self.by_principal
            .get(&principal)
            .map(|ids| ids.iter().filter_map(|id| self.holds.get(id)).collect())
            .unwrap_or_default()
    }

    /// The append-only audit trail of hold events.
    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Fetch a hold that is still live. Terminal holds refuse every
    /// state-changing operation uniformly.
    fn live_hold(
        holds: &HashMap<HoldId, ConfidentialEscrow>,
        hold_id: HoldId,
    ) -> Result<ConfidentialEscrow> {
        let hold = holds
            .get(&hold_id)
            .ok_or(ClearlockError::HoldNotFound(hold_id))?;
        if hold.is_terminal() {
            return Err(ClearlockError::AlreadyFinalized);
        }
        Ok(hold.clone())
    }

    /// Apply a mutation to a stored hold and return the updated copy.
    /// Callers have already verified the hold exists.
    fn mutate(
        &mut self,
        hold_id: HoldId,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ConfidentialEscrow),
    ) -> Result<ConfidentialEscrow> {
        let hold = self
            .holds
            .get_mut(&hold_id)
            .ok_or(ClearlockError::HoldNotFound(hold_id))?;
        f(hold);
        hold.updated_at = now;
        Ok(hold.clone())
    }

    fn record(
        &mut self,
        kind: EventKind,
        actor: PrincipalId,
        hold: &ConfidentialEscrow,
        now: DateTime<Utc>,
    ) {
        self.audit.record(
            kind,
            actor,
            hold.id.to_string(),
            serde_json::to_vec(hold).unwrap_or_default(),
            now,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clearlock_ledger::ManualClock;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    struct Fixture {
        desk: ArbitrationDesk,
        ledger: BalanceLedger,
        clock: ManualClock,
        buyer: PrincipalId,
        seller: PrincipalId,
        arbitrator: PrincipalId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ledger = BalanceLedger::new();
            let buyer = PrincipalId::new();
            ledger.deposit(buyer, "USDC", dec(10_000));
            Self {
                desk: ArbitrationDesk::new(),
                ledger,
                clock: ManualClock::starting_now(),
                buyer,
                seller: PrincipalId::new(),
                arbitrator: PrincipalId::new(),
            }
        }

        fn pay(&mut self, amount: i64, challenge_secs: u64) -> HoldId {
            self.desk
                .pay(
                    &mut self.ledger,
                    &self.clock,
                    NewHold {
                        buyer: self.buyer,
                        seller: self.seller,
                        arbitrator: self.arbitrator,
                        asset: "USDC".to_string(),
                        amount: dec(amount),
                        challenge_period_secs: challenge_secs,
                    },
                )
                .unwrap()
        }
    }

    #[test]
    fn pay_locks_buyer_funds() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 3_600);

        let entry = fx.ledger.balance(fx.buyer, "USDC");
        assert_eq!(entry.available, dec(9_000));
        assert_eq!(entry.held, dec(1_000));
        assert_eq!(fx.desk.state(hold_id), Some(HoldState::Active));
    }

    #[test]
    fn pay_validation() {
        let mut fx = Fixture::new();
        let base = NewHold {
            buyer: fx.buyer,
            seller: fx.seller,
            arbitrator: fx.arbitrator,
            asset: "USDC".to_string(),
            amount: dec(100),
            challenge_period_secs: 60,
        };

        let err = fx
            .desk
            .pay(
                &mut fx.ledger,
                &fx.clock,
                NewHold {
                    amount: Decimal::ZERO,
                    ..base.clone()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidHold { .. }));

        let err = fx
            .desk
            .pay(
                &mut fx.ledger,
                &fx.clock,
                NewHold {
                    challenge_period_secs: 0,
                    ..base.clone()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidHold { .. }));

        let err = fx
            .desk
            .pay(
                &mut fx.ledger,
                &fx.clock,
                NewHold {
                    seller: fx.buyer,
                    ..base.clone()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidHold { .. }));

        let err = fx
            .desk
            .pay(
                &mut fx.ledger,
                &fx.clock,
                NewHold {
                    arbitrator: fx.seller,
                    ..base
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidHold { .. }));
    }

    #[test]
    fn pay_insufficient_balance_leaves_nothing_locked() {
        let mut fx = Fixture::new();
        let err = fx
            .desk
            .pay(
                &mut fx.ledger,
                &fx.clock,
                NewHold {
                    buyer: fx.buyer,
                    seller: fx.seller,
                    arbitrator: fx.arbitrator,
                    asset: "USDC".to_string(),
                    amount: dec(50_000),
                    challenge_period_secs: 60,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InsufficientBalance { .. }));
        assert_eq!(fx.ledger.balance(fx.buyer, "USDC").held, Decimal::ZERO);
    }

    #[test]
    fn release_pays_seller_immediately() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 3_600);

        fx.desk
            .release(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap();

        assert_eq!(fx.ledger.available(fx.seller, "USDC"), dec(1_000));
        assert_eq!(fx.ledger.balance(fx.buyer, "USDC").held, Decimal::ZERO);
        assert_eq!(fx.desk.state(hold_id), Some(HoldState::Claimed));
    }

    #[test]
    fn only_buyer_may_release() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 3_600);

        let err = fx
            .desk
            .release(&mut fx.ledger, &fx.clock, fx.seller, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::Unauthorized { .. }));
    }

    #[test]
    fn claim_waits_for_challenge_period() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(750, 60);

        assert!(!fx.desk.can_claim(&fx.clock, hold_id));
        assert!(fx.desk.can_cancel(&fx.clock, hold_id));

        let err = fx
            .desk
            .claim(&mut fx.ledger, &fx.clock, fx.seller, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::NotYetEligible { .. }));

        fx.clock.advance(Duration::seconds(60));
        assert!(fx.desk.can_claim(&fx.clock, hold_id));
        assert!(!fx.desk.can_cancel(&fx.clock, hold_id));
        fx.desk
            .claim(&mut fx.ledger, &fx.clock, fx.seller, hold_id)
            .unwrap();
        assert_eq!(fx.ledger.available(fx.seller, "USDC"), dec(750));
        assert_eq!(fx.desk.state(hold_id), Some(HoldState::Claimed));
    }

    #[test]
    fn cancel_only_inside_challenge_period() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(500, 60);

        fx.clock.advance(Duration::seconds(60));
        let err = fx
            .desk
            .cancel(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::ChallengePeriodElapsed { .. }));

        let hold_id = fx.pay(500, 60);
        fx.desk
            .cancel(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap();
        assert_eq!(fx.ledger.available(fx.buyer, "USDC"), dec(9_500));
        assert_eq!(fx.desk.state(hold_id), Some(HoldState::Cancelled));
    }

    #[test]
    fn dispute_blocks_claim_and_cancel() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 1);
        fx.desk.dispute(&fx.clock, fx.buyer, hold_id).unwrap();
        fx.clock.advance(Duration::seconds(2));

        let err = fx
            .desk
            .claim(&mut fx.ledger, &fx.clock, fx.seller, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyDisputed(_)));

        let err = fx
            .desk
            .cancel(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyDisputed(_)));

        // A second dispute is rejected too.
        let err = fx.desk.dispute(&fx.clock, fx.buyer, hold_id).unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyDisputed(_)));
    }

    #[test]
    fn resolve_requires_dispute_and_exact_split() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 3_600);

        let err = fx
            .desk
            .resolve(
                &mut fx.ledger,
                &fx.clock,
                fx.arbitrator,
                hold_id,
                dec(400),
                dec(600),
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::NotDisputed(_)));

        fx.desk.dispute(&fx.clock, fx.buyer, hold_id).unwrap();

        let err = fx
            .desk
            .resolve(
                &mut fx.ledger,
                &fx.clock,
                fx.arbitrator,
                hold_id,
                dec(400),
                dec(500),
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidSplit { .. }));

        let err = fx
            .desk
            .resolve(
                &mut fx.ledger,
                &fx.clock,
                fx.buyer,
                hold_id,
                dec(400),
                dec(600),
            )
            .unwrap_err();
        assert!(matches!(err, ClearlockError::Unauthorized { .. }));

        fx.desk
            .resolve(
                &mut fx.ledger,
                &fx.clock,
                fx.arbitrator,
                hold_id,
                dec(400),
                dec(600),
            )
            .unwrap();

        assert_eq!(fx.ledger.available(fx.buyer, "USDC"), dec(9_400));
        assert_eq!(fx.ledger.available(fx.seller, "USDC"), dec(600));
        assert_eq!(fx.ledger.balance(fx.buyer, "USDC").held, Decimal::ZERO);
        assert_eq!(fx.desk.state(hold_id), Some(HoldState::Resolved));
    }

    #[test]
    fn terminal_hold_refuses_everything() {
        let mut fx = Fixture::new();
        let hold_id = fx.pay(1_000, 3_600);
        fx.desk
            .release(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap();

        let err = fx
            .desk
            .release(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
        let err = fx.desk.dispute(&fx.clock, fx.buyer, hold_id).unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
        let err = fx
            .desk
            .claim(&mut fx.ledger, &fx.clock, fx.seller, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
        let err = fx
            .desk
            .cancel(&mut fx.ledger, &fx.clock, fx.buyer, hold_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
    }

    #[test]
    fn unknown_hold() {
        let mut fx = Fixture::new();
        let err = fx
            .desk
            .release(&mut fx.ledger, &fx.clock, fx.buyer, HoldId::new())
            .unwrap_err();
        assert!(matches!(err, ClearlockError::HoldNotFound(_)));
    }

    #[test]
    fn holds_for_indexes_buyer_and_seller() {
        let mut fx = Fixture::new();
        fx.pay(100, 60);
        fx.pay(200, 60);
        assert_eq!(fx.desk.holds_for(fx.buyer).len(), 2);
        assert_eq!(fx.desk.holds_for(fx.seller).len(), 2);
        assert!(fx.desk.holds_for(fx.arbitrator).is_empty());
    }
}
