//! Canonical order store and lifecycle transitions.
//!
//! Status transitions are monotonic. Expiry is never driven by a scheduler:
//! readers recompute it from the clock, and every mutating path re-checks it
//! immediately before acting.

use std::collections::HashMap;

use rust_decimal::Decimal;

use clearlock_ledger::{Clock, ComplianceOracle, IdentityProvider};
use clearlock_types::{
    AuditTrail, ClearlockError, EventKind, NewOrder, Order, OrderId, OrderStatus, PrincipalId,
    RegistryConfig, Result,
};

/// Holds the canonical set of exchange orders.
///
/// Collaborators (oracle, identity provider, clock) are injected per call,
/// so independent deployments share nothing and tests substitute freely.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    config: RegistryConfig,
    orders: HashMap<OrderId, Order>,
    by_principal: HashMap<PrincipalId, Vec<OrderId>>,
    audit: AuditTrail,
}

impl OrderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Admit a new order.
    ///
    /// Validation order: parameter shape, identity gating (when configured),
    /// then compliance for each asset against its holder. Any failure aborts
    /// with no state change.
    ///
    /// # Errors
    /// - `InvalidOrder` for non-positive amounts, stale expiry, or
    ///   seller == buyer
    /// - `IdentityRequired` when gating is on and a party has no record
    /// - `ComplianceRejected` when the oracle denies either (holder, asset)
    pub fn create_order(
        &mut self,
        oracle: &dyn ComplianceOracle,
        identities: &dyn IdentityProvider,
        clock: &dyn Clock,
        new_order: NewOrder,
    ) -> Result<OrderId> {
        let now = clock.now();

        if new_order.sell_amount <= Decimal::ZERO || new_order.pay_amount <= Decimal::ZERO {
            return Err(ClearlockError::InvalidOrder {
                reason: "amounts must be positive on both legs".to_string(),
            });
        }
        if new_order.expiry <= now {
            return Err(ClearlockError::InvalidOrder {
                reason: "expiry must be strictly in the future".to_string(),
            });
        }
        if new_order.seller == new_order.buyer {
            return Err(ClearlockError::InvalidOrder {
                reason: "seller and buyer must differ".to_string(),
            });
        }

        if self.config.require_identity {
            for party in [new_order.seller, new_order.buyer] {
                let status = identities
                    .identity_status(party)
                    .ok_or(ClearlockError::IdentityRequired(party))?;
                if status.kyc_level < self.config.min_kyc_level {
                    return Err(ClearlockError::IdentityRequired(party));
                }
            }
        }

        // Each asset is checked against the party that will deliver it.
        if !oracle.is_compliant(new_order.seller, &new_order.sell_asset) {
            return Err(ClearlockError::ComplianceRejected {
                principal: new_order.seller,
                asset: new_order.sell_asset,
            });
        }
        if !oracle.is_compliant(new_order.buyer, &new_order.pay_asset) {
            return Err(ClearlockError::ComplianceRejected {
                principal: new_order.buyer,
                asset: new_order.pay_asset,
            });
        }

        let order = Order {
            id: OrderId::new(),
            seller: new_order.seller,
            buyer: new_order.buyer,
            sell_asset: new_order.sell_asset,
            sell_amount: new_order.sell_amount,
            pay_asset: new_order.pay_asset,
            pay_amount: new_order.pay_amount,
            status: OrderStatus::Pending,
            expiry: new_order.expiry,
            created_at: now,
            updated_at: now,
        };
        let order_id = order.id;

        self.by_principal
            .entry(order.seller)
            .or_default()
            .push(order_id);
        self.by_principal
            .entry(order.buyer)
            .or_default()
            .push(order_id);

        self.audit.record(
            EventKind::OrderCreated,
            order.seller,
            order_id.to_string(),
            serde_json::to_vec(&order).unwrap_or_default(),
            now,
        );
        tracing::info!(%order_id, seller = %order.seller, buyer = %order.buyer, "order created");

        self.orders.insert(order_id, order);
        Ok(order_id)
    }

    /// Cancel a pending order. Either counterparty may cancel.
    ///
    /// # Errors
    /// - `OrderNotFound` for an unknown id
    /// - `OrderExpired` if the expiry passed while the order was pending
    /// - `AlreadyFinalized` if the order is not pending
    /// - `Unauthorized` if the caller is neither seller nor buyer
    pub fn cancel_order(
        &mut self,
        clock: &dyn Clock,
        caller: PrincipalId,
        order_id: OrderId,
    ) -> Result<()> {
        let now = clock.now();
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(ClearlockError::OrderNotFound(order_id))?;

        // Re-check the window before mutating, never a cached status.
        if order.is_expired(now) {
            return Err(ClearlockError::OrderExpired(order_id));
        }
        if order.status != OrderStatus::Pending {
            return Err(ClearlockError::AlreadyFinalized);
        }
        if !order.involves(caller) {
            return Err(ClearlockError::Unauthorized {
                reason: format!("{caller} is neither seller nor buyer of {order_id}"),
            });
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = now;

        let payload = serde_json::to_vec(&*order).unwrap_or_default();
        self.audit.record(
            EventKind::OrderCancelled,
            caller,
            order_id.to_string(),
            payload,
            now,
        );
        tracing::info!(%order_id, %caller, "order cancelled");
        Ok(())
    }

    /// Snapshot an order for execution, enforcing the direct-path
    /// preconditions: exists, pending, unexpired, caller is the buyer.
    ///
    /// # Errors
    /// `OrderNotFound`, `OrderExpired`, `AlreadyFinalized`, `Unauthorized`.
    pub fn snapshot_executable(
        &self,
        clock: &dyn Clock,
        caller: PrincipalId,
        order_id: OrderId,
    ) -> Result<Order> {
        let now = clock.now();
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ClearlockError::OrderNotFound(order_id))?;

        if order.is_expired(now) {
            return Err(ClearlockError::OrderExpired(order_id));
        }
        if order.status != OrderStatus::Pending {
            // Tie-break: a second execution attempt observes the
            // post-transition state and fails fast.
            return Err(ClearlockError::AlreadyFinalized);
        }
        if caller != order.buyer {
            return Err(ClearlockError::Unauthorized {
                reason: format!("only the buyer may execute {order_id}"),
            });
        }
        Ok(order.clone())
    }

    /// Advance a pending order through LOCKED to EXECUTED in one logical
    /// step. Called by the settlement processor after the dual-leg swap
    /// has committed.
    ///
    /// # Errors
    /// `OrderNotFound` or `AlreadyFinalized` if the order is not pending.
    pub fn finalize_execution(
        &mut self,
        clock: &dyn Clock,
        caller: PrincipalId,
        order_id: OrderId,
    ) -> Result<()> {
        let now = clock.now();
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(ClearlockError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(ClearlockError::AlreadyFinalized);
        }

        // pending → locked → executed collapses into one logical step:
        // the swap has already committed by the time this is called.
        order.status = OrderStatus::Executed;
        order.updated_at = now;

        let payload = serde_json::to_vec(&*order).unwrap_or_default();
        self.audit.record(
            EventKind::OrderExecuted,
            caller,
            order_id.to_string(),
            payload,
            now,
        );
        tracing::info!(%order_id, %caller, "order executed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    /// Look up an order by id.
    #[must_use]
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Whether an order exists.
    #[must_use]
    pub fn exists(&self, order_id: OrderId) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// The status as observed now (lazy expiry, no mutation).
    pub fn status(&self, clock: &dyn Clock, order_id: OrderId) -> Result<OrderStatus> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ClearlockError::OrderNotFound(order_id))?;
        Ok(order.effective_status(clock.now()))
    }

    /// Whether the order's expiry has passed while pending.
    pub fn is_expired(&self, clock: &dyn Clock, order_id: OrderId) -> Result<bool> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or(ClearlockError::OrderNotFound(order_id))?;
        Ok(order.is_expired(clock.now()))
    }

    /// All orders a principal participates in, creation order.
    #[must_use]
    pub fn orders_for(&self, principal: PrincipalId) -> Vec<&Order> {
        self.by_principal
            .get(&principal)
            .map(|ids| ids.iter().filter_map(|id| self.orders.get(id)).collect())
            .unwrap_or_default()
    }

    /// Number of orders ever admitted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.orders.len()
    }

    /// The registry's append-only audit trail.
    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
