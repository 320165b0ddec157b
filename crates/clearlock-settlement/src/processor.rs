//! Direct settlement path and the escrow/settlement record stores.
//!
//! `execute_order` is the only place an order crosses from PENDING to
//! EXECUTED. The dual-leg transfer is one indivisible ledger operation:
//! the second concurrent caller on the same order observes it no longer
//! pending and fails fast with `AlreadyFinalized`.

use std::collections::HashMap;

use clearlock_ledger::{BalanceLedger, Clock, TransferLeg};
use clearlock_registry::OrderRegistry;
use clearlock_types::{
    AuditTrail, BatchId, Escrow, EscrowId, EscrowStatus, EventKind, Order, OrderId, PrincipalId,
    RequestId, Result, Settlement, SettlementBatch, SettlementConfig, SettlementId,
    SettlementRequest, SettlementSource, SettlementStatus,
};

/// The engine that realizes settlements against the balance ledger.
///
/// Owns every escrow and settlement record exclusively; owns the delayed
/// request and batch stores (see the `delayed` module).
#[derive(Debug, Default)]
pub struct SettlementProcessor {
    pub(crate) config: SettlementConfig,
    pub(crate) escrows: HashMap<EscrowId, Escrow>,
    pub(crate) escrow_by_order: HashMap<OrderId, EscrowId>,
    /// Append-only: one record per resolution attempt, oldest first.
    pub(crate) settlements: Vec<Settlement>,
    pub(crate) requests: HashMap<RequestId, SettlementRequest>,
    pub(crate) requests_by_principal: HashMap<PrincipalId, Vec<RequestId>>,
    pub(crate) batches: HashMap<BatchId, SettlementBatch>,
    pub(crate) audit: AuditTrail,
}

impl SettlementProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with explicit policy knobs.
    ///
    /// # Errors
    /// Returns `Configuration` if any knob fails validation.
    pub fn with_config(config: SettlementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Execute a pending order on behalf of its buyer.
    ///
    /// Both legs — seller→buyer delivery and buyer→seller payment — are
    /// realized as one indivisible ledger swap. On success the order is
    /// advanced to EXECUTED, an escrow record snapshots both legs, and a
    /// completed settlement record references it. On any failure nothing
    /// changes and the order remains pending.
    ///
    /// # Errors
    /// - `OrderNotFound` / `OrderExpired` / `AlreadyFinalized` /
    ///   `Unauthorized` from the registry preconditions
    /// - `InsufficientBalance` if either party cannot cover its leg
    pub fn execute_order(
        &mut self,
        registry: &mut OrderRegistry,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        order_id: OrderId,
    ) -> Result<SettlementId> {
        let order = registry.snapshot_executable(clock, caller, order_id)?;
        let now = clock.now();

        // Both legs or neither: the swap validates both debits before any
        // mutation, so a second-leg shortfall leaves the first untouched.
        ledger.swap(
            &TransferLeg {
                from: order.seller,
                to: order.buyer,
                asset: order.sell_asset.clone(),
                amount: order.sell_amount,
            },
            &TransferLeg {
                from: order.buyer,
                to: order.seller,
                asset: order.pay_asset.clone(),
                amount: order.pay_amount,
            },
        )?;

        // The swap has committed; advancing the order cannot be allowed to
        // fail for any reason a precondition check would not already have
        // caught, and snapshot_executable ran under the same serialized call.
        registry.finalize_execution(clock, caller, order_id)?;

        let escrow = self.open_settled_escrow(&order, caller, now);
        let settlement = Settlement {
            id: SettlementId::new(),
            source: SettlementSource::Order(order_id),
            escrow_id: Some(escrow),
            seller: order.seller,
            buyer: order.buyer,
            sell_asset: order.sell_asset,
            sell_amount: order.sell_amount,
            pay_asset: order.pay_asset,
            pay_amount: order.pay_amount,
            status: SettlementStatus::Completed,
            failure_reason: None,
            settled_at: now,
        };
        let settlement_id = settlement.id;

        self.audit.record(
            EventKind::SettlementExecuted,
            caller,
            settlement_id.to_string(),
            serde_json::to_vec(&settlement).unwrap_or_default(),
            now,
        );
        tracing::info!(%order_id, %settlement_id, "order settled");
        self.settlements.push(settlement);
        Ok(settlement_id)
    }

    /// Create the escrow record for an executed order. Both legs settled
    /// in the same logical step, so the record is opened and closed here.
    fn open_settled_escrow(
        &mut self,
        order: &Order,
        actor: PrincipalId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> EscrowId {
        let mut escrow = Escrow {
            id: EscrowId::new(),
            order_id: order.id,
            seller: order.seller,
            buyer: order.buyer,
            sell_asset: order.sell_asset.clone(),
            sell_amount: order.sell_amount,
            pay_asset: order.pay_asset.clone(),
            pay_amount: order.pay_amount,
            status: EscrowStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.audit.record(
            EventKind::EscrowOpened,
            actor,
            escrow.id.to_string(),
            serde_json::to_vec(&escrow).unwrap_or_default(),
            now,
        );

        escrow.status = EscrowStatus::Settled;
        self.audit.record(
            EventKind::EscrowSettled,
            actor,
            escrow.id.to_string(),
            serde_json::to_vec(&escrow).unwrap_or_default(),
            now,
        );

        let escrow_id = escrow.id;
        self.escrow_by_order.insert(order.id, escrow_id);
        self.escrows.insert(escrow_id, escrow);
        escrow_id
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    /// Look up an escrow record.
    #[must_use]
    pub fn escrow(&self, escrow_id: EscrowId) -> Option<&Escrow> {
        self.escrows.get(&escrow_id)
    }

    /// The escrow record created by executing `order_id`, if any.
    #[must_use]
    pub fn escrow_for_order(&self, order_id: OrderId) -> Option<&Escrow> {
        self.escrow_by_order
            .get(&order_id)
            .and_then(|id| self.escrows.get(id))
    }

    /// Look up a settlement record.
    #[must_use]
    pub fn settlement(&self, settlement_id: SettlementId) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id == settlement_id)
    }

    /// All settlement records, oldest first.
    #[must_use]
    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    /// Settlement records involving a principal, oldest first.
    #[must_use]
    pub fn settlements_for(&self, principal: PrincipalId) -> Vec<&Settlement> {
        self.settlements
            .iter()
            .filter(|s| s.seller == principal || s.buyer == principal)
            .collect()
    }

    /// The processor's append-only audit trail.
    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }
}
