//! Delayed settlement requests and best-effort batches.
//!
//! A request carries an explicit settlement delay instead of an expiry and
//! may only be executed once the delay has elapsed. Batches group requests
//! for bulk execution; a member failure never aborts its siblings — this is
//! the one place partial failure is a designed outcome, not a defect.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clearlock_ledger::{BalanceLedger, Clock, ComplianceOracle, TransferLeg};
use clearlock_types::{
    BatchId, BatchOutcome, BatchStatus, ClearlockError, EventKind, NewSettlementRequest,
    PrincipalId, RequestId, RequestStatus, Result, Settlement, SettlementBatch, SettlementConfig,
    SettlementId, SettlementRequest, SettlementSource, SettlementStatus,
};

use crate::SettlementProcessor;

impl SettlementProcessor {
    /// Admit a delayed settlement request.
    ///
    /// Same validation as order creation, keyed by `settlement_delay`
    /// instead of an expiry. A missing delay falls back to the configured
    /// default; the settlement window is snapshotted at creation so later
    /// config updates never apply retroactively.
    ///
    /// # Errors
    /// `InvalidOrder` for malformed parameters, `ComplianceRejected` when
    /// the oracle denies either (holder, asset) pair.
    pub fn request_settlement(
        &mut self,
        oracle: &dyn ComplianceOracle,
        clock: &dyn Clock,
        new_request: NewSettlementRequest,
    ) -> Result<RequestId> {
        let now = clock.now();

        if new_request.sell_amount <= Decimal::ZERO || new_request.pay_amount <= Decimal::ZERO {
            return Err(ClearlockError::InvalidOrder {
                reason: "amounts must be positive on both legs".to_string(),
            });
        }
        if new_request.seller == new_request.buyer {
            return Err(ClearlockError::InvalidOrder {
                reason: "seller and buyer must differ".to_string(),
            });
        }
        if !oracle.is_compliant(new_request.seller, &new_request.sell_asset) {
            return Err(ClearlockError::ComplianceRejected {
                principal: new_request.seller,
                asset: new_request.sell_asset,
            });
        }
        if !oracle.is_compliant(new_request.buyer, &new_request.pay_asset) {
            return Err(ClearlockError::ComplianceRejected {
                principal: new_request.buyer,
                asset: new_request.pay_asset,
            });
        }

        let request = SettlementRequest {
            id: RequestId::new(),
            seller: new_request.seller,
            buyer: new_request.buyer,
            sell_asset: new_request.sell_asset,
            sell_amount: new_request.sell_amount,
            pay_asset: new_request.pay_asset,
            pay_amount: new_request.pay_amount,
            settlement_type: new_request.settlement_type,
            settlement_delay_secs: new_request
                .settlement_delay_secs
                .unwrap_or(self.config.default_settlement_delay_secs),
            settlement_window_secs: self.config.settlement_window_secs,
            status: RequestStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        let request_id = request.id;

        self.requests_by_principal
            .entry(request.seller)
            .or_default()
            .push(request_id);
        self.requests_by_principal
            .entry(request.buyer)
            .or_default()
            .push(request_id);

        self.audit.record(
            EventKind::SettlementRequested,
            request.seller,
            request_id.to_string(),
            serde_json::to_vec(&request).unwrap_or_default(),
            now,
        );
        tracing::info!(%request_id, delay_secs = request.settlement_delay_secs, "settlement requested");

        self.requests.insert(request_id, request);
        Ok(request_id)
    }

    /// Execute an eligible settlement request.
    ///
    /// Transfer-primitive failure is recorded on the request and in a
    /// failed settlement record — never retried automatically — and the
    /// original error is still reported to the caller.
    ///
    /// # Errors
    /// - `RequestNotFound` for an unknown id
    /// - `AlreadyFinalized` if the request is no longer pending
    /// - `NotYetEligible` before `created_at + settlement_delay`
    /// - `SettlementWindowClosed` once the grace window has passed
    /// - `InsufficientBalance` when a leg cannot be covered
    pub fn execute_settlement(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        request_id: RequestId,
    ) -> Result<SettlementId> {
        let now = clock.now();
        let request = self
            .requests
            .get(&request_id)
            .ok_or(ClearlockError::RequestNotFound(request_id))?;

        if request.status != RequestStatus::Pending {
            return Err(ClearlockError::AlreadyFinalized);
        }
        if !request.is_eligible(now) {
            return Err(ClearlockError::NotYetEligible {
                eligible_at: request.eligible_at(),
            });
        }
        if request.is_stale(now) {
            self.fail_request(request_id, "settlement window closed", caller, now);
            return Err(ClearlockError::SettlementWindowClosed(request_id));
        }

        let request = self.requests[&request_id].clone();
        let swap_result = ledger.swap(
            &TransferLeg {
                from: request.seller,
                to: request.buyer,
                asset: request.sell_asset.clone(),
                amount: request.sell_amount,
            },
            &TransferLeg {
                from: request.buyer,
                to: request.seller,
                asset: request.pay_asset.clone(),
                amount: request.pay_amount,
            },
        );

        match swap_result {
            Ok(()) => {
                if let Some(stored) = self.requests.get_mut(&request_id) {
                    stored.status = RequestStatus::Completed;
                    stored.updated_at = now;
                }
                let settlement_id =
                    self.record_outcome(&request, SettlementStatus::Completed, None, caller, now);
                tracing::info!(%request_id, %settlement_id, "settlement request executed");
                Ok(settlement_id)
            }
            Err(err) => {
                let reason = err.to_string();
                self.fail_request(request_id, &reason, caller, now);
                self.record_outcome(
                    &request,
                    SettlementStatus::Failed,
                    Some(reason),
                    caller,
                    now,
                );
                Err(err)
            }
        }
    }

    /// Group pending requests into a named batch.
    ///
    /// # Errors
    /// - `BatchingDisabled` when turned off by configuration
    /// - `InvalidBatch` for an empty list, an oversized list, or an
    ///   unknown member id
    pub fn create_settlement_batch(
        &mut self,
        clock: &dyn Clock,
        caller: PrincipalId,
        name: impl Into<String>,
        members: Vec<RequestId>,
    ) -> Result<BatchId> {
        if !self.config.batch_settlement_enabled {
            return Err(ClearlockError::BatchingDisabled);
        }
        if members.is_empty() {
            return Err(ClearlockError::InvalidBatch {
                reason: "batch must contain at least one request".to_string(),
            });
        }
        if members.len() > self.config.max_batch_size {
            return Err(ClearlockError::InvalidBatch {
                reason: format!(
                    "batch size {} exceeds configured maximum {}",
                    members.len(),
                    self.config.max_batch_size
                ),
            });
        }
        if let Some(unknown) = members.iter().find(|id| !self.requests.contains_key(id)) {
            return Err(ClearlockError::InvalidBatch {
                reason: format!("unknown request {unknown}"),
            });
        }

        let now = clock.now();
        let batch = SettlementBatch {
            id: BatchId::new(),
            name: name.into(),
            members,
            status: BatchStatus::Created,
            outcome: None,
            created_at: now,
            executed_at: None,
        };
        let batch_id = batch.id;

        self.audit.record(
            EventKind::BatchCreated,
            caller,
            batch_id.to_string(),
            serde_json::to_vec(&batch).unwrap_or_default(),
            now,
        );
        tracing::info!(%batch_id, members = batch.members.len(), "settlement batch created");

        self.batches.insert(batch_id, batch);
        Ok(batch_id)
    }

    /// Execute every member of a batch, best-effort.
    ///
    /// Members no longer pending (already settled elsewhere) or not yet
    /// eligible are skipped, not re-attempted. A member whose transfer
    /// fails is counted and left failed; its siblings still execute. The
    /// batch finishes EXECUTED with per-member counts in the completion
    /// record.
    ///
    /// # Errors
    /// `BatchNotFound` for an unknown id, `AlreadyFinalized` if the batch
    /// has already been executed.
    pub fn execute_settlement_batch(
        &mut self,
        ledger: &mut BalanceLedger,
        clock: &dyn Clock,
        caller: PrincipalId,
        batch_id: BatchId,
    ) -> Result<BatchOutcome> {
        let batch = self
            .batches
            .get(&batch_id)
            .ok_or(ClearlockError::BatchNotFound(batch_id))?;
        if batch.status == BatchStatus::Executed {
            return Err(ClearlockError::AlreadyFinalized);
        }
        let members = batch.members.clone();

        let mut outcome = BatchOutcome::default();
        for request_id in members {
            let now = clock.now();
            let eligible_pending = self
                .requests
                .get(&request_id)
                .is_some_and(|r| r.status == RequestStatus::Pending && r.is_eligible(now));
            if !eligible_pending {
                outcome.skipped += 1;
                continue;
            }
            match self.execute_settlement(ledger, clock, caller, request_id) {
                Ok(_) => outcome.succeeded += 1,
                Err(err) => {
                    // Per-member failure isolation: record and move on.
                    tracing::warn!(%batch_id, %request_id, %err, "batch member failed");
                    outcome.failed += 1;
                }
            }
        }

        let now = clock.now();
        let batch = self
            .batches
            .get_mut(&batch_id)
            .ok_or(ClearlockError::BatchNotFound(batch_id))?;
        batch.status = BatchStatus::Executed;
        batch.outcome = Some(outcome);
        batch.executed_at = Some(now);

        let payload = serde_json::to_vec(&*batch).unwrap_or_default();
        self.audit.record(
            EventKind::BatchExecuted,
            caller,
            batch_id.to_string(),
            payload,
            now,
        );
        tracing::info!(
            %batch_id,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "settlement batch executed"
        );
        Ok(outcome)
    }

    // -----------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------

    /// Current policy knobs.
    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Replace the policy knobs. Validated before taking effect; applies
    /// to future requests only — existing requests keep their snapshotted
    /// delay and window.
    ///
    /// # Errors
    /// `Configuration` if any knob fails validation; the previous
    /// configuration stays in force.
    pub fn update_config(
        &mut self,
        clock: &dyn Clock,
        caller: PrincipalId,
        new_config: SettlementConfig,
    ) -> Result<()> {
        new_config.validate()?;
        let now = clock.now();
        self.audit.record(
            EventKind::ConfigUpdated,
            caller,
            "settlement-config",
            serde_json::to_vec(&new_config).unwrap_or_default(),
            now,
        );
        tracing::info!(?new_config, "settlement configuration updated");
        self.config = new_config;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------

    /// Look up a settlement request.
    #[must_use]
    pub fn request(&self, request_id: RequestId) -> Option<&SettlementRequest> {
        self.requests.get(&request_id)
    }

    /// All requests a principal participates in, creation order.
    #[must_use]
    pub fn requests_for(&self, principal: PrincipalId) -> Vec<&SettlementRequest> {
        self.requests_by_principal
            .get(&principal)
            .map(|ids| ids.iter().filter_map(|id| self.requests.get(id)).collect())
            .unwrap_or_default()
    }

    /// Look up a batch.
    #[must_use]
    pub fn batch(&self, batch_id: BatchId) -> Option<&SettlementBatch> {
        self.batches.get(&batch_id)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn fail_request(
        &mut self,
        request_id: RequestId,
        reason: &str,
        caller: PrincipalId,
        now: DateTime<Utc>,
    ) {
        if let Some(request) = self.requests.get_mut(&request_id) {
            request.status = RequestStatus::Failed;
            request.failure_reason = Some(reason.to_string());
            request.updated_at = now;
            let payload = serde_json::to_vec(&*request).unwrap_or_default();
            self.audit.record(
                EventKind::SettlementFailed,
                caller,
                request_id.to_string(),
                payload,
                now,
            );
            tracing::warn!(%request_id, reason, "settlement request failed");
        }
    }

    fn record_outcome(
        &mut self,
        request: &SettlementRequest,
        status: SettlementStatus,
        failure_reason: Option<String>,
        caller: PrincipalId,
        now: DateTime<Utc>,
    ) -> SettlementId {
        let settlement = Settlement {
            id: SettlementId::new(),
            source: SettlementSource::Request(request.id),
            escrow_id: None,
            seller: request.seller,
            buyer: request.buyer,
            sell_asset: request.sell_asset.clone(),
            sell_amount: request.sell_amount,
            pay_asset: request.pay_asset.clone(),
            pay_amount: request.pay_amount,
            status,
            failure_reason,
            settled_at: now,
        };
        let settlement_id = settlement.id;
        if status == SettlementStatus::Completed {
            self.audit.record(
                EventKind::SettlementExecuted,
                caller,
                settlement_id.to_string(),
                serde_json::to_vec(&settlement).unwrap_or_default(),
                now,
            );
        }
        self.settlements.push(settlement);
        settlement_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use clearlock_ledger::{AllowListOracle, ManualClock};
    use clearlock_types::SettlementType;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    struct Fixture {
        processor: SettlementProcessor,
        ledger: BalanceLedger,
        oracle: AllowListOracle,
        clock: ManualClock,
        seller: PrincipalId,
        buyer: PrincipalId,
        operator: PrincipalId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut ledger = BalanceLedger::new();
            let seller = PrincipalId::new();
            let buyer = PrincipalId::new();
            ledger.deposit(seller, "GOLD-T", dec(1000));
            ledger.deposit(buyer, "USDC", dec(1_000_000));
            Self {
                processor: SettlementProcessor::new(),
                ledger,
                oracle: AllowListOracle::permissive(),
                clock: ManualClock::starting_now(),
                seller,
                buyer,
                operator: PrincipalId::new(),
            }
        }

        fn request(&mut self, delay_secs: u64) -> RequestId {
            self.request_between(self.seller, self.buyer, delay_secs)
        }

        fn request_between(
            &mut self,
            seller: PrincipalId,
            buyer: PrincipalId,
            delay_secs: u64,
        ) -> RequestId {
            self.processor
                .request_settlement(
                    &self.oracle,
                    &self.clock,
                    NewSettlementRequest {
                        seller,
                        buyer,
                        sell_asset: "GOLD-T".to_string(),
                        sell_amount: dec(10),
                        pay_asset: "USDC".to_string(),
                        pay_amount: dec(5000),
                        settlement_type: SettlementType::DeliveryVersusPayment,
                        settlement_delay_secs: Some(delay_secs),
                    },
                )
                .unwrap()
        }
    }

    #[test]
    fn request_defaults_delay_and_window_from_config() {
        let mut fx = Fixture::new();
        let request_id = fx
            .processor
            .request_settlement(
                &fx.oracle,
                &fx.clock,
                NewSettlementRequest {
                    seller: fx.seller,
                    buyer: fx.buyer,
                    sell_asset: "GOLD-T".to_string(),
                    sell_amount: dec(1),
                    pay_asset: "USDC".to_string(),
                    pay_amount: dec(500),
                    settlement_type: SettlementType::Exchange,
                    settlement_delay_secs: None,
                },
            )
            .unwrap();

        let request = fx.processor.request(request_id).unwrap();
        assert_eq!(
            request.settlement_delay_secs,
            fx.processor.config().default_settlement_delay_secs
        );
        assert_eq!(
            request.settlement_window_secs,
            fx.processor.config().settlement_window_secs
        );
    }

    #[test]
    fn execute_before_delay_not_yet_eligible() {
        let mut fx = Fixture::new();
        let request_id = fx.request(60);

        let err = fx
            .processor
            .execute_settlement(&mut fx.ledger, &fx.clock, fx.buyer, request_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::NotYetEligible { .. }));
        assert_eq!(
            fx.processor.request(request_id).unwrap().status,
            RequestStatus::Pending
        );
    }

    #[test]
    fn execute_after_delay_completes() {
        let mut fx = Fixture::new();
        let request_id = fx.request(60);
        fx.clock.advance(Duration::seconds(60));

        let settlement_id = fx
            .processor
            .execute_settlement(&mut fx.ledger, &fx.clock, fx.buyer, request_id)
            .unwrap();

        assert_eq!(fx.ledger.available(fx.buyer, "GOLD-T"), dec(10));
        assert_eq!(fx.ledger.available(fx.seller, "USDC"), dec(5000));
        assert_eq!(
            fx.processor.request(request_id).unwrap().status,
            RequestStatus::Completed
        );
        assert_eq!(
            fx.processor.settlement(settlement_id).unwrap().status,
            SettlementStatus::Completed
        );

        // Re-execution is blocked.
        let err = fx
            .processor
            .execute_settlement(&mut fx.ledger, &fx.clock, fx.buyer, request_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
    }

    #[test]
    fn transfer_failure_recorded_not_retried() {
        let mut fx = Fixture::new();
        let broke = PrincipalId::new(); // no balance at all
        let request_id = fx.request_between(fx.seller, broke, 1);
        fx.clock.advance(Duration::seconds(1));

        let err = fx
            .processor
            .execute_settlement(&mut fx.ledger, &fx.clock, broke, request_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InsufficientBalance { .. }));

        let request = fx.processor.request(request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Failed);
        assert!(request.failure_reason.is_some());

        // A failed settlement record exists; nothing moved.
        let failed = fx
            .processor
            .settlements()
            .iter()
            .find(|s| s.source == SettlementSource::Request(request_id))
            .unwrap();
        assert_eq!(failed.status, SettlementStatus::Failed);
        assert_eq!(fx.ledger.available(fx.seller, "GOLD-T"), dec(1000));
    }

    #[test]
    fn stale_request_window_closed() {
        let mut fx = Fixture::new();
        let request_id = fx.request(60);
        let window = fx.processor.config().settlement_window_secs;
        fx.clock
            .advance(Duration::seconds(i64::try_from(60 + window).unwrap() + 1));

        let err = fx
            .processor
            .execute_settlement(&mut fx.ledger, &fx.clock, fx.buyer, request_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::SettlementWindowClosed(_)));
        assert_eq!(
            fx.processor.request(request_id).unwrap().status,
            RequestStatus::Failed
        );
    }

    #[test]
    fn batch_validation() {
        let mut fx = Fixture::new();
        let err = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "empty", vec![])
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidBatch { .. }));

        let err = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "ghost", vec![RequestId::new()])
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidBatch { .. }));

        let small = SettlementConfig {
            max_batch_size: 2,
            ..SettlementConfig::default()
        };
        fx.processor
            .update_config(&fx.clock, fx.operator, small)
            .unwrap();
        let r1 = fx.request(1);
        let r2 = fx.request(1);
        let r3 = fx.request(1);
        let err = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "too-big", vec![r1, r2, r3])
            .unwrap_err();
        assert!(matches!(err, ClearlockError::InvalidBatch { .. }));
    }

    #[test]
    fn batching_disabled_rejected() {
        let mut fx = Fixture::new();
        let r1 = fx.request(1);
        let cfg = SettlementConfig {
            batch_settlement_enabled: false,
            ..SettlementConfig::default()
        };
        fx.processor
            .update_config(&fx.clock, fx.operator, cfg)
            .unwrap();

        let err = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "off", vec![r1])
            .unwrap_err();
        assert!(matches!(err, ClearlockError::BatchingDisabled));
    }

    #[test]
    fn batch_partial_failure_isolates_members() {
        let mut fx = Fixture::new();
        let broke = PrincipalId::new();
        let r1 = fx.request(1);
        let r2 = fx.request_between(fx.seller, broke, 1); // will fail: no funds
        let r3 = fx.request(1);
        let batch_id = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "eod", vec![r1, r2, r3])
            .unwrap();
        fx.clock.advance(Duration::seconds(1));

        let outcome = fx
            .processor
            .execute_settlement_batch(&mut fx.ledger, &fx.clock, fx.operator, batch_id)
            .unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(
            fx.processor.request(r1).unwrap().status,
            RequestStatus::Completed
        );
        assert_eq!(
            fx.processor.request(r2).unwrap().status,
            RequestStatus::Failed
        );
        assert_eq!(
            fx.processor.request(r3).unwrap().status,
            RequestStatus::Completed
        );

        let batch = fx.processor.batch(batch_id).unwrap();
        assert_eq!(batch.status, BatchStatus::Executed);
        assert_eq!(batch.outcome, Some(outcome));
    }

    #[test]
    fn batch_skips_settled_and_ineligible_members() {
        let mut fx = Fixture::new();
        let r1 = fx.request(1);
        let r2 = fx.request(3600); // not eligible at execution time
        let batch_id = fx
            .processor
            .create_settlement_batch(&fx.clock, fx.operator, "mixed", vec![r1, r2])
            .unwrap();
        fx.clock.advance(Duration::seconds(2));

        // r1 settles individually first; the batch must skip it.
        fx.processor
            .execute_settlement(&mut fx.ledger, &fx.clock, fx.buyer, r1)
            .unwrap();

        let outcome = fx
            .processor
            .execute_settlement_batch(&mut fx.ledger, &fx.clock, fx.operator, batch_id)
            .unwrap();
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.skipped, 2);

        // A batch executes once.
        let err = fx
            .processor
            .execute_settlement_batch(&mut fx.ledger, &fx.clock, fx.operator, batch_id)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::AlreadyFinalized));
    }

    #[test]
    fn config_update_not_retroactive() {
        let mut fx = Fixture::new();
        let request_id = fx.request(60);

        let cfg = SettlementConfig {
            default_settlement_delay_secs: 7200,
            settlement_window_secs: 10,
            ..SettlementConfig::default()
        };
        fx.processor
            .update_config(&fx.clock, fx.operator, cfg)
            .unwrap();

        // The existing request keeps its snapshotted delay and window.
        let request = fx.processor.request(request_id).unwrap();
        assert_eq!(request.settlement_delay_secs, 60);
        assert_eq!(
            request.settlement_window_secs,
            SettlementConfig::default().settlement_window_secs
        );
    }

    #[test]
    fn invalid_config_update_rejected() {
        let mut fx = Fixture::new();
        let cfg = SettlementConfig {
            max_batch_size: 0,
            ..SettlementConfig::default()
        };
        let err = fx
            .processor
            .update_config(&fx.clock, fx.operator, cfg)
            .unwrap_err();
        assert!(matches!(err, ClearlockError::Configuration(_)));
        // Previous config still in force.
        assert_eq!(
            fx.processor.config().max_batch_size,
            SettlementConfig::default().max_batch_size
        );
    }

    #[test]
    fn requests_for_indexes_both_parties() {
        let mut fx = Fixture::new();
        fx.request(1);
        fx.request(1);
        assert_eq!(fx.processor.requests_for(fx.seller).len(), 2);
        assert_eq!(fx.processor.requests_for(fx.buyer).len(), 2);
        assert!(fx.processor.requests_for(fx.operator).is_empty());
    }
}
