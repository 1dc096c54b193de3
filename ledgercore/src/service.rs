//! The account service: the orchestrator between commands, the aggregate,
//! and the stores.
//!
//! Every command reloads its aggregate from the latest snapshot plus the
//! event tail, dispatches to a handler, appends the drained events under the
//! optimistic lock, and conditionally persists a fresh snapshot. Nothing is
//! cached between commands; concurrent writers against one account are
//! serialized by the store's version check, not by locks held across reads.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use crate::aggregate::Account;
use crate::commands::{
    ConvertCurrency, CreateAccount, Deposit, GetBalance, GetHistory, TransferMoney, Withdraw,
};
use crate::errors::{AccountError, LedgerError, LedgerResult};
use crate::event::LedgerEvent;
use crate::event_store::EventStore;
use crate::money::Currency;
use crate::rates::ExchangeRateProvider;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::types::{AccountId, EventVersion, TransferId};

/// How many events an account accrues between snapshots, by default.
pub const DEFAULT_SNAPSHOT_FREQUENCY: u64 = 100;

/// Orchestrates account commands and queries over injected stores.
///
/// Generic over its three seams so tests and deployments can swap adapters
/// freely. Holds no mutable state of its own.
#[derive(Debug, Clone)]
pub struct LedgerService<ES, SS, RP> {
    event_store: ES,
    snapshot_store: SS,
    rates: RP,
    snapshot_frequency: u64,
}

impl<ES, SS, RP> LedgerService<ES, SS, RP>
where
    ES: EventStore,
    SS: SnapshotStore,
    RP: ExchangeRateProvider,
{
    /// Builds a service over the given stores and rate provider.
    pub fn new(event_store: ES, snapshot_store: SS, rates: RP) -> Self {
        Self {
            event_store,
            snapshot_store,
            rates,
            snapshot_frequency: DEFAULT_SNAPSHOT_FREQUENCY,
        }
    }

    /// Overrides the snapshot frequency.
    ///
    /// # Panics
    ///
    /// Panics if `frequency` is zero.
    #[must_use]
    pub fn with_snapshot_frequency(mut self, frequency: u64) -> Self {
        assert!(frequency > 0, "snapshot frequency must be positive");
        self.snapshot_frequency = frequency;
        self
    }

    // --- Commands ---

    /// Creates an account, generating an id when the command carries none.
    pub async fn create_account(&self, cmd: CreateAccount) -> LedgerResult<AccountId> {
        let account_id = match cmd.account_id {
            Some(id) => id,
            None => {
                let id = AccountId::generate();
                info!(account = %id, "no account id provided, generated one");
                id
            }
        };

        match self.load_account(&account_id).await {
            Ok(existing) => {
                return Err(AccountError::AccountExists {
                    id: account_id,
                    version: existing.version(),
                }
                .into());
            }
            Err(LedgerError::AccountNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let mut account = Account::new(account_id.clone());
        account.handle_create_account(&cmd.initial_balances)?;

        let changes = account.drain_pending_changes();
        self.event_store
            .append(&account_id, EventVersion::initial(), changes)
            .await?;
        info!(account = %account_id, version = %account.version(), "account created");

        self.save_snapshot_if_due(&account).await;
        Ok(account_id)
    }

    /// Deposits money into an account.
    pub async fn deposit(&self, cmd: Deposit) -> LedgerResult<()> {
        let mut account = self.load_account(&cmd.account_id).await?;
        let initial_version = account.version();

        account.handle_deposit(cmd.amount, cmd.currency)?;

        let changes = account.drain_pending_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.event_store
            .append(&cmd.account_id, initial_version, changes)
            .await?;
        info!(
            account = %cmd.account_id,
            amount = %cmd.amount,
            currency = %cmd.currency,
            version = %account.version(),
            "deposit applied"
        );

        self.save_snapshot_if_due(&account).await;
        Ok(())
    }

    /// Withdraws money from an account.
    pub async fn withdraw(&self, cmd: Withdraw) -> LedgerResult<()> {
        let mut account = self.load_account(&cmd.account_id).await?;
        let initial_version = account.version();

        if let Err(err) = account.handle_withdraw(cmd.amount, cmd.currency) {
            if matches!(err, AccountError::InsufficientFunds { .. }) {
                info!(account = %cmd.account_id, "withdrawal rejected: {err}");
            }
            return Err(err.into());
        }

        let changes = account.drain_pending_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.event_store
            .append(&cmd.account_id, initial_version, changes)
            .await?;
        info!(
            account = %cmd.account_id,
            amount = %cmd.amount,
            currency = %cmd.currency,
            version = %account.version(),
            "withdrawal applied"
        );

        self.save_snapshot_if_due(&account).await;
        Ok(())
    }

    /// Converts part of one balance into another currency, at the oracle's rate.
    pub async fn convert_currency(&self, cmd: ConvertCurrency) -> LedgerResult<()> {
        let mut account = self.load_account(&cmd.account_id).await?;
        let initial_version = account.version();

        let rate = self.rates.rate(cmd.from_currency, cmd.to_currency).await?;

        if let Err(err) = account.handle_convert_currency(
            cmd.from_amount,
            cmd.from_currency,
            cmd.to_currency,
            rate,
        ) {
            if matches!(err, AccountError::InsufficientFunds { .. }) {
                info!(account = %cmd.account_id, "conversion rejected: {err}");
            }
            return Err(err.into());
        }

        let changes = account.drain_pending_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.event_store
            .append(&cmd.account_id, initial_version, changes)
            .await?;
        info!(
            account = %cmd.account_id,
            amount = %cmd.from_amount,
            from = %cmd.from_currency,
            to = %cmd.to_currency,
            %rate,
            version = %account.version(),
            "conversion applied"
        );

        self.save_snapshot_if_due(&account).await;
        Ok(())
    }

    /// Moves money between two accounts in the same currency.
    ///
    /// This is not atomic across the two aggregates. The debit leg commits
    /// first; if the credit leg then fails, the error names the transfer id
    /// and both accounts so an operator or saga can compensate. The returned
    /// [`TransferId`] correlates the two `MoneyTransferred` events.
    pub async fn transfer_money(&self, cmd: TransferMoney) -> LedgerResult<TransferId> {
        let mut source = self.load_account(&cmd.source_account_id).await?;
        let source_version = source.version();

        let mut target = match self.load_account(&cmd.target_account_id).await {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound(id)) => {
                warn!(target = %id, "transfer aborted: target account not found");
                return Err(LedgerError::AccountNotFound(id));
            }
            Err(err) => return Err(err),
        };
        let target_version = target.version();

        let transfer_id = TransferId::generate();

        // Debit leg: any failure here aborts with no effect anywhere.
        source.handle_initiate_transfer(
            transfer_id.clone(),
            &cmd.target_account_id,
            cmd.amount,
            cmd.currency,
            cmd.amount,
            cmd.currency,
            Decimal::ONE,
        )?;
        let debit_leg = source.drain_pending_changes();
        if !debit_leg.is_empty() {
            self.event_store
                .append(&cmd.source_account_id, source_version, debit_leg)
                .await?;
            debug!(
                transfer = %transfer_id,
                source = %cmd.source_account_id,
                version = %source.version(),
                "transfer debit committed"
            );
            self.save_snapshot_if_due(&source).await;
        }

        // Credit leg: the debit is already durable, so a failure past this
        // point leaves the ledger inconsistent.
        if let Err(err) = self
            .credit_leg(&cmd, &mut target, target_version, &transfer_id)
            .await
        {
            error!(
                transfer = %transfer_id,
                source = %cmd.source_account_id,
                target = %cmd.target_account_id,
                "transfer inconsistent: source debited but credit failed: {err}"
            );
            return Err(LedgerError::TransferInconsistent {
                transfer_id,
                debited: cmd.source_account_id,
                target: cmd.target_account_id,
                reason: err.to_string(),
            });
        }

        info!(
            transfer = %transfer_id,
            source = %cmd.source_account_id,
            target = %cmd.target_account_id,
            amount = %cmd.amount,
            currency = %cmd.currency,
            "transfer completed"
        );
        Ok(transfer_id)
    }

    async fn credit_leg(
        &self,
        cmd: &TransferMoney,
        target: &mut Account,
        target_version: EventVersion,
        transfer_id: &TransferId,
    ) -> LedgerResult<()> {
        target.handle_receive_transfer(
            transfer_id.clone(),
            &cmd.source_account_id,
            &cmd.target_account_id,
            cmd.amount,
            cmd.currency,
            cmd.amount,
            cmd.currency,
            Decimal::ONE,
        )?;
        let credit_leg = target.drain_pending_changes();
        if credit_leg.is_empty() {
            return Ok(());
        }
        self.event_store
            .append(&cmd.target_account_id, target_version, credit_leg)
            .await?;
        self.save_snapshot_if_due(target).await;
        Ok(())
    }

    // --- Queries ---

    /// Returns a copy of an account's balances.
    ///
    /// With a specific currency, the result holds exactly that entry, zero
    /// when the currency is not held; without one, all held balances.
    pub async fn current_balance(
        &self,
        query: GetBalance,
    ) -> LedgerResult<HashMap<Currency, Decimal>> {
        let account = self.load_account(&query.account_id).await?;
        match query.currency {
            Some(currency) => Ok(HashMap::from([(currency, account.balance(currency))])),
            None => Ok(account.balances().clone()),
        }
    }

    /// Returns a page of an account's event stream.
    ///
    /// An empty stream is disambiguated by attempting a load: an unknown
    /// account fails with [`LedgerError::AccountNotFound`], a known one
    /// returns an empty page.
    pub async fn transaction_history(&self, query: GetHistory) -> LedgerResult<Vec<LedgerEvent>> {
        let history = self.event_store.events(&query.account_id).await?;

        if history.is_empty() {
            self.load_account(&query.account_id).await?;
            return Ok(Vec::new());
        }

        let start = query.skip.min(history.len());
        let end = match query.limit {
            Some(limit) => start.saturating_add(limit).min(history.len()),
            None => history.len(),
        };
        Ok(history[start..end].to_vec())
    }

    // --- Aggregate loading & snapshotting ---

    async fn load_account(&self, account_id: &AccountId) -> LedgerResult<Account> {
        let mut account = Account::new(account_id.clone());
        let mut snapshot_version = EventVersion::initial();

        match self.snapshot_store.latest(account_id).await {
            Ok(Some(snapshot)) => match snapshot.restore() {
                Ok(restored) => {
                    snapshot_version = restored.version();
                    debug!(
                        account = %account_id,
                        version = %snapshot_version,
                        "loaded account state from snapshot"
                    );
                    account = restored;
                }
                Err(err) => {
                    warn!(
                        account = %account_id,
                        "failed to restore snapshot, replaying full stream: {err}"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                warn!(
                    account = %account_id,
                    "snapshot lookup failed, replaying full stream: {err}"
                );
            }
        }

        let tail = self
            .event_store
            .events_after(account_id, snapshot_version)
            .await?;
        if !tail.is_empty() {
            debug!(
                account = %account_id,
                events = tail.len(),
                after = %snapshot_version,
                "replaying event tail"
            );
            account.apply_all(&tail).map_err(|err| {
                error!(account = %account_id, "event stream is corrupt: {err}");
                LedgerError::from(err)
            })?;
        }

        if account.version() == EventVersion::initial() {
            return Err(LedgerError::AccountNotFound(account_id.clone()));
        }
        Ok(account)
    }

    async fn save_snapshot_if_due(&self, account: &Account) {
        let version = u64::from(account.version());
        if version == 0 || version % self.snapshot_frequency != 0 {
            return;
        }

        let snapshot = match Snapshot::capture(account) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(account = %account.id(), version, "failed to capture snapshot: {err}");
                return;
            }
        };
        match self.snapshot_store.save(snapshot).await {
            Ok(()) => debug!(account = %account.id(), version, "snapshot saved"),
            Err(err) => {
                warn!(account = %account.id(), version, "failed to save snapshot: {err}");
            }
        }
    }
}
