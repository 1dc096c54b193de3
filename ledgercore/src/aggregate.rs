//! The account aggregate: the ledger's business-rule enforcer.
//!
//! Every command handler follows the same discipline: validate the input
//! against current state, construct the event at the next version, apply it
//! to self, and buffer it in the pending list for the service layer to
//! persist. A failed precondition leaves state untouched and emits nothing.
//!
//! Event application is the only way state changes. Applying a stored event
//! that would break an invariant (a negative balance, an out-of-sequence
//! version) is treated as log corruption, not as a recoverable rejection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

use crate::errors::{AccountError, AccountResult};
use crate::event::{
    AccountCreated, CurrencyConverted, DepositMade, EventPayload, LedgerEvent, MoneyTransferred,
    WithdrawalMade,
};
use crate::money::{BalanceEntry, Currency, Money};
use crate::types::{AccountId, EventVersion, TransferId};

/// A multi-currency account, reconstructed by folding its event stream.
///
/// An instance is owned by a single command call and never shared across
/// threads; concurrent commands against the same id race on the event-store
/// append instead. `version == 0` means the account has not been created yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    balances: HashMap<Currency, Decimal>,
    version: EventVersion,
    #[serde(skip)]
    pending: Vec<LedgerEvent>,
}

impl Account {
    /// A fresh, uncreated aggregate for the given identity.
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            balances: HashMap::new(),
            version: EventVersion::initial(),
            pending: Vec::new(),
        }
    }

    /// The aggregate identity.
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Number of events applied to this instance; `0` means uncreated.
    pub fn version(&self) -> EventVersion {
        self.version
    }

    /// All held balances.
    pub fn balances(&self) -> &HashMap<Currency, Decimal> {
        &self.balances
    }

    /// The held balance for one currency, zero if not held.
    pub fn balance(&self, currency: Currency) -> Decimal {
        self.balances.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Returns the events emitted since the last drain and clears the buffer.
    ///
    /// The service layer calls this exactly once per command, handing the
    /// result to the event store.
    pub fn drain_pending_changes(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn force_identity(&mut self, id: AccountId, version: EventVersion) {
        self.id = id;
        self.version = version;
    }

    // --- Command handlers ---

    /// Creates the account with the given opening balances.
    ///
    /// Fails with [`AccountError::AccountExists`] if any event was already
    /// applied, or [`AccountError::Domain`] on a negative opening amount.
    pub fn handle_create_account(
        &mut self,
        initial_balances: &HashMap<Currency, Decimal>,
    ) -> AccountResult<()> {
        if self.version != EventVersion::initial() {
            return Err(AccountError::AccountExists {
                id: self.id.clone(),
                version: self.version,
            });
        }

        let mut entries: Vec<BalanceEntry> = Vec::with_capacity(initial_balances.len());
        for (&currency, &amount) in initial_balances {
            if amount < Decimal::ZERO {
                return Err(AccountError::Domain(format!(
                    "initial balance for {currency} cannot be negative: {amount}"
                )));
            }
            entries.push(BalanceEntry { currency, amount });
        }
        entries.sort_by_key(|entry| entry.currency);

        self.emit(AccountCreated {
            initial_balances: entries,
        })
    }

    /// Deposits a positive amount of one currency.
    pub fn handle_deposit(&mut self, amount: Decimal, currency: Currency) -> AccountResult<()> {
        self.require_created("deposit to")?;
        if amount <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "deposit amount must be positive: {amount}"
            )));
        }

        self.emit(DepositMade { amount, currency })
    }

    /// Withdraws a positive amount, refusing to overdraw.
    pub fn handle_withdraw(&mut self, amount: Decimal, currency: Currency) -> AccountResult<()> {
        self.require_created("withdraw from")?;
        if amount <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "withdrawal amount must be positive: {amount}"
            )));
        }
        self.require_funds(amount, currency)?;

        self.emit(WithdrawalMade { amount, currency })
    }

    /// Converts part of one balance into another currency at the given rate.
    ///
    /// The credited amount is `from_amount * exchange_rate`, exact; rounding
    /// for display is the caller's concern.
    pub fn handle_convert_currency(
        &mut self,
        from_amount: Decimal,
        from_currency: Currency,
        to_currency: Currency,
        exchange_rate: Decimal,
    ) -> AccountResult<()> {
        self.require_created("convert currency for")?;
        if from_amount <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "conversion amount must be positive: {from_amount}"
            )));
        }
        if from_currency == to_currency {
            return Err(AccountError::Domain(format!(
                "cannot convert currency {from_currency} to itself"
            )));
        }
        if exchange_rate <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "exchange rate must be positive: {exchange_rate}"
            )));
        }
        self.require_funds(from_amount, from_currency)?;

        let to_amount = from_amount * exchange_rate;

        self.emit(CurrencyConverted {
            from_amount,
            from_currency,
            to_amount,
            to_currency,
            exchange_rate,
        })
    }

    /// Records the debit leg of a transfer to another account.
    ///
    /// Same-currency legs require matching debit and credit amounts; a rate
    /// other than `1` is coerced to `1` with a warning. Cross-currency legs
    /// require a positive rate; a credit amount that disagrees with
    /// `debit_amount * rate` is warned about and accepted.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_initiate_transfer(
        &mut self,
        transfer_id: TransferId,
        target_account_id: &AccountId,
        debit_amount: Decimal,
        debit_currency: Currency,
        credit_amount: Decimal,
        credit_currency: Currency,
        rate: Decimal,
    ) -> AccountResult<()> {
        self.require_created("transfer from")?;
        if debit_amount <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "transfer amount must be positive: {debit_amount}"
            )));
        }
        if target_account_id == &self.id {
            return Err(AccountError::Domain(
                "cannot transfer funds to the same account".to_owned(),
            ));
        }
        self.require_funds(debit_amount, debit_currency)?;

        let mut rate = rate;
        if debit_currency == credit_currency {
            if credit_amount != debit_amount {
                return Err(AccountError::Domain(format!(
                    "debit ({debit_amount}) and credit ({credit_amount}) amounts must match \
                     for same-currency transfer ({debit_currency})"
                )));
            }
            if rate != Decimal::ONE {
                warn!(
                    account = %self.id,
                    %rate,
                    currency = %debit_currency,
                    "rate for same-currency transfer was not 1; using 1"
                );
                rate = Decimal::ONE;
            }
        } else {
            if rate <= Decimal::ZERO {
                return Err(AccountError::Domain(format!(
                    "exchange rate must be positive for cross-currency transfer: {rate}"
                )));
            }
            let calculated = debit_amount * rate;
            if calculated != credit_amount {
                warn!(
                    account = %self.id,
                    provided = %credit_amount,
                    calculated = %calculated,
                    %rate,
                    "provided credit amount differs from the rate-derived amount"
                );
            }
        }

        self.emit(MoneyTransferred {
            transfer_id,
            source_account_id: self.id.clone(),
            target_account_id: target_account_id.clone(),
            debited_amount: debit_amount,
            debited_currency: debit_currency,
            credited_amount: credit_amount,
            credited_currency: credit_currency,
            exchange_rate: rate,
        })
    }

    /// Records the credit leg of a transfer initiated elsewhere.
    ///
    /// The emitted payload is identical to the debit side's, same transfer id
    /// and rate; only the envelope's aggregate id differs.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_receive_transfer(
        &mut self,
        transfer_id: TransferId,
        source_account_id: &AccountId,
        expected_target_account_id: &AccountId,
        debited_amount: Decimal,
        debited_currency: Currency,
        credited_amount: Decimal,
        credited_currency: Currency,
        rate: Decimal,
    ) -> AccountResult<()> {
        self.require_created("receive transfer on")?;
        if expected_target_account_id != &self.id {
            return Err(AccountError::Domain(format!(
                "transfer {transfer_id} targets {expected_target_account_id}, \
                 not this account ({})",
                self.id
            )));
        }
        if credited_amount <= Decimal::ZERO {
            return Err(AccountError::Domain(format!(
                "credited amount must be positive: {credited_amount}"
            )));
        }

        self.emit(MoneyTransferred {
            transfer_id,
            source_account_id: source_account_id.clone(),
            target_account_id: self.id.clone(),
            debited_amount,
            debited_currency,
            credited_amount,
            credited_currency,
            exchange_rate: rate,
        })
    }

    // --- Event application ---

    /// Applies one event, mutating state and advancing the version.
    ///
    /// The event must carry exactly `version + 1` and belong to this
    /// aggregate. Debits that would go negative fail with
    /// [`AccountError::InvariantViolation`] without mutating anything.
    pub fn apply(&mut self, event: &LedgerEvent) -> AccountResult<()> {
        let expected = self.version.next();
        if event.version != expected {
            return Err(AccountError::VersionMismatch {
                account: self.id.clone(),
                expected,
                actual: event.version,
                event_id: event.event_id,
            });
        }
        if event.aggregate_id != self.id {
            return Err(AccountError::ForeignEvent {
                account: self.id.clone(),
                event_id: event.event_id,
                aggregate_id: event.aggregate_id.clone(),
            });
        }

        match &event.payload {
            EventPayload::AccountCreated(created) => {
                self.balances = created
                    .initial_balances
                    .iter()
                    .map(|entry| (entry.currency, entry.amount))
                    .collect();
            }
            EventPayload::DepositMade(deposit) => {
                self.credit(deposit.currency, deposit.amount);
            }
            EventPayload::WithdrawalMade(withdrawal) => {
                self.debit(withdrawal.currency, withdrawal.amount, event)?;
            }
            EventPayload::CurrencyConverted(converted) => {
                self.debit(converted.from_currency, converted.from_amount, event)?;
                self.credit(converted.to_currency, converted.to_amount);
            }
            EventPayload::MoneyTransferred(transfer) => {
                if transfer.source_account_id == self.id {
                    self.debit(transfer.debited_currency, transfer.debited_amount, event)?;
                } else if transfer.target_account_id == self.id {
                    self.credit(transfer.credited_currency, transfer.credited_amount);
                } else {
                    return Err(AccountError::ForeignEvent {
                        account: self.id.clone(),
                        event_id: event.event_id,
                        aggregate_id: event.aggregate_id.clone(),
                    });
                }
            }
        }

        self.version = event.version;
        Ok(())
    }

    /// Applies a history in order, aborting on the first failure.
    pub fn apply_all(&mut self, history: &[LedgerEvent]) -> AccountResult<()> {
        for event in history {
            if let Err(err) = self.apply(event) {
                tracing::error!(
                    account = %self.id,
                    event_id = %event.event_id,
                    event_type = event.event_type(),
                    version = %event.version,
                    "event replay failed: {err}"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    // --- Internals ---

    fn emit(&mut self, payload: impl Into<EventPayload>) -> AccountResult<()> {
        let event = LedgerEvent::new(self.id.clone(), self.version.next(), payload);
        self.apply(&event)?;
        self.pending.push(event);
        Ok(())
    }

    fn require_created(&self, action: &str) -> AccountResult<()> {
        if self.version == EventVersion::initial() {
            return Err(AccountError::Domain(format!(
                "cannot {action} uninitialized account {}",
                self.id
            )));
        }
        Ok(())
    }

    fn require_funds(&self, amount: Decimal, currency: Currency) -> AccountResult<()> {
        let available = Money::new(self.balance(currency), currency);
        let requested = Money::new(amount, currency);
        if available.compare(&requested)? == Ordering::Less {
            return Err(AccountError::InsufficientFunds {
                account: self.id.clone(),
                requested,
                available,
            });
        }
        Ok(())
    }

    fn credit(&mut self, currency: Currency, amount: Decimal) {
        *self.balances.entry(currency).or_insert(Decimal::ZERO) += amount;
    }

    fn debit(
        &mut self,
        currency: Currency,
        amount: Decimal,
        event: &LedgerEvent,
    ) -> AccountResult<()> {
        let balance = self.balance(currency);
        let updated = balance - amount;
        if updated < Decimal::ZERO {
            return Err(AccountError::InvariantViolation {
                account: self.id.clone(),
                currency,
                event_type: event.event_type(),
                version: event.version,
                balance,
                debit: amount,
            });
        }
        self.balances.insert(currency, updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(id: &str) -> Account {
        Account::new(AccountId::try_new(id).unwrap())
    }

    fn created_account(id: &str, balances: &[(Currency, Decimal)]) -> Account {
        let mut acc = account(id);
        let initial: HashMap<Currency, Decimal> = balances.iter().copied().collect();
        acc.handle_create_account(&initial).unwrap();
        acc.drain_pending_changes();
        acc
    }

    fn transfer_id(id: &str) -> TransferId {
        TransferId::try_new(id).unwrap()
    }

    #[test]
    fn create_sets_balances_and_version_one() {
        let mut acc = account("acc-1");
        let initial = HashMap::from([
            (Currency::USD, dec!(1000.50)),
            (Currency::EUR, dec!(500)),
        ]);
        acc.handle_create_account(&initial).unwrap();

        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
        assert_eq!(acc.balance(Currency::USD), dec!(1000.50));
        assert_eq!(acc.balance(Currency::EUR), dec!(500));

        let changes = acc.drain_pending_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].event_type(), "AccountCreated");
        assert_eq!(changes[0].version, EventVersion::try_new(1).unwrap());
    }

    #[test]
    fn create_records_entries_sorted_by_currency() {
        let mut acc = account("acc-1");
        let initial = HashMap::from([
            (Currency::GBP, dec!(3)),
            (Currency::USD, dec!(1)),
            (Currency::EUR, dec!(2)),
        ]);
        acc.handle_create_account(&initial).unwrap();
        let changes = acc.drain_pending_changes();
        let EventPayload::AccountCreated(created) = &changes[0].payload else {
            panic!("expected AccountCreated");
        };
        let currencies: Vec<_> = created
            .initial_balances
            .iter()
            .map(|entry| entry.currency)
            .collect();
        assert_eq!(currencies, vec![Currency::USD, Currency::EUR, Currency::GBP]);
    }

    #[test]
    fn create_twice_fails_without_mutation() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(10))]);
        let err = acc
            .handle_create_account(&HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AccountError::AccountExists { .. }));
        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
        assert!(acc.drain_pending_changes().is_empty());
    }

    #[test]
    fn create_rejects_negative_opening_balance() {
        let mut acc = account("acc-1");
        let initial = HashMap::from([(Currency::USD, dec!(-1))]);
        let err = acc.handle_create_account(&initial).unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
        assert_eq!(acc.version(), EventVersion::initial());
    }

    #[test]
    fn deposit_adds_to_balance() {
        let mut acc = created_account(
            "acc-1",
            &[(Currency::USD, dec!(1000.50)), (Currency::EUR, dec!(500))],
        );
        acc.handle_deposit(dec!(200), Currency::USD).unwrap();

        assert_eq!(acc.balance(Currency::USD), dec!(1200.50));
        assert_eq!(acc.balance(Currency::EUR), dec!(500));
        assert_eq!(acc.version(), EventVersion::try_new(2).unwrap());
    }

    #[test]
    fn deposit_into_unheld_currency_creates_the_entry() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(1))]);
        acc.handle_deposit(dec!(5), Currency::GBP).unwrap();
        assert_eq!(acc.balance(Currency::GBP), dec!(5));
    }

    #[test]
    fn deposit_requires_created_account() {
        let mut acc = account("acc-1");
        let err = acc.handle_deposit(dec!(1), Currency::USD).unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
    }

    #[test]
    fn zero_and_negative_amounts_are_domain_errors() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(100))]);
        assert!(matches!(
            acc.handle_deposit(dec!(0), Currency::USD),
            Err(AccountError::Domain(_))
        ));
        assert!(matches!(
            acc.handle_withdraw(dec!(-5), Currency::USD),
            Err(AccountError::Domain(_))
        ));
        assert!(matches!(
            acc.handle_convert_currency(dec!(0), Currency::USD, Currency::EUR, dec!(0.9)),
            Err(AccountError::Domain(_))
        ));
        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
    }

    #[test]
    fn withdraw_of_exact_balance_leaves_zero() {
        let mut acc = created_account("acc-1", &[(Currency::GBP, dec!(800))]);
        acc.handle_withdraw(dec!(800), Currency::GBP).unwrap();
        assert_eq!(acc.balance(Currency::GBP), dec!(0));
    }

    #[test]
    fn overdraw_fails_and_leaves_state_untouched() {
        let mut acc = created_account("acc-1", &[(Currency::GBP, dec!(800))]);
        let err = acc.handle_withdraw(dec!(1000), Currency::GBP).unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(acc.balance(Currency::GBP), dec!(800));
        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
        assert!(acc.drain_pending_changes().is_empty());
    }

    #[test]
    fn convert_debits_and_credits_exactly() {
        let mut acc = created_account(
            "acc-1",
            &[(Currency::USD, dec!(1200.50)), (Currency::EUR, dec!(500))],
        );
        acc.handle_convert_currency(dec!(100), Currency::USD, Currency::EUR, dec!(0.92))
            .unwrap();

        assert_eq!(acc.balance(Currency::USD), dec!(1100.50));
        assert_eq!(acc.balance(Currency::EUR), dec!(592));

        let changes = acc.drain_pending_changes();
        let EventPayload::CurrencyConverted(converted) = &changes[0].payload else {
            panic!("expected CurrencyConverted");
        };
        assert_eq!(converted.to_amount, dec!(92));
    }

    #[test]
    fn convert_to_same_currency_fails() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(100))]);
        let err = acc
            .handle_convert_currency(dec!(10), Currency::USD, Currency::USD, dec!(1))
            .unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
    }

    #[test]
    fn convert_requires_positive_rate_and_funds() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(100))]);
        assert!(matches!(
            acc.handle_convert_currency(dec!(10), Currency::USD, Currency::EUR, dec!(0)),
            Err(AccountError::Domain(_))
        ));
        assert!(matches!(
            acc.handle_convert_currency(dec!(101), Currency::USD, Currency::EUR, dec!(0.9)),
            Err(AccountError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn initiate_transfer_debits_source_only() {
        let mut acc = created_account("acc-src", &[(Currency::USD, dec!(100))]);
        let target = AccountId::try_new("acc-dst").unwrap();
        acc.handle_initiate_transfer(
            transfer_id("txf-1"),
            &target,
            dec!(75),
            Currency::USD,
            dec!(75),
            Currency::USD,
            dec!(1),
        )
        .unwrap();

        assert_eq!(acc.balance(Currency::USD), dec!(25));

        let changes = acc.drain_pending_changes();
        let EventPayload::MoneyTransferred(transfer) = &changes[0].payload else {
            panic!("expected MoneyTransferred");
        };
        assert_eq!(transfer.transfer_id, transfer_id("txf-1"));
        assert_eq!(&transfer.source_account_id, acc.id());
        assert_eq!(transfer.target_account_id, target);
    }

    #[test]
    fn initiate_transfer_coerces_same_currency_rate_to_one() {
        let mut acc = created_account("acc-src", &[(Currency::USD, dec!(100))]);
        let target = AccountId::try_new("acc-dst").unwrap();
        acc.handle_initiate_transfer(
            transfer_id("txf-1"),
            &target,
            dec!(10),
            Currency::USD,
            dec!(10),
            Currency::USD,
            dec!(2),
        )
        .unwrap();

        let changes = acc.drain_pending_changes();
        let EventPayload::MoneyTransferred(transfer) = &changes[0].payload else {
            panic!("expected MoneyTransferred");
        };
        assert_eq!(transfer.exchange_rate, Decimal::ONE);
    }

    #[test]
    fn initiate_transfer_rejects_same_currency_amount_mismatch() {
        let mut acc = created_account("acc-src", &[(Currency::USD, dec!(100))]);
        let target = AccountId::try_new("acc-dst").unwrap();
        let err = acc
            .handle_initiate_transfer(
                transfer_id("txf-1"),
                &target,
                dec!(10),
                Currency::USD,
                dec!(11),
                Currency::USD,
                dec!(1),
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
        assert_eq!(acc.balance(Currency::USD), dec!(100));
    }

    #[test]
    fn initiate_transfer_accepts_cross_currency_amount_drift() {
        // provided credit differs from debit * rate: warned about, accepted
        let mut acc = created_account("acc-src", &[(Currency::GBP, dec!(100))]);
        let target = AccountId::try_new("acc-dst").unwrap();
        acc.handle_initiate_transfer(
            transfer_id("txf-2"),
            &target,
            dec!(10),
            Currency::GBP,
            dec!(12),
            Currency::USD,
            dec!(1.25),
        )
        .unwrap();
        assert_eq!(acc.balance(Currency::GBP), dec!(90));
    }

    #[test]
    fn self_transfer_fails() {
        let mut acc = created_account("acc-src", &[(Currency::USD, dec!(100))]);
        let own = acc.id().clone();
        let err = acc
            .handle_initiate_transfer(
                transfer_id("txf-1"),
                &own,
                dec!(10),
                Currency::USD,
                dec!(10),
                Currency::USD,
                dec!(1),
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
    }

    #[test]
    fn receive_transfer_credits_target_only() {
        let mut acc = created_account("acc-dst", &[(Currency::USD, dec!(0))]);
        let source = AccountId::try_new("acc-src").unwrap();
        let own = acc.id().clone();
        acc.handle_receive_transfer(
            transfer_id("txf-1"),
            &source,
            &own,
            dec!(75),
            Currency::USD,
            dec!(75),
            Currency::USD,
            dec!(1),
        )
        .unwrap();

        assert_eq!(acc.balance(Currency::USD), dec!(75));

        let changes = acc.drain_pending_changes();
        let EventPayload::MoneyTransferred(transfer) = &changes[0].payload else {
            panic!("expected MoneyTransferred");
        };
        assert_eq!(transfer.source_account_id, source);
        assert_eq!(&transfer.target_account_id, acc.id());
    }

    #[test]
    fn receive_transfer_checks_the_target_id() {
        let mut acc = created_account("acc-dst", &[(Currency::USD, dec!(0))]);
        let source = AccountId::try_new("acc-src").unwrap();
        let other = AccountId::try_new("acc-other").unwrap();
        let err = acc
            .handle_receive_transfer(
                transfer_id("txf-1"),
                &source,
                &other,
                dec!(10),
                Currency::USD,
                dec!(10),
                Currency::USD,
                dec!(1),
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
        assert_eq!(acc.balance(Currency::USD), dec!(0));
    }

    #[test]
    fn receive_transfer_rejects_non_positive_credit() {
        let mut acc = created_account("acc-dst", &[(Currency::USD, dec!(0))]);
        let source = AccountId::try_new("acc-src").unwrap();
        let own = acc.id().clone();
        let err = acc
            .handle_receive_transfer(
                transfer_id("txf-1"),
                &source,
                &own,
                dec!(10),
                Currency::USD,
                dec!(-10),
                Currency::USD,
                dec!(1),
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::Domain(_)));
    }

    #[test]
    fn apply_rejects_version_gaps() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(10))]);
        let event = LedgerEvent::new(
            acc.id().clone(),
            EventVersion::try_new(5).unwrap(),
            DepositMade {
                amount: dec!(1),
                currency: Currency::USD,
            },
        );
        let err = acc.apply(&event).unwrap_err();
        assert!(matches!(err, AccountError::VersionMismatch { .. }));
        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
    }

    #[test]
    fn apply_rejects_foreign_events() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(10))]);
        let event = LedgerEvent::new(
            AccountId::try_new("acc-2").unwrap(),
            EventVersion::try_new(2).unwrap(),
            DepositMade {
                amount: dec!(1),
                currency: Currency::USD,
            },
        );
        let err = acc.apply(&event).unwrap_err();
        assert!(matches!(err, AccountError::ForeignEvent { .. }));
    }

    #[test]
    fn applying_an_overdrawing_event_is_an_invariant_violation() {
        // a stored withdrawal exceeding the balance means the log is corrupt
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(10))]);
        let event = LedgerEvent::new(
            acc.id().clone(),
            EventVersion::try_new(2).unwrap(),
            WithdrawalMade {
                amount: dec!(11),
                currency: Currency::USD,
            },
        );
        let err = acc.apply(&event).unwrap_err();
        assert!(matches!(err, AccountError::InvariantViolation { .. }));
        assert_eq!(acc.balance(Currency::USD), dec!(10));
        assert_eq!(acc.version(), EventVersion::try_new(1).unwrap());
    }

    #[test]
    fn transfer_event_naming_neither_side_is_foreign() {
        let mut acc = created_account("acc-1", &[(Currency::USD, dec!(10))]);
        let event = LedgerEvent::new(
            acc.id().clone(),
            EventVersion::try_new(2).unwrap(),
            MoneyTransferred {
                transfer_id: transfer_id("txf-x"),
                source_account_id: AccountId::try_new("acc-a").unwrap(),
                target_account_id: AccountId::try_new("acc-b").unwrap(),
                debited_amount: dec!(1),
                debited_currency: Currency::USD,
                credited_amount: dec!(1),
                credited_currency: Currency::USD,
                exchange_rate: dec!(1),
            },
        );
        let err = acc.apply(&event).unwrap_err();
        assert!(matches!(err, AccountError::ForeignEvent { .. }));
    }

    #[test]
    fn replay_reproduces_handler_built_state() {
        let mut original = account("acc-1");
        original
            .handle_create_account(&HashMap::from([(Currency::USD, dec!(100))]))
            .unwrap();
        original.handle_deposit(dec!(50), Currency::USD).unwrap();
        original.handle_withdraw(dec!(30), Currency::USD).unwrap();
        original
            .handle_convert_currency(dec!(20), Currency::USD, Currency::EUR, dec!(0.92))
            .unwrap();
        let history = original.drain_pending_changes();

        let mut replayed = account("acc-1");
        replayed.apply_all(&history).unwrap();

        assert_eq!(replayed.version(), original.version());
        assert_eq!(replayed.balances(), original.balances());
    }

    #[test]
    fn replay_aborts_on_first_corrupt_event() {
        let mut original = account("acc-1");
        original
            .handle_create_account(&HashMap::from([(Currency::USD, dec!(100))]))
            .unwrap();
        original.handle_deposit(dec!(1), Currency::USD).unwrap();
        original.handle_deposit(dec!(2), Currency::USD).unwrap();
        let mut history = original.drain_pending_changes();
        history.remove(1); // leave a gap after the creation event

        let mut replayed = account("acc-1");
        let err = replayed.apply_all(&history).unwrap_err();
        assert!(matches!(err, AccountError::VersionMismatch { .. }));
        // the creation event applied before the gap was detected
        assert_eq!(replayed.version(), EventVersion::try_new(1).unwrap());
    }

    #[test]
    fn drain_returns_each_change_exactly_once() {
        let mut acc = account("acc-1");
        acc.handle_create_account(&HashMap::from([(Currency::USD, dec!(1))]))
            .unwrap();
        acc.handle_deposit(dec!(2), Currency::USD).unwrap();

        let first = acc.drain_pending_changes();
        assert_eq!(first.len(), 2);
        assert!(acc.drain_pending_changes().is_empty());

        acc.handle_deposit(dec!(3), Currency::USD).unwrap();
        let second = acc.drain_pending_changes();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].version, EventVersion::try_new(3).unwrap());
    }
}
