//! Thin command-line front-end for the ledger.
//!
//! Runs an interactive REPL (or a scripted demo) over one in-memory service
//! instance. All business logic lives in `ledgercore`; this binary only
//! parses arguments and prints results.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ledgercore::{
    AccountId, ConvertCurrency, CreateAccount, Currency, Deposit, EventPayload, FixedRateTable,
    GetBalance, GetHistory, LedgerEvent, LedgerService, TransferMoney, Withdraw,
};
use ledgercore_memory::{InMemoryEventStore, InMemorySnapshotStore};

type Service = LedgerService<InMemoryEventStore, InMemorySnapshotStore, FixedRateTable>;

#[derive(Parser)]
#[command(
    name = "ledger-cli",
    about = "Manage accounts and transactions in the event-sourced ledger",
    long_about = "ledger-cli drives the event-sourced financial ledger: create accounts, \
                  deposit, withdraw, convert currencies, transfer between accounts, and \
                  inspect balances and event history. State is in-memory and lives for \
                  the duration of the session."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session
    Repl,
    /// Run a scripted demonstration of the ledger's operations
    Demo,
}

/// One line of REPL input, parsed as a command.
#[derive(Parser)]
#[command(name = "ledger", multicall = true)]
struct ReplLine {
    #[command(subcommand)]
    op: Op,
}

#[derive(Subcommand)]
enum Op {
    /// Create an account with opening balances (e.g. `create --id acc-1 USD=100.50 EUR=20`)
    Create {
        /// Account id; generated when omitted
        #[arg(long)]
        id: Option<String>,
        /// Opening balances as CURRENCY=AMOUNT pairs
        balances: Vec<BalanceArg>,
    },
    /// Deposit money into an account
    Deposit {
        /// Target account id
        id: String,
        /// Amount to deposit
        amount: Decimal,
        /// Currency to deposit
        currency: Currency,
    },
    /// Withdraw money from an account
    Withdraw {
        /// Target account id
        id: String,
        /// Amount to withdraw
        amount: Decimal,
        /// Currency to withdraw
        currency: Currency,
    },
    /// Convert between currencies at the current rate
    Convert {
        /// Target account id
        id: String,
        /// Amount to convert
        amount: Decimal,
        /// Currency to convert from
        from: Currency,
        /// Currency to convert into
        to: Currency,
    },
    /// Transfer money to another account (same currency)
    Transfer {
        /// Source account id
        source: String,
        /// Target account id
        target: String,
        /// Amount to move
        amount: Decimal,
        /// Currency of the transfer
        currency: Currency,
    },
    /// Show an account's balances
    Balance {
        /// Account id
        id: String,
        /// Restrict to one currency
        #[arg(long)]
        currency: Option<Currency>,
    },
    /// Show an account's event history
    History {
        /// Account id
        id: String,
        /// Events to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Maximum events to show
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// A `CURRENCY=AMOUNT` pair on the command line.
#[derive(Debug, Clone)]
struct BalanceArg {
    currency: Currency,
    amount: Decimal,
}

impl FromStr for BalanceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (currency, amount) = s
            .split_once('=')
            .ok_or_else(|| format!("expected CURRENCY=AMOUNT, got '{s}'"))?;
        Ok(Self {
            currency: currency.parse().map_err(|e| format!("{e}"))?,
            amount: amount.parse().map_err(|e| format!("bad amount: {e}"))?,
        })
    }
}

fn account_id(raw: &str) -> anyhow::Result<AccountId> {
    AccountId::try_new(raw).with_context(|| format!("invalid account id '{raw}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let service = LedgerService::new(
        InMemoryEventStore::new(),
        InMemorySnapshotStore::new(),
        FixedRateTable::seeded(),
    );

    match Cli::parse().command {
        Command::Repl => repl(&service).await,
        Command::Demo => demo(&service).await,
    }
}

async fn repl(service: &Service) -> anyhow::Result<()> {
    println!("ledger-cli interactive session. Type 'help' for commands, 'exit' to quit.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match ReplLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => {
                if let Err(err) = run_op(service, parsed.op).await {
                    eprintln!("error: {err:#}");
                }
            }
            Err(err) => {
                // clap renders its own help/usage output
                let _ = err.print();
            }
        }
    }

    println!("bye.");
    Ok(())
}

async fn run_op(service: &Service, op: Op) -> anyhow::Result<()> {
    match op {
        Op::Create { id, balances } => {
            let account_id = id.as_deref().map(account_id).transpose()?;
            let initial_balances: HashMap<Currency, Decimal> = balances
                .into_iter()
                .map(|entry| (entry.currency, entry.amount))
                .collect();
            let id = service
                .create_account(CreateAccount {
                    account_id,
                    initial_balances,
                })
                .await?;
            println!("created account {id}");
        }
        Op::Deposit {
            id,
            amount,
            currency,
        } => {
            service
                .deposit(Deposit {
                    account_id: account_id(&id)?,
                    amount,
                    currency,
                })
                .await?;
            println!("deposited {amount} {currency} into {id}");
        }
        Op::Withdraw {
            id,
            amount,
            currency,
        } => {
            service
                .withdraw(Withdraw {
                    account_id: account_id(&id)?,
                    amount,
                    currency,
                })
                .await?;
            println!("withdrew {amount} {currency} from {id}");
        }
        Op::Convert {
            id,
            amount,
            from,
            to,
        } => {
            service
                .convert_currency(ConvertCurrency {
                    account_id: account_id(&id)?,
                    from_amount: amount,
                    from_currency: from,
                    to_currency: to,
                })
                .await?;
            println!("converted {amount} {from} -> {to} for {id}");
        }
        Op::Transfer {
            source,
            target,
            amount,
            currency,
        } => {
            let transfer_id = service
                .transfer_money(TransferMoney {
                    source_account_id: account_id(&source)?,
                    target_account_id: account_id(&target)?,
                    amount,
                    currency,
                })
                .await?;
            println!("transferred {amount} {currency} from {source} to {target} ({transfer_id})");
        }
        Op::Balance { id, currency } => {
            let balances = service
                .current_balance(GetBalance {
                    account_id: account_id(&id)?,
                    currency,
                })
                .await?;
            print_balances(&id, &balances);
        }
        Op::History { id, skip, limit } => {
            let history = service
                .transaction_history(GetHistory {
                    account_id: account_id(&id)?,
                    skip,
                    limit,
                })
                .await?;
            print_history(&id, &history);
        }
    }
    Ok(())
}

fn print_balances(id: &str, balances: &HashMap<Currency, Decimal>) {
    println!("balances for {id}:");
    if balances.is_empty() {
        println!("  (no balances held)");
        return;
    }
    let mut entries: Vec<_> = balances.iter().collect();
    entries.sort_by_key(|(currency, _)| **currency);
    for (currency, amount) in entries {
        println!("  {currency}: {}", amount.round_dp(2));
    }
}

fn print_history(id: &str, history: &[LedgerEvent]) {
    println!("history for {id} ({} events):", history.len());
    for (index, event) in history.iter().enumerate() {
        println!(
            "  {}: [{}] {} (v{})",
            index + 1,
            event.timestamp,
            event.event_type(),
            event.version
        );
        match &event.payload {
            EventPayload::AccountCreated(created) => {
                for entry in &created.initial_balances {
                    println!("     opening {}: {}", entry.currency, entry.amount);
                }
            }
            EventPayload::DepositMade(deposit) => {
                println!("     amount: {} {}", deposit.amount, deposit.currency);
            }
            EventPayload::WithdrawalMade(withdrawal) => {
                println!("     amount: {} {}", withdrawal.amount, withdrawal.currency);
            }
            EventPayload::CurrencyConverted(converted) => {
                println!(
                    "     from: {} {}, to: {} {}, rate: {}",
                    converted.from_amount,
                    converted.from_currency,
                    converted.to_amount,
                    converted.to_currency,
                    converted.exchange_rate
                );
            }
            EventPayload::MoneyTransferred(transfer) => {
                println!(
                    "     {} -> {}: debited {} {}, credited {} {}, rate {} ({})",
                    transfer.source_account_id,
                    transfer.target_account_id,
                    transfer.debited_amount,
                    transfer.debited_currency,
                    transfer.credited_amount,
                    transfer.credited_currency,
                    transfer.exchange_rate,
                    transfer.transfer_id
                );
            }
        }
    }
}

async fn demo(service: &Service) -> anyhow::Result<()> {
    println!("--- ledger demo ---");

    println!("\n[1] creating accounts");
    let alice = service
        .create_account(CreateAccount {
            account_id: None,
            initial_balances: HashMap::from([
                (Currency::USD, dec!(1000.50)),
                (Currency::EUR, dec!(500)),
            ]),
        })
        .await?;
    println!(" -> alice: {alice}");
    let bob = service
        .create_account(CreateAccount {
            account_id: None,
            initial_balances: HashMap::from([(Currency::GBP, dec!(800))]),
        })
        .await?;
    println!(" -> bob: {bob}");

    println!("\n[2] duplicate creation is rejected");
    let err = service
        .create_account(CreateAccount {
            account_id: Some(alice.clone()),
            initial_balances: HashMap::new(),
        })
        .await
        .expect_err("duplicate create must fail");
    println!(" -> {err}");

    println!("\n[3] deposit and withdrawal");
    service
        .deposit(Deposit {
            account_id: alice.clone(),
            amount: dec!(200),
            currency: Currency::USD,
        })
        .await?;
    println!(" -> deposited 200 USD to alice");
    service
        .withdraw(Withdraw {
            account_id: alice.clone(),
            amount: dec!(50),
            currency: Currency::EUR,
        })
        .await?;
    println!(" -> withdrew 50 EUR from alice");

    println!("\n[4] overdraw is rejected");
    let err = service
        .withdraw(Withdraw {
            account_id: bob.clone(),
            amount: dec!(1000),
            currency: Currency::GBP,
        })
        .await
        .expect_err("overdraw must fail");
    println!(" -> {err}");

    println!("\n[5] currency conversion");
    service
        .convert_currency(ConvertCurrency {
            account_id: alice.clone(),
            from_amount: dec!(100),
            from_currency: Currency::USD,
            to_currency: Currency::EUR,
        })
        .await?;
    println!(" -> converted 100 USD to EUR for alice");

    println!("\n[6] transfer alice -> bob");
    let transfer_id = service
        .transfer_money(TransferMoney {
            source_account_id: alice.clone(),
            target_account_id: bob.clone(),
            amount: dec!(75),
            currency: Currency::USD,
        })
        .await?;
    println!(" -> transfer {transfer_id} complete");

    println!("\n[7] final balances");
    for (name, id) in [("alice", &alice), ("bob", &bob)] {
        let balances = service
            .current_balance(GetBalance {
                account_id: id.clone(),
                currency: None,
            })
            .await?;
        print_balances(name, &balances);
    }

    println!("\n[8] histories");
    for (name, id) in [("alice", &alice), ("bob", &bob)] {
        let history = service
            .transaction_history(GetHistory {
                account_id: id.clone(),
                skip: 0,
                limit: None,
            })
            .await?;
        print_history(name, &history);
    }

    println!("\n[9] snapshotting after sustained activity");
    let heavy = service
        .create_account(CreateAccount {
            account_id: None,
            initial_balances: HashMap::from([(Currency::USD, dec!(0))]),
        })
        .await?;
    for _ in 0..105 {
        service
            .deposit(Deposit {
                account_id: heavy.clone(),
                amount: dec!(1),
                currency: Currency::USD,
            })
            .await?;
    }
    let balances = service
        .current_balance(GetBalance {
            account_id: heavy.clone(),
            currency: Some(Currency::USD),
        })
        .await?;
    println!(
        " -> account {heavy} holds {} USD after 105 deposits (reloaded via snapshot + tail)",
        balances[&Currency::USD]
    );

    println!("\n--- demo complete ---");
    Ok(())
}
