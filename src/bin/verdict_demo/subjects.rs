//! Code under test for the demo suites.

use std::collections::HashMap;

use thiserror::Error;

// ============================================================================
// PRICING
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum DiscountError {
    #[error("discount rate {rate}% is outside 0..=100")]
    OutOfRange { rate: f64 },
}

#[derive(Debug, Clone)]
pub struct DiscountCalculator {
    rate_percent: f64,
}

impl DiscountCalculator {
    pub fn new(rate_percent: f64) -> Result<Self, DiscountError> {
        if !(0.0..=100.0).contains(&rate_percent) {
            return Err(DiscountError::OutOfRange { rate: rate_percent });
        }
        Ok(Self { rate_percent })
    }

    pub fn apply(&self, price: f64) -> f64 {
        price * (1.0 - self.rate_percent / 100.0)
    }
}

// ============================================================================
// WEATHER STATISTICS
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("no readings to summarise")]
    NoReadings,
}

pub fn average(readings: &[f64]) -> Result<f64, StatsError> {
    if readings.is_empty() {
        return Err(StatsError::NoReadings);
    }
    Ok(readings.iter().sum::<f64>() / readings.len() as f64)
}

/// Off-by-one divisor, kept around to show what a failing case looks like.
pub fn broken_average(readings: &[f64]) -> f64 {
    readings.iter().sum::<f64>() / (readings.len() as f64 - 1.0)
}

pub fn temperature_range(readings: &[f64]) -> Result<(f64, f64), StatsError> {
    let mut iter = readings.iter().copied();
    let first = iter.next().ok_or(StatsError::NoReadings)?;
    Ok(iter.fold((first, first), |(lo, hi), r| (lo.min(r), hi.max(r))))
}

// ============================================================================
// BANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TransferError {
    #[error("account `{0}` does not exist")]
    UnknownAccount(String),
    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds { available: u64, requested: u64 },
    #[error("transfer amount must be positive")]
    ZeroAmount,
}

/// Storage the bank posts transfers to.
pub trait Ledger {
    fn balance(&self, account: &str) -> Option<u64>;
    fn set_balance(&mut self, account: &str, amount: u64);
    fn record(&mut self, entry: Entry);
    fn entries(&self) -> &[Entry];
}

/// In-memory fake standing in for a real ledger database.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<String, u64>,
    entries: Vec<Entry>,
}

impl InMemoryLedger {
    pub fn with_balances<'a>(balances: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            balances: balances.into_iter().map(|(a, b)| (a.to_string(), b)).collect(),
            entries: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.balances.clear();
        self.entries.clear();
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, account: &str) -> Option<u64> {
        self.balances.get(account).copied()
    }

    fn set_balance(&mut self, account: &str, amount: u64) {
        self.balances.insert(account.to_string(), amount);
    }

    fn record(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

pub struct Bank<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> Bank<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }
        let available = self
            .ledger
            .balance(from)
            .ok_or_else(|| TransferError::UnknownAccount(from.to_string()))?;
        let target = self
            .ledger
            .balance(to)
            .ok_or_else(|| TransferError::UnknownAccount(to.to_string()))?;
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        self.ledger.set_balance(from, available - amount);
        self.ledger.set_balance(to, target + amount);
        self.ledger.record(Entry {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
        Ok(())
    }
}
