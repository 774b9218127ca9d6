//! Fungible token ledger
//!
//! The protocol only consumes a ledger; it never defines token supply. The
//! `TokenLedger` trait is the seam, and `MemoryLedger` is an in-process
//! implementation used by tests and tooling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sarco_core::{Address, Amount};

/// Errors reported by a token ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance for {owner}: needed {needed}, available {available}")]
    InsufficientBalance {
        owner: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("insufficient allowance from {owner} to {spender}: needed {needed}, approved {approved}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        needed: Amount,
        approved: Amount,
    },

    #[error("balance overflow")]
    Overflow,
}

/// Balance transfers with delegated (`approve`/`transfer_from`) spending
pub trait TokenLedger {
    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount);

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}

/// In-memory token ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: HashMap<Address, Amount>,
    /// owner -> spender -> approved amount
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    total_supply: Amount,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens out of thin air (tooling and tests only)
    pub fn mint(&mut self, to: Address, amount: Amount) {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.saturating_add(amount);
        self.total_supply = self.total_supply.saturating_add(amount);
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Sum of all balances; equals `total_supply` unless minting saturated
    pub fn sum_of_balances(&self) -> Amount {
        self.balances.values().sum()
    }
}

impl TokenLedger for MemoryLedger {
    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                owner: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let approved = self.allowance(&from, &spender);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from,
                spender,
                needed: amount,
                approved,
            });
        }
        self.transfer(from, to, amount)?;
        self.approve(from, spender, approved - amount);
        Ok(())
    }
}
