//! Protocol service
//!
//! The single entry point for every operation. `Protocol` owns the state,
//! the token ledger, the signature verifier and the clock; each mutating call
//! reads the clock once and runs its engine against working copies that are
//! committed only when the engine succeeds.

use tracing::debug;

use sarco_core::{
    Address, Amount, EcdsaVerifier, KeyShare, ResourceId, SignatureVerifier, Timestamp,
};

use crate::admin::{self, ConfigField};
use crate::clock::{Clock, SystemClock};
use crate::config::ProtocolConfig;
use crate::custodian::{CustodianProfile, CustodianTerms};
use crate::error::Result;
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::sarcophagus::{
    AccusalOutcome, BondedCustodianRecord, CreateParams, CustodianCommitment, RevealMode,
    Sarcophagus,
};
use crate::store::{atomically, ProtocolState, Tx};
use crate::{accusal, cleanup, lifecycle, publication, registry};

/// The Sarcophagus escrow protocol
pub struct Protocol<L, V = EcdsaVerifier, C = SystemClock> {
    state: ProtocolState,
    ledger: L,
    verifier: V,
    clock: C,
}

impl<L, V, C> Protocol<L, V, C>
where
    L: TokenLedger + Clone,
    V: SignatureVerifier,
    C: Clock,
{
    /// Start an empty protocol holding funds in `custody`
    pub fn new(
        config: ProtocolConfig,
        custody: Address,
        ledger: L,
        verifier: V,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_state(
            ProtocolState::new(config, custody),
            ledger,
            verifier,
            clock,
        ))
    }

    /// Resume from a previously saved state
    pub fn from_state(state: ProtocolState, ledger: L, verifier: V, clock: C) -> Self {
        Self {
            state,
            ledger,
            verifier,
            clock,
        }
    }

    fn execute<T>(&mut self, op: impl FnOnce(&mut Tx<'_, L>) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        let result = atomically(&mut self.state, &mut self.ledger, now, op);
        if let Err(e) = &result {
            debug!("Operation rejected at {}: {}", now, e);
        }
        result
    }

    // Custodian registry

    pub fn register(&mut self, caller: Address, terms: CustodianTerms) -> Result<()> {
        self.execute(|tx| registry::register(tx, caller, &terms))
    }

    pub fn update(&mut self, caller: Address, terms: CustodianTerms) -> Result<()> {
        self.execute(|tx| registry::update(tx, caller, &terms))
    }

    pub fn deposit_free_bond(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.execute(|tx| registry::deposit_free_bond(tx, caller, amount))
    }

    pub fn withdraw_free_bond(&mut self, caller: Address, amount: Amount) -> Result<()> {
        self.execute(|tx| registry::withdraw_free_bond(tx, caller, amount))
    }

    pub fn withdraw_rewards(&mut self, caller: Address) -> Result<Amount> {
        self.execute(|tx| registry::withdraw_rewards(tx, caller))
    }

    // Lifecycle

    pub fn create(
        &mut self,
        caller: Address,
        id: ResourceId,
        params: CreateParams,
        commitments: Vec<CustodianCommitment>,
    ) -> Result<()> {
        let now = self.clock.now();
        let verifier = &self.verifier;
        atomically(&mut self.state, &mut self.ledger, now, |tx| {
            lifecycle::create(tx, verifier, caller, id, params, commitments)
        })
    }

    pub fn rewrap(
        &mut self,
        caller: Address,
        id: ResourceId,
        new_resurrection_time: Timestamp,
    ) -> Result<()> {
        self.execute(|tx| lifecycle::rewrap(tx, caller, id, new_resurrection_time))
    }

    pub fn bury(&mut self, caller: Address, id: ResourceId) -> Result<()> {
        self.execute(|tx| lifecycle::bury(tx, caller, id))
    }

    // Publication

    pub fn publish_key_share(
        &mut self,
        caller: Address,
        id: ResourceId,
        share: KeyShare,
    ) -> Result<Amount> {
        self.execute(|tx| publication::publish(tx, caller, id, share, RevealMode::KeyShare))
    }

    pub fn publish_private_key(
        &mut self,
        caller: Address,
        id: ResourceId,
        private_key: KeyShare,
    ) -> Result<Amount> {
        self.execute(|tx| publication::publish(tx, caller, id, private_key, RevealMode::PrivateKey))
    }

    // Accusal and cleanup

    /// Slash every custodian whose secret leaked before resurrection.
    /// Accusals below `threshold` still slash; reaching it compromises the
    /// resource. Only an empty `leaked` list is `NotEnoughProof`.
    pub fn accuse(
        &mut self,
        caller: Address,
        id: ResourceId,
        leaked: Vec<KeyShare>,
        beneficiary: Address,
    ) -> Result<AccusalOutcome> {
        self.execute(|tx| accusal::accuse(tx, caller, id, &leaked, beneficiary))
    }

    pub fn clean(&mut self, caller: Address, id: ResourceId, beneficiary: Address) -> Result<Amount> {
        self.execute(|tx| cleanup::clean(tx, caller, id, beneficiary))
    }

    // Administration

    pub fn set_config(&mut self, caller: Address, field: ConfigField, value: u64) -> Result<()> {
        self.execute(|tx| admin::set_config(tx, caller, field, value))
    }

    pub fn set_protocol_fee_base_percentage(&mut self, caller: Address, value: u64) -> Result<()> {
        self.set_config(caller, ConfigField::ProtocolFeeBasePercentage, value)
    }

    pub fn set_cursed_bond_percentage(&mut self, caller: Address, value: u64) -> Result<()> {
        self.set_config(caller, ConfigField::CursedBondPercentage, value)
    }

    pub fn set_grace_period(&mut self, caller: Address, value: u64) -> Result<()> {
        self.set_config(caller, ConfigField::GracePeriod, value)
    }

    pub fn set_embalmer_claim_window(&mut self, caller: Address, value: u64) -> Result<()> {
        self.set_config(caller, ConfigField::EmbalmerClaimWindow, value)
    }

    pub fn set_expiration_threshold(&mut self, caller: Address, value: u64) -> Result<()> {
        self.set_config(caller, ConfigField::ExpirationThreshold, value)
    }

    pub fn set_rewrap_horizon(
        &mut self,
        caller: Address,
        numerator: u64,
        denominator: u64,
    ) -> Result<()> {
        self.execute(|tx| admin::set_rewrap_horizon(tx, caller, numerator, denominator))
    }

    pub fn transfer_admin(&mut self, caller: Address, admin: Address) -> Result<()> {
        self.execute(|tx| admin::transfer_admin(tx, caller, admin))
    }

    pub fn withdraw_protocol_fees(&mut self, caller: Address, to: Address) -> Result<Amount> {
        self.execute(|tx| admin::withdraw_protocol_fees(tx, caller, to))
    }

    // Queries

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn state(&self) -> &ProtocolState {
        &self.state
    }

    pub fn config(&self) -> &ProtocolConfig {
        self.state.config()
    }

    pub fn custody(&self) -> Address {
        self.state.custody()
    }

    pub fn custodian(&self, address: &Address) -> Option<&CustodianProfile> {
        self.state.custodian(address)
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&Sarcophagus> {
        self.state.resource(id)
    }

    pub fn bonded_record(
        &self,
        id: &ResourceId,
        custodian: &Address,
    ) -> Option<&BondedCustodianRecord> {
        self.state.bonded_record(id, custodian)
    }

    pub fn resources_by_embalmer(&self, embalmer: &Address) -> &[ResourceId] {
        self.state.resources_by_embalmer(embalmer)
    }

    pub fn resources_by_recipient(&self, recipient: &Address) -> &[ResourceId] {
        self.state.resources_by_recipient(recipient)
    }

    pub fn resources_by_custodian(&self, custodian: &Address) -> &[ResourceId] {
        self.state.resources_by_custodian(custodian)
    }

    pub fn total_protocol_fees(&self) -> Amount {
        self.state.total_protocol_fees()
    }

    pub fn events(&self) -> &[ProtocolEvent] {
        self.state.events()
    }

    /// Amount custody must hold to cover every obligation
    pub fn custody_liabilities(&self) -> Result<Amount> {
        self.state.liabilities()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for token holders (approvals, transfers)
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn into_parts(self) -> (ProtocolState, L) {
        (self.state, self.ledger)
    }
}

impl<L: TokenLedger + Clone> Protocol<L, EcdsaVerifier, SystemClock> {
    /// Protocol verifying ECDSA signatures against wall-clock time
    pub fn with_defaults(config: ProtocolConfig, custody: Address, ledger: L) -> Result<Self> {
        Self::new(config, custody, ledger, EcdsaVerifier, SystemClock)
    }
}
