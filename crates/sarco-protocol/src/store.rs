//! Protocol store
//!
//! One state struct holds every profile, resource, bonded record, secondary
//! index and the event log. Engines never keep state of their own: they are
//! handed a [`Tx`] borrowing a working copy of the store plus the ledger, and
//! the copy only replaces the live one if the engine returns `Ok`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use sarco_core::{Address, Amount, ResourceId, Timestamp};

use crate::config::ProtocolConfig;
use crate::custodian::CustodianProfile;
use crate::error::{ProtocolError, Result};
use crate::events::ProtocolEvent;
use crate::ledger::TokenLedger;
use crate::sarcophagus::{BondedCustodianRecord, Sarcophagus};

/// Records of one resource, keyed by custodian
pub type RecordSet = BTreeMap<Address, BondedCustodianRecord>;

/// Complete persisted protocol state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolState {
    pub(crate) config: ProtocolConfig,

    /// Ledger account holding every bond and escrowed fee
    pub(crate) custody: Address,

    pub(crate) custodians: HashMap<Address, CustodianProfile>,
    pub(crate) resources: HashMap<ResourceId, Sarcophagus>,
    pub(crate) records: HashMap<ResourceId, RecordSet>,

    pub(crate) by_embalmer: HashMap<Address, Vec<ResourceId>>,
    pub(crate) by_recipient: HashMap<Address, Vec<ResourceId>>,
    pub(crate) by_custodian: HashMap<Address, Vec<ResourceId>>,

    pub(crate) total_protocol_fees: Amount,
    pub(crate) events: Vec<ProtocolEvent>,
}

impl ProtocolState {
    /// Empty state with the given configuration and custody account
    pub fn new(config: ProtocolConfig, custody: Address) -> Self {
        Self {
            config,
            custody,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn custodian(&self, address: &Address) -> Option<&CustodianProfile> {
        self.custodians.get(address)
    }

    pub fn custodians(&self) -> impl Iterator<Item = (&Address, &CustodianProfile)> {
        self.custodians.iter()
    }

    pub fn resource(&self, id: &ResourceId) -> Option<&Sarcophagus> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Sarcophagus> {
        self.resources.values()
    }

    pub fn bonded_record(
        &self,
        id: &ResourceId,
        custodian: &Address,
    ) -> Option<&BondedCustodianRecord> {
        self.records.get(id).and_then(|set| set.get(custodian))
    }

    /// Records of a resource in custodian order
    pub fn bonded_records(&self, id: &ResourceId) -> Vec<&BondedCustodianRecord> {
        let (Some(resource), Some(set)) = (self.resources.get(id), self.records.get(id)) else {
            return Vec::new();
        };
        resource
            .custodians
            .iter()
            .filter_map(|c| set.get(c))
            .collect()
    }

    pub fn resources_by_embalmer(&self, embalmer: &Address) -> &[ResourceId] {
        self.by_embalmer.get(embalmer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn resources_by_recipient(&self, recipient: &Address) -> &[ResourceId] {
        self.by_recipient.get(recipient).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn resources_by_custodian(&self, custodian: &Address) -> &[ResourceId] {
        self.by_custodian.get(custodian).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_protocol_fees(&self) -> Amount {
        self.total_protocol_fees
    }

    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// What custody owes: every bond and unwithdrawn reward, the fees still
    /// escrowed for pending records on live resources, and protocol fees
    pub fn liabilities(&self) -> Result<Amount> {
        let mut total: Amount = self.total_protocol_fees;
        for profile in self.custodians.values() {
            total = add(total, profile.free_bond)?;
            total = add(total, profile.cursed_bond)?;
            total = add(total, profile.accrued_rewards)?;
        }
        for resource in self.resources.values().filter(|r| r.holds_escrow()) {
            for record in self.records.get(&resource.id).into_iter().flat_map(|s| s.values()) {
                if record.is_pending() {
                    total = add(total, record.escrowed_fees(resource)?)?;
                }
            }
        }
        Ok(total)
    }

    /// Whether each profile's cursed bond equals the sum of its records' locks
    pub fn bonds_consistent(&self) -> bool {
        let mut locked: HashMap<Address, Amount> = HashMap::new();
        for set in self.records.values() {
            for record in set.values() {
                *locked.entry(record.custodian).or_insert(0) += record.cursed_bond;
            }
        }
        self.custodians
            .iter()
            .all(|(addr, p)| locked.get(addr).copied().unwrap_or(0) == p.cursed_bond)
    }

    // Mutation helpers used by the engines

    pub(crate) fn profile_mut(&mut self, address: &Address) -> Result<&mut CustodianProfile> {
        self.custodians
            .get_mut(address)
            .ok_or(ProtocolError::NotRegistered(*address))
    }

    pub(crate) fn load_resource(&self, id: &ResourceId) -> Result<Sarcophagus> {
        self.resources
            .get(id)
            .cloned()
            .ok_or(ProtocolError::NotFound(*id))
    }

    pub(crate) fn load_records(&self, id: &ResourceId) -> Result<RecordSet> {
        self.records
            .get(id)
            .cloned()
            .ok_or(ProtocolError::NotFound(*id))
    }

    pub(crate) fn store_resource(&mut self, resource: Sarcophagus) {
        self.resources.insert(resource.id, resource);
    }

    pub(crate) fn store_records(&mut self, id: ResourceId, records: RecordSet) {
        self.records.insert(id, records);
    }

    /// Insert a new resource with its records and index it
    pub(crate) fn insert_resource(&mut self, resource: Sarcophagus, records: RecordSet) {
        let id = resource.id;
        self.by_embalmer.entry(resource.embalmer).or_default().push(id);
        self.by_recipient.entry(resource.recipient).or_default().push(id);
        for custodian in &resource.custodians {
            self.by_custodian.entry(*custodian).or_default().push(id);
        }
        self.records.insert(id, records);
        self.resources.insert(id, resource);
    }

    pub(crate) fn credit_protocol_fees(&mut self, amount: Amount) -> Result<()> {
        self.total_protocol_fees = add(self.total_protocol_fees, amount)?;
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: ProtocolEvent) {
        self.events.push(event);
    }
}

/// Checked amount addition
pub(crate) fn add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(ProtocolError::ArithmeticOverflow)
}

/// Working copy of the store and ledger for one operation
pub(crate) struct Tx<'a, L> {
    pub state: &'a mut ProtocolState,
    pub ledger: &'a mut L,
    /// Clock reading taken at entry
    pub now: Timestamp,
}

impl<L: TokenLedger> Tx<'_, L> {
    /// Pull `amount` from `from` into custody using custody's allowance
    pub fn collect(&mut self, from: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let custody = self.state.custody;
        self.ledger
            .transfer_from(custody, from, custody, amount)
            .map_err(|e| {
                warn!(payer = %from, amount, error = %e, "Collection failed");
                ProtocolError::PaymentFailed(e.to_string())
            })
    }

    /// Pay `amount` out of custody to `to`
    pub fn pay(&mut self, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let custody = self.state.custody;
        self.ledger.transfer(custody, to, amount).map_err(|e| {
            warn!(payee = %to, amount, error = %e, "Payout failed");
            ProtocolError::PaymentFailed(e.to_string())
        })
    }
}

/// Run `op` against working copies and commit them only on success
///
/// The event log is append-only, so it stays out of the working copy: the
/// copy starts with an empty log and its events are appended on commit.
pub(crate) fn atomically<L, T>(
    state: &mut ProtocolState,
    ledger: &mut L,
    now: Timestamp,
    op: impl FnOnce(&mut Tx<'_, L>) -> Result<T>,
) -> Result<T>
where
    L: TokenLedger + Clone,
{
    let history = std::mem::take(&mut state.events);
    let mut working_state = state.clone();
    state.events = history;

    let mut working_ledger = ledger.clone();
    let output = {
        let mut tx = Tx {
            state: &mut working_state,
            ledger: &mut working_ledger,
            now,
        };
        op(&mut tx)?
    };

    let emitted = std::mem::take(&mut working_state.events);
    let history = std::mem::replace(state, working_state).events;
    state.events = history;
    state.events.extend(emitted);
    *ledger = working_ledger;
    Ok(output)
}
