//! Test harness
//!
//! A protocol over an in-memory ledger and a manual clock, with helpers to
//! fund accounts, register custodians holding real signing keys and create
//! resources from signed commitments.

use sarco_core::{
    keccak256, Address, Amount, Commitment, EcdsaVerifier, KeyShare, Keypair, PublicKey,
    ResourceId, Signature, Timestamp, DAY, WEEK,
};

use crate::clock::ManualClock;
use crate::config::ProtocolConfig;
use crate::custodian::CustodianTerms;
use crate::error::Result;
use crate::ledger::{MemoryLedger, TokenLedger};
use crate::sarcophagus::{CreateParams, CustodianCommitment, RevealMode};
use crate::service::Protocol;

/// Harness start time
pub const GENESIS: Timestamp = 1_700_000_000;

/// Protocol type used by the harness
pub type TestProtocol = Protocol<MemoryLedger, EcdsaVerifier, ManualClock>;

/// Terms with the given minimum fee and bond, a curse fee of 10, a 30 day
/// interval limit and no resurrection limit
pub fn terms(minimum_fee_per_second: Amount, free_bond: Amount) -> CustodianTerms {
    CustodianTerms {
        peer_id: "12D3KooWTest".to_string(),
        minimum_fee_per_second,
        maximum_allowed_interval: 30 * DAY,
        maximum_allowed_resurrection_timestamp: Timestamp::MAX,
        curse_fee: 10,
        free_bond,
    }
}

/// A custodian agent with its signing key and quoted fees
#[derive(Debug, Clone)]
pub struct TestCustodian {
    pub keypair: Keypair,
    pub address: Address,
    pub fee_per_second: Amount,
    pub curse_fee: Amount,
}

impl TestCustodian {
    pub fn new(fee_per_second: Amount, curse_fee: Amount) -> Self {
        let keypair = Keypair::generate();
        let address = keypair.address();
        Self {
            keypair,
            address,
            fee_per_second,
            curse_fee,
        }
    }

    /// Fresh random 32-byte secret, usable as a share or as a private key
    pub fn secret() -> KeyShare {
        KeyShare::new(Keypair::generate().to_bytes().to_vec())
    }

    /// Sign an agreement to curse `params`, committing to `secret` as `mode`
    pub fn commit(
        &self,
        params: &CreateParams,
        mode: RevealMode,
        secret: &KeyShare,
    ) -> sarco_core::Result<CustodianCommitment> {
        let commitment = match mode {
            RevealMode::KeyShare => Commitment::for_share(secret.as_bytes()),
            RevealMode::PrivateKey => {
                Commitment::PublicKey(PublicKey::from_private_key(secret.as_bytes())?)
            }
        };
        let mut signed = CustodianCommitment {
            custodian: self.address,
            fee_per_second: self.fee_per_second,
            curse_fee: self.curse_fee,
            commitment,
            signature: Signature::new([0; 65]),
        };
        signed.signature = self.keypair.sign_digest(&signed.message(params).digest())?;
        Ok(signed)
    }
}

/// A created resource and the secrets its custodians hold, in custodian order
#[derive(Debug, Clone)]
pub struct Fixture {
    pub id: ResourceId,
    pub params: CreateParams,
    pub secrets: Vec<KeyShare>,
}

pub struct Harness {
    pub protocol: TestProtocol,
    pub clock: ManualClock,
    pub admin: Address,
    next_account: u64,
    next_resource: u64,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Default configuration
    pub fn new() -> Self {
        Self::with_config(ProtocolConfig::default())
    }

    /// Custom configuration; the admin is always replaced by the harness admin
    pub fn with_config(mut config: ProtocolConfig) -> Self {
        let admin = derived_address(b"admin", 0);
        config.admin = admin;
        let clock = ManualClock::new(GENESIS);
        let custody = derived_address(b"custody", 0);
        let protocol = match Protocol::new(
            config,
            custody,
            MemoryLedger::new(),
            EcdsaVerifier,
            clock.clone(),
        ) {
            Ok(protocol) => protocol,
            Err(e) => panic!("harness config rejected: {e}"),
        };
        Self {
            protocol,
            clock,
            admin,
            next_account: 0,
            next_resource: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.protocol.now()
    }

    pub fn advance(&self, seconds: u64) {
        self.clock.advance(seconds);
    }

    pub fn set_time(&self, t: Timestamp) {
        self.clock.set(t);
    }

    pub fn balance(&self, owner: &Address) -> Amount {
        self.protocol.ledger().balance_of(owner)
    }

    pub fn custody_balance(&self) -> Amount {
        self.balance(&self.protocol.custody())
    }

    /// Mint `amount` to a fresh address that has approved custody without limit
    pub fn funded_account(&mut self, amount: Amount) -> Address {
        self.next_account += 1;
        let account = derived_address(b"account", self.next_account);
        self.fund(account, amount);
        account
    }

    /// Mint to `account` and approve custody without limit
    pub fn fund(&mut self, account: Address, amount: Amount) {
        let custody = self.protocol.custody();
        let ledger = self.protocol.ledger_mut();
        ledger.mint(account, amount);
        ledger.approve(account, custody, Amount::MAX);
    }

    /// A funded custodian that has not registered
    pub fn unregistered_custodian(&mut self, fee_per_second: Amount, curse_fee: Amount) -> TestCustodian {
        let custodian = TestCustodian::new(fee_per_second, curse_fee);
        self.fund(custodian.address, 0);
        custodian
    }

    /// Register `count` custodians quoting `fee_per_second` and `curse_fee`,
    /// each bonding `bond`
    pub fn custodians(
        &mut self,
        count: usize,
        fee_per_second: Amount,
        curse_fee: Amount,
        bond: Amount,
    ) -> Vec<TestCustodian> {
        (0..count)
            .map(|_| {
                let custodian = TestCustodian::new(fee_per_second, curse_fee);
                self.fund(custodian.address, bond);
                let mut t = terms(fee_per_second, bond);
                t.curse_fee = curse_fee;
                if let Err(e) = self.protocol.register(custodian.address, t) {
                    panic!("custodian registration failed: {e}");
                }
                custodian
            })
            .collect()
    }

    /// Parameters created now with a two week maximum interval
    pub fn params(&mut self, resurrection_time: Timestamp, threshold: u32, mode: RevealMode) -> CreateParams {
        self.next_resource += 1;
        CreateParams {
            name: format!("resource-{}", self.next_resource),
            payload_ref: format!("arweave-tx-{}", self.next_resource),
            recipient: derived_address(b"recipient", self.next_resource),
            resurrection_time,
            maximum_rewrap_interval: 2 * WEEK,
            threshold,
            creation_time: self.now(),
            reveal_mode: mode,
        }
    }

    pub fn resource_id(&self, embalmer: Address, params: &CreateParams) -> ResourceId {
        ResourceId::derive(&embalmer, &params.name, &params.payload_ref, params.creation_time)
    }

    /// Fresh secrets and signed commitments from every custodian
    pub fn sign(
        &self,
        custodians: &[TestCustodian],
        params: &CreateParams,
    ) -> sarco_core::Result<(Vec<CustodianCommitment>, Vec<KeyShare>)> {
        let mut commitments = Vec::with_capacity(custodians.len());
        let mut secrets = Vec::with_capacity(custodians.len());
        for custodian in custodians {
            let secret = TestCustodian::secret();
            commitments.push(custodian.commit(params, params.reveal_mode, &secret)?);
            secrets.push(secret);
        }
        Ok((commitments, secrets))
    }

    /// Sign and create a resource owned by `embalmer`
    pub fn create(
        &mut self,
        embalmer: Address,
        custodians: &[TestCustodian],
        params: CreateParams,
    ) -> Result<Fixture> {
        let (commitments, secrets) = self.sign(custodians, &params)?;
        let id = self.resource_id(embalmer, &params);
        self.protocol
            .create(embalmer, id, params.clone(), commitments)?;
        Ok(Fixture {
            id,
            params,
            secrets,
        })
    }

    /// Custody holds exactly its liabilities, bond records agree with
    /// profiles and no tokens were created or destroyed
    pub fn assert_solvent(&self) {
        let liabilities = match self.protocol.custody_liabilities() {
            Ok(amount) => amount,
            Err(e) => panic!("liabilities overflowed: {e}"),
        };
        assert_eq!(self.custody_balance(), liabilities, "custody balance != liabilities");
        assert!(self.protocol.state().bonds_consistent(), "record bonds != profile bonds");
        let ledger = self.protocol.ledger();
        assert_eq!(ledger.sum_of_balances(), ledger.total_supply(), "token supply changed");
    }
}

fn derived_address(domain: &[u8], n: u64) -> Address {
    let mut input = domain.to_vec();
    input.extend_from_slice(&n.to_be_bytes());
    let hash = keccak256(&input);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}
