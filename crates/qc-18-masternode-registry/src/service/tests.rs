use super::*;
use crate::adapters::{InMemoryChainIndex, InMemoryCoinView, InMemoryKVStore};
use crate::domain::RevocationReason;
use shared_types::{
    sha256, BlsPublicKey, BlsScheme, Coin, CommitmentTxPayload, FinalCommitment, KeyId, OutPoint,
    ProRegTx, ProUpRegTx, ProUpRevTx, ProUpServTx, Script, SpecialPayload, Transaction, TxIn,
    TxOut,
};
use std::net::SocketAddr;

const COLLATERAL: i64 = 1000;

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<(bool, Height, usize, usize)>>,
}

impl RegistryListener for RecordingListener {
    fn registry_updated(&self, undo: bool, base: &Registry, delta: &RegistryDelta) {
        self.events
            .lock()
            .push((undo, base.height(), delta.added.len(), delta.removed.len()));
    }
}

type TestManager = RegistryManager<InMemoryKVStore, InMemoryChainIndex>;

struct Harness {
    manager: TestManager,
    chain: Arc<InMemoryChainIndex>,
    listener: Arc<RecordingListener>,
    coins: InMemoryCoinView,
    blocks: Vec<Block>,
}

fn config() -> RegistryConfig {
    RegistryConfig::regtest().with_collateral_amount(COLLATERAL)
}

fn block_hash(prev: &Hash, height: Height) -> Hash {
    let mut buf = prev.to_vec();
    buf.extend_from_slice(&height.to_le_bytes());
    sha256(&buf)
}

fn addr(n: u8) -> SocketAddr {
    SocketAddr::from(([10, 1, 0, n], 19999))
}

fn operator(n: u8) -> BlsPublicKey {
    BlsPublicKey::new([n; 48], BlsScheme::Basic)
}

fn coinbase(height: Height) -> Transaction {
    Transaction {
        txid: sha256(&height.to_le_bytes()),
        inputs: vec![],
        outputs: vec![],
        payload: None,
    }
}

fn pro_reg(n: u8, collateral: OutPoint, service_addr: Option<SocketAddr>) -> ProRegTx {
    ProRegTx {
        collateral,
        service_addr,
        owner_key: KeyId([n; 20]),
        operator_key: operator(n),
        voting_key: KeyId([n; 20]),
        operator_reward: 0,
        payout_script: Script::new(vec![0x76, n]),
    }
}

/// Registration with the collateral in output 0 of the registering tx.
fn register(n: u8) -> Transaction {
    register_with(n, pro_reg(n, OutPoint::new(ZERO_HASH, 0), Some(addr(n))))
}

fn register_with(n: u8, pro_tx: ProRegTx) -> Transaction {
    Transaction {
        txid: [n; 32],
        inputs: vec![],
        outputs: vec![TxOut {
            value: COLLATERAL,
            script_pubkey: Script::default(),
        }],
        payload: Some(SpecialPayload::ProviderRegister(pro_tx)),
    }
}

fn special(txid: u8, payload: SpecialPayload) -> Transaction {
    Transaction {
        txid: [txid; 32],
        inputs: vec![],
        outputs: vec![],
        payload: Some(payload),
    }
}

fn spend(prevout: OutPoint) -> Transaction {
    Transaction {
        txid: [0xCC; 32],
        inputs: vec![TxIn { prevout }],
        outputs: vec![],
        payload: None,
    }
}

impl Harness {
    fn new() -> Self {
        Self::with_config(config())
    }

    fn with_config(config: RegistryConfig) -> Self {
        let chain = Arc::new(InMemoryChainIndex::new());
        let listener = Arc::new(RecordingListener::default());
        let genesis = Block {
            hash: block_hash(&ZERO_HASH, 0),
            prev_hash: ZERO_HASH,
            height: 0,
            transactions: vec![coinbase(0)],
        };
        chain.insert(genesis.block_ref());

        let manager = RegistryManager::new(RegistryDependencies {
            kv_store: InMemoryKVStore::new(),
            chain: Arc::clone(&chain),
            listener: listener.clone(),
            config,
        })
        .unwrap();
        Self {
            manager,
            chain,
            listener,
            coins: InMemoryCoinView::new(),
            blocks: vec![genesis],
        }
    }

    fn tip(&self) -> &Block {
        self.blocks.last().expect("genesis is always present")
    }

    fn next_block(&self, txs: Vec<Transaction>) -> Block {
        let prev = self.tip();
        let height = prev.height + 1;
        let mut transactions = vec![coinbase(height)];
        transactions.extend(txs);
        Block {
            hash: block_hash(&prev.hash, height),
            prev_hash: prev.hash,
            height,
            transactions,
        }
    }

    fn connect(&mut self, txs: Vec<Transaction>) -> RegistryResult<Block> {
        let block = self.next_block(txs);
        self.chain.insert(block.block_ref());
        self.manager.process_block(&block, &self.coins, true)?;
        self.blocks.push(block.clone());
        Ok(block)
    }

    /// Connects a block whose coinbase carries `payload`.
    fn connect_with_commitments(
        &mut self,
        payload: CommitmentTxPayload,
        txs: Vec<Transaction>,
    ) -> RegistryResult<Block> {
        let mut block = self.next_block(txs);
        block.transactions[0].payload = Some(SpecialPayload::QuorumCommitment(payload));
        self.chain.insert(block.block_ref());
        self.manager.process_block(&block, &self.coins, true)?;
        self.blocks.push(block.clone());
        Ok(block)
    }

    fn connect_empty(&mut self, count: usize) {
        for _ in 0..count {
            self.connect(vec![]).unwrap();
        }
    }

    fn disconnect(&mut self) -> RegistryResult<()> {
        let block = self.tip().clone();
        self.manager.undo_block(&block)?;
        self.blocks.pop();
        Ok(())
    }

    fn list(&self) -> Registry {
        self.manager.list_at_chain_tip().unwrap()
    }

    fn state(&self, n: u8) -> Arc<ProviderState> {
        Arc::clone(&self.list().get(&[n; 32]).expect("provider exists").state)
    }
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_register_with_internal_collateral() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();

    let list = h.list();
    let record = list.get(&[1; 32]).unwrap();
    assert_eq!(record.internal_id, 0);
    assert_eq!(record.collateral, OutPoint::new([1; 32], 0));
    assert_eq!(record.state.registered_height, 1);
    assert_eq!(record.state.collateral_height, 1);
    assert!(record.is_valid());
    assert_eq!(list.total_registered(), 1);
    assert_eq!(list.height(), 1);
}

#[test]
fn test_register_with_external_collateral() {
    let mut h = Harness::new();
    let collateral = OutPoint::new([0x77; 32], 3);
    h.coins.add_coin(
        collateral,
        Coin {
            output: TxOut {
                value: COLLATERAL,
                script_pubkey: Script::default(),
            },
            height: 0,
        },
    );
    h.connect(vec![register_with(2, pro_reg(2, collateral, Some(addr(2))))])
        .unwrap();

    let record = h.list().get(&[2; 32]).cloned().unwrap();
    assert_eq!(record.collateral, collateral);
    assert_eq!(record.state.collateral_height, 0);
}

#[test]
fn test_external_collateral_must_exist_with_exact_value() {
    let mut h = Harness::new();
    let collateral = OutPoint::new([0x77; 32], 3);
    let err = h
        .connect(vec![register_with(2, pro_reg(2, collateral, Some(addr(2))))])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-collateral"));

    h.coins.add_coin(
        collateral,
        Coin {
            output: TxOut {
                value: COLLATERAL - 1,
                script_pubkey: Script::default(),
            },
            height: 0,
        },
    );
    let err = h
        .connect(vec![register_with(2, pro_reg(2, collateral, Some(addr(2))))])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-collateral"));
    assert_eq!(h.tip().height, 0);
}

#[test]
fn test_registration_on_used_collateral_replaces_provider() {
    let mut h = Harness::new();
    let collateral = OutPoint::new([0x77; 32], 0);
    h.coins.add_coin(
        collateral,
        Coin {
            output: TxOut {
                value: COLLATERAL,
                script_pubkey: Script::default(),
            },
            height: 0,
        },
    );
    h.connect(vec![register_with(1, pro_reg(1, collateral, Some(addr(1))))])
        .unwrap();
    // same address and keys are free again once the old provider is gone
    let mut second = pro_reg(1, collateral, Some(addr(1)));
    second.payout_script = Script::new(vec![0x51]);
    h.connect(vec![register_with(9, second)]).unwrap();

    let list = h.list();
    assert!(!list.contains(&[1; 32]));
    let replacement = list.get(&[9; 32]).unwrap();
    assert_eq!(replacement.internal_id, 1);
    assert_eq!(list.total_registered(), 2);
    assert_eq!(list.get_by_collateral(&collateral).unwrap().pro_tx_hash, [9; 32]);
}

#[test]
fn test_duplicate_address_rejects_block() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    let before = h.list();

    let err = h
        .connect(vec![register_with(
            2,
            pro_reg(2, OutPoint::new(ZERO_HASH, 0), Some(addr(1))),
        )])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-dup-addr"));
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(h.list(), before);
}

#[test]
fn test_duplicate_owner_or_operator_key_rejects_block() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();

    let mut dup_owner = pro_reg(2, OutPoint::new(ZERO_HASH, 0), Some(addr(2)));
    dup_owner.owner_key = KeyId([1; 20]);
    let err = h.connect(vec![register_with(2, dup_owner)]).unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-dup-key"));

    let mut dup_operator = pro_reg(3, OutPoint::new(ZERO_HASH, 0), Some(addr(3)));
    dup_operator.operator_key = BlsPublicKey::new([1; 48], BlsScheme::Legacy);
    let err = h.connect(vec![register_with(3, dup_operator)]).unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-dup-key"));

    // voting key colliding with another provider's owner key
    let mut dup_voting = pro_reg(4, OutPoint::new(ZERO_HASH, 0), Some(addr(4)));
    dup_voting.voting_key = KeyId([1; 20]);
    let err = h.connect(vec![register_with(4, dup_voting)]).unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-dup-key"));
}

#[test]
fn test_operator_reward_out_of_range_rejected() {
    let mut h = Harness::new();
    let mut pro_tx = pro_reg(1, OutPoint::new(ZERO_HASH, 0), Some(addr(1)));
    pro_tx.operator_reward = 10_001;
    let err = h.connect(vec![register_with(1, pro_tx)]).unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-payload"));
}

#[test]
fn test_registration_without_address_starts_banned() {
    let mut h = Harness::new();
    h.connect(vec![register_with(
        1,
        pro_reg(1, OutPoint::new(ZERO_HASH, 0), None),
    )])
    .unwrap();
    assert_eq!(h.state(1).pose_ban_height, 1);
    assert_eq!(h.list().valid_count(), 0);
}

// =============================================================================
// Updates and revocation
// =============================================================================

#[test]
fn test_update_service_revives_banned_provider() {
    let mut h = Harness::new();
    h.connect(vec![register_with(
        1,
        pro_reg(1, OutPoint::new(ZERO_HASH, 0), None),
    )])
    .unwrap();

    h.connect(vec![special(
        0x21,
        SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [1; 32],
            service_addr: Some(addr(1)),
            operator_payout_script: Script::new(vec![0x52]),
        }),
    )])
    .unwrap();

    let state = h.state(1);
    assert!(!state.is_banned());
    assert_eq!(state.pose_revived_height, 2);
    assert_eq!(state.service_addr, Some(addr(1)));
    assert_eq!(h.list().get_by_service(&addr(1)).unwrap().pro_tx_hash, [1; 32]);
}

#[test]
fn test_update_service_checks_address_owner_and_provider() {
    let mut h = Harness::new();
    h.connect(vec![register(1), register(2)]).unwrap();

    let steal = special(
        0x21,
        SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [2; 32],
            service_addr: Some(addr(1)),
            operator_payout_script: Script::default(),
        }),
    );
    assert_eq!(
        h.connect(vec![steal]).unwrap_err().reject_reason(),
        Some("bad-protx-dup-addr")
    );

    // re-announcing its own address is fine
    let same = special(
        0x22,
        SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [1; 32],
            service_addr: Some(addr(1)),
            operator_payout_script: Script::default(),
        }),
    );
    h.connect(vec![same]).unwrap();

    let unknown = special(
        0x23,
        SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [7; 32],
            service_addr: Some(addr(7)),
            operator_payout_script: Script::default(),
        }),
    );
    assert_eq!(
        h.connect(vec![unknown]).unwrap_err().reject_reason(),
        Some("bad-protx-hash")
    );
}

#[test]
fn test_unspecified_service_address_rejected() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    let before = h.list();

    let unspecified = SocketAddr::from(([0u16; 8], 0));
    let err = h
        .connect(vec![register_with(
            2,
            pro_reg(2, OutPoint::new(ZERO_HASH, 0), Some(unspecified)),
        )])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-protx-ipaddr"));

    let zero_port = special(
        0x24,
        SpecialPayload::ProviderUpdateService(ProUpServTx {
            pro_tx_hash: [1; 32],
            service_addr: Some(SocketAddr::from(([10, 1, 0, 9], 0))),
            operator_payout_script: Script::default(),
        }),
    );
    assert_eq!(
        h.connect(vec![zero_port]).unwrap_err().reject_reason(),
        Some("bad-protx-ipaddr")
    );
    assert_eq!(h.list(), before);
}

#[test]
fn test_update_registrar_operator_change_bans_and_resets() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();

    h.connect(vec![special(
        0x31,
        SpecialPayload::ProviderUpdateRegistrar(ProUpRegTx {
            pro_tx_hash: [1; 32],
            operator_key: operator(0x41),
            voting_key: KeyId([0x42; 20]),
            payout_script: Script::new(vec![0x53]),
        }),
    )])
    .unwrap();

    let state = h.state(1);
    assert_eq!(state.pose_ban_height, 2);
    assert_eq!(state.service_addr, None);
    assert_eq!(state.operator_key, operator(0x41));
    assert_eq!(state.voting_key, KeyId([0x42; 20]));
    // the old address and operator key are free again
    let list = h.list();
    assert!(list.get_by_service(&addr(1)).is_none());
    assert!(list.get_by_operator_key(&operator(1)).is_none());
    assert!(list.get_by_operator_key(&operator(0x41)).is_some());
}

#[test]
fn test_update_registrar_same_operator_keeps_provider_valid() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    h.connect(vec![special(
        0x31,
        SpecialPayload::ProviderUpdateRegistrar(ProUpRegTx {
            pro_tx_hash: [1; 32],
            operator_key: operator(1),
            voting_key: KeyId([0x42; 20]),
            payout_script: Script::new(vec![0x53]),
        }),
    )])
    .unwrap();

    let state = h.state(1);
    assert!(!state.is_banned());
    assert_eq!(state.service_addr, Some(addr(1)));
    assert_eq!(state.payout_script, Script::new(vec![0x53]));
}

#[test]
fn test_revocation_bans_and_records_reason() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    h.connect(vec![special(
        0x41,
        SpecialPayload::ProviderRevoke(ProUpRevTx {
            pro_tx_hash: [1; 32],
            reason: RevocationReason::CompromisedKeys as u16,
        }),
    )])
    .unwrap();

    let state = h.state(1);
    assert!(state.is_banned());
    assert_eq!(state.revocation_reason, RevocationReason::CompromisedKeys as u16);
    assert!(!state.operator_key.is_valid());
    assert_eq!(state.service_addr, None);
}

#[test]
fn test_collateral_spend_removes_provider() {
    let mut h = Harness::new();
    h.connect(vec![register(1), register(2)]).unwrap();
    h.connect(vec![spend(OutPoint::new([1; 32], 0))]).unwrap();

    let list = h.list();
    assert!(!list.contains(&[1; 32]));
    assert!(list.contains(&[2; 32]));
    assert!(!list.has_unique_property(&UniqueProperty::Address(addr(1))));
    assert_eq!(list.total_registered(), 2);
}

// =============================================================================
// Per-block bookkeeping
// =============================================================================

#[test]
fn test_previous_payee_marked_paid() {
    let mut h = Harness::new();
    h.connect(vec![register(1), register(2)]).unwrap();
    let expected = h.list().payee().unwrap().pro_tx_hash;
    assert_eq!(expected, [1; 32]);

    h.connect(vec![]).unwrap();
    assert_eq!(h.state(1).last_paid_height, 2);
    assert_eq!(h.state(2).last_paid_height, 0);
    assert_eq!(h.list().payee().unwrap().pro_tx_hash, [2; 32]);
}

#[test]
fn test_confirmation_after_two_rounds() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    h.connect_empty(2);
    assert!(!h.state(1).is_confirmed());

    // prev height 3 - registered 1 reaches 2 * one valid provider
    h.connect(vec![]).unwrap();
    let confirmed_at = h.blocks[3].hash;
    let state = h.state(1);
    assert_eq!(state.confirmed_hash, confirmed_at);

    let mut buf = [1u8; 64].to_vec();
    buf[32..].copy_from_slice(&confirmed_at);
    assert_eq!(state.confirmed_hash_with_pro_tx, sha256(&buf));
}

/// Registers providers 1..=count in block 1 and mines up to `height`.
fn harness_with_providers(count: u8, height: Height) -> Harness {
    let mut h = Harness::new();
    h.connect((1..=count).map(register).collect()).unwrap();
    while h.tip().height < height {
        h.connect(vec![]).unwrap();
    }
    h
}

fn commitment(llmq_type: LlmqType, quorum_hash: Hash, valid_members: Vec<bool>) -> FinalCommitment {
    FinalCommitment {
        llmq_type: llmq_type.as_u8(),
        quorum_hash,
        signers: vec![true; valid_members.len()],
        valid_members,
        quorum_public_key: operator(0x99),
    }
}

fn commitments(height: Height, commitments: Vec<FinalCommitment>) -> CommitmentTxPayload {
    CommitmentTxPayload {
        height,
        commitments,
    }
}

fn test_commitment(height: Height, quorum_hash: Hash, valid_members: Vec<bool>) -> CommitmentTxPayload {
    commitments(
        height,
        vec![commitment(LlmqType::LlmqTest, quorum_hash, valid_members)],
    )
}

#[test]
fn test_failed_dkg_members_punished() {
    let mut h = harness_with_providers(5, 29);
    let base = h.blocks[24].block_ref();
    let members = h.manager.quorum_members(LlmqType::LlmqTest, &base).unwrap();
    assert_eq!(members.len(), 3);

    h.connect_with_commitments(test_commitment(30, base.hash, vec![true, false, true]), vec![])
        .unwrap();

    let list = h.list();
    let penalty = |i: usize| list.get(&members[i].pro_tx_hash).unwrap().state.pose_penalty;
    assert_eq!(penalty(0), 0);
    assert_eq!(penalty(1), 66);
    assert_eq!(penalty(2), 0);

    // decays by one per block on regtest
    h.connect(vec![]).unwrap();
    assert_eq!(
        h.list().get(&members[1].pro_tx_hash).unwrap().state.pose_penalty,
        65
    );

    // a second failure reaches the maximum and bans
    h.connect_with_commitments(test_commitment(32, base.hash, vec![true, false, true]), vec![])
        .unwrap();
    let state = Arc::clone(&h.list().get(&members[1].pro_tx_hash).unwrap().state);
    assert_eq!(state.pose_penalty, 100);
    assert_eq!(state.pose_ban_height, 32);
}

#[test]
fn test_commitments_outside_coinbase_ignored() {
    let mut h = harness_with_providers(5, 29);
    let base = h.blocks[24].block_ref();
    let members = h.manager.quorum_members(LlmqType::LlmqTest, &base).unwrap();
    let failed = members[1].pro_tx_hash;

    let payload = test_commitment(30, base.hash, vec![true, false, true]);
    let stray = |txid| special(txid, SpecialPayload::QuorumCommitment(payload.clone()));
    h.connect_with_commitments(payload.clone(), vec![stray(0x51), stray(0x52)])
        .unwrap();

    // one failed session adds one penalty, whatever other txs carry
    let state = h.list().get(&failed).unwrap().state.clone();
    assert_eq!(state.pose_penalty, 66);
    assert!(!state.is_banned());

    h.connect(vec![stray(0x53)]).unwrap();
    assert_eq!(h.list().get(&failed).unwrap().state.pose_penalty, 65);
}

#[test]
fn test_repeated_commitment_in_coinbase_rejected() {
    let mut h = harness_with_providers(5, 29);
    let base = h.blocks[24].block_ref();
    let before = h.list();

    let twice = commitment(LlmqType::LlmqTest, base.hash, vec![true, false, true]);
    let err = h
        .connect_with_commitments(commitments(30, vec![twice.clone(), twice]), vec![])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-qc-dup"));
    assert_eq!(h.list(), before);
}

#[test]
fn test_commitment_with_wrong_quorum_hash_rejected() {
    let mut h = harness_with_providers(3, 29);
    let err = h
        .connect_with_commitments(test_commitment(30, [0xAB; 32], vec![true, true, true]), vec![])
        .unwrap_err();
    assert_eq!(err.reject_reason(), Some("bad-qc-quorum-hash"));
}

#[test]
fn test_null_and_unknown_type_commitments_ignored() {
    let mut h = harness_with_providers(3, 29);
    let null = FinalCommitment {
        llmq_type: LlmqType::LlmqTest.as_u8(),
        quorum_hash: [0xAB; 32],
        signers: vec![false; 3],
        valid_members: vec![false; 3],
        quorum_public_key: BlsPublicKey::default(),
    };
    let unknown = commitment(LlmqType::Llmq400_85, [0xAB; 32], vec![false; 3]);
    h.connect_with_commitments(commitments(30, vec![null, unknown]), vec![])
        .unwrap();
    assert!(h.list().iter().all(|r| r.state.pose_penalty == 0));
}

// =============================================================================
// Persistence, undo, notifications
// =============================================================================

#[test]
fn test_snapshots_written_on_first_block_and_period() {
    let h = harness_with_providers(2, 50);
    // regtest period is 24; the first processed block always gets one
    assert_eq!(h.manager.store().snapshot_heights().unwrap(), vec![1, 24, 48]);
    let best = h.manager.store().best_block().unwrap().unwrap();
    assert_eq!(best, (h.tip().hash, 50));
}

#[test]
fn test_undo_restores_parent_registry() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    let before = h.list();

    h.connect(vec![register(2), spend(OutPoint::new([1; 32], 0))])
        .unwrap();
    assert_eq!(h.list().total_registered(), 2);

    h.disconnect().unwrap();
    let after = h.list();
    assert_eq!(after, before);
    assert_eq!(after.total_registered(), 1);
    assert_eq!(h.manager.tip().unwrap().hash, h.tip().hash);
    assert_eq!(
        h.manager.store().best_block().unwrap(),
        Some((h.tip().hash, 1))
    );
}

#[test]
fn test_listener_sees_connect_and_undo() {
    let mut h = Harness::new();
    h.connect(vec![register(1)]).unwrap();
    h.connect(vec![register(2)]).unwrap();
    h.disconnect().unwrap();

    let events = h.listener.events.lock().clone();
    assert_eq!(
        events,
        vec![(false, -1, 1, 0), (false, 1, 1, 0), (true, 2, 0, 1)]
    );
}

#[test]
fn test_replay_from_disk_matches_cached_lists() {
    let h = harness_with_providers(4, 30);
    let kv = h.manager.store().with_kv(|kv| kv.clone());

    let fresh = RegistryManager::new(RegistryDependencies {
        kv_store: kv,
        chain: Arc::clone(&h.chain),
        listener: Arc::new(crate::ports::NoopListener),
        config: config(),
    })
    .unwrap();
    for height in [1usize, 5, 24, 29, 30] {
        let block = h.blocks[height].block_ref();
        assert_eq!(
            fresh.get_list_for_block(&block).unwrap(),
            h.manager.get_list_for_block(&block).unwrap()
        );
    }
    assert_eq!(fresh.restore_tip().unwrap(), Some(h.tip().block_ref()));
}

#[test]
fn test_unknown_block_is_not_found() {
    let h = Harness::new();
    let err = h
        .manager
        .get_list_for_block(&BlockRef::new([0x42; 32], 7, [0x41; 32]))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn test_zero_dkg_interval_config_rejected_at_startup() {
    let json = r#"{
        "snapshot_period": 24,
        "llmqs": [{
            "llmq_type": "LlmqTest", "name": "llmq_test", "size": 3, "min_size": 2,
            "threshold": 2, "dkg_interval": 0, "dkg_phase_blocks": 2,
            "dkg_mining_window_start": 10, "dkg_mining_window_end": 18,
            "dkg_bad_votes_threshold": 2, "signing_active_quorum_count": 4,
            "keep_old_connections": 5, "recovery_members": 3
        }]
    }"#;
    let config: RegistryConfig = serde_json::from_str(json).unwrap();

    let result: RegistryResult<TestManager> = RegistryManager::new(RegistryDependencies {
        kv_store: InMemoryKVStore::new(),
        chain: Arc::new(InMemoryChainIndex::new()),
        listener: Arc::new(crate::ports::NoopListener),
        config,
    });
    let err = result.err().expect("config must be rejected");
    assert_eq!(err.class(), ErrorClass::Config);
}

#[test]
fn test_enforcement_and_inactive_heights() {
    let config = config()
        .with_activation_height(3)
        .with_enforcement_height(5);
    let mut h = Harness::with_config(config);
    assert!(!h.manager.is_enforced(Some(4)));
    assert!(h.manager.is_enforced(Some(5)));

    // blocks below activation are not processed
    h.connect(vec![register(1)]).unwrap();
    assert_eq!(h.manager.store().best_block().unwrap(), None);
    h.manager.updated_block_tip(&h.tip().block_ref());
    assert!(h.list().is_empty());

    h.connect_empty(1);
    h.connect(vec![register(2)]).unwrap();
    assert_eq!(h.list().all_count(), 1);
    assert_eq!(h.list().height(), 3);
    assert!(!h.manager.is_enforced(None));
}

#[test]
fn test_quorum_members_cached_and_deterministic() {
    let h = harness_with_providers(6, 24);
    let base = h.blocks[24].block_ref();
    let first = h.manager.quorum_members(LlmqType::LlmqTest, &base).unwrap();
    let second = h.manager.quorum_members(LlmqType::LlmqTest, &base).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let list = h.manager.get_list_for_block(&base).unwrap();
    let expected = list.calculate_quorum(3, &quorum_modifier(LlmqType::LlmqTest, &base.hash));
    assert_eq!(*first, expected);

    // types not configured have no members
    assert!(h
        .manager
        .quorum_members(LlmqType::Llmq400_60, &base)
        .unwrap()
        .is_empty());
}
