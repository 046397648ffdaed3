//! # Block Processing
//!
//! Derives the registry of a block from its parent's registry. Steps, in
//! consensus order:
//!
//! 1. confirm providers with enough confirmations
//! 2. decay PoSe penalties on decay heights
//! 3. punish members that failed a DKG session committed in the coinbase
//! 4. apply provider transactions (register, update service, update
//!    registrar, revoke)
//! 5. remove providers whose collateral is spent
//! 6. mark the parent's payee as paid

use super::*;
use crate::domain::MAX_OPERATOR_REWARD;
use shared_types::{
    is_null_hash, CommitmentTxPayload, OutPoint, ProRegTx, ProUpRegTx, ProUpRevTx, ProUpServTx,
    SpecialPayload, Transaction,
};
use std::collections::HashSet;
use std::net::SocketAddr;

/// Turns a uniqueness failure into the matching block reject reason.
fn reject_duplicate(block: &Hash, err: RegistryError) -> RegistryError {
    match err {
        RegistryError::DuplicateUniqueProperty { property, .. } => {
            let reason = match property {
                "service address" => "bad-protx-dup-addr",
                "collateral" => "bad-protx-collateral",
                _ => "bad-protx-dup-key",
            };
            RegistryError::invalid_block(block, reason)
        }
        other => other,
    }
}

/// An announced address needs a concrete ip and port. `[::]:0` would also
/// encode the same as "no address".
fn check_service_addr(block: &Hash, addr: Option<SocketAddr>) -> RegistryResult<()> {
    match addr {
        Some(addr) if addr.ip().is_unspecified() || addr.port() == 0 => {
            Err(RegistryError::invalid_block(block, "bad-protx-ipaddr"))
        }
        _ => Ok(()),
    }
}

impl<KV, C> RegistryManager<KV, C>
where
    KV: KeyValueStore,
    C: ChainView,
{
    /// Registry after connecting `block` on top of `old`, the registry of
    /// its parent `prev`. The result carries the block height but a null
    /// block hash; the caller stamps the hash once the block is accepted.
    pub fn build_new_list_from_block(
        &self,
        block: &Block,
        prev: &BlockRef,
        old: &Registry,
        coins: &dyn CoinView,
        debug_logs: bool,
    ) -> RegistryResult<Registry> {
        let height = prev.height + 1;
        let mut list = old.clone();
        list.set_block(ZERO_HASH, height);

        let payee = old.payee().map(|r| r.pro_tx_hash);

        confirm_providers(old, prev, &mut list)?;

        if self.config.is_decay_height(height) {
            list.decrease_pose_penalties()?;
        }

        // only the coinbase carries the block's commitments
        if let Some(SpecialPayload::QuorumCommitment(payload)) =
            block.transactions.first().and_then(|tx| tx.payload.as_ref())
        {
            self.apply_commitments(block, prev, payload, &mut list, debug_logs)?;
        }

        // the coinbase never carries provider transactions or spends
        for tx in block.transactions.iter().skip(1) {
            match &tx.payload {
                Some(SpecialPayload::ProviderRegister(pro_tx)) => {
                    self.apply_registration(block, tx, pro_tx, coins, &mut list, debug_logs)?
                }
                Some(SpecialPayload::ProviderUpdateService(pro_tx)) => {
                    apply_update_service(block, pro_tx, &mut list, debug_logs)?
                }
                Some(SpecialPayload::ProviderUpdateRegistrar(pro_tx)) => {
                    apply_update_registrar(block, pro_tx, &mut list, debug_logs)?
                }
                Some(SpecialPayload::ProviderRevoke(pro_tx)) => {
                    apply_revocation(block, pro_tx, &mut list, debug_logs)?
                }
                _ => {}
            }
        }

        for tx in block.transactions.iter().skip(1) {
            for input in &tx.inputs {
                remove_spent_collateral(&input.prevout, &mut list, debug_logs)?;
            }
        }

        // paid once more even if it was banned in this block
        if let Some(hash) = payee {
            if let Some(record) = list.get(&hash) {
                let mut state = (*record.state).clone();
                state.last_paid_height = height;
                list.update_record(&hash, state)?;
            }
        }

        Ok(list)
    }

    fn apply_commitments(
        &self,
        block: &Block,
        prev: &BlockRef,
        payload: &CommitmentTxPayload,
        list: &mut Registry,
        debug_logs: bool,
    ) -> RegistryResult<()> {
        let mut seen = HashSet::new();
        for commitment in &payload.commitments {
            if commitment.is_null() {
                continue;
            }
            if !seen.insert((commitment.llmq_type, commitment.quorum_hash)) {
                return Err(RegistryError::invalid_block(&block.hash, "bad-qc-dup"));
            }
            let Some(params) =
                LlmqType::from_u8(commitment.llmq_type).and_then(|t| self.config.llmq(t))
            else {
                continue;
            };

            let base_height = params.quorum_base_height(payload.height);
            let base = match self.chain.ancestor(prev, base_height) {
                Some(base) if base.hash == commitment.quorum_hash => base,
                _ => return Err(RegistryError::invalid_block(&block.hash, "bad-qc-quorum-hash")),
            };

            let members = self.quorum_members_for(params, &base)?;
            let penalty = list.calc_penalty(self.config.punish_percent);
            for (i, member) in members.iter().enumerate() {
                if !list.contains(&member.pro_tx_hash) {
                    continue;
                }
                if commitment.valid_members.get(i) == Some(&false) {
                    list.pose_punish(&member.pro_tx_hash, penalty, debug_logs)?;
                }
            }
        }
        Ok(())
    }

    fn apply_registration(
        &self,
        block: &Block,
        tx: &Transaction,
        pro_tx: &ProRegTx,
        coins: &dyn CoinView,
        list: &mut Registry,
        debug_logs: bool,
    ) -> RegistryResult<()> {
        let height = list.height();
        if pro_tx.operator_reward > MAX_OPERATOR_REWARD {
            return Err(RegistryError::invalid_block(&block.hash, "bad-protx-payload"));
        }
        check_service_addr(&block.hash, pro_tx.service_addr)?;

        let (collateral, collateral_height) = if is_null_hash(&pro_tx.collateral.txid) {
            if !tx.is_pro_tx_with_collateral(pro_tx.collateral.vout, self.config.collateral_amount) {
                return Err(RegistryError::invalid_block(&block.hash, "bad-protx-collateral"));
            }
            (OutPoint::new(tx.txid, pro_tx.collateral.vout), height)
        } else {
            match coins.coin(&pro_tx.collateral) {
                Some(coin) if coin.output.value == self.config.collateral_amount => {
                    (pro_tx.collateral, coin.height)
                }
                _ => return Err(RegistryError::invalid_block(&block.hash, "bad-protx-collateral")),
            }
        };

        // a new registration on the same collateral starts over at the back
        // of the payment queue
        if let Some(replaced) = list.get_by_collateral(&collateral).map(|r| r.pro_tx_hash) {
            list.remove_record(&replaced)?;
            if debug_logs {
                debug!(
                    "[qc-18] provider {} replaced by a new registration on its collateral",
                    hex::encode(replaced)
                );
            }
        }

        if let Some(addr) = pro_tx.service_addr {
            if list.has_unique_property(&UniqueProperty::Address(addr)) {
                return Err(RegistryError::invalid_block(&block.hash, "bad-protx-dup-addr"));
            }
        }
        if list.has_unique_property(&UniqueProperty::KeyId(pro_tx.owner_key))
            || list.has_unique_property(&UniqueProperty::OperatorKey(pro_tx.operator_key))
        {
            return Err(RegistryError::invalid_block(&block.hash, "bad-protx-dup-key"));
        }

        let mut state = ProviderState::from_registration(pro_tx);
        state.registered_height = height;
        state.collateral_height = collateral_height;
        if pro_tx.service_addr.is_none() {
            // waits for a service update
            state.ban_if_not_banned(height);
        }

        let record = ProviderRecord::new(
            tx.txid,
            list.total_registered(),
            collateral,
            pro_tx.operator_reward,
            state,
        );
        list.add_record(record, true)
            .map_err(|e| reject_duplicate(&block.hash, e))?;

        if debug_logs {
            debug!(
                "[qc-18] provider {} registered at height {}",
                hex::encode(tx.txid),
                height
            );
        }
        Ok(())
    }
}

fn confirm_providers(old: &Registry, prev: &BlockRef, list: &mut Registry) -> RegistryResult<()> {
    // at least two payment rounds before a provider is confirmed
    let threshold = (old.valid_count() as i64).saturating_mul(2);
    let to_confirm: Vec<Hash> = old
        .iter()
        .filter(|r| !r.state.is_confirmed())
        .filter(|r| i64::from(prev.height) - i64::from(r.state.registered_height) >= threshold)
        .map(|r| r.pro_tx_hash)
        .collect();

    for hash in to_confirm {
        if let Some(record) = list.get(&hash) {
            let mut state = (*record.state).clone();
            state.update_confirmed_hash(&hash, prev.hash);
            list.update_record(&hash, state)?;
        }
    }
    Ok(())
}

fn apply_update_service(
    block: &Block,
    pro_tx: &ProUpServTx,
    list: &mut Registry,
    debug_logs: bool,
) -> RegistryResult<()> {
    check_service_addr(&block.hash, pro_tx.service_addr)?;
    if let Some(addr) = pro_tx.service_addr {
        let owner = list
            .unique_property_owner(&UniqueProperty::Address(addr))
            .map(|r| r.pro_tx_hash);
        if owner.is_some_and(|owner| owner != pro_tx.pro_tx_hash) {
            return Err(RegistryError::invalid_block(&block.hash, "bad-protx-dup-addr"));
        }
    }

    let height = list.height();
    let record = list
        .get(&pro_tx.pro_tx_hash)
        .ok_or_else(|| RegistryError::invalid_block(&block.hash, "bad-protx-hash"))?;
    let mut state = (*record.state).clone();
    state.service_addr = pro_tx.service_addr;
    state.operator_payout_script = pro_tx.operator_payout_script.clone();

    if state.is_banned() && state.has_all_keys() {
        state.revive(height);
        if debug_logs {
            info!(
                "[qc-18] provider {} revived at height {}",
                hex::encode(pro_tx.pro_tx_hash),
                height
            );
        }
    }

    list.update_record(&pro_tx.pro_tx_hash, state)
        .map_err(|e| reject_duplicate(&block.hash, e))?;
    if debug_logs {
        debug!(
            "[qc-18] provider {} service updated at height {}",
            hex::encode(pro_tx.pro_tx_hash),
            height
        );
    }
    Ok(())
}

fn apply_update_registrar(
    block: &Block,
    pro_tx: &ProUpRegTx,
    list: &mut Registry,
    debug_logs: bool,
) -> RegistryResult<()> {
    let height = list.height();
    let record = list
        .get(&pro_tx.pro_tx_hash)
        .ok_or_else(|| RegistryError::invalid_block(&block.hash, "bad-protx-hash"))?;
    let mut state = (*record.state).clone();

    if state.operator_key.bytes != pro_tx.operator_key.bytes {
        // a new operator has to announce its service again
        state.reset_operator_fields();
        state.ban_if_not_banned(height);
    }
    state.operator_key = pro_tx.operator_key;
    state.voting_key = pro_tx.voting_key;
    state.payout_script = pro_tx.payout_script.clone();

    list.update_record(&pro_tx.pro_tx_hash, state)
        .map_err(|e| reject_duplicate(&block.hash, e))?;
    if debug_logs {
        debug!(
            "[qc-18] provider {} registrar updated at height {}",
            hex::encode(pro_tx.pro_tx_hash),
            height
        );
    }
    Ok(())
}

fn apply_revocation(
    block: &Block,
    pro_tx: &ProUpRevTx,
    list: &mut Registry,
    debug_logs: bool,
) -> RegistryResult<()> {
    let height = list.height();
    let record = list
        .get(&pro_tx.pro_tx_hash)
        .ok_or_else(|| RegistryError::invalid_block(&block.hash, "bad-protx-hash"))?;
    let mut state = (*record.state).clone();
    state.reset_operator_fields();
    state.ban_if_not_banned(height);
    state.revocation_reason = pro_tx.reason;

    list.update_record(&pro_tx.pro_tx_hash, state)?;
    if debug_logs {
        debug!(
            "[qc-18] provider {} operator revoked at height {} (reason {})",
            hex::encode(pro_tx.pro_tx_hash),
            height,
            pro_tx.reason
        );
    }
    Ok(())
}

fn remove_spent_collateral(
    prevout: &OutPoint,
    list: &mut Registry,
    debug_logs: bool,
) -> RegistryResult<()> {
    let Some(hash) = list.get_by_collateral(prevout).map(|r| r.pro_tx_hash) else {
        return Ok(());
    };
    list.remove_record(&hash)?;
    if debug_logs {
        debug!(
            "[qc-18] provider {} removed, collateral {:?} spent at height {}",
            hex::encode(hash),
            prevout,
            list.height()
        );
    }
    Ok(())
}
