//! Assembly of raw wallet-activity entries into full transactions.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::cache::ResolutionCache;
use crate::node::{NodeError, RawTxEntry, TransactionSource, TxDetail};
use crate::protocol::{Block, Transaction, TxInput, TxOutput};

/// Block context for a raw entry. The node omits block fields for mempool
/// transactions; those resolve to the -1 height sentinel and no time.
pub fn block_from_entry(entry: &RawTxEntry) -> Block {
    Block {
        hash: entry.blockhash.clone(),
        height: entry.blockheight.unwrap_or(-1),
        time: entry.blocktime.and_then(parse_unix_timestamp),
    }
}

fn parse_unix_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Assemble `entry` into a full [`Transaction`], consulting `cache` first.
///
/// On a miss the node is asked for the transaction detail and every spent
/// input is resolved to its originating address. The cache is written only
/// on success, and a failed detail fetch is returned to the caller without
/// retrying — skipping or aborting is the caller's decision.
pub async fn assemble(
    source: &dyn TransactionSource,
    cache: &mut ResolutionCache,
    entry: &RawTxEntry,
) -> Result<Transaction, NodeError> {
    if let Some(cached) = cache.get(&entry.txid) {
        return Ok(cached.clone());
    }

    let detail = source.get_transaction_detail(&entry.txid).await?;

    let inputs = resolve_input_addresses(source, &detail).await;
    let outputs = detail
        .vout
        .iter()
        .map(|out| TxOutput {
            address: out.script_pub_key.address.clone().unwrap_or_default(),
            value: out.value,
        })
        .collect();

    let tx = Transaction {
        id: detail.txid.clone(),
        received_at: entry.time.and_then(parse_unix_timestamp),
        block: block_from_entry(entry),
        inputs,
        outputs,
    };

    cache.put(tx.clone());
    Ok(tx)
}

/// Resolve each spent input to the address its previous output paid.
///
/// The node does not report input-side addresses directly; each one costs
/// a lookup of the previous transaction. Best-effort: an input whose
/// previous transaction cannot be fetched, a coinbase input, or a
/// non-standard previous output keeps an empty address instead of failing
/// the assembly.
async fn resolve_input_addresses(
    source: &dyn TransactionSource,
    detail: &TxDetail,
) -> Vec<TxInput> {
    let mut inputs = Vec::with_capacity(detail.vin.len());

    for vin in &detail.vin {
        let (Some(prev_txid), Some(vout)) = (vin.txid.as_deref(), vin.vout) else {
            inputs.push(TxInput {
                address: String::new(),
            });
            continue;
        };

        let address = match source.get_transaction_detail(prev_txid).await {
            Ok(prev) => prev
                .vout
                .iter()
                .find(|out| out.n == vout)
                .and_then(|out| out.script_pub_key.address.clone())
                .unwrap_or_default(),
            Err(err) => {
                warn!("Failed to resolve input {}:{}: {}", prev_txid, vout, err);
                String::new()
            }
        };

        inputs.push(TxInput { address });
    }

    inputs
}
