//! Client-facing wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Block context of a transaction. A height of -1 marks a transaction the
/// node has not yet seen confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Option<String>,
    pub height: i64,
    pub time: Option<DateTime<Utc>>,
}

/// One spent output consumed by a transaction, reduced to the address it
/// was originally paid to. Empty when the address could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub value: f64,
}

/// A fully assembled wallet transaction. Immutable once built; identity is
/// the transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub received_at: Option<DateTime<Utc>>,
    pub block: Block,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

/// Result set of one per-address resolution. No transaction id appears
/// twice in `transactions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressQueryResult {
    pub truncated: bool,
    pub transactions: Vec<Transaction>,
}
