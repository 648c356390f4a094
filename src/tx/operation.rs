//! Typed chain operations and their wire encodings.
//!
//! # Responsibilities
//! - Model the supported operation kinds as a closed enum
//! - Produce each operation's chain-tagged binary encoding
//! - Produce the condenser-style JSON form used in broadcast payloads
//! - Normalize generic JSON records at the boundary, so nothing downstream
//!   ever inspects untyped data

use serde::Deserialize;
use serde_json::{json, Value};

use crate::chain::Chain;
use crate::error::{TransactionError, TxResult};

/// The operation kinds this crate can encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Vote,
    Comment,
    Transfer,
    CustomJson,
}

impl OperationKind {
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Vote => "vote",
            OperationKind::Comment => "comment",
            OperationKind::Transfer => "transfer",
            OperationKind::CustomJson => "custom_json",
        }
    }
}

/// An asset quantity such as `1.000 HIVE`: integer amount scaled by
/// precision, plus a symbol of at most 7 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub precision: u8,
    pub symbol: String,
}

impl Asset {
    /// Parse `"<quantity> <symbol>"`; precision is the number of decimal
    /// places written in the quantity.
    pub fn parse(input: &str) -> TxResult<Self> {
        let mut parts = input.split_whitespace();
        let (Some(quantity), Some(symbol), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TransactionError::InvalidOperation(format!(
                "asset '{}' must be '<quantity> <symbol>'",
                input
            )));
        };

        if symbol.is_empty()
            || symbol.len() > 7
            || !symbol.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(TransactionError::InvalidOperation(format!(
                "asset symbol '{}' is invalid",
                symbol
            )));
        }

        let (integral, fractional) = match quantity.split_once('.') {
            Some((integral, fractional)) => (integral, fractional),
            None => (quantity, ""),
        };
        if fractional.contains('.') || fractional.len() > 12 {
            return Err(TransactionError::InvalidOperation(format!(
                "asset quantity '{}' is invalid",
                quantity
            )));
        }

        let amount: i64 = format!("{}{}", integral, fractional)
            .parse()
            .map_err(|e| {
                TransactionError::InvalidOperation(format!("asset quantity '{}': {}", quantity, e))
            })?;

        Ok(Self {
            amount,
            precision: fractional.len() as u8,
            symbol: symbol.to_string(),
        })
    }

    /// Wire form: amount as signed 64-bit LE, precision byte, symbol
    /// null-padded to 7 bytes.
    pub(crate) fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.amount.to_le_bytes());
        out[8] = self.precision;
        let symbol = self.symbol.as_bytes();
        let len = symbol.len().min(7);
        out[9..9 + len].copy_from_slice(&symbol[..len]);
        out
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.precision == 0 {
            return write!(f, "{} {}", self.amount, self.symbol);
        }
        // The sign is emitted separately; `amount / scale` would drop it for
        // magnitudes below one whole unit.
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        let scale = 10u64.pow(self.precision as u32);
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            magnitude / scale,
            magnitude % scale,
            self.symbol,
            width = self.precision as usize
        )
    }
}

/// A chain operation, immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Vote {
        voter: String,
        author: String,
        permlink: String,
        weight: i16,
    },
    Comment {
        parent_author: String,
        parent_permlink: String,
        author: String,
        permlink: String,
        title: String,
        body: String,
        json_metadata: String,
    },
    Transfer {
        from: String,
        to: String,
        amount: Asset,
        memo: String,
    },
    CustomJson {
        required_auths: Vec<String>,
        required_posting_auths: Vec<String>,
        id: String,
        json: String,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Vote { .. } => OperationKind::Vote,
            Operation::Comment { .. } => OperationKind::Comment,
            Operation::Transfer { .. } => OperationKind::Transfer,
            Operation::CustomJson { .. } => OperationKind::CustomJson,
        }
    }

    /// Chain-tagged binary encoding: varint operation id followed by the
    /// operation's fields in declaration order.
    pub fn to_bytes(&self, chain: Chain) -> Vec<u8> {
        let mut out = Vec::new();
        push_varint(&mut out, chain.operation_id(self.kind()) as u64);

        match self {
            Operation::Vote {
                voter,
                author,
                permlink,
                weight,
            } => {
                push_string(&mut out, voter);
                push_string(&mut out, author);
                push_string(&mut out, permlink);
                out.extend(weight.to_le_bytes());
            }
            Operation::Comment {
                parent_author,
                parent_permlink,
                author,
                permlink,
                title,
                body,
                json_metadata,
            } => {
                push_string(&mut out, parent_author);
                push_string(&mut out, parent_permlink);
                push_string(&mut out, author);
                push_string(&mut out, permlink);
                push_string(&mut out, title);
                push_string(&mut out, body);
                push_string(&mut out, json_metadata);
            }
            Operation::Transfer {
                from,
                to,
                amount,
                memo,
            } => {
                push_string(&mut out, from);
                push_string(&mut out, to);
                out.extend(amount.to_bytes());
                push_string(&mut out, memo);
            }
            Operation::CustomJson {
                required_auths,
                required_posting_auths,
                id,
                json,
            } => {
                push_string_list(&mut out, required_auths);
                push_string_list(&mut out, required_posting_auths);
                push_string(&mut out, id);
                push_string(&mut out, json);
            }
        }

        out
    }

    /// Condenser-style JSON form: `["name", {fields}]`.
    pub fn to_value(&self) -> Value {
        match self {
            Operation::Vote {
                voter,
                author,
                permlink,
                weight,
            } => json!([
                "vote",
                {
                    "voter": voter,
                    "author": author,
                    "permlink": permlink,
                    "weight": weight,
                }
            ]),
            Operation::Comment {
                parent_author,
                parent_permlink,
                author,
                permlink,
                title,
                body,
                json_metadata,
            } => json!([
                "comment",
                {
                    "parent_author": parent_author,
                    "parent_permlink": parent_permlink,
                    "author": author,
                    "permlink": permlink,
                    "title": title,
                    "body": body,
                    "json_metadata": json_metadata,
                }
            ]),
            Operation::Transfer {
                from,
                to,
                amount,
                memo,
            } => json!([
                "transfer",
                {
                    "from": from,
                    "to": to,
                    "amount": amount.to_string(),
                    "memo": memo,
                }
            ]),
            Operation::CustomJson {
                required_auths,
                required_posting_auths,
                id,
                json,
            } => json!([
                "custom_json",
                {
                    "required_auths": required_auths,
                    "required_posting_auths": required_posting_auths,
                    "id": id,
                    "json": json,
                }
            ]),
        }
    }

    /// Normalize an external representation into a typed operation.
    ///
    /// Accepts either a `["name", {fields}]` pair or a flat record with a
    /// `type` field; a trailing `_operation` suffix on the name is
    /// tolerated.
    pub fn from_value(value: &Value) -> TxResult<Self> {
        let (name, fields) = match value {
            Value::Array(pair) if pair.len() == 2 => {
                let name = pair[0].as_str().ok_or_else(|| {
                    TransactionError::InvalidOperation("operation name must be a string".to_string())
                })?;
                (name.to_string(), pair[1].clone())
            }
            Value::Object(record) => {
                let name = record
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        TransactionError::InvalidOperation(
                            "operation record has no 'type' field".to_string(),
                        )
                    })?
                    .to_string();
                let mut fields = record.clone();
                fields.remove("type");
                (name, Value::Object(fields))
            }
            _ => {
                return Err(TransactionError::InvalidOperation(
                    "operation must be a [name, fields] pair or a record with a 'type' field"
                        .to_string(),
                ))
            }
        };

        let kind = name.strip_suffix("_operation").unwrap_or(&name);
        match kind {
            "vote" => {
                #[derive(Deserialize)]
                struct Fields {
                    voter: String,
                    author: String,
                    permlink: String,
                    weight: i16,
                }
                let fields: Fields = decode_fields("vote", fields)?;
                Ok(Operation::Vote {
                    voter: fields.voter,
                    author: fields.author,
                    permlink: fields.permlink,
                    weight: fields.weight,
                })
            }
            "comment" => {
                #[derive(Deserialize)]
                struct Fields {
                    parent_author: String,
                    parent_permlink: String,
                    author: String,
                    permlink: String,
                    #[serde(default)]
                    title: String,
                    body: String,
                    #[serde(default)]
                    json_metadata: String,
                }
                let fields: Fields = decode_fields("comment", fields)?;
                Ok(Operation::Comment {
                    parent_author: fields.parent_author,
                    parent_permlink: fields.parent_permlink,
                    author: fields.author,
                    permlink: fields.permlink,
                    title: fields.title,
                    body: fields.body,
                    json_metadata: fields.json_metadata,
                })
            }
            "transfer" => {
                #[derive(Deserialize)]
                struct Fields {
                    from: String,
                    to: String,
                    amount: String,
                    #[serde(default)]
                    memo: String,
                }
                let fields: Fields = decode_fields("transfer", fields)?;
                Ok(Operation::Transfer {
                    from: fields.from,
                    to: fields.to,
                    amount: Asset::parse(&fields.amount)?,
                    memo: fields.memo,
                })
            }
            "custom_json" => {
                #[derive(Deserialize)]
                struct Fields {
                    #[serde(default)]
                    required_auths: Vec<String>,
                    #[serde(default)]
                    required_posting_auths: Vec<String>,
                    id: String,
                    json: String,
                }
                let fields: Fields = decode_fields("custom_json", fields)?;
                Ok(Operation::CustomJson {
                    required_auths: fields.required_auths,
                    required_posting_auths: fields.required_posting_auths,
                    id: fields.id,
                    json: fields.json,
                })
            }
            other => Err(TransactionError::InvalidOperation(format!(
                "unsupported operation type: {}",
                other
            ))),
        }
    }
}

fn decode_fields<T: serde::de::DeserializeOwned>(kind: &str, fields: Value) -> TxResult<T> {
    serde_json::from_value(fields)
        .map_err(|e| TransactionError::InvalidOperation(format!("{}: {}", kind, e)))
}

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            out.push(byte | 0x80);
        } else {
            out.push(byte);
            break;
        }
    }
}

fn push_string(out: &mut Vec<u8>, value: &str) {
    push_varint(out, value.len() as u64);
    out.extend(value.as_bytes());
}

fn push_string_list(out: &mut Vec<u8>, items: &[String]) {
    push_varint(out, items.len() as u64);
    for item in items {
        push_string(out, item);
    }
}
