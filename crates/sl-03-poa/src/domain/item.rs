use serde::{Deserialize, Serialize};
use shared_types::{Balance, TxType};
use std::collections::BTreeSet;

/// One quota line of a POA: a transaction kind, the assets it covers and
/// what is left of its allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoaItem {
    pub tx_type: TxType,
    pub amount: Balance,
    pub assets: BTreeSet<String>,
}

impl PoaItem {
    pub fn new<I, S>(tx_type: TxType, amount: Balance, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tx_type,
            amount,
            assets: assets.into_iter().map(Into::into).collect(),
        }
    }

    /// Use up `to_use` of the allowance. Non-positive amounts are ignored and
    /// the allowance never drops below zero. Returns what is left.
    pub fn consume(&mut self, to_use: Balance) -> Balance {
        if to_use.is_positive() {
            self.amount = if self.amount <= to_use {
                Balance::ZERO
            } else {
                Balance::new(self.amount.value() - to_use.value())
            };
        }
        self.amount
    }

    pub fn consumed(&self) -> bool {
        self.amount.is_zero()
    }

    /// Does any asset pattern of this item match `asset_id`?
    pub fn match_asset(&self, asset_id: &str) -> bool {
        self.assets
            .iter()
            .any(|pattern| glob_match(pattern.as_bytes(), asset_id.as_bytes()))
    }
}

/// `*` matches any run of characters, `?` exactly one.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p).copied() {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}
