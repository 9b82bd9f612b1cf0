//! Shared Types Module
//!
//! Data types shared by the Bitcoin and Bytom/Vapor providers.

pub mod units;

pub use units::{amount_converter, from_base_units, to_base_units, Unit, BASE_PER_COIN};

/// How much of an HTLC output a claim or refund pays out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpendAmount {
    /// The whole output less the fee
    Max,
    /// A fixed amount in base units, the remainder stays locked in the HTLC
    Exact(u64),
}

impl SpendAmount {
    /// The given amount, or `Max` when `max_amount` is set or no amount is given
    pub fn from_flags(amount: Option<u64>, max_amount: bool) -> Self {
        match (amount, max_amount) {
            (Some(amount), false) => SpendAmount::Exact(amount),
            _ => SpendAmount::Max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_amount_from_flags() {
        assert_eq!(SpendAmount::from_flags(Some(4_000), false), SpendAmount::Exact(4_000));
        assert_eq!(SpendAmount::from_flags(None, true), SpendAmount::Max);
        assert_eq!(SpendAmount::from_flags(None, false), SpendAmount::Max);
    }
}
