//! # Provider State Delta
//!
//! A field mask plus a carrier state holding only the masked fields.
//!
//! The tracked fields are listed once in `provider_state_fields!`; diffing,
//! applying and the wire encoding are all generated from that table, so the
//! canonical field order and bit assignment cannot drift apart.

use super::state::ProviderState;
use crate::codec::{Decodable, DecodeError, Decoder, Encodable, Encoder};

macro_rules! provider_state_fields {
    ($($bit:literal => $field:ident, $flag:ident;)+) => {
        /// Field bits of a [`ProviderStateDelta`], in canonical order.
        pub mod fields {
            $(pub const $flag: u32 = $bit;)+

            /// Union of every tracked field.
            pub const ALL: u32 = 0 $(| $bit)+;
        }

        impl ProviderStateDelta {
            /// Minimal delta turning `from` into `to`.
            pub fn compute(from: &ProviderState, to: &ProviderState) -> Self {
                let mut delta = ProviderStateDelta::default();
                $(
                    if from.$field != to.$field {
                        delta.fields |= fields::$flag;
                        delta.state.$field = to.$field.clone();
                    }
                )+
                delta
            }

            /// Overwrites every masked field of `target`.
            pub fn apply_to(&self, target: &mut ProviderState) {
                $(
                    if self.fields & fields::$flag != 0 {
                        target.$field = self.state.$field.clone();
                    }
                )+
            }
        }

        impl Encodable for ProviderStateDelta {
            fn encode(&self, enc: &mut Encoder) {
                enc.write_varint(u64::from(self.fields));
                $(
                    if self.fields & fields::$flag != 0 {
                        self.state.$field.encode(enc);
                    }
                )+
            }
        }

        impl Decodable for ProviderStateDelta {
            fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
                let mask = dec.read_varint()?;
                if mask & !u64::from(fields::ALL) != 0 {
                    return Err(DecodeError::UnknownStateFields(mask));
                }
                let mut delta = ProviderStateDelta {
                    fields: mask as u32,
                    state: ProviderState::default(),
                };
                $(
                    if delta.fields & fields::$flag != 0 {
                        delta.state.$field = Decodable::decode(dec)?;
                    }
                )+
                Ok(delta)
            }
        }

        // A full state is encoded as every field in canonical order.
        impl Encodable for ProviderState {
            fn encode(&self, enc: &mut Encoder) {
                $(self.$field.encode(enc);)+
            }
        }

        impl Decodable for ProviderState {
            fn decode(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
                Ok(ProviderState {
                    $($field: Decodable::decode(dec)?,)+
                })
            }
        }
    };
}

/// Sparse difference between two provider states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderStateDelta {
    pub fields: u32,
    pub state: ProviderState,
}

provider_state_fields! {
    0x0001 => registered_height, REGISTERED_HEIGHT;
    0x0002 => last_paid_height, LAST_PAID_HEIGHT;
    0x0004 => pose_penalty, POSE_PENALTY;
    0x0008 => pose_revived_height, POSE_REVIVED_HEIGHT;
    0x0010 => pose_ban_height, POSE_BAN_HEIGHT;
    0x0020 => revocation_reason, REVOCATION_REASON;
    0x0040 => confirmed_hash, CONFIRMED_HASH;
    0x0080 => confirmed_hash_with_pro_tx, CONFIRMED_HASH_WITH_PRO_TX;
    0x0100 => owner_key, OWNER_KEY;
    0x0200 => operator_key, OPERATOR_KEY;
    0x0400 => voting_key, VOTING_KEY;
    0x0800 => service_addr, SERVICE_ADDR;
    0x1000 => payout_script, PAYOUT_SCRIPT;
    0x2000 => operator_payout_script, OPERATOR_PAYOUT_SCRIPT;
    0x4000 => collateral_height, COLLATERAL_HEIGHT;
}

impl ProviderStateDelta {
    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    pub fn has(&self, flag: u32) -> bool {
        self.fields & flag != 0
    }

    /// `base` with this delta applied, as a new value.
    pub fn applied(&self, base: &ProviderState) -> ProviderState {
        let mut next = base.clone();
        self.apply_to(&mut next);
        next
    }
}
