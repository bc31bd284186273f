//! Property-Based Tests for the prediction client
//!
//! Uses proptest to generate random inputs and verify the validation gate,
//! stake arithmetic and commitment binding hold across them.

use electionbet::fhe::{Address, CiphertextHandle};
use electionbet::ledger::{StakeAmount, Ticket};
use electionbet::tickets::tickets_for;
use electionbet::wallet::{validate, ValidationError};
use electionbet::commitment::{commit, MarketId};
use proptest::prelude::*;

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

fn address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from_bytes)
}

fn handle() -> impl Strategy<Value = CiphertextHandle> {
    prop::array::uniform32(any::<u8>()).prop_map(CiphertextHandle::from_bytes)
}

/// Decimal stake strings with up to 6 fractional digits, with their value in
/// millionths
fn stake_text() -> impl Strategy<Value = (String, u64)> {
    (0u64..10_000, 0u64..1_000_000, 0usize..=6).prop_map(|(whole, frac, digits)| {
        let frac = frac % 10u64.pow(digits as u32);
        let text = if digits == 0 {
            whole.to_string()
        } else {
            format!("{}.{:0width$}", whole, frac, width = digits)
        };
        let micros = whole * 1_000_000 + frac * 10u64.pow(6 - digits as u32);
        (text, micros)
    })
}

// =============================================================================
// VALIDATION PROPERTIES
// =============================================================================

proptest! {
    /// Property: the gate accepts exactly connected, selected, positive stakes at or above the minimum
    #[test]
    fn validation_accepts_iff_all_rules_hold(
        identity in prop::option::of(address()),
        candidate in prop::option::of(0u32..5),
        (text, micros) in stake_text(),
        min_micros in 1u64..100_000,
    ) {
        let min = StakeAmount::from_base_units(min_micros, 1_000_000).unwrap();
        let result = validate(identity.as_ref(), candidate, &text, &min);

        let expected_ok = identity.is_some() && candidate.is_some() && micros >= min_micros;
        prop_assert_eq!(result.is_ok(), expected_ok);

        match result {
            Ok(input) => {
                prop_assert_eq!(Some(input.candidate_index), candidate);
                prop_assert_eq!(input.base_units(1_000_000).unwrap(), micros);
            }
            Err(ValidationError::NotConnected) => prop_assert!(identity.is_none()),
            Err(ValidationError::NoSelection) => {
                prop_assert!(identity.is_some() && candidate.is_none())
            }
            Err(ValidationError::InvalidAmount(_)) => prop_assert_eq!(micros, 0),
            Err(ValidationError::BelowMinimum { minimum }) => {
                prop_assert_eq!(minimum, min);
                prop_assert!(micros > 0 && micros < min_micros);
            }
        }
    }

    /// Property: without a connected identity, no input gets past the first rule
    #[test]
    fn disconnected_always_fails_first(
        candidate in prop::option::of(any::<u32>()),
        raw in ".{0,16}",
    ) {
        let min: StakeAmount = "0.01".parse().unwrap();
        prop_assert_eq!(validate(None, candidate, &raw, &min), Err(ValidationError::NotConnected));
    }

    /// Property: strings that are not decimal numbers are rejected as invalid amounts
    #[test]
    fn non_numeric_stakes_are_invalid(raw in "[a-zA-Z ,;]{1,12}") {
        prop_assume!(!raw.trim().is_empty());
        let min: StakeAmount = "0.01".parse().unwrap();
        let identity = Address::from_bytes([1; 20]);
        let result = validate(Some(&identity), Some(0), &raw, &min);
        prop_assert!(matches!(result, Err(ValidationError::InvalidAmount(_))));
    }
}

// =============================================================================
// STAKE ARITHMETIC PROPERTIES
// =============================================================================

proptest! {
    /// Property: conversion to base units never rounds up and preserves order
    #[test]
    fn base_units_floor_and_preserve_order(
        (a_text, _) in stake_text(),
        (b_text, _) in stake_text(),
        scale in prop_oneof![Just(1u64), Just(100), Just(1_000_000), Just(1_000_000_000_000)],
    ) {
        let a: StakeAmount = a_text.parse().unwrap();
        let b: StakeAmount = b_text.parse().unwrap();
        let a_units = a.to_base_units(scale).unwrap();
        let b_units = b.to_base_units(scale).unwrap();

        if a <= b {
            prop_assert!(a_units <= b_units);
        }
        prop_assert!(StakeAmount::from_base_units(a_units, scale).unwrap() <= a);
    }

    /// Property: digits past the 18th decimal are dropped, never rounded
    #[test]
    fn extra_decimals_truncate((_, micros) in stake_text(), tail in "[0-9]{13,16}") {
        let text = format!("{}.{:06}{}", micros / 1_000_000, micros % 1_000_000, tail);
        match text.parse::<StakeAmount>() {
            Ok(parsed) => {
                prop_assert!(parsed >= StakeAmount::from_base_units(micros, 1_000_000).unwrap());
                prop_assert_eq!(parsed.to_base_units(1_000_000).unwrap(), micros);
            }
            Err(_) => prop_assert_eq!(micros, 0),
        }
    }
}

// =============================================================================
// COMMITMENT PROPERTIES
// =============================================================================

proptest! {
    /// Property: the commitment is a pure function of its inputs
    #[test]
    fn commitment_is_deterministic(
        submitter in address(),
        market in any::<u64>(),
        candidate in handle(),
        stake in handle(),
    ) {
        let a = commit(&submitter, MarketId(market), &candidate, &stake);
        let b = commit(&submitter, MarketId(market), &candidate, &stake);
        prop_assert_eq!(a, b);
        prop_assert!(a.verify(&submitter, MarketId(market), &candidate, &stake).is_ok());
    }

    /// Property: changing any single field changes the commitment
    #[test]
    fn commitment_binds_every_field(
        submitter in address(),
        other_submitter in address(),
        market in any::<u64>(),
        other_market in any::<u64>(),
        candidate in handle(),
        stake in handle(),
        other_handle in handle(),
    ) {
        let base = commit(&submitter, MarketId(market), &candidate, &stake);

        if other_submitter != submitter {
            prop_assert_ne!(base, commit(&other_submitter, MarketId(market), &candidate, &stake));
        }
        if other_market != market {
            prop_assert_ne!(base, commit(&submitter, MarketId(other_market), &candidate, &stake));
        }
        if other_handle != candidate {
            prop_assert_ne!(base, commit(&submitter, MarketId(market), &other_handle, &stake));
        }
        if other_handle != stake {
            prop_assert_ne!(base, commit(&submitter, MarketId(market), &candidate, &other_handle));
        }
    }

    /// Property: swapping the candidate and stake handles is detected
    #[test]
    fn commitment_is_order_sensitive(
        submitter in address(),
        candidate in handle(),
        stake in handle(),
    ) {
        prop_assume!(candidate != stake);
        let c = commit(&submitter, MarketId(1), &candidate, &stake);
        prop_assert!(c.verify(&submitter, MarketId(1), &stake, &candidate).is_err());
    }
}

// =============================================================================
// TICKET OWNERSHIP PROPERTIES
// =============================================================================

proptest! {
    /// Property: listing keeps exactly the caller's tickets, in ledger order
    #[test]
    fn listing_filters_by_bettor(
        me in address(),
        owners in prop::collection::vec(any::<bool>(), 0..12),
        handles in prop::collection::vec(handle(), 12),
    ) {
        let stranger = Address::from_bytes([0xEE; 20]);
        prop_assume!(stranger != me);

        let tickets: Vec<Ticket> = owners
            .iter()
            .enumerate()
            .map(|(i, mine)| {
                let bettor = if *mine { me } else { stranger };
                Ticket {
                    ticket_id: i as u64 + 1,
                    market_id: MarketId(1),
                    bettor,
                    commitment: commit(&bettor, MarketId(1), &handles[i], &handles[i]),
                    claimed: false,
                    candidate_handle: handles[i],
                    stake_handle: handles[i],
                }
            })
            .collect();

        let listed = tickets_for(&tickets, &me);
        let expected: Vec<u64> = owners
            .iter()
            .enumerate()
            .filter(|(_, mine)| **mine)
            .map(|(i, _)| i as u64 + 1)
            .collect();

        prop_assert_eq!(listed.iter().map(|t| t.ticket_id).collect::<Vec<_>>(), expected);
    }
}
