// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exercises `GroupAddress` through the public crate API as an external
//! consumer would, sweeping a wider set of boundary values than the
//! colocated unit tests in `address/group.rs` cover.

use knx_scan_rs::address::{group::GroupAddressFormat, GroupAddress};

#[test]
fn three_level_roundtrips_across_the_full_boundary_set() {
    for (main, middle, sub) in [(0u8, 0u8, 0u8), (31, 7, 255), (1, 2, 3), (15, 3, 128), (31, 0, 0), (0, 7, 255)] {
        let ga = GroupAddress::new_three_level(main, middle, sub).expect("valid three-level address");
        let formatted = ga.format(GroupAddressFormat::ThreeLevel);
        let parsed: GroupAddress = formatted.parse().expect("parse formatted address");
        assert_eq!(parsed, ga);
        assert_eq!(parsed.main(), main);
        assert_eq!(parsed.middle(), middle);
        assert_eq!(parsed.sub_three_level(), sub);
    }
}

#[test]
fn two_level_roundtrips_across_the_full_boundary_set() {
    for (main, sub) in [(0u8, 0u16), (31, 2047), (1, 515), (16, 1024)] {
        let ga = GroupAddress::new_two_level(main, sub).expect("valid two-level address");
        let formatted = ga.format(GroupAddressFormat::TwoLevel);
        let parsed: GroupAddress = formatted.parse().expect("parse formatted address");
        assert_eq!(parsed, ga);
        assert_eq!(parsed.main(), main);
        assert_eq!(parsed.sub_two_level(), sub);
    }
}

#[test]
fn display_uses_three_level_form() {
    let ga = GroupAddress::new_three_level(1, 2, 3).unwrap();
    assert_eq!(ga.to_string(), "1/2/3");
    assert_eq!(ga.to_string(), ga.format(GroupAddressFormat::ThreeLevel));
}

#[test]
fn construction_rejects_out_of_range_fields() {
    assert!(GroupAddress::new_three_level(32, 0, 0).is_err());
    assert!(GroupAddress::new_three_level(0, 8, 0).is_err());
    assert!(GroupAddress::new_two_level(32, 0).is_err());
    assert!(GroupAddress::new_two_level(0, 2048).is_err());
}

#[test]
fn parsing_rejects_out_of_range_and_malformed_strings() {
    for s in ["32/0/0", "0/8/0", "0/0/256", "32/0", "0/2048", "not/a/number", "1/2/3/4", "1"] {
        assert!(s.parse::<GroupAddress>().is_err(), "expected {s:?} to be rejected");
    }
}

#[test]
fn raw_value_is_shared_between_the_two_formats() {
    let three = GroupAddress::new_three_level(4, 1, 10).unwrap();
    let two = GroupAddress::new_two_level(4, (1u16 << 8) | 10).unwrap();
    assert_eq!(three.raw(), two.raw());
    assert_eq!(three, two);
}
