// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::all)]

mod unit_tests {
    pub mod group_address_roundtrip;
    pub mod service_fixtures;
}
