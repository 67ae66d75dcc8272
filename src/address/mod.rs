// SPDX-License-Identifier: MIT OR Apache-2.0

//! KNX individual and group address types (spec §3).

pub mod group;
pub mod individual;

pub use group::GroupAddress;
pub use individual::IndividualAddress;
