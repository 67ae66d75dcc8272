// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod address;
pub mod bus;
pub mod cfg;
pub mod codec;
pub mod error;
pub mod monitor;
pub mod scanner;
pub mod session;
pub mod transport;
pub mod utils;
