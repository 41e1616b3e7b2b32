// SPDX-License-Identifier: MIT

pub mod gateway;
pub mod sdk;
