//! A3S ACI CLI - package binaries and assets as App Container Images.

pub mod commands;
pub mod output;
