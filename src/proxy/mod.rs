// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy model: per-association protocol state for one matched
//! writer/reader pair.
//!
//! A [`RemoteReaderProxy`] lives on the writer side, one per matched
//! discovered reader; a [`RemoteWriterProxy`] lives on the reader side, one
//! per matched discovered writer. Both carry the locator lists, crypto
//! handle, and tunnel flag an association needs independent of reliability
//! kind; reliable variants additionally drive sequence-number bookkeeping.

mod remote_reader;
mod remote_writer;

pub use remote_reader::RemoteReaderProxy;
pub use remote_writer::{AcknackDecision, RemoteWriterProxy};
