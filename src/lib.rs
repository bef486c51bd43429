//! Passive GQUIC (Google QUIC) traffic analyzer.
//!
//! Reads a pcapng capture, groups packets into bidirectional flows, and runs
//! the GQUIC public-header / frame / handshake decoder over every candidate
//! flow. When the capture ends, each flow is terminated and flushed into one
//! fixed-schema record.

pub mod flow;
pub mod gquic;
pub mod logging;
pub mod parser;
