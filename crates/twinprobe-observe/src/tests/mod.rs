//! Test support for twinprobe-observe.
