//! Test support for twinprobe-harness.
